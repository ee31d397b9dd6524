use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

use super::{now, BookingLedger, LedgerError, Resource};
use crate::models::{AdminBooking, BookingStatus, PageRequest, Pagination, Participant, UserBooking};

/// Фильтры админского списка броней.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub workshop_id: Option<i64>,
    pub status: Option<BookingStatus>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkshopRef {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantList {
    pub workshop: WorkshopRef,
    pub participants: Vec<Participant>,
    pub total_participants: usize,
}

impl BookingLedger {
    /// Брони пользователя, новые мастер-классы первыми.
    pub async fn user_bookings(
        &self,
        user_id: i64,
        status: Option<BookingStatus>,
        page: PageRequest,
    ) -> Result<(Vec<UserBooking>, Pagination), LedgerError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT b.id, b.booking_date, b.status, b.notes,
                    w.id AS workshop_id, w.title, w.description, w.instructor,
                    w.date, w.start_time, w.end_time, w.location, w.price,
                    (b.status = 'confirmed' AND (w.date + w.start_time) > "
        );
        qb.push_bind(now());
        qb.push(") AS can_cancel FROM bookings b JOIN workshops w ON w.id = b.workshop_id");
        push_user_filter(&mut qb, user_id, status);
        qb.push(" ORDER BY w.date DESC, w.start_time DESC LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let bookings = qb
            .build_query_as::<UserBooking>()
            .fetch_all(&self.db.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings b");
        push_user_filter(&mut count, user_id, status);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db.pool)
            .await?;

        Ok((bookings, page.pagination(total)))
    }

    /// Все брони (для администратора), последние созданные первыми.
    pub async fn all_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> Result<(Vec<AdminBooking>, Pagination), LedgerError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT b.id, b.booking_date, b.status, b.notes,
                    u.email, u.first_name, u.last_name, u.phone,
                    w.id AS workshop_id, w.title, w.instructor, w.date,
                    w.start_time, w.end_time, w.location, w.price
             FROM bookings b
             JOIN users u ON u.id = b.user_id
             JOIN workshops w ON w.id = b.workshop_id"
        );
        push_admin_filter(&mut qb, filter);
        qb.push(" ORDER BY b.booking_date DESC LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let bookings = qb
            .build_query_as::<AdminBooking>()
            .fetch_all(&self.db.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM bookings b
             JOIN users u ON u.id = b.user_id
             JOIN workshops w ON w.id = b.workshop_id"
        );
        push_admin_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db.pool)
            .await?;

        Ok((bookings, page.pagination(total)))
    }

    /// Подтверждённые участники мастер-класса в порядке записи.
    pub async fn participants(&self, workshop_id: i64) -> Result<ParticipantList, LedgerError> {
        let workshop = sqlx::query_as::<_, WorkshopRef>(
            "SELECT id, title FROM workshops WHERE id = $1"
        )
        .bind(workshop_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or(LedgerError::NotFound(Resource::Workshop))?;

        let participants = sqlx::query_as::<_, Participant>(
            "SELECT u.id, u.email, u.first_name, u.last_name, u.phone,
                    b.booking_date, b.status, b.notes
             FROM bookings b
             JOIN users u ON u.id = b.user_id
             WHERE b.workshop_id = $1 AND b.status = 'confirmed'
             ORDER BY b.booking_date ASC"
        )
        .bind(workshop_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(ParticipantList {
            workshop,
            total_participants: participants.len(),
            participants,
        })
    }
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: i64, status: Option<BookingStatus>) {
    qb.push(" WHERE b.user_id = ");
    qb.push_bind(user_id);
    if let Some(status) = status {
        qb.push(" AND b.status = ");
        qb.push_bind(status);
    }
}

fn push_admin_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    qb.push(" WHERE TRUE");
    if let Some(workshop_id) = filter.workshop_id {
        qb.push(" AND b.workshop_id = ");
        qb.push_bind(workshop_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND b.status = ");
        qb.push_bind(status);
    }
    if let Some(email) = filter.user_email.as_deref() {
        qb.push(" AND u.email ILIKE ");
        qb.push_bind(format!("%{}%", email));
    }
}
