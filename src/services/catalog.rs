//! Каталог мастер-классов: чтение, фильтрация и админские правки.
//!
//! Счётчик `current_bookings` здесь только читается. Правки, которые
//! зависят от счётчика (уменьшение вместимости, удаление), берут ту же
//! блокировку строки, что и учёт бронирований.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::database::Database;
use crate::models::{PageRequest, Pagination, Workshop, WorkshopListing, WorkshopStatus};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Workshop not found")]
    NotFound,

    #[error("End time must be after start time")]
    InvalidSchedule,

    #[error("Workshop date must be in the future")]
    DateInPast,

    #[error("Cannot reduce capacity below current bookings ({0})")]
    CapacityBelowBookings(i32),

    #[error("Cannot delete workshop with existing bookings. Mark the workshop as cancelled instead.")]
    HasBookings,

    #[error("storage failure")]
    Database(#[from] sqlx::Error),
}

/// Тело запроса на создание/изменение мастер-класса.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WorkshopInput {
    #[validate(length(min = 3, max = 255, message = "Title must be between 3 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    pub description: String,
    #[validate(length(min = 2, max = 255, message = "Instructor name must be between 2 and 255 characters"))]
    pub instructor: String,
    pub date: NaiveDate,
    #[serde(deserialize_with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "time_of_day")]
    pub end_time: NaiveTime,
    #[validate(length(min = 3, max = 255, message = "Location must be between 3 and 255 characters"))]
    pub location: String,
    #[validate(custom(function = "non_negative", message = "Price must be a positive number"))]
    pub price: Decimal,
    #[validate(range(min = 1, message = "Max capacity must be at least 1"))]
    pub max_capacity: i32,
    #[validate(length(max = 100, message = "Category must be less than 100 characters"))]
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<WorkshopStatus>,
}

impl WorkshopInput {
    pub fn check_schedule(&self) -> Result<(), CatalogError> {
        if self.start_time >= self.end_time {
            return Err(CatalogError::InvalidSchedule);
        }
        Ok(())
    }

    pub fn check_not_in_past(&self, today: NaiveDate) -> Result<(), CatalogError> {
        if self.date < today {
            return Err(CatalogError::DateInPast);
        }
        Ok(())
    }

    // пустая категория хранится как NULL
    fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

fn non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}

// Время принимается как "HH:MM" или "HH:MM:SS"
fn time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .map_err(|_| serde::de::Error::custom("Please provide a valid time (HH:MM format)"))
}

/// Фильтры списка мастер-классов.
#[derive(Debug, Clone)]
pub struct WorkshopFilter {
    pub status: WorkshopStatus,
    pub category: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Default for WorkshopFilter {
    fn default() -> Self {
        WorkshopFilter {
            status: WorkshopStatus::Active,
            category: None,
            search: None,
            date_from: None,
            date_to: None,
        }
    }
}

/// Читает мастер-класс с блокировкой строки до конца транзакции.
pub async fn lock_workshop(
    conn: &mut PgConnection,
    workshop_id: i64,
) -> Result<Option<Workshop>, sqlx::Error> {
    sqlx::query_as::<_, Workshop>(
        "SELECT * FROM workshops WHERE id = $1 FOR UPDATE"
    )
    .bind(workshop_id)
    .fetch_optional(conn)
    .await
}

#[derive(Clone)]
pub struct WorkshopCatalog {
    db: Database,
}

impl WorkshopCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &WorkshopFilter,
        page: PageRequest,
        viewer: Option<i64>,
    ) -> Result<(Vec<WorkshopListing>, Pagination), CatalogError> {
        let mut qb = listing_select(viewer);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY w.date ASC, w.start_time ASC LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let workshops = qb
            .build_query_as::<WorkshopListing>()
            .fetch_all(&self.db.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM workshops w");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db.pool)
            .await?;

        Ok((workshops, page.pagination(total)))
    }

    pub async fn get(&self, workshop_id: i64, viewer: Option<i64>) -> Result<WorkshopListing, CatalogError> {
        let mut qb = listing_select(viewer);
        qb.push(" WHERE w.id = ");
        qb.push_bind(workshop_id);

        qb.build_query_as::<WorkshopListing>()
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM workshops
             WHERE category IS NOT NULL AND status = 'active'
             ORDER BY category"
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(categories)
    }

    pub async fn create(
        &self,
        input: &WorkshopInput,
        created_by: i64,
        today: NaiveDate,
    ) -> Result<Workshop, CatalogError> {
        input.check_schedule()?;
        input.check_not_in_past(today)?;

        let workshop = sqlx::query_as::<_, Workshop>(
            "INSERT INTO workshops
                (title, description, instructor, date, start_time, end_time,
                 location, price, max_capacity, category, image_url, status, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *"
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.instructor)
        .bind(input.date)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.location)
        .bind(input.price)
        .bind(input.max_capacity)
        .bind(input.category())
        .bind(input.image_url.as_deref())
        .bind(input.status.unwrap_or(WorkshopStatus::Active))
        .bind(created_by)
        .fetch_one(&self.db.pool)
        .await?;

        info!(workshop_id = workshop.id, created_by, "workshop created");
        Ok(workshop)
    }

    /// Полное обновление; вместимость нельзя опустить ниже занятых мест.
    pub async fn update(&self, workshop_id: i64, input: &WorkshopInput) -> Result<Workshop, CatalogError> {
        let mut tx = self.db.pool.begin().await?;

        let existing = lock_workshop(&mut tx, workshop_id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        if input.max_capacity < existing.current_bookings {
            return Err(CatalogError::CapacityBelowBookings(existing.current_bookings));
        }
        input.check_schedule()?;

        let workshop = sqlx::query_as::<_, Workshop>(
            "UPDATE workshops SET
                title = $2, description = $3, instructor = $4, date = $5,
                start_time = $6, end_time = $7, location = $8, price = $9,
                max_capacity = $10, category = $11, image_url = $12, status = $13,
                updated_at = NOW()
             WHERE id = $1
             RETURNING *"
        )
        .bind(workshop_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.instructor)
        .bind(input.date)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.location)
        .bind(input.price)
        .bind(input.max_capacity)
        .bind(input.category())
        .bind(input.image_url.as_deref())
        .bind(input.status.unwrap_or(WorkshopStatus::Active))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(workshop_id, "workshop updated");
        Ok(workshop)
    }

    /// Удаляет мастер-класс, на который никто никогда не записывался.
    pub async fn delete(&self, workshop_id: i64) -> Result<(), CatalogError> {
        let mut tx = self.db.pool.begin().await?;

        lock_workshop(&mut tx, workshop_id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        // брони не удаляются физически, поэтому любая запись блокирует удаление
        let has_bookings = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE workshop_id = $1)"
        )
        .bind(workshop_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_bookings {
            return Err(CatalogError::HasBookings);
        }

        sqlx::query("DELETE FROM workshops WHERE id = $1")
            .bind(workshop_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(workshop_id, "workshop deleted");
        Ok(())
    }
}

fn listing_select(viewer: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT w.*,
                GREATEST(w.max_capacity - w.current_bookings, 0) AS available_seats,
                (w.current_bookings >= w.max_capacity) AS is_full, "
    );
    match viewer {
        Some(user_id) => {
            qb.push(
                "EXISTS(SELECT 1 FROM bookings b
                        WHERE b.workshop_id = w.id AND b.status = 'confirmed' AND b.user_id = "
            );
            qb.push_bind(user_id);
            qb.push(") AS user_has_booked");
        }
        None => {
            qb.push("NULL::BOOLEAN AS user_has_booked");
        }
    }
    qb.push(" FROM workshops w");
    qb
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &WorkshopFilter) {
    qb.push(" WHERE w.status = ");
    qb.push_bind(filter.status);

    if let Some(category) = filter.category.as_deref() {
        qb.push(" AND w.category = ");
        qb.push_bind(category.to_string());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (w.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR w.description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR w.instructor ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(date_from) = filter.date_from {
        qb.push(" AND w.date >= ");
        qb.push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        qb.push(" AND w.date <= ");
        qb.push_bind(date_to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(start: &str, end: &str) -> WorkshopInput {
        serde_json::from_value(json!({
            "title": "Pottery basics",
            "description": "Throwing your first bowl on the wheel",
            "instructor": "Ada Clay",
            "date": "2030-03-01",
            "start_time": start,
            "end_time": end,
            "location": "Studio 4",
            "price": 25.5,
            "max_capacity": 8,
            "category": "Crafts"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_short_and_long_time_formats() {
        let w = input("10:00", "12:30:00");
        assert_eq!(w.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(w.end_time, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert!(w.check_schedule().is_ok());
    }

    #[test]
    fn rejects_garbage_time() {
        let result: Result<WorkshopInput, _> = serde_json::from_value(json!({
            "title": "Pottery basics",
            "description": "Throwing your first bowl on the wheel",
            "instructor": "Ada Clay",
            "date": "2030-03-01",
            "start_time": "25:99",
            "end_time": "12:00",
            "location": "Studio 4",
            "price": 10,
            "max_capacity": 8
        }));
        assert!(result.is_err());
    }

    #[test]
    fn end_must_follow_start() {
        assert!(matches!(
            input("12:00", "12:00").check_schedule(),
            Err(CatalogError::InvalidSchedule)
        ));
        assert!(matches!(
            input("13:00", "12:00").check_schedule(),
            Err(CatalogError::InvalidSchedule)
        ));
    }

    #[test]
    fn date_before_today_is_rejected() {
        let w = input("10:00", "11:00");
        let today = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();
        assert!(matches!(w.check_not_in_past(today), Err(CatalogError::DateInPast)));
        assert!(w.check_not_in_past(w.date).is_ok());
    }

    #[test]
    fn field_validation_matches_form_rules() {
        let mut w = input("10:00", "11:00");
        assert!(w.validate().is_ok());

        w.title = "ab".to_string();
        w.max_capacity = 0;
        w.price = Decimal::new(-100, 2);
        let errors = w.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("max_capacity"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn blank_category_is_stored_as_null() {
        let mut w = input("10:00", "11:00");
        w.category = Some("   ".to_string());
        assert_eq!(w.category(), None);
    }
}
