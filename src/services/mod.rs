pub mod accounts;
pub mod catalog;
pub mod ledger;
pub mod tokens;
