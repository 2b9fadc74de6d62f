pub mod health;
pub mod storms;
