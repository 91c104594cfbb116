pub mod auth;
pub mod domains;
pub mod health;
