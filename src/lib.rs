pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod observability;
pub mod routes;

pub use db::{create_pool, create_read_pool, create_write_pool};
pub use routes::AppState;
