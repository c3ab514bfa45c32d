pub mod errors;
pub mod manager;
pub mod models;
pub mod postgres;
pub mod repository;

pub use errors::RepositoryError;
pub use manager::{Database, DatabaseError};
pub use repository::Repositories;
