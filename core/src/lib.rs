pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;
pub mod week;

pub use error::{MealError, Result};
