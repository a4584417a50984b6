pub mod cache;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod db;
mod error;
mod ids;
pub mod repository;
pub mod reservation;
pub mod sweeper;

pub use config::Config;
pub use error::{Error, Result};
