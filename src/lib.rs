pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LocalStorage, ServiceTable, WebDriverFactory};
pub use config::AppConfig;
pub use core::{BookingSequencer, JobRunner, Pacer};
pub use domain::model::{BookingRequest, BrowserProfile, ResolvedBooking};
pub use utils::error::{BookingError, Result};
