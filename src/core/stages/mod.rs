//! 各階段的實作，皆為 `BookingSequencer` 的方法

mod appointment;
mod branch;
mod customer;
mod services;

pub use services::service_target;
