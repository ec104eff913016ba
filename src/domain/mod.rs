// Domain layer: request models and the ports the booking flow talks through.

pub mod model;
pub mod ports;
