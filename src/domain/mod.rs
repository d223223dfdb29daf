// Domain layer: port types, values and the traits the rest of the crate plugs into.

pub mod model;
pub mod ports;
pub mod value;
