// Domain layer: typed records and the seams to external systems.

pub mod model;
pub mod ports;
