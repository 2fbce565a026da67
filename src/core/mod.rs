pub mod aggregate;
pub mod model;
pub mod periods;
pub mod split_trace;
pub mod units;
