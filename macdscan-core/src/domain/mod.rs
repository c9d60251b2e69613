//! Domain types for MACDScan

pub mod bar;
pub mod fundamentals;
pub mod series;

pub use bar::Bar;
pub use fundamentals::Fundamentals;
pub use series::validate_series;
