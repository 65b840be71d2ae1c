//! Command implementations

pub mod ask;
pub mod log;
pub mod rate;
pub mod status;
