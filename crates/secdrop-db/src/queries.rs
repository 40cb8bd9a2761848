//! Database query functions organized by concern.

pub mod drops;
pub mod sweep;
