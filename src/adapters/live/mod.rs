//! Live adapters for real external interactions.

pub mod audit;
pub mod backend;
pub mod classifier;
pub mod clock;
pub mod knowledge;
pub mod screening;
