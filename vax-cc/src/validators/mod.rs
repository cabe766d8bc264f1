//! Record validation

pub mod dashboard;
