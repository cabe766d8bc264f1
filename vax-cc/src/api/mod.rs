//! HTTP API for vax-cc

pub mod coding;
pub mod health;
pub mod validate;

pub use coding::coding_routes;
pub use health::health_routes;
pub use validate::validate_routes;
