//! Coding pipeline services

pub mod coding_client;
pub mod coding_pipeline;
pub mod location_assignment;
pub mod response_parser;
pub mod translator;
