pub mod clock;
pub mod combine;
pub mod config;
pub mod dashboard;
pub mod date_range;
pub mod error;
pub mod executor;
pub mod fragments;
pub mod gap_fill;
pub mod model;
pub mod pipeline;
pub mod record;
