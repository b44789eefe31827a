pub mod backend;
pub mod executor_impl;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;
