/// Re-export `Config` from `shopdash-core` for use within this crate.
///
/// Environment parsing lives in the core crate so integration tests can
/// build a `Config` without depending on the server binary.
pub use shopdash_core::config::Config;
