pub mod accounts;
pub mod backend;
pub mod payments;
pub mod schema;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `fluxbox_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
