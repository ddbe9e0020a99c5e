pub mod config;
pub mod error;
pub mod object_key;
pub mod plan;
pub mod quota;
