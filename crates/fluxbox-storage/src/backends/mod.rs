pub mod memory;
pub mod s3;
