pub mod client;
pub mod error;
pub mod region;
pub mod writer;

#[cfg(test)]
pub mod fake;

pub use client::S3Connector;
pub use error::UploadError;
pub use region::RegionResolver;
pub use writer::{public_url, ObjectWriter};
