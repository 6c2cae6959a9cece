//! S3 client and listing functionality.
//!
//! This module provides the object-store operations the pipeline consumes:
//! - Client configuration with LocalStack support
//! - Paginated object listing with streaming

mod client;
mod list;

pub use client::{S3Config, create_s3_client};
pub use list::list_objects;
