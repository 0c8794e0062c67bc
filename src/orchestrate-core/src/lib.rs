//! Orchestrate Core Library
//!
//! This crate provides the request-side building blocks of the client:
//! - Timestamp normalization
//! - Range parameter validation
//! - Ref formatting and conditional headers
//! - Request construction
//! - Error taxonomy
//! - Client configuration

pub mod config;
pub mod error;
pub mod models;
pub mod range;
pub mod refs;
pub mod request;
pub mod timestamp;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ApiError, Error, Result, SearchParamError};
pub use models::*;
pub use range::{validate_range, EventRange, RangeOptions};
pub use refs::{format_ref, Condition};
pub use request::{OperationRequest, RequestParts};
pub use timestamp::{normalize, NormalizedTimestamp, Timestamp};
