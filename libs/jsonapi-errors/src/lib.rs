//! Error model for the JSON:API engine
//!
//! This crate provides pure data types for error handling, with no dependencies
//! on HTTP frameworks unless the `axum` feature is enabled. It includes:
//! - The error kind catalog (`ErrorKind`, `ErrDef`)
//! - JSON:API error objects (`ErrorObject`, `ErrorSource`)
//! - The aggregate error value (`JsonApiError`) and its error document
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod document;
pub mod error;
pub mod object;

pub use catalog::{ErrDef, ErrorKind};
pub use document::{APPLICATION_VND_API_JSON, ErrorDocument, JSONAPI_VERSION, JsonApiInfo};
pub use error::JsonApiError;
pub use object::{ErrorObject, ErrorSource};
