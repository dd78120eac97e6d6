//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, extractors
//! - `modules`: one module per resource (dto + handlers)
//! - `router`: route table and Swagger documentation

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc, AppState};
