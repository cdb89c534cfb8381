//! API 目录领域模块

#![allow(clippy::module_inception)]

pub mod api;
pub mod repository;

pub use api::{ApiEndpoint, ApiId, normalize_method};
pub use repository::ApiRepository;
