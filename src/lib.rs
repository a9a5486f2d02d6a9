//! Tag-scoped cache revalidation across local, origin, edge and CDN caches.

pub mod application;
pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod infra;
