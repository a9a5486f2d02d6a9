//! Application services: authentication, validation and the revalidation pipeline.

pub mod auth;
pub mod error;
pub mod remote;
pub mod report;
pub mod revalidate;
pub mod validation;
