//! Domain model: tags, purge targets, and invalidation outcomes.

pub mod error;
pub mod invalidation;
pub mod paths;
pub mod tags;
