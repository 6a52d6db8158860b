//! The `local_sticky_file` resource: schema, file writer and lifecycle hooks.

pub mod reconciler;
pub mod schema;
pub mod writer;
