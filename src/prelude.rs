//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use sticky_file::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, StickyError};

// Model
pub use crate::model::diagnostics::{Diagnostic, Diagnostics};
pub use crate::model::file::{FileConfig, ManagedFile};
pub use crate::model::value::AttrValue;

// Plan
pub use crate::plan::planner::{Plan, PlanAction, plan};

// Resource
pub use crate::resource::reconciler::{Action, Outcome, StateChange, StickyFileResource};
pub use crate::resource::schema::{Schema, sticky_file_schema};

// Host
pub use crate::host::driver::{Driver, ResourceReport, RunReport};
pub use crate::host::manifest::Manifest;
pub use crate::host::store::StateStore;
