#![forbid(unsafe_code)]

//! Sticky local files: a `local_sticky_file` resource that keeps a file in
//! existence across runs, even where disk state is not preserved.
//!
//! Layers, bottom up:
//! 1. **Model** ([`model`]): attribute values, records, diagnostics.
//! 2. **Plan** ([`plan`]): permission validation, defaulting, and action selection.
//! 3. **Resource** ([`resource`]): the file writer and the lifecycle reconciler
//!    (create, read with self-heal, update, delete, import).
//! 4. **Host** ([`host`]): a manifest, a JSON state store, and a driver that
//!    runs the hooks the way an infrastructure runtime would.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use sticky_file::prelude::*;
//!
//! let mut resource = StickyFileResource::new();
//! let outcome = resource.create(&ManagedFile::new("/tmp/motd", "hello\n", "0644"));
//! assert!(outcome.succeeded());
//! ```

pub mod prelude;

pub mod core;
pub mod host;
pub mod logger;
pub mod model;
pub mod plan;
pub mod resource;
