//! Plan-time attribute validation, defaulting and action selection.

pub mod modifier;
pub mod planner;
pub mod validator;
