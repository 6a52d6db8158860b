//! Turns configured attributes into a planned record and a lifecycle action.

use serde::Serialize;

use crate::core::errors::StickyError;
use crate::model::diagnostics::Diagnostics;
use crate::model::file::{FileConfig, ManagedFile};
use crate::model::value::AttrValue;

use super::modifier::{DEFAULT_PERMISSIONS, DefaultString};
use super::validator::PermissionsValidator;

/// What the host has to do to converge a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    /// `path` changed: destroy the old file, then create the new one.
    Replace,
    Delete,
    NoOp,
}

impl PlanAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        }
    }
}

/// A validated, defaulted record plus the action it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub action: PlanAction,
    pub planned: ManagedFile,
}

/// Validate and default `config`, then compare it against `prior`.
///
/// All attribute problems are reported together.
pub fn plan(config: &FileConfig, prior: Option<&ManagedFile>) -> Result<Plan, Diagnostics> {
    let mut diags = Diagnostics::new();

    if let Err(err) = PermissionsValidator::new(true).validate(&config.permissions) {
        diags.push(err);
    }
    let permissions = DefaultString(DEFAULT_PERMISSIONS).modify(config.permissions.clone());

    let path = resolved("path", &config.path, &mut diags);
    let content = resolved("content", &config.content, &mut diags);
    let permissions = resolved("permissions", &permissions, &mut diags);

    if path.is_some_and(String::is_empty) {
        diags.push(StickyError::validation("path", "path cannot be an empty string"));
    }

    let (Some(path), Some(content), Some(permissions)) = (path, content, permissions) else {
        return Err(diags);
    };
    if diags.has_error() {
        return Err(diags);
    }

    let planned = ManagedFile::new(path.clone(), content.clone(), permissions.clone());
    let action = match prior {
        None => PlanAction::Create,
        Some(prior) if prior.path != planned.path => PlanAction::Replace,
        Some(prior) if *prior == planned => PlanAction::NoOp,
        Some(_) => PlanAction::Update,
    };
    Ok(Plan { action, planned })
}

fn resolved<'a>(
    attribute: &'static str,
    value: &'a AttrValue<String>,
    diags: &mut Diagnostics,
) -> Option<&'a String> {
    match value {
        AttrValue::Present(v) => Some(v),
        AttrValue::Absent => {
            diags.push(StickyError::validation(
                attribute,
                format!("attribute {attribute:?} is required"),
            ));
            None
        }
        AttrValue::Unknown => {
            diags.push(StickyError::validation(
                attribute,
                format!("value of {attribute:?} is not yet known"),
            ));
            None
        }
    }
}
