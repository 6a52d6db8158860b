//! Plan-time default for optional string attributes.

use crate::model::value::AttrValue;

/// Permissions carried into the plan when the caller omits them.
pub const DEFAULT_PERMISSIONS: &str = "0666";

/// Substitutes a fixed default when the configured value is absent.
///
/// The modifier does not validate its own output: the default literal must
/// already satisfy [`PermissionsValidator`](super::validator::PermissionsValidator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultString(pub &'static str);

impl DefaultString {
    pub fn description(&self) -> String {
        format!("If value is not configured, defaults to: {}", self.0)
    }

    pub fn modify(&self, configured: AttrValue<String>) -> AttrValue<String> {
        match configured {
            AttrValue::Absent => AttrValue::Present(self.0.to_string()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::validator::validate_octal;
    use proptest::prelude::*;

    #[test]
    fn absent_becomes_default() {
        let m = DefaultString(DEFAULT_PERMISSIONS);
        assert_eq!(
            m.modify(AttrValue::Absent),
            AttrValue::Present("0666".to_string())
        );
    }

    #[test]
    fn unknown_stays_unknown() {
        let m = DefaultString(DEFAULT_PERMISSIONS);
        assert_eq!(m.modify(AttrValue::Unknown), AttrValue::Unknown);
    }

    #[test]
    fn default_literal_is_a_valid_mode() {
        assert_eq!(validate_octal(DEFAULT_PERMISSIONS).unwrap(), 0o666);
    }

    #[test]
    fn description_mentions_default() {
        assert!(DefaultString("0600").description().ends_with("0600"));
    }

    proptest! {
        #[test]
        fn present_values_pass_through(raw in ".*") {
            let m = DefaultString(DEFAULT_PERMISSIONS);
            prop_assert_eq!(
                m.modify(AttrValue::Present(raw.clone())),
                AttrValue::Present(raw)
            );
        }
    }
}
