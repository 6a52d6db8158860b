//! Configured attribute values before planning.

/// A configured attribute as the host hands it over.
///
/// `Unknown` means the host has not resolved the value yet (it depends on
/// something computed later); `Absent` means the caller never set it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrValue<T> {
    /// Value set by the caller.
    Present(T),
    /// Value omitted by the caller.
    #[default]
    Absent,
    /// Value not resolvable yet.
    Unknown,
}

impl<T> AttrValue<T> {
    /// Borrow the value if present.
    pub const fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent | Self::Unknown => None,
        }
    }

    /// Convert into the value if present.
    pub fn into_present(self) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent | Self::Unknown => None,
        }
    }

    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl<T> From<Option<T>> for AttrValue<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

impl From<&str> for AttrValue<String> {
    fn from(value: &str) -> Self {
        Self::Present(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_conversion_maps_none_to_absent() {
        assert_eq!(AttrValue::<String>::from(None), AttrValue::Absent);
        assert_eq!(
            AttrValue::from(Some("0644".to_string())),
            AttrValue::Present("0644".to_string())
        );
    }

    #[test]
    fn unknown_is_never_present() {
        let v: AttrValue<String> = AttrValue::Unknown;
        assert!(v.as_present().is_none());
        assert!(v.is_unknown());
        assert!(!v.is_absent());
    }
}
