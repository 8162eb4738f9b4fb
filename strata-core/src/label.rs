//! Store names.
//!
//! Every store carries a short name, reported by `Store::label()` and copied
//! into each instrumented call, so logs and metrics can tell two stores of the
//! same kind apart (e.g. `sessions` and `scores`, both on Redis).

use std::fmt;

use smol_str::SmolStr;

/// Name of a store as it appears in logs and metric labels.
///
/// ```
/// use strata_core::StoreLabel;
///
/// const MEMORY: StoreLabel = StoreLabel::new_static("memory");
/// assert_eq!(MEMORY.as_str(), "memory");
/// assert_eq!(StoreLabel::from("scores").to_string(), "scores");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoreLabel(SmolStr);

impl StoreLabel {
    /// Creates a label.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    /// Creates a label from a string known at compile time.
    pub const fn new_static(name: &'static str) -> Self {
        Self(SmolStr::new_static(name))
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreLabel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StoreLabel {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for StoreLabel {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_and_owned_labels_compare_equal() {
        let label: StoreLabel = String::from("redis").into();
        assert_eq!(label, StoreLabel::new_static("redis"));
        assert_eq!(format!("{label}"), "redis");
    }

    #[test]
    fn test_default_label_is_empty() {
        assert_eq!(StoreLabel::default().as_str(), "");
    }
}
