//! Values read from and written to a store.

use std::fmt;

use indexmap::IndexMap;

use crate::bucket::Flattened;

/// A hash as stored: field name to raw string value, in store order.
pub type Hash = IndexMap<String, String>;

/// What a single key holds, as seen by the key/value layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreValue {
    /// A plain string value.
    Scalar(String),
    /// A hash with at least one field.
    Hash(Hash),
    /// Nothing usable is stored under the key.
    #[default]
    Missing,
}

impl StoreValue {
    /// Whether the key held nothing.
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreValue::Missing)
    }

    /// The scalar value, if the key held one.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            StoreValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The hash, if the key held one.
    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            StoreValue::Hash(hash) => Some(hash),
            _ => None,
        }
    }
}

/// A hash field value supplied by a caller.
///
/// Numeric values drive increments: integers use integer increments, floats use
/// float increments, and text is written verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// Anything else.
    Text(String),
}

impl FieldValue {
    /// Interprets raw text the way a store would: integers first, then
    /// decimals, otherwise text.
    ///
    /// ```
    /// use strata_core::FieldValue;
    ///
    /// assert_eq!(FieldValue::classify("12"), FieldValue::Int(12));
    /// assert_eq!(FieldValue::classify("2.5"), FieldValue::Float(2.5));
    /// assert_eq!(FieldValue::classify("text"), FieldValue::Text("text".into()));
    /// ```
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(int) = trimmed.parse::<i64>() {
            return FieldValue::Int(int);
        }
        if trimmed.contains('.') {
            if let Ok(float) = trimmed.parse::<f64>() {
                if float.is_finite() {
                    return FieldValue::Float(float);
                }
            }
        }
        FieldValue::Text(raw.to_owned())
    }

    /// The value with its sign inverted. Text is left as is.
    ///
    /// `None` if the integer has no positive counterpart (`i64::MIN`).
    pub fn negate(self) -> Option<Self> {
        match self {
            FieldValue::Int(int) => int.checked_neg().map(FieldValue::Int),
            FieldValue::Float(float) => Some(FieldValue::Float(-float)),
            text @ FieldValue::Text(_) => Some(text),
        }
    }

    /// Text that reads as a number becomes that number.
    pub fn numeric(self) -> Self {
        match self {
            FieldValue::Text(text) => FieldValue::classify(&text),
            number => number,
        }
    }

    /// Whether the value is a number.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldValue::Text(_))
    }

    /// The value as a float, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(int) => Some(*int as f64),
            FieldValue::Float(float) => Some(*float),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(int) => write!(f, "{int}"),
            FieldValue::Float(float) => write!(f, "{float}"),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// An ordered set of hash fields with their values.
///
/// A bare field name converts to that field with value `1`, which is the
/// shorthand used by counters:
///
/// ```
/// use strata_core::{FieldValue, FieldValues};
///
/// let fields = FieldValues::from("requests");
/// assert_eq!(fields.get("requests"), Some(&FieldValue::Int(1)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(IndexMap<String, FieldValue>);

impl FieldValues {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// The value of `field`.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates fields and values in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every value with its sign inverted, or `None` if one cannot be.
    pub fn negate(self) -> Option<Self> {
        self.0
            .into_iter()
            .map(|(field, value)| Some((field, value.negate()?)))
            .collect::<Option<IndexMap<_, _>>>()
            .map(FieldValues)
    }

    /// Every text value that reads as a number becomes that number, so
    /// `"5"` increments like `5`.
    pub fn numeric(self) -> Self {
        FieldValues(
            self.0
                .into_iter()
                .map(|(field, value)| (field, value.numeric()))
                .collect(),
        )
    }

    /// Raw string pairs, as handed to a store.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(field, value)| (field.clone(), value.to_string()))
            .collect()
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<&str> for FieldValues {
    fn from(field: &str) -> Self {
        FieldValues::new().with(field, 1i64)
    }
}

impl From<String> for FieldValues {
    fn from(field: String) -> Self {
        FieldValues::new().with(field, 1i64)
    }
}

impl From<Hash> for FieldValues {
    fn from(hash: Hash) -> Self {
        hash.into_iter()
            .map(|(field, value)| {
                let value = FieldValue::classify(&value);
                (field, value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> From<Vec<(K, V)>> for FieldValues {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>, const N: usize> From<[(K, V); N]> for FieldValues {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FieldValues(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

/// A value handed to a write: a scalar or a set of hash fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Stored as a plain string.
    Scalar(String),
    /// Stored as a hash.
    Hash(FieldValues),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<FieldValues> for Value {
    fn from(fields: FieldValues) -> Self {
        Value::Hash(fields)
    }
}

impl From<Hash> for Value {
    fn from(hash: Hash) -> Self {
        Value::Hash(hash.into())
    }
}

/// The result of reading a hash.
#[derive(Debug, Clone, PartialEq)]
pub enum HashRead {
    /// No fields were requested: the whole hash.
    All(Hash),
    /// The requested fields. `None` marks a field that does not exist.
    Fields(Flattened<Option<String>>),
}

impl HashRead {
    /// The single requested field's value, if one field was requested and it exists.
    pub fn single(&self) -> Option<&str> {
        match self {
            HashRead::Fields(Flattened::Single(value)) => value.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(FieldValue::classify("-3"), FieldValue::Int(-3));
        assert_eq!(FieldValue::classify("0.5"), FieldValue::Float(0.5));
        assert_eq!(FieldValue::classify("1e5"), FieldValue::Text("1e5".into()));
        assert_eq!(FieldValue::classify("inf"), FieldValue::Text("inf".into()));
        assert_eq!(FieldValue::classify(""), FieldValue::Text(String::new()));
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Int(3).to_string(), "3");
        assert_eq!(FieldValue::Float(2.5).to_string(), "2.5");
        assert_eq!(FieldValue::from("x").to_string(), "x");
    }

    #[test]
    fn test_negate() {
        let fields = FieldValues::from([("a", FieldValue::Int(1)), ("b", FieldValue::Float(2.5))])
            .with("c", "text")
            .negate()
            .unwrap();
        assert_eq!(fields.get("a"), Some(&FieldValue::Int(-1)));
        assert_eq!(fields.get("b"), Some(&FieldValue::Float(-2.5)));
        assert_eq!(fields.get("c"), Some(&FieldValue::Text("text".into())));
    }

    #[test]
    fn test_negate_min_int_fails() {
        assert_eq!(FieldValue::Int(i64::MIN).negate(), None);
        assert_eq!(FieldValues::new().with("a", i64::MIN).negate(), None);
        assert_eq!(FieldValue::Int(i64::MAX).negate(), Some(FieldValue::Int(-i64::MAX)));
    }

    #[test]
    fn test_numeric_text() {
        let fields = FieldValues::from([("n", "5"), ("f", "0.5"), ("t", "text")]).numeric();
        assert_eq!(fields.get("n"), Some(&FieldValue::Int(5)));
        assert_eq!(fields.get("f"), Some(&FieldValue::Float(0.5)));
        assert_eq!(fields.get("t"), Some(&FieldValue::Text("text".into())));
    }

    #[test]
    fn test_field_shorthand() {
        let fields = FieldValues::from("ok");
        assert_eq!(fields.to_pairs(), vec![("ok".to_owned(), "1".to_owned())]);
    }

    #[test]
    fn test_store_value_accessors() {
        let hash: Hash = [("a".to_owned(), "1".to_owned())].into_iter().collect();
        assert_eq!(StoreValue::Hash(hash.clone()).as_hash(), Some(&hash));
        assert_eq!(StoreValue::Scalar("x".into()).as_scalar(), Some("x"));
        assert!(StoreValue::default().is_missing());
    }
}
