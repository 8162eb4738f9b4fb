//! Buckets and the flattening rule.
//!
//! A bucket is a scoping dimension such as a user id or a year. Facade calls
//! fan out over every requested bucket, computing one physical key per bucket,
//! and collect the per-bucket results into a [`Flattened`] value: a single
//! bucket comes back unwrapped, several come back keyed by rendered label.
//!
//! ```
//! use strata_core::{Buckets, Flattened};
//!
//! let buckets = Buckets::from(vec![("user", "42"), ("year", "2024")]);
//! assert_eq!(buckets.labels(":"), vec!["user:42", "year:2024"]);
//!
//! let single = Flattened::from_entries([("global".to_owned(), 2)]);
//! assert_eq!(single, Flattened::Single(2));
//! ```

use indexmap::IndexMap;

use crate::key::add_prefix;

/// A single scoping dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// A bucket used verbatim as a key prefix.
    Plain(String),
    /// A `kind` / `value` pair, rendered as `kind{separator}value`.
    Labeled {
        /// Bucket dimension, e.g. `user`.
        kind: String,
        /// Dimension value, e.g. `42`.
        value: String,
    },
}

impl Bucket {
    /// Creates a plain bucket.
    pub fn plain(name: impl Into<String>) -> Self {
        Bucket::Plain(name.into())
    }

    /// Creates a `kind:value` bucket.
    pub fn labeled(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Bucket::Labeled {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Renders the bucket as a key prefix.
    pub fn label(&self, separator: &str) -> String {
        match self {
            Bucket::Plain(name) => name.clone(),
            Bucket::Labeled { kind, value } => add_prefix(value, kind, separator),
        }
    }
}

impl From<&str> for Bucket {
    fn from(name: &str) -> Self {
        Bucket::plain(name)
    }
}

impl From<String> for Bucket {
    fn from(name: String) -> Self {
        Bucket::Plain(name)
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Bucket {
    fn from((kind, value): (K, V)) -> Self {
        Bucket::labeled(kind, value)
    }
}

/// An ordered list of buckets a call fans out to.
///
/// Plain names and `kind:value` pairs can be mixed freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets(Vec<Bucket>);

impl Buckets {
    /// Creates an empty bucket list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plain bucket.
    pub fn plain(mut self, name: impl Into<String>) -> Self {
        self.0.push(Bucket::plain(name));
        self
    }

    /// Appends a `kind:value` bucket.
    pub fn labeled(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push(Bucket::labeled(kind, value));
        self
    }

    /// Whether no bucket was requested.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of requested buckets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the buckets in request order.
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.0.iter()
    }

    /// Rendered labels, in request order.
    pub fn labels(&self, separator: &str) -> Vec<String> {
        self.0.iter().map(|bucket| bucket.label(separator)).collect()
    }

    /// Returns `self`, or a list holding only `default` when empty.
    pub fn or_default_bucket(self, default: &str) -> Self {
        if self.0.is_empty() {
            Buckets(vec![Bucket::plain(default)])
        } else {
            self
        }
    }
}

impl From<Bucket> for Buckets {
    fn from(bucket: Bucket) -> Self {
        Buckets(vec![bucket])
    }
}

impl From<&str> for Buckets {
    fn from(name: &str) -> Self {
        Buckets(vec![Bucket::plain(name)])
    }
}

impl From<String> for Buckets {
    fn from(name: String) -> Self {
        Buckets(vec![Bucket::Plain(name)])
    }
}

impl From<&String> for Buckets {
    fn from(name: &String) -> Self {
        Buckets(vec![Bucket::plain(name.as_str())])
    }
}

impl<T: Into<Bucket>> From<Vec<T>> for Buckets {
    fn from(buckets: Vec<T>) -> Self {
        buckets.into_iter().collect()
    }
}

impl<T: Into<Bucket>, const N: usize> From<[T; N]> for Buckets {
    fn from(buckets: [T; N]) -> Self {
        buckets.into_iter().collect()
    }
}

impl<T: Into<Bucket>> FromIterator<T> for Buckets {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Buckets(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Buckets {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A per-bucket result under the flattening rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Flattened<T> {
    /// Exactly one bucket was involved; its result, unwrapped.
    Single(T),
    /// Two or more buckets, keyed by rendered label in request order.
    Keyed(IndexMap<String, T>),
}

impl<T> Flattened<T> {
    /// Applies the flattening rule to `(label, value)` pairs.
    ///
    /// Repeated labels collapse onto their last value. One distinct label
    /// yields [`Flattened::Single`]; anything else yields [`Flattened::Keyed`].
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, T)>,
    {
        let mut keyed: IndexMap<String, T> = entries.into_iter().collect();
        if keyed.len() == 1 {
            if let Some((_, value)) = keyed.pop() {
                return Flattened::Single(value);
            }
        }
        Flattened::Keyed(keyed)
    }

    /// The unwrapped value, if exactly one bucket was involved.
    pub fn into_single(self) -> Option<T> {
        match self {
            Flattened::Single(value) => Some(value),
            Flattened::Keyed(_) => None,
        }
    }

    /// The keyed map, if several buckets were involved.
    pub fn into_keyed(self) -> Option<IndexMap<String, T>> {
        match self {
            Flattened::Single(_) => None,
            Flattened::Keyed(keyed) => Some(keyed),
        }
    }

    /// The single value, or the value stored under `label`.
    pub fn get(&self, label: &str) -> Option<&T> {
        match self {
            Flattened::Single(value) => Some(value),
            Flattened::Keyed(keyed) => keyed.get(label),
        }
    }

    /// Maps every contained value.
    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> Flattened<U> {
        match self {
            Flattened::Single(value) => Flattened::Single(f(value)),
            Flattened::Keyed(keyed) => {
                Flattened::Keyed(keyed.into_iter().map(|(label, value)| (label, f(value))).collect())
            }
        }
    }

    /// Number of contained values.
    pub fn len(&self) -> usize {
        match self {
            Flattened::Single(_) => 1,
            Flattened::Keyed(keyed) => keyed.len(),
        }
    }

    /// Whether no value is contained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the contained values in order.
    pub fn values(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Flattened::Single(value) => Box::new(std::iter::once(value)),
            Flattened::Keyed(keyed) => Box::new(keyed.values()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labels() {
        assert_eq!(Buckets::from("global").labels(":"), vec!["global"]);
        assert_eq!(Buckets::from(["foo", "bar"]).labels(":"), vec!["foo", "bar"]);
        assert_eq!(
            Buckets::from([("user", "42"), ("year", "2024")]).labels("|"),
            vec!["user|42", "year|2024"]
        );
    }

    #[test]
    fn test_mixed_buckets() {
        let buckets = Buckets::new().plain("global").labeled("user", "7");
        assert_eq!(buckets.labels(":"), vec!["global", "user:7"]);
    }

    #[test]
    fn test_default_bucket() {
        assert_eq!(Buckets::new().or_default_bucket("global"), Buckets::from("global"));
        assert_eq!(
            Buckets::from("mine").or_default_bucket("global"),
            Buckets::from("mine")
        );
    }

    #[test]
    fn test_flattening_rule() {
        let one = Flattened::from_entries([("a".to_owned(), 1)]);
        assert_eq!(one, Flattened::Single(1));

        let two = Flattened::from_entries([("a".to_owned(), 1), ("b".to_owned(), 2)]);
        let expected: IndexMap<String, i32> =
            [("a".to_owned(), 1), ("b".to_owned(), 2)].into_iter().collect();
        assert_eq!(two, Flattened::Keyed(expected));

        let none: Flattened<i32> = Flattened::from_entries(Vec::new());
        assert!(none.is_empty());
    }

    #[test]
    fn test_duplicate_labels_collapse() {
        let dup = Flattened::from_entries([("a".to_owned(), 1), ("a".to_owned(), 3)]);
        assert_eq!(dup, Flattened::Single(3));
    }

    #[test]
    fn test_map_and_get() {
        let keyed = Flattened::from_entries([("a".to_owned(), 1), ("b".to_owned(), 2)]).map(|v| v * 10);
        assert_eq!(keyed.get("b"), Some(&20));
        assert_eq!(keyed.values().copied().sum::<i32>(), 30);
        assert_eq!(Flattened::Single(5).get("anything"), Some(&5));
    }
}
