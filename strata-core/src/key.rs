//! Key resolution.
//!
//! Every key strata sends to a store is derived from a *logical name* by the
//! [`KeyResolver`]. Resolution happens in three steps:
//!
//! 1. An optional `prefix` (a bucket) is joined in front of the name.
//! 2. An optional `namespace` is joined in front of that, so the namespace is
//!    always the outer wrapper.
//! 3. The result is substituted into the key template. `{:environment}` is
//!    replaced with the resolver's environment tag, `{:key}` with the name, and
//!    any registered replacement tokens with their values. A template without
//!    `{:key}` gets `{separator}{:key}` appended.
//!
//! Leading and trailing separator characters are trimmed after every join, so
//! an empty name never leaves a dangling separator behind.
//!
//! ```
//! use strata_core::{KeyOptions, KeyResolver};
//!
//! let resolver = KeyResolver::new("test").with_format("app:{:environment}:{:key}");
//!
//! assert_eq!(resolver.resolve_key("foo", &KeyOptions::default()), "app:test:foo");
//! assert_eq!(resolver.resolve_key("", &KeyOptions::default()), "app:test");
//!
//! let options = KeyOptions::new().namespace("stats").prefix("user:42");
//! assert_eq!(resolver.resolve_key("requests", &options), "app:test:stats:user:42:requests");
//! ```
//!
//! The inverse, [`KeyResolver::clean_key`], is a plain string trim of the
//! resolved prefix. It is lossy for names that begin with the separator.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::expiry::Expiry;

/// Template used when neither the resolver nor the call supplies one.
pub const DEFAULT_FORMAT: &str = "{:environment}:{:key}";
/// Separator used when neither the resolver nor the call supplies one.
pub const DEFAULT_SEPARATOR: &str = ":";
/// Environment tag used when the host does not provide one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

const KEY_TOKEN: &str = "{:key}";
const ENVIRONMENT_TOKEN: &str = "{:environment}";

/// Per-call options for key resolution.
///
/// Every field is optional; unset fields fall back to the resolver defaults.
/// The builder methods consume and return `self` so options read like the
/// calls they decorate:
///
/// ```
/// use strata_core::KeyOptions;
///
/// let options = KeyOptions::new().namespace("leaderboards").separator("|");
/// assert_eq!(options.namespace.as_deref(), Some("leaderboards"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOptions {
    /// Template overriding the resolver's template.
    pub format: Option<String>,
    /// Separator overriding the resolver's separator.
    pub separator: Option<String>,
    /// Bucket joined directly in front of the logical name.
    pub prefix: Option<String>,
    /// Namespace joined in front of the prefixed name.
    pub namespace: Option<String>,
    /// Extra placeholder substitutions, applied before the resolver's own.
    pub replacements: Vec<(String, String)>,
    /// Return store keys untouched instead of cleaning them.
    pub raw: bool,
    /// Expiration applied after writes.
    pub expiry: Option<Expiry>,
}

impl KeyOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key template.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Sets the bucket prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Registers a placeholder substitution such as `{:app}`.
    pub fn replacement(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.replacements.push((token.into(), value.into()));
        self
    }

    /// Keeps store keys raw when presenting search results.
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Sets the expiry applied after writes.
    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Fills the namespace if the caller did not set one.
    pub fn or_namespace(mut self, namespace: &str) -> Self {
        if self.namespace.is_none() {
            self.namespace = Some(namespace.to_owned());
        }
        self
    }
}

/// Deterministic mapping between logical names and physical store keys.
///
/// A resolver is plain configuration: cloning it is cheap enough to hand one to
/// every component, and swapping it for a differently configured one takes
/// effect on the next resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResolver {
    format: String,
    separator: String,
    environment: SmolStr,
    replacements: Vec<(String, String)>,
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ENVIRONMENT)
    }
}

impl KeyResolver {
    /// Creates a resolver for the given runtime environment tag with the
    /// default template and separator.
    pub fn new(environment: impl Into<SmolStr>) -> Self {
        Self {
            format: DEFAULT_FORMAT.to_owned(),
            separator: DEFAULT_SEPARATOR.to_owned(),
            environment: environment.into(),
            replacements: Vec::new(),
        }
    }

    /// Sets the default key template.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the default separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Registers a default placeholder substitution.
    pub fn with_replacement(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.replacements.push((token.into(), value.into()));
        self
    }

    /// Default key template.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Default separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Runtime environment tag substituted for `{:environment}`.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn separator_for<'a>(&'a self, options: &'a KeyOptions) -> &'a str {
        options.separator.as_deref().unwrap_or(&self.separator)
    }

    /// Substitutes `name` and the environment into the template.
    ///
    /// ```
    /// use strata_core::{KeyOptions, KeyResolver};
    ///
    /// let resolver = KeyResolver::new("test");
    /// let options = KeyOptions::new().format("{:environment}");
    /// assert_eq!(resolver.resolve_format("foo", &options), "test:foo");
    /// assert_eq!(resolver.resolve_format("", &options), "test");
    /// ```
    pub fn resolve_format(&self, name: &str, options: &KeyOptions) -> String {
        let separator = self.separator_for(options);
        let template = options.format.as_deref().unwrap_or(&self.format);

        let mut resolved = if template.contains(KEY_TOKEN) {
            template.to_owned()
        } else {
            format!("{template}{separator}{KEY_TOKEN}")
        };

        resolved = resolved.replace(ENVIRONMENT_TOKEN, &self.environment);
        for (token, value) in options.replacements.iter().chain(&self.replacements) {
            resolved = resolved.replace(token.as_str(), value);
        }
        resolved = resolved.replace(KEY_TOKEN, name);

        trim_separator(&resolved, separator).to_owned()
    }

    /// Joins `prefix` in front of `key` using the effective separator.
    pub fn add_prefix(&self, key: &str, prefix: &str, options: &KeyOptions) -> String {
        add_prefix(key, prefix, self.separator_for(options))
    }

    /// Resolves a single logical name into a store key.
    pub fn resolve_key(&self, name: &str, options: &KeyOptions) -> String {
        let separator = self.separator_for(options);
        let mut name = name.to_owned();
        if let Some(prefix) = options.prefix.as_deref() {
            name = add_prefix(&name, prefix, separator);
        }
        if let Some(namespace) = options.namespace.as_deref() {
            name = add_prefix(&name, namespace, separator);
        }
        self.resolve_format(&name, options)
    }

    /// Resolves a list of names, keeping their positions.
    ///
    /// ```
    /// use strata_core::{KeyOptions, KeyResolver};
    ///
    /// let resolver = KeyResolver::new("test");
    /// let keys = resolver.resolve_keys(["foo", "bar"], &KeyOptions::new().format("app"));
    /// assert_eq!(keys, vec!["app:foo", "app:bar"]);
    /// ```
    pub fn resolve_keys<I, S>(&self, names: I, options: &KeyOptions) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| self.resolve_key(name.as_ref(), options))
            .collect()
    }

    /// Resolves the values of a labelled collection, keeping the labels.
    pub fn resolve_keyed<K, S>(&self, names: IndexMap<K, S>, options: &KeyOptions) -> IndexMap<K, String>
    where
        K: std::hash::Hash + Eq,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|(label, name)| {
                let key = self.resolve_key(name.as_ref(), options);
                (label, key)
            })
            .collect()
    }

    /// The resolved key of an empty name: everything a resolved key carries
    /// in front of the logical name.
    pub fn resolve_prefix(&self, options: &KeyOptions) -> String {
        self.resolve_key("", options)
    }

    /// Strips `qualified_prefix` plus separator off the front of `key`.
    ///
    /// Keys that do not carry the prefix, and every key when `options.raw` is
    /// set, are returned unchanged.
    ///
    /// ```
    /// use strata_core::{KeyOptions, KeyResolver};
    ///
    /// let resolver = KeyResolver::default();
    /// let clean = resolver.clean_key("app:test:foo", "app:test:foo:bar:baz", &KeyOptions::new());
    /// assert_eq!(clean, "bar:baz");
    /// ```
    pub fn clean_key(&self, qualified_prefix: &str, key: &str, options: &KeyOptions) -> String {
        if options.raw || qualified_prefix.is_empty() {
            return key.to_owned();
        }
        let separator = self.separator_for(options);
        key.strip_prefix(qualified_prefix)
            .and_then(|rest| rest.strip_prefix(separator))
            .unwrap_or(key)
            .to_owned()
    }

    /// Cleans every key of a keyed collection, preserving order and values.
    pub fn clean_keys<V, I>(&self, qualified_prefix: &str, data: I, options: &KeyOptions) -> IndexMap<String, V>
    where
        I: IntoIterator<Item = (String, V)>,
    {
        data.into_iter()
            .map(|(key, value)| (self.clean_key(qualified_prefix, &key, options), value))
            .collect()
    }

    /// Cleans a plain list of keys.
    pub fn clean_names<I>(&self, qualified_prefix: &str, keys: I, options: &KeyOptions) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        keys.into_iter()
            .map(|key| self.clean_key(qualified_prefix, &key, options))
            .collect()
    }
}

/// Joins `prefix` and `key` with `separator`, trimming stray separators.
///
/// An empty prefix is a no-op; an empty key yields the prefix alone.
///
/// ```
/// use strata_core::add_prefix;
///
/// assert_eq!(add_prefix("bar", "foo", ":"), "foo:bar");
/// assert_eq!(add_prefix("bar", "", "!"), "bar");
/// assert_eq!(add_prefix("", "foo", ":"), "foo");
/// ```
pub fn add_prefix(key: &str, prefix: &str, separator: &str) -> String {
    if prefix.is_empty() {
        return trim_separator(key, separator).to_owned();
    }
    let joined = format!("{prefix}{separator}{key}");
    trim_separator(&joined, separator).to_owned()
}

/// Trims every character of `separator` off both ends of `value`.
fn trim_separator<'a>(value: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return value;
    }
    value.trim_matches(|c: char| separator.contains(c))
}
