#![warn(missing_docs)]
//! # strata-core
//!
//! Pure building blocks shared by every strata crate. Nothing in here talks to
//! a store: the types describe *which* physical key a logical name maps to and
//! *what* comes back from a store, so they can be unit tested in isolation.
//!
//! - [`KeyResolver`] turns a logical name plus [`KeyOptions`] into a fully
//!   qualified key (`{:environment}:{:key}` templates, namespaces, prefixes)
//!   and strips qualifiers off keys returned by wildcard searches.
//! - [`Buckets`] describes the scoping dimensions a facade call fans out to,
//!   and [`Flattened`] carries the per-bucket results back.
//! - [`StoreValue`], [`FieldValue`] and [`FieldValues`] model what is read
//!   from and written to a store.
//! - [`Expiry`] expresses absolute or relative key expiration.

pub mod bucket;
pub mod expiry;
pub mod key;
pub mod label;
pub mod value;

pub use bucket::{Bucket, Buckets, Flattened};
pub use expiry::Expiry;
pub use key::{
    DEFAULT_ENVIRONMENT, DEFAULT_FORMAT, DEFAULT_SEPARATOR, KeyOptions, KeyResolver, add_prefix,
};
pub use label::StoreLabel;
pub use value::{FieldValue, FieldValues, Hash, HashRead, StoreValue, Value};
#[doc(hidden)]
pub use smol_str::SmolStr;
