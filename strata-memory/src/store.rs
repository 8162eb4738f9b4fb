//! In-memory store implementation.

use std::{
    cmp::Ordering,
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use strata_backend::{KeyType, ListEnd, Store, StoreResult};
use strata_core::{Hash, StoreLabel};
use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::{error::Error, pattern};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum Data {
    String(String),
    Hash(Hash),
    List(VecDeque<String>),
    SortedSet(HashMap<String, f64>),
}

impl Data {
    fn is_empty(&self) -> bool {
        match self {
            Data::String(_) => false,
            Data::Hash(hash) => hash.is_empty(),
            Data::List(list) => list.is_empty(),
            Data::SortedSet(set) => set.is_empty(),
        }
    }

    fn key_type(&self) -> KeyType {
        match self {
            Data::String(_) => KeyType::String,
            Data::Hash(_) => KeyType::Hash,
            Data::List(_) => KeyType::List,
            Data::SortedSet(_) => KeyType::SortedSet,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    data: Data,
    expire_at: Option<i64>,
}

impl Slot {
    fn new(data: Data) -> Self {
        Self {
            data,
            expire_at: None,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }
}

/// Store keeping every key in process memory.
///
/// Follows Redis semantics for the operations strata uses, including lazy
/// key expiry and removal of emptied hashes, lists and sorted sets. Clones
/// share the same data.
///
/// # Example
///
/// ```
/// use strata_backend::Store;
/// use strata_memory::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// store.set("greeting", "hello").await?;
/// assert_eq!(store.get("greeting").await?.as_deref(), Some("hello"));
/// assert_eq!(store.incr_by("visits", 2).await?, 2);
/// # Ok::<_, strata_backend::StoreError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    data: Arc<DashMap<String, Slot>>,
    label: StoreLabel,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            label: StoreLabel::new_static("memory"),
        }
    }

    /// Sets a custom label for this store.
    pub fn with_label(mut self, label: impl Into<StoreLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Utc::now().timestamp();
        self.data.retain(|_, slot| !slot.is_expired(now));
        self.data.len()
    }

    /// Whether the store holds no live key.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(&self, key: &str) {
        let now = Utc::now().timestamp();
        self.data.remove_if(key, |_, slot| slot.is_expired(now));
    }

    fn inspect<T>(&self, key: &str, f: impl FnOnce(Option<&Data>) -> Result<T, Error>) -> StoreResult<T> {
        self.purge(key);
        let slot = self.data.get(key);
        Ok(f(slot.as_ref().map(|slot| &slot.value().data))?)
    }

    /// Runs `f` on the value under `key`, creating it with `create` first if
    /// missing. Emptied containers are removed afterwards.
    fn mutate<T>(
        &self,
        key: &str,
        create: impl FnOnce() -> Data,
        f: impl FnOnce(&mut Data) -> Result<T, Error>,
    ) -> StoreResult<T> {
        self.purge(key);
        let result = {
            let mut slot = self
                .data
                .entry(key.to_owned())
                .or_insert_with(|| Slot::new(create()));
            f(&mut slot.data)
        };
        self.data.remove_if(key, |_, slot| slot.data.is_empty());
        Ok(result?)
    }

    /// Like [`MemoryStore::mutate`], without creating missing keys.
    fn mutate_existing<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&mut Data>) -> Result<T, Error>,
    ) -> StoreResult<T> {
        self.purge(key);
        let result = {
            let mut slot = self.data.get_mut(key);
            f(slot.as_mut().map(|slot| &mut slot.value_mut().data))
        };
        self.data.remove_if(key, |_, slot| slot.data.is_empty());
        Ok(result?)
    }

    fn hash_op<T>(&self, key: &str, f: impl FnOnce(&mut Hash) -> Result<T, Error>) -> StoreResult<T> {
        self.mutate(
            key,
            || Data::Hash(Hash::new()),
            |data| match data {
                Data::Hash(hash) => f(hash),
                _ => Err(Error::WrongType),
            },
        )
    }

    fn sorted_set_op<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, f64>) -> Result<T, Error>,
    ) -> StoreResult<T> {
        self.mutate(
            key,
            || Data::SortedSet(HashMap::new()),
            |data| match data {
                Data::SortedSet(set) => f(set),
                _ => Err(Error::WrongType),
            },
        )
    }

    fn with_hash<T>(&self, key: &str, f: impl FnOnce(Option<&Hash>) -> T) -> StoreResult<T> {
        self.inspect(key, |data| match data {
            None => Ok(f(None)),
            Some(Data::Hash(hash)) => Ok(f(Some(hash))),
            Some(_) => Err(Error::WrongType),
        })
    }

    fn with_list<T>(&self, key: &str, f: impl FnOnce(Option<&VecDeque<String>>) -> T) -> StoreResult<T> {
        self.inspect(key, |data| match data {
            None => Ok(f(None)),
            Some(Data::List(list)) => Ok(f(Some(list))),
            Some(_) => Err(Error::WrongType),
        })
    }

    fn with_sorted_set<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&HashMap<String, f64>>) -> T,
    ) -> StoreResult<T> {
        self.inspect(key, |data| match data {
            None => Ok(f(None)),
            Some(Data::SortedSet(set)) => Ok(f(Some(set))),
            Some(_) => Err(Error::WrongType),
        })
    }

    fn try_pop(&self, key: &str, end: ListEnd) -> StoreResult<Option<String>> {
        self.mutate_existing(key, |data| match data {
            None => Ok(None),
            Some(Data::List(list)) => Ok(match end {
                ListEnd::Head => list.pop_front(),
                ListEnd::Tail => list.pop_back(),
            }),
            Some(_) => Err(Error::WrongType),
        })
    }
}

/// Members ordered highest score first; ties by member, descending.
fn descending(set: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut members: Vec<(String, f64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
    members.sort_by(|(am, a), (bm, b)| {
        b.partial_cmp(a).unwrap_or(Ordering::Equal).then_with(|| bm.cmp(am))
    });
    members
}

/// Members ordered lowest score first; ties by member, ascending.
fn ascending(set: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut members = descending(set);
    members.reverse();
    members
}

/// Resolves Redis-style inclusive `start..=stop` indexes against `len`.
fn index_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

fn parse_int(value: &str) -> Result<i64, Error> {
    value.parse().map_err(|_| Error::NotAnInteger)
}

fn parse_float(value: &str) -> Result<f64, Error> {
    value
        .parse::<f64>()
        .ok()
        .filter(|float| !float.is_nan())
        .ok_or(Error::NotAFloat)
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inspect(key, |data| match data {
            None => Ok(None),
            Some(Data::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(Error::WrongType),
        })
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.inspect(key, |data| match data {
                Some(Data::String(value)) => Ok(Some(value.clone())),
                _ => Ok(None),
            })?);
        }
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<bool> {
        trace!(key, "memory set");
        self.data
            .insert(key.to_owned(), Slot::new(Data::String(value.to_owned())));
        Ok(true)
    }

    async fn mset(&self, pairs: &[(String, String)]) -> StoreResult<bool> {
        for (key, value) in pairs {
            self.data
                .insert(key.clone(), Slot::new(Data::String(value.clone())));
        }
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        let mut removed = 0;
        for key in keys {
            self.purge(key);
            if self.data.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.mutate(
            key,
            || Data::String("0".to_owned()),
            |data| match data {
                Data::String(value) => {
                    let next = parse_int(value)?
                        .checked_add(delta)
                        .ok_or(Error::NotAnInteger)?;
                    *value = next.to_string();
                    Ok(next)
                }
                _ => Err(Error::WrongType),
            },
        )
    }

    async fn key_type(&self, key: &str) -> StoreResult<KeyType> {
        self.inspect(key, |data| Ok(data.map_or(KeyType::None, Data::key_type)))
    }

    async fn expire_at(&self, key: &str, timestamp: i64) -> StoreResult<bool> {
        self.purge(key);
        if timestamp <= Utc::now().timestamp() {
            return Ok(self.data.remove(key).is_some());
        }
        Ok(match self.data.get_mut(key) {
            Some(mut slot) => {
                slot.expire_at = Some(timestamp);
                true
            }
            None => false,
        })
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let glob = pattern::compile(pattern).map_err(Error::from)?;
        let now = Utc::now().timestamp();
        let mut keys: Vec<String> = self
            .data
            .iter()
            .filter(|slot| !slot.value().is_expired(now) && glob.is_match(slot.key()))
            .map(|slot| slot.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn flush(&self) -> StoreResult<()> {
        self.data.clear();
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.with_hash(key, |hash| hash.and_then(|hash| hash.get(field).cloned()))
    }

    async fn hget_all(&self, key: &str) -> StoreResult<Hash> {
        self.with_hash(key, |hash| hash.cloned().unwrap_or_default())
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<bool> {
        if fields.is_empty() {
            return Ok(false);
        }
        self.hash_op(key, |hash| {
            for (field, value) in fields {
                hash.insert(field.clone(), value.clone());
            }
            Ok(true)
        })
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64> {
        self.mutate_existing(key, |data| match data {
            None => Ok(0),
            Some(Data::Hash(hash)) => Ok(fields
                .iter()
                .filter(|field| hash.shift_remove(field.as_str()).is_some())
                .count() as u64),
            Some(_) => Err(Error::WrongType),
        })
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        self.with_hash(key, |hash| hash.map_or(0, |hash| hash.len() as u64))
    }

    async fn hvals(&self, key: &str) -> StoreResult<Vec<String>> {
        self.with_hash(key, |hash| {
            hash.map(|hash| hash.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.hash_op(key, |hash| {
            let current = hash.get(field).map(|value| parse_int(value)).transpose()?;
            let next = current
                .unwrap_or(0)
                .checked_add(delta)
                .ok_or(Error::NotAnInteger)?;
            hash.insert(field.to_owned(), next.to_string());
            Ok(next)
        })
    }

    async fn hincr_by_float(&self, key: &str, field: &str, delta: f64) -> StoreResult<f64> {
        self.hash_op(key, |hash| {
            let current = hash.get(field).map(|value| parse_float(value)).transpose()?;
            let next = current.unwrap_or(0.0) + delta;
            if !next.is_finite() {
                return Err(Error::NotAFloat);
            }
            hash.insert(field.to_owned(), next.to_string());
            Ok(next)
        })
    }

    async fn push(
        &self,
        key: &str,
        values: &[String],
        end: ListEnd,
        only_if_exists: bool,
    ) -> StoreResult<u64> {
        let push = |list: &mut VecDeque<String>| {
            for value in values {
                match end {
                    ListEnd::Head => list.push_front(value.clone()),
                    ListEnd::Tail => list.push_back(value.clone()),
                }
            }
            list.len() as u64
        };
        if only_if_exists {
            return self.mutate_existing(key, |data| match data {
                None => Ok(0),
                Some(Data::List(list)) => Ok(push(list)),
                Some(_) => Err(Error::WrongType),
            });
        }
        self.mutate(
            key,
            || Data::List(VecDeque::new()),
            |data| match data {
                Data::List(list) => Ok(push(list)),
                _ => Err(Error::WrongType),
            },
        )
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.with_list(key, |list| {
            let Some(list) = list else {
                return Vec::new();
            };
            match index_range(list.len(), start, stop) {
                Some((start, stop)) => list.range(start..=stop).cloned().collect(),
                None => Vec::new(),
            }
        })
    }

    async fn lset(&self, key: &str, index: i64, value: &str) -> StoreResult<bool> {
        self.mutate_existing(key, |data| match data {
            None => Err(Error::NoSuchKey),
            Some(Data::List(list)) => {
                let len = i64::try_from(list.len()).map_err(|_| Error::IndexOutOfRange)?;
                let index = if index < 0 { index + len } else { index };
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|index| list.get_mut(index))
                    .ok_or(Error::IndexOutOfRange)?;
                *slot = value.to_owned();
                Ok(true)
            }
            Some(_) => Err(Error::WrongType),
        })
    }

    async fn pop(&self, key: &str, end: ListEnd) -> StoreResult<Option<String>> {
        self.try_pop(key, end)
    }

    async fn blocking_pop(
        &self,
        key: &str,
        end: ListEnd,
        timeout: Duration,
    ) -> StoreResult<Option<String>> {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        loop {
            if let Some(value) = self.try_pop(key, end)? {
                return Ok(Some(value));
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        self.with_list(key, |list| list.map_or(0, |list| list.len() as u64))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<u64> {
        if score.is_nan() {
            return Err(Error::NotAFloat.into());
        }
        self.sorted_set_op(key, |set| {
            Ok(u64::from(set.insert(member.to_owned(), score).is_none()))
        })
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<u64> {
        self.mutate_existing(key, |data| match data {
            None => Ok(0),
            Some(Data::SortedSet(set)) => Ok(u64::from(set.remove(member).is_some())),
            Some(_) => Err(Error::WrongType),
        })
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.with_sorted_set(key, |set| set.map_or(0, |set| set.len() as u64))
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.with_sorted_set(key, |set| set.and_then(|set| set.get(member).copied()))
    }

    async fn zrevrank(&self, key: &str, member: &str) -> StoreResult<Option<u64>> {
        self.with_sorted_set(key, |set| {
            let set = set?;
            set.contains_key(member).then_some(())?;
            descending(set)
                .iter()
                .position(|(candidate, _)| candidate == member)
                .map(|rank| rank as u64)
        })
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.with_sorted_set(key, |set| {
            let Some(set) = set else {
                return Vec::new();
            };
            let members = descending(set);
            match index_range(members.len(), start, stop) {
                Some((start, stop)) => members[start..=stop].to_vec(),
                None => Vec::new(),
            }
        })
    }

    async fn zrange_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.with_sorted_set(key, |set| {
            set.map(|set| {
                ascending(set)
                    .into_iter()
                    .filter(|(_, score)| (min..=max).contains(score))
                    .collect()
            })
            .unwrap_or_default()
        })
    }

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.mutate_existing(key, |data| match data {
            None => Ok(0),
            Some(Data::SortedSet(set)) => {
                let before = set.len();
                set.retain(|_, score| !(min..=max).contains(&*score));
                Ok((before - set.len()) as u64)
            }
            Some(_) => Err(Error::WrongType),
        })
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.with_sorted_set(key, |set| {
            set.map_or(0, |set| {
                set.values().filter(|score| (min..=max).contains(*score)).count() as u64
            })
        })
    }

    async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        self.sorted_set_op(key, |set| {
            let score = set.entry(member.to_owned()).or_insert(0.0);
            let next = *score + delta;
            if next.is_nan() {
                return Err(Error::NotAFloat);
            }
            *score = next;
            Ok(next)
        })
    }

    fn label(&self) -> StoreLabel {
        self.label.clone()
    }
}
