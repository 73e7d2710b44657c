use super::io::{for_each_entry, split_entry};
use crate::error::{Error, Result};
use crate::sexp::SexpCodec;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::io::{BufRead, Write};

/// Map from keys to a single floating-point count.
#[derive(Debug, Clone)]
pub struct CountsTable<K> {
    map: FxHashMap<K, f64>,
}

impl<K> Default for CountsTable<K> {
    fn default() -> Self {
        CountsTable { map: FxHashMap::default() }
    }
}

impl<K: Eq + Hash> CountsTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CountsTable { map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()) }
    }

    /// Increment `key` by one.
    pub fn add(&mut self, key: K) -> f64 {
        self.add_count(key, 1.0)
    }

    /// Increment `key` by `count` (which may be negative) and return the new
    /// total.
    pub fn add_count(&mut self, key: K, count: f64) -> f64 {
        let slot = self.map.entry(key).or_insert(0.0);
        *slot += count;
        *slot
    }

    /// Set `key` to exactly `count`.
    pub fn put(&mut self, key: K, count: f64) {
        self.map.insert(key, count);
    }

    pub fn count(&self, key: &K) -> f64 {
        self.map.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<f64> {
        self.map.remove(key)
    }

    /// Drop every entry whose count is below `threshold`.
    pub fn remove_items_below(&mut self, threshold: f64) {
        self.map.retain(|_, count| *count >= threshold);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.map.iter().map(|(k, c)| (k, *c))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K: Eq + Hash + Clone> CountsTable<K> {
    /// Add every count of `other` into this table.
    pub fn add_all(&mut self, other: &CountsTable<K>) {
        for (key, count) in &other.map {
            self.add_count(key.clone(), *count);
        }
    }

    /// Copy every entry of `other`, replacing existing counts.
    pub fn put_all(&mut self, other: &CountsTable<K>) {
        for (key, count) in &other.map {
            self.map.insert(key.clone(), *count);
        }
    }
}

impl<K: Eq + Hash + SexpCodec> CountsTable<K> {
    /// Write `(event_name key count)` lines in hash order.
    pub fn output<W: Write>(&self, event_name: &str, writer: &mut W) -> std::io::Result<()> {
        for (key, count) in &self.map {
            writeln!(writer, "({event_name} {} {count})", key.to_sexp())?;
        }
        Ok(())
    }

    /// Add the counts of one `(name key count)` entry. The entry must carry
    /// `event_name`.
    pub fn read_entry(&mut self, event_name: &str, entry: &crate::Sexp) -> Result<()> {
        let (name, key, [count, _]) = split_entry(entry, 1)?;
        if name.as_str() != event_name {
            return Err(Error::malformed(0, format!("expected `{event_name}` entry, found `{name}`")));
        }
        self.add_count(K::from_sexp(key)?, count);
        Ok(())
    }

    /// Read a table previously written by [`CountsTable::output`].
    pub fn load<R: BufRead>(reader: R, event_name: &str) -> Result<Self> {
        let mut table = CountsTable::new();
        for_each_entry(reader, |_, entry| table.read_entry(event_name, &entry))?;
        Ok(table)
    }
}
