use super::io::{for_each_entry, split_entry};
use crate::error::{Error, Result};
use crate::sexp::SexpCodec;
use rustc_hash::FxHashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::io::{BufRead, Write};

/// Map from keys to two independent floating-point counts, indexed 0 and 1.
///
/// # Panics
///
/// Every method taking an accumulator index panics when it is not 0 or 1.
#[derive(Debug, Clone)]
pub struct BiCountsTable<K> {
    map: FxHashMap<K, [f64; 2]>,
}

impl<K> Default for BiCountsTable<K> {
    fn default() -> Self {
        BiCountsTable { map: FxHashMap::default() }
    }
}

fn check_index(index: usize) {
    assert!(index < 2, "BiCountsTable accumulator index must be 0 or 1, got {index}");
}

impl<K: Eq + Hash> BiCountsTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, index: usize) -> f64 {
        self.add_count(key, index, 1.0)
    }

    pub fn add_count(&mut self, key: K, index: usize, count: f64) -> f64 {
        check_index(index);
        let slot = self.map.entry(key).or_insert([0.0; 2]);
        slot[index] += count;
        slot[index]
    }

    pub fn count<Q>(&self, key: &Q, index: usize) -> f64
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        check_index(index);
        self.map.get(key).map_or(0.0, |counts| counts[index])
    }

    /// Both accumulators of `key`, if present.
    pub fn get<Q>(&self, key: &Q) -> Option<[f64; 2]>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).copied()
    }

    /// Drop every entry whose accumulator `index` is below `threshold`,
    /// regardless of the other accumulator.
    pub fn remove_items_below(&mut self, threshold: f64, index: usize) {
        check_index(index);
        self.map.retain(|_, counts| counts[index] >= threshold);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, [f64; 2])> {
        self.map.iter().map(|(k, c)| (k, *c))
    }
}

impl<K: Eq + Hash + Clone> BiCountsTable<K> {
    pub fn add_all(&mut self, other: &BiCountsTable<K>) {
        for (key, [c0, c1]) in &other.map {
            let slot = self.map.entry(key.clone()).or_insert([0.0; 2]);
            slot[0] += c0;
            slot[1] += c1;
        }
    }
}

impl<K: Eq + Hash + SexpCodec> BiCountsTable<K> {
    /// Write `(event_name key count0 count1)` lines in hash order.
    pub fn output<W: Write>(&self, event_name: &str, writer: &mut W) -> std::io::Result<()> {
        for (key, [c0, c1]) in &self.map {
            writeln!(writer, "({event_name} {} {c0} {c1})", key.to_sexp())?;
        }
        Ok(())
    }

    pub fn load<R: BufRead>(reader: R, event_name: &str) -> Result<Self> {
        let mut table = BiCountsTable::new();
        for_each_entry(reader, |_, entry| {
            let (name, key, [c0, c1]) = split_entry(&entry, 2)?;
            if name.as_str() != event_name {
                return Err(Error::malformed(0, format!("expected `{event_name}` entry, found `{name}`")));
            }
            let key = K::from_sexp(key)?;
            let slot = table.map.entry(key).or_insert([0.0; 2]);
            slot[0] += c0;
            slot[1] += c1;
            Ok(())
        })?;
        Ok(table)
    }
}
