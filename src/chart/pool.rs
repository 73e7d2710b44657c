use super::item::Item;
use crate::error::{Error, Result};
use std::fmt;

/// Handle to a pooled [`Item`].
///
/// The generation ties a handle to one occupancy of its slot: once the item
/// is released, the slot's generation moves on and the old handle no longer
/// dereferences.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    item: Option<Item>,
}

/// Fixed-capacity arena of chart items with a free list.
///
/// Slots are created lazily up to `capacity`; released slots are reset to
/// empty and reused before any new slot is created. Running out of slots is
/// [`Error::PoolExhausted`], never a silent heap fallback.
#[derive(Debug)]
pub struct ItemPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
    peak: usize,
}

impl ItemPool {
    pub fn with_capacity(capacity: usize) -> Self {
        ItemPool { slots: Vec::new(), free: Vec::new(), capacity, live: 0, peak: 0 }
    }

    pub fn alloc(&mut self, item: Item) -> Result<ItemId> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot { generation: 0, item: None });
                (self.slots.len() - 1) as u32
            }
            None => return Err(Error::PoolExhausted { capacity: self.capacity }),
        };
        let slot = &mut self.slots[index as usize];
        slot.item = Some(item);
        self.live += 1;
        self.peak = self.peak.max(self.live);
        Ok(ItemId { index, generation: slot.generation })
    }

    pub fn try_get(&self, id: ItemId) -> Option<&Item> {
        self.slots.get(id.index as usize).filter(|slot| slot.generation == id.generation).and_then(|s| s.item.as_ref())
    }

    /// # Panics
    ///
    /// When `id` was released.
    pub fn get(&self, id: ItemId) -> &Item {
        match self.try_get(id) {
            Some(item) => item,
            None => panic!("chart item {id:?} used after release"),
        }
    }

    /// # Panics
    ///
    /// When `id` was released.
    pub fn get_mut(&mut self, id: ItemId) -> &mut Item {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot { generation, item: Some(item) }) if *generation == id.generation => item,
            _ => panic!("chart item {id:?} used after release"),
        }
    }

    /// Clear the slot and return it to the free list. Releasing a stale
    /// handle is a no-op that returns false.
    pub fn release(&mut self, id: ItemId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.item.is_none() {
            return false;
        }
        slot.item = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        true
    }

    /// Release every live item.
    pub fn release_all(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.item.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset_peak(&mut self) {
        self.peak = self.live;
    }
}
