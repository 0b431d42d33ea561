// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Open-addressed hash table keyed by interned strings.
//!
//! Linear probing with tombstones: a deleted slot keeps participating in
//! probe sequences, is skipped by reads, and is reused by later inserts.
//! Capacity is a power of two and grows before the load factor (occupied
//! plus tombstones) crosses the threshold, bounding probe length.
//!
//! Keys are interned, so key equality is handle identity. The one exception
//! is [`Table::find_interned`], which compares raw content because it runs
//! during string construction, before any interned instance exists.

use std::rc::Rc;

use crate::object::ObjString;
use crate::value::Value;

const MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied { key: Rc<ObjString>, value: Value },
}

/// A string-keyed associative map.
#[derive(Debug, Default)]
pub struct Table {
    slots: Vec<Slot>,
    /// Occupied slots plus tombstones; drives growth.
    count: usize,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Table {
            slots: Vec::new(),
            count: 0,
        }
    }

    /// Number of live entries (tombstones excluded).
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied { .. }))
            .count()
    }

    /// Check whether the table has no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or overwrite. Returns true if this created a new entry.
    pub fn set(&mut self, key: Rc<ObjString>, value: Value) -> bool {
        if (self.count + 1) as f64 > self.slots.len() as f64 * MAX_LOAD {
            self.grow();
        }

        let index = self.find_slot(&key);
        let is_new = !matches!(self.slots[index], Slot::Occupied { .. });
        if matches!(self.slots[index], Slot::Empty) {
            self.count += 1;
        }
        self.slots[index] = Slot::Occupied { key, value };
        is_new
    }

    /// Look up the value for a key.
    pub fn get(&self, key: &Rc<ObjString>) -> Option<Value> {
        if self.slots.is_empty() {
            return None;
        }
        match &self.slots[self.find_slot(key)] {
            Slot::Occupied { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &Rc<ObjString>) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, leaving a tombstone. Returns whether the key existed.
    pub fn delete(&mut self, key: &Rc<ObjString>) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let index = self.find_slot(key);
        if !matches!(self.slots[index], Slot::Occupied { .. }) {
            return false;
        }
        // The tombstone still counts toward the load factor.
        self.slots[index] = Slot::Tombstone;
        true
    }

    /// Content-based lookup used only during string construction, before an
    /// interned instance exists for this content.
    pub fn find_interned(&self, chars: &str, hash: u32) -> Option<Rc<ObjString>> {
        if self.slots.is_empty() {
            return None;
        }
        let mut index = hash as usize & (self.slots.len() - 1);
        loop {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied { key, .. } => {
                    if key.hash() == hash && key.as_str() == chars {
                        return Some(Rc::clone(key));
                    }
                }
            }
            index = (index + 1) & (self.slots.len() - 1);
        }
    }

    /// Find the slot for a key: its occupied slot if present, otherwise the
    /// first reusable slot on its probe sequence (an earlier tombstone wins
    /// over the terminating empty slot).
    fn find_slot(&self, key: &Rc<ObjString>) -> usize {
        debug_assert!(!self.slots.is_empty());
        let mut index = key.hash() as usize & (self.slots.len() - 1);
        let mut tombstone: Option<usize> = None;
        loop {
            match &self.slots[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied { key: existing, .. } => {
                    if Rc::ptr_eq(existing, key) {
                        return index;
                    }
                }
            }
            index = (index + 1) & (self.slots.len() - 1);
        }
    }

    /// Double the capacity and re-probe every live entry. Tombstones are
    /// dropped, so the count is recomputed.
    fn grow(&mut self) {
        let new_capacity = if self.slots.len() < 8 {
            8
        } else {
            self.slots.len() * 2
        };
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_capacity]);
        self.count = 0;
        for slot in old {
            if let Slot::Occupied { key, value } = slot {
                let index = self.find_slot(&key);
                self.slots[index] = Slot::Occupied { key, value };
                self.count += 1;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
