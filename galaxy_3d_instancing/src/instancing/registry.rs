//! Instance registry: stable keys, slot ownership and creation order.

use slotmap::SlotMap;
use super::instance::{InstanceEntity, InstanceKey};

/// Owns every instance of a mesh and the slot → key mapping.
///
/// The set of instances is fixed at creation: `capacity` entities are
/// created once and never removed. `slots[i]` is the key of the instance
/// currently occupying buffer slot `i`.
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    entities: SlotMap<InstanceKey, InstanceEntity>,
    slots: Vec<InstanceKey>,
    /// Keys in creation order (index → key)
    order: Vec<InstanceKey>,
}

impl InstanceRegistry {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            entities: SlotMap::with_capacity_and_key(capacity as usize),
            slots: Vec::with_capacity(capacity as usize),
            order: Vec::with_capacity(capacity as usize),
        }
    }

    /// Create the next instance, placed at the slot equal to its index.
    pub(crate) fn create(&mut self) -> InstanceKey {
        let index = self.order.len() as u32;
        let key = self.entities.insert(InstanceEntity::new(index));
        self.slots.push(key);
        self.order.push(key);
        key
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: InstanceKey) -> Option<&InstanceEntity> {
        self.entities.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: InstanceKey) -> Option<&mut InstanceEntity> {
        self.entities.get_mut(key)
    }

    pub fn contains(&self, key: InstanceKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Key of the instance occupying `slot`
    pub fn key_at_slot(&self, slot: u32) -> Option<InstanceKey> {
        self.slots.get(slot as usize).copied()
    }

    pub fn slot_of(&self, key: InstanceKey) -> Option<u32> {
        self.entities.get(key).map(|e| e.slot())
    }

    /// Key of the instance created with `index`
    pub fn key_at_index(&self, index: u32) -> Option<InstanceKey> {
        self.order.get(index as usize).copied()
    }

    /// Keys in creation order
    pub fn keys(&self) -> &[InstanceKey] {
        &self.order
    }

    /// Keys in slot order
    pub fn slots(&self) -> &[InstanceKey] {
        &self.slots
    }

    /// Entities in creation order
    pub fn iter(&self) -> impl Iterator<Item = (InstanceKey, &InstanceEntity)> {
        self.order.iter().map(move |&key| (key, &self.entities[key]))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (InstanceKey, &mut InstanceEntity)> {
        self.entities.iter_mut()
    }

    /// Exchange the owners of two slots, keeping both entities' `slot`
    /// fields consistent with the slot table.
    pub(crate) fn swap_slots(&mut self, slot_a: u32, slot_b: u32) {
        if slot_a == slot_b {
            return;
        }
        let key_a = self.slots[slot_a as usize];
        let key_b = self.slots[slot_b as usize];
        self.slots.swap(slot_a as usize, slot_b as usize);
        self.entities[key_a].set_slot(slot_b);
        self.entities[key_b].set_slot(slot_a);
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
