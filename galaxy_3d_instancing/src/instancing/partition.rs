//! Active-prefix partition of an instance pool.
//!
//! Slots `[0, active_count)` hold exactly the renderable instances, slots
//! `[active_count, capacity)` the others. The renderer draws the prefix
//! with a single instanced draw call. Every move is a swap of two slots
//! across all attribute buffers, so the partition is maintained in place
//! without allocation.

use super::attribute_buffer::AttributeBuffers;
use super::instance::InstanceKey;
use super::registry::InstanceRegistry;

/// Swap counts of one `reconcile` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionStats {
    /// show/hide pairs exchanged with a single swap
    pub pair_swaps: u32,
    /// surplus show entries moved to the end of the prefix
    pub activations: u32,
    /// surplus hide entries moved out of the prefix
    pub deactivations: u32,
}

impl PartitionStats {
    pub fn total_swaps(&self) -> u32 {
        self.pair_swaps + self.activations + self.deactivations
    }

    pub fn is_empty(&self) -> bool {
        self.total_swaps() == 0
    }
}

/// Owner of the instance registry, the attribute buffers and the
/// active count. Only this type moves instances between slots.
#[derive(Debug, Clone)]
pub struct PartitionManager {
    registry: InstanceRegistry,
    buffers: AttributeBuffers,
    active_count: u32,
}

impl PartitionManager {
    /// Every instance starts active: slot `i` holds instance `i` and
    /// `active_count == capacity`.
    pub(crate) fn new(registry: InstanceRegistry, buffers: AttributeBuffers) -> Self {
        let active_count = registry.len() as u32;
        Self { registry, buffers, active_count }
    }

    /// Number of instances in the active prefix
    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    pub fn capacity(&self) -> u32 {
        self.registry.len() as u32
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn buffers(&self) -> &AttributeBuffers {
        &self.buffers
    }

    pub(crate) fn registry_mut(&mut self) -> &mut InstanceRegistry {
        &mut self.registry
    }

    pub(crate) fn buffers_mut(&mut self) -> &mut AttributeBuffers {
        &mut self.buffers
    }

    /// Split borrow of registry and buffers
    pub(crate) fn parts_mut(&mut self) -> (&mut InstanceRegistry, &mut AttributeBuffers) {
        (&mut self.registry, &mut self.buffers)
    }

    /// Exchange the occupants of two slots in every buffer and in the
    /// slot bookkeeping. No-op when `slot_a == slot_b`.
    pub fn swap(&mut self, slot_a: u32, slot_b: u32) {
        if slot_a == slot_b {
            return;
        }
        self.buffers.swap(slot_a, slot_b);
        self.registry.swap_slots(slot_a, slot_b);
    }

    /// Move an inactive instance to the end of the active prefix and
    /// mark the prefix for upload.
    ///
    /// # Panics
    ///
    /// Panics if `key` does not belong to this pool.
    pub fn activate_one(&mut self, key: InstanceKey) {
        self.move_in(key);
        self.buffers.mark_active_prefix(self.active_count);
    }

    /// Move an active instance out of the prefix and mark the prefix
    /// for upload.
    ///
    /// # Panics
    ///
    /// Panics if `key` does not belong to this pool.
    pub fn deactivate_one(&mut self, key: InstanceKey) {
        self.move_out(key);
        self.buffers.mark_active_prefix(self.active_count);
    }

    /// Apply a batch of partition changes.
    ///
    /// `show` holds inactive instances becoming renderable, `hide` active
    /// instances leaving. Each show/hide pair costs one swap; the surplus
    /// of the longer list is moved one by one at the prefix boundary.
    /// Both lists must be disjoint and free of duplicates.
    pub fn reconcile(&mut self, show: &[InstanceKey], hide: &[InstanceKey]) -> PartitionStats {
        let pairs = show.len().min(hide.len());
        let mut stats = PartitionStats::default();

        for i in 0..pairs {
            let incoming = self.slot(show[i]);
            let outgoing = self.slot(hide[hide.len() - 1 - i]);
            debug_assert!(incoming >= self.active_count, "show entry already active");
            debug_assert!(outgoing < self.active_count, "hide entry not active");
            self.swap(incoming, outgoing);
            stats.pair_swaps += 1;
        }

        for &key in show[pairs..].iter().rev() {
            self.move_in(key);
            stats.activations += 1;
        }

        for &key in &hide[..hide.len() - pairs] {
            self.move_out(key);
            stats.deactivations += 1;
        }

        if !stats.is_empty() {
            self.buffers.mark_active_prefix(self.active_count);
        }
        stats
    }

    fn slot(&self, key: InstanceKey) -> u32 {
        self.registry.get(key).map(|e| e.slot()).unwrap_or(u32::MAX)
    }

    fn move_in(&mut self, key: InstanceKey) {
        let slot = self.slot(key);
        debug_assert!(slot >= self.active_count && slot < self.capacity(), "instance already active");
        self.swap(slot, self.active_count);
        self.active_count += 1;
    }

    fn move_out(&mut self, key: InstanceKey) {
        let slot = self.slot(key);
        debug_assert!(slot < self.active_count, "instance not active");
        self.swap(slot, self.active_count - 1);
        self.active_count -= 1;
    }
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod tests;
