/// Per-instance logical state.
///
/// An `InstanceEntity` holds the transform components and flags of one
/// instance. Its GPU payload (matrix, color, custom data) lives in the
/// pool's attribute buffers at the entity's current slot.

use glam::{Mat4, Quat, Vec3};
use slotmap::new_key_type;
use bitflags::bitflags;
use crate::error::Result;
use super::attribute_buffer::AttributeBuffers;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable handle to an instance of an InstancedMesh.
    ///
    /// Valid for the whole lifetime of the mesh. The slot an instance
    /// occupies in the attribute buffers changes; its key never does.
    pub struct InstanceKey;
}

// ===== FLAGS =====

bitflags! {
    /// Instance state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InstanceFlags: u8 {
        /// User intent: the instance should be drawn
        const VISIBLE      = 1 << 0;
        /// Last classification found the instance inside the frustum
        const IN_FRUSTUM   = 1 << 1;
        /// Transform changed since the matrix was last written
        const MATRIX_DIRTY = 1 << 2;
    }
}

// ===== INSTANCE ENTITY =====

/// Logical state of one instance.
#[derive(Debug, Clone)]
pub struct InstanceEntity {
    /// Creation index (0..capacity), never changes
    index: u32,
    /// Current slot in the attribute buffers
    slot: u32,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    flags: InstanceFlags,
}

impl InstanceEntity {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            slot: index,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            flags: InstanceFlags::VISIBLE | InstanceFlags::IN_FRUSTUM | InstanceFlags::MATRIX_DIRTY,
        }
    }

    // ===== GETTERS =====

    /// Creation index passed to the initializer
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Current slot in the attribute buffers
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn flags(&self) -> InstanceFlags {
        self.flags
    }

    pub fn is_visible(&self) -> bool {
        self.flags.contains(InstanceFlags::VISIBLE)
    }

    pub fn is_in_frustum(&self) -> bool {
        self.flags.contains(InstanceFlags::IN_FRUSTUM)
    }

    pub fn is_matrix_dirty(&self) -> bool {
        self.flags.contains(InstanceFlags::MATRIX_DIRTY)
    }

    /// Whether the instance belongs in the active prefix.
    ///
    /// `visible && (!per_instance_culling || in_frustum)`
    pub fn is_renderable(&self, per_instance_culling: bool) -> bool {
        self.is_visible() && (!per_instance_culling || self.is_in_frustum())
    }

    /// Compose the world matrix (scale, then rotation, then translation)
    pub fn compose_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    // ===== MUTATORS (crate-internal, go through the owning mesh) =====

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.flags.insert(InstanceFlags::MATRIX_DIRTY);
    }

    pub(crate) fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.flags.insert(InstanceFlags::MATRIX_DIRTY);
    }

    pub(crate) fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.flags.insert(InstanceFlags::MATRIX_DIRTY);
    }

    pub(crate) fn set_flag(&mut self, flag: InstanceFlags, value: bool) {
        self.flags.set(flag, value);
    }

    pub(crate) fn set_slot(&mut self, slot: u32) {
        self.slot = slot;
    }

    /// Write the composed matrix at the current slot and clear MATRIX_DIRTY.
    pub(crate) fn refresh_matrix(&mut self, buffers: &mut AttributeBuffers) {
        buffers.write_matrix(self.slot, &self.compose_matrix());
        self.flags.remove(InstanceFlags::MATRIX_DIRTY);
    }
}

// ===== INITIALIZER ACCESS =====

/// Mutable view of one instance handed to the per-slot initializer.
///
/// Only exists during `InstancedMesh::new`, before the partition is
/// established, so it can set visibility and write attributes directly.
pub struct InstanceInit<'a> {
    key: InstanceKey,
    entity: &'a mut InstanceEntity,
    buffers: &'a mut AttributeBuffers,
}

impl<'a> InstanceInit<'a> {
    pub(crate) fn new(
        key: InstanceKey,
        entity: &'a mut InstanceEntity,
        buffers: &'a mut AttributeBuffers,
    ) -> Self {
        Self { key, entity, buffers }
    }

    /// Handle of the instance being initialized
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    pub fn entity(&self) -> &InstanceEntity {
        self.entity
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.entity.set_position(position);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.entity.set_rotation(rotation);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.entity.set_scale(scale);
    }

    /// Initial user visibility. Hidden instances are moved out of the
    /// active prefix once every slot is initialized.
    pub fn set_visible(&mut self, visible: bool) {
        self.entity.set_flag(InstanceFlags::VISIBLE, visible);
    }

    /// Set the instance color. Returns false if the mesh has no color buffer.
    pub fn set_color(&mut self, color: Vec3) -> bool {
        self.buffers.write_color(self.entity.slot(), color)
    }

    /// Write a custom attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute does not exist, is one of the
    /// reserved matrix or color buffers, or `values` does not match its
    /// item size.
    pub fn set_attribute(&mut self, name: &str, values: &[f32]) -> Result<()> {
        let index = self.buffers.custom_index_of(name)?;
        self.buffers.write_item(index, self.entity.slot(), values)
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
