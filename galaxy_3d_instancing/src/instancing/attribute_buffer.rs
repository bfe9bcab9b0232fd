//! Per-instance attribute buffers and their pending upload ranges.
//!
//! Every buffer holds `capacity` items of `item_size` floats. All buffers
//! share the slot indexing: item `i` of every buffer belongs to the
//! instance occupying slot `i`. Buffers are allocated once and never
//! resized; swaps permute items in place.
//!
//! Layout of an `AttributeBuffers` set:
//! - index 0: `instanceMatrix` (16 floats, column-major Mat4)
//! - `instanceColor` (3 floats) when a color was configured
//! - custom attributes in declaration order

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::engine_bail;

/// Name of the transform matrix buffer
pub const MATRIX_ATTRIBUTE: &str = "instanceMatrix";
/// Name of the color buffer
pub const COLOR_ATTRIBUTE: &str = "instanceColor";

const MATRIX_INDEX: usize = 0;
const MATRIX_ITEM_SIZE: usize = 16;
const COLOR_ITEM_SIZE: usize = 3;

// ===== ATTRIBUTE DESC =====

/// Declaration of a custom per-instance attribute
#[derive(Debug, Clone)]
pub struct AttributeDesc {
    /// Shader-facing name, unique within the mesh
    pub name: String,
    /// Number of f32 components per instance
    pub item_size: usize,
    /// Initial value of every instance (`item_size` floats)
    pub default: Vec<f32>,
}

impl AttributeDesc {
    pub fn new(name: &str, item_size: usize, default: Vec<f32>) -> Self {
        Self { name: name.to_string(), item_size, default }
    }
}

// ===== DIRTY RANGE =====

/// Byte span of a buffer pending re-upload (`start..end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
    pub start: usize,
    pub end: usize,
}

impl DirtyRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Smallest range covering both
    pub fn union(&self, other: &DirtyRange) -> DirtyRange {
        DirtyRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ===== ATTRIBUTE BUFFER =====

/// One fixed-length per-instance buffer
#[derive(Debug, Clone)]
pub struct AttributeBuffer {
    name: String,
    item_size: usize,
    data: Vec<f32>,
    update_range: Option<DirtyRange>,
}

impl AttributeBuffer {
    fn new(name: &str, item_size: usize, capacity: usize, default: &[f32]) -> Self {
        debug_assert_eq!(default.len(), item_size);
        let mut data = Vec::with_capacity(capacity * item_size);
        for _ in 0..capacity {
            data.extend_from_slice(default);
        }
        Self {
            name: name.to_string(),
            item_size,
            data,
            update_range: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Floats per instance
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Bytes per instance
    pub fn item_bytes(&self) -> usize {
        self.item_size * std::mem::size_of::<f32>()
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.data.len() / self.item_size
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw bytes for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Item stored at `slot`
    pub fn item(&self, slot: u32) -> &[f32] {
        let offset = slot as usize * self.item_size;
        &self.data[offset..offset + self.item_size]
    }

    /// Pending upload range, if any
    pub fn update_range(&self) -> Option<DirtyRange> {
        self.update_range
    }

    pub fn needs_upload(&self) -> bool {
        self.update_range.is_some()
    }

    /// Return and clear the pending range. Call after uploading it.
    pub fn take_update_range(&mut self) -> Option<DirtyRange> {
        self.update_range.take()
    }

    pub(crate) fn write_item(&mut self, slot: u32, values: &[f32]) {
        let offset = slot as usize * self.item_size;
        self.data[offset..offset + self.item_size].copy_from_slice(values);
        self.mark_slot(slot);
    }

    /// Exchange the items at two slots, in place.
    pub(crate) fn swap_items(&mut self, slot_a: u32, slot_b: u32) {
        if slot_a == slot_b {
            return;
        }
        let size = self.item_size;
        let (lo, hi) = if slot_a < slot_b { (slot_a, slot_b) } else { (slot_b, slot_a) };
        let (head, tail) = self.data.split_at_mut(hi as usize * size);
        let lo_offset = lo as usize * size;
        head[lo_offset..lo_offset + size].swap_with_slice(&mut tail[..size]);
    }

    /// Merge a byte range into the pending range
    pub(crate) fn mark_bytes(&mut self, range: DirtyRange) {
        if range.is_empty() {
            return;
        }
        self.update_range = Some(match self.update_range {
            Some(current) => current.union(&range),
            None => range,
        });
    }

    pub(crate) fn mark_slot(&mut self, slot: u32) {
        let start = slot as usize * self.item_bytes();
        self.mark_bytes(DirtyRange { start, end: start + self.item_bytes() });
    }

    /// Mark `[0, active_count × item_bytes)`
    pub(crate) fn mark_prefix(&mut self, active_count: u32) {
        self.mark_bytes(DirtyRange { start: 0, end: active_count as usize * self.item_bytes() });
    }
}

// ===== ATTRIBUTE BUFFERS =====

/// The parallel buffer set of one instanced mesh
#[derive(Debug, Clone)]
pub struct AttributeBuffers {
    buffers: Vec<AttributeBuffer>,
    by_name: FxHashMap<String, usize>,
    color_index: Option<usize>,
}

impl AttributeBuffers {
    /// Allocate the matrix buffer, the optional color buffer and the
    /// custom attribute buffers for `capacity` instances.
    ///
    /// # Errors
    ///
    /// Returns an error if a custom attribute has a zero item size, a
    /// default of the wrong length, or a duplicate / reserved name.
    pub(crate) fn new(capacity: u32, color: Option<Vec3>, custom: &[AttributeDesc]) -> Result<Self> {
        let capacity = capacity as usize;
        let mut buffers = Vec::with_capacity(2 + custom.len());
        let mut by_name = FxHashMap::default();

        buffers.push(AttributeBuffer::new(
            MATRIX_ATTRIBUTE, MATRIX_ITEM_SIZE, capacity, &Mat4::IDENTITY.to_cols_array(),
        ));
        by_name.insert(MATRIX_ATTRIBUTE.to_string(), MATRIX_INDEX);

        let color_index = color.map(|c| {
            buffers.push(AttributeBuffer::new(COLOR_ATTRIBUTE, COLOR_ITEM_SIZE, capacity, &c.to_array()));
            by_name.insert(COLOR_ATTRIBUTE.to_string(), buffers.len() - 1);
            buffers.len() - 1
        });

        for desc in custom {
            if desc.item_size == 0 {
                engine_bail!("galaxy3d::AttributeBuffers",
                    "Attribute '{}' must have a positive item size", desc.name);
            }
            if desc.default.len() != desc.item_size {
                engine_bail!("galaxy3d::AttributeBuffers",
                    "Attribute '{}': default has {} components, item size is {}",
                    desc.name, desc.default.len(), desc.item_size);
            }
            if desc.name == MATRIX_ATTRIBUTE || desc.name == COLOR_ATTRIBUTE {
                engine_bail!("galaxy3d::AttributeBuffers",
                    "Attribute name '{}' is reserved", desc.name);
            }
            if by_name.contains_key(&desc.name) {
                engine_bail!("galaxy3d::AttributeBuffers",
                    "Duplicate attribute name '{}'", desc.name);
            }
            buffers.push(AttributeBuffer::new(&desc.name, desc.item_size, capacity, &desc.default));
            by_name.insert(desc.name.clone(), buffers.len() - 1);
        }

        Ok(Self { buffers, by_name, color_index })
    }

    /// Number of buffers (matrix included)
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeBuffer> {
        self.buffers.iter()
    }

    /// Mutable iteration, for consumers taking update ranges after upload
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AttributeBuffer> {
        self.buffers.iter_mut()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Index of a custom attribute. The matrix and color buffers are
    /// reserved: they are written through the instance transform and
    /// `write_color` only.
    pub fn custom_index_of(&self, name: &str) -> Result<usize> {
        if name == MATRIX_ATTRIBUTE || name == COLOR_ATTRIBUTE {
            engine_bail!("galaxy3d::AttributeBuffers",
                "Attribute '{}' is reserved and cannot be written directly", name);
        }
        let Some(index) = self.index_of(name) else {
            engine_bail!("galaxy3d::AttributeBuffers", "Unknown attribute '{}'", name);
        };
        Ok(index)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeBuffer> {
        self.index_of(name).map(|i| &self.buffers[i])
    }

    pub fn matrix(&self) -> &AttributeBuffer {
        &self.buffers[MATRIX_INDEX]
    }

    pub fn color(&self) -> Option<&AttributeBuffer> {
        self.color_index.map(|i| &self.buffers[i])
    }

    /// Matrix stored at `slot`
    pub fn matrix_at(&self, slot: u32) -> Mat4 {
        Mat4::from_cols_slice(self.matrix().item(slot))
    }

    /// Take and clear every pending range, paired with the buffer name.
    pub fn take_update_ranges(&mut self) -> Vec<(String, DirtyRange)> {
        self.buffers.iter_mut()
            .filter_map(|b| b.take_update_range().map(|r| (b.name.clone(), r)))
            .collect()
    }

    pub(crate) fn write_matrix(&mut self, slot: u32, matrix: &Mat4) {
        self.buffers[MATRIX_INDEX].write_item(slot, &matrix.to_cols_array());
    }

    pub(crate) fn write_color(&mut self, slot: u32, color: Vec3) -> bool {
        match self.color_index {
            Some(i) => {
                self.buffers[i].write_item(slot, &color.to_array());
                true
            }
            None => false,
        }
    }

    pub(crate) fn write_item(&mut self, index: usize, slot: u32, values: &[f32]) -> Result<()> {
        let buffer = &mut self.buffers[index];
        if values.len() != buffer.item_size {
            engine_bail!("galaxy3d::AttributeBuffers",
                "Attribute '{}' expects {} components, got {}",
                buffer.name, buffer.item_size, values.len());
        }
        buffer.write_item(slot, values);
        Ok(())
    }

    /// Exchange two slots in every buffer.
    pub(crate) fn swap(&mut self, slot_a: u32, slot_b: u32) {
        for buffer in &mut self.buffers {
            buffer.swap_items(slot_a, slot_b);
        }
    }

    /// Mark every buffer's active prefix for upload.
    pub(crate) fn mark_active_prefix(&mut self, active_count: u32) {
        for buffer in &mut self.buffers {
            buffer.mark_prefix(active_count);
        }
    }
}

#[cfg(test)]
#[path = "attribute_buffer_tests.rs"]
mod tests;
