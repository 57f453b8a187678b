use crate::{CharLayoutInfo, LayoutInfo};

/// Per-character instance data for one instanced quad draw.
///
/// Positions and sizes are in layout pixels with a bottom-left origin (y up), so the label's
/// local frame matches render space. The shared unit quad is scaled by `box_size` and offset by
/// `box_position`; `char_*` locate the glyph bitmap inside that box.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LabelInstance {
    /// Bottom-left corner of the character's line box.
    pub box_position: [f32; 2],
    /// Bottom-left corner of the glyph bitmap.
    pub char_position: [f32; 2],
    /// Top-left corner of the glyph in the atlas, in atlas pixels.
    pub uv_position: [f32; 2],
    pub box_size: [f32; 2],
    pub char_size: [f32; 2],
}

impl LabelInstance {
    /// Flip one layout box into render space. `label_height` is the height of the whole layout.
    pub fn from_layout(ch: &CharLayoutInfo, label_height: f32) -> Self {
        Self {
            box_position: [ch.left, label_height - ch.box_top - ch.box_height],
            char_position: [ch.left, label_height - ch.top - ch.height],
            uv_position: [ch.atlas_x, ch.atlas_y],
            box_size: [ch.width, ch.box_height],
            char_size: [ch.width, ch.height],
        }
    }
}

/// Growable instance storage of one label.
///
/// Capacity only grows, to the next power of two of the required length, so a label whose
/// text keeps getting longer reallocates a logarithmic number of times.
#[derive(Clone, Debug, Default)]
pub struct InstanceBuffer {
    data: Vec<LabelInstance>,
    len: usize,
    reallocations: usize,
    version: u64,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![LabelInstance::default(); capacity],
            ..Default::default()
        }
    }

    /// Replace the contents with the instances of `layout`.
    ///
    /// Returns `true` if the storage had to grow.
    pub fn pack(&mut self, layout: &LayoutInfo) -> bool {
        let required = layout.chars.len();
        let grew = required > self.data.len();
        if grew {
            let capacity = required.next_power_of_two();
            self.data = vec![LabelInstance::default(); capacity];
            self.reallocations += 1;
        }

        for (slot, ch) in self.data.iter_mut().zip(&layout.chars) {
            *slot = LabelInstance::from_layout(ch, layout.height);
        }
        self.len = required;
        self.version += 1;

        grew
    }

    #[inline]
    pub fn as_slice(&self) -> &[LabelInstance] {
        &self.data[..self.len]
    }

    /// Packed instances as raw bytes, ready for a vertex buffer upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// How many times the storage grew.
    #[inline]
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Incremented on every [`pack`](Self::pack).
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }
}
