//! Labels sharing one glyph atlas.

use glam::Mat4;
use slotmap::SlotMap;

use crate::{
    AtlasConfig, AtlasData, AtlasManager, GlyphRasterizer, InstanceBuffer, Result, TextError,
};

slotmap::new_key_type! {
    /// Handle to a [`Label`] owned by a [`LabelPool`].
    pub struct LabelId;
}

/// One piece of text placed in the scene.
#[derive(Clone, Debug)]
pub struct Label {
    text: String,
    size: [f32; 2],
    replaced: usize,
    instances: InstanceBuffer,
    /// Label space to world space. One label unit is one line of text.
    pub transform: Mat4,
    /// Linear RGBA of the glyphs.
    pub color: [f32; 4],
    /// Linear RGBA drawn behind each character box.
    pub background: [f32; 4],
}

impl Default for Label {
    fn default() -> Self {
        Self {
            text: String::new(),
            size: [0.0, 0.0],
            replaced: 0,
            instances: InstanceBuffer::new(),
            transform: Mat4::IDENTITY,
            color: [1.0, 1.0, 1.0, 1.0],
            background: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl Label {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Layout size (width, height) in atlas pixels.
    pub fn size(&self) -> [f32; 2] {
        self.size
    }

    /// Characters drawn with the replacement glyph (or dropped) in the last layout.
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    pub fn instances(&self) -> &InstanceBuffer {
        &self.instances
    }

    /// Returns `true` if the number of replaced characters changed.
    fn relayout<R: GlyphRasterizer>(&mut self, atlas: &AtlasManager<R>) -> bool {
        let layout = atlas.layout(&self.text);
        let replaced_changed = layout.replaced != self.replaced;
        if replaced_changed && layout.replaced > 0 {
            log::warn!(
                "{} character(s) of {:?} have no glyph in the atlas",
                layout.replaced,
                self.text
            );
        }

        self.size = [layout.width, layout.height];
        self.replaced = layout.replaced;
        if self.instances.pack(&layout) {
            log::debug!(
                "Label instance storage grew to {} ({} reallocations)",
                self.instances.capacity(),
                self.instances.reallocations()
            );
        }
        replaced_changed
    }
}

/// Owns the shared atlas and every label drawn from it.
pub struct LabelPool<R> {
    atlas: AtlasManager<R>,
    labels: SlotMap<LabelId, Label>,
    texture_size: [f32; 2],
    line_scale: f32,
    synced_generation: u64,
}

impl<R: GlyphRasterizer> LabelPool<R> {
    pub fn new(rasterizer: R, config: AtlasConfig) -> Result<Self> {
        let atlas = AtlasManager::new(rasterizer, config)?;
        let mut pool = Self {
            atlas,
            labels: SlotMap::with_key(),
            texture_size: [0.0, 0.0],
            line_scale: 1.0,
            synced_generation: 0,
        };
        pool.sync_atlas_metadata();
        Ok(pool)
    }

    /// Add an empty label.
    pub fn acquire(&mut self) -> LabelId {
        self.labels.insert(Label::default())
    }

    /// Set the label's text (if `Some`) and re-layout it.
    ///
    /// Calling this every frame is fine: seeded characters never reach the rasterizer. When the
    /// atlas grows, every label is re-laid out against the new metrics.
    ///
    /// If the atlas runs out of space the text is still stored and laid out, with the missing
    /// characters drawn as the replacement glyph, and the error is returned.
    pub fn update(&mut self, id: LabelId, text: Option<&str>) -> Result<()> {
        let label = self
            .labels
            .get_mut(id)
            .ok_or(TextError::UnknownLabel(id))?;

        let ensured = match text {
            Some(text) => {
                if label.text != text {
                    label.text.clear();
                    label.text.push_str(text);
                }
                self.atlas.ensure(text).map(|_| ())
            }
            None => Ok(()),
        };

        if self.sync_atlas_metadata() {
            self.relayout_all();
        } else if let Some(label) = self.labels.get_mut(id) {
            label.relayout(&self.atlas);
        }

        ensured
    }

    /// Re-layout every label, e.g. after glyphs were added through [`Self::atlas_mut`].
    pub fn relayout_all(&mut self) {
        self.sync_atlas_metadata();
        for label in self.labels.values_mut() {
            label.relayout(&self.atlas);
        }
    }

    /// Returns `true` if the atlas changed since the last call.
    fn sync_atlas_metadata(&mut self) -> bool {
        let generation = self.atlas.generation();
        if generation == self.synced_generation {
            return false;
        }

        let atlas = self.atlas.atlas();
        self.texture_size = [atlas.width as f32, atlas.height as f32];
        self.line_scale = if atlas.line_height > 0.0 {
            1.0 / atlas.line_height
        } else {
            1.0
        };
        self.synced_generation = generation;

        log::debug!(
            "Atlas generation {}: {} glyphs, line height {}px",
            generation,
            self.atlas.alphabet().len(),
            atlas.line_height
        );
        true
    }
}

impl<R> LabelPool<R> {
    /// Remove a label. Backends drop its GPU resources on their next prepare.
    pub fn release(&mut self, id: LabelId) -> Option<Label> {
        self.labels.remove(id)
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(id)
    }

    pub fn label_mut(&mut self, id: LabelId) -> Option<&mut Label> {
        self.labels.get_mut(id)
    }

    pub fn labels(&self) -> impl Iterator<Item = (LabelId, &Label)> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn atlas(&self) -> &AtlasData {
        self.atlas.atlas()
    }

    pub fn atlas_manager(&self) -> &AtlasManager<R> {
        &self.atlas
    }

    /// Direct access to the atlas. Call [`Self::relayout_all`] after adding glyphs.
    pub fn atlas_mut(&mut self) -> &mut AtlasManager<R> {
        &mut self.atlas
    }

    pub fn atlas_needs_upload(&self) -> bool {
        self.atlas.needs_upload()
    }

    pub fn mark_atlas_uploaded(&mut self) {
        self.atlas.mark_uploaded();
    }

    /// Atlas size in pixels, as last seen by the pool.
    pub fn texture_size(&self) -> [f32; 2] {
        self.texture_size
    }

    /// `1 / line_height`: converts layout pixels to label units.
    pub fn line_scale(&self) -> f32 {
        self.line_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedRasterizer;

    fn pool(width: u32, height: u32, seed: &str) -> LabelPool<FixedRasterizer> {
        LabelPool::new(
            FixedRasterizer::new(10, 20, 10.0),
            AtlasConfig::new(width, height).with_initial_chars(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_new_pool_reports_texture_metadata() {
        let pool = pool(256, 128, "abc");

        assert!(pool.is_empty());
        assert_eq!(pool.texture_size(), [256.0, 128.0]);
        assert_eq!(pool.line_scale(), 1.0 / 20.0);
        assert!(pool.atlas_needs_upload());
    }

    #[test]
    fn test_update_lays_out_and_packs() {
        let mut pool = pool(256, 256, "ab");
        let id = pool.acquire();
        pool.update(id, Some("ab\na")).unwrap();

        let label = pool.label(id).unwrap();
        assert_eq!(label.text(), "ab\na");
        assert_eq!(label.size(), [20.0, 40.0]);
        assert_eq!(label.instances().len(), 3);
        assert_eq!(label.replaced(), 0);
    }

    #[test]
    fn test_update_with_new_characters_requests_upload() {
        let mut pool = pool(256, 256, "");
        pool.mark_atlas_uploaded();
        let id = pool.acquire();

        pool.update(id, Some("hi")).unwrap();
        assert!(pool.atlas_needs_upload());
        assert!(pool.atlas_manager().contains('h'));

        pool.mark_atlas_uploaded();
        pool.update(id, Some("ih")).unwrap();
        assert!(!pool.atlas_needs_upload());
    }

    #[test]
    fn test_update_without_text_repacks() {
        let mut pool = pool(256, 256, "x");
        let id = pool.acquire();
        pool.update(id, Some("xx")).unwrap();
        let version = pool.label(id).unwrap().instances().version();

        pool.update(id, None).unwrap();
        let label = pool.label(id).unwrap();
        assert_eq!(label.text(), "xx");
        assert_eq!(label.instances().version(), version + 1);
        assert_eq!(label.instances().len(), 2);
    }

    #[test]
    fn test_atlas_growth_relayouts_other_labels() {
        let mut pool = LabelPool::new(
            FixedRasterizer::new(10, 20, 10.0).with_top('T', 30.0),
            AtlasConfig::new(256, 256).with_initial_chars("x"),
        )
        .unwrap();
        let first = pool.acquire();
        pool.update(first, Some("x")).unwrap();
        let before = pool.label(first).unwrap().instances().as_slice()[0];

        let second = pool.acquire();
        pool.update(second, Some("T")).unwrap();

        // 'T' raised max_ascent, so 'x' moved down inside its line box.
        let after = pool.label(first).unwrap().instances().as_slice()[0];
        assert_ne!(before.char_position, after.char_position);
        assert_eq!(before.box_position, after.box_position);
    }

    #[test]
    fn test_taller_glyph_rescales_every_label() {
        let mut pool = LabelPool::new(
            FixedRasterizer::new(10, 20, 10.0).with_height('T', 40),
            AtlasConfig::new(256, 256).with_initial_chars("x"),
        )
        .unwrap();
        let first = pool.acquire();
        pool.update(first, Some("x\nx")).unwrap();
        assert_eq!(pool.line_scale(), 1.0 / 20.0);
        assert_eq!(pool.label(first).unwrap().size(), [10.0, 40.0]);

        let second = pool.acquire();
        pool.update(second, Some("T")).unwrap();

        assert_eq!(pool.line_scale(), 1.0 / 40.0);
        let label = pool.label(first).unwrap();
        assert_eq!(label.size(), [10.0, 80.0]);
        for instance in label.instances().as_slice() {
            assert_eq!(instance.box_size[1], 40.0);
        }
        assert_eq!(label.instances().as_slice()[0].box_position, [0.0, 40.0]);
    }

    #[test]
    fn test_replacement_warning_only_on_change() {
        let mut pool = pool(30, 20, "");
        let id = pool.acquire();
        assert!(pool.update(id, Some("abcd")).is_err());

        let LabelPool { atlas, labels, .. } = &mut pool;
        let label = labels.get_mut(id).unwrap();
        assert_eq!(label.replaced(), 2);
        assert!(!label.relayout(atlas));

        label.text.push('e');
        assert!(label.relayout(atlas));
        assert_eq!(label.replaced(), 3);
    }

    #[test]
    fn test_unknown_and_released_labels() {
        let mut pool = pool(256, 256, "");
        let id = pool.acquire();
        assert_eq!(pool.len(), 1);

        let label = pool.release(id).unwrap();
        assert_eq!(label.text(), "");
        assert!(pool.is_empty());
        assert_eq!(
            pool.update(id, Some("a")),
            Err(TextError::UnknownLabel(id))
        );
        assert!(pool.release(id).is_none());
    }

    #[test]
    fn test_exhausted_atlas_keeps_text_with_replacements() {
        // Room for the replacement glyph plus two more.
        let mut pool = pool(30, 20, "");
        let id = pool.acquire();

        let result = pool.update(id, Some("abcd"));
        assert!(matches!(
            result,
            Err(TextError::AtlasExhausted { ch: 'c', .. })
        ));

        let label = pool.label(id).unwrap();
        assert_eq!(label.text(), "abcd");
        assert_eq!(label.replaced(), 2);
        assert_eq!(label.instances().len(), 4);
    }

    #[test]
    fn test_label_appearance_is_mutable() {
        let mut pool = pool(64, 64, "");
        let id = pool.acquire();
        let label = pool.label_mut(id).unwrap();
        label.color = [1.0, 0.0, 0.0, 1.0];
        label.transform = Mat4::from_translation(glam::Vec3::X);

        assert_eq!(pool.label(id).unwrap().color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(pool.labels().count(), 1);
    }
}
