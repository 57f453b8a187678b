//! Demo label scene: a few static labels, one growing with typed input, and two updated every
//! frame.

use glam::{Mat4, Vec3};
use sdf_text::{AtlasConfig, LabelId, LabelPool, Rasterizer, SdfParams};

const TYPED_PROMPT: &str = "> ";

/// Where a label sits in the world.
#[derive(Clone, Copy, Debug)]
struct Placement {
    /// World position of the label's center.
    position: Vec3,
    /// World height of one line of text.
    line_height: f32,
    /// Rotation around the world Y axis, radians.
    yaw: f32,
}

impl Placement {
    fn new(position: Vec3, line_height: f32) -> Self {
        Self {
            position,
            line_height,
            yaw: 0.0,
        }
    }

    fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    /// `size` is the label size in label units (lines).
    fn transform(&self, size: [f32; 2]) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(self.yaw)
            * Mat4::from_scale(Vec3::splat(self.line_height))
            * Mat4::from_translation(Vec3::new(-size[0] * 0.5, -size[1] * 0.5, 0.0))
    }
}

pub struct Scene {
    pub pool: LabelPool<Rasterizer>,
    placements: Vec<(LabelId, Placement)>,
    fps: LabelId,
    stats: LabelId,
    typed: LabelId,
    typed_text: String,
}

/// Atlas used by the demo. Glyphs are rasterized smaller than the library default so the
/// seeded ASCII set leaves room for growth.
pub fn atlas_config() -> AtlasConfig {
    AtlasConfig::default().with_sdf(SdfParams {
        font_size: 64.0,
        buffer: 8,
        ..SdfParams::default()
    })
}

fn linear(color: &catppuccin::Color, alpha: f32) -> [f32; 4] {
    let channel = |v: u8| (v as f32 / 255.0).powf(2.2);
    [
        channel(color.rgb.r),
        channel(color.rgb.g),
        channel(color.rgb.b),
        alpha,
    ]
}

/// Linear clear color of the scene.
pub fn clear_color() -> wgpu::Color {
    let [r, g, b, a] = linear(&catppuccin::PALETTE.mocha.colors.base, 1.0);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

impl Scene {
    pub fn new(rasterizer: Rasterizer) -> sdf_text::Result<Self> {
        let mocha = &catppuccin::PALETTE.mocha.colors;
        log::info!("Building label scene with the {} rasterizer", rasterizer.name());

        let mut scene = Self {
            pool: LabelPool::new(rasterizer, atlas_config())?,
            placements: Vec::new(),
            fps: LabelId::default(),
            stats: LabelId::default(),
            typed: LabelId::default(),
            typed_text: String::new(),
        };

        scene.add(
            "Hello world!\nExample",
            Placement::new(Vec3::new(0.0, 2.0, 0.0), 1.0),
            linear(&mocha.text, 1.0),
            linear(&mocha.surface0, 1.0),
        );
        scene.add(
            "Grüße · Ωμέγα · ¿Qué tal?",
            Placement::new(Vec3::new(0.0, 0.0, 0.0), 0.6),
            linear(&mocha.peach, 1.0),
            linear(&mocha.mantle, 0.8),
        );
        scene.add(
            "Labels live\nin 3D space",
            Placement::new(Vec3::new(5.0, 0.5, -2.0), 0.5).with_yaw(-0.6),
            linear(&mocha.green, 1.0),
            [0.0; 4],
        );

        scene.fps = scene.add(
            "",
            Placement::new(Vec3::new(-5.0, 4.0, 0.0), 0.4),
            linear(&mocha.yellow, 1.0),
            [0.0; 4],
        );
        scene.stats = scene.add(
            "",
            Placement::new(Vec3::new(5.0, 4.0, 0.0), 0.4),
            linear(&mocha.subtext0, 1.0),
            [0.0; 4],
        );
        scene.typed = scene.add(
            TYPED_PROMPT,
            Placement::new(Vec3::new(0.0, -2.0, 0.0), 0.6),
            linear(&mocha.sky, 1.0),
            linear(&mocha.surface0, 0.6),
        );

        Ok(scene)
    }

    fn add(
        &mut self,
        text: &str,
        placement: Placement,
        color: [f32; 4],
        background: [f32; 4],
    ) -> LabelId {
        let id = self.pool.acquire();
        if let Some(label) = self.pool.label_mut(id) {
            label.color = color;
            label.background = background;
        }
        self.placements.push((id, placement));
        self.set_text(id, text);
        id
    }

    fn set_text(&mut self, id: LabelId, text: &str) {
        if let Err(err) = self.pool.update(id, Some(text)) {
            log::warn!("Label text {:?} only partially renderable: {}", text, err);
        }
        // An atlas change may resize any label, so re-center all of them.
        self.place_all();
    }

    fn place_all(&mut self) {
        let line_scale = self.pool.line_scale();
        for (id, placement) in &self.placements {
            if let Some(label) = self.pool.label_mut(*id) {
                let size = label.size();
                label.transform =
                    placement.transform([size[0] * line_scale, size[1] * line_scale]);
            }
        }
    }

    /// Per-frame label updates.
    pub fn update(&mut self, fps: f32, frame_ms: f32) {
        self.set_text(self.fps, &format!("{:.0} FPS\n{:.2} ms", fps, frame_ms));

        let atlas = self.pool.atlas_manager();
        let stats = format!(
            "{} glyphs\natlas generation {}",
            atlas.alphabet().len(),
            atlas.generation()
        );
        self.set_text(self.stats, &stats);
    }

    /// Append typed text to the input label. Control characters are ignored.
    pub fn type_text(&mut self, text: &str) {
        let before = self.typed_text.len();
        self.typed_text
            .extend(text.chars().filter(|ch| !ch.is_control()));
        if self.typed_text.len() != before {
            self.refresh_typed();
        }
    }

    pub fn backspace(&mut self) {
        if self.typed_text.pop().is_some() {
            self.refresh_typed();
        }
    }

    pub fn new_line(&mut self) {
        self.typed_text.push('\n');
        self.refresh_typed();
    }

    fn refresh_typed(&mut self) {
        let text = format!("{}{}", TYPED_PROMPT, self.typed_text);
        self.set_text(self.typed, &text);
    }

    pub fn typed_text(&self) -> &str {
        &self.typed_text
    }

    pub fn label_text(&self, id: LabelId) -> Option<&str> {
        self.pool.label(id).map(|label| label.text())
    }

    pub fn fps_label(&self) -> LabelId {
        self.fps
    }
}
