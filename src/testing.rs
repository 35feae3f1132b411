//! Test doubles: a deterministic animation runtime and scratch directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use image::{Rgba, RgbaImage};

use crate::error::SpineshotError;
use crate::runtime::{
    AnimationRuntime, AnimationState, AnimationSummary, DrawBatch, SkeletonData, SkeletonFormat,
    Skeleton, SkeletonSummary, SkinSummary, SpineBlend, TextureId, TextureLoader, Vertex,
};

/// Unique directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!(
            "spineshot_{name}_{}_{}",
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// 16x16 page with red, green, blue and white quadrants (clockwise from top-left).
    pub fn write_quadrant_page(&self, name: &str) -> PathBuf {
        let path = self.path.join(name);
        let image = RgbaImage::from_fn(16, 16, |x, y| match (x < 8, y < 8) {
            (true, true) => Rgba(QUADRANT_COLORS[0]),
            (false, true) => Rgba(QUADRANT_COLORS[1]),
            (false, false) => Rgba(QUADRANT_COLORS[2]),
            (true, false) => Rgba(QUADRANT_COLORS[3]),
        });
        image.save(&path).unwrap();
        path
    }

    /// Files directly inside the directory, sorted by name
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Quadrant colors of [`TempDir::write_quadrant_page`]: top-left, top-right,
/// bottom-right, bottom-left
pub const QUADRANT_COLORS: [[u8; 4]; 4] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 255, 255],
];

/// Texture loader that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    pub loaded: Vec<PathBuf>,
    pub released: Vec<TextureId>,
}

impl TextureLoader for RecordingLoader {
    fn load_texture(&mut self, path: &Path) -> Result<TextureId> {
        self.loaded.push(path.to_path_buf());
        Ok(TextureId(self.loaded.len() - 1))
    }

    fn release_texture(&mut self, id: TextureId) {
        self.released.push(id);
    }
}

/// Runtime whose atlas lists one page image per line and whose skeleton
/// is always [`MockData::hero`], JSON or binary.
pub struct MockRuntime;

pub struct MockAtlas {
    textures: Vec<TextureId>,
}

impl AnimationRuntime for MockRuntime {
    type Atlas = MockAtlas;
    type Data = MockData;

    fn atlas_pages(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let text = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| dir.join(l))
            .collect())
    }

    fn load_atlas(&self, path: &Path, textures: &mut dyn TextureLoader) -> Result<MockAtlas> {
        let mut loaded = Vec::new();
        for page in self.atlas_pages(path)? {
            match textures.load_texture(&page) {
                Ok(id) => loaded.push(id),
                Err(e) => {
                    for id in loaded {
                        textures.release_texture(id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(MockAtlas { textures: loaded })
    }

    fn load_skeleton_data(
        &self,
        path: &Path,
        format: SkeletonFormat,
        atlas: &MockAtlas,
    ) -> Result<MockData> {
        let mut data = MockData::hero();
        data.texture = atlas.textures.first().copied().unwrap_or(TextureId(0));
        if format == SkeletonFormat::Binary {
            data.summary = self.binary_summary(path)?;
            return Ok(data);
        }

        let text = fs::read_to_string(path)?;
        serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
            SpineshotError::AssetFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        Ok(data)
    }

    /// Any non-empty file reads as the hero skeleton.
    fn binary_summary(&self, path: &Path) -> Result<SkeletonSummary> {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Err(SpineshotError::AssetFormat {
                path: path.to_path_buf(),
                message: "empty binary skeleton".to_string(),
            }
            .into());
        }
        Ok(MockData::hero().summary)
    }

    fn release_atlas(&self, atlas: MockAtlas, textures: &mut dyn TextureLoader) {
        for id in atlas.textures {
            textures.release_texture(id);
        }
    }
}

/// A textured rectangle attached to a slot
#[derive(Debug, Clone, Copy, PartialEq)]
struct Attachment {
    /// Local rect `[x0, y0, x1, y1]`, Y up
    rect: [f32; 4],
    /// Texture rect `[u0, v0, u1, v1]`
    uv: [f32; 4],
}

const BODY: Attachment = Attachment {
    rect: [-10.0, 0.0, 10.0, 20.0],
    uv: [0.0, 0.0, 0.5, 0.5],
};
const HEAD: Attachment = Attachment {
    rect: [-5.0, 20.0, 5.0, 30.0],
    uv: [0.5, 0.0, 1.0, 0.5],
};
const BODY_BLUE: Attachment = Attachment {
    rect: [-10.0, 0.0, 10.0, 20.0],
    uv: [0.5, 0.5, 1.0, 1.0],
};
const HAT: Attachment = Attachment {
    rect: [-6.0, 20.0, 6.0, 26.0],
    uv: [0.0, 0.5, 0.5, 1.0],
};

fn skin_attachments(skin: Option<&str>) -> [Option<Attachment>; 2] {
    match skin {
        Some("blue") => [Some(BODY_BLUE), Some(HAT)],
        _ => [Some(BODY), Some(HEAD)],
    }
}

/// Two-slot skeleton with skins `default` and `blue` and animations
/// `walk` (moves right, 1s) and `idle` (bobs up, 0.5s).
pub struct MockData {
    texture: TextureId,
    summary: SkeletonSummary,
}

impl MockData {
    pub fn hero() -> Self {
        let skin = |name: &str| SkinSummary {
            name: name.to_string(),
            attachments: 2,
            regions: 2,
        };
        let animation = |name: &str, duration| AnimationSummary {
            name: name.to_string(),
            duration,
        };
        Self {
            texture: TextureId(0),
            summary: SkeletonSummary {
                spine_version: Some("4.1.20".to_string()),
                bones: 2,
                slots: 2,
                skins: vec![skin("default"), skin("blue")],
                animations: vec![animation("walk", 1.0), animation("idle", 0.5)],
            },
        }
    }
}

impl SkeletonData for MockData {
    type Skeleton = MockSkeleton;
    type State = MockState;

    fn summary(&self) -> &SkeletonSummary {
        &self.summary
    }

    fn new_skeleton(&self) -> MockSkeleton {
        MockSkeleton {
            texture: self.texture,
            skin: None,
            slots: skin_attachments(None),
            root: [0.0, 0.0],
            offset: [0.0, 0.0],
            world: [0.0, 0.0],
        }
    }

    fn new_animation_state(&self) -> MockState {
        MockState::default()
    }
}

pub struct MockSkeleton {
    texture: TextureId,
    skin: Option<String>,
    slots: [Option<Attachment>; 2],
    root: [f32; 2],
    /// Animated offset of the only moving bone
    offset: [f32; 2],
    /// Offset as of the last world transform update
    world: [f32; 2],
}

impl Skeleton for MockSkeleton {
    // Like Spine, switching from one skin to another keeps the attachments
    // that are already in the slots.
    fn set_skin(&mut self, name: Option<&str>) -> Result<()> {
        if self.skin.is_none() {
            self.slots = skin_attachments(name);
        }
        self.skin = name.map(str::to_string);
        Ok(())
    }

    fn set_to_setup_pose(&mut self) {
        self.offset = [0.0, 0.0];
        self.set_slots_to_setup_pose();
    }

    fn set_slots_to_setup_pose(&mut self) {
        self.slots = skin_attachments(self.skin.as_deref());
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.root = [x, y];
    }

    fn update_world_transform(&mut self) {
        self.world = [self.root[0] + self.offset[0], self.root[1] + self.offset[1]];
    }

    fn draw_batches(&self) -> Result<Vec<DrawBatch>> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for attachment in self.slots.iter().flatten() {
            let [x0, y0, x1, y1] = attachment.rect;
            let [u0, v0, u1, v1] = attachment.uv;
            let [wx, wy] = self.world;
            let base = u32::try_from(vertices.len())?;
            let corner = |x: f32, y: f32, u, v| Vertex {
                position: [wx + x, wy + y],
                uv: [u, v],
                color: [1.0; 4],
            };
            vertices.extend([
                corner(x0, y1, u0, v0),
                corner(x1, y1, u1, v0),
                corner(x1, y0, u1, v1),
                corner(x0, y0, u0, v1),
            ]);
            indices.extend([0, 1, 2, 2, 3, 0].map(|i| base + i));
        }
        Ok(vec![DrawBatch {
            texture: self.texture,
            blend: SpineBlend::Normal,
            vertices,
            indices,
        }])
    }
}

/// Animation state that, like a real runtime, mixes out of the previous
/// animation when a new one is set without clearing the track.
#[derive(Debug, Default)]
pub struct MockState {
    current: Option<String>,
    previous: Option<String>,
    time: f32,
}

fn animation_offset(name: &str, time: f32) -> [f32; 2] {
    match name {
        "walk" => [40.0 * time, 0.0],
        "idle" => [0.0, 8.0 * time],
        _ => [0.0, 0.0],
    }
}

impl AnimationState for MockState {
    type Skeleton = MockSkeleton;

    fn clear_tracks(&mut self) {
        *self = Self::default();
    }

    fn set_animation(&mut self, name: &str, _looping: bool) -> Result<()> {
        self.previous = self.current.take();
        self.current = Some(name.to_string());
        Ok(())
    }

    fn update(&mut self, delta: f32) {
        self.time += delta;
    }

    fn apply(&mut self, skeleton: &mut MockSkeleton) {
        let mut offset = [0.0, 0.0];
        for name in self.current.iter().chain(&self.previous) {
            let [x, y] = animation_offset(name, self.time);
            offset = [offset[0] + x, offset[1] + y];
        }
        skeleton.offset = offset;
    }
}
