//! Seam between the renderer and the skeletal animation runtime.
//!
//! Everything Spine-specific (atlas parsing, skeleton data, bone solving,
//! attachment deformation) sits behind these traits. The rest of the crate
//! only sees runtime-neutral triangle batches and metadata summaries.

mod loader;
mod spine;
mod summary;
mod version;

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

pub use spine::Spine2dRuntime;
pub use loader::{LoadedAssets, SkeletonDocument, ensure_exists, load_assets, read_skeleton_json};
pub use summary::summarize;
pub use version::{RuntimeVersion, detect_version, upgrade_skeleton_json};

use crate::error::SpineshotError;

/// Handle to a texture owned by a [`TextureLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Receives atlas page images while an atlas is loaded.
///
/// The render backend implements this so page images go straight into its
/// texture storage. Load failures are reported, never retried.
pub trait TextureLoader {
    fn load_texture(&mut self, path: &Path) -> Result<TextureId>;
    fn release_texture(&mut self, id: TextureId);
}

/// Spine blend modes as declared on slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpineBlend {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

/// One vertex in runtime world coordinates (Y up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    /// Normalized texture coordinates
    pub uv: [f32; 2],
    /// Straight RGBA tint in 0..=1
    pub color: [f32; 4],
}

/// Triangles sharing one texture and blend mode, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub texture: TextureId,
    pub blend: SpineBlend,
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl DrawBatch {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Skin name and how many drawable attachments it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkinSummary {
    pub name: String,
    pub attachments: usize,
    /// Region, mesh and linked-mesh attachments
    pub regions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationSummary {
    pub name: String,
    /// Seconds; time of the latest key over all timelines
    pub duration: f32,
}

/// Read-only metadata about loaded skeleton data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkeletonSummary {
    pub spine_version: Option<String>,
    pub bones: usize,
    pub slots: usize,
    /// In declaration order
    pub skins: Vec<SkinSummary>,
    /// In declaration order
    pub animations: Vec<AnimationSummary>,
}

impl SkeletonSummary {
    pub fn skin(&self, name: &str) -> Option<&SkinSummary> {
        self.skins.iter().find(|s| s.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<&AnimationSummary> {
        self.animations.iter().find(|a| a.name == name)
    }

    pub fn skin_names(&self) -> Vec<&str> {
        self.skins.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn animation_names(&self) -> Vec<&str> {
        self.animations.iter().map(|a| a.name.as_str()).collect()
    }

    /// Drawable attachment count of `skin`; 0 when no skin is selected.
    pub fn region_count(&self, skin: Option<&str>) -> usize {
        skin.and_then(|name| self.skin(name)).map_or(0, |s| s.regions)
    }
}

/// Skeleton file encodings, told apart by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonFormat {
    Json,
    Binary,
}

const BINARY_SUFFIXES: &[&str] = &[".skel.bytes", ".skel.txt", ".skel"];

impl SkeletonFormat {
    pub fn from_path(path: &Path) -> Result<Self, SpineshotError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".json") {
            Ok(SkeletonFormat::Json)
        } else if BINARY_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Ok(SkeletonFormat::Binary)
        } else {
            Err(SpineshotError::UnsupportedSkeletonFormat {
                path: path.to_path_buf(),
                extension: path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
        }
    }
}

/// File name without its skeleton or atlas extension (`hero.skel.bytes` -> `hero`).
pub fn base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lower = name.to_ascii_lowercase();
    for suffix in BINARY_SUFFIXES {
        if lower.ends_with(suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}

/// A skeletal animation runtime: loads assets and hands out pose instances.
pub trait AnimationRuntime {
    type Atlas;
    type Data: SkeletonData;

    /// Page image file names listed in an atlas, without loading them.
    fn atlas_pages(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Parse an atlas and upload every page image through `textures`.
    fn load_atlas(&self, path: &Path, textures: &mut dyn TextureLoader) -> Result<Self::Atlas>;

    fn load_skeleton_data(
        &self,
        path: &Path,
        format: SkeletonFormat,
        atlas: &Self::Atlas,
    ) -> Result<Self::Data>;

    /// Metadata of a binary skeleton, parsed without an atlas.
    fn binary_summary(&self, path: &Path) -> Result<SkeletonSummary>;

    /// Give every page texture back to the loader.
    fn release_atlas(&self, atlas: Self::Atlas, textures: &mut dyn TextureLoader);
}

/// Immutable skeleton template shared by every pose instance.
pub trait SkeletonData {
    type Skeleton: Skeleton;
    type State: AnimationState<Skeleton = Self::Skeleton>;

    fn summary(&self) -> &SkeletonSummary;
    fn new_skeleton(&self) -> Self::Skeleton;
    fn new_animation_state(&self) -> Self::State;
}

/// A mutable posed skeleton.
pub trait Skeleton {
    /// `None` removes the skin override.
    fn set_skin(&mut self, name: Option<&str>) -> Result<()>;
    /// Reset bones and slots to the setup pose.
    fn set_to_setup_pose(&mut self);
    /// Reset slot attachments to the setup pose of the active skin.
    fn set_slots_to_setup_pose(&mut self);
    /// Root position in world units
    fn set_position(&mut self, x: f32, y: f32);
    fn update_world_transform(&mut self);
    /// Triangles for the current world transform, in draw order.
    fn draw_batches(&self) -> Result<Vec<DrawBatch>>;
}

/// Drives animations onto a [`Skeleton`]; only track 0 is ever used.
pub trait AnimationState {
    type Skeleton;

    fn clear_tracks(&mut self);
    fn set_animation(&mut self, name: &str, looping: bool) -> Result<()>;
    fn update(&mut self, delta: f32);
    fn apply(&mut self, skeleton: &mut Self::Skeleton);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_skeleton_format_dispatch() {
        let cases = [
            ("hero.json", SkeletonFormat::Json),
            ("hero.JSON", SkeletonFormat::Json),
            ("hero.skel", SkeletonFormat::Binary),
            ("hero.skel.bytes", SkeletonFormat::Binary),
            ("dir/hero.skel.txt", SkeletonFormat::Binary),
        ];
        for (path, expected) in cases {
            assert_eq!(SkeletonFormat::from_path(Path::new(path)).unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_skeleton_extension() {
        let err = SkeletonFormat::from_path(Path::new("hero.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssetFormat);
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("assets/hero.json")), "hero");
        assert_eq!(base_name(Path::new("hero.skel.bytes")), "hero");
        assert_eq!(base_name(Path::new("hero.atlas")), "hero");
        assert_eq!(base_name(Path::new("hero.v2.json")), "hero.v2");
    }

    #[test]
    fn test_region_count_of_selected_skin_only() {
        let summary = SkeletonSummary {
            skins: vec![
                SkinSummary {
                    name: "default".to_string(),
                    attachments: 4,
                    regions: 3,
                },
                SkinSummary {
                    name: "blue".to_string(),
                    attachments: 2,
                    regions: 2,
                },
            ],
            ..Default::default()
        };
        assert_eq!(summary.region_count(None), 0);
        assert_eq!(summary.region_count(Some("default")), 3);
        assert_eq!(summary.region_count(Some("blue")), 2);
        assert_eq!(summary.region_count(Some("missing")), 0);
    }
}
