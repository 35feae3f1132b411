//! [`AnimationRuntime`] backed by the pure Rust `spine2d` runtime.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use log::{debug, error};
use spine2d::{AnimationStateData, Atlas, AttachmentData, BlendMode, DrawList};

use super::loader::read_skeleton_json;
use super::{
    AnimationRuntime, AnimationState, AnimationSummary, DrawBatch, SkeletonData, SkeletonFormat,
    SkeletonSummary, Skeleton, SkinSummary, SpineBlend, TextureId, TextureLoader, Vertex,
};
use crate::cli::RuntimeSelection;
use crate::error::SpineshotError;

/// Loads Spine JSON and binary exports, upgrading 3.6/3.8 JSON as selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spine2dRuntime {
    selection: RuntimeSelection,
}

impl Spine2dRuntime {
    pub fn new(selection: RuntimeSelection) -> Self {
        Self { selection }
    }
}

/// Parsed atlas plus the texture each page was uploaded as.
pub struct Spine2dAtlas {
    atlas: Arc<Atlas>,
    textures: Arc<HashMap<String, TextureId>>,
}

pub struct Spine2dData {
    data: Arc<spine2d::SkeletonData>,
    atlas: Arc<Atlas>,
    textures: Arc<HashMap<String, TextureId>>,
    summary: SkeletonSummary,
}

pub struct Spine2dSkeleton {
    skeleton: spine2d::Skeleton,
    atlas: Arc<Atlas>,
    textures: Arc<HashMap<String, TextureId>>,
    /// Root offset added to every vertex
    root: [f32; 2],
}

pub struct Spine2dState {
    data: Arc<spine2d::SkeletonData>,
    state: spine2d::AnimationState,
}

fn read_atlas(path: &Path) -> Result<Atlas> {
    let text = fs::read_to_string(path).map_err(|e| SpineshotError::AssetRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let atlas = Atlas::from_str(&text).map_err(|e| SpineshotError::AssetFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(atlas)
}

fn format_error(path: &Path, e: &spine2d::Error) -> SpineshotError {
    SpineshotError::AssetFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Binary exports carry no dialect marker we could upgrade; only 4.x parses.
fn read_skeleton_binary(path: &Path) -> Result<Arc<spine2d::SkeletonData>> {
    let bytes = fs::read(path).map_err(|e| SpineshotError::AssetRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let data =
        spine2d::SkeletonData::from_skel_bytes(&bytes).map_err(|e| format_error(path, &e))?;
    debug!("Parsed binary skeleton {} ({} bytes)", path.display(), bytes.len());
    Ok(data)
}

/// Metadata of parsed skeleton data. Skins are keyed by name in the runtime,
/// so `default` comes first and the rest follow alphabetically.
fn summarize_data(data: &spine2d::SkeletonData) -> SkeletonSummary {
    let mut skins: Vec<SkinSummary> = data
        .skins
        .values()
        .map(|skin| {
            let attachments: Vec<&AttachmentData> =
                skin.attachments.iter().flat_map(|slot| slot.values()).collect();
            SkinSummary {
                name: skin.name.clone(),
                attachments: attachments.len(),
                regions: attachments
                    .iter()
                    .filter(|a| matches!(a, AttachmentData::Region(_) | AttachmentData::Mesh(_)))
                    .count(),
            }
        })
        .collect();
    skins.sort_by(|a, b| (a.name != "default", &a.name).cmp(&(b.name != "default", &b.name)));

    SkeletonSummary {
        spine_version: data.spine_version.clone(),
        bones: data.bones.len(),
        slots: data.slots.len(),
        skins,
        animations: data
            .animations
            .iter()
            .map(|a| AnimationSummary {
                name: a.name.clone(),
                duration: a.duration,
            })
            .collect(),
    }
}

/// Page images are resolved relative to the atlas file.
fn atlas_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

impl AnimationRuntime for Spine2dRuntime {
    type Atlas = Spine2dAtlas;
    type Data = Spine2dData;

    fn atlas_pages(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let atlas = read_atlas(path)?;
        let dir = atlas_dir(path);
        Ok(atlas.pages.iter().map(|page| dir.join(&page.name)).collect())
    }

    fn load_atlas(&self, path: &Path, textures: &mut dyn TextureLoader) -> Result<Spine2dAtlas> {
        let atlas = read_atlas(path)?;
        let dir = atlas_dir(path);

        let mut loaded = HashMap::new();
        for page in &atlas.pages {
            let image = dir.join(&page.name);
            match textures.load_texture(&image) {
                Ok(id) => {
                    debug!("Loaded atlas page {}", image.display());
                    loaded.insert(page.name.clone(), id);
                }
                Err(e) => {
                    error!("Failed to load atlas page {}: {:#}", image.display(), e);
                    for id in loaded.into_values() {
                        textures.release_texture(id);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Spine2dAtlas {
            atlas: Arc::new(atlas),
            textures: Arc::new(loaded),
        })
    }

    fn load_skeleton_data(
        &self,
        path: &Path,
        format: SkeletonFormat,
        atlas: &Spine2dAtlas,
    ) -> Result<Spine2dData> {
        let (data, summary) = match format {
            SkeletonFormat::Json => {
                let doc = read_skeleton_json(path, self.selection)?;
                let data = spine2d::SkeletonData::from_json_str(&doc.json)
                    .map_err(|e| format_error(path, &e))?;
                (data, doc.summary)
            }
            SkeletonFormat::Binary => {
                let data = read_skeleton_binary(path)?;
                let summary = summarize_data(&data);
                (data, summary)
            }
        };

        Ok(Spine2dData {
            data,
            atlas: Arc::clone(&atlas.atlas),
            textures: Arc::clone(&atlas.textures),
            summary,
        })
    }

    fn binary_summary(&self, path: &Path) -> Result<SkeletonSummary> {
        let data = read_skeleton_binary(path)?;
        Ok(summarize_data(&data))
    }

    fn release_atlas(&self, atlas: Spine2dAtlas, textures: &mut dyn TextureLoader) {
        for id in atlas.textures.values() {
            textures.release_texture(*id);
        }
    }
}

impl SkeletonData for Spine2dData {
    type Skeleton = Spine2dSkeleton;
    type State = Spine2dState;

    fn summary(&self) -> &SkeletonSummary {
        &self.summary
    }

    fn new_skeleton(&self) -> Spine2dSkeleton {
        Spine2dSkeleton {
            skeleton: spine2d::Skeleton::new(Arc::clone(&self.data)),
            atlas: Arc::clone(&self.atlas),
            textures: Arc::clone(&self.textures),
            root: [0.0, 0.0],
        }
    }

    fn new_animation_state(&self) -> Spine2dState {
        Spine2dState {
            data: Arc::clone(&self.data),
            state: spine2d::AnimationState::new(AnimationStateData::new(Arc::clone(&self.data))),
        }
    }
}

impl Skeleton for Spine2dSkeleton {
    fn set_skin(&mut self, name: Option<&str>) -> Result<()> {
        self.skeleton
            .set_skin(name)
            .map_err(|e| anyhow!("set_skin({name:?}) failed: {e:?}"))?;
        Ok(())
    }

    fn set_to_setup_pose(&mut self) {
        self.skeleton.set_to_setup_pose();
    }

    // spine2d only resets bones and slots together
    fn set_slots_to_setup_pose(&mut self) {
        self.skeleton.set_to_setup_pose();
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.root = [x, y];
    }

    fn update_world_transform(&mut self) {
        self.skeleton.update_world_transform();
    }

    fn draw_batches(&self) -> Result<Vec<DrawBatch>> {
        let list = spine2d::build_draw_list_with_atlas(&self.skeleton, self.atlas.as_ref());
        convert_draw_list(&list, &self.textures, self.root)
    }
}

impl AnimationState for Spine2dState {
    type Skeleton = Spine2dSkeleton;

    fn clear_tracks(&mut self) {
        self.state = spine2d::AnimationState::new(AnimationStateData::new(Arc::clone(&self.data)));
    }

    fn set_animation(&mut self, name: &str, looping: bool) -> Result<()> {
        self.state
            .set_animation(0, name, looping)
            .map_err(|e| anyhow!("set_animation({name:?}) failed: {e:?}"))?;
        Ok(())
    }

    fn update(&mut self, delta: f32) {
        self.state.update(delta);
    }

    fn apply(&mut self, skeleton: &mut Spine2dSkeleton) {
        self.state.apply(&mut skeleton.skeleton);
    }
}

fn convert_blend(blend: BlendMode) -> SpineBlend {
    match blend {
        BlendMode::Normal => SpineBlend::Normal,
        BlendMode::Additive => SpineBlend::Additive,
        BlendMode::Multiply => SpineBlend::Multiply,
        BlendMode::Screen => SpineBlend::Screen,
    }
}

/// Split the runtime's shared vertex/index buffers into self-contained batches.
fn convert_draw_list(
    list: &DrawList,
    textures: &HashMap<String, TextureId>,
    root: [f32; 2],
) -> Result<Vec<DrawBatch>> {
    let mut batches = Vec::with_capacity(list.draws.len());

    for draw in &list.draws {
        let texture = *textures.get(draw.texture_path.as_str()).ok_or_else(|| {
            SpineshotError::Rendering(format!(
                "no texture loaded for atlas page '{}'",
                draw.texture_path
            ))
        })?;

        let range = draw.first_index..draw.first_index + draw.index_count;
        let indices: Vec<u32> = list
            .indices
            .get(range)
            .ok_or_else(|| SpineshotError::Rendering("draw range out of bounds".to_string()))?
            .to_vec();
        let (Some(&first), Some(&last)) = (indices.iter().min(), indices.iter().max()) else {
            continue;
        };

        let vertices = list
            .vertices
            .get(first as usize..=last as usize)
            .ok_or_else(|| SpineshotError::Rendering("vertex index out of bounds".to_string()))?
            .iter()
            .map(|v| Vertex {
                position: [v.position[0] + root[0], v.position[1] + root[1]],
                uv: v.uv,
                color: v.color,
            })
            .collect();

        batches.push(DrawBatch {
            texture,
            blend: convert_blend(draw.blend),
            vertices,
            indices: indices.iter().map(|i| i - first).collect(),
        });
    }

    Ok(batches)
}
