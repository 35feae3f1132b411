use std::path::{Path, PathBuf};

use anyhow::Result;
use image::RgbaImage;
use log::{debug, info, warn};

use super::backend::RenderBackend;
use super::context::RenderContext;
use crate::config::{RenderOptions, Selection};
use crate::error::SpineshotError;
use crate::output::{FrameName, ensure_output_dir, save_frame};
use crate::pose::{Animator, Pose};
use crate::runtime::{AnimationRuntime, SkeletonData, SkeletonSummary, base_name, load_assets};

/// Label used in file names when no skin is applied.
pub const NO_SKIN_LABEL: &str = "default";
/// Label used in file names when the setup pose is rendered.
pub const NO_ANIMATION_LABEL: &str = "none";

/// One output image: a skin, an animation and a frame index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    /// `None` keeps the setup-pose skin
    pub skin: Option<String>,
    /// `None` renders the setup pose
    pub animation: Option<String>,
    pub frame: i32,
}

impl RenderJob {
    pub fn skin_label(&self) -> &str {
        self.skin.as_deref().unwrap_or(NO_SKIN_LABEL)
    }

    pub fn animation_label(&self) -> &str {
        self.animation.as_deref().unwrap_or(NO_ANIMATION_LABEL)
    }
}

/// Names a selection resolves to; unknown names are logged and dropped.
fn resolve_selection(
    selection: &Selection,
    kind: &str,
    available: Vec<&str>,
) -> Vec<Option<String>> {
    match selection {
        Selection::Setup => vec![None],
        Selection::All if available.is_empty() => {
            warn!("No {kind}s to iterate over, rendering the setup pose");
            vec![None]
        }
        Selection::All => available.into_iter().map(|n| Some(n.to_string())).collect(),
        Selection::One(name) if available.contains(&name.as_str()) => vec![Some(name.clone())],
        Selection::One(name) => {
            warn!(
                "No {kind} named '{name}'. Available: {}",
                available.join(", ")
            );
            vec![None]
        }
    }
}

/// Every frame to render, ordered skin, then animation, then frame.
pub fn plan_jobs(options: &RenderOptions, summary: &SkeletonSummary) -> Vec<RenderJob> {
    let skins = resolve_selection(&options.skin, "skin", summary.skin_names());
    let animations = resolve_selection(&options.animation, "animation", summary.animation_names());
    let frames = options.frames.indices();

    let mut jobs = Vec::with_capacity(skins.len() * animations.len() * frames.len());
    for skin in &skins {
        for animation in &animations {
            for &frame in &frames {
                jobs.push(RenderJob {
                    skin: skin.clone(),
                    animation: animation.clone(),
                    frame,
                });
            }
        }
    }
    jobs
}

/// Load the assets, render every planned frame and write it to disk.
///
/// Returns the written paths in render order. Textures are released
/// whether or not rendering succeeds.
pub fn render_all<R, B>(runtime: &R, ctx: &mut RenderContext<'_, B>) -> Result<Vec<PathBuf>>
where
    R: AnimationRuntime,
    B: RenderBackend,
{
    let options = ctx.options();
    let skeleton_path = options
        .skeleton
        .as_deref()
        .ok_or(SpineshotError::MissingOption("skel"))?;

    let assets = load_assets(runtime, &options.atlas, skeleton_path, ctx.backend_mut())?;
    let result = render_jobs(&assets.data, skeleton_path, ctx);
    runtime.release_atlas(assets.atlas, ctx.backend_mut());
    result
}

#[allow(clippy::cast_precision_loss)]
fn render_jobs<D, B>(
    data: &D,
    skeleton_path: &Path,
    ctx: &mut RenderContext<'_, B>,
) -> Result<Vec<PathBuf>>
where
    D: SkeletonData,
    B: RenderBackend,
{
    let options = ctx.options();
    let summary = data.summary();
    let jobs = plan_jobs(options, summary);
    ensure_output_dir(&options.out_dir)?;

    let atlas_name = base_name(&options.atlas);
    let skeleton_name = base_name(skeleton_path);
    let [x, y] = ctx
        .projection()
        .unproject([options.position.x as f32, options.position.y as f32]);

    let mut pose = Pose::new(data.new_skeleton());
    let mut animator = Animator::new(data.new_animation_state());
    let mut written = Vec::with_capacity(jobs.len());

    for job in &jobs {
        let mut frame = ctx.begin_frame()?;

        let skin = pose.apply_skin(job.skin.as_deref(), summary)?.map(str::to_string);
        pose.set_position(x, y);

        let animated = match job.animation.as_deref() {
            Some(name) => animator.set_animation(name, summary)?,
            None => false,
        };
        if animated {
            let time = animator.apply_frame(job.frame, options.fps, &mut pose)?;
            debug!("Sampling '{}' at {:.3}s", job.animation_label(), time);
        } else {
            animator.clear_tracks();
            pose.set_to_setup_pose();
        }

        let batches = pose.draw_batches()?;
        debug!(
            "{} batches, {} vertices, {} triangles",
            batches.len(),
            batches.iter().map(|b| b.vertices.len()).sum::<usize>(),
            batches.iter().map(|b| b.triangle_count()).sum::<usize>()
        );
        frame.draw(&batches)?;
        let image = frame.finish()?;
        debug!(
            "{}/100 pixels in the top-left block are not transparent",
            coverage_sample(&image)
        );

        let name = FrameName {
            skin: job.skin_label(),
            animation: job.animation_label(),
            frame: job.frame,
            position: options.position,
            size: options.size,
            atlas_name: &atlas_name,
            skeleton_name: &skeleton_name,
            regions: summary.region_count(skin.as_deref()),
        };
        let path = options
            .out_dir
            .join(name.file_name(options.out_template.as_deref(), options.format));

        save_frame(image, &path, options.format, options.alpha, options.compress)?;
        info!("Saved {}", path.display());
        written.push(path);
    }

    info!("Rendered {} frame(s)", written.len());
    Ok(written)
}

/// Non-transparent pixels in the top-left 10x10 block.
fn coverage_sample(image: &RgbaImage) -> usize {
    (0..10u32)
        .flat_map(|y| (0..10u32).map(move |x| (x, y)))
        .filter(|&(x, y)| image.get_pixel_checked(x, y).is_some_and(|p| p.0[3] > 0))
        .count()
}
