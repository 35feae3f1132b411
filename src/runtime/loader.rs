use std::fs;
use std::path::Path;

use anyhow::Result;
use log::{debug, error, info};
use serde_json::Value;

use super::summary::summarize;
use super::version::{RuntimeVersion, detect_version, upgrade_skeleton_json};
use super::{AnimationRuntime, SkeletonData, SkeletonFormat, SkeletonSummary, TextureLoader};
use crate::cli::RuntimeSelection;
use crate::error::SpineshotError;

/// Atlas and skeleton data loaded for one invocation.
pub struct LoadedAssets<R: AnimationRuntime> {
    pub atlas: R::Atlas,
    pub data: R::Data,
}

/// A skeleton JSON document rewritten for the current runtime dialect.
#[derive(Debug, Clone)]
pub struct SkeletonDocument {
    /// Text handed to the runtime parser
    pub json: String,
    pub summary: SkeletonSummary,
    /// Dialect the document was upgraded from, if any
    pub upgraded_from: Option<RuntimeVersion>,
}

pub fn ensure_exists(what: &'static str, path: &Path) -> Result<(), SpineshotError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SpineshotError::AssetNotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Read a JSON skeleton, upgrading older dialects per `selection`.
pub fn read_skeleton_json(path: &Path, selection: RuntimeSelection) -> Result<SkeletonDocument> {
    let text = fs::read_to_string(path).map_err(|e| SpineshotError::AssetRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut doc: Value = serde_json::from_str(&text).map_err(|e| SpineshotError::AssetFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let version = match selection {
        RuntimeSelection::Auto => detect_version(&doc),
        RuntimeSelection::V36 => Some(RuntimeVersion::V36),
        RuntimeSelection::V38 => Some(RuntimeVersion::V38),
    };

    // Before the upgrade so the exported version is reported
    let summary = summarize(&doc);
    let json = match version {
        Some(version) => {
            debug!("Upgrading {} skeleton data", version);
            upgrade_skeleton_json(&mut doc, version);
            serde_json::to_string(&doc).map_err(|e| SpineshotError::AssetFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        }
        None => text,
    };

    Ok(SkeletonDocument {
        json,
        summary,
        upgraded_from: version,
    })
}

/// Load the atlas (uploading its pages) and then the skeleton data.
///
/// The atlas is released again if the skeleton cannot be loaded.
pub fn load_assets<R: AnimationRuntime>(
    runtime: &R,
    atlas_path: &Path,
    skeleton_path: &Path,
    textures: &mut dyn TextureLoader,
) -> Result<LoadedAssets<R>> {
    ensure_exists("Atlas", atlas_path)?;
    ensure_exists("Skeleton", skeleton_path)?;
    let format = SkeletonFormat::from_path(skeleton_path)?;

    let atlas = runtime.load_atlas(atlas_path, textures).inspect_err(|e| {
        error!("Failed to load atlas {}: {:#}", atlas_path.display(), e);
    })?;
    info!("Loaded atlas {}", atlas_path.display());

    match runtime.load_skeleton_data(skeleton_path, format, &atlas) {
        Ok(data) => {
            let summary = data.summary();
            info!(
                "Loaded skeleton {} ({} bones, {} slots, {} skins, {} animations)",
                skeleton_path.display(),
                summary.bones,
                summary.slots,
                summary.skins.len(),
                summary.animations.len()
            );
            Ok(LoadedAssets { atlas, data })
        }
        Err(e) => {
            runtime.release_atlas(atlas, textures);
            Err(e)
        }
    }
}
