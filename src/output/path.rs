use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::{OutputFormat, Position, Size};
use crate::error::SpineshotError;

/// Values that name one rendered frame.
#[derive(Debug, Clone)]
pub struct FrameName<'a> {
    pub skin: &'a str,
    pub animation: &'a str,
    pub frame: i32,
    pub position: Position,
    pub size: Size,
    pub atlas_name: &'a str,
    pub skeleton_name: &'a str,
    /// Drawable attachments in the active skin
    pub regions: usize,
}

impl FrameName<'_> {
    /// `{skeleton}_skin-{skin}_anim-{anim}_frame-{frame}_{w}x{h}_regions-{n}of0.{ext}`
    pub fn auto_file_name(&self, format: OutputFormat) -> String {
        format!(
            "{}_skin-{}_anim-{}_frame-{}_{}x{}_regions-{}of0.{}",
            self.skeleton_name,
            self.skin,
            self.animation,
            self.frame,
            self.size.width,
            self.size.height,
            self.regions,
            format.extension()
        )
    }

    /// Replace template tokens with their values.
    ///
    /// A token whose value is empty is left untouched.
    pub fn substitute(&self, template: &str) -> String {
        let frame = self.frame.to_string();
        let xy = format!("{}x{}", self.position.x, self.position.y);
        let size = format!("{}x{}", self.size.width, self.size.height);
        let tokens = [
            ("_SKIN_", self.skin),
            ("_ANIME_", self.animation),
            ("_FRAME_", frame.as_str()),
            ("_XY_", xy.as_str()),
            ("_SIZE_", size.as_str()),
            ("_ATLASNAME_", self.atlas_name),
            ("_SKELETONNAME_", self.skeleton_name),
        ];

        tokens
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .fold(template.to_string(), |name, (token, value)| {
                name.replace(token, value)
            })
    }

    /// Output file name: the substituted template, or the automatic name.
    ///
    /// An extension already present in the template is replaced by the
    /// format's; a template without one is used as is.
    pub fn file_name(&self, template: Option<&str>, format: OutputFormat) -> String {
        match template {
            Some(template) => {
                let name = PathBuf::from(self.substitute(template));
                if name.extension().is_some() {
                    name.with_extension(format.extension())
                        .to_string_lossy()
                        .into_owned()
                } else {
                    name.to_string_lossy().into_owned()
                }
            }
            None => self.auto_file_name(format),
        }
    }
}

/// Create the output directory and any missing parents.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| SpineshotError::OutputWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}
