use anyhow::Result;
use log::warn;

use super::parse::{parse_background, parse_format, parse_position, parse_selection, parse_size};
use super::types::{AlphaMode, Color, FrameSpec, RenderOptions};
use crate::cli::CliArgs;
use crate::error::SpineshotError;

/// Frame rate used when `--fps` is unusable.
pub const DEFAULT_FPS: f32 = 30.0;

impl RenderOptions {
    /// Validate raw command-line arguments into an immutable configuration.
    ///
    /// Every user-input error is reported here, before any asset is touched
    /// or any file is written.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let size = parse_size(&args.size)?;

        // Position: CLI > canvas center
        let position = match args.position.as_deref() {
            Some(value) => parse_position(value)?,
            None => size.center(),
        };

        let background = args
            .background
            .as_deref()
            .map(parse_background)
            .transpose()?;

        if !args.scale.is_finite() || args.scale <= 0.0 {
            return Err(SpineshotError::InvalidOption {
                name: "scale",
                reason: format!("expected a positive number, got {}", args.scale),
            }
            .into());
        }

        if args.interval == 0 {
            return Err(SpineshotError::InvalidOption {
                name: "interval",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let fps = if args.fps.is_finite() && args.fps > 0.0 {
            args.fps
        } else {
            warn!("Invalid fps {}, using {}", args.fps, DEFAULT_FPS);
            DEFAULT_FPS
        };

        let skeleton = match (&args.skel, args.info) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => return Err(SpineshotError::MissingOption("skel").into()),
        };

        // Without a background the transparent canvas is worth keeping
        let alpha = AlphaMode::from_flags(
            args.use_alpha || background.is_none(),
            args.premultiplied_alpha,
        );

        Ok(Self {
            atlas: args.atlas.clone(),
            skeleton,
            skin: parse_selection(args.skin.as_deref()),
            animation: parse_selection(args.animation.as_deref()),
            frames: FrameSpec {
                start: args.frame,
                range: args.range,
                interval: args.interval,
            },
            fps,
            size,
            position,
            scale: args.scale,
            background,
            clear_color: clear_color(background),
            alpha,
            premultiplied_alpha: args.premultiplied_alpha,
            format: parse_format(&args.format),
            out_dir: args.out_dir.clone(),
            out_template: args.out.clone().filter(|s| !s.is_empty()),
            runtime: args.runtime,
            compress: args.compress,
            info: args.info,
            info_json: args.json,
            verbose: args.verbose,
        })
    }
}

/// Color the target is cleared to before each frame.
///
/// A user background is always drawn fully opaque.
fn clear_color(background: Option<Color>) -> Color {
    background.map_or(Color::TRANSPARENT, Color::opaque)
}
