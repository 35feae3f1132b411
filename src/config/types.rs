use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{CompressionLevel, RuntimeSelection};

/// Output canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Center of the canvas, the default skeleton position
    pub fn center(&self) -> Position {
        Position {
            x: i64::from(self.width / 2),
            y: i64::from(self.height / 2),
        }
    }
}

/// Skeleton root position in output pixels (top-left origin, Y down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with full alpha
    pub const fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }
}

/// How alpha is treated from texture upload to encoded output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaMode {
    /// Flatten onto an opaque background and write RGB
    #[default]
    Opaque,
    /// Straight-alpha textures, RGBA output
    Straight,
    /// Premultiplied-alpha textures, RGBA output
    Premultiplied,
}

impl AlphaMode {
    pub fn from_flags(use_alpha: bool, premultiplied_alpha: bool) -> Self {
        match (use_alpha, premultiplied_alpha) {
            (false, _) => AlphaMode::Opaque,
            (true, false) => AlphaMode::Straight,
            (true, true) => AlphaMode::Premultiplied,
        }
    }

    /// Whether encoded output keeps its alpha channel
    pub fn keeps_alpha(self) -> bool {
        !matches!(self, AlphaMode::Opaque)
    }
}

/// Encoded image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }
}

/// Which skins or animations to iterate over
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing requested: keep the setup pose
    #[default]
    Setup,
    /// A single named entry
    One(String),
    /// Every entry, in declaration order
    All,
}

/// Requested frame indices: `start`, then every `interval` up to `start + range`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub start: i32,
    pub range: u32,
    pub interval: u32,
}

impl FrameSpec {
    /// Frame indices in strictly increasing order, stopping at `i32::MAX`
    pub fn indices(&self) -> Vec<i32> {
        let step = self.interval.max(1);
        let mut frames = Vec::new();
        let mut offset = 0u32;
        while offset <= self.range {
            let Some(frame) = self.start.checked_add_unsigned(offset) else {
                break;
            };
            frames.push(frame);
            match offset.checked_add(step) {
                Some(next) => offset = next,
                None => break,
            }
        }
        frames
    }
}

/// Fully resolved, validated render configuration.
///
/// Built once from the command line; every later stage only reads it.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub atlas: PathBuf,
    pub skeleton: Option<PathBuf>,
    pub skin: Selection,
    pub animation: Selection,
    pub frames: FrameSpec,
    pub fps: f32,
    pub size: Size,
    pub position: Position,
    pub scale: f32,
    /// User-requested background, if any
    pub background: Option<Color>,
    /// Color the render target is cleared to before each frame
    pub clear_color: Color,
    pub alpha: AlphaMode,
    pub premultiplied_alpha: bool,
    pub format: OutputFormat,
    pub out_dir: PathBuf,
    pub out_template: Option<String>,
    pub runtime: RuntimeSelection,
    pub compress: Option<CompressionLevel>,
    pub info: bool,
    pub info_json: bool,
    pub verbose: bool,
}
