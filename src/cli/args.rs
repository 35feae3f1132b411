use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "spineshot")]
#[command(version, about = "Render Spine skeleton frames to images", long_about = None)]
pub struct CliArgs {
    /// Path to the atlas file (.atlas)
    #[arg(short, long, value_name = "FILE")]
    pub atlas: PathBuf,

    /// Path to the skeleton file (.json or .skel)
    #[arg(short, long, value_name = "FILE", required_unless_present = "info")]
    pub skel: Option<PathBuf>,

    /// Skin to render ('all' renders every skin)
    #[arg(long)]
    pub skin: Option<String>,

    /// Animation to render ('all' renders every animation)
    #[arg(long)]
    pub animation: Option<String>,

    /// Frame index to capture (0-based)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub frame: i32,

    /// Frame rate used to turn frame indices into time
    #[arg(long, default_value_t = 30.0)]
    pub fps: f32,

    /// Additional frames to render after --frame
    #[arg(long, default_value_t = 0)]
    pub range: u32,

    /// Step between frames when --range is set
    #[arg(long, default_value_t = 1)]
    pub interval: u32,

    /// Skeleton root position as 'x,y' [default: canvas center]
    #[arg(long, allow_hyphen_values = true)]
    pub position: Option<String>,

    /// Output canvas size as 'width,height'
    #[arg(long, default_value = "512,512")]
    pub size: String,

    /// Uniform scale factor
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Output directory
    #[arg(long, default_value = "./out")]
    pub out_dir: PathBuf,

    /// Output filename or template (_SKIN_, _ANIME_, _FRAME_, _XY_, _SIZE_, _ATLASNAME_, _SKELETONNAME_)
    #[arg(short, long, value_name = "FILENAME")]
    pub out: Option<String>,

    /// Print asset information instead of rendering
    #[arg(long)]
    pub info: bool,

    /// Print the --info report as JSON
    #[arg(long, requires = "info")]
    pub json: bool,

    /// Treat atlas pages as premultiplied alpha
    #[arg(long)]
    pub premultiplied_alpha: bool,

    /// Keep the alpha channel even over a --background (otherwise it is flattened)
    #[arg(long)]
    pub use_alpha: bool,

    /// Background color as RRGGBB [default: transparent]
    #[arg(long, value_name = "RRGGBB")]
    pub background: Option<String>,

    /// Output format: png or webp (unknown values fall back to png)
    #[arg(long, default_value = "png")]
    pub format: String,

    /// Runtime variant matching the skeleton export version
    #[arg(long, value_enum, default_value_t = RuntimeSelection::Auto)]
    pub runtime: RuntimeSelection,

    /// Compress PNG output (0-6 or 'max'). Default level is 2 if flag is present without value.
    #[arg(long, value_name = "LEVEL", default_missing_value = "2", num_args = 0..=1)]
    pub compress: Option<CompressionLevel>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Which Spine runtime variant to load the skeleton with
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum RuntimeSelection {
    /// Detect from the skeleton file header
    #[default]
    Auto,
    /// Spine 3.6 exports
    #[value(name = "3.6")]
    V36,
    /// Spine 3.8 exports
    #[value(name = "3.8")]
    V38,
}

/// PNG compression level (0-6 or max)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression
    Max,
}

impl std::str::FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            Ok(CompressionLevel::Max)
        } else {
            s.parse::<u8>()
                .map_err(|_e| format!("invalid compression level: {}", s))
                .and_then(|n| {
                    if n <= 6 {
                        Ok(CompressionLevel::Level(n))
                    } else {
                        Err(format!("compression level must be 0-6 or 'max', got {}", n))
                    }
                })
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::Level(2)
    }
}
