mod parse;
mod resolve;
mod types;

pub use parse::{parse_background, parse_format, parse_position, parse_selection, parse_size};
pub use resolve::DEFAULT_FPS;
pub use types::{
    AlphaMode, Color, FrameSpec, OutputFormat, Position, RenderOptions, Selection, Size,
};
