mod format;
mod path;

pub use format::{encode_frame, save_frame};
pub use path::{FrameName, ensure_output_dir};
