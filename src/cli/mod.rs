mod args;

pub use args::{CliArgs, CompressionLevel, RuntimeSelection};
