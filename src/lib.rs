pub mod cli;
pub mod config;
pub mod error;
pub mod info;
pub mod output;
pub mod pose;
pub mod render;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use cli::CliArgs;
pub use config::RenderOptions;
pub use error::{ErrorKind, SpineshotError};
pub use render::{RenderContext, SoftwareBackend, render_all};
pub use runtime::Spine2dRuntime;
