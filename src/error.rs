use std::path::PathBuf;
use thiserror::Error;

/// Broad failure category, used by callers that only care about how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing command-line input
    Configuration,
    /// Atlas or skeleton file does not exist
    AssetNotFound,
    /// Skeleton/atlas file could not be parsed or has an unknown extension
    AssetFormat,
    /// Atlas page image could not be read or decoded
    TextureLoad,
    /// Failure inside the draw pipeline
    Rendering,
    /// Image encoding or filesystem write failure
    EncodeOrWrite,
}

#[derive(Error, Debug)]
pub enum SpineshotError {
    #[error("Invalid size '{0}': expected 'width,height' with positive integers")]
    InvalidSize(String),

    #[error("Invalid position '{0}': expected 'x,y' with integers")]
    InvalidPosition(String),

    #[error("Invalid background color '{0}': expected RRGGBB")]
    InvalidBackground(String),

    #[error("Invalid value for --{name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("Missing required option --{0}")]
    MissingOption(&'static str),

    #[error("{what} file not found: {path}")]
    AssetNotFound { what: &'static str, path: PathBuf },

    #[error("Unsupported skeleton file format '{extension}': {path}")]
    UnsupportedSkeletonFormat { path: PathBuf, extension: String },

    #[error("Failed to parse '{path}': {message}")]
    AssetFormat { path: PathBuf, message: String },

    #[error("Failed to read '{path}': {source}")]
    AssetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to load texture '{path}': {source}")]
    TextureLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Texture '{path}' has invalid dimensions {width}x{height}")]
    TextureSize {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Failed to encode image '{path}': {source}")]
    ImageEncode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to compress PNG '{path}': {message}")]
    PngCompress { path: PathBuf, message: String },

    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SpineshotError {
    /// Map this error onto its failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpineshotError::InvalidSize(_)
            | SpineshotError::InvalidPosition(_)
            | SpineshotError::InvalidBackground(_)
            | SpineshotError::InvalidOption { .. }
            | SpineshotError::MissingOption(_) => ErrorKind::Configuration,
            SpineshotError::AssetNotFound { .. } => ErrorKind::AssetNotFound,
            SpineshotError::UnsupportedSkeletonFormat { .. }
            | SpineshotError::AssetFormat { .. }
            | SpineshotError::AssetRead { .. } => ErrorKind::AssetFormat,
            SpineshotError::TextureLoad { .. } | SpineshotError::TextureSize { .. } => {
                ErrorKind::TextureLoad
            }
            SpineshotError::Rendering(_) => ErrorKind::Rendering,
            SpineshotError::ImageEncode { .. }
            | SpineshotError::PngCompress { .. }
            | SpineshotError::OutputWrite { .. } => ErrorKind::EncodeOrWrite,
        }
    }
}
