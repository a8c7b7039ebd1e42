//! Error types shared by the core and the client.
//!
//! Every failure in this crate is recoverable: compile and link failures keep the last good
//! program alive, mesh and project failures leave the current state untouched. Nothing here is
//! meant to take the process down.

use std::path::PathBuf;

use thiserror::Error;

use crate::shader::ShaderStage;

/// A shader stage failed to compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_id}: {message}")]
pub struct CompileError {
    /// The stage that failed.
    pub stage: ShaderStage,
    /// Short identifier of the offending source (`VS` or `FS`).
    pub source_id: String,
    /// The compiler's info log.
    pub message: String,
}

impl CompileError {
    pub fn new(stage: ShaderStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            source_id: stage.source_id().to_string(),
            message: message.into(),
        }
    }
}

/// The program failed to link, or could not be created at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Program link failed: {0}")]
pub struct LinkError(pub String);

/// Failures while resolving or parsing a mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshLoadError {
    #[error("Unknown mesh \"{0}\"")]
    UnknownMesh(String),

    #[error("Could not read mesh \"{name}\": {message}")]
    Io { name: String, message: String },

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Line {line}: index {index} out of range ({len} available)")]
    IndexOutOfRange { line: usize, index: i64, len: usize },

    #[error("Mesh contains no faces")]
    Empty,

    #[error("Mesh worker is not running")]
    WorkerUnavailable,
}

/// Failures of the project store.
///
/// A failed load or save never modifies the document it was called on.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Could not open project file \"{}\": {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid project file: {0}")]
    InvalidFormat(String),

    #[error("Could not save project: no path provided")]
    EmptyPath,

    #[error("Could not write \"{}\": {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while encoding or decoding a texture payload.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Texture payload is not a decodable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unknown texture slot \"{0}\"")]
    UnknownSlot(String),
}
