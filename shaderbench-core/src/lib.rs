//! The core of Shaderbench. This crate holds everything that does not need a GL context:
//! the project store, mesh loading, texture payloads, the camera pose and pointer navigation,
//! realtime frame scheduling and the typed notification channels.

pub mod error;
pub mod events;
pub mod interaction;
pub mod mesh;
pub mod project;
pub mod realtime;
pub mod shader;
pub mod texture;
pub mod transform;

pub use error::*;
pub use project::ProjectDocument;
pub use shader::{CompileStatus, ShaderStage};
