//! This module contains the GL side of the preview: the backend trait and its `glow`
//! implementation, shader and program wrappers, vertex arrays, textures and the application window.

pub mod app;
pub mod backend;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use app::*;
pub use backend::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
