//! Structs and functions for handling textures.
//!
//! The module provides the [`Texture`] struct which is a CPU representation of a GPU texture.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use super::backend::{Backend, GpuError};

/// Represents a texture stored on the GPU side.
pub struct Texture<B: Backend> {
    gl: Arc<B>,
    id: B::Texture,
}

impl<B: Backend> Texture<B> {
    /// Uploads the given [`image::DynamicImage`] as is, with linear filtering and mipmaps.
    pub fn new(gl: &Arc<B>, image: &DynamicImage) -> Result<Self, GpuError> {
        let (width, height) = image.dimensions();
        let data = image.to_rgba8().into_raw();
        let id = gl
            .create_texture(width, height, &data)
            .map_err(|e| GpuError::new("texture", e))?;

        Ok(Self {
            gl: Arc::clone(gl),
            id,
        })
    }

    /// Binds the texture to the specified texture unit.
    pub fn bind(&self, unit: u32) {
        self.gl.bind_texture(unit, Some(self.id));
    }
}

impl<B: Backend> Drop for Texture<B> {
    fn drop(&mut self) {
        self.gl.delete_texture(self.id);
    }
}
