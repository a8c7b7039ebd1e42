//! Mesh data: the interleaved vertex layout, OBJ parsing, mesh resolution by name and the
//! background loader that feeds finished buffers back to the render thread.

pub mod catalog;
pub mod loader;
pub mod obj;

pub use catalog::*;
pub use loader::*;
pub use obj::parse_obj;

use glam::{Vec2, Vec3};

use crate::error::MeshLoadError;

/// Number of floats in one interleaved vertex.
pub const STRIDE_FLOATS: usize = 8;

/// One interleaved vertex: position, normal and texture coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[repr(C)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    /// Byte offset of the normal inside the vertex.
    pub const NORMAL_OFFSET: usize = std::mem::size_of::<Vec3>();
    /// Byte offset of the uv inside the vertex.
    pub const UV_OFFSET: usize = 2 * std::mem::size_of::<Vec3>();

    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// An immutable triangle list. Its length is always a multiple of three.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBuffer {
    vertices: Vec<Vertex>,
}

impl MeshBuffer {
    /// Wraps a triangle list, rejecting buffers that do not hold whole triangles.
    pub fn new(vertices: Vec<Vertex>) -> Result<Self, MeshLoadError> {
        if vertices.is_empty() {
            return Err(MeshLoadError::Empty);
        }
        if vertices.len() % 3 != 0 {
            return Err(MeshLoadError::Parse {
                line: 0,
                message: format!("{} vertices do not form whole triangles", vertices.len()),
            });
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// The buffer as raw bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `Vertex` is `repr(C)` and made only of `f32`s, so it has no padding.
        unsafe {
            std::slice::from_raw_parts(
                self.vertices.as_ptr() as *const u8,
                std::mem::size_of_val(self.vertices.as_slice()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_is_eight_floats() {
        assert_eq!(
            std::mem::size_of::<Vertex>(),
            STRIDE_FLOATS * std::mem::size_of::<f32>()
        );
        assert_eq!(Vertex::NORMAL_OFFSET, 12);
        assert_eq!(Vertex::UV_OFFSET, 24);
    }

    #[test]
    fn test_buffer_rejects_partial_triangles() {
        let verts = vec![Vertex::default(); 4];
        assert!(MeshBuffer::new(verts).is_err());
        assert_eq!(MeshBuffer::new(Vec::new()), Err(MeshLoadError::Empty));
    }

    #[test]
    fn test_as_bytes_covers_every_vertex() {
        let buffer = MeshBuffer::new(vec![Vertex::default(); 6]).unwrap();
        assert_eq!(buffer.as_bytes().len(), 6 * 32);
        assert_eq!(buffer.triangle_count(), 2);
    }
}
