//! Mesh management module.
//!
//! This module defines the [`Mesh`] struct, a [`MeshBuffer`] uploaded to a vertex array, and
//! [`AttributeLocations`], the attribute slots a linked program expects the vertices in.

use std::sync::Arc;

use shaderbench_core::mesh::{MeshBuffer, STRIDE_FLOATS, Vertex};

use super::{backend::{Backend, GpuError}, shader::ShaderProgram};

const STRIDE_BYTES: i32 = (STRIDE_FLOATS * std::mem::size_of::<f32>()) as i32;

/// Where a program reads `position`, `normal` and `uv` from. Attributes the program does not use
/// are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeLocations {
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub uv: Option<u32>,
}

impl AttributeLocations {
    pub fn query<B: Backend>(program: &ShaderProgram<B>) -> Self {
        Self {
            position: program.attrib_location("position"),
            normal: program.attrib_location("normal"),
            uv: program.attrib_location("uv"),
        }
    }

    /// `(location, components, byte offset)` of every attribute the program uses.
    fn layout(&self) -> impl Iterator<Item = (u32, i32, i32)> {
        [
            (self.position, 3, 0),
            (self.normal, 3, Vertex::NORMAL_OFFSET as i32),
            (self.uv, 2, Vertex::UV_OFFSET as i32),
        ]
        .into_iter()
        .filter_map(|(location, components, offset)| location.map(|l| (l, components, offset)))
    }
}

/// Represents a mesh stored on the GPU side.
pub struct Mesh<B: Backend> {
    gl: Arc<B>,
    vao: B::VertexArray,
    vbo: B::Buffer,
    vertex_count: usize,
    enabled: Vec<u32>,
}

impl<B: Backend> Mesh<B> {
    /// Uploads `buffer` into a new vertex array. Attributes are not set up until
    /// [`bind_attributes`](Self::bind_attributes) is called.
    pub fn new(gl: &Arc<B>, buffer: &MeshBuffer) -> Result<Self, GpuError> {
        let vao = gl
            .create_vertex_array()
            .map_err(|e| GpuError::new("vertex array", e))?;
        let vbo = match gl.create_buffer() {
            Ok(vbo) => vbo,
            Err(e) => {
                gl.delete_vertex_array(vao);
                return Err(GpuError::new("vertex buffer", e));
            }
        };

        gl.bind_vertex_array(Some(vao));
        gl.bind_array_buffer(Some(vbo));
        gl.array_buffer_data(buffer.as_bytes());
        gl.bind_vertex_array(None);
        gl.bind_array_buffer(None);

        Ok(Self {
            gl: Arc::clone(gl),
            vao,
            vbo,
            vertex_count: buffer.len(),
            enabled: Vec::new(),
        })
    }

    /// Points the vertex array at the attribute locations of a freshly linked program, disabling
    /// whatever the previous program used.
    pub fn bind_attributes(&mut self, locations: &AttributeLocations) {
        self.gl.bind_vertex_array(Some(self.vao));
        self.gl.bind_array_buffer(Some(self.vbo));
        for index in self.enabled.drain(..) {
            self.gl.disable_vertex_attrib(index);
        }
        for (location, components, offset) in locations.layout() {
            self.gl
                .enable_vertex_attrib(location, components, STRIDE_BYTES, offset);
            self.enabled.push(location);
        }
        self.gl.bind_vertex_array(None);
        self.gl.bind_array_buffer(None);
    }

    /// Draws the mesh.
    pub fn draw(&self) {
        self.gl.bind_vertex_array(Some(self.vao));
        self.gl.draw_triangles(self.vertex_count as i32);
        self.gl.bind_vertex_array(None);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

impl<B: Backend> Drop for Mesh<B> {
    fn drop(&mut self) {
        self.gl.delete_buffer(self.vbo);
        self.gl.delete_vertex_array(self.vao);
    }
}
