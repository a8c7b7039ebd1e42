//! The slice of OpenGL the preview needs, as a trait.
//!
//! Everything above this module talks to a [`Backend`] rather than to `glow` directly. The real
//! implementation forwards to [`glow::Context`]; tests use [`testing::RecordingBackend`], which
//! records every call and fakes compile and link results.

use std::fmt::Debug;

use glam::{Mat4, Vec2, Vec4};
use glow::HasContext;
use shaderbench_core::ShaderStage;
use thiserror::Error;

/// A GL object could not be created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not create {kind}: {message}")]
pub struct GpuError {
    pub kind: &'static str,
    pub message: String,
}

impl GpuError {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// GL entry points used by the shader, mesh and texture wrappers.
///
/// Every method must be called from the thread that owns the context.
pub trait Backend {
    type Shader: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type Buffer: Copy + Debug;
    type VertexArray: Copy + Debug;
    type Texture: Copy + Debug;
    type UniformLocation: Clone + Debug;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    /// Uploads `source` and compiles it. On failure returns the info log.
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String>;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Links `program`. On failure returns the info log.
    fn link_program(&self, program: Self::Program) -> Result<(), String>;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32);
    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32);
    fn uniform_vec2(&self, location: &Self::UniformLocation, value: Vec2);
    fn uniform_mat4(&self, location: &Self::UniformLocation, value: &Mat4);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    /// Fills the bound array buffer with static data.
    fn array_buffer_data(&self, data: &[u8]);
    fn delete_buffer(&self, buffer: Self::Buffer);
    /// Enables attribute `index` and points it at float data in the bound array buffer.
    fn enable_vertex_attrib(&self, index: u32, components: i32, stride: i32, offset: i32);
    fn disable_vertex_attrib(&self, index: u32);
    fn draw_triangles(&self, vertex_count: i32);

    /// Creates a 2D texture from tightly packed RGBA8 rows with linear filtering and mipmaps.
    fn create_texture(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Self::Texture, String>;
    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>);
    fn delete_texture(&self, texture: Self::Texture);

    /// Clears color, depth and stencil.
    fn clear(&self, color: Vec4);
    fn viewport(&self, width: u32, height: u32);
    fn enable_depth_test(&self);
    fn set_multisample(&self, enabled: bool);
}

fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

impl Backend for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { HasContext::create_shader(self, shader_type(stage)) }
    }

    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String> {
        unsafe {
            HasContext::shader_source(self, shader, source);
            HasContext::compile_shader(self, shader);
            if HasContext::get_shader_compile_status(self, shader) {
                Ok(())
            } else {
                Err(HasContext::get_shader_info_log(self, shader))
            }
        }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) -> Result<(), String> {
        unsafe {
            HasContext::link_program(self, program);
            if HasContext::get_program_link_status(self, program) {
                Ok(())
            } else {
                Err(HasContext::get_program_info_log(self, program))
            }
        }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        unsafe { HasContext::get_uniform_location(self, program, name) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { HasContext::get_attrib_location(self, program, name) }
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { HasContext::uniform_1_f32(self, Some(location), value) }
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32) {
        unsafe { HasContext::uniform_1_i32(self, Some(location), value) }
    }

    fn uniform_vec2(&self, location: &Self::UniformLocation, value: Vec2) {
        unsafe { HasContext::uniform_2_f32(self, Some(location), value.x, value.y) }
    }

    fn uniform_mat4(&self, location: &Self::UniformLocation, value: &Mat4) {
        unsafe { HasContext::uniform_matrix_4_f32_slice(self, Some(location), false, value.as_ref()) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { HasContext::create_vertex_array(self) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>) {
        unsafe { HasContext::bind_buffer(self, glow::ARRAY_BUFFER, buffer) }
    }

    fn array_buffer_data(&self, data: &[u8]) {
        unsafe { HasContext::buffer_data_u8_slice(self, glow::ARRAY_BUFFER, data, glow::STATIC_DRAW) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn enable_vertex_attrib(&self, index: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            HasContext::enable_vertex_attrib_array(self, index);
            HasContext::vertex_attrib_pointer_f32(
                self,
                index,
                components,
                glow::FLOAT,
                false,
                stride,
                offset,
            );
        }
    }

    fn disable_vertex_attrib(&self, index: u32) {
        unsafe { HasContext::disable_vertex_attrib_array(self, index) }
    }

    fn draw_triangles(&self, vertex_count: i32) {
        unsafe { HasContext::draw_arrays(self, glow::TRIANGLES, 0, vertex_count) }
    }

    fn create_texture(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Self::Texture, String> {
        unsafe {
            let texture = HasContext::create_texture(self)?;
            HasContext::bind_texture(self, glow::TEXTURE_2D, Some(texture));
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(rgba)),
            );
            HasContext::generate_mipmap(self, glow::TEXTURE_2D);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            HasContext::tex_parameter_i32(
                self,
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            HasContext::tex_parameter_i32(
                self,
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            HasContext::bind_texture(self, glow::TEXTURE_2D, None);
            Ok(texture)
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>) {
        unsafe {
            HasContext::active_texture(self, glow::TEXTURE0 + unit);
            HasContext::bind_texture(self, glow::TEXTURE_2D, texture);
        }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn clear(&self, color: Vec4) {
        unsafe {
            HasContext::clear_color(self, color.x, color.y, color.z, color.w);
            HasContext::clear(
                self,
                glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT,
            );
        }
    }

    fn viewport(&self, width: u32, height: u32) {
        unsafe { HasContext::viewport(self, 0, 0, width as i32, height as i32) }
    }

    fn enable_depth_test(&self) {
        unsafe { HasContext::enable(self, glow::DEPTH_TEST) }
    }

    fn set_multisample(&self, enabled: bool) {
        unsafe {
            if enabled {
                HasContext::enable(self, glow::MULTISAMPLE);
            } else {
                HasContext::disable(self, glow::MULTISAMPLE);
            }
        }
    }
}
