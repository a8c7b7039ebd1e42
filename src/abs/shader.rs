//! OpenGL Shaders
//!
//! This module defines [`ShaderUnit`], one editable shader stage, and [`ShaderProgram`], a linked
//! program. It also provides the [`Uniform`] trait for setting uniform variables in shader
//! programs.

use std::sync::Arc;

use glam::{Mat4, Vec2};
use shaderbench_core::{CompileError, CompileStatus, LinkError, ShaderStage};

use super::backend::Backend;

/// One shader stage: its source, its last successfully compiled object and the status of the most
/// recent compile.
///
/// A failed compile never replaces the compiled object, so a program can always be relinked from
/// the last source that worked.
pub struct ShaderUnit<B: Backend> {
    gl: Arc<B>,
    stage: ShaderStage,
    source: String,
    compiled: Option<B::Shader>,
    status: CompileStatus,
}

impl<B: Backend> ShaderUnit<B> {
    pub fn new(gl: &Arc<B>, stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            gl: Arc::clone(gl),
            stage,
            source: source.into(),
            compiled: None,
            status: CompileStatus::Uncompiled,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replaces the source. The status goes back to uncompiled; the last good object is kept.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.status = CompileStatus::Uncompiled;
    }

    pub fn status(&self) -> &CompileStatus {
        &self.status
    }

    /// The last successfully compiled shader object, if any compile ever succeeded.
    pub fn compiled(&self) -> Option<B::Shader> {
        self.compiled
    }

    /// Compiles the current source into a fresh shader object.
    pub fn compile(&mut self) -> Result<(), CompileError> {
        let shader = match self.gl.create_shader(self.stage) {
            Ok(shader) => shader,
            Err(e) => return Err(self.fail(e)),
        };

        if let Err(info_log) = self.gl.compile_shader(shader, &self.source) {
            self.gl.delete_shader(shader);
            return Err(self.fail(info_log));
        }

        if let Some(previous) = self.compiled.replace(shader) {
            self.gl.delete_shader(previous);
        }
        self.status = CompileStatus::Success;
        log::info!("{} compiled", self.stage);
        Ok(())
    }

    fn fail(&mut self, message: String) -> CompileError {
        let error = CompileError::new(self.stage, message.trim_end());
        log::warn!("{} failed to compile: {}", self.stage, error.message);
        self.status = CompileStatus::Failed(error.clone());
        error
    }
}

impl<B: Backend> Drop for ShaderUnit<B> {
    fn drop(&mut self) {
        if let Some(shader) = self.compiled.take() {
            self.gl.delete_shader(shader);
        }
    }
}

/// Represents a uniform variable in a shader program.
pub trait Uniform {
    /// Uploads the value to `location` of the bound program.
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation);
}

impl Uniform for bool {
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation) {
        gl.uniform_i32(location, *self as i32);
    }
}

impl Uniform for f32 {
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation) {
        gl.uniform_f32(location, *self);
    }
}

impl Uniform for i32 {
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation) {
        gl.uniform_i32(location, *self);
    }
}

impl Uniform for Vec2 {
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation) {
        gl.uniform_vec2(location, *self);
    }
}

impl Uniform for Mat4 {
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation) {
        gl.uniform_mat4(location, self);
    }
}

impl<T: Uniform> Uniform for &T {
    fn set_uniform<B: Backend>(&self, gl: &B, location: &B::UniformLocation) {
        (*self).set_uniform(gl, location);
    }
}

/// A successfully linked program.
pub struct ShaderProgram<B: Backend> {
    gl: Arc<B>,
    id: B::Program,
}

impl<B: Backend> ShaderProgram<B> {
    /// Links a new program from the given compiled shader objects. The shaders are detached again
    /// afterwards whether or not linking succeeded.
    pub fn link(gl: &Arc<B>, shaders: &[B::Shader]) -> Result<Self, LinkError> {
        let program = gl.create_program().map_err(LinkError)?;

        for shader in shaders {
            gl.attach_shader(program, *shader);
        }
        let linked = gl.link_program(program);
        for shader in shaders {
            gl.detach_shader(program, *shader);
        }

        if let Err(info_log) = linked {
            gl.delete_program(program);
            return Err(LinkError(info_log.trim_end().to_string()));
        }

        Ok(Self {
            gl: Arc::clone(gl),
            id: program,
        })
    }

    pub fn id(&self) -> B::Program {
        self.id
    }

    /// Binds the shader program for use.
    pub fn use_program(&self) {
        self.gl.use_program(Some(self.id));
    }

    /// Sets a uniform variable in the bound program. Returns `false` if the program has no active
    /// uniform called `name`.
    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) -> bool {
        match self.gl.uniform_location(self.id, name) {
            Some(location) => {
                value.set_uniform(self.gl.as_ref(), &location);
                true
            }
            None => false,
        }
    }

    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        self.gl.attrib_location(self.id, name)
    }
}

impl<B: Backend> Drop for ShaderProgram<B> {
    fn drop(&mut self) {
        self.gl.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::backend::testing::{Call, RecordingBackend};

    #[test]
    fn test_failed_compile_keeps_last_good_object() {
        let gl = Arc::new(RecordingBackend::new());
        let mut unit = ShaderUnit::new(&gl, ShaderStage::Fragment, "void main() {}");
        unit.compile().unwrap();
        let good = unit.compiled().unwrap();

        unit.set_source("#error broken");
        assert_eq!(unit.status(), &CompileStatus::Uncompiled);
        let err = unit.compile().unwrap_err();
        assert_eq!(err.source_id, "FS");
        assert!(matches!(unit.status(), CompileStatus::Failed(_)));
        assert_eq!(unit.compiled(), Some(good));
    }

    #[test]
    fn test_recompile_releases_previous_object() {
        let gl = Arc::new(RecordingBackend::new());
        let mut unit = ShaderUnit::new(&gl, ShaderStage::Vertex, "void main() {}");
        unit.compile().unwrap();
        let first = unit.compiled().unwrap();
        unit.compile().unwrap();
        assert_ne!(unit.compiled(), Some(first));
        assert!(gl.calls().contains(&Call::DeleteShader(first)));
    }

    #[test]
    fn test_link_detaches_shaders() {
        let gl = Arc::new(RecordingBackend::new());
        let mut vs = ShaderUnit::new(&gl, ShaderStage::Vertex, "");
        let mut fs = ShaderUnit::new(&gl, ShaderStage::Fragment, "");
        vs.compile().unwrap();
        fs.compile().unwrap();

        let shaders = [vs.compiled().unwrap(), fs.compiled().unwrap()];
        let program = ShaderProgram::link(&gl, &shaders).unwrap();
        assert!(gl.attached(program.id()).is_empty());

        let only_vertex = ShaderProgram::link(&gl, &shaders[..1]);
        assert!(only_vertex.is_err());
    }
}
