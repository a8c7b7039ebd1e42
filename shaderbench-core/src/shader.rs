//! Shader stage definitions and the bookkeeping around compile results.
//!
//! The GL-side shader object lives in the client; this module only describes what a stage is,
//! what state its last compile left it in, and the sources a fresh project starts with.

use crate::error::CompileError;

/// Source a new project's vertex stage starts with.
pub const DEFAULT_VERTEX_SOURCE: &str = include_str!("../assets/shaders/default.vert");

/// Source a new project's fragment stage starts with.
pub const DEFAULT_FRAGMENT_SOURCE: &str = include_str!("../assets/shaders/default.frag");

/// The programmable stages a project edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Identifier used in diagnostics to point at the offending source.
    pub fn source_id(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VS",
            ShaderStage::Fragment => "FS",
        }
    }

    /// Human readable stage name.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex shader",
            ShaderStage::Fragment => "Fragment shader",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of the most recent compile of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompileStatus {
    #[default]
    Uncompiled,
    Success,
    Failed(CompileError),
}

impl CompileStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileStatus::Success)
    }
}
