//! The project store: everything an authoring session persists, and its JSON file format.
//!
//! The file is a single JSON object:
//!
//! ```json
//! {
//!   "file_version": "0.1.0",
//!   "vsSource": "...",
//!   "fsSource": "...",
//!   "meshName": "Cube",
//!   "textureData": { "slot0": "<base64 png>" },
//!   "realtime": false,
//!   "plane2D": false,
//!   "modelRotation": [0.0, 0.0, 0.0],
//!   "cameraPosition": [0.0, 0.0, -5.0]
//! }
//! ```
//!
//! Every key is optional when reading; a missing key keeps the default. Unknown keys are ignored.
//! Writing always emits every key.

use std::{
    fs,
    path::{Path, PathBuf},
};

use glam::Vec3;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::ProjectError,
    mesh::DEFAULT_MESH_NAME,
    shader::{DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE, ShaderStage},
    texture::TextureSlot,
    transform::{DEFAULT_CAMERA_POSITION, DEFAULT_MODEL_ROTATION},
};

/// Version stamped into newly created projects.
pub const FILE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extension used for project files.
pub const PROJECT_EXTENSION: &str = "shaderbench";

/// File names written by [`ProjectDocument::export_shaders`].
pub const EXPORTED_VERTEX_FILE: &str = "vs.glsl";
pub const EXPORTED_FRAGMENT_FILE: &str = "fs.glsl";

/// On-disk shape of a project. All fields are optional so old and new files both load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectFile {
    file_version: Option<String>,
    #[serde(rename = "vsSource")]
    vs_source: Option<String>,
    #[serde(rename = "fsSource")]
    fs_source: Option<String>,
    #[serde(rename = "meshName")]
    mesh_name: Option<String>,
    #[serde(rename = "textureData")]
    texture_data: Option<IndexMap<String, String>>,
    realtime: Option<bool>,
    #[serde(rename = "plane2D")]
    plane_2d: Option<bool>,
    #[serde(rename = "modelRotation")]
    model_rotation: Option<[f32; 3]>,
    #[serde(rename = "cameraPosition")]
    camera_position: Option<[f32; 3]>,
}

/// The state of one authoring session.
///
/// Every setter marks the document dirty, even when the value does not change. Only a successful
/// [`save`](Self::save) or [`load`](Self::load) clears the flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    path: Option<PathBuf>,
    file_version: String,
    vertex_source: String,
    fragment_source: String,
    mesh_name: String,
    texture_data: IndexMap<String, String>,
    realtime: bool,
    plane_2d: bool,
    model_rotation: Vec3,
    camera_position: Vec3,
    dirty: bool,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            path: None,
            file_version: FILE_VERSION.to_string(),
            vertex_source: DEFAULT_VERTEX_SOURCE.to_string(),
            fragment_source: DEFAULT_FRAGMENT_SOURCE.to_string(),
            mesh_name: DEFAULT_MESH_NAME.to_string(),
            texture_data: IndexMap::new(),
            realtime: false,
            plane_2d: false,
            model_rotation: DEFAULT_MODEL_ROTATION,
            camera_position: DEFAULT_CAMERA_POSITION,
            dirty: false,
        }
    }
}

impl ProjectDocument {
    /// A fresh, unsaved project with default sources and pose.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a project file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ProjectError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ProjectFile = serde_json::from_slice(&bytes)
            .map_err(|e| ProjectError::InvalidFormat(format!("{}: {e}", path.display())))?;

        let mut document = Self::default();
        if let Some(version) = file.file_version {
            document.file_version = version;
        }
        if let Some(source) = file.vs_source {
            document.vertex_source = source;
        }
        if let Some(source) = file.fs_source {
            document.fragment_source = source;
        }
        if let Some(name) = file.mesh_name {
            document.mesh_name = name;
        }
        if let Some(textures) = file.texture_data {
            document.texture_data = textures;
        }
        if let Some(realtime) = file.realtime {
            document.realtime = realtime;
        }
        if let Some(plane_2d) = file.plane_2d {
            document.plane_2d = plane_2d;
        }
        if let Some(rotation) = file.model_rotation {
            document.model_rotation = Vec3::from(rotation);
        }
        if let Some(position) = file.camera_position {
            document.camera_position = Vec3::from(position);
        }
        document.path = Some(path.to_path_buf());
        document.dirty = false;

        log::info!("Loaded project \"{}\"", path.display());
        Ok(document)
    }

    /// Writes the project to its path.
    ///
    /// The file is written next to the target and then moved into place, so a failed write never
    /// leaves a truncated project behind.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        let path = match &self.path {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => return Err(ProjectError::EmptyPath),
        };

        let file = ProjectFile {
            file_version: Some(self.file_version.clone()),
            vs_source: Some(self.vertex_source.clone()),
            fs_source: Some(self.fragment_source.clone()),
            mesh_name: Some(self.mesh_name.clone()),
            texture_data: Some(self.texture_data.clone()),
            realtime: Some(self.realtime),
            plane_2d: Some(self.plane_2d),
            model_rotation: Some(self.model_rotation.to_array()),
            camera_position: Some(self.camera_position.to_array()),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| ProjectError::InvalidFormat(e.to_string()))?;

        let io_failure = |source| ProjectError::IoFailure {
            path: path.clone(),
            source,
        };
        let staging = staging_path(&path);
        fs::write(&staging, json).map_err(io_failure)?;
        if let Err(source) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(io_failure(source));
        }

        self.dirty = false;
        log::info!("Saved project \"{}\"", path.display());
        Ok(())
    }

    /// Saves under a new path. On failure the previous path is kept.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), ProjectError> {
        let previous = self.path.replace(path.into());
        let result = self.save();
        if result.is_err() {
            self.path = previous;
        }
        result
    }

    /// Writes the vertex and fragment sources into `dir` as plain GLSL files. Both files are
    /// attempted even if the first one fails; the first failure is returned. The document itself
    /// is not modified.
    pub fn export_shaders(&self, dir: impl AsRef<Path>) -> Result<(), ProjectError> {
        let dir = dir.as_ref();
        let mut first_error = None;
        for stage in ShaderStage::ALL {
            let path = dir.join(exported_file_name(stage));
            if let Err(source) = fs::write(&path, self.source(stage)) {
                log::error!("Could not create shader file \"{}\": {source}", path.display());
                if first_error.is_none() {
                    first_error = Some(ProjectError::IoFailure { path, source });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                log::info!("Exported shaders to \"{}\"", dir.display());
                Ok(())
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file_version(&self) -> &str {
        &self.file_version
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn source(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex_source,
            ShaderStage::Fragment => &self.fragment_source,
        }
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    pub fn texture_data(&self) -> &IndexMap<String, String> {
        &self.texture_data
    }

    pub fn texture_payload(&self, slot: TextureSlot) -> Option<&str> {
        self.texture_data.get(slot.name()).map(String::as_str)
    }

    pub fn realtime(&self) -> bool {
        self.realtime
    }

    pub fn plane_2d(&self) -> bool {
        self.plane_2d
    }

    pub fn model_rotation(&self) -> Vec3 {
        self.model_rotation
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
        self.dirty = true;
    }

    pub fn set_vertex_source(&mut self, source: impl Into<String>) {
        self.vertex_source = source.into();
        self.dirty = true;
    }

    pub fn set_fragment_source(&mut self, source: impl Into<String>) {
        self.fragment_source = source.into();
        self.dirty = true;
    }

    pub fn set_source(&mut self, stage: ShaderStage, source: impl Into<String>) {
        match stage {
            ShaderStage::Vertex => self.set_vertex_source(source),
            ShaderStage::Fragment => self.set_fragment_source(source),
        }
    }

    pub fn set_mesh_name(&mut self, name: impl Into<String>) {
        self.mesh_name = name.into();
        self.dirty = true;
    }

    pub fn set_texture_payload(&mut self, slot_name: impl Into<String>, payload: impl Into<String>) {
        self.texture_data.insert(slot_name.into(), payload.into());
        self.dirty = true;
    }

    /// Empties the payload of a slot, keeping its key.
    pub fn clear_texture(&mut self, slot_name: &str) {
        self.texture_data.insert(slot_name.to_string(), String::new());
        self.dirty = true;
    }

    pub fn set_realtime(&mut self, realtime: bool) {
        self.realtime = realtime;
        self.dirty = true;
    }

    pub fn set_plane_2d(&mut self, plane_2d: bool) {
        self.plane_2d = plane_2d;
        self.dirty = true;
    }

    pub fn set_model_rotation(&mut self, rotation: Vec3) {
        self.model_rotation = rotation;
        self.dirty = true;
    }

    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
        self.dirty = true;
    }
}

fn exported_file_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => EXPORTED_VERTEX_FILE,
        ShaderStage::Fragment => EXPORTED_FRAGMENT_FILE,
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> ProjectDocument {
        let mut doc = ProjectDocument::new();
        doc.set_vertex_source("void main() { gl_Position = vec4(0.1); }");
        doc.set_fragment_source("void main() {}\n// \"quoted\" \u{e9}");
        doc.set_mesh_name("Torus");
        doc.set_texture_payload("slot0", "aGVsbG8=");
        doc.clear_texture("slot2");
        doc.set_realtime(true);
        doc.set_plane_2d(true);
        doc.set_model_rotation(Vec3::new(0.1, -1.2345678, std::f32::consts::PI));
        doc.set_camera_position(Vec3::new(1.0e-7, 3.3333333, -5.0));
        doc
    }

    #[test]
    fn test_save_then_load_reproduces_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.shaderbench");

        let mut doc = populated();
        doc.save_as(&path).unwrap();
        assert!(!doc.is_dirty());

        let loaded = ProjectDocument::load(&path).unwrap();
        assert!(!loaded.is_dirty());
        assert_eq!(loaded, doc);
        assert_eq!(loaded.model_rotation().to_array(), doc.model_rotation().to_array());
        assert_eq!(loaded.texture_payload(TextureSlot::Slot2), Some(""));
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.shaderbench");
        fs::write(
            &path,
            r#"{ "meshName": "Sphere", "plane2D": true, "someFutureKey": [1, 2, 3] }"#,
        )
        .unwrap();

        let doc = ProjectDocument::load(&path).unwrap();
        assert_eq!(doc.mesh_name(), "Sphere");
        assert!(doc.plane_2d());
        assert!(doc.texture_data().is_empty());
        assert_eq!(doc.vertex_source(), DEFAULT_VERTEX_SOURCE);
        assert_eq!(doc.camera_position(), DEFAULT_CAMERA_POSITION);
        assert!(!doc.realtime());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectDocument::load(dir.path().join("missing.shaderbench")),
            Err(ProjectError::NotFound { .. })
        ));

        let garbage = dir.path().join("legacy.shaderbench");
        fs::write(&garbage, [0x16u8, 0x00, 0x00, 0x00, 0x73, 0x65]).unwrap();
        assert!(matches!(
            ProjectDocument::load(&garbage),
            Err(ProjectError::InvalidFormat(_))
        ));

        let wrong_type = dir.path().join("wrong.shaderbench");
        fs::write(&wrong_type, r#"{ "modelRotation": [1, 2] }"#).unwrap();
        assert!(matches!(
            ProjectDocument::load(&wrong_type),
            Err(ProjectError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_save_errors_leave_document_untouched() {
        let mut doc = populated();
        assert!(matches!(doc.save(), Err(ProjectError::EmptyPath)));
        assert!(doc.is_dirty());

        let dir = tempfile::tempdir().unwrap();
        let unreachable = dir.path().join("no-such-dir").join("p.shaderbench");
        assert!(matches!(
            doc.save_as(&unreachable),
            Err(ProjectError::IoFailure { .. })
        ));
        assert!(doc.is_dirty());
        assert_eq!(doc.path(), None);
    }

    #[test]
    fn test_setters_mark_dirty_even_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ProjectDocument::new();
        doc.save_as(dir.path().join("p.shaderbench")).unwrap();
        assert!(!doc.is_dirty());

        let same = doc.mesh_name().to_string();
        doc.set_mesh_name(same);
        assert!(doc.is_dirty());

        doc.save().unwrap();
        doc.set_realtime(doc.realtime());
        assert!(doc.is_dirty());
    }

    #[test]
    fn test_written_file_has_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.shaderbench");
        ProjectDocument::new().save_as(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "file_version",
            "vsSource",
            "fsSource",
            "meshName",
            "textureData",
            "realtime",
            "plane2D",
            "modelRotation",
            "cameraPosition",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(!dir.path().join("keys.shaderbench.tmp").exists());
    }

    #[test]
    fn test_export_writes_both_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = populated();
        doc.save_as(dir.path().join("p.shaderbench")).unwrap();

        doc.export_shaders(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(EXPORTED_VERTEX_FILE)).unwrap(),
            doc.vertex_source()
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(EXPORTED_FRAGMENT_FILE)).unwrap(),
            doc.fragment_source()
        );
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_export_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        match ProjectDocument::new().export_shaders(&missing) {
            Err(ProjectError::IoFailure { path, .. }) => {
                assert_eq!(path, missing.join(EXPORTED_VERTEX_FILE));
            }
            other => panic!("expected IoFailure, got {other:?}"),
        }
        assert!(!missing.exists());
    }
}
