//! Resolution of logical mesh names (`Cube`, `Torus`, ...) to OBJ text.

use std::path::PathBuf;

use include_dir::{Dir, include_dir};

use crate::error::MeshLoadError;

static BUILTIN_MODELS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets/models");

/// Mesh a project falls back to when its mesh name is empty or unknown.
pub const DEFAULT_MESH_NAME: &str = "Cube";

/// Mesh drawn in plane 2D mode.
pub const PLANE_MESH_NAME: &str = "Plane";

/// Meshes offered for quick loading. `Teapot` and `Bunny` are not embedded; they resolve through
/// the user mesh directory (`Teapot.obj`, `Bunny.obj`).
pub const QUICK_LOAD_MESHES: [&str; 6] = ["Cube", "Sphere", "Torus", "Plane", "Teapot", "Bunny"];

/// Maps a logical mesh name to loadable OBJ text.
///
/// Implementations are called from the mesh worker thread.
pub trait MeshSource: Send + Sync {
    /// Returns the OBJ text for `name`.
    fn resolve(&self, name: &str) -> Result<String, MeshLoadError>;

    /// Whether `name` can be resolved, without reading it.
    fn contains(&self, name: &str) -> bool;
}

/// Meshes embedded into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinMeshes;

impl BuiltinMeshes {
    /// Names of every embedded mesh, in display order.
    pub const NAMES: [&'static str; 4] = ["Cube", "Sphere", "Torus", "Plane"];

    fn file_name(name: &str) -> String {
        format!("{}.obj", name.to_ascii_lowercase())
    }
}

impl MeshSource for BuiltinMeshes {
    fn resolve(&self, name: &str) -> Result<String, MeshLoadError> {
        if !self.contains(name) {
            return Err(MeshLoadError::UnknownMesh(name.to_string()));
        }
        BUILTIN_MODELS
            .get_file(Self::file_name(name))
            .and_then(|file| file.contents_utf8())
            .map(str::to_string)
            .ok_or_else(|| MeshLoadError::UnknownMesh(name.to_string()))
    }

    /// Names match exactly, so the loader cache never holds the same mesh under two spellings.
    fn contains(&self, name: &str) -> bool {
        Self::NAMES.iter().any(|builtin| *builtin == name)
    }
}

/// Meshes read from `<root>/<name>.obj` on disk.
#[derive(Debug, Clone)]
pub struct DirectoryMeshes {
    root: PathBuf,
}

impl DirectoryMeshes {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        // Names are plain identifiers, never paths.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        Some(self.root.join(format!("{name}.obj")))
    }
}

impl MeshSource for DirectoryMeshes {
    fn resolve(&self, name: &str) -> Result<String, MeshLoadError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| MeshLoadError::UnknownMesh(name.to_string()))?;
        std::fs::read_to_string(&path).map_err(|e| MeshLoadError::Io {
            name: name.to_string(),
            message: format!("{}: {e}", path.display()),
        })
    }

    fn contains(&self, name: &str) -> bool {
        self.path_for(name).is_some_and(|path| path.is_file())
    }
}

/// Tries each source in order; the first one that knows the name wins.
pub struct MeshSources {
    sources: Vec<Box<dyn MeshSource>>,
}

impl MeshSources {
    pub fn new(sources: Vec<Box<dyn MeshSource>>) -> Self {
        Self { sources }
    }

    /// Built-in meshes, then an optional user directory.
    pub fn with_user_dir(dir: Option<PathBuf>) -> Self {
        let mut sources: Vec<Box<dyn MeshSource>> = vec![Box::new(BuiltinMeshes)];
        if let Some(dir) = dir {
            sources.push(Box::new(DirectoryMeshes::new(dir)));
        }
        Self::new(sources)
    }
}

impl MeshSource for MeshSources {
    fn resolve(&self, name: &str) -> Result<String, MeshLoadError> {
        self.sources
            .iter()
            .find(|source| source.contains(name))
            .ok_or_else(|| MeshLoadError::UnknownMesh(name.to_string()))?
            .resolve(name)
    }

    fn contains(&self, name: &str) -> bool {
        self.sources.iter().any(|source| source.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::parse_obj;

    #[test]
    fn test_builtin_meshes_parse() {
        for name in BuiltinMeshes::NAMES {
            let text = BuiltinMeshes.resolve(name).unwrap();
            let mesh = parse_obj(&text).unwrap();
            assert!(mesh.triangle_count() > 0, "{name} is empty");
        }
    }

    #[test]
    fn test_builtin_cube_is_twelve_triangles() {
        let mesh = parse_obj(&BuiltinMeshes.resolve("Cube").unwrap()).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_unknown_builtin() {
        assert_eq!(
            BuiltinMeshes.resolve("Teapot"),
            Err(MeshLoadError::UnknownMesh("Teapot".to_string()))
        );
    }

    #[test]
    fn test_builtin_names_are_exact() {
        assert!(BuiltinMeshes.contains("Cube"));
        assert!(!BuiltinMeshes.contains("cube"));
        assert_eq!(
            BuiltinMeshes.resolve("cube"),
            Err(MeshLoadError::UnknownMesh("cube".to_string()))
        );
    }

    #[test]
    fn test_quick_load_meshes_from_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Teapot.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let sources = MeshSources::with_user_dir(Some(dir.path().to_path_buf()));
        let missing: Vec<_> = QUICK_LOAD_MESHES
            .into_iter()
            .filter(|name| !sources.contains(name))
            .collect();
        assert_eq!(missing, vec!["Bunny"]);
        assert_eq!(parse_obj(&sources.resolve("Teapot").unwrap()).unwrap().triangle_count(), 1);
    }

    #[test]
    fn test_directory_source_and_chaining() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let sources = MeshSources::with_user_dir(Some(dir.path().to_path_buf()));
        assert!(sources.contains("Cube"));
        assert!(sources.contains("Tri"));
        assert!(!sources.contains("../Tri"));
        assert!(parse_obj(&sources.resolve("Tri").unwrap()).is_ok());
        assert!(matches!(
            sources.resolve("Missing"),
            Err(MeshLoadError::UnknownMesh(_))
        ));
    }
}
