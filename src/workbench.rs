//! One authoring session: the open project, the preview pipeline, the pose and the pointer
//! controller, kept in step with each other.
//!
//! Every edit goes through here so the project document sees it. The document is the only thing
//! that is saved; the pipeline is rebuilt from it on open and on reset.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use glam::{Vec2, Vec3};
use image::DynamicImage;
use shaderbench_core::{
    ProjectDocument, ProjectError, ShaderStage, TextureError,
    events::{Notifier, StateEvent},
    interaction::{InteractionController, PointerButton},
    mesh::MeshSource,
    realtime::RealtimeClock,
    texture::{TextureSlot, decode_slots, encode_payload},
    transform::TransformState,
};
use thiserror::Error;

use crate::{
    abs::{Backend, GpuError},
    render::RenderPipeline,
};

#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

pub struct Workbench<B: Backend> {
    document: ProjectDocument,
    pipeline: RenderPipeline<B>,
    transform: TransformState,
    controller: InteractionController,
    clock: RealtimeClock,
    realtime_compilation: bool,
    state_events: Notifier<StateEvent>,
    was_dirty: bool,
    needs_redraw: bool,
}

impl<B: Backend> Workbench<B> {
    /// Starts a session on a fresh project.
    pub fn new(gl: &Arc<B>, meshes: Arc<dyn MeshSource>, now: Instant) -> Self {
        let document = ProjectDocument::new();
        let pipeline = RenderPipeline::new(
            gl,
            meshes,
            document.vertex_source(),
            document.fragment_source(),
        );
        let mut workbench = Self {
            document,
            pipeline,
            transform: TransformState::default(),
            controller: InteractionController::new(),
            clock: RealtimeClock::new(),
            realtime_compilation: true,
            state_events: Notifier::new(),
            was_dirty: false,
            needs_redraw: true,
        };
        workbench.apply_document(now);
        workbench
    }

    pub fn document(&self) -> &ProjectDocument {
        &self.document
    }

    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline<B> {
        &mut self.pipeline
    }

    pub fn state_events(&mut self) -> &mut Notifier<StateEvent> {
        &mut self.state_events
    }

    pub fn set_realtime_compilation(&mut self, enabled: bool) {
        self.realtime_compilation = enabled;
    }

    pub fn set_multisample(&mut self, enabled: bool) {
        self.pipeline.set_multisample(enabled);
        self.needs_redraw = true;
    }

    pub fn set_clear_color(&mut self, color: Vec3) {
        self.pipeline.set_clear_color(color);
        self.needs_redraw = true;
    }

    /// Pushes the whole document into the pipeline, pose and clock.
    fn apply_document(&mut self, now: Instant) {
        for stage in ShaderStage::ALL {
            self.pipeline
                .set_source(stage, self.document.source(stage).to_string());
        }
        self.pipeline.compile();
        self.pipeline.select_mesh(self.document.mesh_name());

        for slot in TextureSlot::ALL {
            self.pipeline.remove_texture(slot);
        }
        for (slot, decoded) in decode_slots(self.document.texture_data()) {
            let uploaded = match decoded {
                Ok(Some(image)) => self.pipeline.set_texture(slot, &image),
                Ok(None) => self.pipeline.clear_texture(slot),
                Err(e) => {
                    log::warn!("Texture {slot} could not be decoded: {e}");
                    continue;
                }
            };
            if let Err(e) = uploaded {
                log::error!("Texture {slot} could not be uploaded: {e}");
            }
        }

        let plane_2d = self.document.plane_2d();
        self.pipeline.set_plane_2d(plane_2d);
        self.controller.release();
        self.controller.set_plane_2d(plane_2d);
        self.transform.model_rotation = self.document.model_rotation();
        self.transform.camera_position = self.document.camera_position();
        self.clock.set_enabled(self.document.realtime(), now);
        self.needs_redraw = true;
    }

    /// Emits `Modified` or `Saved` when the dirty flag flipped since the last call.
    fn sync_dirty(&mut self) {
        let dirty = self.document.is_dirty();
        if dirty != self.was_dirty {
            self.was_dirty = dirty;
            self.state_events.emit(if dirty {
                StateEvent::Modified
            } else {
                StateEvent::Saved
            });
        }
    }

    fn status(&mut self, message: String) {
        self.state_events.emit(StateEvent::Status(message));
    }

    /// Opens a project. On failure the current session is left as it was.
    pub fn open(&mut self, path: impl AsRef<Path>, now: Instant) -> Result<(), ProjectError> {
        let document = ProjectDocument::load(path)?;
        self.document = document;
        self.apply_document(now);
        self.sync_dirty();
        if let Some(path) = self.document.path() {
            let message = format!("Opened {}", path.display());
            self.status(message);
        }
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), ProjectError> {
        let result = self.document.save();
        self.sync_dirty();
        result
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), ProjectError> {
        let result = self.document.save_as(path);
        self.sync_dirty();
        result
    }

    /// Writes both shader sources into `dir` as `vs.glsl` and `fs.glsl`.
    pub fn export_shaders(&mut self, dir: impl AsRef<Path>) -> Result<(), ProjectError> {
        let dir = dir.as_ref();
        self.document.export_shaders(dir)?;
        self.status(format!("Exported shaders to {}", dir.display()));
        Ok(())
    }

    /// Replaces the project with a fresh one and applies it.
    pub fn new_project(&mut self, now: Instant) {
        self.document = ProjectDocument::new();
        self.apply_document(now);
        self.sync_dirty();
        self.status("New project".to_string());
    }

    /// Takes new source text for a stage. With realtime compilation on, this recompiles right away.
    pub fn set_source(&mut self, stage: ShaderStage, source: impl Into<String>) {
        let source = source.into();
        self.pipeline.set_source(stage, source.clone());
        self.document.set_source(stage, source);
        self.sync_dirty();
        if self.realtime_compilation {
            self.compile();
        }
    }

    /// Replaces several sources at once, then compiles once regardless of the realtime compilation
    /// setting.
    pub fn load_sources(&mut self, sources: impl IntoIterator<Item = (ShaderStage, String)>) -> bool {
        for (stage, source) in sources {
            self.pipeline.set_source(stage, source.clone());
            self.document.set_source(stage, source);
        }
        self.sync_dirty();
        self.compile()
    }

    /// Compiles both stages and relinks. Returns whether everything succeeded.
    pub fn compile(&mut self) -> bool {
        self.needs_redraw = true;
        self.pipeline.compile()
    }

    pub fn select_mesh(&mut self, name: &str) {
        self.document.set_mesh_name(name);
        self.pipeline.select_mesh(name);
        self.needs_redraw = true;
        self.sync_dirty();
    }

    /// Puts `image` into a slot and stores it in the project.
    pub fn set_texture(&mut self, slot: TextureSlot, image: &DynamicImage) -> Result<(), WorkbenchError> {
        let payload = encode_payload(image)?;
        self.pipeline.set_texture(slot, image)?;
        self.document.set_texture_payload(slot.name(), payload);
        self.needs_redraw = true;
        self.sync_dirty();
        Ok(())
    }

    /// Decodes an image file and puts it into a slot.
    pub fn load_texture_file(&mut self, slot: TextureSlot, path: impl AsRef<Path>) -> Result<(), WorkbenchError> {
        let image = image::open(path).map_err(TextureError::from)?;
        self.set_texture(slot, &image)
    }

    pub fn clear_texture(&mut self, slot: TextureSlot) -> Result<(), WorkbenchError> {
        self.pipeline.clear_texture(slot)?;
        self.document.clear_texture(slot.name());
        self.needs_redraw = true;
        self.sync_dirty();
        Ok(())
    }

    pub fn set_realtime(&mut self, enabled: bool, now: Instant) {
        self.document.set_realtime(enabled);
        self.clock.set_enabled(enabled, now);
        log::info!("Realtime {}", if enabled { "enabled" } else { "disabled" });
        self.needs_redraw = true;
        self.sync_dirty();
    }

    pub fn toggle_realtime(&mut self, now: Instant) {
        self.set_realtime(!self.document.realtime(), now);
    }

    pub fn set_plane_2d(&mut self, plane_2d: bool) {
        self.document.set_plane_2d(plane_2d);
        self.pipeline.set_plane_2d(plane_2d);
        self.controller.set_plane_2d(plane_2d);
        self.needs_redraw = true;
        self.sync_dirty();
    }

    pub fn toggle_plane_2d(&mut self) {
        self.set_plane_2d(!self.document.plane_2d());
    }

    pub fn pointer_pressed(&mut self, button: PointerButton, position: Vec2) {
        self.controller.press(button, position, &self.transform);
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        if self.controller.move_to(position, &mut self.transform) {
            self.needs_redraw = true;
        }
    }

    /// Ends the active pointer mode and stores the resulting pose in the project.
    pub fn pointer_released(&mut self) {
        if self.controller.release() {
            self.store_pose();
        }
    }

    pub fn double_click(&mut self) {
        if self.controller.double_click(&mut self.transform) {
            self.store_pose();
            self.needs_redraw = true;
        }
    }

    fn store_pose(&mut self) {
        self.document.set_model_rotation(self.transform.model_rotation);
        self.document.set_camera_position(self.transform.camera_position);
        self.sync_dirty();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.transform.resize(width, height);
        self.pipeline.resize(width, height);
        self.needs_redraw = true;
    }

    /// Takes in finished meshes and realtime ticks. Returns whether a frame should be drawn.
    pub fn update(&mut self, now: Instant) -> bool {
        if self.pipeline.update() {
            self.needs_redraw = true;
        }
        if self.clock.poll(now) {
            self.needs_redraw = true;
        }
        self.needs_redraw
    }

    /// Draws a frame and schedules the next realtime tick.
    pub fn render(&mut self, now: Instant) {
        self.pipeline.render(&self.transform, self.clock.elapsed());
        self.needs_redraw = false;
        self.clock.finish_tick(now);
    }

    /// How long the event loop may sleep before the next realtime tick is due.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.clock.time_until_tick(now)
    }

    /// Window title: project file name plus an unsaved marker.
    pub fn title(&self) -> String {
        let name = self
            .document
            .path()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        let marker = if self.document.is_dirty() { "*" } else { "" };
        format!("Shaderbench - {name}{marker}")
    }
}

#[cfg(test)]
impl<B: Backend> Workbench<B> {
    pub fn pipeline(&self) -> &RenderPipeline<B> {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs, rc::Rc, thread};

    use glam::Mat4;
    use image::RgbaImage;
    use shaderbench_core::{mesh::BuiltinMeshes, realtime::FRAME_INTERVAL};

    use super::*;
    use crate::{
        abs::testing::{Call, RecordingBackend, UniformValue},
        render::{MODEL_UNIFORM, RESOLUTION_UNIFORM, VIEW_UNIFORM},
    };

    fn workbench(now: Instant) -> (Arc<RecordingBackend>, Workbench<RecordingBackend>) {
        let gl = Arc::new(RecordingBackend::new());
        let workbench = Workbench::new(&gl, Arc::new(BuiltinMeshes), now);
        (gl, workbench)
    }

    fn settle(workbench: &mut Workbench<RecordingBackend>, now: Instant) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while workbench.pipeline().is_loading() {
            assert!(Instant::now() < deadline, "mesh worker timed out");
            thread::sleep(Duration::from_millis(5));
            workbench.update(now);
        }
    }

    fn recorded(workbench: &mut Workbench<RecordingBackend>) -> Rc<RefCell<Vec<StateEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        workbench
            .state_events()
            .subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn test_project_drives_the_preview() {
        let now = Instant::now();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.shaderbench");
        let project = serde_json::json!({
            "vsSource": shaderbench_core::shader::DEFAULT_VERTEX_SOURCE,
            "fsSource": shaderbench_core::shader::DEFAULT_FRAGMENT_SOURCE,
            "meshName": "Cube",
            "realtime": false,
            "plane2D": false,
            "modelRotation": [0.0, 0.0, 0.0],
            "cameraPosition": [0.0, 0.0, -5.0]
        });
        fs::write(&path, project.to_string()).unwrap();

        let (gl, mut workbench) = workbench(now);
        workbench.open(&path, now).unwrap();
        settle(&mut workbench, now);

        gl.take_calls();
        workbench.render(now);
        let calls = gl.take_calls();
        assert!(calls.contains(&Call::DrawTriangles(36)));
        assert!(calls.contains(&Call::Uniform(
            MODEL_UNIFORM.into(),
            UniformValue::Mat4(Mat4::IDENTITY)
        )));
        assert!(calls.contains(&Call::Uniform(
            VIEW_UNIFORM.into(),
            UniformValue::Mat4(Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)))
        )));

        workbench.toggle_plane_2d();
        workbench.render(now);
        let calls = gl.take_calls();
        assert!(calls.contains(&Call::DrawTriangles(6)));
        assert!(!calls.contains(&Call::DrawTriangles(36)));
        assert!(calls.contains(&Call::Uniform(
            VIEW_UNIFORM.into(),
            UniformValue::Mat4(Mat4::IDENTITY)
        )));
    }

    #[test]
    fn test_failed_open_leaves_session_untouched() {
        let now = Instant::now();
        let (_gl, mut workbench) = workbench(now);
        workbench.select_mesh("Torus");
        let before = workbench.document().clone();

        let dir = tempfile::tempdir().unwrap();
        assert!(workbench.open(dir.path().join("missing.shaderbench"), now).is_err());
        assert_eq!(workbench.document(), &before);
        assert_eq!(workbench.pipeline().mesh_name(), "Torus");
    }

    #[test]
    fn test_dirty_transitions_are_announced() {
        let now = Instant::now();
        let dir = tempfile::tempdir().unwrap();
        let (_gl, mut workbench) = workbench(now);
        let events = recorded(&mut workbench);

        workbench.set_plane_2d(true);
        workbench.set_plane_2d(true);
        assert!(workbench.title().ends_with('*'));
        workbench.save_as(dir.path().join("p.shaderbench")).unwrap();
        assert_eq!(workbench.title(), "Shaderbench - p.shaderbench");

        assert_eq!(*events.borrow(), vec![StateEvent::Modified, StateEvent::Saved]);
    }

    #[test]
    fn test_realtime_compilation_recompiles_on_edit() {
        let now = Instant::now();
        let (gl, mut workbench) = workbench(now);
        assert!(workbench.pipeline().has_program());

        gl.take_calls();
        workbench.set_source(ShaderStage::Fragment, "void main() {}");
        assert!(gl.calls().iter().any(|c| matches!(c, Call::LinkProgram(_))));
        assert_eq!(workbench.document().fragment_source(), "void main() {}");

        workbench.set_realtime_compilation(false);
        gl.take_calls();
        workbench.set_source(ShaderStage::Fragment, "#error later");
        assert!(!gl.calls().iter().any(|c| matches!(c, Call::CompileShader(_))));
        assert!(!workbench.compile());
    }

    #[test]
    fn test_pose_is_stored_on_release() {
        let now = Instant::now();
        let (_gl, mut workbench) = workbench(now);
        workbench.pointer_pressed(PointerButton::Right, Vec2::new(0.0, 0.0));
        workbench.pointer_moved(Vec2::new(100.0, 0.0));
        assert_eq!(workbench.document().camera_position(), Vec3::new(0.0, 0.0, -5.0));

        workbench.pointer_released();
        assert_eq!(workbench.document().camera_position(), Vec3::new(1.0, 0.0, -5.0));

        workbench.double_click();
        assert_eq!(workbench.document().camera_position(), Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn test_realtime_ticks_stop_when_disabled() {
        let now = Instant::now();
        let (_gl, mut workbench) = workbench(now);
        settle(&mut workbench, now);
        workbench.render(now);

        workbench.set_realtime(true, now);
        workbench.set_realtime(false, now + FRAME_INTERVAL / 2);
        workbench.render(now + FRAME_INTERVAL / 2);
        assert!(!workbench.update(now + FRAME_INTERVAL * 2));
        assert_eq!(workbench.time_until_tick(now + FRAME_INTERVAL * 2), None);

        workbench.set_realtime(true, now + FRAME_INTERVAL * 3);
        workbench.render(now + FRAME_INTERVAL * 3);
        assert!(!workbench.update(now + FRAME_INTERVAL * 3));
        assert!(workbench.update(now + FRAME_INTERVAL * 4));
    }

    #[test]
    fn test_resize_keeps_viewport_and_resolution_equal() {
        let now = Instant::now();
        let (gl, mut workbench) = workbench(now);
        workbench.resize(1800, 1400);
        workbench.render(now);

        let calls = gl.take_calls();
        assert!(calls.contains(&Call::Viewport(1800, 1400)));
        assert!(calls.contains(&Call::Uniform(
            RESOLUTION_UNIFORM.into(),
            UniformValue::Vec2(Vec2::new(1800.0, 1400.0))
        )));
    }

    #[test]
    fn test_export_shaders_reports_status() {
        let now = Instant::now();
        let dir = tempfile::tempdir().unwrap();
        let (_gl, mut workbench) = workbench(now);
        let events = recorded(&mut workbench);
        workbench.set_source(ShaderStage::Fragment, "void main() {}");

        workbench.export_shaders(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("fs.glsl")).unwrap(),
            "void main() {}"
        );
        assert!(dir.path().join("vs.glsl").is_file());
        assert!(matches!(events.borrow().last(), Some(StateEvent::Status(_))));

        assert!(workbench.export_shaders(dir.path().join("missing")).is_err());
        assert!(matches!(events.borrow().last(), Some(StateEvent::Status(_))));
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_textures_are_stored_in_project() {
        let now = Instant::now();
        let (_gl, mut workbench) = workbench(now);
        let image = DynamicImage::ImageRgba8(RgbaImage::new(3, 3));

        workbench.set_texture(TextureSlot::Slot0, &image).unwrap();
        let payload = workbench
            .document()
            .texture_payload(TextureSlot::Slot0)
            .unwrap()
            .to_string();
        assert!(!payload.is_empty());

        workbench.clear_texture(TextureSlot::Slot0).unwrap();
        assert_eq!(workbench.document().texture_payload(TextureSlot::Slot0), Some(""));
        assert!(workbench.pipeline().has_texture(TextureSlot::Slot0));

        workbench.new_project(now);
        assert!(workbench.document().texture_data().is_empty());
        assert!(!workbench.pipeline().has_texture(TextureSlot::Slot0));
    }
}
