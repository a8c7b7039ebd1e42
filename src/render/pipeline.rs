//! The live preview: shader stages, the linked program, the mesh and plane vertex arrays, the
//! texture slots and the per-frame draw.
//!
//! Every GL call made from here happens on the thread that owns the pipeline. The only other
//! thread is the mesh worker, and all it ever hands back is an immutable [`MeshBuffer`].
//!
//! [`MeshBuffer`]: shaderbench_core::mesh::MeshBuffer

use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};
use image::DynamicImage;
use shaderbench_core::{
    LinkError, MeshLoadError, ShaderStage,
    events::{CompileEvent, MeshEvent, Notifier},
    mesh::{DEFAULT_MESH_NAME, MeshBuffer, MeshLoader, MeshRequest, MeshSource, PLANE_MESH_NAME},
    texture::{SLOT_COUNT, TextureSlot, placeholder_image},
    transform::TransformState,
};

use crate::abs::{AttributeLocations, Backend, GpuError, Mesh, ShaderProgram, ShaderUnit, Texture};

/// Uniform carrying seconds since realtime mode was enabled.
pub const TIME_UNIFORM: &str = "time";
/// Uniform carrying the viewport size in pixels.
pub const RESOLUTION_UNIFORM: &str = "resolution";
pub const MODEL_UNIFORM: &str = "modelMat";
pub const VIEW_UNIFORM: &str = "viewMat";
pub const PROJECTION_UNIFORM: &str = "projectionMat";

pub struct RenderPipeline<B: Backend> {
    gl: Arc<B>,
    vertex: ShaderUnit<B>,
    fragment: ShaderUnit<B>,
    program: Option<ShaderProgram<B>>,
    attributes: AttributeLocations,
    loader: MeshLoader,
    mesh_name: String,
    mesh: Option<Mesh<B>>,
    plane: Option<Mesh<B>>,
    slots: [Option<Texture<B>>; SLOT_COUNT],
    plane_2d: bool,
    clear_color: Vec4,
    compile_events: Notifier<CompileEvent>,
    mesh_events: Notifier<MeshEvent>,
}

impl<B: Backend> RenderPipeline<B> {
    /// Creates the pipeline with the given sources. Nothing is compiled and no mesh is selected
    /// yet; the screen-aligned plane is loaded right away.
    pub fn new(
        gl: &Arc<B>,
        meshes: Arc<dyn MeshSource>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Self {
        let mut loader = MeshLoader::spawn(meshes);
        let plane = match loader.load_blocking(PLANE_MESH_NAME) {
            Ok(buffer) => match Mesh::new(gl, &buffer) {
                Ok(mesh) => Some(mesh),
                Err(e) => {
                    log::error!("Could not upload the plane: {e}");
                    None
                }
            },
            Err(e) => {
                log::error!("Could not load the plane: {e}");
                None
            }
        };
        gl.enable_depth_test();

        Self {
            gl: Arc::clone(gl),
            vertex: ShaderUnit::new(gl, ShaderStage::Vertex, vertex_source),
            fragment: ShaderUnit::new(gl, ShaderStage::Fragment, fragment_source),
            program: None,
            attributes: AttributeLocations::default(),
            loader,
            mesh_name: String::new(),
            mesh: None,
            plane,
            slots: std::array::from_fn(|_| None),
            plane_2d: false,
            clear_color: Vec4::new(0.1, 0.1, 0.1, 1.0),
            compile_events: Notifier::new(),
            mesh_events: Notifier::new(),
        }
    }

    pub fn compile_events(&mut self) -> &mut Notifier<CompileEvent> {
        &mut self.compile_events
    }

    pub fn mesh_events(&mut self) -> &mut Notifier<MeshEvent> {
        &mut self.mesh_events
    }

    fn unit(&self, stage: ShaderStage) -> &ShaderUnit<B> {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    fn unit_mut(&mut self, stage: ShaderStage) -> &mut ShaderUnit<B> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }

    pub fn set_source(&mut self, stage: ShaderStage, source: impl Into<String>) {
        self.unit_mut(stage).set_source(source);
    }

    /// Compiles both stages, then relinks from whatever compiled last. Returns whether both stages
    /// compiled and the program linked.
    ///
    /// A failing stage does not stop the other from compiling, and does not stop the relink: the
    /// program is rebuilt from the last good object of the failed stage.
    pub fn compile(&mut self) -> bool {
        let mut all_compiled = true;
        for stage in ShaderStage::ALL {
            let event = match self.unit_mut(stage).compile() {
                Ok(()) => CompileEvent::Compiled(stage),
                Err(e) => {
                    all_compiled = false;
                    CompileEvent::CompileFailed(e)
                }
            };
            self.compile_events.emit(event);
        }

        let linked = self.link().is_ok();
        all_compiled && linked
    }

    /// Links a candidate program from the current shader objects and swaps it in on success. On
    /// failure the previous program stays in use.
    pub fn link(&mut self) -> Result<(), LinkError> {
        let result = match (self.vertex.compiled(), self.fragment.compiled()) {
            (Some(vertex), Some(fragment)) => ShaderProgram::link(&self.gl, &[vertex, fragment]),
            _ => Err(LinkError(
                "both stages must compile once before the program can link".to_string(),
            )),
        };

        match result {
            Ok(program) => {
                self.attributes = AttributeLocations::query(&program);
                self.program = Some(program);
                for mesh in [self.mesh.as_mut(), self.plane.as_mut()].into_iter().flatten() {
                    mesh.bind_attributes(&self.attributes);
                }
                log::info!("Program linked");
                self.compile_events.emit(CompileEvent::Linked);
                Ok(())
            }
            Err(e) => {
                log::warn!("{e}");
                self.compile_events.emit(CompileEvent::LinkFailed(e.clone()));
                Err(e)
            }
        }
    }

    /// Selects the mesh drawn outside plane 2D mode. An empty name selects the cube. Meshes loaded
    /// before in this session are swapped in immediately; anything else is handed to the worker and
    /// shows up in a later [`update`](Self::update). A name the worker cannot resolve falls back to
    /// the cube there.
    pub fn select_mesh(&mut self, name: &str) {
        let name = if name.is_empty() {
            DEFAULT_MESH_NAME
        } else {
            name
        };
        self.request_mesh(name);
    }

    /// Returns whether the drawn mesh changed right away.
    fn request_mesh(&mut self, name: &str) -> bool {
        self.mesh_name = name.to_string();

        match self.loader.request(name) {
            Ok(MeshRequest::Ready(buffer)) => {
                self.swap_mesh(buffer);
                self.mesh_events.emit(MeshEvent::Loaded(name.to_string()));
                true
            }
            Ok(MeshRequest::Pending) => {
                self.mesh_events.emit(MeshEvent::Loading(name.to_string()));
                false
            }
            Err(error) => {
                log::error!("Could not request mesh \"{name}\": {error}");
                self.mesh_events.emit(MeshEvent::Failed {
                    name: name.to_string(),
                    error,
                });
                false
            }
        }
    }

    /// Takes in meshes the worker finished. A result for a mesh that is no longer selected is
    /// cached by the loader but not drawn. Returns whether the drawn mesh changed.
    pub fn update(&mut self) -> bool {
        let mut swapped = false;
        for loaded in self.loader.poll() {
            match loaded.result {
                Ok(buffer) if loaded.name == self.mesh_name => {
                    self.swap_mesh(buffer);
                    swapped = true;
                    self.mesh_events.emit(MeshEvent::Loaded(loaded.name));
                }
                Ok(_) => {
                    log::debug!(
                        "Mesh \"{}\" finished after \"{}\" was selected",
                        loaded.name,
                        self.mesh_name
                    );
                }
                Err(error) => {
                    let fall_back = loaded.name == self.mesh_name
                        && loaded.name != DEFAULT_MESH_NAME
                        && matches!(error, MeshLoadError::UnknownMesh(_));
                    self.mesh_events.emit(MeshEvent::Failed {
                        name: loaded.name,
                        error,
                    });
                    if fall_back {
                        log::warn!(
                            "Unknown mesh \"{}\", using \"{DEFAULT_MESH_NAME}\"",
                            self.mesh_name
                        );
                        swapped |= self.request_mesh(DEFAULT_MESH_NAME);
                    }
                }
            }
        }
        swapped
    }

    fn swap_mesh(&mut self, buffer: Arc<MeshBuffer>) {
        match Mesh::new(&self.gl, &buffer) {
            Ok(mut mesh) => {
                if self.program.is_some() {
                    mesh.bind_attributes(&self.attributes);
                }
                log::info!(
                    "Mesh \"{}\" ready ({} triangles)",
                    self.mesh_name,
                    mesh.vertex_count() / 3
                );
                self.mesh = Some(mesh);
            }
            Err(e) => log::error!("Could not upload mesh \"{}\": {e}", self.mesh_name),
        }
    }

    /// Replaces a slot's image. The old texture is destroyed before the new one is created from the
    /// vertically mirrored image.
    pub fn set_texture(&mut self, slot: TextureSlot, image: &DynamicImage) -> Result<(), GpuError> {
        self.slots[slot.index()] = None;
        let texture = Texture::new(&self.gl, &image.flipv())?;
        self.slots[slot.index()] = Some(texture);
        Ok(())
    }

    /// Fills a slot with the black placeholder.
    pub fn clear_texture(&mut self, slot: TextureSlot) -> Result<(), GpuError> {
        self.set_texture(slot, &placeholder_image())
    }

    /// Empties a slot entirely, so nothing is bound to it.
    pub fn remove_texture(&mut self, slot: TextureSlot) {
        self.slots[slot.index()] = None;
    }

    pub fn set_plane_2d(&mut self, plane_2d: bool) {
        self.plane_2d = plane_2d;
    }

    pub fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color.extend(1.0);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gl.viewport(width, height);
    }

    /// Turns multisample rasterization on or off. Only has an effect on a multisampled surface.
    pub fn set_multisample(&mut self, enabled: bool) {
        self.gl.set_multisample(enabled);
    }

    /// Draws one frame.
    ///
    /// Without a linked program only the clear happens. In plane 2D mode the plane is drawn with
    /// identity matrices, otherwise the selected mesh with the matrices of `transform`.
    pub fn render(&self, transform: &TransformState, time: f32) {
        self.gl.clear(self.clear_color);

        let Some(program) = &self.program else {
            return;
        };
        program.use_program();

        let (width, height) = transform.viewport();
        program.set_uniform(TIME_UNIFORM, time);
        program.set_uniform(RESOLUTION_UNIFORM, Vec2::new(width as f32, height as f32));

        let matrices = transform.matrices(self.plane_2d);
        program.set_uniform(MODEL_UNIFORM, matrices.model);
        program.set_uniform(VIEW_UNIFORM, matrices.view);
        program.set_uniform(PROJECTION_UNIFORM, matrices.projection);

        let mut bound = Vec::with_capacity(SLOT_COUNT);
        for slot in TextureSlot::ALL {
            if let Some(texture) = &self.slots[slot.index()] {
                program.set_uniform(slot.name(), slot.unit() as i32);
                texture.bind(slot.unit());
                bound.push(slot.unit());
            }
        }

        let target = if self.plane_2d {
            self.plane.as_ref()
        } else {
            self.mesh.as_ref()
        };
        if let Some(mesh) = target {
            mesh.draw();
        }

        self.gl.use_program(None);
        for unit in bound {
            self.gl.bind_texture(unit, None);
        }
    }
}

/// Inspection used by tests.
#[cfg(test)]
impl<B: Backend> RenderPipeline<B> {
    pub fn status(&self, stage: ShaderStage) -> &shaderbench_core::CompileStatus {
        self.unit(stage).status()
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    /// Vertex count of the mesh drawn outside plane 2D mode.
    pub fn mesh_vertex_count(&self) -> Option<usize> {
        self.mesh.as_ref().map(Mesh::vertex_count)
    }

    pub fn mesh_loader(&self) -> &MeshLoader {
        &self.loader
    }

    pub fn is_loading(&self) -> bool {
        self.loader.has_pending()
    }

    pub fn has_texture(&self, slot: TextureSlot) -> bool {
        self.slots[slot.index()].is_some()
    }
}
