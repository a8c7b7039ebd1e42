use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use glam::{Vec2, Vec3};
use sdl2::{
    event::{Event, WindowEvent},
    keyboard::{Keycode, Mod},
    mouse::MouseButton,
};
use shaderbench_core::{
    ShaderStage,
    events::{CompileEvent, MeshEvent, StateEvent},
    interaction::PointerButton,
    mesh::{MeshSource, MeshSources, QUICK_LOAD_MESHES},
    project::PROJECT_EXTENSION,
    texture::TextureSlot,
};

use crate::{abs::App, settings::Settings, workbench::Workbench};

mod abs;
mod logging;
mod render;
mod settings;
mod workbench;

const USAGE: &str = "usage: shaderbench [PROJECT] [--vs FILE] [--fs FILE]";

/// Longest the loop sleeps between event polls.
const IDLE_WAIT: Duration = Duration::from_millis(5);

#[derive(Debug, Default, PartialEq)]
struct Args {
    project: Option<PathBuf>,
    vertex_file: Option<PathBuf>,
    fragment_file: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--vs" | "--fs" => {
                    let file = it
                        .next()
                        .ok_or_else(|| format!("{arg} needs a file"))?;
                    if arg == "--vs" {
                        parsed.vertex_file = Some(PathBuf::from(file));
                    } else {
                        parsed.fragment_file = Some(PathBuf::from(file));
                    }
                }
                flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
                _ if parsed.project.is_some() => return Err(format!("unexpected argument {arg}")),
                _ => parsed.project = Some(PathBuf::from(&arg)),
            }
        }
        Ok(parsed)
    }

    fn editor_files(&self) -> impl Iterator<Item = (ShaderStage, &Path)> {
        [
            (ShaderStage::Vertex, self.vertex_file.as_deref()),
            (ShaderStage::Fragment, self.fragment_file.as_deref()),
        ]
        .into_iter()
        .filter_map(|(stage, path)| path.map(|p| (stage, p)))
    }
}

/// Re-reads the `--vs`/`--fs` files and compiles.
fn reload_editor_files(workbench: &mut Workbench<glow::Context>, args: &Args) {
    let mut sources = Vec::new();
    for (stage, path) in args.editor_files() {
        match std::fs::read_to_string(path) {
            Ok(text) => sources.push((stage, text)),
            Err(e) => log::error!("Could not read {} \"{}\": {e}", stage, path.display()),
        }
    }
    workbench.load_sources(sources);
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Left),
        MouseButton::Middle => Some(PointerButton::Middle),
        MouseButton::Right => Some(PointerButton::Right),
        _ => None,
    }
}

fn save(workbench: &mut Workbench<glow::Context>) {
    let result = if workbench.document().path().is_some() {
        workbench.save()
    } else {
        workbench.save_as(format!("untitled.{PROJECT_EXTENSION}"))
    };
    if let Err(e) = result {
        log::error!("{e}");
    }
}

/// Exports next to the project file, or into the working directory for an unsaved project.
fn export_shaders(workbench: &mut Workbench<glow::Context>) {
    let dir = workbench
        .document()
        .path()
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    if let Err(e) = workbench.export_shaders(&dir) {
        log::error!("{e}");
    }
}

/// A dropped project file is opened; anything else is decoded into the selected texture slot.
fn handle_drop(workbench: &mut Workbench<glow::Context>, path: &Path, slot: TextureSlot) {
    let is_project = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_EXTENSION));
    let result = if is_project {
        workbench.open(path, Instant::now()).map_err(|e| e.to_string())
    } else {
        workbench
            .load_texture_file(slot, path)
            .map_err(|e| e.to_string())
    };
    if let Err(e) = result {
        log::error!("{e}");
    }
}

fn handle_key(
    workbench: &mut Workbench<glow::Context>,
    args: &Args,
    selected_slot: &mut TextureSlot,
    key: Keycode,
    keymod: Mod,
    now: Instant,
) {
    let ctrl = keymod.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD);
    let shift = keymod.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD);

    let slot_key = match key {
        Keycode::F1 => Some(TextureSlot::Slot0),
        Keycode::F2 => Some(TextureSlot::Slot1),
        Keycode::F3 => Some(TextureSlot::Slot2),
        Keycode::F4 => Some(TextureSlot::Slot3),
        _ => None,
    };
    if let Some(slot) = slot_key {
        if shift {
            if let Err(e) = workbench.clear_texture(slot) {
                log::error!("{e}");
            }
        } else {
            *selected_slot = slot;
            log::info!("Dropped images go to {slot}");
        }
        return;
    }

    let quick_load = match key {
        Keycode::Num1 => Some(0),
        Keycode::Num2 => Some(1),
        Keycode::Num3 => Some(2),
        Keycode::Num4 => Some(3),
        Keycode::Num5 => Some(4),
        Keycode::Num6 => Some(5),
        _ => None,
    };
    if let Some(index) = quick_load {
        workbench.select_mesh(QUICK_LOAD_MESHES[index]);
        return;
    }

    match key {
        Keycode::S if ctrl => save(workbench),
        Keycode::N if ctrl => workbench.new_project(now),
        Keycode::E if ctrl => export_shaders(workbench),
        Keycode::R => workbench.toggle_realtime(now),
        Keycode::P => workbench.toggle_plane_2d(),
        Keycode::F5 => reload_editor_files(workbench, args),
        _ => {}
    }
}

fn main() {
    if let Err(e) = logging::init() {
        eprintln!("Could not set up logging: {e}");
    }

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let mut settings = Settings::load();
    let mut app = match App::new(
        "Shaderbench",
        settings.window_width,
        settings.window_height,
        settings.multisampling,
    ) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Could not open a window: {e}");
            std::process::exit(1);
        }
    };

    let meshes: Arc<dyn MeshSource> = Arc::new(MeshSources::with_user_dir(settings.mesh_dir()));
    let mut workbench = Workbench::new(&app.gl, meshes, Instant::now());
    workbench.set_realtime_compilation(settings.realtime_compilation);
    workbench.set_clear_color(Vec3::from(settings.clear_color));
    workbench.set_multisample(settings.multisampling > 0);

    workbench.state_events().subscribe(|event| match event {
        StateEvent::Status(message) => log::info!("{message}"),
        StateEvent::Modified => log::debug!("Project has unsaved changes"),
        StateEvent::Saved => log::debug!("Project is saved"),
    });
    workbench
        .pipeline_mut()
        .compile_events()
        .subscribe(|event| match event {
            CompileEvent::CompileFailed(e) => log::error!("{e}"),
            CompileEvent::LinkFailed(e) => log::error!("{e}"),
            CompileEvent::Compiled(_) | CompileEvent::Linked => {}
        });
    workbench
        .pipeline_mut()
        .mesh_events()
        .subscribe(|event| {
            if let MeshEvent::Failed { name, error } = event {
                log::error!("Mesh \"{name}\": {error}");
            }
        });

    let (width, height) = app.drawable_size();
    workbench.resize(width, height);

    if let Some(path) = args.project.clone().or_else(|| settings.last_project.clone()) {
        if let Err(e) = workbench.open(&path, Instant::now()) {
            log::error!("{e}");
        }
    }
    if args.editor_files().next().is_some() {
        reload_editor_files(&mut workbench, &args);
    }

    let mut selected_slot = TextureSlot::Slot0;
    let mut title = String::new();
    'running: loop {
        let now = Instant::now();
        for event in app.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'running,
                Event::Window {
                    win_event: WindowEvent::Resized(..) | WindowEvent::SizeChanged(..),
                    ..
                } => {
                    // Window sizes are in points; the viewport needs framebuffer pixels.
                    let (width, height) = app.window.drawable_size();
                    workbench.resize(width, height);
                }
                Event::MouseButtonDown {
                    mouse_btn, clicks, x, y, ..
                } => {
                    if mouse_btn == MouseButton::Left && clicks == 2 {
                        workbench.double_click();
                    } else if let Some(button) = pointer_button(mouse_btn) {
                        workbench.pointer_pressed(button, Vec2::new(x as f32, y as f32));
                    }
                }
                Event::MouseButtonUp { .. } => workbench.pointer_released(),
                Event::MouseMotion { x, y, .. } => {
                    workbench.pointer_moved(Vec2::new(x as f32, y as f32));
                }
                Event::KeyDown {
                    keycode: Some(keycode),
                    keymod,
                    repeat: false,
                    ..
                } => handle_key(&mut workbench, &args, &mut selected_slot, keycode, keymod, now),
                Event::DropFile { filename, .. } => {
                    handle_drop(&mut workbench, Path::new(&filename), selected_slot);
                }
                _ => {}
            }
        }

        if workbench.update(now) {
            workbench.render(now);
            app.window.gl_swap_window();
        }

        let current = workbench.title();
        if current != title {
            app.set_title(&current);
            title = current;
        }

        let wait = workbench
            .time_until_tick(Instant::now())
            .map_or(IDLE_WAIT, |until| until.min(IDLE_WAIT));
        thread::sleep(wait);
    }

    let (width, height) = app.window.size();
    settings.window_width = width;
    settings.window_height = height;
    settings.last_project = workbench.document().path().map(Path::to_path_buf);
    settings.save();
}
