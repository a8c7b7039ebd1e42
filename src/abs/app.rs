//! SDL2 and OpenGL application management.
//!
//! This module defines the [`App`] struct which encapsulates the SDL2
//! and OpenGL context necessary for creating a windowed application.

use std::sync::Arc;

/// The [`App`] struct encapsulates the SDL2 and OpenGL context.
pub struct App {
    pub sdl: sdl2::Sdl,
    pub video_subsystem: sdl2::VideoSubsystem,
    pub window: sdl2::video::Window,
    pub gl_context: sdl2::video::GLContext,
    pub gl: Arc<glow::Context>,
    pub event_pump: sdl2::EventPump,
}

impl App {
    /// Opens a resizable window with a core 3.3 context made current on the calling thread.
    ///
    /// `samples` above zero requests a multisampled framebuffer. If the platform cannot provide
    /// one, the window is opened without it.
    pub fn new(title: &str, width: u32, height: u32, samples: u8) -> Result<Self, String> {
        let sdl = sdl2::init()?;
        let video_subsystem = sdl.video()?;
        let gl_attr = video_subsystem.gl_attr();
        gl_attr.set_context_profile(sdl2::video::GLProfile::Core);
        gl_attr.set_context_version(3, 3);
        gl_attr.set_depth_size(24);
        gl_attr.set_stencil_size(8);
        gl_attr.set_multisample_buffers(u8::from(samples > 0));
        gl_attr.set_multisample_samples(samples);

        let build = || {
            video_subsystem
                .window(title, width, height)
                .opengl()
                .resizable()
                .allow_highdpi()
                .build()
                .map_err(|e| e.to_string())
        };
        let window = match build() {
            Ok(window) => window,
            Err(e) if samples > 0 => {
                log::warn!("No {samples}x multisampled window ({e}), opening without");
                gl_attr.set_multisample_buffers(0);
                gl_attr.set_multisample_samples(0);
                build()?
            }
            Err(e) => return Err(e),
        };
        let gl_context = window.gl_create_context()?;
        window.gl_make_current(&gl_context)?;
        if let Err(e) = video_subsystem.gl_set_swap_interval(sdl2::video::SwapInterval::VSync) {
            log::warn!("Could not enable vsync: {e}");
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|s| {
                video_subsystem.gl_get_proc_address(s) as *const _
            })
        };
        let event_pump = sdl.event_pump()?;
        let gl = Arc::new(gl);

        Ok(Self {
            sdl,
            video_subsystem,
            window,
            gl_context,
            gl,
            event_pump,
        })
    }

    /// Drawable size of the window in pixels.
    pub fn drawable_size(&self) -> (u32, u32) {
        self.window.drawable_size()
    }

    pub fn set_title(&mut self, title: &str) {
        if let Err(e) = self.window.set_title(title) {
            log::warn!("Could not set window title: {e}");
        }
    }
}
