//= MODS =====================================================================

mod display;
mod framebuffer;
mod renderer;
mod scene;

//= IMPORTS ==================================================================

use crate::display::Display;
use crate::renderer::Renderer;
use crate::scene::{LambertShader, Scene};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

//= CONSTANTS ================================================================

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

//= APP ======================================================================

struct App {
    window: Option<Window>,
    state: Option<State>,
}

struct State {
    display: Display,
    renderer: Renderer,
    scene: Scene,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            state: None,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state
            .renderer
            .on_resize(state.display.gpu(), width, height);
        state.display.resize(width, height);
        if let Some(image) = state.renderer.final_image() {
            state.display.rebind(image);
        }
    }

    /// One full frame: render every pixel, upload once, blit, present.
    fn render_frame(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        state.renderer.render(&state.scene);
        state.renderer.upload(&state.display.gpu().queue);

        if let Err(e) = state.display.draw() {
            log::warn!("skipped frame: {e}");
            return;
        }
        state.display.present();

        profiling::finish_frame!();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Raycast Sphere")
            .with_inner_size(LogicalSize::new(WIDTH, HEIGHT));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => window,
            Err(e) => {
                log::error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let display = match Display::new(&window) {
            Ok(display) => display,
            Err(e) => {
                log::error!("display creation failed: {e}");
                event_loop.exit();
                return;
            }
        };
        let renderer = Renderer::new(Box::new(LambertShader));
        let scene = Scene::new();

        let size = window.inner_size();
        self.state = Some(State {
            display,
            renderer,
            scene,
        });
        self.window = Some(window);
        self.resize(size.width, size.height);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key_code {
                KeyCode::Escape => event_loop.exit(),
                // Manual render trigger, on top of the per-frame redraws.
                KeyCode::Space => {
                    if let Some(window) = self.window.as_ref() {
                        window.request_redraw();
                    }
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                self.render_frame();
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

//= MAIN STUFF! ==============================================================

fn main() -> Result<(), String> {
    env_logger::init();

    let event_loop = EventLoop::new().map_err(|e| e.to_string())?;
    let mut app = App::new();
    event_loop.run_app(&mut app).map_err(|e| e.to_string())?;

    Ok(())
}
