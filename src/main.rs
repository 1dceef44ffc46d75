use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    event::*,
    event_loop::EventLoop,
    window::Window,
};

// Import from the library crate
use swat_piano::{
    controller, logging, model, ui, utils, view,
    Error, GameConfig, GameSession, Result,
};

use controller::input::native::key_name;
use controller::{InputProcessor, LogSink, Recording, SlotSender, SoundSink};
use model::{Landmark, PoseFrame, Variant};
use view::GpuContext;

const RECORDINGS_DIR: &str = "recordings";

struct App {
    gpu: GpuContext,
    window: Arc<Window>,

    // egui
    egui_renderer: egui_wgpu::Renderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // Game state
    session: GameSession,
    pose_tx: SlotSender<PoseFrame>,
    /// Landmark index the mouse pointer stands in for
    pointer_landmark: usize,
    input: InputProcessor,
    recordings_dir: PathBuf,
}

impl App {
    async fn new(window: Arc<Window>, config: GameConfig) -> Result<Self> {
        let gpu = GpuContext::new(window.clone()).await?;

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.format,
            egui_wgpu::RendererOptions::default(),
        );

        let pointer_landmark = config
            .tracked_points
            .first()
            .map(|p| p.index)
            .ok_or_else(|| Error::config("no tracked points"))?;
        let (session, pose_tx) = GameSession::new(config, sound_sink())?;

        Ok(Self {
            gpu,
            window,
            egui_renderer,
            egui_state,
            egui_ctx,
            session,
            pose_tx,
            pointer_landmark,
            input: InputProcessor::default(),
            recordings_dir: PathBuf::from(RECORDINGS_DIR),
        })
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;
        if egui_captured {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { state: ElementState::Pressed, logical_key, .. },
                ..
            } => {
                let Some(command) = key_name(logical_key).and_then(|k| self.input.command_for_key(&k)) else {
                    return false;
                };
                if let Some(take) = self.session.apply(command, utils::now_ms()) {
                    self.save_recording(&take);
                }
                true
            }
            _ => false,
        }
    }

    fn save_recording(&self, take: &Recording) {
        if let Err(e) = take.save_to_dir(&self.recordings_dir) {
            tracing::error!("Failed to save recording: {}", e);
        }
    }

    fn render(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let now = utils::now_ms();
        self.session.tick(now);

        let output = self.gpu.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut outcome = ui::UiOutcome::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            outcome = ui::build_ui(ctx, &mut self.session, now);
        });
        self.egui_state.handle_platform_output(&self.window, full_output.platform_output);

        // the pointer becomes next tick's pose result
        if let Some(p) = outcome.pointer {
            let landmark = Landmark { x: p.x, y: p.y, visibility: 1.0 };
            self.pose_tx.publish(PoseFrame::with_point(self.pointer_landmark, landmark));
        }
        if let Some(take) = outcome.finished_recording {
            self.save_recording(&take);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        let primitives = self.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        // Upload egui textures
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }
        self.egui_renderer.update_buffers(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &primitives,
            &screen_descriptor,
        );

        {
            let egui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer.render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        // Cleanup egui textures
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// MIDI output when built with `midi` and a port exists, otherwise the log
fn sound_sink() -> Box<dyn SoundSink> {
    #[cfg(feature = "midi")]
    match controller::sound::MidirSink::open() {
        Ok(sink) => return Box::new(sink),
        Err(e) => tracing::warn!("{}; notes will only be logged", e),
    }
    Box::new(LogSink)
}

/// `SWAT_CONFIG` (JSON file) wins over `SWAT_VARIANT`
fn load_config() -> Result<GameConfig> {
    if let Ok(path) = std::env::var("SWAT_CONFIG") {
        return GameConfig::load(std::path::Path::new(&path));
    }
    let variant = match std::env::var("SWAT_VARIANT").as_deref() {
        Ok("characters") => Variant::Characters,
        Ok("instruments") | Err(_) => Variant::Instruments,
        Ok(other) => return Err(Error::config(format!("unknown SWAT_VARIANT '{other}'"))),
    };
    Ok(GameConfig::for_variant(variant))
}

fn run() -> Result<()> {
    let config = load_config()?;

    let event_loop = EventLoop::new().map_err(|e| Error::render(e.to_string()))?;
    let window_attributes = Window::default_attributes()
        .with_title("Swat Piano - Native")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 480));
    #[allow(deprecated)]
    let window = event_loop
        .create_window(window_attributes)
        .map_err(|e| Error::render(e.to_string()))?;
    let window = Arc::new(window);

    let mut app = pollster::block_on(App::new(window.clone(), config))?;

    #[allow(deprecated)]
    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.gpu.resize(physical_size.width, physical_size.height);
                        }
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                let size = app.window.inner_size();
                                app.gpu.resize(size.width, size.height);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                            Err(e) => tracing::warn!("Surface error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        })
        .map_err(|e| Error::render(e.to_string()))
}

fn main() {
    logging::init();
    if let Err(e) = run() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
