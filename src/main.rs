mod animation;
mod bodies;
mod camera;
mod config;
mod driver;
mod error;
mod galaxy;
mod gpu;
mod types;

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use camera::PointerOffset;
use config::SceneConfig;
use driver::{DriverStatus, GalaxyDriver};
use gpu::GpuState;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new().map_err(|e| anyhow!("failed to create event loop: {e}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Galaxy")
            .with_inner_size(PhysicalSize::new(1600u32, 900u32))
            .build(&event_loop)
            .map_err(|e| anyhow!("failed to create window: {e}"))?,
    );

    let config = SceneConfig::from_env();
    let mut driver = GalaxyDriver::start(config, |scene| {
        pollster::block_on(GpuState::new(window.clone(), scene))
    });

    if driver.is_disabled() {
        // Nothing will ever be drawn; hide the surface instead of showing a blank window
        window.set_visible(false);
        return Ok(());
    }

    let size = window.inner_size();
    driver.resize(size.width, size.height);
    let stop = driver.stop_handle();

    let mut last_frame = Instant::now();
    let mut frame_count: u64 = 0;
    let mut fps_timer = Instant::now();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    stop.stop();
                    elwt.exit();
                }

                WindowEvent::Resized(size) => {
                    driver.resize(size.width, size.height);
                }

                WindowEvent::CursorMoved { position, .. } => {
                    let scale = window.scale_factor();
                    let cursor = position.to_logical::<f32>(scale);
                    let viewport = window.inner_size().to_logical::<f32>(scale);
                    driver.set_pointer(PointerOffset::from_cursor(
                        cursor.x,
                        cursor.y,
                        viewport.width,
                        viewport.height,
                    ));
                }

                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key: Key::Named(NamedKey::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    stop.stop();
                    elwt.exit();
                }

                // ========================================================
                // RENDER FRAME
                // ========================================================
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;

                    if !driver.frame(dt) {
                        return;
                    }

                    // FPS counter
                    frame_count += 1;
                    let fps_elapsed = now.duration_since(fps_timer).as_secs_f32();
                    if fps_elapsed >= 1.0 {
                        let fps = frame_count as f32 / fps_elapsed;
                        frame_count = 0;
                        fps_timer = now;
                        window.set_title(&format!(
                            "Galaxy | {:.0} FPS | t = {:.1}",
                            fps,
                            driver.animation().time
                        ));
                        log::debug!("{:.1} FPS over {} frames", fps, driver.frames());
                    }
                }

                _ => {}
            },

            Event::AboutToWait => {
                if driver.status() == DriverStatus::Running {
                    window.request_redraw();
                }
            }

            _ => {}
        })
        .map_err(|e| anyhow!("event loop error: {e}"))
}
