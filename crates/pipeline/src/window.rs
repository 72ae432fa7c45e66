use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::WindowBuilder;

use crate::demo::Demo;
use crate::error::PipelineError;
use crate::gpu::DeviceNotify;
use crate::types::DemoConfig;

/// Open a window sized from `config` and drive a [`Demo`] until the window
/// closes or a fatal pipeline error lands.
pub fn run_windowed(config: DemoConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window_size = PhysicalSize::new(config.size.0.max(1), config.size.1.max(1));
    let window = WindowBuilder::new()
        .with_title("chromatorus")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut demo = Demo::new(config);
    let inner = window.inner_size();
    demo.initialize(window.clone(), inner.width, inner.height)
        .context("failed to initialise the demo")?;
    window.request_redraw();

    let loop_window = window.clone();
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { window_id, event } if window_id == loop_window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            elwt.exit();
                        }
                        WindowEvent::Resized(new_size) => {
                            if let Err(err) =
                                demo.window_size_changed(new_size.width, new_size.height)
                            {
                                tracing::error!(error = %err, "resize failed");
                                elwt.exit();
                            }
                        }
                        WindowEvent::ScaleFactorChanged {
                            mut inner_size_writer,
                            ..
                        } => {
                            let (width, height) = demo.size();
                            let _ = inner_size_writer
                                .request_inner_size(PhysicalSize::new(width, height));
                        }
                        WindowEvent::RedrawRequested => match demo.tick(Instant::now()) {
                            Ok(_) => {}
                            Err(PipelineError::Device(surface_err)) => {
                                handle_surface_error(&mut demo, surface_err, elwt);
                            }
                            Err(err) => {
                                tracing::error!(error = %err, "frame pipeline failed");
                                elwt.exit();
                            }
                        },
                        _ => {}
                    }
                }
                Event::Resumed => demo.resuming(Instant::now()),
                Event::AboutToWait => loop_window.request_redraw(),
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Map a swapchain failure onto its recovery: a lost surface walks the full
/// device loss/restore protocol, an outdated one is reconfigured, memory
/// exhaustion is fatal, anything else just skips the frame.
fn handle_surface_error(demo: &mut Demo, err: wgpu::SurfaceError, elwt: &EventLoopWindowTarget<()>) {
    match err {
        wgpu::SurfaceError::Lost => {
            tracing::warn!("surface lost; rebuilding the device");
            if let Err(err) = demo.device_lost().and_then(|()| demo.device_restored()) {
                tracing::error!(error = %err, "device restore failed");
                elwt.exit();
            }
        }
        wgpu::SurfaceError::Outdated => {
            demo.reconfigure();
        }
        wgpu::SurfaceError::OutOfMemory => {
            eprintln!("surface out of memory; exiting");
            elwt.exit();
        }
        wgpu::SurfaceError::Timeout => {
            tracing::debug!("surface timeout; skipping frame");
        }
        other => {
            tracing::warn!(?other, "surface error; retrying next frame");
        }
    }
}
