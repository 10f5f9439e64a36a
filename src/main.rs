// Car Viewer: glTF car model viewer with part recoloring

use anyhow::Context;
use clap::Parser;
use log::info;
use winit::event_loop::EventLoopBuilder;

use car_viewer::{Renderer, ViewerConfig, ViewerError, ViewerEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"),
    )
    .init();

    let config = ViewerConfig::parse();
    info!("starting viewer for {}", config.model.display());

    // Create event loop
    let event_loop = EventLoopBuilder::<ViewerEvent>::with_user_event()
        .build()
        .map_err(|e| ViewerError::EventLoop(e.to_string()))?;

    // Create renderer
    let mut renderer = Renderer::new(&event_loop, &config)
        .await
        .context("failed to initialize renderer")?;
    renderer.start(event_loop.create_proxy(), &config);

    // Run the renderer
    renderer.run(event_loop)?;
    Ok(())
}
