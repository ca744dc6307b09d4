use anyhow::Result;
use clap::Parser;
use log::info;
use std::sync::mpsc;

use gazer_client::args::Args;
use gazer_client::config::AppConfig;
use gazer_client::landmarks::SimulatedSource;
use gazer_client::sampler::FeatureSampler;
use gazer_client::scheduler::{run_session_loop, FramePacer, SessionEvent};
use gazer_client::session::Session;
use gazer_client::streaming::SocketClient;
use gazer_client::window::WindowSink;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = AppConfig::load_from(&args.config)?;
    if let Some(server) = args.server {
        config.server.address = server;
    }
    if let Some(width) = args.width {
        config.display.width = width;
    }
    if let Some(height) = args.height {
        config.display.height = height;
    }

    let (events_tx, events_rx) = mpsc::channel();

    // Transport is declared before the session so the session's outbound
    // handle is gone by the time the client joins its thread.
    let client = SocketClient::connect(config.server.address.clone(), events_tx.clone())?;

    let window = WindowSink::new(
        "Gazer",
        config.display.width,
        config.display.height,
        config.display.point_radius,
        events_tx.clone(),
    )?;

    let width = config.display.width as f32;
    let height = config.display.height as f32;
    let mut sampler = FeatureSampler::new(width, height);
    let mut source = SimulatedSource::new();
    let mut session = Session::new(
        config.session.clone(),
        width,
        height,
        Box::new(window),
        Box::new(client.sender()),
    );

    let ctrlc_tx = events_tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(SessionEvent::Stop);
    })?;

    let _pacer = FramePacer::start(events_tx.clone(), config.display.target_fps);

    if args.autostart {
        // One tick ahead of the start request so the sampler is warm.
        events_tx.send(SessionEvent::Tick)?;
        events_tx.send(SessionEvent::StartRequested)?;
    } else {
        info!("Press Space to start calibration, R to reset, Escape to quit");
    }

    run_session_loop(&mut session, &mut sampler, &mut source, &events_rx)?;

    info!("Session ended");
    Ok(())
}
