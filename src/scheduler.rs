use crate::landmarks::LandmarkSource;
use crate::protocol::ServerMessage;
use crate::sampler::{FeatureSampler, SampleOutcome};
use crate::session::Session;
use anyhow::Result;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Everything that may wake the session, serialized into one queue. The
/// session is mutated only by the loop draining this queue, so the frame
/// clock and the network never race on it.
#[derive(Debug)]
pub enum SessionEvent {
    Tick,
    Inbound(ServerMessage),
    Connected,
    Disconnected,
    StartRequested,
    ResetRequested,
    Stop,
}

/// Thread that enqueues `Tick` at the display cadence. Stops when told to,
/// or when the consumer side of the queue goes away.
pub struct FramePacer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FramePacer {
    pub fn start(events: Sender<SessionEvent>, fps: u32) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));

        let handle = std::thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                std::thread::sleep(interval);
                if events.send(SessionEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FramePacer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Single-consumer session loop. Each `Tick` samples the landmark source
/// first, then advances the state machine; inbound notifications dispatch in
/// arrival order between ticks.
pub fn run_session_loop(
    session: &mut Session,
    sampler: &mut FeatureSampler,
    source: &mut dyn LandmarkSource,
    events: &Receiver<SessionEvent>,
) -> Result<()> {
    info!("Session loop started with source: {}", source.name());

    for event in events.iter() {
        match event {
            SessionEvent::Tick => {
                // A failing or faceless extraction never blocks the tick.
                let detection = match source.next() {
                    Ok(d) => d,
                    Err(e) => {
                        warn!("Landmark source error: {:#}", e);
                        None
                    }
                };
                let outcome = sampler.ingest(detection.as_ref());
                if sampler.is_ready() {
                    session.set_extractor_ready();
                }
                let sample = match outcome {
                    SampleOutcome::Updated => sampler.current(),
                    SampleOutcome::NoFace => None,
                };
                session.tick(sample);
            }
            SessionEvent::Inbound(message) => session.handle_server_message(message),
            SessionEvent::Connected => info!("Connected to estimation service"),
            SessionEvent::Disconnected => warn!(
                "Estimation service connection lost; session parked in {:?}",
                session.phase()
            ),
            SessionEvent::StartRequested => {
                if let Err(e) = session.start_calibration() {
                    warn!("Calibration start rejected: {:#}", e);
                }
            }
            SessionEvent::ResetRequested => session.request_reset(),
            SessionEvent::Stop => {
                info!("Stop requested, ending session loop");
                break;
            }
        }
    }

    Ok(())
}
