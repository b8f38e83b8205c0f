//! Joystick provider: the dispatch loop on its own thread
//!
//! The event source talks to the provider through an [`EventSender`];
//! consumers read through a [`JoystickHandle`]. The platform is created inside
//! the dispatch thread, so platform types that must stay on one thread work
//! unchanged.

use anyhow::{Context, Result};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::dispatch::{Dispatcher, SourceEvent};
use super::handle::JoystickHandle;
use super::platform::Platform;
use super::slot::DeviceToken;
use crate::config::JoystickConfig;

/// Pause between loop iterations when idle
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Clonable entry point for the event source
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl EventSender {
    /// Queue an event; `false` once the dispatch loop has stopped
    pub fn send(&self, event: SourceEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn device_arrived(&self, token: DeviceToken, path: impl Into<String>) -> bool {
        self.send(SourceEvent::DeviceArrived {
            token,
            path: path.into(),
        })
    }

    pub fn device_departed(&self, token: DeviceToken) -> bool {
        self.send(SourceEvent::DeviceDeparted { token })
    }

    pub fn raw_report(&self, token: DeviceToken, bytes: impl Into<Vec<u8>>) -> bool {
        self.send(SourceEvent::RawReport {
            token,
            bytes: bytes.into(),
        })
    }

    pub fn tick(&self) -> bool {
        self.send(SourceEvent::Tick)
    }

    /// Wait until every event sent before this call has been processed
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.send(SourceEvent::Flush(done_tx)) {
            return false;
        }
        done_rx.await.is_ok()
    }
}

/// Running dispatch loop
pub struct JoystickProvider {
    handle: JoystickHandle,
    events: EventSender,
    shutdown_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl JoystickProvider {
    /// Start the dispatch thread
    ///
    /// # Arguments
    /// * `config` - Slot count, tick cadence and arbitration policies
    /// * `platform_factory` - Builds the platform on the dispatch thread
    pub fn start<P, F>(config: JoystickConfig, platform_factory: F) -> Result<Self>
    where
        P: Platform + 'static,
        F: FnOnce() -> Result<P> + Send + 'static,
    {
        config.validate()?;

        let handle = JoystickHandle::new(config.slot_count);
        let (event_tx, event_rx) = mpsc::unbounded_channel::<SourceEvent>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        // Platform construction result, reported back before start() returns
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<()>>(1);

        let loop_handle = handle.clone();
        let thread = std::thread::Builder::new()
            .name("joystick-dispatch".to_string())
            .spawn(move || {
                let platform = match platform_factory() {
                    Ok(platform) => platform,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let dispatcher = Dispatcher::with_handle(&config, platform, loop_handle);
                let tick_interval = config
                    .internal_ticks
                    .then(|| Duration::from_millis(config.tick_interval_ms));
                Self::event_loop_blocking(dispatcher, event_rx, shutdown_rx, tick_interval);
            })
            .context("Failed to spawn joystick dispatch thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e.context("Failed to initialize joystick platform"));
            }
            Err(_) => {
                let _ = thread.join();
                anyhow::bail!("Joystick dispatch thread exited before it was ready");
            }
        }

        info!("Joystick provider started");

        Ok(Self {
            handle,
            events: EventSender { tx: event_tx },
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Consumer handle onto the published slots
    pub fn handle(&self) -> JoystickHandle {
        self.handle.clone()
    }

    /// Sender for the event source
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Main loop (runs in the dispatch thread)
    fn event_loop_blocking<P: Platform>(
        mut dispatcher: Dispatcher<P>,
        mut event_rx: mpsc::UnboundedReceiver<SourceEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
        tick_interval: Option<Duration>,
    ) {
        let mut last_tick = Instant::now();

        loop {
            // Check for shutdown signal (non-blocking)
            match shutdown_rx.try_recv() {
                Ok(_) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    debug!("Joystick dispatch loop shutting down");
                    break;
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            // Drain everything queued so far
            while let Ok(event) = event_rx.try_recv() {
                dispatcher.handle_event(event);
            }

            if let Some(interval) = tick_interval {
                if last_tick.elapsed() >= interval {
                    dispatcher.handle_event(SourceEvent::Tick);
                    last_tick = Instant::now();
                }
            }

            std::thread::sleep(IDLE_SLEEP);
        }
    }

    /// Stop the dispatch loop and wait for the thread to exit
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
            debug!("Joystick provider shutdown requested");
        }
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| anyhow::anyhow!("Joystick dispatch thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for JoystickProvider {
    fn drop(&mut self) {
        // Attempt to send shutdown signal if not already sent
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}
