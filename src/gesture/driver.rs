//! Runs the detector against the live input stream
//!
//! The driver is the detector's only writer: input events and progress ticks
//! are both marshaled onto the task that owns it. The tick task only exists
//! while a hold is in progress.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::events::GestureEvent;
use crate::input::InputEvent;
use crate::scheduler::RepeatingTask;

use super::detector::HoldGestureDetector;

/// Why the driver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOutcome {
    /// The exit gesture completed
    Completed,
    /// The input hook went away first
    InputClosed,
}

/// Owns the detector and its tick schedule
pub struct GestureDriver {
    detector: HoldGestureDetector,
    tick_interval: Duration,
    events_tx: mpsc::UnboundedSender<GestureEvent>,
}

impl GestureDriver {
    pub fn new(
        hold_duration: Duration,
        tick_interval: Duration,
        events_tx: mpsc::UnboundedSender<GestureEvent>,
    ) -> Self {
        Self {
            detector: HoldGestureDetector::new(hold_duration),
            tick_interval,
            events_tx,
        }
    }

    /// Consume input until the gesture completes or the stream closes
    pub async fn run(mut self, mut input_rx: mpsc::UnboundedReceiver<InputEvent>) -> DriverOutcome {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<Instant>();
        let mut ticker: Option<RepeatingTask> = None;

        info!(tick_ms = self.tick_interval.as_millis() as u64, "gesture detector armed");

        loop {
            tokio::select! {
                maybe_event = input_rx.recv() => {
                    let Some(event) = maybe_event else {
                        info!("input stream closed, gesture detector stopping");
                        return DriverOutcome::InputClosed;
                    };

                    trace!(?event, "input event");
                    if let Some(gesture) = self.detector.handle_event(event, Instant::now()) {
                        self.emit(gesture);
                    }
                    self.sync_ticker(&mut ticker, &tick_tx);
                }

                Some(now) = tick_rx.recv() => {
                    let Some(gesture) = self.detector.tick(now) else {
                        continue;
                    };

                    let completed = matches!(gesture, GestureEvent::Completed { .. });
                    self.emit(gesture);
                    if completed {
                        if let Some(mut task) = ticker.take() {
                            task.cancel();
                        }
                        return DriverOutcome::Completed;
                    }
                }
            }
        }
    }

    /// Arm the tick task on hold start, cancel it on any other phase
    fn sync_ticker(
        &self,
        ticker: &mut Option<RepeatingTask>,
        tick_tx: &mpsc::UnboundedSender<Instant>,
    ) {
        match (self.detector.is_holding(), ticker.is_some()) {
            (true, false) => {
                let tick_tx = tick_tx.clone();
                *ticker = Some(RepeatingTask::spawn(self.tick_interval, move |now| {
                    tick_tx.send(now).is_ok()
                }));
            }
            (false, true) => {
                if let Some(mut task) = ticker.take() {
                    task.cancel();
                }
            }
            _ => {}
        }
    }

    fn emit(&self, gesture: GestureEvent) {
        match gesture {
            GestureEvent::Progress { .. } => trace!(%gesture, "gesture event"),
            _ => debug!(%gesture, "gesture event"),
        }
        let _ = self.events_tx.send(gesture);
    }
}
