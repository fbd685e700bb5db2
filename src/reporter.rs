//! # Reporting
//!
//! The engine never logs directly. Every noteworthy condition becomes a
//! [`Report`] handed to an injected [`Reporter`]: [`TracingReporter`] turns
//! them into `tracing` events, [`MemoryReporter`] keeps them for inspection.

use crate::output::{OutputEvent, Subscription};
use crate::scene_image::FallbackReason;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace, warn};

#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    /// A scene became current and its source was requested.
    SceneLoading {
        index: usize,
        scene_id: String,
        source: Option<String>,
    },
    /// Autonomous playback was refused; the scene waits in `Ready`.
    PlayRejected {
        index: usize,
        scene_id: String,
        reason: String,
    },
    Revealed {
        index: usize,
        scene_id: String,
    },
    Advanced {
        from: usize,
        to: usize,
    },
    /// The last scene's narration ended.
    Finished {
        index: usize,
    },
    /// A signal for a detached subscription was dropped.
    StaleSignal {
        subscription: Subscription,
        event: OutputEvent,
    },
    InvalidJump {
        index: usize,
        len: usize,
    },
    ImageFallback {
        scene_id: String,
        reference: Option<String>,
        reason: FallbackReason,
    },
    SequenceReplaced {
        len: usize,
    },
    NoContent,
}

pub trait Reporter {
    fn report(&self, report: Report);
}

/// Emits each report as a `tracing` event at a fitting level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: Report) {
        match report {
            Report::SceneLoading {
                index,
                scene_id,
                source,
            } => info!(index, scene_id = %scene_id, source = ?source, "Loading scene"),
            Report::PlayRejected {
                index,
                scene_id,
                reason,
            } => warn!(index, scene_id = %scene_id, "Audio play failed: {}", reason),
            Report::Revealed { index, scene_id } => {
                debug!(index, scene_id = %scene_id, "Revealing scene image")
            }
            Report::Advanced { from, to } => info!(from, to, "Advancing to next scene"),
            Report::Finished { index } => info!(index, "Narration finished"),
            Report::StaleSignal {
                subscription,
                event,
            } => trace!(%subscription, ?event, "Dropping stale signal"),
            Report::InvalidJump { index, len } => {
                warn!(index, len, "Ignoring jump to out-of-range scene")
            }
            Report::ImageFallback {
                scene_id,
                reference,
                reason,
            } => match reason {
                FallbackReason::LoadFailed => {
                    warn!(scene_id = %scene_id, "Image failed to load: {:?}", reference)
                }
                _ => debug!(
                    scene_id = %scene_id,
                    ?reason,
                    "Using fallback image for {:?}",
                    reference
                ),
            },
            Report::SequenceReplaced { len } => info!(len, "Scene sequence replaced"),
            Report::NoContent => info!("No scenes to play"),
        }
    }
}

/// Collects reports in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything reported so far.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Drains and returns everything reported so far.
    pub fn take(&self) -> Vec<Report> {
        self.reports
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, report: Report) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}
