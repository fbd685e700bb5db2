//! # Audio Output
//!
//! The single playback resource the engine drives, and the signals it emits.
//!
//! ## Responsibilities
//! - **Transport**: source assignment, load, play, pause.
//! - **Subscriptions**: signals are delivered per attached [`Subscription`];
//!   a detached subscription receives nothing further.
//! - **Signal Delivery**: outputs push [`Signal`]s into a [`SignalQueue`] which
//!   the engine drains on its own thread.

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Identifies one scene instance's listeners on the output.
///
/// A fresh token is issued for every scene load, so signals emitted for an
/// earlier load can always be told apart from current ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Subscription(pub u64);

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Lifecycle signals of the audio output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OutputEvent {
    /// Enough is buffered to start playing.
    CanPlay,
    /// Playback position moved.
    TimeUpdate,
    /// Playback reached the end of the source.
    Ended,
}

/// An [`OutputEvent`] addressed to one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signal {
    pub subscription: Subscription,
    pub event: OutputEvent,
}

/// The runtime refused to start playback (e.g. autoplay policy).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Playback rejected: {reason}")]
pub struct PlayRejected {
    pub reason: String,
}

impl PlayRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The audio playback resource.
///
/// Exactly one exists per engine and only the engine calls these methods.
/// Implementations must stop emitting for a subscription as soon as
/// [`detach`](AudioOutput::detach) returns.
pub trait AudioOutput {
    fn attach(&mut self, subscription: Subscription);
    fn detach(&mut self, subscription: Subscription);

    /// Replaces the current source. `None` clears it.
    fn set_source(&mut self, source: Option<&str>);

    /// Starts loading the current source; readiness arrives later as `CanPlay`.
    fn load(&mut self);

    fn play(&mut self) -> Result<(), PlayRejected>;
    fn pause(&mut self);

    /// Current position in seconds.
    fn position(&self) -> f64;

    /// Total duration in seconds, when known.
    fn duration(&self) -> Option<f64>;
}

/// Read-only view of narration progress.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Progress {
    pub position: f64,
    pub duration: Option<f64>,
}

impl Progress {
    /// `position / duration`, or `None` while the duration is unknown, zero or not finite.
    pub fn ratio(&self) -> Option<f64> {
        match self.duration {
            Some(d) if d.is_finite() && d > 0.0 => Some(self.position / d),
            _ => None,
        }
    }
}

/// Unbounded channel carrying output signals to the engine.
pub struct SignalQueue {
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

impl SignalQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> SignalSender {
        SignalSender { tx: self.tx.clone() }
    }

    pub fn receiver(&self) -> &Receiver<Signal> {
        &self.rx
    }
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half handed to an [`AudioOutput`] implementation.
#[derive(Clone)]
pub struct SignalSender {
    tx: Sender<Signal>,
}

impl SignalSender {
    /// Queues `event` for `subscription`. Sending after the engine side is gone is a no-op.
    pub fn emit(&self, subscription: Subscription, event: OutputEvent) {
        let _ = self.tx.send(Signal {
            subscription,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio_requires_known_duration() {
        let p = |position, duration| Progress { position, duration };

        assert_eq!(p(2.0, Some(4.0)).ratio(), Some(0.5));
        assert_eq!(p(2.0, None).ratio(), None);
        assert_eq!(p(2.0, Some(0.0)).ratio(), None);
        assert_eq!(p(2.0, Some(f64::INFINITY)).ratio(), None);
        assert_eq!(p(2.0, Some(f64::NAN)).ratio(), None);
    }

    #[test]
    fn test_queue_preserves_order() {
        let queue = SignalQueue::new();
        let sender = queue.sender();
        sender.emit(Subscription(1), OutputEvent::CanPlay);
        sender.emit(Subscription(1), OutputEvent::Ended);

        let drained: Vec<_> = queue.receiver().try_iter().map(|s| s.event).collect();
        assert_eq!(drained, vec![OutputEvent::CanPlay, OutputEvent::Ended]);
    }
}
