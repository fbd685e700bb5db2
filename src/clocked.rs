//! # Clocked Output
//!
//! A simulated [`AudioOutput`] whose time only moves when told to.
//!
//! Sources are resolved through an [`AssetLoader`] and measured with
//! [`probe_duration`]; nothing is actually sounded. The headless player and
//! the integration tests use it to run the engine deterministically.
//!
//! The output itself belongs to the engine. Time is advanced through the
//! paired [`PlaybackClock`], which shares state with it but exposes no
//! transport controls.

use crate::output::{AudioOutput, OutputEvent, PlayRejected, SignalSender, Subscription};
use crate::probe::probe_duration;
use crate::AssetLoader;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Seconds between progress signals while playing, close to what browsers emit.
pub const DEFAULT_PROGRESS_INTERVAL: f64 = 0.25;

struct ClockState {
    loader: Arc<dyn AssetLoader>,
    signals: SignalSender,
    attached: Vec<Subscription>,
    source: Option<String>,
    duration: Option<f64>,
    position: f64,
    playing: bool,
    ended: bool,
    reject_autoplay: bool,
    progress_interval: f64,
    since_progress: f64,
}

impl ClockState {
    fn emit(&self, event: OutputEvent) {
        for subscription in &self.attached {
            self.signals.emit(*subscription, event);
        }
    }
}

pub struct ClockedOutput {
    state: Rc<RefCell<ClockState>>,
}

/// Advances a [`ClockedOutput`]'s notion of time.
#[derive(Clone)]
pub struct PlaybackClock {
    state: Rc<RefCell<ClockState>>,
}

impl ClockedOutput {
    pub fn new(loader: Arc<dyn AssetLoader>, signals: SignalSender) -> (Self, PlaybackClock) {
        let state = Rc::new(RefCell::new(ClockState {
            loader,
            signals,
            attached: Vec::new(),
            source: None,
            duration: None,
            position: 0.0,
            playing: false,
            ended: false,
            reject_autoplay: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            since_progress: 0.0,
        }));

        (
            Self {
                state: state.clone(),
            },
            PlaybackClock { state },
        )
    }

    /// Makes every `play()` fail, as a browser blocking autoplay would.
    pub fn with_autoplay_rejected(self) -> Self {
        self.state.borrow_mut().reject_autoplay = true;
        self
    }

    pub fn with_progress_interval(self, seconds: f64) -> Self {
        self.state.borrow_mut().progress_interval = seconds.max(0.0);
        self
    }

    pub fn source(&self) -> Option<String> {
        self.state.borrow().source.clone()
    }

    pub fn attached(&self) -> Vec<Subscription> {
        self.state.borrow().attached.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }
}

impl AudioOutput for ClockedOutput {
    fn attach(&mut self, subscription: Subscription) {
        let mut state = self.state.borrow_mut();
        if !state.attached.contains(&subscription) {
            state.attached.push(subscription);
        }
    }

    fn detach(&mut self, subscription: Subscription) {
        self.state
            .borrow_mut()
            .attached
            .retain(|s| *s != subscription);
    }

    fn set_source(&mut self, source: Option<&str>) {
        let mut state = self.state.borrow_mut();
        state.source = source.map(str::to_string);
        state.duration = None;
        state.position = 0.0;
        state.playing = false;
        state.ended = false;
    }

    fn load(&mut self) {
        let mut state = self.state.borrow_mut();
        state.position = 0.0;
        state.since_progress = 0.0;
        state.playing = false;
        state.ended = false;
        state.duration = None;

        let Some(source) = state.source.clone() else {
            return;
        };

        let probed = state
            .loader
            .load_bytes(&source)
            .and_then(|bytes| probe_duration(&bytes));

        match probed {
            Ok(duration) => {
                debug!(source = %source, ?duration, "Clocked source loaded");
                state.duration = duration;
                state.emit(OutputEvent::CanPlay);
            }
            Err(e) => warn!(source = %source, "Failed to load audio: {:#}", e),
        }
    }

    fn play(&mut self) -> Result<(), PlayRejected> {
        let mut state = self.state.borrow_mut();
        if state.reject_autoplay {
            return Err(PlayRejected::new("autoplay is not allowed"));
        }
        if state.source.is_none() {
            return Err(PlayRejected::new("no source"));
        }
        if !state.ended {
            state.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn duration(&self) -> Option<f64> {
        self.state.borrow().duration
    }
}

impl PlaybackClock {
    /// Moves playback forward by `dt` seconds, emitting progress and end signals.
    pub fn advance(&self, dt: f64) {
        let mut state = self.state.borrow_mut();
        if !state.playing || state.ended || dt <= 0.0 {
            return;
        }

        state.position += dt;
        if let Some(duration) = state.duration {
            if state.position >= duration {
                state.position = duration;
                state.playing = false;
                state.ended = true;
                state.emit(OutputEvent::TimeUpdate);
                state.emit(OutputEvent::Ended);
                return;
            }
        }

        state.since_progress += dt;
        if state.since_progress >= state.progress_interval {
            state.since_progress = 0.0;
            state.emit(OutputEvent::TimeUpdate);
        }
    }

    pub fn position(&self) -> f64 {
        self.state.borrow().position
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }
}
