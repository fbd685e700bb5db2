//! # Playback Engine
//!
//! Binds one [`AudioOutput`] to a [`SceneSequence`] and walks the scenes.
//!
//! ## Phases (per scene instance)
//! `Idle → Loading → Ready → Playing → Revealed → Ended`
//!
//! - Every index change goes through a single load step that detaches the
//!   outgoing subscription (and pauses the output) before a fresh one is
//!   attached and the new source is loaded.
//! - `CanPlay` marks audio ready and issues play; a rejection is reported and
//!   the scene stays `Ready`.
//! - `TimeUpdate` reveals the image the first time `position / duration`
//!   reaches [`REVEAL_THRESHOLD`].
//! - `Ended` advances by one, or finishes on the last scene.
//!
//! Signals carrying any subscription other than the current one are dropped,
//! so a previous scene can never mutate the state of the current one.

use crate::errors::PlaybackError;
use crate::output::{AudioOutput, OutputEvent, Progress, Signal, Subscription};
use crate::reporter::Report;
use crate::scene_image::{FallbackReason, ImageSlot};
use crate::{AssetLoader, Reporter};
use crossbeam_channel::Receiver;
use narrator_schema::{Scene, SceneSequence};
use serde::Serialize;

/// Fraction of narration after which the scene image is revealed.
pub const REVEAL_THRESHOLD: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ScenePhase {
    Idle,
    Loading,
    Ready,
    Playing,
    Revealed,
    Ended,
}

/// Everything the presentation layer needs to render the current state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    /// `None` when there is no content.
    pub current_index: Option<usize>,
    pub scene_count: usize,
    pub phase: ScenePhase,
    pub revealed: bool,
    pub audio_ready: bool,
    /// Autonomous playback was refused for the current scene.
    pub play_blocked: bool,
    /// The last scene's narration ended; no further auto-advance.
    pub finished: bool,
    pub no_content: bool,
}

pub struct PlaybackEngine<O: AudioOutput> {
    sequence: SceneSequence,
    output: O,
    reporter: Box<dyn Reporter>,
    index: usize,
    phase: ScenePhase,
    revealed: bool,
    audio_ready: bool,
    play_blocked: bool,
    finished: bool,
    subscription: Option<Subscription>,
    next_subscription: u64,
    image: Option<ImageSlot>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    /// Creates an engine and starts loading the first scene, if any.
    pub fn new(sequence: SceneSequence, output: O, reporter: Box<dyn Reporter>) -> Self {
        let mut engine = Self {
            sequence,
            output,
            reporter,
            index: 0,
            phase: ScenePhase::Idle,
            revealed: false,
            audio_ready: false,
            play_blocked: false,
            finished: false,
            subscription: None,
            next_subscription: 0,
            image: None,
        };

        if engine.sequence.is_empty() {
            engine.reporter.report(Report::NoContent);
        } else {
            engine.load_scene(0);
        }
        engine
    }

    // --- Observable state ---

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let no_content = self.sequence.is_empty();
        PlaybackSnapshot {
            current_index: (!no_content).then_some(self.index),
            scene_count: self.sequence.len(),
            phase: self.phase,
            revealed: self.revealed,
            audio_ready: self.audio_ready,
            play_blocked: self.play_blocked,
            finished: self.finished,
            no_content,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.sequence.is_empty()).then_some(self.index)
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.sequence.get(self.index)
    }

    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_audio_ready(&self) -> bool {
        self.audio_ready
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn sequence(&self) -> &SceneSequence {
        &self.sequence
    }

    /// The image slot of the current scene.
    pub fn image(&self) -> Option<&ImageSlot> {
        self.image.as_ref()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            position: self.output.position(),
            duration: self.output.duration(),
        }
    }

    /// Read-only access to the output. Transport controls stay with the engine.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// The subscription currently attached to the output.
    pub fn subscription(&self) -> Option<Subscription> {
        self.subscription
    }

    // --- User operations ---

    /// Reloads the first scene.
    pub fn restart(&mut self) -> Result<(), PlaybackError> {
        self.jump_to(0)
    }

    /// Loads the scene at `index`, even when it is already current.
    ///
    /// Out-of-range indices are rejected and leave the engine untouched.
    pub fn jump_to(&mut self, index: usize) -> Result<(), PlaybackError> {
        let len = self.sequence.len();
        if index >= len {
            self.reporter.report(Report::InvalidJump { index, len });
            return Err(PlaybackError::InvalidSceneIndex { index, len });
        }
        self.load_scene(index);
        Ok(())
    }

    /// Swaps in new scene data and starts over from the first scene.
    ///
    /// Handing back the sequence already in use changes nothing and returns `false`.
    pub fn replace_sequence(&mut self, sequence: SceneSequence) -> bool {
        if sequence.same_as(&self.sequence) {
            return false;
        }

        self.detach_current();
        self.sequence = sequence;
        self.index = 0;
        self.phase = ScenePhase::Idle;
        self.revealed = false;
        self.audio_ready = false;
        self.play_blocked = false;
        self.finished = false;
        self.image = None;
        self.reporter.report(Report::SequenceReplaced {
            len: self.sequence.len(),
        });

        if self.sequence.is_empty() {
            self.output.set_source(None);
            self.reporter.report(Report::NoContent);
        } else {
            self.load_scene(0);
        }
        true
    }

    /// The presentation layer could not display the current image.
    pub fn image_load_failed(&mut self) {
        if let Some(slot) = self.image.as_mut() {
            if slot.fall_back() {
                self.reporter.report(Report::ImageFallback {
                    scene_id: slot.scene_id().to_string(),
                    reference: slot.requested().map(str::to_string),
                    reason: FallbackReason::LoadFailed,
                });
            }
        }
    }

    /// Checks a local current image through `loader`, falling back if it cannot be decoded.
    pub fn verify_image(&mut self, loader: &dyn AssetLoader) {
        let fell_back = self
            .image
            .as_mut()
            .is_some_and(|slot| slot.verify_with(loader));
        if fell_back {
            if let Some(slot) = self.image.as_ref() {
                self.reporter.report(Report::ImageFallback {
                    scene_id: slot.scene_id().to_string(),
                    reference: slot.requested().map(str::to_string),
                    reason: FallbackReason::LoadFailed,
                });
            }
        }
    }

    // --- Signals ---

    /// Applies every queued signal. Returns how many were taken off the queue.
    pub fn pump(&mut self, signals: &Receiver<Signal>) -> usize {
        let mut count = 0;
        while let Ok(signal) = signals.try_recv() {
            self.handle(signal);
            count += 1;
        }
        count
    }

    /// The single entry point for output signals.
    pub fn handle(&mut self, signal: Signal) {
        if self.subscription != Some(signal.subscription) {
            self.reporter.report(Report::StaleSignal {
                subscription: signal.subscription,
                event: signal.event,
            });
            return;
        }

        let narrated = self.current_scene().is_some_and(Scene::has_narration);
        match signal.event {
            OutputEvent::CanPlay => self.on_can_play(narrated),
            // Scenes without narration never reveal or advance on their own.
            OutputEvent::TimeUpdate if narrated => self.on_time_update(),
            OutputEvent::Ended if narrated => self.on_ended(),
            OutputEvent::TimeUpdate | OutputEvent::Ended => {}
        }
    }

    fn on_can_play(&mut self, narrated: bool) {
        if self.phase != ScenePhase::Loading {
            return;
        }
        self.audio_ready = true;
        self.phase = ScenePhase::Ready;
        if !narrated {
            return;
        }

        match self.output.play() {
            Ok(()) => self.phase = ScenePhase::Playing,
            Err(rejected) => {
                self.play_blocked = true;
                let scene_id = self.scene_id();
                self.reporter.report(Report::PlayRejected {
                    index: self.index,
                    scene_id,
                    reason: rejected.reason,
                });
            }
        }
    }

    fn on_time_update(&mut self) {
        match self.phase {
            // Narration started without us (e.g. the user pressed play).
            ScenePhase::Ready if self.output.position() > 0.0 => {
                self.play_blocked = false;
                self.phase = ScenePhase::Playing;
            }
            ScenePhase::Playing | ScenePhase::Revealed => {}
            _ => return,
        }

        if self.revealed {
            return;
        }
        let reached = self
            .progress()
            .ratio()
            .is_some_and(|ratio| ratio >= REVEAL_THRESHOLD);
        if reached {
            self.revealed = true;
            self.phase = ScenePhase::Revealed;
            let scene_id = self.scene_id();
            self.reporter.report(Report::Revealed {
                index: self.index,
                scene_id,
            });
        }
    }

    fn on_ended(&mut self) {
        if !matches!(
            self.phase,
            ScenePhase::Ready | ScenePhase::Playing | ScenePhase::Revealed
        ) {
            return;
        }

        match self.sequence.last_index() {
            Some(last) if self.index < last => {
                let from = self.index;
                self.reporter.report(Report::Advanced { from, to: from + 1 });
                self.load_scene(from + 1);
            }
            _ => {
                self.phase = ScenePhase::Ended;
                self.finished = true;
                self.reporter.report(Report::Finished { index: self.index });
            }
        }
    }

    // --- Transitions ---

    /// Idle → Loading for `index`. Every index change funnels through here.
    fn load_scene(&mut self, index: usize) {
        self.detach_current();

        self.index = index;
        self.phase = ScenePhase::Idle;
        self.revealed = false;
        self.audio_ready = false;
        self.play_blocked = false;
        self.finished = false;

        let Some(scene) = self.sequence.get(index) else {
            self.image = None;
            return;
        };

        let image = ImageSlot::for_scene(scene);
        if let Some(reason @ FallbackReason::Unsupported) = image.fallback_reason() {
            self.reporter.report(Report::ImageFallback {
                scene_id: scene.scene_id.clone(),
                reference: scene.image_url.clone(),
                reason,
            });
        }
        self.image = Some(image);

        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.output.attach(subscription);
        self.subscription = Some(subscription);

        let source = scene.audio_url.as_deref().filter(|url| !url.is_empty());
        self.output.set_source(source);
        self.phase = ScenePhase::Loading;
        self.reporter.report(Report::SceneLoading {
            index,
            scene_id: scene.scene_id.clone(),
            source: source.map(str::to_string),
        });
        self.output.load();
    }

    /// Stops the outgoing scene. Must complete before anything new is attached.
    fn detach_current(&mut self) {
        if let Some(previous) = self.subscription.take() {
            self.output.detach(previous);
            self.output.pause();
        }
    }

    fn scene_id(&self) -> String {
        self.current_scene()
            .map(|s| s.scene_id.clone())
            .unwrap_or_default()
    }
}

impl<O: AudioOutput> Drop for PlaybackEngine<O> {
    fn drop(&mut self) {
        if self.subscription.is_some() {
            self.detach_current();
            self.output.set_source(None);
        }
    }
}
