//! Shared fixtures for engine tests: a scripted output that records every
//! transport call and lets tests set position and duration directly.

#![allow(dead_code)]

use narrator::{
    AudioOutput, MemoryReporter, PlayRejected, PlaybackEngine, Scene, SceneSequence, Subscription,
};
use std::cell::Cell;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Attach(Subscription),
    Detach(Subscription),
    SetSource(Option<String>),
    Load,
    Play,
    Pause,
}

#[derive(Default)]
pub struct ScriptedOutput {
    pub calls: Vec<Call>,
    pub attached: Vec<Subscription>,
    pub source: Option<String>,
    pub reject_play: bool,
    /// Largest number of simultaneously attached subscriptions ever seen.
    pub max_attached: usize,
    pub position: Cell<f64>,
    pub duration: Cell<Option<f64>>,
}

impl ScriptedOutput {
    pub fn rejecting() -> Self {
        Self {
            reject_play: true,
            ..Default::default()
        }
    }

    /// Number of `Load` calls so far.
    pub fn loads(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Load).count()
    }
}

impl AudioOutput for ScriptedOutput {
    fn attach(&mut self, subscription: Subscription) {
        self.calls.push(Call::Attach(subscription));
        self.attached.push(subscription);
        self.max_attached = self.max_attached.max(self.attached.len());
    }

    fn detach(&mut self, subscription: Subscription) {
        self.calls.push(Call::Detach(subscription));
        self.attached.retain(|s| *s != subscription);
    }

    fn set_source(&mut self, source: Option<&str>) {
        self.calls.push(Call::SetSource(source.map(str::to_string)));
        self.source = source.map(str::to_string);
        self.position.set(0.0);
        self.duration.set(None);
    }

    fn load(&mut self) {
        self.calls.push(Call::Load);
    }

    fn play(&mut self) -> Result<(), PlayRejected> {
        self.calls.push(Call::Play);
        if self.reject_play {
            Err(PlayRejected::new("NotAllowedError: play() failed"))
        } else {
            Ok(())
        }
    }

    fn pause(&mut self) {
        self.calls.push(Call::Pause);
    }

    fn position(&self) -> f64 {
        self.position.get()
    }

    fn duration(&self) -> Option<f64> {
        self.duration.get()
    }
}

pub fn narrated(id: &str) -> Scene {
    Scene::new(id, format!("Script for {id}"))
        .with_image(format!("https://img.test/{id}.png"))
        .with_audio(format!("blob:http://app.test/{id}"))
}

pub fn sequence(ids: &[&str]) -> SceneSequence {
    SceneSequence::new(ids.iter().map(|id| narrated(id)).collect())
}

pub fn engine(
    sequence: SceneSequence,
    output: ScriptedOutput,
) -> (PlaybackEngine<ScriptedOutput>, MemoryReporter) {
    let reporter = MemoryReporter::new();
    let engine = PlaybackEngine::new(sequence, output, Box::new(reporter.clone()));
    (engine, reporter)
}
