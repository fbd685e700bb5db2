//! Playback Engine Tests
//!
//! Drives `PlaybackEngine` with a scripted output and hand-fed signals.

mod support;

use narrator::{
    OutputEvent, PlaybackEngine, PlaybackError, Report, Scene, ScenePhase, SceneSequence, Signal,
    FALLBACK_IMAGE,
};
use support::{engine, narrated, sequence, Call, ScriptedOutput};

fn emit(engine: &mut PlaybackEngine<ScriptedOutput>, event: OutputEvent) {
    let subscription = engine.subscription().expect("no active subscription");
    engine.handle(Signal {
        subscription,
        event,
    });
}

/// Sets the output clock and delivers a progress signal.
fn progress(engine: &mut PlaybackEngine<ScriptedOutput>, position: f64, duration: Option<f64>) {
    engine.output().position.set(position);
    engine.output().duration.set(duration);
    emit(engine, OutputEvent::TimeUpdate);
}

#[test]
fn construction_loads_first_scene() {
    let (engine, reporter) = engine(sequence(&["s1", "s2"]), ScriptedOutput::default());

    let snap = engine.snapshot();
    assert_eq!(snap.current_index, Some(0));
    assert_eq!(snap.scene_count, 2);
    assert_eq!(snap.phase, ScenePhase::Loading);
    assert!(!snap.revealed);
    assert!(!snap.audio_ready);
    assert!(!snap.no_content);

    let out = engine.output();
    assert_eq!(out.source.as_deref(), Some("blob:http://app.test/s1"));
    assert_eq!(out.attached.len(), 1);
    assert_eq!(
        out.calls,
        vec![
            Call::Attach(engine.subscription().unwrap()),
            Call::SetSource(Some("blob:http://app.test/s1".to_string())),
            Call::Load,
        ]
    );
    assert!(matches!(
        reporter.reports()[0],
        Report::SceneLoading { index: 0, .. }
    ));
}

/// One scene: reveal at >= 40%, then terminal with the index unchanged.
#[test]
fn single_scene_reveals_then_finishes() {
    let (mut engine, reporter) = engine(sequence(&["only"]), ScriptedOutput::default());

    emit(&mut engine, OutputEvent::CanPlay);
    assert!(engine.is_audio_ready());
    assert_eq!(engine.phase(), ScenePhase::Playing);
    assert!(engine.output().calls.contains(&Call::Play));

    progress(&mut engine, 1.0, Some(10.0));
    assert!(!engine.is_revealed());

    progress(&mut engine, 3.9, Some(10.0));
    assert!(!engine.is_revealed());

    progress(&mut engine, 5.0, Some(10.0));
    assert!(engine.is_revealed());
    assert_eq!(engine.phase(), ScenePhase::Revealed);

    emit(&mut engine, OutputEvent::Ended);
    let snap = engine.snapshot();
    assert!(snap.finished);
    assert_eq!(snap.current_index, Some(0));
    assert_eq!(snap.phase, ScenePhase::Ended);
    assert!(snap.revealed);

    let reports = reporter.reports();
    assert!(reports.contains(&Report::Finished { index: 0 }));
    assert_eq!(
        reports
            .iter()
            .filter(|r| matches!(r, Report::Revealed { .. }))
            .count(),
        1
    );
}

#[test]
fn reveal_fires_exactly_at_threshold() {
    let (mut engine, _) = engine(sequence(&["a"]), ScriptedOutput::default());
    emit(&mut engine, OutputEvent::CanPlay);

    progress(&mut engine, 4.0, Some(10.0));
    assert!(engine.is_revealed());
}

/// Two scenes: the first finishing moves to the second with a clean slate.
#[test]
fn auto_advances_to_next_scene() {
    let (mut engine, reporter) = engine(sequence(&["s1", "s2"]), ScriptedOutput::default());
    let first = engine.subscription().unwrap();

    emit(&mut engine, OutputEvent::CanPlay);
    progress(&mut engine, 6.0, Some(10.0));
    assert!(engine.is_revealed());

    emit(&mut engine, OutputEvent::Ended);

    let snap = engine.snapshot();
    assert_eq!(snap.current_index, Some(1));
    assert!(!snap.revealed);
    assert!(!snap.audio_ready);
    assert!(!snap.finished);
    assert_eq!(snap.phase, ScenePhase::Loading);

    let out = engine.output();
    assert_eq!(out.source.as_deref(), Some("blob:http://app.test/s2"));
    assert!(!out.attached.contains(&first));
    assert_eq!(out.attached, vec![engine.subscription().unwrap()]);

    // Detach and pause precede the new attach.
    let detach = out.calls.iter().position(|c| *c == Call::Detach(first)).unwrap();
    let attach = out
        .calls
        .iter()
        .position(|c| *c == Call::Attach(engine.subscription().unwrap()))
        .unwrap();
    assert!(detach < attach);
    assert_eq!(out.calls[detach + 1], Call::Pause);

    assert!(reporter.reports().contains(&Report::Advanced { from: 0, to: 1 }));
}

/// A scene without audio never reveals or advances on its own.
#[test]
fn scene_without_audio_never_advances() {
    let scenes = SceneSequence::new(vec![
        Scene::new("silent", "No narration here").with_image("https://img.test/a.png"),
        narrated("next"),
    ]);
    let (mut engine, _) = engine(scenes, ScriptedOutput::default());

    assert_eq!(engine.output().source, None);
    assert_eq!(engine.phase(), ScenePhase::Loading);

    emit(&mut engine, OutputEvent::CanPlay);
    assert_eq!(engine.phase(), ScenePhase::Ready);
    assert!(!engine.output().calls.contains(&Call::Play));

    progress(&mut engine, 9.0, Some(10.0));
    emit(&mut engine, OutputEvent::Ended);

    assert_eq!(engine.current_index(), Some(0));
    assert!(!engine.is_revealed());
    assert!(!engine.is_finished());
    assert_eq!(engine.phase(), ScenePhase::Ready);
}

#[test]
fn empty_audio_url_counts_as_missing() {
    let scenes = SceneSequence::new(vec![Scene::new("a", "text").with_audio(""), narrated("b")]);
    let (mut engine, _) = engine(scenes, ScriptedOutput::default());

    assert_eq!(engine.output().source, None);
    emit(&mut engine, OutputEvent::CanPlay);
    emit(&mut engine, OutputEvent::Ended);
    assert_eq!(engine.current_index(), Some(0));
}

#[test]
fn last_scene_end_never_wraps() {
    let (mut engine, _) = engine(sequence(&["a", "b"]), ScriptedOutput::default());

    emit(&mut engine, OutputEvent::CanPlay);
    emit(&mut engine, OutputEvent::Ended);
    assert_eq!(engine.current_index(), Some(1));

    emit(&mut engine, OutputEvent::CanPlay);
    emit(&mut engine, OutputEvent::Ended);
    emit(&mut engine, OutputEvent::Ended);

    assert_eq!(engine.current_index(), Some(1));
    assert!(engine.is_finished());
}

#[test]
fn unknown_duration_defers_reveal() {
    let (mut engine, _) = engine(sequence(&["a"]), ScriptedOutput::default());
    emit(&mut engine, OutputEvent::CanPlay);

    progress(&mut engine, 30.0, None);
    assert!(!engine.is_revealed());
    progress(&mut engine, 30.0, Some(0.0));
    assert!(!engine.is_revealed());
    progress(&mut engine, 30.0, Some(f64::INFINITY));
    assert!(!engine.is_revealed());

    // Duration becomes known later.
    progress(&mut engine, 30.0, Some(60.0));
    assert!(engine.is_revealed());
}

#[test]
fn reveal_is_monotonic_within_a_scene() {
    let (mut engine, _) = engine(sequence(&["a", "b"]), ScriptedOutput::default());
    emit(&mut engine, OutputEvent::CanPlay);

    progress(&mut engine, 5.0, Some(10.0));
    assert!(engine.is_revealed());

    // Seeking back does not hide the image again.
    progress(&mut engine, 0.5, Some(10.0));
    assert!(engine.is_revealed());
    assert_eq!(engine.phase(), ScenePhase::Revealed);

    engine.jump_to(0).unwrap();
    assert!(!engine.is_revealed());
}

#[test]
fn play_rejection_leaves_scene_ready() {
    let (mut engine, reporter) = engine(sequence(&["a", "b"]), ScriptedOutput::rejecting());

    emit(&mut engine, OutputEvent::CanPlay);

    let snap = engine.snapshot();
    assert_eq!(snap.phase, ScenePhase::Ready);
    assert!(snap.audio_ready);
    assert!(snap.play_blocked);
    assert!(reporter
        .reports()
        .iter()
        .any(|r| matches!(r, Report::PlayRejected { index: 0, .. })));

    // No retry, and idle progress signals change nothing.
    progress(&mut engine, 0.0, Some(10.0));
    assert_eq!(engine.phase(), ScenePhase::Ready);
    assert_eq!(
        engine.output().calls.iter().filter(|c| **c == Call::Play).count(),
        1
    );
}

#[test]
fn narration_started_externally_resumes_the_flow() {
    let (mut engine, _) = engine(sequence(&["a", "b"]), ScriptedOutput::rejecting());
    emit(&mut engine, OutputEvent::CanPlay);

    progress(&mut engine, 1.0, Some(10.0));
    assert_eq!(engine.phase(), ScenePhase::Playing);
    assert!(!engine.snapshot().play_blocked);

    progress(&mut engine, 4.5, Some(10.0));
    assert!(engine.is_revealed());

    emit(&mut engine, OutputEvent::Ended);
    assert_eq!(engine.current_index(), Some(1));
}

#[test]
fn jump_reloads_target_scene() {
    let (mut engine, _) = engine(sequence(&["a", "b", "c"]), ScriptedOutput::default());
    emit(&mut engine, OutputEvent::CanPlay);
    progress(&mut engine, 8.0, Some(10.0));

    engine.jump_to(2).unwrap();

    let snap = engine.snapshot();
    assert_eq!(snap.current_index, Some(2));
    assert!(!snap.revealed);
    assert!(!snap.audio_ready);
    assert_eq!(snap.phase, ScenePhase::Loading);
    assert_eq!(engine.output().source.as_deref(), Some("blob:http://app.test/c"));
    assert_eq!(engine.output().attached.len(), 1);
}

/// Jumping to the current scene replays it rather than doing nothing.
#[test]
fn jump_to_current_index_is_a_full_reload() {
    let (mut engine, _) = engine(sequence(&["a", "b"]), ScriptedOutput::default());
    let before = engine.subscription().unwrap();
    emit(&mut engine, OutputEvent::CanPlay);
    progress(&mut engine, 5.0, Some(10.0));

    engine.jump_to(0).unwrap();

    assert_ne!(engine.subscription().unwrap(), before);
    assert_eq!(engine.output().loads(), 2);
    assert!(!engine.is_revealed());
    assert_eq!(engine.phase(), ScenePhase::Loading);
}

#[test]
fn restart_after_finish_starts_over() {
    let (mut engine, _) = engine(sequence(&["a", "b"]), ScriptedOutput::default());
    engine.jump_to(1).unwrap();
    emit(&mut engine, OutputEvent::CanPlay);
    emit(&mut engine, OutputEvent::Ended);
    assert!(engine.is_finished());

    engine.restart().unwrap();

    let snap = engine.snapshot();
    assert_eq!(snap.current_index, Some(0));
    assert!(!snap.finished);
    assert_eq!(engine.output().source.as_deref(), Some("blob:http://app.test/a"));
}

#[test]
fn out_of_range_jump_changes_nothing() {
    let (mut engine, reporter) = engine(sequence(&["a", "b"]), ScriptedOutput::default());
    emit(&mut engine, OutputEvent::CanPlay);
    progress(&mut engine, 5.0, Some(10.0));

    let before = engine.snapshot();
    let calls_before = engine.output().calls.len();
    let subscription = engine.subscription();

    let err = engine.jump_to(2).unwrap_err();
    assert_eq!(err, PlaybackError::InvalidSceneIndex { index: 2, len: 2 });
    assert!(engine.jump_to(usize::MAX).is_err());

    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.output().calls.len(), calls_before);
    assert_eq!(engine.subscription(), subscription);
    assert!(reporter
        .reports()
        .contains(&Report::InvalidJump { index: 2, len: 2 }));
}

#[test]
fn stale_signals_are_dropped() {
    let (mut engine, reporter) = engine(sequence(&["a", "b", "c"]), ScriptedOutput::default());
    let old = engine.subscription().unwrap();

    engine.jump_to(1).unwrap();
    emit(&mut engine, OutputEvent::CanPlay);

    // The previous scene's late "ended" must not advance scene 1.
    engine.handle(Signal {
        subscription: old,
        event: OutputEvent::Ended,
    });
    engine.output().position.set(9.0);
    engine.output().duration.set(Some(10.0));
    engine.handle(Signal {
        subscription: old,
        event: OutputEvent::TimeUpdate,
    });

    assert_eq!(engine.current_index(), Some(1));
    assert!(!engine.is_revealed());
    assert_eq!(engine.phase(), ScenePhase::Playing);
    assert!(reporter.reports().iter().any(|r| matches!(
        r,
        Report::StaleSignal { subscription, event: OutputEvent::Ended } if *subscription == old
    )));
}

#[test]
fn empty_sequence_reports_no_content() {
    let (mut engine, reporter) = engine(SceneSequence::empty(), ScriptedOutput::default());

    let snap = engine.snapshot();
    assert!(snap.no_content);
    assert_eq!(snap.current_index, None);
    assert!(engine.output().calls.is_empty());
    assert_eq!(reporter.reports(), vec![Report::NoContent]);

    assert_eq!(
        engine.restart(),
        Err(PlaybackError::InvalidSceneIndex { index: 0, len: 0 })
    );
    assert!(engine.output().calls.is_empty());
}

#[test]
fn replacing_sequence_resets_state() {
    let (mut engine, reporter) = engine(sequence(&["a", "b", "c"]), ScriptedOutput::default());
    engine.jump_to(2).unwrap();
    emit(&mut engine, OutputEvent::CanPlay);
    progress(&mut engine, 5.0, Some(10.0));
    let old = engine.subscription().unwrap();

    assert!(engine.replace_sequence(sequence(&["x", "y"])));

    let snap = engine.snapshot();
    assert_eq!(snap.current_index, Some(0));
    assert_eq!(snap.scene_count, 2);
    assert!(!snap.revealed);
    assert!(!snap.audio_ready);
    assert_eq!(engine.output().source.as_deref(), Some("blob:http://app.test/x"));
    assert!(!engine.output().attached.contains(&old));
    assert!(reporter.reports().contains(&Report::SequenceReplaced { len: 2 }));
}

#[test]
fn replacing_with_same_sequence_is_a_no_op() {
    let scenes = sequence(&["a", "b"]);
    let (mut engine, _) = engine(scenes.clone(), ScriptedOutput::default());
    engine.jump_to(1).unwrap();
    let loads = engine.output().loads();

    assert!(!engine.replace_sequence(scenes));
    assert_eq!(engine.current_index(), Some(1));
    assert_eq!(engine.output().loads(), loads);
}

#[test]
fn replacing_with_empty_sequence_clears_output() {
    let (mut engine, _) = engine(sequence(&["a"]), ScriptedOutput::default());

    engine.replace_sequence(SceneSequence::empty());

    assert!(engine.snapshot().no_content);
    assert!(engine.output().attached.is_empty());
    assert_eq!(engine.output().source, None);
    assert_eq!(engine.subscription(), None);
}

#[test]
fn image_policy_and_runtime_fallback() {
    let scenes = SceneSequence::new(vec![
        Scene::new("a", "one")
            .with_image("ftp://x")
            .with_audio("blob:a"),
        Scene::new("b", "two")
            .with_image("https://x/y.png")
            .with_audio("blob:b"),
    ]);
    let (mut engine, reporter) = engine(scenes, ScriptedOutput::default());

    assert_eq!(engine.image().unwrap().src(), FALLBACK_IMAGE);

    engine.jump_to(1).unwrap();
    assert_eq!(engine.image().unwrap().src(), "https://x/y.png");

    emit(&mut engine, OutputEvent::CanPlay);
    progress(&mut engine, 5.0, Some(10.0));
    engine.image_load_failed();

    assert_eq!(engine.image().unwrap().src(), FALLBACK_IMAGE);
    // Playback is untouched by the image failure.
    assert_eq!(engine.phase(), ScenePhase::Revealed);
    assert!(engine.is_revealed());

    let fallbacks = reporter
        .reports()
        .into_iter()
        .filter(|r| matches!(r, Report::ImageFallback { .. }))
        .count();
    assert_eq!(fallbacks, 2);

    // A second failure (the fallback itself) is not reported again.
    engine.image_load_failed();
    assert_eq!(
        reporter
            .reports()
            .into_iter()
            .filter(|r| matches!(r, Report::ImageFallback { .. }))
            .count(),
        2
    );
}

#[test]
fn dropping_engine_releases_output_subscriptions() {
    use narrator::{AudioOutput, MemoryReporter, PlayRejected, Subscription};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Forwards to a shared `ScriptedOutput` so it can be inspected after drop.
    struct Shared(Rc<RefCell<ScriptedOutput>>);

    impl AudioOutput for Shared {
        fn attach(&mut self, s: Subscription) {
            self.0.borrow_mut().attach(s)
        }
        fn detach(&mut self, s: Subscription) {
            self.0.borrow_mut().detach(s)
        }
        fn set_source(&mut self, source: Option<&str>) {
            self.0.borrow_mut().set_source(source)
        }
        fn load(&mut self) {
            self.0.borrow_mut().load()
        }
        fn play(&mut self) -> Result<(), PlayRejected> {
            self.0.borrow_mut().play()
        }
        fn pause(&mut self) {
            self.0.borrow_mut().pause()
        }
        fn position(&self) -> f64 {
            self.0.borrow().position()
        }
        fn duration(&self) -> Option<f64> {
            self.0.borrow().duration()
        }
    }

    let inner = Rc::new(RefCell::new(ScriptedOutput::default()));
    let engine = PlaybackEngine::new(
        sequence(&["a"]),
        Shared(inner.clone()),
        Box::new(MemoryReporter::new()),
    );
    drop(engine);

    let out = inner.borrow();
    assert!(out.attached.is_empty());
    assert_eq!(out.source, None);
    assert!(out.calls.contains(&Call::Pause));
}
