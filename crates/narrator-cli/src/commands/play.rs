use anyhow::{Context, Result};
use clap::Args;
use narrator::{
    ClockedOutput, DefaultAssetLoader, PlaybackEngine, PlaybackSnapshot, SignalQueue,
    TracingReporter,
};
use narrator_schema::SceneSequence;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Scene file (JSON array of scenes)
    #[arg(long, value_name = "FILE")]
    pub scenes: PathBuf,

    /// Simulated milliseconds per tick
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Index of the scene to start from
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Behave as if the runtime refused to start playback on its own
    #[arg(long)]
    pub no_autoplay: bool,

    /// Stop after this many simulated seconds
    #[arg(long, default_value_t = 600.0)]
    pub max_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Finished,
    /// The current scene has nothing playing and nothing will start it.
    Stalled,
    TimeLimit,
}

#[derive(Debug)]
pub struct PlayOutcome {
    pub reason: StopReason,
    pub simulated_seconds: f64,
    pub snapshot: PlaybackSnapshot,
}

pub fn run(args: PlayArgs) -> Result<()> {
    let scenes = SceneSequence::from_path(&args.scenes)
        .with_context(|| format!("Failed to read scenes from {:?}", args.scenes))?;

    let outcome = play(scenes, &args)?;
    match outcome.reason {
        StopReason::Finished => info!(seconds = outcome.simulated_seconds, "Presentation finished"),
        StopReason::Stalled => warn!(
            seconds = outcome.simulated_seconds,
            index = ?outcome.snapshot.current_index,
            "Playback stalled; the current scene needs user interaction"
        ),
        StopReason::TimeLimit => warn!(seconds = outcome.simulated_seconds, "Time limit reached"),
    }

    println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
    Ok(())
}

/// Runs the engine against a simulated clock until it finishes, stalls, or
/// the time limit passes.
pub fn play(scenes: SceneSequence, args: &PlayArgs) -> Result<PlayOutcome> {
    let queue = SignalQueue::new();
    let (output, clock) = ClockedOutput::new(Arc::new(DefaultAssetLoader), queue.sender());
    let output = if args.no_autoplay {
        output.with_autoplay_rejected()
    } else {
        output
    };

    let mut engine = PlaybackEngine::new(scenes, output, Box::new(TracingReporter));
    if args.start > 0 {
        engine.jump_to(args.start)?;
    }
    engine.pump(queue.receiver());

    let dt = args.tick_ms.max(1) as f64 / 1000.0;
    let mut elapsed = 0.0;
    let reason = loop {
        let snapshot = engine.snapshot();
        if snapshot.no_content {
            break StopReason::Stalled;
        }
        if snapshot.finished {
            break StopReason::Finished;
        }
        if !clock.is_playing() {
            break StopReason::Stalled;
        }
        if elapsed >= args.max_seconds {
            break StopReason::TimeLimit;
        }

        clock.advance(dt);
        engine.pump(queue.receiver());
        elapsed += dt;
    };

    Ok(PlayOutcome {
        reason,
        simulated_seconds: elapsed,
        snapshot: engine.snapshot(),
    })
}
