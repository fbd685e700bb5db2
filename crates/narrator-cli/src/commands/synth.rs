use anyhow::{bail, Context, Result};
use clap::Args;
use narrator_schema::{Scene, SceneSequence};
use narrator_tts::config::{API_KEY_ENV, AUDIO_SUFFIX, DEFAULT_ENDPOINT, ENDPOINT_ENV};
use narrator_tts::{file_url, GoogleTtsProvider, TtsConfig, TtsProvider};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Scene file (JSON array of scenes)
    #[arg(long, value_name = "FILE")]
    pub scenes: PathBuf,

    /// Directory receiving one audio file per synthesized scene
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Where to write the updated scene file (stdout if omitted)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Continue with the remaining scenes after a failed synthesis
    #[arg(long)]
    pub keep_going: bool,

    /// Synthesis API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Synthesis endpoint
    #[arg(long, env = ENDPOINT_ENV, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

/// Outcome of one synthesis pass over a sequence.
#[derive(Debug)]
pub struct SynthReport {
    pub sequence: SceneSequence,
    pub synthesized: usize,
    /// Scene ids whose synthesis failed (only with `keep_going`).
    pub failed: Vec<String>,
}

pub async fn run(args: SynthArgs) -> Result<()> {
    let Some(api_key) = args.api_key.as_deref().filter(|k| !k.is_empty()) else {
        bail!("No synthesis API key; pass --api-key or set {}", API_KEY_ENV);
    };

    let scenes = SceneSequence::from_path(&args.scenes)
        .with_context(|| format!("Failed to read scenes from {:?}", args.scenes))?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {:?}", args.out_dir))?;

    // Temporary assets live next to their final location so persisting is a rename.
    let config = TtsConfig::builder()
        .with_endpoint(&args.endpoint)
        .with_api_key(api_key)
        .with_asset_dir(&args.out_dir)
        .build();
    let provider = GoogleTtsProvider::new(config);

    let report = synthesize_missing(&provider, &scenes, &args.out_dir, args.keep_going).await?;
    info!(
        synthesized = report.synthesized,
        failed = report.failed.len(),
        "Synthesis pass complete"
    );

    let json = report.sequence.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        None => println!("{}", json),
    }

    if !report.failed.is_empty() {
        bail!("Synthesis failed for: {}", report.failed.join(", "));
    }
    Ok(())
}

/// Synthesizes every scene without audio, one request at a time, and persists
/// each asset as `<out_dir>/<sceneId>.mp3`.
pub async fn synthesize_missing(
    provider: &dyn TtsProvider,
    scenes: &SceneSequence,
    out_dir: &Path,
    keep_going: bool,
) -> Result<SynthReport> {
    let mut updated = Vec::with_capacity(scenes.len());
    let mut synthesized = 0;
    let mut failed = Vec::new();

    for scene in scenes.iter() {
        if scene.has_narration() {
            updated.push(scene.clone());
            continue;
        }

        info!(scene_id = %scene.scene_id, provider = provider.name(), "Synthesizing narration");
        let asset = match provider.synthesize(&scene.script).await {
            Ok(asset) => asset,
            Err(e) if keep_going => {
                warn!(scene_id = %scene.scene_id, "Skipping scene: {}", e);
                failed.push(scene.scene_id.clone());
                updated.push(scene.clone());
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Synthesis failed for scene '{}'", scene.scene_id)
                });
            }
        };

        let dest = out_dir.join(asset_file_name(scene));
        let persisted = asset
            .persist(&dest)
            .with_context(|| format!("Failed to persist audio to {:?}", dest))?;
        let url = file_url(&persisted)
            .with_context(|| format!("Failed to build a URL for {:?}", persisted))?;

        updated.push(scene.clone().with_audio(url.to_string()));
        synthesized += 1;
    }

    Ok(SynthReport {
        sequence: SceneSequence::new(updated),
        synthesized,
        failed,
    })
}

fn asset_file_name(scene: &Scene) -> String {
    let stem: String = scene
        .scene_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}{}", stem, AUDIO_SUFFIX)
}
