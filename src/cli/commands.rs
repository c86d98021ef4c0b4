//! Command execution

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::analysis::BpmAnalyzer;
use crate::cli::args::{AnalyzeArgs, AssembleArgs, ServeArgs};
use crate::engine::{shared_engine, MediaEngine};
use crate::output;
use crate::pipeline::{Assembler, AssemblyOptions, AudioSource, Clip};
use crate::server::{self, ProxyConfig, ServerState};

/// BPM used when neither --bpm nor --detect-bpm resolves a value,
/// matching the original client default
const DEFAULT_BPM: u32 = 120;

/// Execute the assemble command
pub async fn execute_assemble(args: AssembleArgs) -> Result<()> {
    let engine = shared_engine().await?;
    let clips = load_clips(&args.inputs).await?;
    let audio = match &args.audio {
        Some(source) => Some(load_audio_source(source).await?),
        None => None,
    };

    let options = if args.simple {
        AssemblyOptions::Simple
    } else {
        let bpm = resolve_bpm(&args, audio.as_ref(), engine.clone()).await?;
        AssemblyOptions::BeatSynced {
            bpm,
            clips_per_beat: args.clips_per_beat,
            audio,
        }
    };

    let assembler = Assembler::new(engine);
    let result = assembler.assemble(&clips, &options).await?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(output::default_output_name()));
    output::write_artifact(&path, &result.data).await?;

    if let AssemblyOptions::BeatSynced { audio: Some(_), .. } = &options {
        if !result.audio_muxed {
            warn!("Output is video-only: the background track could not be muxed");
        }
    }
    println!("{}", path.display());
    Ok(())
}

/// Execute the analyze command
pub async fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let engine = shared_engine().await?;
    let analyzer = BpmAnalyzer::new(engine as Arc<dyn MediaEngine>);
    let bpm = if is_url(&args.input) {
        analyzer.analyze_url(&args.input).await?
    } else {
        let bytes = tokio::fs::read(&args.input)
            .await
            .with_context(|| format!("could not read {}", args.input))?;
        analyzer.analyze_bytes(&bytes).await?
    };
    println!("{}", bpm);
    Ok(())
}

/// Execute the serve command
pub async fn execute_serve(args: ServeArgs) -> Result<()> {
    let state = ServerState::new(ProxyConfig::from_env());
    server::serve(state, args.port).await?;
    Ok(())
}

async fn load_clips(inputs: &[PathBuf]) -> Result<Vec<Clip>> {
    let mut clips = Vec::with_capacity(inputs.len());
    for path in inputs {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read clip {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        clips.push(Clip::from_file_name(&file_name, data));
    }
    info!("Loaded {} clip(s)", clips.len());
    Ok(clips)
}

async fn load_audio_source(source: &str) -> Result<AudioSource> {
    if is_url(source) {
        Ok(AudioSource::Url(source.to_string()))
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("could not read audio {}", source))?;
        Ok(AudioSource::Bytes(bytes))
    }
}

/// Resolve the effective BPM: detection when requested, then the manual
/// value, then the default. Detection failure is non-fatal when a manual
/// value is available.
async fn resolve_bpm(
    args: &AssembleArgs,
    audio: Option<&AudioSource>,
    engine: Arc<dyn MediaEngine>,
) -> Result<u32> {
    if args.detect_bpm {
        let analyzer = BpmAnalyzer::new(engine);
        let detection = match audio {
            Some(AudioSource::Url(url)) => analyzer.analyze_url(url).await,
            Some(AudioSource::Bytes(bytes)) => analyzer.analyze_bytes(bytes).await,
            None => return Err(anyhow!("--detect-bpm requires --audio")),
        };
        match detection {
            Ok(bpm) => {
                info!("Detected {} BPM", bpm);
                return Ok(bpm);
            }
            Err(e) => {
                warn!("{}", e);
                return args
                    .bpm
                    .ok_or_else(|| anyhow!("BPM detection failed; supply --bpm manually"));
            }
        }
    }
    Ok(args.bpm.unwrap_or(DEFAULT_BPM))
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
