//! Vigil command-line host.
//!
//! Screens one call per invocation: wires a chunk source (WAV replay or a
//! live input device) and a transcriber into the engine, streams progress
//! events to the log, and prints the final Decision as JSON on stdout.
//!
//! ```text
//! vigil --wav call.wav --script call.txt --number +15550123
//! vigil --live --device "CallAudio Loopback"
//! ```
//!
//! Real recognizer backends plug in behind `TranscriptionEngine`; the CLI
//! ships with the scripted transcriber so whole sessions replay
//! deterministically from a transcript file (one line per chunk, blank
//! lines for silent chunks).

mod replay;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vigil_core::{
    LiveChunkSource, ScreeningConfig, ScreeningEngine, ScriptedTranscriber, TranscriberHandle,
    TranscriptionEngine,
};

use replay::ReplayChunkSource;
use settings::{default_settings_path, load_settings, save_settings};

#[derive(Debug, Default)]
struct Args {
    wav: Option<PathBuf>,
    script: Option<PathBuf>,
    live: bool,
    device: Option<String>,
    number: Option<String>,
    settings_path: Option<PathBuf>,
    user_name: Option<String>,
    family_names: Option<Vec<String>>,
    custom_keywords: Option<Vec<String>>,
    budget_ms: Option<u64>,
    chunk_ms: Option<u64>,
    save: bool,
}

const USAGE: &str = "Usage: vigil (--wav <file.wav> | --live) [options]

Options:
  --wav <file>        replay a recorded call from a WAV file
  --script <file>     transcript script for replay (one line per chunk)
  --live              capture from an input device instead of a file
  --device <name>     input device for --live (loopback or virtual device)
  --number <str>      caller's phone number (for logs), default: unknown
  --user-name <str>   override the configured user name
  --family <a,b,c>    override the configured family names
  --keywords <a,b,c>  override the configured emergency keywords
  --budget-ms <n>     analysis time budget (clamped to [5000, 20000])
  --chunk-ms <n>      chunk duration (clamped to [500, 5000])
  --settings <file>   settings file path (default: platform data dir)
  --save              persist the merged settings before screening
  -h, --help          show this help";

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value_for = |flag: &str| {
            it.next()
                .with_context(|| format!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--wav" => args.wav = Some(PathBuf::from(value_for("--wav")?)),
            "--script" => args.script = Some(PathBuf::from(value_for("--script")?)),
            "--live" => args.live = true,
            "--device" => args.device = Some(value_for("--device")?),
            "--number" => args.number = Some(value_for("--number")?),
            "--user-name" => args.user_name = Some(value_for("--user-name")?),
            "--family" => args.family_names = Some(split_list(&value_for("--family")?)),
            "--keywords" => args.custom_keywords = Some(split_list(&value_for("--keywords")?)),
            "--budget-ms" => {
                args.budget_ms = Some(
                    value_for("--budget-ms")?
                        .parse()
                        .context("invalid value for --budget-ms")?,
                )
            }
            "--chunk-ms" => {
                args.chunk_ms = Some(
                    value_for("--chunk-ms")?
                        .parse()
                        .context("invalid value for --chunk-ms")?,
                )
            }
            "--settings" => args.settings_path = Some(PathBuf::from(value_for("--settings")?)),
            "--save" => args.save = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}\n\n{USAGE}"),
        }
    }

    if args.wav.is_none() && !args.live {
        bail!("one of --wav or --live is required\n\n{USAGE}");
    }
    if args.wav.is_some() && args.live {
        bail!("--wav and --live are mutually exclusive");
    }
    Ok(args)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn load_script(path: &PathBuf) -> anyhow::Result<ScriptedTranscriber> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    Ok(ScriptedTranscriber::from_lines(
        raw.lines().map(str::to_string),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "vigil=info".parse().unwrap()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vigil: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = parse_args()?;

    let settings_path = args
        .settings_path
        .clone()
        .unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);

    if let Some(name) = &args.user_name {
        settings.user_name = name.clone();
    }
    if let Some(names) = &args.family_names {
        settings.family_names = names.clone();
    }
    if let Some(keywords) = &args.custom_keywords {
        settings.custom_keywords = keywords.clone();
    }
    if let Some(budget) = args.budget_ms {
        settings.budget_ms = budget;
    }
    if let Some(chunk) = args.chunk_ms {
        settings.chunk_interval_ms = chunk;
    }
    if let Some(device) = &args.device {
        settings.preferred_input_device = Some(device.clone());
    }
    settings.normalize();

    if args.save {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("saving settings to {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings saved");
    }

    let config = ScreeningConfig {
        budget_ms: settings.budget_ms,
        chunk_interval_ms: settings.chunk_interval_ms,
        user_name: settings.user_name.clone(),
        family_names: settings.family_names.clone(),
        custom_keywords: settings.custom_keywords.clone(),
    };

    let transcriber = match &args.script {
        Some(path) => TranscriberHandle::new(load_script(path)?),
        None => {
            if args.live {
                warn!("no recognizer configured for --live; transcript will stay empty");
            }
            TranscriberHandle::new(ScriptedTranscriber::new(Vec::new()))
        }
    };
    transcriber.0.lock().initialize().map_err(anyhow::Error::from)?;

    let source: Box<dyn vigil_core::audio::AudioChunkSource> = if args.live {
        Box::new(LiveChunkSource::with_device(
            settings.preferred_input_device.clone(),
        ))
    } else {
        let wav = args.wav.as_ref().expect("checked in parse_args");
        Box::new(ReplayChunkSource::from_wav(wav)?)
    };

    let number = args.number.clone().unwrap_or_else(|| "unknown".into());
    let engine = ScreeningEngine::new(config, transcriber);

    let mut transcript_rx = engine.subscribe_transcripts();
    tokio::spawn(async move {
        while let Ok(event) = transcript_rx.recv().await {
            info!(seq = event.seq, fragment = %event.fragment, "transcript");
        }
    });
    let mut status_rx = engine.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = status_rx.recv().await {
            info!(phase = ?event.phase, detail = ?event.detail, "phase");
        }
    });
    let mut activity_rx = engine.subscribe_activity();
    tokio::spawn(async move {
        while let Ok(event) = activity_rx.recv().await {
            tracing::debug!(
                seq = event.seq,
                rms = format_args!("{:.1}", event.rms),
                beep = format_args!("{:.3}", event.beep_score),
                "activity"
            );
        }
    });

    let handle = engine.start(number, source).map_err(anyhow::Error::from)?;
    let decision_fut = handle.decision();
    tokio::pin!(decision_fut);

    let decision = tokio::select! {
        decision = &mut decision_fut => decision.map_err(anyhow::Error::from)?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, finalizing with accumulated evidence");
            engine.stop().map_err(anyhow::Error::from)?;
            decision_fut.await.map_err(anyhow::Error::from)?
        }
    };

    let snapshot = engine.diagnostics_snapshot();
    info!(
        chunks = snapshot.chunks_captured,
        transcription_failures = snapshot.transcription_failures,
        "session complete"
    );

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
