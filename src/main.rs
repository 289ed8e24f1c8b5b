use anyhow::{Context, Result};
use capscribe::audio::capture::list_devices;
use capscribe::cli::{Cli, Commands};
use capscribe::config::Config;
use capscribe::recorder::{Recorder, RecorderEvent, format_elapsed};
use capscribe::transcribe::{
    ModelFactory, SpeechModel, TranscriptionCoordinator, TranscriptionStatus, WhisperConfig,
    WhisperModel,
};
use capscribe::upload::RecordingUploader;
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path).with_env_overrides();

    match cli.command {
        Commands::Record {
            device,
            duration,
            timeout,
            model,
            upload,
        } => run_record(config, cli.quiet, device, duration, timeout, model, upload).await,
        Commands::Devices => list_input_devices(),
    }
}

/// Record from the microphone, then transcribe and optionally upload.
#[allow(clippy::too_many_arguments)]
async fn run_record(
    mut config: Config,
    quiet: bool,
    device: Option<String>,
    duration: Duration,
    timeout: Option<Duration>,
    model: Option<PathBuf>,
    upload: bool,
) -> Result<()> {
    if let Some(d) = device {
        config.recorder.device = Some(d);
    }
    if let Some(m) = model {
        config.transcription.model_path = Some(m.to_string_lossy().to_string());
    }
    let timeout = timeout.unwrap_or_else(|| config.transcribe_timeout());

    let mut recorder =
        Recorder::from_input_device(config.recorder_config(), config.recorder.device.clone());

    // Wire a meter thread unless quiet
    let mut meter = None;
    if !quiet {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        recorder = recorder.with_event_sender(event_tx);
        meter = Some(std::thread::spawn(move || {
            while let Ok(event) = event_rx.recv() {
                match event {
                    RecorderEvent::Started => {
                        eprintln!("Recording... (ctrl-c to abort)");
                    }
                    RecorderEvent::Tick { elapsed } => {
                        eprint!("\r  {} ", format_elapsed(elapsed));
                        let _ = io::stderr().flush();
                    }
                    RecorderEvent::Stopped { duration, .. } => {
                        eprintln!("\rRecorded {}    ", format_elapsed(duration));
                        break;
                    }
                    RecorderEvent::Cancelled => {
                        eprintln!("\rRecording cancelled");
                        break;
                    }
                }
            }
        }));
    }

    recorder
        .start()
        .context("Failed to start recording")?;
    tokio::time::sleep(duration).await;
    let artifact = recorder
        .stop()
        .context("Failed to finalize recording")?
        .context("No active recording session")?;
    let recorded = recorder.elapsed();

    if let Some(meter) = meter.take()
        && meter.join().is_err()
    {
        eprintln!("capscribe: meter thread panicked");
    }

    if !quiet {
        eprintln!(
            "Artifact: {} bytes, {} ({})",
            artifact.len(),
            artifact.media_type(),
            format_elapsed(recorded),
        );
    }

    // Transcribe when a model is configured
    let mut transcription = None;
    if let Some(model_path) = config.transcription.model_path.clone() {
        let whisper_config = WhisperConfig {
            model_path: PathBuf::from(model_path),
            language: config.transcription.language.clone(),
            threads: None,
        };
        let factory: ModelFactory = Box::new(move || {
            WhisperModel::new(whisper_config.clone()).map(|m| Box::new(m) as Box<dyn SpeechModel>)
        });

        let mut coordinator =
            TranscriptionCoordinator::new(factory).with_default_timeout(timeout);

        let mut status_printer = None;
        if !quiet {
            let (status_tx, status_rx) = crossbeam_channel::unbounded();
            coordinator = coordinator.with_status_sender(status_tx);
            status_printer = Some(std::thread::spawn(move || {
                while let Ok(status) = status_rx.recv() {
                    match status {
                        TranscriptionStatus::ModelProgress { fraction } => {
                            eprint!("\rLoading speech model {:3.0}% ", fraction * 100.0);
                            let _ = io::stderr().flush();
                        }
                        TranscriptionStatus::Transcribing => {
                            eprintln!("\r{}          ", status);
                        }
                        TranscriptionStatus::LoadingModel => {}
                        other => {
                            eprintln!("{}", other);
                            break;
                        }
                    }
                }
            }));
        }

        match coordinator.transcribe_artifact(&artifact).await {
            Ok(text) => {
                println!("{}", text);
                transcription = Some(text);
            }
            Err(e) => eprintln!("capscribe: {}", e),
        }
        coordinator.shutdown().await;
        drop(coordinator);

        if let Some(printer) = status_printer.take()
            && printer.join().is_err()
        {
            eprintln!("capscribe: status thread panicked");
        }
    } else if !quiet {
        eprintln!("capscribe: no speech model configured, skipping transcription");
    }

    // Deliver the artifact
    if upload {
        let uploader = RecordingUploader::new(config.upload.endpoint.clone())
            .context("Failed to build uploader")?
            .with_field_name(config.upload.field.clone());

        let duration_ms = recorded.as_millis().to_string();
        let mut extra: Vec<(&str, &str)> = vec![("duration_ms", duration_ms.as_str())];
        if let Some(text) = transcription.as_deref() {
            extra.push(("transcription", text));
        }

        let response = uploader
            .send(&artifact, &extra)
            .await
            .context("Upload failed")?;

        if !quiet {
            eprintln!("{}", response.message);
            if let Some(url) = response.url {
                eprintln!("Stored at: {}", url);
            }
        }
    }

    Ok(())
}

/// List available audio input devices.
fn list_input_devices() -> Result<()> {
    let devices = list_devices().context("Failed to enumerate audio devices")?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        return Ok(());
    }

    println!("Audio input devices:");
    for device in devices {
        if let Some(name) = device.strip_suffix(" [recommended]") {
            println!("  {} {}", name, "[recommended]".green());
        } else {
            println!("  {}", device);
        }
    }
    Ok(())
}
