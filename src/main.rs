use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use meetscribe::audio::{crop, CropConfig};
use meetscribe::config::{Config, Provider};
use meetscribe::meeting::{Meeting, MeetingStatus};
use meetscribe::retry::RetryCoordinator;
use meetscribe::store::{MemoryStore, MeetingStore};
use meetscribe::transcribe::{Orchestrator, TranscriptionOptions};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "meetscribe")]
#[command(version, about = "Turn meeting recordings into searchable text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe a recording through the full pipeline
    Transcribe {
        /// Input audio file
        input: PathBuf,

        /// Transcription provider: openai, groq
        #[arg(short, long)]
        provider: Option<String>,

        /// Model identifier (defaults to the provider's standard model)
        #[arg(short, long)]
        model: Option<String>,

        /// Crop long silences before uploading
        #[arg(long)]
        crop_silences: bool,

        /// Relay speaker data when the provider returns it
        #[arg(long)]
        diarize: bool,

        /// Generate a short title from the transcript
        #[arg(long)]
        title: bool,

        /// Language hint (ISO 639-1 code)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Fast dictation: plain text out, short timeout
    Dictate {
        /// Input audio file
        input: PathBuf,

        /// Transcription provider: openai, groq
        #[arg(short, long)]
        provider: Option<String>,

        /// Language hint (ISO 639-1 code)
        #[arg(short, long, default_value = "en")]
        language: String,
    },

    /// Crop long silences out of a WAV file
    Crop {
        /// Input WAV file
        input: PathBuf,

        /// Minimum silence length worth cutting, in seconds
        #[arg(long, default_value_t = 2.0)]
        min_silence: f64,

        /// Audio kept around each cut, in seconds
        #[arg(long, default_value_t = 0.3)]
        keep_pad: f64,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn resolve_provider(arg: Option<String>, config: &Config) -> Result<Provider> {
    match arg {
        Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e)),
        None => Ok(config.default_provider),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let flag = cancelled.clone();
        ctrlc::set_handler(move || {
            flag.store(true, std::sync::atomic::Ordering::Relaxed);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    match cli.command {
        Commands::Transcribe {
            input,
            provider,
            model,
            crop_silences,
            diarize,
            title,
            language,
        } => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }

            let config = Config::load().context("Failed to load configuration")?;
            let provider = resolve_provider(provider, &config)?;
            config
                .validate(provider)
                .context("Configuration validation failed")?;

            let options = TranscriptionOptions {
                provider: Some(provider),
                model: model.unwrap_or_else(|| provider.default_model().to_string()),
                crop_silences,
                silence_crop_threshold: config.silence_crop_threshold,
                enable_diarization: diarize,
                generate_title: title,
                language,
                ..Default::default()
            };

            let store = Arc::new(MemoryStore::new());
            let meeting = Meeting {
                id: "cli".to_string(),
                title: input
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "Recording".to_string()),
                status: MeetingStatus::PendingTranscription,
                audio_path: input.clone(),
                transcript: None,
                error_message: None,
                api_cost_cents: None,
                duration_seconds: None,
            };
            store.save(&meeting).await?;

            let orchestrator = Arc::new(Orchestrator::new(Arc::new(config)));
            let coordinator = RetryCoordinator::new(store, orchestrator);

            let pb = spinner("Transcribing...");
            let settled = coordinator
                .process_with_cancel("cli", &options, &cancelled)
                .await?;
            pb.finish_and_clear();

            print_meeting(&settled);
            if settled.status != MeetingStatus::Ready {
                std::process::exit(1);
            }
        }

        Commands::Dictate {
            input,
            provider,
            language,
        } => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }

            let config = Config::load().context("Failed to load configuration")?;
            let provider = resolve_provider(provider, &config)?;
            config
                .validate(provider)
                .context("Configuration validation failed")?;

            let options = TranscriptionOptions {
                provider: Some(provider),
                model: provider.default_model().to_string(),
                language: Some(language),
                ..Default::default()
            };

            let orchestrator = Orchestrator::new(Arc::new(config));
            let text = orchestrator.run_dictation(&input, &options).await?;
            println!("{text}");
        }

        Commands::Crop {
            input,
            min_silence,
            keep_pad,
        } => {
            let crop_config = CropConfig {
                min_silence_duration: min_silence,
                keep_pad,
                ..Default::default()
            };
            let outcome = crop(&input, &crop_config)?;

            if outcome.regions_cropped == 0 {
                println!("No silence longer than {min_silence:.1}s found; nothing to crop.");
            } else {
                println!(
                    "{} {} region(s) cropped, {:.1}s -> {:.1}s ({:.1}s saved)",
                    style("✓").green(),
                    outcome.regions_cropped,
                    outcome.original_duration,
                    outcome.new_duration,
                    outcome.time_saved
                );
                println!("Wrote {}", outcome.output_path.display());
            }
        }
    }

    Ok(())
}

fn print_meeting(meeting: &Meeting) {
    println!();
    match meeting.status {
        MeetingStatus::Ready => {
            println!("{} {}", style("✓").green(), style(&meeting.title).bold());
            if let Some(duration) = meeting.duration_seconds {
                println!("  Duration: {:.1}s", duration);
            }
            if let Some(cost) = meeting.api_cost_cents {
                println!("  Cost:     {cost}¢");
            }
            println!();
            if let Some(ref transcript) = meeting.transcript {
                println!("{transcript}");
            }
        }
        _ => {
            println!(
                "{} Transcription failed ({})",
                style("✗").red(),
                meeting.status
            );
            if let Some(ref message) = meeting.error_message {
                println!("  {message}");
            }
        }
    }
}
