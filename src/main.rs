use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lucifer_agent::actions::{SystemAppCatalog, SystemClockDisplay, SystemPower, SystemVolume};
use lucifer_agent::audio::{AudioCapture, AudioGate, CpalSource, rms_energy};
use lucifer_agent::sched::Scheduler;
use lucifer_agent::session::battery_advisory;
use lucifer_agent::speech::{HttpStt, Listener, Speak, SystemTts, Voice};
use lucifer_agent::{Collaborators, SessionLoop, Settings, hotkey, singleton};

/// Lucifer - voice-driven desktop command agent
#[derive(Parser)]
#[command(name = "lucifer", version, about)]
struct Cli {
    /// Path to the config file (defaults to the user config dir)
    #[arg(short, long, env = "LUCIFER_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable the global Ctrl+Alt+Q exit hotkey
    #[arg(long, env = "LUCIFER_NO_HOTKEY")]
    no_hotkey: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speech output
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the speech output.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,lucifer_agent=info",
        1 => "info,lucifer_agent=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::Say { text } => say(&text).await,
        };
    }

    let config_path = cli.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&config_path)?;
    tracing::info!(config = %config_path.display(), "starting lucifer agent");

    let _singleton = singleton::acquire().await?;

    let cancel = CancellationToken::new();
    let gate = Arc::new(AudioGate::new());

    let voice: Arc<dyn Speak> = Arc::new(Voice::new(
        Arc::clone(&gate),
        Arc::new(SystemTts::new()),
    ));
    let listener = Arc::new(Listener::new(
        Arc::clone(&gate),
        Arc::new(CpalSource::new()),
        Arc::new(HttpStt::new(&settings.stt)),
    ));

    let power = Arc::new(SystemPower::new());
    let clock = Arc::new(SystemClockDisplay::new(
        settings.clock_page_path(),
        settings.opener.clone(),
    ));

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&clock) as _,
        Arc::clone(&voice),
        Arc::clone(&listener) as _,
    ));

    let session = SessionLoop::new(
        Collaborators {
            listener: Arc::clone(&listener) as _,
            voice: Arc::clone(&voice),
            power: Arc::clone(&power) as _,
            volume: Arc::new(SystemVolume::new()),
            apps: Arc::new(SystemAppCatalog::new(&settings.apps)),
            clock: Arc::clone(&clock) as _,
        },
        Arc::clone(&scheduler),
        Arc::clone(&gate),
        cancel.clone(),
    );

    tokio::spawn(battery_advisory(
        Arc::clone(&power) as _,
        Arc::clone(&voice),
        cancel.clone(),
    ));

    if settings.hotkey_enabled && !cli.no_hotkey {
        let mut chords = hotkey::spawn_exit_hotkey();
        let voice = Arc::clone(&voice);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if chords.recv().await.is_some() {
                voice.say("Exiting program via hotkey. Goodbye!").await;
                cancel.cancel();
            }
        });
    }

    // Ctrl+C behaves like a spoken exit, minus the farewell.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    voice.say("Welcome sir").await;
    tracing::info!("lucifer agent ready - say \"HEY LUCIFER\"");

    session.run().await;

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speech output
async fn say(text: &str) -> anyhow::Result<()> {
    let gate = Arc::new(AudioGate::new());
    let voice = Voice::new(gate, Arc::new(SystemTts::new()));
    voice.say(text).await;
    Ok(())
}
