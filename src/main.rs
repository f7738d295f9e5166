use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use beacon_enclosure::enclosure::FrameWriter;
use beacon_enclosure::{
    AudioData, BusClient, Config, Connectivity, EnclosureContext, EnclosureRouter, Frame,
    IdentityFile, NetworkChecker, PairingStatus, stt,
};

/// Beacon Enclosure - framebuffer and connectivity handling for voice devices
#[derive(Parser)]
#[command(name = "beacon-enclosure", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/omni/beacon/enclosure.toml)
    #[arg(short, long, env = "BEACON_ENCLOSURE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the message bus and run the enclosure router (default)
    Run,
    /// Transcribe a WAV file with the configured STT module
    Transcribe {
        /// Path to a WAV file
        path: PathBuf,
        /// Language code overriding the configured one
        #[arg(short, long)]
        lang: Option<String>,
    },
    /// Draw a Wi-Fi setup frame (connect, choose-network, success)
    Draw {
        /// Frame name
        frame: String,
    },
    /// Show connectivity and pairing status
    CheckNet,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,beacon_enclosure=info",
        1 => "info,beacon_enclosure=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_enclosure(&config).await,
        Command::Transcribe { path, lang } => transcribe(&config, &path, lang.as_deref()).await,
        Command::Draw { frame } => draw(&config, &frame).await,
        Command::CheckNet => check_net(config).await,
    }
}

async fn run_enclosure(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        bus = %config.bus.url,
        framebuffer = %config.enclosure.framebuffer.display(),
        lang = %config.lang,
        "starting beacon enclosure"
    );

    let bus = Arc::new(BusClient::connect(&config.bus.url)?);
    let net = Arc::new(NetworkChecker::new(config.network.clone())?);
    let pairing = Arc::new(IdentityFile::new(config.identity_path.clone()));

    let ctx = EnclosureContext::new(config, bus, net, pairing);
    let router = EnclosureRouter::new(ctx);
    let bootstrap = router.start().await;

    tokio::select! {
        () = router.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
        }
    }

    if let Some(handle) = bootstrap {
        handle.abort();
    }
    Ok(())
}

async fn transcribe(config: &Config, path: &Path, lang: Option<&str>) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let audio = AudioData::from_wav(&bytes)?;

    let stt = stt::create(config)?;
    tracing::info!(
        module = %stt.kind(),
        samples = audio.samples().len(),
        sample_rate = audio.sample_rate(),
        "transcribing"
    );

    let text = stt.execute(&audio, lang).await?;
    println!("{text}");
    Ok(())
}

async fn draw(config: &Config, name: &str) -> anyhow::Result<()> {
    let frame = Frame::from_name(name).with_context(|| {
        format!("unknown frame {name:?} (expected connect, choose-network or success)")
    })?;

    let writer = FrameWriter::new(
        config.enclosure.resources_dir.clone(),
        config.enclosure.framebuffer.clone(),
    );
    writer.draw(frame).await?;
    println!(
        "Drew {} to {}",
        frame.file_name(),
        config.enclosure.framebuffer.display()
    );
    Ok(())
}

async fn check_net(config: Config) -> anyhow::Result<()> {
    let checker = NetworkChecker::new(config.network)?;
    let identity = IdentityFile::new(config.identity_path);

    let connected = checker.is_connected().await;
    let paired = identity.has_been_paired();

    println!("Internet: {}", if connected { "connected" } else { "offline" });
    println!(
        "Paired:   {} ({})",
        if paired { "yes" } else { "no" },
        identity.path().display()
    );
    Ok(())
}
