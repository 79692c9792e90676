use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleetcam::media::{MockMediaDevices, MockSurface};
use fleetcam::{
    CaptureOptions, CaptureSession, FleetcamConfig, FrameProcessorBuilder, FrameSample,
    ImageFormat, RasterCanvas,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Cameras exposed by the built-in synthetic host
const SYNTHETIC_CAMERAS: usize = 2;

#[derive(Parser, Debug)]
#[command(name = "fleetcam")]
#[command(about = "Camera capture session for fleet-management front ends")]
#[command(version)]
#[command(long_about = "Lists cameras, binds a live stream and polls it for frames that are \
handed to an analysis sink. This binary drives the built-in synthetic camera host; embedders \
plug their own media host into the fleetcam library.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "fleetcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available cameras
    Devices,

    /// Poll a camera and write every extracted frame to disk
    Capture {
        /// Number of frames to write before stopping
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u64,

        /// Directory frames are written to
        #[arg(short, long, default_value = "./frames")]
        output: PathBuf,

        /// Camera id as printed by `fleetcam devices`
        #[arg(long)]
        device: Option<String>,
    },

    /// Write a single still using the [frame] settings
    Snapshot {
        /// Output file stem; the extension follows the configured format
        #[arg(short, long, default_value = "snapshot")]
        output: PathBuf,

        /// Camera id as printed by `fleetcam devices`
        #[arg(long)]
        device: Option<String>,
    },
}

/// Sidecar written next to each frame image
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameSidecar<'a> {
    timestamp: &'a str,
    width: u32,
    height: u32,
    encoded_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", FleetcamConfig::default().to_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting fleetcam v{}", env!("CARGO_PKG_VERSION"));

    let config = FleetcamConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let devices = Arc::new(MockMediaDevices::with_cameras(SYNTHETIC_CAMERAS));
    let session =
        CaptureSession::with_frame_config(devices, config.capture.clone(), config.frame.clone());

    match args.command.unwrap_or(Command::Devices) {
        Command::Devices => list_devices(&session).await,
        Command::Capture {
            count,
            output,
            device,
        } => capture(&session, &config, count, output, device).await,
        Command::Snapshot { output, device } => snapshot(&session, output, device).await,
    }
}

async fn list_devices(session: &CaptureSession) -> Result<()> {
    let cameras = session.list_camera_devices().await?;

    for camera in &cameras {
        println!("{}\t{}", camera.id, camera.label);
    }
    Ok(())
}

async fn snapshot(session: &CaptureSession, output: PathBuf, device: Option<String>) -> Result<()> {
    let capture = session.config();
    let surface = MockSurface::new(capture.width, capture.height);
    let canvas = RasterCanvas::default();

    session.start_camera(&surface, device.as_deref(), None).await?;
    let data_url = session.capture_frame(Some(&surface), Some(&canvas), None, None);
    session.stop_camera(&surface);

    let data_url = data_url?;
    let (format, bytes) = fleetcam::frame::decode_data_url(&data_url)?;
    let format = format.unwrap_or(session.frame_config().format);
    let path = output.with_extension(format.extension());

    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    println!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

async fn capture(
    session: &CaptureSession,
    config: &FleetcamConfig,
    count: u64,
    output: PathBuf,
    device: Option<String>,
) -> Result<()> {
    tokio::fs::create_dir_all(&output)
        .await
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let surface = Arc::new(MockSurface::new(config.capture.width, config.capture.height));
    let canvas = Arc::new(RasterCanvas::default());

    let stream = session
        .start_camera(&*surface, device.as_deref(), Some(&CaptureOptions::default()))
        .await?;
    info!("Camera stream {} bound", stream.id());

    let (written_tx, mut written_rx) = mpsc::unbounded_channel();
    let written = Arc::new(AtomicU64::new(0));
    let frames_dir = output.clone();

    let processor = FrameProcessorBuilder::new()
        .surface(surface.clone())
        .canvas(canvas)
        .config(&config.processor)
        .handler(move |sample: FrameSample| {
            let dir = frames_dir.clone();
            let written = Arc::clone(&written);
            let written_tx = written_tx.clone();
            async move {
                let index = written.fetch_add(1, Ordering::SeqCst) + 1;
                write_frame(&dir, index, &sample).await?;
                let _ = written_tx.send(index);
                Ok::<(), anyhow::Error>(())
            }
        })
        .build()?;

    loop {
        tokio::select! {
            index = written_rx.recv() => match index {
                Some(index) if index >= count => break,
                Some(_) => {}
                None => {
                    warn!("Frame writer closed unexpectedly");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping capture");
                break;
            }
        }
    }

    let session_state = Arc::clone(processor.session());
    processor.shutdown().await;
    let stats = session_state.stats();
    session.stop_camera(&*surface);

    println!(
        "Wrote {} frame(s) to {} ({} skipped, {} failed)",
        stats.frames_delivered,
        output.display(),
        stats.skipped_not_ready,
        stats.failed_cycles
    );
    Ok(())
}

async fn write_frame(dir: &std::path::Path, index: u64, sample: &FrameSample) -> anyhow::Result<()> {
    let bytes = sample.decode()?;
    let stem = format!("frame_{:05}", index);

    let sidecar = FrameSidecar {
        timestamp: &sample.timestamp,
        width: sample.width,
        height: sample.height,
        encoded_bytes: bytes.len(),
    };

    // Analysis frames are always JPEG
    let image_name = format!("{}.{}", stem, ImageFormat::Jpeg.extension());
    tokio::fs::write(dir.join(image_name), &bytes).await?;
    tokio::fs::write(
        dir.join(format!("{}.json", stem)),
        serde_json::to_vec_pretty(&sidecar)?,
    )
    .await?;

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fleetcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
