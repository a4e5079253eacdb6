use anyhow::{anyhow, bail, Context, Result};
use camera2_session::session::format;
use camera2_session::session::{
    ChannelEvents, SessionNotification, SessionRequest, StillCaptureOptions,
};
use camera2_session::testing::{FakeBackend, FakeBehavior};
use camera2_session::{init_logging, CameraCapabilities, CameraSessionConfig, CameraThread};
use std::env;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "Usage:
  camera2-session-cli negotiate <caps.json> <width> <height> <fps> [--json]
  camera2-session-cli simulate [--frames <n>] [--flash] [--still] [--config <path>]";

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };

    match command.as_str() {
        "negotiate" => cmd_negotiate(&args[2..]),
        "simulate" => cmd_simulate(&args[2..]),
        _ => {
            eprintln!("Unknown command: {}\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn cmd_negotiate(args: &[String]) -> Result<()> {
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    if positional.len() != 4 {
        bail!("negotiate needs <caps.json> <width> <height> <fps>\n{}", USAGE);
    }

    let contents = fs::read_to_string(positional[0])
        .with_context(|| format!("reading {}", positional[0]))?;
    let capabilities: CameraCapabilities =
        serde_json::from_str(&contents).context("parsing capabilities")?;
    let width: u32 = positional[1].parse().context("width")?;
    let height: u32 = positional[2].parse().context("height")?;
    let fps: u32 = positional[3].parse().context("fps")?;

    let negotiated = format::negotiate(&capabilities, width, height, fps)?;
    let factor = format::fps_unit_factor(&capabilities.fps_ranges);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "format": negotiated,
                "fps_unit_factor": factor,
            })
        );
    } else {
        println!("Requested: {}x{}@{}", width, height, fps);
        println!("Negotiated: {}", negotiated);
        println!("Native fps unit factor: {}", factor);
    }
    Ok(())
}

struct SimulateArgs {
    frames: u64,
    flash: bool,
    still: bool,
    config: Option<String>,
}

fn parse_simulate_args(args: &[String]) -> Result<SimulateArgs> {
    let mut parsed = SimulateArgs {
        frames: 30,
        flash: false,
        still: false,
        config: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--frames needs a value"))?;
                parsed.frames = value.parse().context("--frames")?;
            }
            "--config" => {
                i += 1;
                parsed.config = Some(
                    args.get(i)
                        .ok_or_else(|| anyhow!("--config needs a path"))?
                        .clone(),
                );
            }
            "--flash" => parsed.flash = true,
            "--still" => parsed.still = true,
            other => bail!("Unknown option: {}\n{}", other, USAGE),
        }
        i += 1;
    }
    Ok(parsed)
}

fn print_notification(notification: &SessionNotification) {
    match notification {
        SessionNotification::Opening => println!("event: opening"),
        SessionNotification::Error(id, message) => println!("event: error [{}] {}", id, message),
        SessionNotification::Disconnected(id) => println!("event: disconnected [{}]", id),
        SessionNotification::Closed(id) => println!("event: closed [{}]", id),
        SessionNotification::Frame(_, frame) => println!(
            "frame: t={}ns rotation={} {}x{}",
            frame.timestamp_ns, frame.rotation, frame.buffer.width, frame.buffer.height
        ),
    }
}

fn cmd_simulate(args: &[String]) -> Result<()> {
    let args = parse_simulate_args(args)?;
    let config = match &args.config {
        Some(path) => CameraSessionConfig::load_from_file(path)?,
        None => CameraSessionConfig::load_or_default(),
    };
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(simulate(args, config))
}

async fn simulate(args: SimulateArgs, config: CameraSessionConfig) -> Result<()> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let backend = FakeBackend::new(FakeBehavior::default());
    let thread = CameraThread::spawn(&config.thread.name, backend.manager())?;
    let (tx, rx) = crossbeam_channel::unbounded();

    let request = SessionRequest::new(
        "0",
        config.capture.width,
        config.capture.height,
        config.capture.fps,
    );
    let session = thread
        .open_session(
            request,
            config.session_options(),
            backend.texture_helper(),
            Arc::new(ChannelEvents::new(tx)),
        )
        .await?;
    println!("Session {} running", session.id());

    if args.flash {
        let outcome = session.set_flash(true).await?;
        println!("Flash: {:?}", outcome);
    }
    if args.still {
        let image = session.capture_still(StillCaptureOptions::default()).await?;
        println!(
            "Still: {}x{} orientation={} {} bytes",
            image.width,
            image.height,
            image.orientation,
            image.data.len()
        );
    }

    let interval = Duration::from_millis(1000 / u64::from(config.capture.fps.max(1)));
    for frame_number in 0..args.frames {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        backend.emit_frame(frame_number);
        tokio::time::sleep(interval).await;
        for notification in rx.try_iter() {
            print_notification(&notification);
        }
    }

    let stats = session.stop().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    for notification in rx.try_iter() {
        print_notification(&notification);
    }
    if let Some(stats) = stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
