use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use facebridge_core::bridge::arguments::{ArgValue, ArgumentList};
use facebridge_core::bridge::context::BridgeContext;
use facebridge_core::bridge::function_table::{FunctionTable, ReturnValue};
use facebridge_core::detection::domain::detection_request::AccuracyMode;
use facebridge_core::detection::infrastructure::model_cache::ModelCache;
use facebridge_core::detection::infrastructure::onnx_detector_factory::OnnxDetectorFactory;
use facebridge_core::dispatch::event_sink::ChannelEventSink;
use facebridge_core::shared::config::{BridgeConfig, PayloadShape};
use facebridge_core::shared::constants::FACE_DETECTION_ERROR;
use facebridge_core::shared::pixel_buffer::{bgra_to_rgba, ChannelOrder, PixelBuffer};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Accuracy {
    Fast,
    Accurate,
}

impl From<Accuracy> for AccuracyMode {
    fn from(value: Accuracy) -> Self {
        match value {
            Accuracy::Fast => AccuracyMode::Fast,
            Accuracy::Accurate => AccuracyMode::Accurate,
        }
    }
}

/// Run the face detection bridge on an image file, acting as its host.
#[derive(Parser)]
#[command(name = "facebridge")]
struct Cli {
    /// Input image file.
    input: Option<PathBuf>,

    /// Detector accuracy mode.
    #[arg(long, value_enum, default_value = "fast")]
    accuracy: Accuracy,

    /// Request eye-open probabilities.
    #[arg(long)]
    open_eyes: bool,

    /// Request smiling probability.
    #[arg(long)]
    smile: bool,

    /// Only report the most prominent face.
    #[arg(long)]
    prominent_only: bool,

    /// Emit faces as a plain JSON array instead of the legacy string form.
    #[arg(long)]
    structured: bool,

    /// Bridge config file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait for the face model before detecting.
    #[arg(long, default_value = "120")]
    wait_for_model: u64,

    /// Correlation id attached to the result event.
    #[arg(long, default_value = "1")]
    callback_id: i32,

    /// Enable bridge diagnostic logging.
    #[arg(long)]
    verbose: bool,

    /// Print availability and readiness, then exit.
    #[arg(long)]
    status: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut config = BridgeConfig::load(cli.config.as_deref())?;
    if cli.structured {
        config.payload_shape = PayloadShape::Structured;
    }

    let models = ModelCache::new(&config);
    if cli.wait_for_model > 0 {
        if let Err(e) = models.wait(Duration::from_secs(cli.wait_for_model), &download_progress) {
            log::warn!("Face model not ready: {e}");
        }
        eprintln!();
    }

    let context = BridgeContext::with_factory(&config, Arc::new(OnnxDetectorFactory::new(models)));
    let (sink, events) = ChannelEventSink::new();
    context.set_event_sink(Arc::new(sink));
    let functions = FunctionTable::new();

    if cli.verbose {
        functions.call(
            &context,
            "setLogEnabled",
            ArgumentList::new(vec![ArgValue::Bool(true)]),
        )?;
    }

    if cli.status {
        print_status(&context, &functions)?;
        return Ok(());
    }

    let input = cli.input.as_deref().ok_or("Input image is required")?;
    let image = load_host_bitmap(input)?;
    let args = ArgumentList::new(vec![
        ArgValue::Bitmap(image),
        ArgValue::Int(cli.callback_id),
        ArgValue::Int(AccuracyMode::from(cli.accuracy).code()),
        ArgValue::Bool(cli.open_eyes),
        ArgValue::Bool(cli.smile),
        ArgValue::Bool(cli.prominent_only),
    ]);
    functions.call(&context, "detect", args)?;

    let event = events.recv()?;
    println!("{}", event.name);
    println!("{}", event.payload);
    if event.name == FACE_DETECTION_ERROR {
        return Err("face detection reported an error".into());
    }
    Ok(())
}

fn print_status(
    context: &BridgeContext,
    functions: &FunctionTable,
) -> Result<(), Box<dyn std::error::Error>> {
    for name in ["isAvailable", "isOperational"] {
        let value = match functions.call(context, name, ArgumentList::default())? {
            ReturnValue::Bool(value) => value,
            ReturnValue::Void => false,
        };
        println!("{name}: {value}");
    }
    Ok(())
}

/// Decode an image file into the BGRA layout host bitmaps use.
fn load_host_bitmap(path: &Path) -> Result<PixelBuffer, Box<dyn std::error::Error>> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    // Swapping R and B is its own inverse.
    let bgra = bgra_to_rgba(rgba.as_raw(), width, height)?;
    log::info!("Loaded {}x{} image from {}", width, height, path.display());
    Ok(PixelBuffer::new(bgra, width, height, ChannelOrder::Bgra)?)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.status {
        return Ok(());
    }
    match &cli.input {
        None => Err("Input image is required unless --status is used".into()),
        Some(input) if !input.exists() => {
            Err(format!("Input file not found: {}", input.display()).into())
        }
        Some(_) => Ok(()),
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
