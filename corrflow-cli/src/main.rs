use clap::Parser;
use corrflow::export::{flow_magnitude, write_flow_image};
use corrflow::{
    Accelerator, AcceleratorConfig, CorrelationFlow, ElementKind, FrameBuffer, ParamRegistry,
};
use serde::Deserialize;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/settings.example.json"));

/// Flow vector length rendered fully saturated in the color preview.
const PREVIEW_SCALE: f32 = 3.0;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Single-image autocorrelation flow",
    after_help = "Positional forms:\n  corrflow <input> <width> <height> <output>\n  corrflow <input> <width> <height> <counter> <output>\nWithout positionals the settings file is used."
)]
struct Cli {
    /// Input file, dimensions, optional counter and output prefix.
    #[arg(value_name = "ARGS")]
    args: Vec<String>,
    /// Correlation window edge in pixels (overrides the settings file).
    #[arg(short, long)]
    window: Option<usize>,
    /// Path to the JSON settings file.
    #[arg(short, long, value_name = "FILE", default_value = "settings.json")]
    settings: PathBuf,
    /// Print an example settings file and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

/// Driver configuration, read from the settings file or built from
/// positional arguments.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings {
    input_path: String,
    file_name: String,
    width: usize,
    height: usize,
    window: usize,
    output_path: String,
    counter: String,
    verbose: bool,
    visualize: bool,
    pause_on_exit: bool,
    threads: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            file_name: "real_frame-128-100.raw".to_string(),
            width: 128,
            height: 100,
            window: 18,
            output_path: String::new(),
            counter: String::new(),
            verbose: false,
            visualize: true,
            pause_on_exit: false,
            threads: None,
        }
    }
}

impl Settings {
    fn input_file(&self) -> PathBuf {
        Path::new(&self.input_path).join(&self.file_name)
    }

    /// `{output_path}{counter}{stem}{suffix}`, matching the historical naming.
    fn output_file(&self, stem: &str, suffix: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}{}{stem}{suffix}",
            self.output_path, self.counter
        ))
    }
}

/// Why the driver stopped; maps to the process exit code.
#[derive(Debug)]
enum Failure {
    Accelerator(String),
    Input(String),
    Engine(String),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Accelerator(_) => 1,
            Failure::Input(_) => 2,
            Failure::Engine(_) => 3,
        }
    }

    fn message(&self) -> &str {
        match self {
            Failure::Accelerator(msg) | Failure::Input(msg) | Failure::Engine(msg) => msg,
        }
    }
}

enum Invocation {
    Run(Settings),
    Usage,
}

fn parse_dimension(name: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("{name} must be a non-negative integer, got {value:?}"))
}

fn settings_from_cli(cli: &Cli) -> Result<Invocation, String> {
    let mut settings = match cli.args.len() {
        0 => {
            let text = fs::read_to_string(&cli.settings)
                .map_err(|err| format!("{}: {err}", cli.settings.display()))?;
            serde_json::from_str::<Settings>(&text)
                .map_err(|err| format!("{}: {err}", cli.settings.display()))?
        }
        4 | 5 => {
            let args = &cli.args;
            let mut settings = Settings {
                file_name: args[0].clone(),
                width: parse_dimension("width", &args[1])?,
                height: parse_dimension("height", &args[2])?,
                output_path: args[args.len() - 1].clone(),
                ..Settings::default()
            };
            if args.len() == 5 {
                settings.counter = args[3].clone();
            }
            settings
        }
        _ => return Ok(Invocation::Usage),
    };
    if let Some(window) = cli.window {
        settings.window = window;
    }
    Ok(Invocation::Run(settings))
}

fn write_f32(frame: &FrameBuffer, path: &Path) -> Result<(), Failure> {
    frame
        .write_raw(path, ElementKind::F32)
        .map_err(|err| Failure::Engine(err.to_string()))?;
    tracing::info!(path = %path.display(), "wrote output");
    Ok(())
}

fn run(settings: &Settings) -> Result<(), Failure> {
    let accel = Accelerator::acquire(AcceleratorConfig {
        threads: settings.threads,
        ..AcceleratorConfig::default()
    })
    .map_err(|err| Failure::Accelerator(err.to_string()))?;
    tracing::info!(workers = accel.workers(), "accelerator ready");

    let input = settings.input_file();
    let mut image =
        FrameBuffer::read_raw(&input, settings.width, settings.height, ElementKind::F32)
            .map_err(|err| Failure::Input(err.to_string()))?;

    let engine_err = |err: corrflow::CorrFlowError| Failure::Engine(err.to_string());
    let window = settings.window;
    let extent = image.extent();
    let mut engine = CorrelationFlow::new(&accel);
    engine.initialize(extent, window).map_err(engine_err)?;

    let mut flow_x = FrameBuffer::with_extent(extent).map_err(engine_err)?;
    let mut flow_y = FrameBuffer::with_extent(extent).map_err(engine_err)?;
    let mut confidence = FrameBuffer::with_extent(extent).map_err(engine_err)?;
    let tile_extent = extent.scaled(window).map_err(engine_err)?;
    let mut surfaces = FrameBuffer::with_extent(tile_extent).map_err(engine_err)?;

    engine
        .compute_flow(
            &mut image,
            &mut flow_x,
            &mut flow_y,
            &mut confidence,
            &mut surfaces,
            &ParamRegistry::new(),
        )
        .map_err(engine_err)?;

    let frame_suffix = format!("-{}-{}.raw", extent.width, extent.height);
    let tile_suffix = format!("-{}-{}.raw", tile_extent.width, tile_extent.height);
    write_f32(&flow_x, &settings.output_file("corr-flow-x", &frame_suffix))?;
    write_f32(&flow_y, &settings.output_file("corr-flow-y", &frame_suffix))?;
    write_f32(&confidence, &settings.output_file("corr-coeff", &frame_suffix))?;
    write_f32(&surfaces, &settings.output_file("corr-temp", &tile_suffix))?;

    let magnitude = flow_magnitude(&flow_x, &flow_y).map_err(engine_err)?;
    write_f32(&magnitude, &settings.output_file("corr-amp", &frame_suffix))?;

    if settings.visualize {
        let preview = settings.output_file("corr-res", ".ppm");
        write_flow_image(&preview, &flow_x, &flow_y, PREVIEW_SCALE).map_err(engine_err)?;
        tracing::info!(path = %preview.display(), "wrote preview");
    }

    engine.destroy();
    Ok(())
}

fn wait_for_enter() {
    println!("Press enter to continue...");
    let mut line = String::new();
    // A closed stdin simply ends the wait.
    let _ = std::io::stdin().lock().read_line(&mut line);
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return ExitCode::SUCCESS;
    }

    let settings = match settings_from_cli(&cli) {
        Ok(Invocation::Run(settings)) => settings,
        Ok(Invocation::Usage) => {
            println!(
                "Usage: corrflow <input> <width> <height> [counter] <output>. \
                 Otherwise {} in the current directory is used",
                cli.settings.display()
            );
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(2);
        }
    };

    if cli.trace || settings.verbose {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("corrflow=info,corrflow_cli=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let outcome = run(&settings);
    if settings.pause_on_exit {
        wait_for_enter();
    }
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {}", failure.message());
            ExitCode::from(failure.exit_code())
        }
    }
}
