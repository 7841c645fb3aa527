//! `camcal`: chessboard camera calibration from the command line.

use camcal::detect::{default_chess_config, ChessCornersDetector};
use camcal::source::ImageSequenceSource;
use camcal::{
    calibrate_frames, read_calibration, BoardGeometry, CalibrationResult, CamcalConfig,
    CamcalError, ZhangCalibrationEngine,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "camcal")]
#[command(about = "Calibrate a camera from views of a printed chessboard")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inner corners of the board as WIDTHxHEIGHT (e.g. 9x6).
    #[arg(long, global = true)]
    board: Option<BoardGeometry>,

    /// Distance between adjacent corners.
    #[arg(long, global = true)]
    spacing: Option<f64>,

    /// Calibrate only with strictly more samples than this.
    #[arg(long, global = true)]
    min_samples: Option<usize>,

    /// Calibration file to write.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive capture: SPACE samples, ENTER calibrates, ESC quits.
    #[cfg(feature = "opencv")]
    Live {
        /// Camera device index.
        #[arg(long)]
        camera: Option<i32>,

        /// Frame rate used to pace key polling; defaults to the camera's.
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Calibrate from every image in a directory.
    Batch {
        /// Directory with png/jpg/jpeg/bmp images.
        dir: PathBuf,
    },

    /// Write 4x4 ArUco marker images.
    #[cfg(feature = "opencv")]
    Markers {
        #[arg(long, default_value = ".")]
        out: PathBuf,

        #[arg(long, default_value_t = 50)]
        count: i32,

        /// Marker side in pixels.
        #[arg(long, default_value_t = 500)]
        size: i32,
    },

    /// Print a calibration file.
    Show { file: PathBuf },
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        #[cfg(feature = "opencv")]
        Commands::Live { camera, fps } => run_live(load_config(&cli.global)?, camera, fps),
        Commands::Batch { dir } => run_batch(load_config(&cli.global)?, &dir),
        #[cfg(feature = "opencv")]
        Commands::Markers { out, count, size } => run_markers(&out, count, size),
        Commands::Show { file } => run_show(&file),
    }
}

fn init_logging(global: &GlobalArgs) {
    let level = match (global.quiet, global.verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };

    #[cfg(feature = "tracing")]
    camcal::core::init_tracing(false, level);

    #[cfg(not(feature = "tracing"))]
    let _ = camcal::core::init_with_level(level);
}

fn load_config(global: &GlobalArgs) -> Result<CamcalConfig, CamcalError> {
    let mut config = match &global.config {
        Some(path) => CamcalConfig::load_json(path)?,
        None => CamcalConfig::default(),
    };

    let board = &mut config.session.board;
    if let Some(size) = global.board {
        board.width = size.width;
        board.height = size.height;
    }
    if let Some(spacing) = global.spacing {
        board.spacing = spacing;
    }
    if let Some(n) = global.min_samples {
        config.session.min_samples = n;
    }
    if let Some(path) = &global.output {
        config.session.output_path = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run_batch(config: CamcalConfig, dir: &Path) -> CliResult<()> {
    let mut source = ImageSequenceSource::from_dir(dir)?;
    let mut detector = ChessCornersDetector::new(default_chess_config(), config.chessboard);
    let mut engine = ZhangCalibrationEngine::new(config.solver);

    let report = calibrate_frames(&mut source, &mut detector, &mut engine, &config.session)?;
    println!(
        "board found in {} of {} images; calibration written to {}",
        report.samples,
        report.frames,
        config.session.output_path.display()
    );
    print_calibration(&report.result);
    Ok(())
}

#[cfg(feature = "opencv")]
fn run_live(mut config: CamcalConfig, camera: Option<i32>, fps: Option<f64>) -> CliResult<()> {
    use camcal::opencv_backend::{CameraSource, HighGuiDisplay};
    use camcal::Session;

    if let Some(index) = camera {
        config.camera_index = index;
    }
    let mut source = CameraSource::open(config.camera_index)?;
    config.session.fps = fps.or(source.fps()).unwrap_or(config.session.fps);

    let mut detector = ChessCornersDetector::new(default_chess_config(), config.chessboard);
    let mut engine = ZhangCalibrationEngine::new(config.solver);
    let mut display = HighGuiDisplay::new(&config.window_title, config.session.board)?;

    println!("SPACE: capture sample, ENTER: calibrate, ESC: quit");
    let summary =
        Session::new(config.session).run(&mut source, &mut detector, &mut engine, &mut display)?;

    println!(
        "{} samples captured, {} calibrations written, {} failures",
        summary.samples, summary.calibrations_written, summary.failures
    );
    if let Some(result) = &summary.last_result {
        print_calibration(result);
    }
    Ok(())
}

#[cfg(feature = "opencv")]
fn run_markers(out: &Path, count: i32, size: i32) -> CliResult<()> {
    let written = camcal::opencv_backend::generate_aruco_markers(out, count, size)?;
    println!("{} markers written to {}", written.len(), out.display());
    Ok(())
}

fn run_show(file: &Path) -> CliResult<()> {
    let result = read_calibration(file)?;
    print_calibration(&result);
    Ok(())
}

fn print_calibration(result: &CalibrationResult) {
    println!("camera matrix:");
    for r in 0..3 {
        let row = result.camera_matrix.row(r);
        println!("  {} {} {}", row[0], row[1], row[2]);
    }
    println!("distortion (k1 k2 p1 p2 k3 k4 k5 k6):");
    let values: Vec<String> = result.distortion.iter().map(|v| v.to_string()).collect();
    println!("  {}", values.join(" "));
    if let Some(rms) = result.rms {
        println!("rms reprojection error: {rms:.4} px");
    }
}
