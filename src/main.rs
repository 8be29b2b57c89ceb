//! Veriface command line front end.
//!
//! Three ways in:
//! - `veriface IMAGE` scans one image and prints the JSON response.
//! - `veriface --batch DIR --output report.csv` scans a directory tree
//!   and writes a JSON or CSV report.
//! - `veriface --serve` answers line-delimited JSON scan requests on
//!   stdin, one response per line on stdout.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use veriface::api::{decode_image, ScanRequest, ScanResponse};
use veriface::export::{export_report, ImageReport, ReportFormat};
use veriface::{Config, InferenceContext, PredictionPipeline};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];

enum Mode {
    Scan(PathBuf),
    Batch { dir: PathBuf, output: PathBuf },
    Serve,
}

struct CliOptions {
    config_path: Option<PathBuf>,
    mode: Mode,
}

fn main() -> Result<()> {
    let options = parse_args();

    veriface::logging::init(None)?;

    let config = load_config(&options)?;
    info!("Config loaded");

    let context = InferenceContext::load(&config).context("Failed to load models")?;
    info!("Models loaded");

    let pipeline = PredictionPipeline::from_context(&context, &config);

    match options.mode {
        Mode::Scan(path) => scan_one(&pipeline, &path),
        Mode::Batch { dir, output } => run_batch(&pipeline, &dir, &output),
        Mode::Serve => run_serve(&pipeline),
    }
}

fn parse_args() -> CliOptions {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut batch_dir: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut serve = false;
    let mut image: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--serve" | "-s" => {
                serve = true;
            }
            "--batch" | "-b" => {
                if i + 1 < args.len() {
                    batch_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --batch requires a directory argument");
                    std::process::exit(1);
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    output = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --output requires a path argument");
                    std::process::exit(1);
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("veriface {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                image = Some(PathBuf::from(arg));
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mode = if serve {
        Mode::Serve
    } else if let Some(dir) = batch_dir {
        let output = output.unwrap_or_else(|| PathBuf::from("veriface-report.json"));
        Mode::Batch { dir, output }
    } else if let Some(path) = image {
        Mode::Scan(path)
    } else {
        eprintln!("Error: no image, --batch directory or --serve given");
        print_help();
        std::process::exit(1);
    };

    CliOptions { config_path, mode }
}

fn print_help() {
    println!(
        r#"veriface - deepfake detection scanner

USAGE:
    veriface [OPTIONS] IMAGE
    veriface [OPTIONS] --batch DIR [--output PATH]
    veriface [OPTIONS] --serve

OPTIONS:
    --batch, -b DIR     Scan every image under DIR
    --output, -o PATH   Batch report path; .json or .csv decides the
                        format (default: veriface-report.json)
    --serve, -s         Answer JSON scan requests line-by-line on stdin
    --config, -c PATH   Path to config file
    --help, -h          Show this help message
    --version, -V       Print version

ENVIRONMENT:
    VERIFACE_CONFIG     Path to config file (overrides default location)
    VERIFACE_LOG        Log level (trace, debug, info, warn, error)
"#
    );
}

fn load_config(options: &CliOptions) -> Result<Config> {
    if let Some(path) = &options.config_path {
        return Config::load_from(path.clone());
    }
    if let Ok(path) = std::env::var("VERIFACE_CONFIG") {
        return Config::load_from(PathBuf::from(path));
    }
    Config::load()
}

fn scan_one(pipeline: &PredictionPipeline, path: &Path) -> Result<()> {
    let response = scan_file(pipeline, path)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn scan_file(pipeline: &PredictionPipeline, path: &Path) -> Result<ScanResponse> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let image = decode_image(&bytes).with_context(|| format!("Failed to decode {:?}", path))?;
    let result = pipeline.predict(&image)?;

    let uuid = path.to_string_lossy().to_string();
    Ok(ScanResponse::from_result(&uuid, &result))
}

fn run_batch(pipeline: &PredictionPipeline, dir: &Path, output: &Path) -> Result<()> {
    let format = output
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ReportFormat::from_extension)
        .unwrap_or(ReportFormat::Json);

    let mut reports = Vec::new();
    let mut failed = 0usize;

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        match scan_file(pipeline, path) {
            Ok(response) => {
                info!(path = %path.display(), faces = response.face_num, "Scanned");
                reports.push(ImageReport {
                    path: path.to_string_lossy().to_string(),
                    face_num: response.face_num,
                    faces: response.faces,
                });
            }
            Err(e) => {
                warn!(path = %path.display(), "Scan failed: {e:#}");
                failed += 1;
            }
        }
    }

    export_report(&reports, output, format)?;

    let total_faces: usize = reports.iter().map(|r| r.face_num).sum();
    info!(
        images = reports.len(),
        faces = total_faces,
        failed,
        report = %output.display(),
        "Batch scan complete"
    );
    println!(
        "Scanned {} image(s), {} face(s), {} failure(s); report written to {}",
        reports.len(),
        total_faces,
        failed,
        output.display()
    );

    Ok(())
}

/// One JSON request per stdin line, one JSON response per stdout line.
/// A bad request answers with an error object and keeps the loop alive.
fn run_serve(pipeline: &PredictionPipeline) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    info!("Serving scan requests on stdin");

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match handle_request(pipeline, &line) {
            Ok(response) => serde_json::to_string(&response)?,
            Err((uuid, message)) => {
                warn!(uuid = uuid.as_deref().unwrap_or("-"), "Request failed: {message}");
                serde_json::to_string(&serde_json::json!({
                    "uuid": uuid,
                    "error": message,
                }))?
            }
        };

        let mut out = stdout.lock();
        out.write_all(reply.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

fn handle_request(
    pipeline: &PredictionPipeline,
    line: &str,
) -> std::result::Result<ScanResponse, (Option<String>, String)> {
    let request: ScanRequest =
        serde_json::from_str(line).map_err(|e| (None, format!("malformed request: {e}")))?;

    let image = request
        .decode_image()
        .map_err(|e| (Some(request.uuid.clone()), e.to_string()))?;

    let result = pipeline
        .predict(&image)
        .map_err(|e| (Some(request.uuid.clone()), e.to_string()))?;

    Ok(ScanResponse::from_result(&request.uuid, &result))
}
