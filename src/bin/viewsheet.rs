use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use walkdir::WalkDir;

use viewsheet::{
    BlenderConfig, BlenderEngine, CompositeResult, ProcessRequest, Resolution, SUPPORTED_EXTENSIONS,
    ViewMode, process,
};

#[derive(Parser, Debug)]
#[command(name = "viewsheet", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one model into a labeled contact sheet.
    Render(RenderArgs),
    /// Render every model under a directory, subdirectories included.
    Batch(BatchArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input model file (.glb, .gltf or .obj).
    model: PathBuf,

    /// Output image path. Defaults to `<model>_views.png` next to the model.
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Directory walked for model files.
    dir: PathBuf,

    /// Directory the sheets are written to. Defaults to the input directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Per-view render size in pixels (square).
    #[arg(long, default_value_t = 1000)]
    resolution: u32,

    /// Which view set to render.
    #[arg(long, value_enum, default_value_t = ModeChoice::Six)]
    mode: ModeChoice,

    /// Keep the per-view renders instead of deleting them.
    #[arg(long)]
    keep_temp: bool,

    /// Blender executable to invoke.
    #[arg(long, default_value = "blender")]
    blender: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Six,
    Eight,
}

impl From<ModeChoice> for ViewMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Six => ViewMode::Six,
            ModeChoice::Eight => ViewMode::Eight,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Batch(args) => cmd_batch(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path(&args.model));
    let request = build_request(args.model, out, &args.common);

    // Fail on bad arguments before paying for a Blender session.
    request.validate()?;

    let mut engine = BlenderEngine::new(blender_config(&args.common))?;
    let result = process(&mut engine, &request)?;
    report(&result);
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    let models = collect_models(&args.dir)?;
    if models.is_empty() {
        anyhow::bail!(
            "no model files (.glb, .gltf, .obj) found under '{}'",
            args.dir.display()
        );
    }

    let out_dir = args.out_dir.clone().unwrap_or_else(|| args.dir.clone());
    let mut engine = BlenderEngine::new(blender_config(&args.common))?;

    let mut ok = 0usize;
    let mut failed = 0usize;
    for model in models {
        let out = out_dir.join(default_output_name(&model));
        let request = build_request(model.clone(), out, &args.common);
        match process(&mut engine, &request) {
            Ok(result) => {
                ok += 1;
                report(&result);
            }
            Err(e) => {
                failed += 1;
                eprintln!("failed {}: {e}", model.display());
            }
        }
    }

    eprintln!("batch done: {ok} succeeded, {failed} failed");
    if ok == 0 {
        anyhow::bail!("no model rendered successfully");
    }
    Ok(())
}

fn build_request(model: PathBuf, out: PathBuf, common: &CommonArgs) -> ProcessRequest {
    ProcessRequest {
        model_path: model,
        output_path: out,
        resolution: Resolution::square(common.resolution),
        mode: common.mode.into(),
        keep_temp: common.keep_temp,
    }
}

fn blender_config(common: &CommonArgs) -> BlenderConfig {
    BlenderConfig {
        executable: common.blender.clone(),
        ..Default::default()
    }
}

fn collect_models(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut models = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("walk directory '{}'", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            models.push(path);
        }
    }
    models.sort();
    Ok(models)
}

fn default_output_name(model: &Path) -> PathBuf {
    let stem = model
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    PathBuf::from(format!("{stem}_views.png"))
}

fn default_output_path(model: &Path) -> PathBuf {
    model.with_file_name(default_output_name(model))
}

fn report(result: &CompositeResult) {
    let missing = result.manifest.missing();
    if missing.is_empty() {
        eprintln!(
            "wrote {} ({}x{})",
            result.output_path.display(),
            result.width,
            result.height
        );
    } else {
        let names: Vec<&str> = missing.iter().map(|n| n.as_str()).collect();
        eprintln!(
            "wrote {} ({}x{}), {} placeholder cell(s): {}",
            result.output_path.display(),
            result.width,
            result.height,
            missing.len(),
            names.join(", ")
        );
    }
}
