use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    bounds::SceneBounds,
    compose::{CompositeResult, compose_sheet},
    driver::render_views,
    engine::{RenderEngine, Resolution},
    error::{ViewsheetError, ViewsheetResult},
    sheet::SheetLayout,
    views::{ViewMode, plan_views},
};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["glb", "gltf", "obj"];

/// One unit of work: a single model in, a single sheet out.
#[derive(Clone, Debug)]
pub struct ProcessRequest {
    pub model_path: PathBuf,
    pub output_path: PathBuf,
    /// Per-view render size handed to the engine.
    pub resolution: Resolution,
    pub mode: ViewMode,
    /// Keep the per-view renders instead of deleting them on success.
    pub keep_temp: bool,
}

impl ProcessRequest {
    pub fn validate(&self) -> ViewsheetResult<()> {
        self.resolution.validate()?;

        if !self.model_path.is_file() {
            return Err(ViewsheetError::input(format!(
                "model file '{}' does not exist",
                self.model_path.display()
            )));
        }

        let ext = self
            .model_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext) => Ok(()),
            Some(ext) => Err(ViewsheetError::input(format!(
                "unsupported model format '.{ext}' (expected .glb, .gltf or .obj)"
            ))),
            None => Err(ViewsheetError::input(format!(
                "model file '{}' has no extension",
                self.model_path.display()
            ))),
        }
    }
}

/// Run the whole pipeline for one model: load, normalize, plan, render
/// every view, composite, clean up.
///
/// The engine is owned exclusively for the duration of the call and its
/// scene is reset before returning, on success and failure alike. Fatal
/// errors (bad input, degenerate geometry, unwritable output) leave no
/// output file and no temp files; individual view failures degrade to
/// placeholder cells and are reported through the manifest.
#[tracing::instrument(skip(engine, request), fields(model = %request.model_path.display()))]
pub fn process(
    engine: &mut dyn RenderEngine,
    request: &ProcessRequest,
) -> ViewsheetResult<CompositeResult> {
    request.validate()?;

    let temp = tempfile::Builder::new()
        .prefix("viewsheet-")
        .tempdir()
        .context("create temp directory for view renders")?;

    let result = run_stages(engine, request, temp.path());

    // Scene state belongs to this call; clear it however the stages went.
    if let Err(e) = engine.reset() {
        tracing::warn!(error = %e, "engine reset failed");
    }

    let result = result?;
    if request.keep_temp {
        let kept = temp.keep();
        tracing::info!(path = %kept.display(), "keeping per-view renders");
    }
    Ok(result)
}

fn run_stages(
    engine: &mut dyn RenderEngine,
    request: &ProcessRequest,
    temp_dir: &Path,
) -> ViewsheetResult<CompositeResult> {
    let info = engine.load_model(&request.model_path).map_err(|e| match e {
        // A load rejection from the engine means the input is unusable.
        ViewsheetError::Engine(msg) => ViewsheetError::input(format!(
            "cannot load model '{}': {msg}",
            request.model_path.display()
        )),
        other => other,
    })?;

    if info.mesh_count == 0 {
        return Err(ViewsheetError::geometry("model contains no meshes"));
    }
    let bounds = SceneBounds::new(info.bounds_min, info.bounds_max)?;
    tracing::debug!(
        meshes = info.mesh_count,
        has_uv = info.has_uv,
        max_dim = bounds.max_dim(),
        "model loaded"
    );

    let specs = plan_views(&bounds, request.mode);
    engine.set_resolution(request.resolution)?;
    let views = render_views(engine, &specs, &info, temp_dir);

    let layout = SheetLayout::for_mode(request.mode);
    compose_sheet(&layout, &views, &request.output_path)
}
