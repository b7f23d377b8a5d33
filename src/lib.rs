//! Viewsheet renders canonical views of 3D model files through a headless
//! Blender session and composites them into one labeled contact-sheet image.
//!
//! # Pipeline overview
//!
//! 1. **Load**: the engine session imports the model and reports bounds,
//!    mesh count and UV presence ([`RenderEngine::load_model`])
//! 2. **Plan**: [`plan_views`] maps bounds + mode to an ordered list of
//!    [`ViewSpec`]s from a fixed direction/up table
//! 3. **Render**: [`render_views`] drives the session one view at a time,
//!    isolating per-view failures into [`RenderedView`] outcomes
//! 4. **Compose**: [`compose_sheet`] arranges the images into a fixed
//!    labeled grid and writes a single output image
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic planning**: identical bounds and mode always yield
//!   identical view specs.
//! - **Grid stability**: sheet dimensions depend on the layout alone,
//!   never on which views actually rendered; missing views become labeled
//!   placeholder cells.
//! - **One stateful session**: the engine holds a single scene and camera,
//!   so render calls are strictly serialized and the orchestrator resets
//!   the scene before releasing the session.
#![forbid(unsafe_code)]

mod blender;
mod bounds;
mod compose;
mod driver;
mod engine;
mod error;
mod job;
mod label;
mod sheet;
mod views;

pub use glam::DVec3;

pub use blender::{BlenderConfig, BlenderEngine, REPLY_SENTINEL, is_blender_available};
pub use bounds::SceneBounds;
pub use compose::{CompositeResult, ManifestEntry, SheetManifest, compose_sheet};
pub use driver::{RenderedView, ViewOutcome, render_views};
pub use engine::{ModelInfo, RenderEngine, Resolution};
pub use error::{ViewsheetError, ViewsheetResult};
pub use job::{ProcessRequest, SUPPORTED_EXTENSIONS, process};
pub use label::rasterize_label;
pub use sheet::{CELL_HEIGHT, CELL_WIDTH, SheetLayout, SheetSlot, chinese_label};
pub use views::{
    CAMERA_DISTANCE_FACTOR, CameraView, ISO_FOCAL_LENGTH_MM, ISO_OFFSET_FACTOR, ORTHO_SCALE_FACTOR,
    Projection, RenderStyle, ViewAxes, ViewMode, ViewName, ViewSpec, camera_axes, plan_views,
};
