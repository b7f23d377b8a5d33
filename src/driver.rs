use std::path::{Path, PathBuf};

use crate::{
    engine::{ModelInfo, RenderEngine},
    views::{ViewName, ViewSpec},
};

/// What became of one planned view.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewOutcome {
    Rendered {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        message: String,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderedView {
    pub name: ViewName,
    pub outcome: ViewOutcome,
}

impl RenderedView {
    pub fn is_rendered(&self) -> bool {
        matches!(self.outcome, ViewOutcome::Rendered { .. })
    }
}

/// Render every planned view through the engine, one at a time.
///
/// The session is stateful so calls are strictly sequential. A view whose
/// render fails is recorded and skipped over; the remaining views still
/// run. The returned list always has one entry per spec, in spec order.
pub fn render_views(
    engine: &mut dyn RenderEngine,
    specs: &[ViewSpec],
    model: &ModelInfo,
    temp_dir: &Path,
) -> Vec<RenderedView> {
    specs
        .iter()
        .map(|spec| render_one(engine, spec, model, temp_dir))
        .collect()
}

fn render_one(
    engine: &mut dyn RenderEngine,
    spec: &ViewSpec,
    model: &ModelInfo,
    temp_dir: &Path,
) -> RenderedView {
    let name = spec.name();

    if matches!(spec, ViewSpec::UvFlat { .. }) && !model.has_uv {
        tracing::debug!(view = %name, "model has no UV coordinates, skipping view");
        return RenderedView {
            name,
            outcome: ViewOutcome::Unavailable {
                reason: "model has no UV coordinates".to_string(),
            },
        };
    }

    let out_path = temp_dir.join(format!("{name}.png"));
    if let Err(e) = engine.render_view(spec, &out_path) {
        tracing::warn!(view = %name, error = %e, "view render failed");
        return RenderedView {
            name,
            outcome: ViewOutcome::Failed {
                message: e.to_string(),
            },
        };
    }

    // The engine claims success; trust the file only once it decodes.
    match image::image_dimensions(&out_path) {
        Ok((width, height)) => {
            tracing::debug!(view = %name, width, height, "view rendered");
            RenderedView {
                name,
                outcome: ViewOutcome::Rendered {
                    path: out_path,
                    width,
                    height,
                },
            }
        }
        Err(e) => {
            tracing::warn!(view = %name, error = %e, "render output unreadable");
            RenderedView {
                name,
                outcome: ViewOutcome::Failed {
                    message: format!("render output unreadable: {e}"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::{
        bounds::SceneBounds,
        engine::Resolution,
        error::{ViewsheetError, ViewsheetResult},
        views::{ViewMode, plan_views},
    };

    /// Engine double that renders solid PNGs and fails on request.
    struct ScriptedEngine {
        fail_views: Vec<ViewName>,
        rendered: Vec<ViewName>,
    }

    impl ScriptedEngine {
        fn new(fail_views: Vec<ViewName>) -> Self {
            Self {
                fail_views,
                rendered: Vec::new(),
            }
        }
    }

    impl RenderEngine for ScriptedEngine {
        fn load_model(&mut self, _path: &Path) -> ViewsheetResult<ModelInfo> {
            Ok(test_model(true))
        }

        fn set_resolution(&mut self, _resolution: Resolution) -> ViewsheetResult<()> {
            Ok(())
        }

        fn render_view(&mut self, spec: &ViewSpec, out_path: &Path) -> ViewsheetResult<()> {
            let name = spec.name();
            if self.fail_views.contains(&name) {
                return Err(ViewsheetError::view_render(name.as_str(), "scripted failure"));
            }
            write_test_png(out_path, 16, 12);
            self.rendered.push(name);
            Ok(())
        }

        fn reset(&mut self) -> ViewsheetResult<()> {
            Ok(())
        }
    }

    fn test_model(has_uv: bool) -> ModelInfo {
        ModelInfo {
            bounds_min: DVec3::splat(-1.0),
            bounds_max: DVec3::splat(1.0),
            mesh_count: 1,
            has_uv,
        }
    }

    fn write_test_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
        img.save(path).unwrap();
    }

    fn test_specs(mode: ViewMode) -> Vec<ViewSpec> {
        let bounds = SceneBounds::new(DVec3::splat(-1.0), DVec3::splat(1.0)).unwrap();
        plan_views(&bounds, mode)
    }

    #[test]
    fn all_views_render_and_report_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new(vec![]);
        let specs = test_specs(ViewMode::Six);

        let views = render_views(&mut engine, &specs, &test_model(true), dir.path());
        assert_eq!(views.len(), 6);
        for view in &views {
            let ViewOutcome::Rendered { width, height, path } = &view.outcome else {
                panic!("expected rendered outcome for {}", view.name);
            };
            assert_eq!((*width, *height), (16, 12));
            assert!(path.exists());
        }
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new(vec![ViewName::Back]);
        let specs = test_specs(ViewMode::Six);

        let views = render_views(&mut engine, &specs, &test_model(true), dir.path());
        assert_eq!(views.len(), 6);
        assert_eq!(views.iter().filter(|v| v.is_rendered()).count(), 5);

        let back = views.iter().find(|v| v.name == ViewName::Back).unwrap();
        assert!(matches!(&back.outcome, ViewOutcome::Failed { message } if message.contains("scripted failure")));
        // Views after the failed one still rendered.
        assert!(engine.rendered.contains(&ViewName::Bottom));
    }

    #[test]
    fn uv_view_without_uv_data_is_unavailable_and_never_hits_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new(vec![]);
        let specs = test_specs(ViewMode::Eight);

        let views = render_views(&mut engine, &specs, &test_model(false), dir.path());
        assert_eq!(views.len(), 8);

        let uv = views.iter().find(|v| v.name == ViewName::Uv).unwrap();
        assert!(matches!(uv.outcome, ViewOutcome::Unavailable { .. }));
        assert!(!engine.rendered.contains(&ViewName::Uv));
    }

    #[test]
    fn unreadable_output_is_a_failure() {
        struct LyingEngine;
        impl RenderEngine for LyingEngine {
            fn load_model(&mut self, _path: &Path) -> ViewsheetResult<ModelInfo> {
                Ok(test_model(true))
            }
            fn set_resolution(&mut self, _resolution: Resolution) -> ViewsheetResult<()> {
                Ok(())
            }
            fn render_view(&mut self, _spec: &ViewSpec, _out_path: &Path) -> ViewsheetResult<()> {
                // Claims success without writing anything.
                Ok(())
            }
            fn reset(&mut self) -> ViewsheetResult<()> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let specs = test_specs(ViewMode::Six);
        let views = render_views(&mut LyingEngine, &specs, &test_model(true), dir.path());
        assert!(
            views
                .iter()
                .all(|v| matches!(&v.outcome, ViewOutcome::Failed { message } if message.contains("unreadable")))
        );
    }
}
