use glam::DVec3;

use crate::bounds::SceneBounds;

/// Camera distance from the bounds center, in multiples of the longest axis.
pub const CAMERA_DISTANCE_FACTOR: f64 = 2.0;
/// Orthographic scale in multiples of the longest axis. Leaves a margin so
/// the silhouette never touches the frame edge.
pub const ORTHO_SCALE_FACTOR: f64 = 1.2;
/// Isometric eye offset per axis, in multiples of the longest axis.
pub const ISO_OFFSET_FACTOR: f64 = 1.5;
/// Focal length for the perspective isometric shot.
pub const ISO_FOCAL_LENGTH_MM: f64 = 50.0;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ViewName {
    Front,
    Left,
    Back,
    Right,
    Top,
    Bottom,
    Isometric,
    Uv,
}

impl ViewName {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewName::Front => "front",
            ViewName::Left => "left",
            ViewName::Back => "back",
            ViewName::Right => "right",
            ViewName::Top => "top",
            ViewName::Bottom => "bottom",
            ViewName::Isometric => "isometric",
            ViewName::Uv => "uv",
        }
    }
}

impl std::fmt::Display for ViewName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Six,
    Eight,
}

const SIX_VIEW_ORDER: [ViewName; 6] = [
    ViewName::Front,
    ViewName::Left,
    ViewName::Back,
    ViewName::Right,
    ViewName::Top,
    ViewName::Bottom,
];

const EIGHT_VIEW_ORDER: [ViewName; 8] = [
    ViewName::Front,
    ViewName::Left,
    ViewName::Back,
    ViewName::Isometric,
    ViewName::Top,
    ViewName::Bottom,
    ViewName::Right,
    ViewName::Uv,
];

impl ViewMode {
    /// The fixed, ordered name set for this mode. Planning, rendering and
    /// the sheet layout all follow this order.
    pub fn view_order(self) -> &'static [ViewName] {
        match self {
            ViewMode::Six => &SIX_VIEW_ORDER,
            ViewMode::Eight => &EIGHT_VIEW_ORDER,
        }
    }
}

/// Camera basis for one named view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewAxes {
    /// Direction from the bounds center towards the eye (not necessarily
    /// unit length for the isometric entry).
    pub direction: DVec3,
    /// Up vector, chosen per view so roll is never ambiguous. Top and
    /// bottom look along the world Z axis and need an in-plane up.
    pub up: DVec3,
}

const CAMERA_AXES: [(ViewName, ViewAxes); 7] = [
    (
        ViewName::Front,
        ViewAxes {
            direction: DVec3::new(0.0, -1.0, 0.0),
            up: DVec3::new(0.0, 0.0, 1.0),
        },
    ),
    (
        ViewName::Left,
        ViewAxes {
            direction: DVec3::new(-1.0, 0.0, 0.0),
            up: DVec3::new(0.0, 0.0, 1.0),
        },
    ),
    (
        ViewName::Back,
        ViewAxes {
            direction: DVec3::new(0.0, 1.0, 0.0),
            up: DVec3::new(0.0, 0.0, 1.0),
        },
    ),
    (
        ViewName::Right,
        ViewAxes {
            direction: DVec3::new(1.0, 0.0, 0.0),
            up: DVec3::new(0.0, 0.0, 1.0),
        },
    ),
    (
        ViewName::Top,
        ViewAxes {
            direction: DVec3::new(0.0, 0.0, 1.0),
            up: DVec3::new(0.0, 1.0, 0.0),
        },
    ),
    (
        ViewName::Bottom,
        ViewAxes {
            direction: DVec3::new(0.0, 0.0, -1.0),
            up: DVec3::new(0.0, -1.0, 0.0),
        },
    ),
    (
        ViewName::Isometric,
        ViewAxes {
            direction: DVec3::new(1.0, -1.0, 1.0),
            up: DVec3::new(0.0, 0.0, 1.0),
        },
    ),
];

/// Camera basis for `name`, or `None` for the UV view (which is not a
/// camera shot).
pub fn camera_axes(name: ViewName) -> Option<ViewAxes> {
    CAMERA_AXES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, axes)| *axes)
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    Orthographic { scale: f64 },
    Perspective { focal_length_mm: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    /// Materials as imported.
    Shaded,
    /// Uniform gray override exposing bare geometry.
    Solid,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraView {
    pub name: ViewName,
    pub eye: DVec3,
    pub target: DVec3,
    pub up: DVec3,
    pub projection: Projection,
    pub style: RenderStyle,
}

/// One planned view. The UV view is a flat rasterization of the unwrap,
/// not a 3D camera shot, so it carries no camera parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewSpec {
    Camera3d(CameraView),
    UvFlat { name: ViewName },
}

impl ViewSpec {
    pub fn name(&self) -> ViewName {
        match self {
            ViewSpec::Camera3d(view) => view.name,
            ViewSpec::UvFlat { name } => *name,
        }
    }
}

/// Plan the ordered view sequence for `bounds`. Pure: equal bounds and mode
/// always produce the identical sequence.
pub fn plan_views(bounds: &SceneBounds, mode: ViewMode) -> Vec<ViewSpec> {
    let center = bounds.center();
    let max_dim = bounds.max_dim();
    mode.view_order()
        .iter()
        .filter_map(|&name| plan_one(name, center, max_dim))
        .collect()
}

fn plan_one(name: ViewName, center: DVec3, max_dim: f64) -> Option<ViewSpec> {
    if name == ViewName::Uv {
        return Some(ViewSpec::UvFlat { name });
    }

    let axes = camera_axes(name)?;
    let view = if name == ViewName::Isometric {
        CameraView {
            name,
            eye: center + axes.direction * (ISO_OFFSET_FACTOR * max_dim),
            target: center,
            up: axes.up,
            projection: Projection::Perspective {
                focal_length_mm: ISO_FOCAL_LENGTH_MM,
            },
            style: RenderStyle::Solid,
        }
    } else {
        CameraView {
            name,
            eye: center + axes.direction * (CAMERA_DISTANCE_FACTOR * max_dim),
            target: center,
            up: axes.up,
            projection: Projection::Orthographic {
                scale: ORTHO_SCALE_FACTOR * max_dim,
            },
            style: RenderStyle::Shaded,
        }
    };
    Some(ViewSpec::Camera3d(view))
}
