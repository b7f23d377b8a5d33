use std::{
    io::{BufRead, BufReader, Read as _, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use anyhow::Context as _;
use glam::DVec3;

use crate::{
    engine::{ModelInfo, RenderEngine, Resolution},
    error::{ViewsheetError, ViewsheetResult},
    views::{CameraView, Projection, RenderStyle, ViewSpec},
};

/// Prefix the bridge puts on every protocol reply line. Blender writes its
/// own progress chatter to the same stdout; the reader drops anything that
/// does not carry this prefix.
pub const REPLY_SENTINEL: &str = "@viewsheet ";

const BRIDGE_SOURCE: &str = include_str!("blender_bridge.py");

#[derive(Clone, Debug)]
pub struct BlenderConfig {
    /// Blender executable to invoke. Defaults to `blender` on PATH.
    pub executable: PathBuf,
    /// Cycles sample count per render.
    pub render_samples: u32,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("blender"),
            render_samples: 64,
        }
    }
}

pub fn is_blender_available(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// One headless Blender child process driven over the line protocol.
///
/// The session is stateful: `load_model` replaces the scene, and camera,
/// style and resolution settings persist until the next command changes
/// them. Dropping the session asks the bridge to quit and reaps the child.
pub struct BlenderEngine {
    cfg: BlenderConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    // Keeps the bridge script on disk for the lifetime of the child.
    _bridge: tempfile::NamedTempFile,
}

impl BlenderEngine {
    pub fn new(cfg: BlenderConfig) -> ViewsheetResult<Self> {
        if !is_blender_available(&cfg.executable) {
            return Err(ViewsheetError::engine(format!(
                "'{}' did not answer --version (is Blender installed and on PATH?)",
                cfg.executable.display()
            )));
        }

        let bridge = write_bridge_script()?;

        let mut cmd = Command::new(&cfg.executable);
        cmd.arg("--background")
            .arg("--factory-startup")
            .arg("--python")
            .arg(bridge.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| ViewsheetError::engine(format!("failed to spawn blender: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ViewsheetError::engine("failed to open blender stdin (unexpected)"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ViewsheetError::engine("failed to open blender stdout (unexpected)"))?;

        tracing::debug!(executable = %cfg.executable.display(), "blender session started");

        Ok(Self {
            cfg,
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            _bridge: bridge,
        })
    }

    fn send(&mut self, cmd: &WireCommand<'_>) -> ViewsheetResult<serde_json::Value> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ViewsheetError::engine("blender session is already closed"));
        };

        let mut line = serde_json::to_string(cmd)
            .map_err(|e| ViewsheetError::engine(format!("failed to encode command: {e}")))?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .map_err(|e| ViewsheetError::engine(format!("failed to write to blender: {e}")))?;
        stdin
            .flush()
            .map_err(|e| ViewsheetError::engine(format!("failed to flush blender stdin: {e}")))?;

        let reply = read_reply(&mut self.stdout)?;
        if !reply.ok {
            return Err(ViewsheetError::engine(reply.error.unwrap_or_else(|| {
                "blender reported an unspecified failure".to_string()
            })));
        }
        Ok(reply.data.unwrap_or(serde_json::Value::Null))
    }
}

impl RenderEngine for BlenderEngine {
    fn load_model(&mut self, path: &Path) -> ViewsheetResult<ModelInfo> {
        let path_str = utf8_path(path)?;
        let samples = self.cfg.render_samples;
        let data = self.send(&WireCommand::Load {
            path: path_str,
            samples,
        })?;

        let info: WireSceneInfo = serde_json::from_value(data)
            .map_err(|e| ViewsheetError::engine(format!("malformed scene info: {e}")))?;
        Ok(ModelInfo {
            bounds_min: DVec3::from_array(info.bounds_min),
            bounds_max: DVec3::from_array(info.bounds_max),
            mesh_count: info.mesh_count,
            has_uv: info.has_uv,
        })
    }

    fn set_resolution(&mut self, resolution: Resolution) -> ViewsheetResult<()> {
        resolution.validate()?;
        self.send(&WireCommand::SetResolution {
            width: resolution.width,
            height: resolution.height,
        })?;
        Ok(())
    }

    fn render_view(&mut self, spec: &ViewSpec, out_path: &Path) -> ViewsheetResult<()> {
        let out = utf8_path(out_path)?;
        match spec {
            ViewSpec::Camera3d(view) => {
                self.send(&WireCommand::Render {
                    camera: WireCamera::from_view(view),
                    out_path: out,
                })?;
            }
            ViewSpec::UvFlat { .. } => {
                self.send(&WireCommand::ExportUv { out_path: out })?;
            }
        }
        Ok(())
    }

    fn reset(&mut self) -> ViewsheetResult<()> {
        self.send(&WireCommand::Reset)?;
        Ok(())
    }
}

impl Drop for BlenderEngine {
    fn drop(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.write_all(b"{\"op\":\"quit\"}\n");
            let _ = stdin.flush();
        }
        // Drain stdout so the child never blocks on a full pipe while
        // shutting down, then reap it.
        let mut sink = Vec::new();
        let _ = self.stdout.read_to_end(&mut sink);
        match self.child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(%status, "blender session exited with failure status");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to reap blender session"),
        }
    }
}

fn write_bridge_script() -> ViewsheetResult<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("viewsheet-bridge-")
        .suffix(".py")
        .tempfile()
        .context("create bridge script file")?;
    file.write_all(BRIDGE_SOURCE.as_bytes())
        .context("write bridge script")?;
    file.flush().context("flush bridge script")?;
    Ok(file)
}

fn utf8_path(path: &Path) -> ViewsheetResult<&str> {
    path.to_str().ok_or_else(|| {
        ViewsheetError::engine(format!("path '{}' is not valid UTF-8", path.display()))
    })
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WireCommand<'a> {
    Load { path: &'a str, samples: u32 },
    SetResolution { width: u32, height: u32 },
    Render { camera: WireCamera, out_path: &'a str },
    ExportUv { out_path: &'a str },
    Reset,
}

#[derive(Debug, serde::Serialize)]
struct WireCamera {
    eye: [f64; 3],
    target: [f64; 3],
    up: [f64; 3],
    projection: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ortho_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    focal_length_mm: Option<f64>,
    style: &'static str,
}

impl WireCamera {
    fn from_view(view: &CameraView) -> Self {
        let (projection, ortho_scale, focal_length_mm) = match view.projection {
            Projection::Orthographic { scale } => ("orthographic", Some(scale), None),
            Projection::Perspective { focal_length_mm } => {
                ("perspective", None, Some(focal_length_mm))
            }
        };
        Self {
            eye: view.eye.to_array(),
            target: view.target.to_array(),
            up: view.up.to_array(),
            projection,
            ortho_scale,
            focal_length_mm,
            style: match view.style {
                RenderStyle::Shaded => "shaded",
                RenderStyle::Solid => "solid",
            },
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct WireReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct WireSceneInfo {
    bounds_min: [f64; 3],
    bounds_max: [f64; 3],
    mesh_count: u32,
    has_uv: bool,
}

fn read_reply(reader: &mut impl BufRead) -> ViewsheetResult<WireReply> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| ViewsheetError::engine(format!("failed to read from blender: {e}")))?;
        if n == 0 {
            return Err(ViewsheetError::engine(
                "blender session ended before replying",
            ));
        }
        let Some(payload) = line.trim_end().strip_prefix(REPLY_SENTINEL) else {
            continue;
        };
        return serde_json::from_str(payload)
            .map_err(|e| ViewsheetError::engine(format!("malformed reply from blender: {e}")));
    }
}
