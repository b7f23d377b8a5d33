use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use kurbo::{Affine, Rect};

use crate::{
    driver::{RenderedView, ViewOutcome},
    error::{ViewsheetError, ViewsheetResult},
    label::rasterize_label,
    sheet::SheetLayout,
    views::ViewName,
};

/// Per-view record of what the finished sheet actually contains.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ManifestEntry {
    pub name: ViewName,
    pub label: String,
    pub rendered: bool,
    /// Failure message or unavailability reason for placeholder cells.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SheetManifest {
    pub entries: Vec<ManifestEntry>,
}

impl SheetManifest {
    pub fn rendered_count(&self) -> usize {
        self.entries.iter().filter(|e| e.rendered).count()
    }

    pub fn missing(&self) -> Vec<ViewName> {
        self.entries
            .iter()
            .filter(|e| !e.rendered)
            .map(|e| e.name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.rendered)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompositeResult {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub manifest: SheetManifest,
}

/// Assemble the rendered views into one sheet image at `output_path`.
///
/// The sheet dimensions come from the layout alone; any subset of views
/// (down to none) composes the same grid, with placeholder cells where a
/// render is missing. Encoding is chosen by the output extension, PNG when
/// unrecognized. A failed write leaves no partial file behind.
pub fn compose_sheet(
    layout: &SheetLayout,
    views: &[RenderedView],
    output_path: &Path,
) -> ViewsheetResult<CompositeResult> {
    let sheet_w = layout.sheet_width();
    let sheet_h = layout.sheet_height();
    let w16: u16 = sheet_w
        .try_into()
        .map_err(|_| ViewsheetError::composite("sheet width exceeds u16"))?;
    let h16: u16 = sheet_h
        .try_into()
        .map_err(|_| ViewsheetError::composite("sheet height exceeds u16"))?;

    let mut ctx = vello_cpu::RenderContext::new(w16, h16);

    // White, fully opaque base so the readback can drop alpha.
    paint_fill(
        &mut ctx,
        Affine::IDENTITY,
        vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255),
        Rect::new(0.0, 0.0, f64::from(sheet_w), f64::from(sheet_h)),
    );

    let mut entries = Vec::with_capacity(layout.slots.len());
    for slot in &layout.slots {
        let (ox, oy) = layout.cell_origin(slot);
        let band = f64::from(layout.label_band);
        let content = Rect::new(
            f64::from(ox),
            f64::from(oy) + band,
            f64::from(ox + layout.cell_width),
            f64::from(oy + layout.cell_height),
        );

        let outcome = views
            .iter()
            .find(|v| v.name == slot.name)
            .map(|v| &v.outcome);

        let detail = match outcome {
            Some(ViewOutcome::Rendered { path, .. }) => match paint_view_image(&mut ctx, path, content) {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(view = %slot.name, error = %e, "rendered view unreadable at composite time");
                    Some(format!("render output unreadable: {e}"))
                }
            },
            Some(ViewOutcome::Failed { message }) => Some(message.clone()),
            Some(ViewOutcome::Unavailable { reason }) => Some(reason.clone()),
            None => Some("not rendered".to_string()),
        };

        if let Some(reason) = &detail {
            tracing::debug!(view = %slot.name, reason, "placeholder cell");
            paint_fill(
                &mut ctx,
                Affine::IDENTITY,
                vello_cpu::peniko::Color::from_rgba8(242, 242, 242, 255),
                content,
            );
        }

        let strip = rasterize_label(&slot.label, layout.cell_width, layout.label_band)?;
        let strip_pixmap = premul_bytes_to_pixmap(&strip, layout.cell_width, layout.label_band)?;
        paint_pixmap(
            &mut ctx,
            strip_pixmap,
            Affine::translate((f64::from(ox), f64::from(oy))),
        );

        entries.push(ManifestEntry {
            name: slot.name,
            label: slot.label.clone(),
            rendered: detail.is_none(),
            detail,
        });
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.render_to_pixmap(&mut pixmap);

    // Opaque sheet: premultiplied equals straight, alpha can be dropped.
    let rgba = pixmap.data_as_u8_slice();
    let mut rgb = Vec::with_capacity(sheet_w as usize * sheet_h as usize * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create output directory '{}'", parent.display())
        })?;
    }

    let format = output_format(output_path);
    if let Err(e) = image::save_buffer_with_format(
        output_path,
        &rgb,
        sheet_w,
        sheet_h,
        image::ColorType::Rgb8,
        format,
    ) {
        // Never leave a truncated sheet behind.
        let _ = std::fs::remove_file(output_path);
        return Err(ViewsheetError::composite(format!(
            "failed to write sheet '{}': {e}",
            output_path.display()
        )));
    }

    let manifest = SheetManifest { entries };
    tracing::debug!(
        output = %output_path.display(),
        rendered = manifest.rendered_count(),
        total = manifest.entries.len(),
        "sheet composed"
    );

    Ok(CompositeResult {
        output_path: output_path.to_path_buf(),
        width: sheet_w,
        height: sheet_h,
        manifest,
    })
}

fn output_format(path: &Path) -> image::ImageFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => image::ImageFormat::Jpeg,
        _ => image::ImageFormat::Png,
    }
}

/// Affine fitting a `src_w` by `src_h` image into `dst` without distortion,
/// centered on both axes.
fn letterbox(dst: Rect, src_w: f64, src_h: f64) -> Affine {
    let scale = (dst.width() / src_w).min(dst.height() / src_h);
    let dx = dst.x0 + (dst.width() - src_w * scale) * 0.5;
    let dy = dst.y0 + (dst.height() - src_h * scale) * 0.5;
    Affine::translate((dx, dy)) * Affine::scale(scale)
}

fn paint_view_image(
    ctx: &mut vello_cpu::RenderContext,
    path: &Path,
    dst: Rect,
) -> ViewsheetResult<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read view image '{}'", path.display()))?;
    let dyn_img = image::load_from_memory(&bytes)
        .with_context(|| format!("decode view image '{}'", path.display()))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    let pixmap = premul_bytes_to_pixmap(&data, width, height)?;

    paint_pixmap(
        ctx,
        pixmap,
        letterbox(dst, f64::from(width), f64::from(height)),
    );
    Ok(())
}

fn paint_fill(
    ctx: &mut vello_cpu::RenderContext,
    transform: Affine,
    color: vello_cpu::peniko::Color,
    rect: Rect,
) {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(color);
    ctx.fill_rect(&rect_to_cpu(rect));
}

fn paint_pixmap(ctx: &mut vello_cpu::RenderContext, pixmap: vello_cpu::Pixmap, transform: Affine) {
    let (w, h) = (
        f64::from(pixmap.width()),
        f64::from(pixmap.height()),
    );
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> ViewsheetResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ViewsheetError::composite("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ViewsheetError::composite("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(ViewsheetError::composite(
            "image byte length mismatch with width*height*4",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}
