use std::path::Path;
use std::sync::{Arc, OnceLock};

use anyhow::Context as _;

use crate::error::{ViewsheetError, ViewsheetResult};

/// Rasterize one label strip to premultiplied RGBA8, transparent except
/// for the text.
///
/// The font database is loaded once per process: system fonts plus any
/// `ttf`/`otf`/`ttc` files in the directory named by `VIEWSHEET_FONT_DIR`.
/// Labels mix CJK and Latin script, so the stack prefers CJK-capable
/// families; when a family resolves nowhere the resolver falls back to any
/// installed face. Glyph shapes degrade before text disappears.
pub fn rasterize_label(text: &str, width: u32, height: u32) -> ViewsheetResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(ViewsheetError::composite(
            "label strip dimensions must be non-zero",
        ));
    }
    rasterize_svg(&label_svg(text, width, height), width, height)
}

fn rasterize_svg(svg: &str, width: u32, height: u32) -> ViewsheetResult<Vec<u8>> {
    let opts = usvg::Options {
        fontdb: label_fontdb(),
        font_resolver: make_font_resolver(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts).context("parse label svg")?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ViewsheetError::composite("failed to allocate label pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap.data().to_vec())
}

fn label_fontdb() -> Arc<usvg::fontdb::Database> {
    static FONTDB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTDB
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            if let Some(dir) = std::env::var_os("VIEWSHEET_FONT_DIR") {
                load_fonts_from_dir(&mut db, Path::new(&dir));
            }
            tracing::debug!(faces = db.len(), "label font database loaded");
            Arc::new(db)
        })
        .clone()
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}

// A resolver that never drops a glyph run outright: after the requested
// families and the generic ones, it settles for any face the database has.
fn make_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Serif);
            families.push(usvg::fontdb::Family::Monospace);

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: map_stretch(font.stretch()),
                style: map_style(font.style()),
            };
            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

fn map_stretch(stretch: usvg::FontStretch) -> usvg::fontdb::Stretch {
    match stretch {
        usvg::FontStretch::UltraCondensed => usvg::fontdb::Stretch::UltraCondensed,
        usvg::FontStretch::ExtraCondensed => usvg::fontdb::Stretch::ExtraCondensed,
        usvg::FontStretch::Condensed => usvg::fontdb::Stretch::Condensed,
        usvg::FontStretch::SemiCondensed => usvg::fontdb::Stretch::SemiCondensed,
        usvg::FontStretch::Normal => usvg::fontdb::Stretch::Normal,
        usvg::FontStretch::SemiExpanded => usvg::fontdb::Stretch::SemiExpanded,
        usvg::FontStretch::Expanded => usvg::fontdb::Stretch::Expanded,
        usvg::FontStretch::ExtraExpanded => usvg::fontdb::Stretch::ExtraExpanded,
        usvg::FontStretch::UltraExpanded => usvg::fontdb::Stretch::UltraExpanded,
    }
}

fn map_style(style: usvg::FontStyle) -> usvg::fontdb::Style {
    match style {
        usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
        usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
        usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
    }
}

fn label_svg(text: &str, width: u32, height: u32) -> String {
    let size = label_font_size(text, width, height);
    let x = f64::from(width) * 0.5;
    let y = f64::from(height) * 0.5 + size * 0.35;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\">\
         <text x=\"{x:.1}\" y=\"{y:.1}\" text-anchor=\"middle\" \
         font-family=\"Noto Sans CJK SC, Source Han Sans SC, Microsoft YaHei, sans-serif\" \
         font-size=\"{size:.1}\" fill=\"#1a1a1a\">{}</text></svg>",
        xml_escape(text)
    )
}

/// Font size bounded by the strip height and, for long labels, the strip
/// width so text never spills over image content.
fn label_font_size(text: &str, width: u32, height: u32) -> f64 {
    let chars = text.chars().count().max(1) as f64;
    (f64::from(height) * 0.62)
        .min(f64::from(width) * 1.1 / chars)
        .max(8.0)
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts_available() -> bool {
        label_fontdb().faces().next().is_some()
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(xml_escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(xml_escape("正面 front"), "正面 front");
    }

    #[test]
    fn svg_embeds_escaped_text_centered() {
        let svg = label_svg("1. 正面 <front>", 512, 42);
        assert!(svg.contains("text-anchor=\"middle\""));
        assert!(svg.contains("&lt;front&gt;"));
        assert!(!svg.contains("<front>"));
        assert!(svg.contains("viewBox=\"0 0 512 42\""));
    }

    #[test]
    fn font_size_caps_at_band_and_shrinks_for_long_labels() {
        let short = label_font_size("1. 正面 front", 512, 42);
        assert!((short - 42.0 * 0.62).abs() < 1e-9);

        let long = label_font_size(
            "7. 等轴测无材质 isometric isometric isometric isometric",
            512,
            42,
        );
        assert!(long < short);
        assert!(long >= 8.0);
    }

    #[test]
    fn rasterized_strip_has_expected_byte_length() {
        let data = rasterize_label("1. 正面 front", 128, 24).unwrap();
        assert_eq!(data.len(), 128 * 24 * 4);
    }

    #[test]
    fn label_text_rasterizes_visible_pixels() {
        if !fonts_available() {
            return;
        }
        let data = rasterize_label("1. 正面 front view", 512, 42).unwrap();
        assert!(
            data.iter().any(|&b| b != 0),
            "expected non-empty pixels; the strip is transparent except for the text"
        );
    }

    #[test]
    fn unknown_font_families_still_rasterize_text() {
        if !fonts_available() {
            return;
        }
        // Families that resolve nowhere must still settle on some installed
        // face instead of dropping the run.
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"256\" height=\"48\" \
                   viewBox=\"0 0 256 48\">\
                   <text x=\"128\" y=\"32\" text-anchor=\"middle\" \
                   font-family=\"No Such Family, Also Missing\" \
                   font-size=\"24\" fill=\"#1a1a1a\">front</text></svg>";
        let data = rasterize_svg(svg, 256, 48).unwrap();
        assert!(
            data.iter().any(|&b| b != 0),
            "expected non-empty pixels from the any-face fallback"
        );
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(rasterize_label("x", 0, 24).is_err());
        assert!(rasterize_label("x", 128, 0).is_err());
    }
}
