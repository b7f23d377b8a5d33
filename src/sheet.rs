use crate::views::{ViewMode, ViewName};

/// Cell size of the composed sheet. Fixed by the layout, not by the
/// per-view render resolution; larger or smaller renders are fitted in.
pub const CELL_WIDTH: u32 = 512;
pub const CELL_HEIGHT: u32 = 512;

/// Chinese display name for a view, paired with the ASCII name in labels.
pub fn chinese_label(name: ViewName) -> &'static str {
    match name {
        ViewName::Front => "正面",
        ViewName::Left => "左视图",
        ViewName::Back => "背面",
        ViewName::Right => "右视图",
        ViewName::Top => "俯视图",
        ViewName::Bottom => "底视图",
        ViewName::Isometric => "等轴测无材质",
        ViewName::Uv => "UV贴图",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SheetSlot {
    pub name: ViewName,
    pub row: u32,
    pub col: u32,
    pub label: String,
}

/// Fixed grid arrangement for one mode.
///
/// The sheet is `cols * cell_width` by `rows * cell_height` pixels with no
/// outer margin. Every slot exists regardless of which views rendered.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SheetLayout {
    pub rows: u32,
    pub cols: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Height of the label strip at the top of each cell.
    pub label_band: u32,
    pub slots: Vec<SheetSlot>,
}

impl SheetLayout {
    pub fn for_mode(mode: ViewMode) -> Self {
        let (rows, cols) = match mode {
            ViewMode::Six => (2u32, 3u32),
            ViewMode::Eight => (2u32, 4u32),
        };

        let slots = mode
            .view_order()
            .iter()
            .enumerate()
            .map(|(i, &name)| SheetSlot {
                name,
                row: i as u32 / cols,
                col: i as u32 % cols,
                label: format!("{}. {} {}", i + 1, chinese_label(name), name.as_str()),
            })
            .collect();

        Self {
            rows,
            cols,
            cell_width: CELL_WIDTH,
            cell_height: CELL_HEIGHT,
            label_band: label_band_for(CELL_HEIGHT),
            slots,
        }
    }

    pub fn sheet_width(&self) -> u32 {
        self.cols * self.cell_width
    }

    pub fn sheet_height(&self) -> u32 {
        self.rows * self.cell_height
    }

    pub fn slot(&self, name: ViewName) -> Option<&SheetSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Top-left pixel of a slot's cell.
    pub fn cell_origin(&self, slot: &SheetSlot) -> (u32, u32) {
        (slot.col * self.cell_width, slot.row * self.cell_height)
    }
}

fn label_band_for(cell_height: u32) -> u32 {
    (cell_height / 12).clamp(24, 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_view_layout_is_three_by_two() {
        let layout = SheetLayout::for_mode(ViewMode::Six);
        assert_eq!((layout.rows, layout.cols), (2, 3));
        assert_eq!(layout.sheet_width(), 1536);
        assert_eq!(layout.sheet_height(), 1024);
        assert_eq!(layout.slots.len(), 6);
    }

    #[test]
    fn eight_view_layout_is_four_by_two() {
        let layout = SheetLayout::for_mode(ViewMode::Eight);
        assert_eq!((layout.rows, layout.cols), (2, 4));
        assert_eq!(layout.sheet_width(), 2048);
        assert_eq!(layout.sheet_height(), 1024);
        assert_eq!(layout.slots.len(), 8);
    }

    #[test]
    fn slots_fill_the_grid_row_major() {
        let layout = SheetLayout::for_mode(ViewMode::Six);
        let front = layout.slot(ViewName::Front).unwrap();
        assert_eq!((front.row, front.col), (0, 0));
        let right = layout.slot(ViewName::Right).unwrap();
        assert_eq!((right.row, right.col), (1, 0));
        let bottom = layout.slot(ViewName::Bottom).unwrap();
        assert_eq!((bottom.row, bottom.col), (1, 2));
        assert_eq!(layout.cell_origin(bottom), (1024, 512));
    }

    #[test]
    fn eight_view_puts_isometric_and_uv_on_the_right_edge() {
        let layout = SheetLayout::for_mode(ViewMode::Eight);
        let iso = layout.slot(ViewName::Isometric).unwrap();
        assert_eq!((iso.row, iso.col), (0, 3));
        let uv = layout.slot(ViewName::Uv).unwrap();
        assert_eq!((uv.row, uv.col), (1, 3));
    }

    #[test]
    fn labels_are_indexed_in_grid_order() {
        let layout = SheetLayout::for_mode(ViewMode::Eight);
        assert_eq!(layout.slots[0].label, "1. 正面 front");
        assert_eq!(layout.slots[3].label, "4. 等轴测无材质 isometric");
        assert_eq!(layout.slots[7].label, "8. UV贴图 uv");
    }

    #[test]
    fn label_band_is_clamped() {
        assert_eq!(label_band_for(512), 42);
        assert_eq!(label_band_for(100), 24);
        assert_eq!(label_band_for(4096), 64);
    }
}
