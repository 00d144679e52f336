//! Layout calculations for overlays and centered surfaces.
//!
//! Overlay windows float over whatever lies beneath them. Their placement is
//! described by an [`OverlayGeometry`] (alignment plus a width/height extent)
//! and resolved against the available area at paint time.

// Rust guideline compliant 2026-02

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use serde::{Deserialize, Serialize};

/// Centered rectangle taking a percentage of the parent area.
#[must_use]
pub fn centered_rect(percent_x: u16, percent_y: u16, parent: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(parent);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// One dimension of an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extent {
    /// Percentage of the available space (clamped to 100).
    Relative(u16),
    /// Fixed number of cells.
    Fixed(u16),
    /// As large as the content asks for.
    Pack,
}

/// Horizontal placement of an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HAlign {
    /// Flush left.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Flush right.
    Right,
}

/// Vertical placement of an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VAlign {
    /// Flush top.
    Top,
    /// Vertically centered.
    #[default]
    Middle,
    /// Flush bottom.
    Bottom,
}

/// Where and how large an overlay layer is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayGeometry {
    /// Horizontal placement.
    pub align: HAlign,
    /// Width of the layer.
    pub width: Extent,
    /// Vertical placement.
    pub valign: VAlign,
    /// Height of the layer.
    pub height: Extent,
}

impl Default for OverlayGeometry {
    /// Centered, 55% wide, packed height.
    fn default() -> Self {
        Self {
            align: HAlign::Center,
            width: Extent::Relative(55),
            valign: VAlign::Middle,
            height: Extent::Pack,
        }
    }
}

/// Partial geometry, merged field by field over a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryPatch {
    /// Horizontal placement override.
    pub align: Option<HAlign>,
    /// Width override.
    pub width: Option<Extent>,
    /// Vertical placement override.
    pub valign: Option<VAlign>,
    /// Height override.
    pub height: Option<Extent>,
}

impl GeometryPatch {
    /// Apply this patch over `base`.
    #[must_use]
    pub fn merge_over(&self, base: OverlayGeometry) -> OverlayGeometry {
        OverlayGeometry {
            align: self.align.unwrap_or(base.align),
            width: self.width.unwrap_or(base.width),
            valign: self.valign.unwrap_or(base.valign),
            height: self.height.unwrap_or(base.height),
        }
    }
}

impl OverlayGeometry {
    /// Resolve the layer rectangle inside `area`.
    ///
    /// `packed_height` is the content's preferred height, used when the
    /// height extent is [`Extent::Pack`]. A packed width takes the full area.
    #[must_use]
    pub fn place(&self, area: Rect, packed_height: u16) -> Rect {
        let width = resolve(self.width, area.width, area.width);
        let height = resolve(self.height, area.height, packed_height);

        let x = match self.align {
            HAlign::Left => area.x,
            HAlign::Center => area.x + (area.width - width) / 2,
            HAlign::Right => area.x + area.width - width,
        };
        let y = match self.valign {
            VAlign::Top => area.y,
            VAlign::Middle => area.y + (area.height - height) / 2,
            VAlign::Bottom => area.y + area.height - height,
        };

        Rect::new(x, y, width, height)
    }
}

fn resolve(extent: Extent, available: u16, packed: u16) -> u16 {
    let wanted = match extent {
        Extent::Relative(pct) => {
            let pct = u32::from(pct.min(100));
            (u32::from(available) * pct / 100) as u16
        }
        Extent::Fixed(cells) => cells,
        Extent::Pack => packed,
    };
    wanted.min(available)
}
