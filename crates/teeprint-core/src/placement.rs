//! Fit/cover scale math, 9-way alignment, and named position presets.
//!
//! Everything here works in reference space against the reference-space
//! printable area. Element centers are stored in reference space, so mixing in
//! a scaled (screen-space) area would misplace elements on any container that
//! is not exactly 500 units wide.

use crate::area::PrintableArea;
use crate::elements::{DesignElement, ElementPatch};
use crate::error::{EngineError, EngineResult};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Horizontal alignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical alignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Named placements on the printable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Centered, size unchanged.
    Center,
    /// Small badge in the upper-right quadrant.
    Pocket,
    /// Spans the printable area on at least one axis, centered.
    FullFront,
}

impl Preset {
    pub fn name(self) -> &'static str {
        match self {
            Preset::Center => "center",
            Preset::Pocket => "pocket",
            Preset::FullFront => "full-front",
        }
    }

    pub fn all() -> &'static [Preset] {
        &[Preset::Center, Preset::Pocket, Preset::FullFront]
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::all()
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::UnknownPreset(s.to_string()))
    }
}

/// Largest uniform scale at which `natural` fits inside the area.
pub fn fit_ratio(natural: Size, area: &PrintableArea) -> f64 {
    (area.width / natural.width).min(area.height / natural.height)
}

/// Scale at which `natural` spans the area on one axis without exceeding the other.
pub fn cover_scale(natural: Size, area: &PrintableArea) -> f64 {
    fit_ratio(natural, area)
}

/// Initial `size_percent` for a freshly loaded image.
///
/// Images already smaller than the area are shown at their natural size;
/// larger ones are shrunk to fit, with `margin` applied on top.
pub fn initial_size_percent(natural: Size, area: &PrintableArea, margin: f64) -> f64 {
    let ratio = fit_ratio(natural, area);
    if ratio >= 1.0 { 100.0 } else { ratio * margin * 100.0 }
}

/// Target center for a 9-way alignment.
///
/// Only the requested axes move; the other keeps `current`.
pub fn align_position(
    current: Point,
    half_extent: Size,
    area: &PrintableArea,
    horizontal: Option<HAlign>,
    vertical: Option<VAlign>,
) -> Point {
    let x = match horizontal {
        Some(HAlign::Left) => area.left + half_extent.width,
        Some(HAlign::Center) => area.left + area.width / 2.0,
        Some(HAlign::Right) => area.left + area.width - half_extent.width,
        None => current.x,
    };
    let y = match vertical {
        Some(VAlign::Top) => area.top + half_extent.height,
        Some(VAlign::Middle) => area.top + area.height / 2.0,
        Some(VAlign::Bottom) => area.top + area.height - half_extent.height,
        None => current.y,
    };
    Point::new(x, y)
}

/// Patch aligning an element inside the area.
pub fn align_element(
    element: &DesignElement,
    area: &PrintableArea,
    horizontal: Option<HAlign>,
    vertical: Option<VAlign>,
) -> EngineResult<ElementPatch> {
    let size = element.rendered_size()?;
    let half = Size::new(size.width / 2.0, size.height / 2.0);
    let target = align_position(element.center(), half, area, horizontal, vertical);

    let mut patch = ElementPatch::new();
    if horizontal.is_some() {
        patch = patch.x(target.x);
    }
    if vertical.is_some() {
        patch = patch.y(target.y);
    }
    Ok(patch)
}

/// Patch placing an element at a named preset.
///
/// Text elements are only repositioned; their font size stays as is.
pub fn preset_element(
    element: &DesignElement,
    area: &PrintableArea,
    preset: Preset,
    pocket_divisor: f64,
) -> EngineResult<ElementPatch> {
    let pocket_anchor = Point::new(area.left + 0.75 * area.width, area.top + 0.25 * area.height);

    match element {
        DesignElement::Image(image) => {
            let natural = image.natural()?;
            let cover = cover_scale(natural, area) * 100.0;
            let patch = match preset {
                Preset::Center => ElementPatch::new().position(area.center()),
                Preset::Pocket => ElementPatch::new()
                    .size_percent(cover / pocket_divisor)
                    .position(pocket_anchor),
                Preset::FullFront => ElementPatch::new().size_percent(cover).position(area.center()),
            };
            Ok(patch)
        }
        DesignElement::Text(_) => {
            let target = match preset {
                Preset::Center | Preset::FullFront => area.center(),
                Preset::Pocket => pocket_anchor,
            };
            Ok(ElementPatch::new().position(target))
        }
    }
}
