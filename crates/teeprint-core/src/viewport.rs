//! Container width tracking.
//!
//! The host reports the container width on mount and on every later layout
//! change; the first measurement is not assumed to be final.

use crate::area::{PrintableArea, REFERENCE_WIDTH, scale_area, scale_for_width};
use crate::error::{EngineError, EngineResult};

/// The responsive surface the composition is drawn on.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    container_width: f64,
    /// Set when the overlay must be redrawn with a fresh effective area.
    overlay_dirty: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(REFERENCE_WIDTH)
    }
}

impl Viewport {
    pub fn new(container_width: f64) -> Self {
        Self {
            container_width,
            overlay_dirty: true,
        }
    }

    /// Current container width in screen pixels.
    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    /// Reference-to-screen scale factor.
    pub fn scale(&self) -> f64 {
        scale_for_width(self.container_width)
    }

    /// Printable area in screen space, derived from the current width.
    pub fn effective_area(&self, area: &PrintableArea) -> PrintableArea {
        scale_area(area, self.container_width)
    }

    /// Record a width observation.
    ///
    /// Returns `Ok(true)` when the width changed. Stored element transforms
    /// stay in reference space and are not touched.
    pub fn observe_width(&mut self, width: f64) -> EngineResult<bool> {
        if !(width > 0.0 && width.is_finite()) {
            return Err(EngineError::InvalidWidth(width));
        }
        if (width - self.container_width).abs() < f64::EPSILON {
            return Ok(false);
        }
        log::debug!("Container width {} -> {}", self.container_width, width);
        self.container_width = width;
        self.overlay_dirty = true;
        Ok(true)
    }

    /// Check and clear the overlay redraw flag.
    pub fn take_overlay_dirty(&mut self) -> bool {
        std::mem::take(&mut self.overlay_dirty)
    }
}
