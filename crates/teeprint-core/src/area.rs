//! Printable area geometry and the reference-to-screen scale transform.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Width of the canonical reference space, in reference units.
///
/// Printable-area geometry and element positions are authored against this
/// width regardless of how large the hosting container actually is.
pub const REFERENCE_WIDTH: f64 = 500.0;

/// The printable region of a garment template, in reference space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintableArea {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for PrintableArea {
    /// Front chest region of the standard t-shirt mockup.
    fn default() -> Self {
        Self {
            top: 150.0,
            left: 175.0,
            width: 150.0,
            height: 200.0,
        }
    }
}

impl PrintableArea {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self { top, left, width, height }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Center point of the area.
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// The area as a kurbo rectangle.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right(), self.bottom())
    }

    /// Check whether a rectangle lies entirely inside the area.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        rect.x0 >= self.left && rect.y0 >= self.top && rect.x1 <= self.right() && rect.y1 <= self.bottom()
    }
}

/// Scale factor for a container of the given width.
pub fn scale_for_width(container_width: f64) -> f64 {
    container_width / REFERENCE_WIDTH
}

/// Map a reference-space area to the current container width.
///
/// Must be called with the current width before every read of the effective
/// area; a scaled area is never valid across a resize.
pub fn scale_area(area: &PrintableArea, container_width: f64) -> PrintableArea {
    let scale = scale_for_width(container_width);
    PrintableArea {
        top: area.top * scale,
        left: area.left * scale,
        width: area.width * scale,
        height: area.height * scale,
    }
}

/// Convert a reference-space point to screen space.
pub fn to_screen(point: Point, scale: f64) -> Point {
    Point::new(point.x * scale, point.y * scale)
}

/// Convert a screen-space point back to reference space.
pub fn to_reference(point: Point, scale: f64) -> Point {
    Point::new(point.x / scale, point.y / scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_identity_at_reference_width() {
        let area = PrintableArea::default();
        let scaled = scale_area(&area, REFERENCE_WIDTH);
        assert_eq!(scaled, area);
    }

    #[test]
    fn test_scale_linearity() {
        let area = PrintableArea::new(150.0, 175.0, 150.0, 200.0);
        for width in [1.0, 250.0, 320.0, 499.5, 500.0, 768.0, 1920.0] {
            let scaled = scale_area(&area, width);
            let ratio = scaled.width / area.width;
            assert!((ratio - width / REFERENCE_WIDTH).abs() < 1e-12);
            assert!((scaled.height / area.height - width / REFERENCE_WIDTH).abs() < 1e-12);
            assert!((scaled.top / area.top - width / REFERENCE_WIDTH).abs() < 1e-12);
            assert!((scaled.left / area.left - width / REFERENCE_WIDTH).abs() < 1e-12);
        }
    }

    #[test]
    fn test_half_width_container() {
        let scaled = scale_area(&PrintableArea::default(), 250.0);
        assert!((scaled.left - 87.5).abs() < f64::EPSILON);
        assert!((scaled.top - 75.0).abs() < f64::EPSILON);
        assert!((scaled.width - 75.0).abs() < f64::EPSILON);
        assert!((scaled.height - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_reference_conversion() {
        let scale = scale_for_width(750.0);
        let screen = to_screen(Point::new(100.0, 40.0), scale);
        assert!((screen.x - 150.0).abs() < 1e-10);
        assert!((screen.y - 60.0).abs() < 1e-10);

        let back = to_reference(screen, scale);
        assert!((back.x - 100.0).abs() < 1e-10);
        assert!((back.y - 40.0).abs() < 1e-10);
    }

    #[test]
    fn test_contains_rect() {
        let area = PrintableArea::default();
        assert!(area.contains_rect(Rect::new(200.0, 200.0, 300.0, 300.0)));
        assert!(area.contains_rect(area.to_rect()));
        assert!(!area.contains_rect(Rect::new(170.0, 200.0, 300.0, 300.0)));
        assert!(!area.contains_rect(Rect::new(200.0, 200.0, 300.0, 351.0)));
    }
}
