//! Placed design elements: uploaded images and text labels.
//!
//! Elements are pure data in reference space. Scene nodes built from them for
//! rendering are disposable views (see [`crate::interaction`]).

use crate::error::{EngineError, EngineResult};
use kurbo::{Affine, Point, Rect, Size};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
///
/// The nil UUID marks an element that has not been assigned an id yet.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex string, as produced by color inputs.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// A validated, ready-to-place image resource handed over by the upload flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    /// URL (or object URL) the renderer loads the pixels from.
    pub url: String,
}

impl ImageResource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Kind of a design element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Image,
    Text,
}

/// An uploaded image placed on the garment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub(crate) id: ElementId,
    /// Where the renderer fetches the pixels.
    pub resource_url: String,
    /// Intrinsic pixel size; `None` until the load callback has measured it.
    pub natural_size: Option<Size>,
    /// Center of the image in reference space.
    pub center: Point,
    /// Rendered size as a percentage of the natural size.
    pub size_percent: f64,
    /// Rotation in degrees, normalized to `[0, 360)`.
    pub rotation: f64,
}

impl ImageElement {
    /// Create a pending image. Its natural size is filled in by the load callback.
    pub fn new(resource: ImageResource, center: Point) -> Self {
        Self {
            id: Uuid::nil(),
            resource_url: resource.url,
            natural_size: None,
            center,
            size_percent: 100.0,
            rotation: 0.0,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Whether the natural size has been measured.
    pub fn is_loaded(&self) -> bool {
        self.natural_size.is_some()
    }

    /// Natural size, or `PendingResource` while the image is still loading.
    pub fn natural(&self) -> EngineResult<Size> {
        self.natural_size.ok_or(EngineError::PendingResource(self.id))
    }

    /// Rendered (unrotated) size in reference units.
    pub fn rendered_size(&self) -> EngineResult<Size> {
        let natural = self.natural()?;
        let factor = self.size_percent / 100.0;
        Ok(Size::new(natural.width * factor, natural.height * factor))
    }
}

/// Approximate advance of one character as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.55;
/// Line height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f64 = 1.2;
/// Minimum width of a text box so short labels stay grabbable.
const MIN_TEXT_WIDTH: f64 = 20.0;

/// A text label placed on the garment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub(crate) id: ElementId,
    /// The text content.
    pub text: String,
    /// Font size in reference units.
    pub font_size: f64,
    /// Fill color.
    pub color: SerializableColor,
    /// Center of the text box in reference space.
    pub center: Point,
    /// Rotation in degrees, normalized to `[0, 360)`.
    pub rotation: f64,
    /// Layout size reported by the renderer, at the current font size.
    #[serde(skip)]
    measured_size: Option<Size>,
}

impl TextElement {
    pub fn new(text: impl Into<String>, font_size: f64, color: SerializableColor, center: Point) -> Self {
        Self {
            id: Uuid::nil(),
            text: text.into(),
            font_size,
            color,
            center,
            rotation: 0.0,
            measured_size: None,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Record the size the renderer laid the text out at.
    pub fn set_measured_size(&mut self, size: Size) {
        self.measured_size = Some(size);
    }

    /// Drop the measured size (call when text or font size changes).
    pub fn invalidate_measurement(&mut self) {
        self.measured_size = None;
    }

    /// Rendered (unrotated) size in reference units.
    ///
    /// Uses the renderer's measurement when available and a character-count
    /// estimate otherwise.
    pub fn rendered_size(&self) -> Size {
        if let Some(size) = self.measured_size {
            return Size::new(size.width.max(MIN_TEXT_WIDTH), size.height);
        }
        let widest = self.text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let mut lines = self.text.lines().count().max(1);
        if self.text.ends_with('\n') {
            lines += 1;
        }
        Size::new(
            (widest as f64 * self.font_size * CHAR_WIDTH_FACTOR).max(MIN_TEXT_WIDTH),
            lines as f64 * self.font_size * LINE_HEIGHT_FACTOR,
        )
    }
}

/// A partial update merged into an element by the store.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    /// Images only.
    pub size_percent: Option<f64>,
    /// Text only.
    pub text: Option<String>,
    /// Text only.
    pub font_size: Option<f64>,
    /// Text only.
    pub color: Option<SerializableColor>,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, point: Point) -> Self {
        self.x = Some(point.x);
        self.y = Some(point.y);
        self
    }

    pub fn x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn size_percent(mut self, percent: f64) -> Self {
        self.size_percent = Some(percent);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn color(mut self, color: SerializableColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Check if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn has_text_fields(&self) -> bool {
        self.text.is_some() || self.font_size.is_some() || self.color.is_some()
    }

    fn has_image_fields(&self) -> bool {
        self.size_percent.is_some()
    }
}

/// A placed element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DesignElement {
    Image(ImageElement),
    Text(TextElement),
}

impl DesignElement {
    pub fn id(&self) -> ElementId {
        match self {
            DesignElement::Image(e) => e.id,
            DesignElement::Text(e) => e.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: ElementId) {
        match self {
            DesignElement::Image(e) => e.id = id,
            DesignElement::Text(e) => e.id = id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            DesignElement::Image(_) => ElementKind::Image,
            DesignElement::Text(_) => ElementKind::Text,
        }
    }

    /// Center in reference space.
    pub fn center(&self) -> Point {
        match self {
            DesignElement::Image(e) => e.center,
            DesignElement::Text(e) => e.center,
        }
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f64 {
        match self {
            DesignElement::Image(e) => e.rotation,
            DesignElement::Text(e) => e.rotation,
        }
    }

    pub fn as_image(&self) -> Option<&ImageElement> {
        match self {
            DesignElement::Image(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            DesignElement::Text(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the element can be rendered and positioned.
    pub fn is_ready(&self) -> bool {
        match self {
            DesignElement::Image(e) => e.is_loaded(),
            DesignElement::Text(_) => true,
        }
    }

    /// Rendered (unrotated) size in reference units.
    pub fn rendered_size(&self) -> EngineResult<Size> {
        match self {
            DesignElement::Image(e) => e.rendered_size(),
            DesignElement::Text(e) => Ok(e.rendered_size()),
        }
    }

    /// Unrotated box around the center, in reference space.
    pub fn extent_rect(&self) -> EngineResult<Rect> {
        let size = self.rendered_size()?;
        Ok(Rect::from_center_size(self.center(), size))
    }

    /// Axis-aligned bounding box of the rotated element, in reference space.
    pub fn bounds(&self) -> EngineResult<Rect> {
        let unrotated = self.extent_rect()?;
        let rotation = self.rotation().to_radians();
        if rotation.abs() < 1e-6 {
            return Ok(unrotated);
        }

        let rot = Affine::rotate_about(rotation, unrotated.center());
        let corners = [
            Point::new(unrotated.x0, unrotated.y0),
            Point::new(unrotated.x1, unrotated.y0),
            Point::new(unrotated.x1, unrotated.y1),
            Point::new(unrotated.x0, unrotated.y1),
        ];
        let rotated: Vec<Point> = corners.iter().map(|&p| rot * p).collect();

        let min_x = rotated.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = rotated.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = rotated.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = rotated.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        Ok(Rect::new(min_x, min_y, max_x, max_y))
    }

    /// Check if a reference-space point hits the element.
    ///
    /// Pending images never hit.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds()
            .map(|b| b.inflate(tolerance, tolerance).contains(point))
            .unwrap_or(false)
    }

    /// Merge a patch into the element.
    ///
    /// Validates the whole patch before touching any field, so a rejected
    /// patch leaves the element unchanged.
    pub fn apply(&mut self, patch: &ElementPatch) -> EngineResult<()> {
        let id = self.id();
        if let Some(bad) = [patch.x, patch.y, patch.rotation].into_iter().flatten().find(|v| !v.is_finite()) {
            return Err(EngineError::DegenerateTransform { width: bad, height: bad });
        }
        match self {
            DesignElement::Image(image) => {
                if patch.has_text_fields() {
                    return Err(EngineError::KindMismatch(id));
                }
                if let Some(percent) = patch.size_percent {
                    if !(percent > 0.0 && percent.is_finite()) {
                        return Err(EngineError::DegenerateTransform {
                            width: percent,
                            height: percent,
                        });
                    }
                    image.size_percent = percent;
                }
                apply_placement(&mut image.center, &mut image.rotation, patch);
            }
            DesignElement::Text(text) => {
                if patch.has_image_fields() {
                    return Err(EngineError::KindMismatch(id));
                }
                if let Some(content) = &patch.text {
                    if content.trim().is_empty() {
                        return Err(EngineError::EmptyText);
                    }
                }
                if let Some(font_size) = patch.font_size {
                    if !(font_size > 0.0 && font_size.is_finite()) {
                        return Err(EngineError::DegenerateTransform {
                            width: font_size,
                            height: font_size,
                        });
                    }
                }
                if let Some(content) = &patch.text {
                    text.text = content.clone();
                    text.invalidate_measurement();
                }
                if let Some(font_size) = patch.font_size {
                    text.font_size = font_size;
                    text.invalidate_measurement();
                }
                if let Some(color) = patch.color {
                    text.color = color;
                }
                apply_placement(&mut text.center, &mut text.rotation, patch);
            }
        }
        Ok(())
    }
}

fn apply_placement(center: &mut Point, rotation: &mut f64, patch: &ElementPatch) {
    if let Some(x) = patch.x {
        center.x = x;
    }
    if let Some(y) = patch.y {
        center.y = y;
    }
    if let Some(degrees) = patch.rotation {
        *rotation = crate::interaction::normalize_rotation(degrees);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_image(width: f64, height: f64, size_percent: f64) -> DesignElement {
        let mut image = ImageElement::new(ImageResource::new("blob:design"), Point::new(250.0, 250.0));
        image.natural_size = Some(Size::new(width, height));
        image.size_percent = size_percent;
        DesignElement::Image(image)
    }

    #[test]
    fn test_pending_image_has_no_bounds() {
        let image = DesignElement::Image(ImageElement::new(ImageResource::new("blob:x"), Point::ZERO));
        assert!(!image.is_ready());
        assert!(matches!(image.bounds(), Err(EngineError::PendingResource(_))));
        assert!(!image.hit_test(Point::ZERO, 10.0));
    }

    #[test]
    fn test_image_rendered_size() {
        let image = loaded_image(400.0, 200.0, 25.0);
        let size = image.rendered_size().unwrap();
        assert!((size.width - 100.0).abs() < f64::EPSILON);
        assert!((size.height - 50.0).abs() < f64::EPSILON);

        let rect = image.extent_rect().unwrap();
        assert!((rect.x0 - 200.0).abs() < f64::EPSILON);
        assert!((rect.y0 - 225.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let mut image = loaded_image(100.0, 100.0, 100.0);
        if let DesignElement::Image(img) = &mut image {
            img.rotation = 45.0;
        }
        let bounds = image.bounds().unwrap();
        let diagonal = 100.0 * std::f64::consts::SQRT_2;
        assert!((bounds.width() - diagonal).abs() < 1e-9);
        assert!((bounds.center().x - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_estimate() {
        let text = TextElement::new("Hello", 20.0, SerializableColor::black(), Point::new(100.0, 100.0));
        let size = text.rendered_size();
        assert!((size.width - 5.0 * 20.0 * CHAR_WIDTH_FACTOR).abs() < 1e-9);
        assert!((size.height - 24.0).abs() < 1e-9);

        let short = TextElement::new("i", 10.0, SerializableColor::black(), Point::ZERO);
        assert!((short.rendered_size().width - MIN_TEXT_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn test_measured_size_overrides_estimate() {
        let mut text = TextElement::new("Hello", 20.0, SerializableColor::black(), Point::ZERO);
        text.set_measured_size(Size::new(70.0, 22.0));
        assert_eq!(text.rendered_size(), Size::new(70.0, 22.0));

        let mut element = DesignElement::Text(text);
        element.apply(&ElementPatch::new().font_size(40.0)).unwrap();
        let size = element.rendered_size().unwrap();
        assert!((size.height - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_patch_merges_only_given_fields() {
        let mut image = loaded_image(100.0, 100.0, 50.0);
        image.apply(&ElementPatch::new().x(10.0)).unwrap();

        let img = image.as_image().unwrap();
        assert!((img.center.x - 10.0).abs() < f64::EPSILON);
        assert!((img.center.y - 250.0).abs() < f64::EPSILON);
        assert!((img.size_percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_normalizes_rotation() {
        let mut image = loaded_image(100.0, 100.0, 50.0);
        image.apply(&ElementPatch::new().rotation(-90.0)).unwrap();
        assert!((image.rotation() - 270.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_kind_mismatch_leaves_element() {
        let mut image = loaded_image(100.0, 100.0, 50.0);
        let before = image.clone();
        let result = image.apply(&ElementPatch::new().x(1.0).font_size(30.0));
        assert!(matches!(result, Err(EngineError::KindMismatch(_))));
        assert_eq!(image, before);

        let mut text = DesignElement::Text(TextElement::new("Hi", 20.0, SerializableColor::black(), Point::ZERO));
        let result = text.apply(&ElementPatch::new().size_percent(30.0));
        assert!(matches!(result, Err(EngineError::KindMismatch(_))));
    }

    #[test]
    fn test_patch_rejects_non_finite_placement() {
        let mut image = loaded_image(100.0, 100.0, 50.0);
        let before = image.clone();
        for patch in [
            ElementPatch::new().x(f64::NAN).size_percent(80.0),
            ElementPatch::new().y(f64::INFINITY),
            ElementPatch::new().rotation(f64::NAN),
        ] {
            assert!(matches!(image.apply(&patch), Err(EngineError::DegenerateTransform { .. })));
        }
        assert_eq!(image, before);
    }

    #[test]
    fn test_patch_rejects_empty_text() {
        let mut text = DesignElement::Text(TextElement::new("Hi", 20.0, SerializableColor::black(), Point::ZERO));
        assert_eq!(text.apply(&ElementPatch::new().text("  ")), Err(EngineError::EmptyText));
        assert_eq!(text.as_text().unwrap().text, "Hi");
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(SerializableColor::from_hex("#ff8000"), Some(SerializableColor::new(255, 128, 0, 255)));
        assert_eq!(SerializableColor::from_hex("00000080"), Some(SerializableColor::new(0, 0, 0, 128)));
        assert_eq!(SerializableColor::from_hex("#fff"), None);
        assert_eq!(SerializableColor::from_hex("#gg0000"), None);
    }
}
