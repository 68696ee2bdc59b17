//! Drag and handle gestures on scene nodes.
//!
//! A [`SceneNode`] is the on-screen view of an element. While a gesture is in
//! progress the node diverges from the stored element; on gesture end the
//! node's state is converted back into an [`ElementPatch`] and the node is
//! thrown away.

use crate::area::to_reference;
use crate::elements::{DesignElement, ElementId, ElementKind, ElementPatch};
use crate::error::{EngineError, EngineResult};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 10.0;
/// Distance from the top edge to the rotation handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;

/// Normalize a rotation in degrees to `[0, 360)`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    ((degrees % 360.0) + 360.0) % 360.0
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge midpoint positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Type of transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
    Rotate,
}

impl HandleKind {
    /// Unit direction of the handle from the box center in local coordinates,
    /// or `None` for the rotation handle.
    fn local_direction(self) -> Option<Vec2> {
        match self {
            HandleKind::Corner(Corner::TopLeft) => Some(Vec2::new(-1.0, -1.0)),
            HandleKind::Corner(Corner::TopRight) => Some(Vec2::new(1.0, -1.0)),
            HandleKind::Corner(Corner::BottomLeft) => Some(Vec2::new(-1.0, 1.0)),
            HandleKind::Corner(Corner::BottomRight) => Some(Vec2::new(1.0, 1.0)),
            HandleKind::Edge(Edge::Top) => Some(Vec2::new(0.0, -1.0)),
            HandleKind::Edge(Edge::Right) => Some(Vec2::new(1.0, 0.0)),
            HandleKind::Edge(Edge::Bottom) => Some(Vec2::new(0.0, 1.0)),
            HandleKind::Edge(Edge::Left) => Some(Vec2::new(-1.0, 0.0)),
            HandleKind::Rotate => None,
        }
    }
}

/// A transform handle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a screen point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// On-screen view of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Center in screen space.
    pub position: Point,
    /// Size in screen space before the live gesture scale is applied.
    pub size: Size,
    /// Rotation in degrees. May leave `[0, 360)` mid-gesture.
    pub rotation: f64,
    /// Live gesture scale factor; `(1, 1)` at rest.
    pub scale: Vec2,
}

impl SceneNode {
    /// Build the node for an element at the given viewport scale.
    pub fn from_element(element: &DesignElement, viewport_scale: f64) -> EngineResult<Self> {
        let size = element.rendered_size()?;
        let center = element.center();
        Ok(Self {
            id: element.id(),
            kind: element.kind(),
            position: Point::new(center.x * viewport_scale, center.y * viewport_scale),
            size: Size::new(size.width * viewport_scale, size.height * viewport_scale),
            rotation: element.rotation(),
            scale: Vec2::new(1.0, 1.0),
        })
    }

    /// Size on screen including the live gesture scale.
    pub fn display_size(&self) -> Size {
        Size::new(self.size.width * self.scale.x.abs(), self.size.height * self.scale.y.abs())
    }

    /// Combined uniform scale factor of the live gesture.
    pub fn scale_factor(&self) -> f64 {
        (self.scale.x.abs() + self.scale.y.abs()) / 2.0
    }

    /// Bake the gesture scale back to 1.
    pub fn reset_scale(&mut self) {
        self.size = self.display_size();
        self.scale = Vec2::new(1.0, 1.0);
    }

    fn rotate_local(&self, local: Vec2) -> Vec2 {
        let (sin_r, cos_r) = self.rotation.to_radians().sin_cos();
        Vec2::new(local.x * cos_r - local.y * sin_r, local.x * sin_r + local.y * cos_r)
    }

    fn unrotate(&self, v: Vec2) -> Vec2 {
        let (sin_r, cos_r) = self.rotation.to_radians().sin_cos();
        Vec2::new(v.x * cos_r + v.y * sin_r, -v.x * sin_r + v.y * cos_r)
    }

    /// Resize and rotation handles, rotated with the node.
    pub fn handles(&self) -> Vec<Handle> {
        let size = self.display_size();
        let half = Vec2::new(size.width / 2.0, size.height / 2.0);
        let at = |local: Vec2| self.position + self.rotate_local(local);

        let mut handles: Vec<Handle> = [
            HandleKind::Corner(Corner::TopLeft),
            HandleKind::Corner(Corner::TopRight),
            HandleKind::Corner(Corner::BottomLeft),
            HandleKind::Corner(Corner::BottomRight),
            HandleKind::Edge(Edge::Top),
            HandleKind::Edge(Edge::Right),
            HandleKind::Edge(Edge::Bottom),
            HandleKind::Edge(Edge::Left),
        ]
        .into_iter()
        .filter_map(|kind| {
            let dir = kind.local_direction()?;
            Some(Handle::new(at(Vec2::new(dir.x * half.x, dir.y * half.y)), kind))
        })
        .collect();
        handles.push(Handle::new(at(Vec2::new(0.0, -half.y - ROTATE_HANDLE_OFFSET)), HandleKind::Rotate));
        handles
    }

    /// Find which handle (if any) is hit at a screen point.
    pub fn hit_test_handles(&self, point: Point, tolerance: f64) -> Option<HandleKind> {
        self.handles().into_iter().find(|h| h.hit_test(point, tolerance)).map(|h| h.kind)
    }
}

/// Allowed image box extents, in reference units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBoxLimits {
    pub min: Size,
    pub max: Size,
}

impl BoundBoxLimits {
    /// Limits for images on a printable area of the given reference size.
    pub fn for_area(area_size: Size, min_extent: f64, max_factor: f64) -> Self {
        Self {
            min: Size::new(min_extent, min_extent),
            max: Size::new(area_size.width * max_factor, area_size.height * max_factor),
        }
    }

    /// Check a candidate box size (reference units).
    pub fn check(&self, candidate: Size) -> EngineResult<()> {
        let fits = candidate.width >= self.min.width
            && candidate.height >= self.min.height
            && candidate.width <= self.max.width
            && candidate.height <= self.max.height;
        if fits {
            Ok(())
        } else {
            Err(EngineError::DegenerateTransform {
                width: candidate.width,
                height: candidate.height,
            })
        }
    }
}

/// An in-progress gesture on a single node.
#[derive(Debug, Clone)]
pub enum Gesture {
    /// Moving the whole node.
    Drag {
        node: SceneNode,
        start_pointer: Point,
        start_position: Point,
    },
    /// Dragging a resize or rotation handle.
    Transform {
        node: SceneNode,
        handle: HandleKind,
        start_pointer: Point,
        original: SceneNode,
    },
}

impl Gesture {
    pub fn drag(node: SceneNode, pointer: Point) -> Self {
        let start_position = node.position;
        Gesture::Drag {
            node,
            start_pointer: pointer,
            start_position,
        }
    }

    pub fn transform(node: SceneNode, handle: HandleKind, pointer: Point) -> Self {
        Gesture::Transform {
            original: node.clone(),
            node,
            handle,
            start_pointer: pointer,
        }
    }

    /// The live node.
    pub fn node(&self) -> &SceneNode {
        match self {
            Gesture::Drag { node, .. } | Gesture::Transform { node, .. } => node,
        }
    }

    pub fn id(&self) -> ElementId {
        self.node().id
    }

    /// Move the gesture to a new pointer position (screen space).
    ///
    /// `limits` and `viewport_scale` constrain image resizes; a candidate box
    /// outside the limits is refused and the node keeps its previous box.
    pub fn update(&mut self, pointer: Point, limits: Option<&BoundBoxLimits>, viewport_scale: f64) {
        match self {
            Gesture::Drag {
                node,
                start_pointer,
                start_position,
            } => {
                node.position = *start_position + (pointer - *start_pointer);
            }
            Gesture::Transform {
                node,
                handle,
                start_pointer,
                original,
            } => match handle.local_direction() {
                None => {
                    let offset = pointer - original.position;
                    node.rotation = offset.y.atan2(offset.x).to_degrees() + 90.0;
                }
                Some(dir) => {
                    let candidate = resize_from_handle(original, dir, pointer - *start_pointer);
                    let display = candidate.display_size();
                    if let Some(limits) = limits {
                        let reference = Size::new(display.width / viewport_scale, display.height / viewport_scale);
                        if limits.check(reference).is_err() {
                            return;
                        }
                    }
                    *node = candidate;
                }
            },
        }
    }
}

/// Resize `original` by dragging the handle at local direction `dir` by
/// `delta` (screen space), keeping the opposite side fixed.
///
/// Images keep their aspect ratio: a single factor applies to both axes, so
/// the box checked against the limits is the box that gets committed.
fn resize_from_handle(original: &SceneNode, dir: Vec2, delta: Vec2) -> SceneNode {
    let local_delta = original.unrotate(delta);
    let display = original.display_size();
    let mut new_width = (display.width + dir.x * local_delta.x).max(1.0);
    let mut new_height = (display.height + dir.y * local_delta.y).max(1.0);

    if original.kind == ElementKind::Image {
        let fx = new_width / display.width.max(f64::EPSILON);
        let fy = new_height / display.height.max(f64::EPSILON);
        let factor = match (dir.x != 0.0, dir.y != 0.0) {
            (true, true) => (fx + fy) / 2.0,
            (true, false) => fx,
            _ => fy,
        };
        new_width = display.width * factor;
        new_height = display.height * factor;
    }

    let shift_local = Vec2::new(
        dir.x * (new_width - display.width) / 2.0,
        dir.y * (new_height - display.height) / 2.0,
    );

    let mut node = original.clone();
    node.position = original.position + original.rotate_local(shift_local);
    node.scale = Vec2::new(
        original.scale.x * new_width / display.width.max(f64::EPSILON),
        original.scale.y * new_height / display.height.max(f64::EPSILON),
    );
    node
}

/// Patch committing the end of a drag: the node's position, back in reference space.
pub fn commit_drag(node: &SceneNode, viewport_scale: f64) -> ElementPatch {
    ElementPatch::new().position(to_reference(node.position, viewport_scale))
}

/// Patch committing the end of a handle transform.
///
/// Images fold the gesture scale into `size_percent`; text folds it into the
/// font size. Resets the node's live scale to 1 afterwards so the next gesture
/// starts from the committed size instead of compounding.
pub fn commit_transform(element: &DesignElement, node: &mut SceneNode, viewport_scale: f64) -> ElementPatch {
    let factor = node.scale_factor();
    let mut patch = ElementPatch::new()
        .position(to_reference(node.position, viewport_scale))
        .rotation(normalize_rotation(node.rotation));

    match element {
        DesignElement::Image(image) => {
            patch = patch.size_percent(image.size_percent * factor);
        }
        DesignElement::Text(text) => {
            patch = patch.font_size((text.font_size * factor).round().max(1.0));
        }
    }

    node.reset_scale();
    node.rotation = normalize_rotation(node.rotation);
    patch
}
