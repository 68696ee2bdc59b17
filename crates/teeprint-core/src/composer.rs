//! The composition engine facade.
//!
//! [`Composer`] owns the element store, the selection machine, the viewport,
//! and the in-progress gesture. Collaborators outside the canvas (side panels,
//! toolbars) talk to it through the narrow [`DesignSurface`] capability
//! instead of reaching into its state.

use crate::area::{PrintableArea, to_reference};
use crate::config::{ConfigError, EngineConfig};
use crate::elements::{
    DesignElement, ElementId, ElementKind, ElementPatch, ImageElement, ImageResource, SerializableColor, TextElement,
};
use crate::error::{EngineError, EngineResult};
use crate::interaction::{BoundBoxLimits, Gesture, Handle, HandleKind, SceneNode, commit_drag, commit_transform};
use crate::placement::{self, HAlign, Preset, VAlign};
use crate::selection::{ClickTarget, Selection, SelectionMachine, SelectionSignal};
use crate::store::ElementStore;
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size};

/// Hit tolerance for element clicks, in screen pixels.
const CLICK_TOLERANCE: f64 = 2.0;

/// Notifications for the host, drained with [`Composer::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionEvent {
    /// Consumers of this element kind must drop their selection highlight.
    Deselect(ElementKind),
    /// The selection changed.
    SelectionChanged(Selection),
    /// The container was resized; carries the fresh screen-space area.
    AreaChanged(PrintableArea),
    ElementAdded(ElementId),
    ElementUpdated(ElementId),
    ElementRemoved(ElementId),
    /// An image finished loading and received its initial placement.
    ImageLoaded(ElementId),
    /// An image failed to decode and was dropped.
    ImageFailed(ElementId),
}

/// Everything a renderer needs to draw one frame, in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    pub container_width: f64,
    pub scale: f64,
    /// Printable area scaled to the current container.
    pub effective_area: PrintableArea,
    /// Dashed outline of the printable area, when shown.
    pub outline: Option<Rect>,
    /// Clip rect for the full-opacity copy of each image; outside it images
    /// are drawn faded.
    pub clip: Rect,
    /// Renderable nodes in z-order (back to front). Pending images are skipped.
    pub nodes: Vec<SceneNode>,
    pub selected: Option<ElementId>,
    /// Transform handles of the selected node.
    pub handles: Vec<Handle>,
}

/// Capability handle exposed to collaborators outside the canvas.
///
/// Failures are logged and leave the composition unchanged.
pub trait DesignSurface {
    /// Place an uploaded image. Its natural size arrives later via the load callback.
    fn add_image(&mut self, resource: ImageResource) -> ElementId;

    /// Place a text label.
    fn add_text(&mut self, text: &str, font_size: f64, color: SerializableColor) -> EngineResult<ElementId>;

    /// Merge a partial transform into an element.
    fn update_element(&mut self, id: ElementId, patch: ElementPatch) -> EngineResult<()>;

    /// Delete an element.
    fn remove_element(&mut self, id: ElementId) -> EngineResult<()>;

    /// Force the selection (`None` clears it).
    fn select(&mut self, id: Option<ElementId>);

    /// Align the selected element inside the printable area.
    fn align_selected(&mut self, horizontal: Option<HAlign>, vertical: Option<VAlign>) -> EngineResult<()>;

    /// Move the selected element to a named preset.
    fn apply_preset(&mut self, preset: Preset) -> EngineResult<()>;

    /// Current container width.
    fn container_width(&self) -> f64;
}

/// The design composition engine.
#[derive(Debug, Clone)]
pub struct Composer {
    config: EngineConfig,
    store: ElementStore,
    selection: SelectionMachine,
    viewport: Viewport,
    gesture: Option<Gesture>,
    show_printable_area: bool,
    events: Vec<CompositionEvent>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::with_valid_config(EngineConfig::default())
    }
}

impl Composer {
    /// Create an engine for the given configuration.
    ///
    /// The configuration is validated first; a zero container width or an
    /// empty printable area would otherwise leak infinities into stored
    /// transforms.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: EngineConfig) -> Self {
        Self {
            viewport: Viewport::new(config.initial_container_width),
            show_printable_area: config.show_printable_area,
            config,
            store: ElementStore::new(),
            selection: SelectionMachine::new(),
            gesture: None,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn element(&self, id: ElementId) -> Option<&DesignElement> {
        self.store.get(id)
    }

    pub fn selection(&self) -> Selection {
        self.selection.current()
    }

    /// Printable area in reference space.
    pub fn printable_area(&self) -> &PrintableArea {
        &self.config.printable_area
    }

    /// Reference-to-screen scale for the current container width.
    pub fn scale(&self) -> f64 {
        self.viewport.scale()
    }

    /// Printable area in screen space, derived from the current width on every call.
    pub fn effective_area(&self) -> PrintableArea {
        self.viewport.effective_area(&self.config.printable_area)
    }

    /// Take the queued events.
    pub fn drain_events(&mut self) -> Vec<CompositionEvent> {
        std::mem::take(&mut self.events)
    }

    /// The in-progress gesture, if any.
    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    fn flush_selection_signals(&mut self) {
        for signal in self.selection.drain_signals() {
            self.events.push(match signal {
                SelectionSignal::Deselect(kind) => CompositionEvent::Deselect(kind),
                SelectionSignal::Changed(selection) => CompositionEvent::SelectionChanged(selection),
            });
        }
    }

    fn insert(&mut self, element: DesignElement) -> ElementId {
        let kind = element.kind();
        let id = self.store.add(element);
        self.events.push(CompositionEvent::ElementAdded(id));
        self.selection.request(Some((id, kind)));
        self.flush_selection_signals();
        id
    }

    fn drop_element(&mut self, id: ElementId) -> EngineResult<DesignElement> {
        let element = self.store.remove(id)?;
        if self.gesture.as_ref().is_some_and(|g| g.id() == id) {
            log::debug!("Cancelling gesture on removed element {}", id);
            self.gesture = None;
        }
        self.selection.element_removed(id);
        self.events.push(CompositionEvent::ElementRemoved(id));
        self.flush_selection_signals();
        Ok(element)
    }

    fn commit(&mut self, id: ElementId, patch: &ElementPatch) -> EngineResult<()> {
        self.store.update(id, patch)?;
        self.events.push(CompositionEvent::ElementUpdated(id));
        Ok(())
    }

    fn selected_element(&self) -> EngineResult<&DesignElement> {
        let id = self.selection.current().id().ok_or(EngineError::NoSelection)?;
        self.store.get(id).ok_or(EngineError::NotFound(id))
    }

    fn image_limits(&self) -> BoundBoxLimits {
        let area = &self.config.printable_area;
        BoundBoxLimits::for_area(
            Size::new(area.width, area.height),
            self.config.min_image_extent,
            self.config.max_extent_factor,
        )
    }

    // --- Image loading ---

    /// Load callback: the image's natural size is known.
    ///
    /// This is the only writer of an image's natural size. It computes the
    /// initial fit placement. A callback for an element that was removed while
    /// loading is ignored, as is a repeat callback for an image that is
    /// already placed. Zero or non-finite dimensions count as a decode
    /// failure and drop the element.
    pub fn complete_image_load(&mut self, id: ElementId, natural_width: f64, natural_height: f64) -> EngineResult<()> {
        let Some(element) = self.store.get(id) else {
            log::debug!("Ignoring load of removed image {}", id);
            return Err(EngineError::NotFound(id));
        };
        if element.kind() != ElementKind::Image {
            log::warn!("Load callback for non-image element {}", id);
            return Err(EngineError::KindMismatch(id));
        }
        if element.is_ready() {
            log::debug!("Image {} is already loaded, keeping its placement", id);
            return Ok(());
        }

        let valid = |v: f64| v > 0.0 && v.is_finite();
        if !(valid(natural_width) && valid(natural_height)) {
            log::warn!("Image {} reported unusable size {}x{}", id, natural_width, natural_height);
            self.fail_image_load(id);
            return Err(EngineError::DegenerateTransform {
                width: natural_width,
                height: natural_height,
            });
        }

        let natural = Size::new(natural_width, natural_height);
        let size_percent = placement::initial_size_percent(natural, &self.config.printable_area, self.config.fit_margin);
        if let Some(DesignElement::Image(image)) = self.store.get_mut(id) {
            image.natural_size = Some(natural);
            image.size_percent = size_percent;
        }
        log::info!("Image {} loaded at {}x{}, placed at {:.2}%", id, natural_width, natural_height, size_percent);
        self.events.push(CompositionEvent::ImageLoaded(id));
        Ok(())
    }

    /// Load callback: the image could not be decoded. The element is dropped.
    pub fn fail_image_load(&mut self, id: ElementId) {
        if self.store.get(id).is_some_and(|e| !e.is_ready()) {
            log::warn!("Image {} failed to load, removing it", id);
            if self.drop_element(id).is_ok() {
                self.events.push(CompositionEvent::ImageFailed(id));
            }
        } else {
            log::debug!("Ignoring load failure for {}", id);
        }
    }

    /// Swap the resource behind an image. The image goes back to loading and
    /// keeps its position; its size is recomputed when the new resource loads.
    pub fn replace_image(&mut self, id: ElementId, resource: ImageResource) -> EngineResult<()> {
        match self.store.get_mut(id) {
            Some(DesignElement::Image(image)) => {
                image.resource_url = resource.url;
                image.natural_size = None;
            }
            Some(_) => {
                log::warn!("Cannot replace the resource of non-image element {}", id);
                return Err(EngineError::KindMismatch(id));
            }
            None => {
                log::warn!("Cannot replace image {}: not found", id);
                return Err(EngineError::NotFound(id));
            }
        }
        if self.gesture.as_ref().is_some_and(|g| g.id() == id) {
            self.gesture = None;
        }
        self.events.push(CompositionEvent::ElementUpdated(id));
        Ok(())
    }

    /// Record the renderer's measured layout size of a text element (reference units).
    pub fn set_text_measurement(&mut self, id: ElementId, size: Size) -> EngineResult<()> {
        match self.store.get_mut(id) {
            Some(DesignElement::Text(text)) => {
                text.set_measured_size(size);
                Ok(())
            }
            Some(_) => {
                log::warn!("Cannot measure non-text element {}", id);
                Err(EngineError::KindMismatch(id))
            }
            None => {
                log::warn!("Cannot measure text {}: not found", id);
                Err(EngineError::NotFound(id))
            }
        }
    }

    // --- Viewport ---

    /// Resize observer callback with the container's current width.
    ///
    /// Returns `true` when the width changed. Invalid widths are logged and ignored.
    pub fn observe_container_width(&mut self, width: f64) -> bool {
        match self.viewport.observe_width(width) {
            Ok(true) => {
                if self.gesture.take().is_some() {
                    log::debug!("Container resized mid-gesture, gesture dropped");
                }
                let effective = self.effective_area();
                self.events.push(CompositionEvent::AreaChanged(effective));
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("Ignoring resize: {}", e);
                false
            }
        }
    }

    /// Toggle the dashed printable-area outline.
    pub fn set_show_printable_area(&mut self, show: bool) {
        self.show_printable_area = show;
    }

    pub fn show_printable_area(&self) -> bool {
        self.show_printable_area
    }

    // --- Pointer input (screen space) ---

    /// Topmost element under a screen point.
    pub fn element_at(&self, screen_point: Point) -> Option<ElementId> {
        let scale = self.scale();
        self.store.hit_test(to_reference(screen_point, scale), CLICK_TOLERANCE / scale)
    }

    /// Click or tap on the canvas: selects the element under the pointer, or
    /// clears the selection on empty background.
    pub fn click_at(&mut self, screen_point: Point) -> Option<ElementId> {
        let hit = self.element_at(screen_point);
        let target = match hit.and_then(|id| self.store.get(id)) {
            Some(element) => ClickTarget::Element(element.id(), element.kind()),
            None => ClickTarget::Background,
        };
        self.selection.click(target);
        self.flush_selection_signals();
        hit
    }

    /// A pointer went down outside the canvas and the editing panel.
    pub fn pointer_down_outside(&mut self) {
        self.selection.pointer_down_outside();
        self.flush_selection_signals();
    }

    /// Transform handle of the selected element under a screen point.
    pub fn handle_at(&self, screen_point: Point) -> Option<HandleKind> {
        let node = self.selected_node()?;
        node.hit_test_handles(screen_point, crate::interaction::HANDLE_HIT_TOLERANCE)
    }

    fn node_for(&self, id: ElementId) -> EngineResult<SceneNode> {
        if let Some(gesture) = &self.gesture {
            if gesture.id() == id {
                return Ok(gesture.node().clone());
            }
        }
        let element = self.store.get(id).ok_or(EngineError::NotFound(id))?;
        SceneNode::from_element(element, self.scale())
    }

    fn selected_node(&self) -> Option<SceneNode> {
        let id = self.selection.current().id()?;
        self.node_for(id).ok()
    }

    /// Start dragging an element from a screen point.
    pub fn begin_drag(&mut self, id: ElementId, pointer: Point) -> EngineResult<()> {
        let node = self.node_for(id).inspect_err(|e| log::warn!("Cannot drag {}: {}", id, e))?;
        self.gesture = Some(Gesture::drag(node, pointer));
        Ok(())
    }

    /// Start dragging a transform handle of the selected element.
    pub fn begin_transform(&mut self, handle: HandleKind, pointer: Point) -> EngineResult<()> {
        let id = self.selection.current().id().ok_or(EngineError::NoSelection)?;
        let node = self.node_for(id).inspect_err(|e| log::warn!("Cannot transform {}: {}", id, e))?;
        self.gesture = Some(Gesture::transform(node, handle, pointer));
        Ok(())
    }

    /// Feed a pointer move into the in-progress gesture.
    pub fn gesture_to(&mut self, pointer: Point) {
        let scale = self.scale();
        let limits = self.image_limits();
        if let Some(gesture) = &mut self.gesture {
            let limits = (gesture.node().kind == ElementKind::Image).then_some(&limits);
            gesture.update(pointer, limits, scale);
        }
    }

    /// Commit the in-progress gesture into the store.
    pub fn end_gesture(&mut self) -> EngineResult<()> {
        let Some(gesture) = self.gesture.take() else {
            return Ok(());
        };
        let scale = self.scale();
        let id = gesture.id();
        let patch = match gesture {
            Gesture::Drag { node, .. } => commit_drag(&node, scale),
            Gesture::Transform { mut node, .. } => {
                let element = self.store.get(id).ok_or(EngineError::NotFound(id))?;
                commit_transform(element, &mut node, scale)
            }
        };
        log::debug!("Committing gesture on {}: {:?}", id, patch);
        self.commit(id, &patch)
    }

    /// Abandon the in-progress gesture without committing.
    pub fn cancel_gesture(&mut self) {
        self.gesture = None;
    }

    // --- Queries ---

    /// Whether an element's rendered box lies entirely inside the printable area.
    pub fn is_within_printable_area(&self, id: ElementId) -> EngineResult<bool> {
        let element = self.store.get(id).ok_or(EngineError::NotFound(id))?;
        Ok(self.config.printable_area.contains_rect(element.extent_rect()?))
    }

    /// Build the frame to render.
    pub fn scene(&self) -> SceneFrame {
        let scale = self.scale();
        let effective_area = self.effective_area();
        let nodes: Vec<SceneNode> = self
            .store
            .ids()
            .iter()
            .filter_map(|&id| self.node_for(id).ok())
            .collect();
        let selected = self.selection.current().id();
        let handles = selected
            .and_then(|id| nodes.iter().find(|n| n.id == id))
            .map(SceneNode::handles)
            .unwrap_or_default();

        SceneFrame {
            container_width: self.viewport.container_width(),
            scale,
            effective_area,
            outline: self.show_printable_area.then(|| effective_area.to_rect()),
            clip: effective_area.to_rect(),
            nodes,
            selected,
            handles,
        }
    }

    /// Check and clear whether the area overlay needs a redraw.
    pub fn take_overlay_dirty(&mut self) -> bool {
        self.viewport.take_overlay_dirty()
    }
}

impl DesignSurface for Composer {
    fn add_image(&mut self, resource: ImageResource) -> ElementId {
        let image = ImageElement::new(resource, self.config.printable_area.center());
        let id = self.insert(DesignElement::Image(image));
        log::info!("Added image {} (loading)", id);
        id
    }

    fn add_text(&mut self, text: &str, font_size: f64, color: SerializableColor) -> EngineResult<ElementId> {
        if text.trim().is_empty() {
            log::warn!("Refusing to add empty text");
            return Err(EngineError::EmptyText);
        }
        if !(font_size > 0.0 && font_size.is_finite()) {
            log::warn!("Refusing to add text with font size {}", font_size);
            return Err(EngineError::DegenerateTransform {
                width: font_size,
                height: font_size,
            });
        }
        let element = TextElement::new(text, font_size, color, self.config.printable_area.center());
        let id = self.insert(DesignElement::Text(element));
        log::info!("Added text {}", id);
        Ok(id)
    }

    fn update_element(&mut self, id: ElementId, patch: ElementPatch) -> EngineResult<()> {
        self.commit(id, &patch)
            .inspect_err(|e| log::warn!("Update of {} rejected: {}", id, e))
    }

    fn remove_element(&mut self, id: ElementId) -> EngineResult<()> {
        self.drop_element(id)
            .map(|_| log::info!("Removed element {}", id))
            .inspect_err(|e| log::warn!("Remove failed: {}", e))
    }

    fn select(&mut self, id: Option<ElementId>) {
        match id {
            Some(id) => match self.store.get(id) {
                Some(element) => {
                    let kind = element.kind();
                    self.selection.request(Some((id, kind)));
                }
                None => {
                    log::warn!("Cannot select {}: not found", id);
                    return;
                }
            },
            None => self.selection.request(None),
        }
        self.flush_selection_signals();
    }

    fn align_selected(&mut self, horizontal: Option<HAlign>, vertical: Option<VAlign>) -> EngineResult<()> {
        let result = self.selected_element().and_then(|element| {
            let patch = placement::align_element(element, &self.config.printable_area, horizontal, vertical)?;
            Ok((element.id(), patch))
        });
        match result {
            Ok((id, patch)) => self.commit(id, &patch),
            Err(e) => {
                log::warn!("Cannot align: {}", e);
                Err(e)
            }
        }
    }

    fn apply_preset(&mut self, preset: Preset) -> EngineResult<()> {
        let result = self.selected_element().and_then(|element| {
            let patch =
                placement::preset_element(element, &self.config.printable_area, preset, self.config.pocket_divisor)?;
            Ok((element.id(), patch))
        });
        match result {
            Ok((id, patch)) => {
                log::debug!("Applying preset {} to {}", preset, id);
                self.commit(id, &patch)
            }
            Err(e) => {
                log::warn!("Cannot apply preset {}: {}", preset, e);
                Err(e)
            }
        }
    }

    fn container_width(&self) -> f64 {
        self.viewport.container_width()
    }
}
