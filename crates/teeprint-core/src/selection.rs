//! Exclusive selection across element kinds.
//!
//! The selection is a single tagged value, so an image and a text element can
//! never be active at the same time.

use crate::elements::{ElementId, ElementKind};
use serde::{Deserialize, Serialize};

/// The active selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    Idle,
    /// An image is selected and shows its transform handles.
    Image(ElementId),
    /// A text label is selected and shows its transform handles.
    Text(ElementId),
}

impl Selection {
    /// Selection of an element of the given kind.
    pub fn of(id: ElementId, kind: ElementKind) -> Self {
        match kind {
            ElementKind::Image => Selection::Image(id),
            ElementKind::Text => Selection::Text(id),
        }
    }

    /// Id of the selected element, if any.
    pub fn id(&self) -> Option<ElementId> {
        match self {
            Selection::Idle => None,
            Selection::Image(id) | Selection::Text(id) => Some(*id),
        }
    }

    /// Kind of the selected element, if any.
    pub fn kind(&self) -> Option<ElementKind> {
        match self {
            Selection::Idle => None,
            Selection::Image(_) => Some(ElementKind::Image),
            Selection::Text(_) => Some(ElementKind::Text),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.id() == Some(id)
    }
}

/// Signal emitted to the consumers of each element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSignal {
    /// Consumers of this kind must drop their selection highlight.
    Deselect(ElementKind),
    /// The selection changed to a new value.
    Changed(Selection),
}

/// What a canvas click landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// An element node.
    Element(ElementId, ElementKind),
    /// Empty canvas background.
    Background,
}

/// Tracks the active selection and queues the signals its transitions emit.
#[derive(Debug, Clone, Default)]
pub struct SelectionMachine {
    current: Selection,
    signals: Vec<SelectionSignal>,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current selection.
    pub fn current(&self) -> Selection {
        self.current
    }

    /// Handle a click or tap on the canvas.
    pub fn click(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::Element(id, kind) => self.activate(id, kind),
            ClickTarget::Background => self.clear(),
        }
    }

    /// Force a selection from outside the canvas (e.g. a layer list).
    pub fn request(&mut self, target: Option<(ElementId, ElementKind)>) {
        match target {
            Some((id, kind)) => self.activate(id, kind),
            None => self.clear(),
        }
    }

    /// A pointer went down outside both the canvas and the editing panel.
    pub fn pointer_down_outside(&mut self) {
        self.clear();
    }

    /// Forget the selection if it points at a removed element.
    pub fn element_removed(&mut self, id: ElementId) {
        if self.current.is_selected(id) {
            self.clear();
        }
    }

    /// Take the queued signals.
    pub fn drain_signals(&mut self) -> Vec<SelectionSignal> {
        std::mem::take(&mut self.signals)
    }

    fn activate(&mut self, id: ElementId, kind: ElementKind) {
        let other = match kind {
            ElementKind::Image => ElementKind::Text,
            ElementKind::Text => ElementKind::Image,
        };
        self.signals.push(SelectionSignal::Deselect(other));
        self.transition(Selection::of(id, kind));
    }

    fn clear(&mut self) {
        if let Some(kind) = self.current.kind() {
            self.signals.push(SelectionSignal::Deselect(kind));
        }
        self.transition(Selection::Idle);
    }

    fn transition(&mut self, next: Selection) {
        if self.current != next {
            log::debug!("Selection {:?} -> {:?}", self.current, next);
            self.current = next;
            self.signals.push(SelectionSignal::Changed(next));
        }
    }
}
