//! Ordered element storage.

use crate::elements::{DesignElement, ElementId, ElementPatch};
use crate::error::{EngineError, EngineResult};
use kurbo::Point;
use std::collections::HashMap;
use uuid::Uuid;

/// All placed elements, keyed by id, with their stacking order.
///
/// Rendering order is insertion order: later elements draw on top. Every
/// mutation preserves the relative order of the surviving elements.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: HashMap<ElementId, DesignElement>,
    /// Z-order of elements (back to front).
    z_order: Vec<ElementId>,
}

impl ElementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element, assigning a fresh id if it has none.
    ///
    /// An element whose id is already taken is re-keyed rather than allowed
    /// to shadow the existing one.
    pub fn add(&mut self, mut element: DesignElement) -> ElementId {
        if element.id().is_nil() || self.elements.contains_key(&element.id()) {
            element.set_id(Uuid::new_v4());
        }
        let id = element.id();
        self.z_order.push(id);
        self.elements.insert(id, element);
        id
    }

    /// Merge a patch into the element with the given id.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> EngineResult<()> {
        let element = self.elements.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        element.apply(patch)
    }

    /// Remove an element, returning it.
    pub fn remove(&mut self, id: ElementId) -> EngineResult<DesignElement> {
        let element = self.elements.remove(&id).ok_or(EngineError::NotFound(id))?;
        self.z_order.retain(|&element_id| element_id != id);
        Ok(element)
    }

    /// Get an element by id.
    pub fn get(&self, id: ElementId) -> Option<&DesignElement> {
        self.elements.get(&id)
    }

    /// Get a mutable reference to an element by id.
    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut DesignElement> {
        self.elements.get_mut(&id)
    }

    /// Check whether an element with the given id exists.
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Elements in z-order (back to front).
    pub fn iter(&self) -> impl Iterator<Item = &DesignElement> {
        self.z_order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Ids in z-order (back to front).
    pub fn ids(&self) -> &[ElementId] {
        &self.z_order
    }

    /// Find the topmost element at a reference-space point.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<ElementId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.elements.get(id).is_some_and(|e| e.hit_test(point, tolerance)))
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ImageElement, ImageResource, SerializableColor, TextElement};
    use kurbo::Size;

    fn text(label: &str) -> DesignElement {
        DesignElement::Text(TextElement::new(label, 20.0, SerializableColor::black(), Point::new(250.0, 250.0)))
    }

    fn image_at(center: Point) -> DesignElement {
        let mut image = ImageElement::new(ImageResource::new("blob:img"), center);
        image.natural_size = Some(Size::new(100.0, 100.0));
        DesignElement::Image(image)
    }

    fn labels(store: &ElementStore) -> Vec<String> {
        store.iter().filter_map(|e| e.as_text().map(|t| t.text.clone())).collect()
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut store = ElementStore::new();
        let a = store.add(text("a"));
        let b = store.add(text("b"));
        assert!(!a.is_nil());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a).unwrap().id(), a);
    }

    #[test]
    fn test_add_rekeys_duplicate_id() {
        let mut store = ElementStore::new();
        let a = store.add(text("a"));
        let mut copy = store.get(a).unwrap().clone();
        copy.set_id(a);
        let b = store.add(copy);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = ElementStore::new();
        store.add(text("a"));
        let missing = Uuid::new_v4();
        assert_eq!(store.update(missing, &ElementPatch::new().x(1.0)), Err(EngineError::NotFound(missing)));
    }

    #[test]
    fn test_update_touches_only_target() {
        let mut store = ElementStore::new();
        let a = store.add(text("a"));
        let b = store.add(text("b"));
        store.update(a, &ElementPatch::new().position(Point::new(10.0, 20.0))).unwrap();

        assert_eq!(store.get(a).unwrap().center(), Point::new(10.0, 20.0));
        assert_eq!(store.get(b).unwrap().center(), Point::new(250.0, 250.0));
    }

    #[test]
    fn test_remove_from_middle_preserves_order() {
        let mut store = ElementStore::new();
        let _a = store.add(text("a"));
        let b = store.add(text("b"));
        let _c = store.add(text("c"));
        let d = store.add(text("d"));

        store.remove(b).unwrap();
        assert_eq!(labels(&store), vec!["a", "c", "d"]);

        store.update(d, &ElementPatch::new().text("D")).unwrap();
        store.add(text("e"));
        assert_eq!(labels(&store), vec!["a", "c", "D", "e"]);
        assert!(store.remove(b).is_err());
    }

    #[test]
    fn test_order_preserved_over_mixed_sequence() {
        let mut store = ElementStore::new();
        let mut expected: Vec<ElementId> = Vec::new();
        for round in 0..20 {
            let id = store.add(text(&format!("t{round}")));
            expected.push(id);
            if round % 3 == 2 {
                let victim = expected.remove(expected.len() / 2);
                store.remove(victim).unwrap();
            }
            if let Some(&first) = expected.first() {
                store.update(first, &ElementPatch::new().rotation(round as f64 * 10.0)).unwrap();
            }
            assert_eq!(store.ids(), expected.as_slice());
        }
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut store = ElementStore::new();
        let back = store.add(image_at(Point::new(100.0, 100.0)));
        let front = store.add(image_at(Point::new(150.0, 150.0)));

        assert_eq!(store.hit_test(Point::new(140.0, 140.0), 0.0), Some(front));
        assert_eq!(store.hit_test(Point::new(60.0, 60.0), 0.0), Some(back));
        assert_eq!(store.hit_test(Point::new(400.0, 400.0), 0.0), None);
    }
}
