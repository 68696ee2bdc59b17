//! Teeprint Core Library
//!
//! Platform-agnostic composition engine for placing images and text onto the
//! printable area of a garment mockup.

pub mod area;
pub mod composer;
pub mod config;
pub mod elements;
pub mod error;
pub mod interaction;
pub mod placement;
pub mod selection;
pub mod store;
pub mod viewport;

pub use area::{PrintableArea, REFERENCE_WIDTH, scale_area};
pub use composer::{CompositionEvent, Composer, DesignSurface, SceneFrame};
pub use config::{ConfigError, EngineConfig};
pub use elements::{
    DesignElement, ElementId, ElementKind, ElementPatch, ImageElement, ImageResource, SerializableColor, TextElement,
};
pub use error::{EngineError, EngineResult};
pub use interaction::{SceneNode, normalize_rotation};
pub use placement::{HAlign, Preset, VAlign};
pub use selection::{Selection, SelectionMachine};
pub use store::ElementStore;
pub use viewport::Viewport;
