//! Scripted composition sessions.
//!
//! A script is a JSON list of steps. Elements are referred to by their
//! position in creation order (`0` is the first element the script added),
//! since ids are only assigned at runtime.

use crate::error::{AppError, AppResult};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::path::Path;
use teeprint_core::interaction::HandleKind;
use teeprint_core::{
    Composer, DesignElement, DesignSurface, ElementId, ElementPatch, EngineConfig, HAlign, ImageResource, Preset,
    Selection, SerializableColor, VAlign,
};

/// One user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// The container was laid out at a new width.
    Resize { width: f64 },
    /// Upload an image. With `natural` set the load completes immediately.
    AddImage {
        url: String,
        #[serde(default)]
        natural: Option<Size>,
    },
    /// The renderer finished decoding an image.
    LoadImage { target: usize, width: f64, height: f64 },
    /// The renderer failed to decode an image.
    FailImage { target: usize },
    ReplaceImage { target: usize, url: String },
    /// Add a text label; the font size falls back to the configured default.
    AddText {
        text: String,
        #[serde(default)]
        font_size: Option<f64>,
        #[serde(default)]
        color: Option<String>,
    },
    /// The renderer measured a text label.
    MeasureText { target: usize, width: f64, height: f64 },
    Update { target: usize, patch: ElementPatch },
    Remove { target: usize },
    Select {
        #[serde(default)]
        target: Option<usize>,
    },
    Click { at: Point },
    PointerOutside,
    Align {
        #[serde(default)]
        horizontal: Option<HAlign>,
        #[serde(default)]
        vertical: Option<VAlign>,
    },
    Preset { preset: Preset },
    Drag { target: usize, from: Point, to: Point },
    /// Drag a handle of the selected element. Without `handle` the handle
    /// under `from` is used.
    Transform {
        #[serde(default)]
        handle: Option<HandleKind>,
        from: Point,
        to: Point,
    },
    ShowArea { show: bool },
    /// Record a frame summary.
    Frame,
}

/// A parsed session script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(|e| AppError::Script(e.to_string()))
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

/// What a renderer would show after a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub container_width: f64,
    pub scale: f64,
    pub selection: Selection,
    /// Elements drawn this frame.
    pub rendered: usize,
    /// Images still waiting for their load callback.
    pub pending: usize,
    /// Elements that stick out of the printable area.
    pub outside_area: Vec<ElementId>,
    pub outline_shown: bool,
}

/// A running session: the engine plus the ids the script has created.
#[derive(Debug)]
pub struct Session {
    composer: Composer,
    created: Vec<ElementId>,
}

impl Session {
    /// Start a session; fails when the configuration is invalid.
    pub fn new(config: EngineConfig) -> AppResult<Self> {
        Ok(Self {
            composer: Composer::new(config)?,
            created: Vec::new(),
        })
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Ids created so far, in creation order.
    pub fn created(&self) -> &[ElementId] {
        &self.created
    }

    /// Replay a script, returning the summary of every `frame` step plus the final frame.
    ///
    /// Engine rejections are logged and the replay continues; only script
    /// mistakes abort it.
    pub fn run(&mut self, script: &Script) -> AppResult<Vec<FrameSummary>> {
        let mut frames = Vec::new();
        for (index, step) in script.steps.iter().enumerate() {
            log::debug!("Step {}: {:?}", index, step);
            if let Some(frame) = self.apply(index, step)? {
                frames.push(frame);
            }
            for event in self.composer.drain_events() {
                log::debug!("Event: {:?}", event);
            }
        }
        frames.push(self.summary());
        Ok(frames)
    }

    fn target(&self, step: usize, target: usize) -> AppResult<ElementId> {
        self.created
            .get(target)
            .copied()
            .ok_or(AppError::UnknownTarget { step, target })
    }

    fn apply(&mut self, index: usize, step: &Step) -> AppResult<Option<FrameSummary>> {
        // Engine errors have already been logged by the composer.
        match step {
            Step::Resize { width } => {
                self.composer.observe_container_width(*width);
            }
            Step::AddImage { url, natural } => {
                let id = self.composer.add_image(ImageResource::new(url.clone()));
                self.created.push(id);
                if let Some(natural) = natural {
                    let _ = self.composer.complete_image_load(id, natural.width, natural.height);
                }
            }
            Step::LoadImage { target, width, height } => {
                let id = self.target(index, *target)?;
                let _ = self.composer.complete_image_load(id, *width, *height);
            }
            Step::FailImage { target } => {
                let id = self.target(index, *target)?;
                self.composer.fail_image_load(id);
            }
            Step::ReplaceImage { target, url } => {
                let id = self.target(index, *target)?;
                let _ = self.composer.replace_image(id, ImageResource::new(url.clone()));
            }
            Step::AddText { text, font_size, color } => {
                let color = match color {
                    Some(hex) => SerializableColor::from_hex(hex)
                        .ok_or_else(|| AppError::Script(format!("step {}: invalid color {:?}", index, hex)))?,
                    None => SerializableColor::black(),
                };
                let font_size = font_size.unwrap_or(self.composer.config().default_font_size);
                if let Ok(id) = self.composer.add_text(text, font_size, color) {
                    self.created.push(id);
                }
            }
            Step::MeasureText { target, width, height } => {
                let id = self.target(index, *target)?;
                let _ = self.composer.set_text_measurement(id, Size::new(*width, *height));
            }
            Step::Update { target, patch } => {
                let id = self.target(index, *target)?;
                let _ = self.composer.update_element(id, patch.clone());
            }
            Step::Remove { target } => {
                let id = self.target(index, *target)?;
                let _ = self.composer.remove_element(id);
            }
            Step::Select { target } => {
                let id = target.map(|t| self.target(index, t)).transpose()?;
                self.composer.select(id);
            }
            Step::Click { at } => {
                self.composer.click_at(*at);
            }
            Step::PointerOutside => self.composer.pointer_down_outside(),
            Step::Align { horizontal, vertical } => {
                let _ = self.composer.align_selected(*horizontal, *vertical);
            }
            Step::Preset { preset } => {
                let _ = self.composer.apply_preset(*preset);
            }
            Step::Drag { target, from, to } => {
                let id = self.target(index, *target)?;
                if self.composer.begin_drag(id, *from).is_ok() {
                    self.composer.gesture_to(*to);
                    let _ = self.composer.end_gesture();
                }
            }
            Step::Transform { handle, from, to } => {
                let Some(handle) = handle.or_else(|| self.composer.handle_at(*from)) else {
                    log::warn!("Step {}: no handle at ({}, {})", index, from.x, from.y);
                    return Ok(None);
                };
                if self.composer.begin_transform(handle, *from).is_ok() {
                    self.composer.gesture_to(*to);
                    let _ = self.composer.end_gesture();
                }
            }
            Step::ShowArea { show } => self.composer.set_show_printable_area(*show),
            Step::Frame => return Ok(Some(self.summary())),
        }
        Ok(None)
    }

    /// Summarize the current frame.
    pub fn summary(&self) -> FrameSummary {
        let frame = self.composer.scene();
        let store = self.composer.store();
        let outside_area = store
            .iter()
            .filter(|e| e.is_ready())
            .map(DesignElement::id)
            .filter(|&id| matches!(self.composer.is_within_printable_area(id), Ok(false)))
            .collect();

        FrameSummary {
            container_width: frame.container_width,
            scale: frame.scale,
            selection: self.composer.selection(),
            rendered: frame.nodes.len(),
            pending: store.len() - frame.nodes.len(),
            outside_area,
            outline_shown: frame.outline.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SESSION: &str = r##"[
        { "op": "add_image", "url": "blob:logo", "natural": { "width": 1000, "height": 1000 } },
        { "op": "add_text", "text": "Crew", "color": "#ff0000" },
        { "op": "align", "horizontal": "center", "vertical": "top" },
        { "op": "select", "target": 0 },
        { "op": "preset", "preset": "pocket" },
        { "op": "resize", "width": 1000 },
        { "op": "frame" },
        { "op": "drag", "target": 1, "from": { "x": 500, "y": 350 }, "to": { "x": 500, "y": 900 } },
        { "op": "show_area", "show": false }
    ]"##;

    #[test]
    fn test_parse_steps() {
        let script = Script::from_json(SESSION).unwrap();
        assert_eq!(script.steps.len(), 9);
        assert_eq!(script.steps[4], Step::Preset { preset: Preset::Pocket });
        assert_eq!(script.steps[5], Step::Resize { width: 1000.0 });
    }

    #[test]
    fn test_unknown_op_is_a_script_error() {
        let result = Script::from_json(r#"[{ "op": "print" }]"#);
        assert!(matches!(result, Err(AppError::Script(_))));
    }

    #[test]
    fn test_replay_session() {
        let script = Script::from_json(SESSION).unwrap();
        let mut session = Session::new(EngineConfig::default()).unwrap();
        let frames = session.run(&script).unwrap();
        assert_eq!(frames.len(), 2);

        let logo = session.created()[0];
        let crew = session.created()[1];
        let midway = &frames[0];
        assert!((midway.scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(midway.selection, Selection::Image(logo));
        assert_eq!(midway.rendered, 2);
        assert!(midway.outside_area.is_empty());

        let last = &frames[1];
        assert!(!last.outline_shown);
        assert_eq!(last.outside_area, vec![crew]);

        let text = session.composer().element(crew).and_then(DesignElement::as_text).unwrap();
        assert!((text.font_size - 20.0).abs() < f64::EPSILON);
        assert_eq!(text.color, SerializableColor::new(255, 0, 0, 255));
        // Aligned to y = 162, then dragged 550 screen pixels down at 2x.
        assert!((text.center.y - 437.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = EngineConfig {
            initial_container_width: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(Session::new(config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_target_aborts() {
        let script = Script::from_json(r#"[{ "op": "remove", "target": 3 }]"#).unwrap();
        let mut session = Session::new(EngineConfig::default()).unwrap();
        assert!(matches!(
            session.run(&script),
            Err(AppError::UnknownTarget { step: 0, target: 3 })
        ));
    }

    #[test]
    fn test_pending_images_are_counted() {
        let script = Script::from_json(r#"[{ "op": "add_image", "url": "blob:slow" }]"#).unwrap();
        let mut session = Session::new(EngineConfig::default()).unwrap();
        let frames = session.run(&script).unwrap();
        assert_eq!(frames[0].rendered, 0);
        assert_eq!(frames[0].pending, 1);
    }

    #[test]
    fn test_load_script_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SESSION.as_bytes()).unwrap();
        let script = Script::load(file.path()).unwrap();
        assert_eq!(script.steps.len(), 9);

        assert!(matches!(Script::load(Path::new("/nonexistent/session.json")), Err(AppError::Io(_))));
    }
}
