//! Interactive editing session for one sticker.
//!
//! The session owns everything the editor UI needs per open sticker: the
//! document layers, the current selection, crop mode, the active drag and
//! the outstanding effect tasks. It is a plain value; embedders hold one
//! per editor instance and there is no ambient global state.
//!
//! # Drag protocol
//!
//! A grabbed handle calls [`EditorSession::pointer_down`] with the gesture
//! it represents. Every pointer move then recomputes geometry onto an
//! optimistic working copy; the committed layer only changes on release.
//! A move reporting zero pressure counts as a release. Switching the
//! selection discards the working copy. Moves while idle are inert, so a
//! stray event cannot corrupt geometry.
//!
//! # Effects
//!
//! Effects run on the worker pool and report back through task handles;
//! [`EditorSession::poll_effects`] applies finished replacements on the
//! caller's thread. A layer with an outstanding handle refuses new drags
//! and new effects, which is the "dimmed while processing" state of the
//! editor.

use image::Rgba;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::effects::{
    self, outline, BackgroundRemover, EffectOutcome, EffectTask,
};
use crate::entities::layer::Layer;
use crate::entities::sticker::Sticker;
use crate::entities::transform::{self, Corner};
use crate::error::Result;
use crate::workers::Workers;

/// Drag gesture requested by a grabbed handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragKind {
    /// Drag the layer body.
    Translate,
    /// Drag a corner resize handle.
    Resize(Corner),
    /// Drag the rotate handle.
    Rotate,
    /// Drag a crop-window corner handle.
    CropResize(Corner),
    /// Drag the layer body in crop mode.
    CropPan,
}

/// Observable interaction state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionMode {
    Idle,
    Translating,
    Resizing(Corner),
    Rotating,
    CroppingWindow(Corner),
    PanningCrop,
}

/// One pointer movement report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerMove {
    /// Pointer position on the canvas.
    pub x: f64,
    pub y: f64,
    /// Movement since the previous report.
    pub dx: f64,
    pub dy: f64,
    /// False once the button is no longer held; treated as a release.
    pub pressed: bool,
}

/// In-progress drag: the gesture plus the working copy it mutates.
struct ActiveDrag {
    kind: DragKind,
    working: Layer,
}

/// Editing state for one open sticker.
pub struct EditorSession {
    sticker: Sticker,
    selected: Option<Uuid>,
    crop_mode: bool,
    drag: Option<ActiveDrag>,
    tasks: Vec<EffectTask>,
}

impl EditorSession {
    pub fn new(sticker: Sticker) -> Self {
        Self {
            sticker,
            selected: None,
            crop_mode: false,
            drag: None,
            tasks: Vec::new(),
        }
    }

    /// The committed document state.
    pub fn sticker(&self) -> &Sticker {
        &self.sticker
    }

    /// Give up the session, keeping the committed document.
    ///
    /// Outstanding effect results are discarded with the handles.
    pub fn into_sticker(self) -> Sticker {
        self.sticker
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn crop_mode(&self) -> bool {
        self.crop_mode
    }

    pub fn mode(&self) -> InteractionMode {
        match &self.drag {
            None => InteractionMode::Idle,
            Some(d) => match d.kind {
                DragKind::Translate => InteractionMode::Translating,
                DragKind::Resize(c) => InteractionMode::Resizing(c),
                DragKind::Rotate => InteractionMode::Rotating,
                DragKind::CropResize(c) => InteractionMode::CroppingWindow(c),
                DragKind::CropPan => InteractionMode::PanningCrop,
            },
        }
    }

    /// Layer as it should be displayed: the working copy while it is being
    /// dragged, the committed layer otherwise.
    pub fn display_layer(&self, id: Uuid) -> Option<&Layer> {
        if let Some(d) = &self.drag {
            if d.working.id == id {
                return Some(&d.working);
            }
        }
        self.sticker.layer(id)
    }

    /// All layers in paint order, with the dragged layer's working copy
    /// substituted in.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.sticker.layers.iter().map(|l| match &self.drag {
            Some(d) if d.working.id == l.id => &d.working,
            _ => l,
        })
    }

    /// Change the selection.
    ///
    /// Ids not present on the sticker clear the selection. Changing the
    /// selection discards any pending drag and leaves crop mode.
    pub fn select(&mut self, id: Option<Uuid>) {
        let id = id.filter(|&i| self.sticker.layer(i).is_some());
        if id == self.selected {
            return;
        }
        if self.drag.take().is_some() {
            debug!("Drag cancelled by selection change");
        }
        self.crop_mode = false;
        self.selected = id;
    }

    /// Decode `content` into a new top layer and select it.
    pub fn add_layer(&mut self, content: String) -> Result<Uuid> {
        let layer = Layer::from_content(content)?;
        let id = layer.id;
        self.sticker.push_layer(layer);
        self.select(Some(id));
        Ok(id)
    }

    /// Delete a layer. Deleting the selected layer clears the selection.
    pub fn remove_layer(&mut self, id: Uuid) -> bool {
        if self.sticker.remove_layer(id).is_none() {
            return false;
        }
        if self.selected == Some(id) {
            self.drag = None;
            self.crop_mode = false;
            self.selected = None;
        }
        true
    }

    /// Delete the selected layer (the Backspace/Delete shortcut).
    pub fn remove_selected(&mut self) -> bool {
        match self.selected {
            Some(id) => self.remove_layer(id),
            None => false,
        }
    }

    /// Enter or leave crop mode for the selected layer.
    ///
    /// Returns the resulting state; entering requires a selection. Any
    /// active drag is discarded by the switch.
    pub fn set_crop_mode(&mut self, on: bool) -> bool {
        if on && self.selected.is_none() {
            return false;
        }
        if self.crop_mode != on {
            self.drag = None;
        }
        self.crop_mode = on;
        self.crop_mode
    }

    /// Start a drag on the selected layer.
    ///
    /// Refused (returns false) without a selection, while the layer has an
    /// effect in flight, or when the gesture does not match crop mode:
    /// crop gestures need crop mode on, the others need it off.
    pub fn pointer_down(&mut self, kind: DragKind) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        if self.effect_in_flight(id) {
            return false;
        }
        let cropping = matches!(kind, DragKind::CropResize(_) | DragKind::CropPan);
        if cropping != self.crop_mode {
            return false;
        }
        let Some(layer) = self.sticker.layer(id) else {
            return false;
        };
        self.drag = Some(ActiveDrag {
            kind,
            working: layer.clone(),
        });
        true
    }

    /// Feed a pointer movement into the active drag.
    ///
    /// Inert while idle. A zero-pressure report commits like a release,
    /// without applying its own delta.
    pub fn pointer_move(&mut self, m: PointerMove) {
        let Some(drag) = &mut self.drag else {
            return;
        };
        if !m.pressed {
            self.commit();
            return;
        }
        let patch = match drag.kind {
            DragKind::Translate => transform::translate(&drag.working, m.dx, m.dy),
            DragKind::Resize(c) => transform::resize(&drag.working, m.dx, m.dy, c),
            DragKind::Rotate => transform::rotate(&drag.working, m.x, m.y),
            DragKind::CropResize(c) => transform::crop_resize(&drag.working, m.dx, m.dy, c),
            DragKind::CropPan => transform::crop_pan(&drag.working, m.dx, m.dy),
        };
        drag.working.apply(&patch);
    }

    /// Release the active drag, committing the working copy.
    pub fn pointer_up(&mut self) {
        self.commit();
    }

    /// Write the working copy's geometry back to the document layer.
    ///
    /// Only geometry moves: an effect finishing mid-drag has already
    /// replaced the document content, and the stale copy in the working
    /// layer must not undo it.
    fn commit(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let Some(layer) = self.sticker.layer_mut(drag.working.id) else {
            return;
        };
        let w = &drag.working;
        layer.top = w.top;
        layer.left = w.left;
        layer.width = w.width;
        layer.height = w.height;
        layer.rotation = w.rotation;
        layer.cropped_top = w.cropped_top;
        layer.cropped_left = w.cropped_left;
        layer.cropped_width = w.cropped_width;
        layer.cropped_height = w.cropped_height;
        debug!("Committed {:?} on layer {}", drag.kind, w.id);
    }

    /// Launch background removal for the selected layer.
    ///
    /// Refused without a selection or while the layer already has an
    /// effect in flight.
    pub fn start_background_removal(
        &mut self,
        workers: &Workers,
        remover: Arc<dyn BackgroundRemover>,
    ) -> bool {
        let Some(layer) = self.effect_target() else {
            return false;
        };
        let task = effects::spawn_background_removal(workers, layer, remover);
        self.tasks.push(task);
        true
    }

    /// Launch the outline effect with the editor's stock stroke
    /// ([`outline::DEFAULT_COLOR`] at [`outline::DEFAULT_THICKNESS`]).
    pub fn start_outline_default(&mut self, workers: &Workers) -> bool {
        self.start_outline(workers, outline::DEFAULT_COLOR, outline::DEFAULT_THICKNESS)
    }

    /// Launch the outline effect for the selected layer.
    pub fn start_outline(&mut self, workers: &Workers, color: Rgba<u8>, thickness: u32) -> bool {
        let Some(layer) = self.effect_target() else {
            return false;
        };
        let task = effects::spawn_outline(workers, layer, color, thickness);
        self.tasks.push(task);
        true
    }

    fn effect_target(&self) -> Option<&Layer> {
        let id = self.selected?;
        if self.effect_in_flight(id) {
            return None;
        }
        self.sticker.layer(id)
    }

    /// True while an effect for this layer is outstanding.
    pub fn effect_in_flight(&self, id: Uuid) -> bool {
        self.tasks.iter().any(|t| t.layer_id() == id)
    }

    /// Layers with outstanding effects, for the processing cue.
    pub fn effects_in_flight(&self) -> Vec<Uuid> {
        self.tasks.iter().map(|t| t.layer_id()).collect()
    }

    /// Apply finished effect results. Returns how many layers changed.
    ///
    /// Results for layers deleted in the meantime are discarded. The
    /// handle leaves the in-flight set either way.
    pub fn poll_effects(&mut self) -> usize {
        let mut changed = 0;
        let tasks = std::mem::take(&mut self.tasks);
        for task in tasks {
            match task.try_complete() {
                None => self.tasks.push(task),
                Some(EffectOutcome::Unchanged) => {}
                Some(EffectOutcome::Replaced(content)) => {
                    if let Some(layer) = self.sticker.layer_mut(task.layer_id()) {
                        layer.content = content;
                        changed += 1;
                    }
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::layer::encode_png_data_url;
    use image::RgbaImage;
    use std::thread;
    use std::time::{Duration, Instant};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn content(w: u32, h: u32) -> String {
        let mut img = RgbaImage::new(w, h);
        img.put_pixel(w / 2, h / 2, Rgba([255, 0, 0, 255]));
        encode_png_data_url(&img).unwrap()
    }

    fn session_with_layer() -> (EditorSession, Uuid) {
        let mut session = EditorSession::new(Sticker::new());
        let id = session.add_layer(content(20, 10)).unwrap();
        (session, id)
    }

    fn held(dx: f64, dy: f64) -> PointerMove {
        PointerMove {
            x: 0.0,
            y: 0.0,
            dx,
            dy,
            pressed: true,
        }
    }

    fn drain_effects(session: &mut EditorSession) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut changed = 0;
        while !session.effects_in_flight().is_empty() {
            changed += session.poll_effects();
            assert!(Instant::now() < deadline, "effects did not finish");
            thread::sleep(Duration::from_millis(1));
        }
        changed
    }

    #[test]
    fn test_add_layer_selects_it() {
        let (session, id) = session_with_layer();
        assert_eq!(session.selected(), Some(id));
        assert_eq!(session.sticker().layers.len(), 1);
        assert_eq!(session.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_add_layer_failure_leaves_session_untouched() {
        let (mut session, id) = session_with_layer();
        assert!(session.add_layer("not an image".to_string()).is_err());
        assert_eq!(session.sticker().layers.len(), 1);
        assert_eq!(session.selected(), Some(id));
    }

    #[test]
    fn test_move_without_down_is_inert() {
        let (mut session, id) = session_with_layer();
        session.pointer_move(held(50.0, 50.0));
        let layer = session.sticker().layer(id).unwrap();
        assert_eq!((layer.top, layer.left), (0.0, 0.0));
        assert_eq!(session.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_pointer_down_requires_selection() {
        let (mut session, _id) = session_with_layer();
        session.select(None);
        assert!(!session.pointer_down(DragKind::Translate));
    }

    #[test]
    fn test_drag_commits_on_release() {
        let (mut session, id) = session_with_layer();
        assert!(session.pointer_down(DragKind::Translate));
        assert_eq!(session.mode(), InteractionMode::Translating);

        session.pointer_move(held(10.0, -5.0));

        // Mid-drag: document untouched, display shows the working copy
        let committed = session.sticker().layer(id).unwrap();
        assert_eq!((committed.top, committed.left), (0.0, 0.0));
        let shown = session.display_layer(id).unwrap();
        assert_eq!((shown.top, shown.left), (-5.0, 10.0));

        session.pointer_up();
        let committed = session.sticker().layer(id).unwrap();
        assert_eq!((committed.top, committed.left), (-5.0, 10.0));
        assert_eq!(session.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_deltas_accumulate_across_moves() {
        let (mut session, id) = session_with_layer();
        session.pointer_down(DragKind::Translate);
        session.pointer_move(held(3.0, 4.0));
        session.pointer_move(held(7.0, -4.0));
        session.pointer_up();
        let layer = session.sticker().layer(id).unwrap();
        assert_eq!((layer.top, layer.left), (0.0, 10.0));
    }

    #[test]
    fn test_zero_pressure_move_commits_without_its_delta() {
        let (mut session, id) = session_with_layer();
        session.pointer_down(DragKind::Translate);
        session.pointer_move(held(10.0, 0.0));
        session.pointer_move(PointerMove {
            x: 0.0,
            y: 0.0,
            dx: 10.0,
            dy: 0.0,
            pressed: false,
        });
        let layer = session.sticker().layer(id).unwrap();
        assert_eq!(layer.left, 10.0);
        assert_eq!(session.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_selection_switch_cancels_drag() {
        let (mut session, a) = session_with_layer();
        let b = session.add_layer(content(8, 8)).unwrap();
        session.select(Some(a));

        session.pointer_down(DragKind::Translate);
        session.pointer_move(held(25.0, 25.0));
        session.select(Some(b));

        let layer = session.sticker().layer(a).unwrap();
        assert_eq!((layer.top, layer.left), (0.0, 0.0));
        assert_eq!(session.mode(), InteractionMode::Idle);
        assert_eq!(session.selected(), Some(b));
    }

    #[test]
    fn test_rotate_drag_tracks_pointer() {
        let (mut session, id) = session_with_layer();
        session.pointer_down(DragKind::Rotate);
        // Layer is 20x10 at the origin, center (10, 5); pointer to the
        // right of the center reads 90 degrees
        session.pointer_move(PointerMove {
            x: 30.0,
            y: 5.0,
            dx: 0.0,
            dy: 0.0,
            pressed: true,
        });
        session.pointer_up();
        assert_eq!(session.sticker().layer(id).unwrap().rotation, 90.0);
    }

    #[test]
    fn test_crop_gestures_gated_by_crop_mode() {
        let (mut session, _id) = session_with_layer();
        assert!(!session.pointer_down(DragKind::CropResize(Corner::TopLeft)));
        assert!(!session.pointer_down(DragKind::CropPan));

        assert!(session.set_crop_mode(true));
        assert!(session.pointer_down(DragKind::CropResize(Corner::TopLeft)));
        session.pointer_up();
        assert!(session.pointer_down(DragKind::CropPan));
        session.pointer_up();
        // Normal gestures are refused while cropping
        assert!(!session.pointer_down(DragKind::Translate));

        assert!(!session.set_crop_mode(false));
        assert!(session.pointer_down(DragKind::Translate));
    }

    #[test]
    fn test_crop_mode_requires_selection() {
        let (mut session, _id) = session_with_layer();
        session.select(None);
        assert!(!session.set_crop_mode(true));
    }

    #[test]
    fn test_remove_selected_clears_selection() {
        let (mut session, _id) = session_with_layer();
        session.set_crop_mode(true);
        assert!(session.remove_selected());
        assert_eq!(session.selected(), None);
        assert!(!session.crop_mode());
        assert!(session.sticker().layers.is_empty());
        assert!(!session.remove_selected());
    }

    #[test]
    fn test_remove_unselected_layer_keeps_selection() {
        let (mut session, a) = session_with_layer();
        let b = session.add_layer(content(8, 8)).unwrap();
        assert!(session.remove_layer(a));
        assert_eq!(session.selected(), Some(b));
    }

    #[test]
    fn test_outline_effect_lifecycle() {
        let workers = Workers::new(1);
        let (mut session, id) = session_with_layer();
        let before = session.sticker().layer(id).unwrap().content.clone();

        assert!(session.start_outline(&workers, WHITE, 2));
        assert!(session.effect_in_flight(id));
        // One effect per layer at a time
        assert!(!session.start_outline(&workers, WHITE, 2));
        assert!(!session.pointer_down(DragKind::Translate));

        assert_eq!(drain_effects(&mut session), 1);
        assert!(!session.effect_in_flight(id));
        assert_ne!(session.sticker().layer(id).unwrap().content, before);
        assert!(session.pointer_down(DragKind::Translate));
    }

    #[test]
    fn test_default_outline_uses_stock_stroke() {
        let workers = Workers::new(1);
        let (mut session, id) = session_with_layer();

        assert!(session.start_outline_default(&workers));
        assert_eq!(drain_effects(&mut session), 1);

        // 20x10 layer with a red dot at (10, 5): the 10px white stroke
        // reaches the left edge on the dot's row, the dot itself stays red
        let img = session.sticker().layer(id).unwrap().decode_content().unwrap();
        assert_eq!(img.get_pixel(0, 5).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(10, 5).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_effect_result_for_deleted_layer_is_discarded() {
        let workers = Workers::new(1);
        let (mut session, id) = session_with_layer();
        assert!(session.start_outline(&workers, WHITE, 1));
        session.remove_layer(id);
        assert_eq!(drain_effects(&mut session), 0);
        assert!(session.sticker().layers.is_empty());
    }

    #[test]
    fn test_effect_applies_during_drag_and_commit_keeps_it() {
        let workers = Workers::new(1);
        let (mut session, id) = session_with_layer();
        let before = session.sticker().layer(id).unwrap().content.clone();

        session.pointer_down(DragKind::Translate);
        session.pointer_move(held(10.0, 0.0));
        assert!(session.start_outline(&workers, WHITE, 1));
        assert_eq!(drain_effects(&mut session), 1);

        session.pointer_up();
        let layer = session.sticker().layer(id).unwrap();
        assert_eq!(layer.left, 10.0);
        assert_ne!(layer.content, before);
    }

    #[test]
    fn test_requires_selection_for_effects() {
        let workers = Workers::new(1);
        let (mut session, _id) = session_with_layer();
        session.select(None);
        assert!(!session.start_outline(&workers, WHITE, 2));
    }
}
