//! egui viewport adapter

use glam::Vec2;
use sketch_core::SketchEngine;

use super::{SketchInput, SketchKey};
use crate::controller::SketchController;

/// Translate one frame of egui input over a viewport into sketch events.
///
/// Positions are made relative to the viewport's top-left corner. Pointer
/// events outside the viewport are dropped; key presses are always kept.
pub fn collect_inputs(response: &egui::Response, ui: &egui::Ui) -> Vec<SketchInput> {
    let rect = response.rect;
    let local = |p: egui::Pos2| Vec2::new(p.x - rect.min.x, p.y - rect.min.y);
    let mut inputs = Vec::new();

    ui.input(|i| {
        if i.pointer.is_moving()
            && let Some(pos) = i.pointer.hover_pos().filter(|p| rect.contains(*p))
        {
            inputs.push(SketchInput::PointerMove { pos: local(pos) });
        }

        if let Some(pos) = i.pointer.interact_pos().filter(|p| rect.contains(*p)) {
            if i.pointer.primary_pressed() {
                inputs.push(SketchInput::PointerDown { pos: local(pos) });
            }
            if i.pointer.primary_released() {
                inputs.push(SketchInput::PointerUp { pos: local(pos) });
            }
        }

        if i.key_pressed(egui::Key::Escape) {
            inputs.push(SketchInput::KeyDown {
                key: SketchKey::Escape,
            });
        }
        if i.key_pressed(egui::Key::Enter) {
            inputs.push(SketchInput::KeyDown {
                key: SketchKey::Enter,
            });
        }
    });

    if response.double_clicked()
        && let Some(pos) = response.interact_pointer_pos()
    {
        inputs.push(SketchInput::DoubleClick { pos: local(pos) });
    }

    inputs
}

/// Forward a frame of egui input to the controller.
///
/// Returns true if any event was consumed by sketch mode.
pub fn handle_egui_input<E: SketchEngine>(
    controller: &mut SketchController<E>,
    response: &egui::Response,
    ui: &egui::Ui,
) -> bool {
    let mut consumed = false;
    for input in collect_inputs(response, ui) {
        consumed |= controller.handle_input(input);
    }
    consumed
}
