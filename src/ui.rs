// src/ui.rs
use egui;
use glam::Vec3;

pub fn build_ui(ctx: &egui::Context, player_pos: Vec3, cursor_grabbed: bool) {
    egui::Window::new("Controls & Info")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            ui.vertical(|ui| {
                ui.label("Recursive Portal Demo");
                ui.separator();

                ui.label(format!(
                    "Player: ({:.1}, {:.1}, {:.1})",
                    player_pos.x, player_pos.y, player_pos.z
                ));
                ui.label(if cursor_grabbed {
                    "Mouse: grabbed"
                } else {
                    "Mouse: free (click to grab)"
                });
                ui.separator();

                ui.label("🎮 Keyboard Controls:");
                ui.label("   W/A/S/D: Move");
                ui.label("   Space: Jump");
                ui.label("   Arrow Keys: Look Up/Down/Left/Right");
                ui.label("   Mouse (when grabbed): Look");
                ui.label("   Escape: Grab/Ungrab Mouse Cursor");
            });
        });
}
