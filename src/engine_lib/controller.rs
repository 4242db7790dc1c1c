// src/engine_lib/controller.rs

use glam::{Quat, Vec3};
use winit::{
    event::{DeviceEvent, ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

use crate::engine_lib::scene_types::Scene;

const MOVE_SPEED: f32 = 3.0;
const JUMP_SPEED: f32 = 5.0;
const GRAVITY: f32 = -9.81;
const KILL_HEIGHT: f32 = -20.0;

pub struct PlayerController {
    move_intent: Vec3, // local-space movement direction from WASD
    jump_requested: bool,

    mouse_dx_accum: f32,
    mouse_dy_accum: f32,
    yaw_delta_keyboard: f32,
    pitch_delta_keyboard: f32,

    spawn_translation: Vec3,
    spawn_yaw: f32,

    pub mouse_sensitivity: f32,
    pub cursor_grabbed: bool,
}

impl PlayerController {
    pub fn new(spawn_translation: Vec3, spawn_yaw: f32, initial_grab: bool, sensitivity: f32) -> Self {
        Self {
            move_intent: Vec3::ZERO,
            jump_requested: false,
            mouse_dx_accum: 0.0,
            mouse_dy_accum: 0.0,
            yaw_delta_keyboard: 0.0,
            pitch_delta_keyboard: 0.0,
            spawn_translation,
            spawn_yaw,
            mouse_sensitivity: sensitivity,
            cursor_grabbed: initial_grab,
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                if key_event.state == ElementState::Pressed
                    && key_event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.toggle_cursor_grab(window);
                    return true;
                }
                let pressed = key_event.state == ElementState::Pressed;
                match key_event.physical_key {
                    PhysicalKey::Code(KeyCode::KeyW) => { self.move_intent.z = if pressed { -1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::KeyS) => { self.move_intent.z = if pressed { 1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::KeyA) => { self.move_intent.x = if pressed { -1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::KeyD) => { self.move_intent.x = if pressed { 1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::Space) => {
                        if pressed { self.jump_requested = true; }
                        true
                    }
                    PhysicalKey::Code(KeyCode::ArrowLeft) => { self.yaw_delta_keyboard = if pressed { 1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::ArrowRight) => { self.yaw_delta_keyboard = if pressed { -1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::ArrowUp) => { self.pitch_delta_keyboard = if pressed { 1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::ArrowDown) => { self.pitch_delta_keyboard = if pressed { -1.0 } else { 0.0 }; true }
                    _ => false,
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if !self.cursor_grabbed
                    && *state == ElementState::Pressed
                    && *button == winit::event::MouseButton::Left
                {
                    self.grab_cursor(window, true);
                    return true;
                }
                false
            }
            WindowEvent::Focused(focused) => {
                if !*focused && self.cursor_grabbed {
                    self.grab_cursor(window, false);
                }
                false
            }
            _ => false,
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if !self.cursor_grabbed {
            self.mouse_dx_accum = 0.0;
            self.mouse_dy_accum = 0.0;
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.mouse_dx_accum += *dx as f32;
            self.mouse_dy_accum += *dy as f32;
        }
    }

    pub fn toggle_cursor_grab(&mut self, window: &Window) {
        self.grab_cursor(window, !self.cursor_grabbed);
    }

    fn grab_cursor(&mut self, window: &Window, grab: bool) {
        if grab {
            if !self.cursor_grabbed {
                if window
                    .set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_e| window.set_cursor_grab(CursorGrabMode::Locked))
                    .is_ok()
                {
                    window.set_cursor_visible(false);
                    self.cursor_grabbed = true;
                } else {
                    log::warn!("Could not grab cursor");
                }
            }
        } else if self.cursor_grabbed {
            if window.set_cursor_grab(CursorGrabMode::None).is_ok() {
                window.set_cursor_visible(true);
                self.cursor_grabbed = false;
                self.mouse_dx_accum = 0.0;
                self.mouse_dy_accum = 0.0;
            } else {
                log::warn!("Could not ungrab cursor");
            }
        }
    }

    // Applies accumulated input to the player node. Look deltas are applied
    // relative to the node's current yaw (never as an absolute angle), so a
    // teleport that rotated the player stays in effect.
    pub fn apply_to_player(&mut self, scene: &mut Scene, dt: f32) {
        let rot_speed_keyboard = 1.5 * dt;
        let player_id = scene.player;
        let camera_id = scene.active_camera;

        let yaw_delta = -self.mouse_dx_accum * self.mouse_sensitivity
            + self.yaw_delta_keyboard * rot_speed_keyboard;
        let pitch_delta = -self.mouse_dy_accum * self.mouse_sensitivity
            + self.pitch_delta_keyboard * rot_speed_keyboard;
        self.mouse_dx_accum = 0.0;
        self.mouse_dy_accum = 0.0;

        scene.nodes[player_id].rotation.y += yaw_delta;

        // Pitch lives on the camera node so the player's collision box and
        // movement stay upright.
        let pitch_limit = std::f32::consts::FRAC_PI_2 - 0.01;
        let pitch = (scene.nodes[camera_id].rotation.x + pitch_delta).clamp(-pitch_limit, pitch_limit);
        scene.nodes[camera_id].rotation.x = pitch;

        // Horizontal velocity in the facing direction; vertical velocity is
        // the physics-owned jump/gravity channel.
        let yaw_quat = Quat::from_rotation_y(scene.nodes[player_id].rotation.y);
        let horizontal = yaw_quat * (self.move_intent.normalize_or_zero() * MOVE_SPEED);

        let mut velocity = scene.nodes[player_id].velocity.unwrap_or(Vec3::ZERO);
        velocity.x = horizontal.x;
        velocity.z = horizontal.z;

        if scene.nodes[player_id].collision_bottom {
            velocity.y = if self.jump_requested { JUMP_SPEED } else { 0.0 };
        } else {
            velocity.y += GRAVITY * dt;
        }
        self.jump_requested = false;
        scene.nodes[player_id].velocity = Some(velocity);

        if scene.nodes[player_id].translation.y < KILL_HEIGHT {
            self.respawn(scene);
        }

        scene.refresh_world_transform(player_id);
    }

    fn respawn(&self, scene: &mut Scene) {
        let player_id = scene.player;
        let (translation, yaw) = match (
            scene.nodes[player_id].checkpoint,
            scene.nodes[player_id].checkpoint_rot,
        ) {
            (Some(t), Some(r)) => (t, r.y),
            _ => (self.spawn_translation, self.spawn_yaw),
        };
        log::info!("player fell out of the world, respawning at {:?}", translation);
        scene.nodes[player_id].translation = translation;
        scene.nodes[player_id].rotation.y = yaw;
        scene.nodes[player_id].velocity = Some(Vec3::ZERO);
    }
}
