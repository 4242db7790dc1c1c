// src/engine_lib/math.rs

use glam::Mat4;

// Fixed-arity matrix composition with left-to-right application: the first
// argument is applied to a point first, the last argument last. Argument
// order here is load-bearing for the portal view math; see the unit tests.
pub fn compose3(first: &Mat4, second: &Mat4, third: &Mat4) -> Mat4 {
    *third * *second * *first
}

pub fn compose4(first: &Mat4, second: &Mat4, third: &Mat4, fourth: &Mat4) -> Mat4 {
    *fourth * *third * *second * *first
}

// Wraps a yaw angle into the canonical (-PI, PI] range.
pub fn wrap_yaw(mut yaw: f32) -> f32 {
    use std::f32::consts::PI;
    while yaw > PI {
        yaw -= 2.0 * PI;
    }
    while yaw <= -PI {
        yaw += 2.0 * PI;
    }
    yaw
}
