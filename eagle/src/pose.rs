use std::f64::consts::PI;

use glam::{DMat3, DVec3};

const TWO_PI: f64 = 2.0 * PI;

/// Normalizes an angle to the interval [-pi, pi].
pub fn standard_rad(t: f64) -> f64 {
    if t >= 0.0 {
        (t + PI) % TWO_PI - PI
    } else {
        (t - PI) % -TWO_PI + PI
    }
}

/// Yaw, pitch and roll of a tag rotation (row-major, camera <- tag).
///
/// The y axis is flipped first so that the angles are expressed in a right handed frame
/// with y pointing up in the image.
pub fn euler(rotation: &[[f64; 3]; 3]) -> (f64, f64, f64) {
    let flip = DMat3::from_diagonal(DVec3::new(1.0, -1.0, 1.0));
    let m = flip * DMat3::from_cols_array_2d(rotation).transpose();
    let at = |row: usize, col: usize| m.col(col)[row];

    let yaw = standard_rad(at(1, 0).atan2(at(0, 0)));
    let (s, c) = yaw.sin_cos();
    let pitch = standard_rad((-at(2, 0)).atan2(at(0, 0) * c + at(1, 0) * s));
    let roll = standard_rad((at(0, 2) * s - at(1, 2) * c).atan2(-at(0, 1) * s + at(1, 1) * c));
    (yaw, pitch, roll)
}
