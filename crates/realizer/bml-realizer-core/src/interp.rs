//! Interpolation helpers:
//! - lerp for scalars and 3-vectors
//! - cosine / sine ease-in-out used by the phase envelope

use std::f32::consts::{FRAC_PI_2, PI};

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
    ]
}

#[inline]
pub fn sub_vec3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn add_vec3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn scale_vec3(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Unit vector along `a`, or zero when `a` has no length.
#[inline]
pub fn normalize3(a: [f32; 3]) -> [f32; 3] {
    let len2 = a[0] * a[0] + a[1] * a[1] + a[2] * a[2];
    if len2 > 0.0 {
        scale_vec3(a, len2.sqrt().recip())
    } else {
        [0.0, 0.0, 0.0]
    }
}

/// Ease-in-out on u in [0, 1]: `cos(pi*u + pi) * 0.5 + 0.5`.
#[inline]
pub fn ease_cos(u: f32) -> f32 {
    (PI * u + PI).cos() * 0.5 + 0.5
}

/// Ease-in-out on u in [0, 1]: `sin(pi*u - pi/2) * 0.5 + 0.5`.
#[inline]
pub fn ease_sin(u: f32) -> f32 {
    (PI * u - FRAC_PI_2).sin() * 0.5 + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() <= 1e-5, "left={a} right={b}");
    }

    #[test]
    fn easings_agree_at_key_points() {
        for u in [0.0, 0.25, 0.5, 0.75, 1.0] {
            approx(ease_cos(u), ease_sin(u));
        }
        approx(ease_cos(0.0), 0.0);
        approx(ease_cos(0.5), 0.5);
        approx(ease_cos(1.0), 1.0);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(normalize3([0.0; 3]), [0.0; 3]);
        let n = normalize3([3.0, 0.0, 4.0]);
        approx(n[0], 0.6);
        approx(n[2], 0.8);
    }
}
