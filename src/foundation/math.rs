/// Rec. 601 luma weights.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

pub(crate) fn unit(v: u8) -> f32 {
    f32::from(v) / 255.0
}

pub(crate) fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Luma of a color with channels in `[0, 1]`.
pub(crate) fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

pub(crate) fn rgb_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Linear interpolation from `a` to `b` in 8-bit space, `t` in `[0, 1]`.
///
/// Equal inputs always return the input unchanged.
pub(crate) fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let (a, b) = (f32::from(a), f32::from(b));
    (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
}

/// One step of exponential smoothing: `prev * keep + raw * (1 - keep)`.
pub(crate) fn ema(prev: f64, raw: f64, keep: f64) -> f64 {
    prev * keep + raw * (1.0 - keep)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
