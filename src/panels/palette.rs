//! Colours used by the views, kept as plain RGB so wrangling stays free of
//! egui types.

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
/// Full intensity of the sum-vector word backgrounds.
pub const SELECTION_BLUE: Rgb = [0x13, 0x99, 0xe4];
pub const SELECTED_CURVE: Rgb = [0x1f, 0x77, 0xb4];
pub const EXCLUDED_CURVE: Rgb = [0xbb, 0xbb, 0xbb];
pub const OTHER_CURVE: Rgb = [0xdd, 0xdd, 0xdd];
pub const THRESHOLD_LINE: Rgb = [0xd6, 0x27, 0x28];

/// Categorical palette (category10).
pub const CATEGORY10: [Rgb; 10] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];

/// Linear blend from `a` (t = 0) to `b` (t = 1); `t` is clamped.
pub fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// White → blue scale over `[0, max]`.
pub fn intensity(value: f64, max: f64) -> Rgb {
    if max <= 0.0 {
        return WHITE;
    }
    lerp(WHITE, SELECTION_BLUE, value / max)
}

/// Colour of the `index`-th category.
pub fn category(index: usize) -> Rgb {
    CATEGORY10[index % CATEGORY10.len()]
}

pub fn to_color32(c: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(c[0], c[1], c[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_scale_endpoints() {
        assert_eq!(intensity(0.0, 4.0), WHITE);
        assert_eq!(intensity(4.0, 4.0), SELECTION_BLUE);
        assert_eq!(intensity(9.0, 4.0), SELECTION_BLUE);
        assert_eq!(intensity(3.0, 0.0), WHITE);
    }

    #[test]
    fn categories_wrap() {
        assert_eq!(category(0), category(10));
        assert_ne!(category(0), category(1));
    }
}
