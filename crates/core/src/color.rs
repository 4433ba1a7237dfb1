//! Hex color parsing and the string forms stored alongside each row.
//!
//! Every function here is total: malformed input never panics, it yields
//! [`INVALID_COLOR`] (or `false` for [`is_dark`]).

use palette::{FromColor, Hsl, Srgb};

/// Placeholder returned for input that is not a 6-digit hex color.
pub const INVALID_COLOR: &str = "Invalid Color";

/// Brightness midpoint on the 0-255 scale used by [`is_dark`].
const DARK_THRESHOLD: u32 = 128;

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Perceived brightness (ITU-R BT.601 weights), 0-255.
    pub fn brightness(&self) -> u32 {
        (299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32) / 1000
    }
}

/// Parse `#RRGGBB` or `RRGGBB` (any case).
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// Canonical `#RRGGBB` (uppercase) form, or `None` if the input is malformed.
pub fn normalize_hex(hex: &str) -> Option<String> {
    parse_hex(hex).map(|c| format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b))
}

/// `"#FF0000"` -> `"rgb(255, 0, 0)"`.
pub fn hex_to_rgb(hex: &str) -> String {
    match parse_hex(hex) {
        Some(c) => format!("rgb({}, {}, {})", c.r, c.g, c.b),
        None => INVALID_COLOR.to_string(),
    }
}

/// `"#FF0000"` -> `"hsl(0, 100%, 50%)"`.
pub fn hex_to_hsl(hex: &str) -> String {
    let Some(c) = parse_hex(hex) else {
        return INVALID_COLOR.to_string();
    };

    let (h, s, l) = rgb_to_hsl(c);
    format!("hsl({}, {}%, {}%)", h, s, l)
}

/// True when the color is too dark for dark foreground text.
pub fn is_dark(color: &str) -> bool {
    parse_hex(color)
        .map(|c| c.brightness() < DARK_THRESHOLD)
        .unwrap_or(false)
}

/// Integer degrees in [0, 360) and integer percents.
fn rgb_to_hsl(c: Rgb) -> (u32, u32, u32) {
    let rgb: Srgb<f32> = Srgb::new(c.r, c.g, c.b).into_format();
    let hsl: Hsl = Hsl::from_color(rgb);

    let lightness = percent(hsl.lightness);

    // Achromatic: hue is undefined, report 0/0.
    if c.r == c.g && c.g == c.b {
        return (0, 0, lightness);
    }

    let hue = hsl.hue.into_positive_degrees().round() as u32 % 360;
    (hue, percent(hsl.saturation), lightness)
}

fn percent(v: f32) -> u32 {
    (v.clamp(0.0, 1.0) * 100.0).round() as u32
}
