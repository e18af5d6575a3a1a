use eframe::egui::Color32;

pub const ITEM_GREEN: Color32 = Color32::from_rgb(0, 128, 0);
pub const USER_BLUE: Color32 = Color32::from_rgb(0, 0, 255);
pub const NEIGHBOR_ORANGE: Color32 = Color32::from_rgb(255, 165, 0);
pub const DIMMED: Color32 = Color32::from_rgb(0x28, 0x28, 0x28);
pub const DEFAULT_EDGE: Color32 = Color32::from_rgb(204, 204, 204);
pub const LABEL_PURPLE: Color32 = Color32::from_rgb(0x6c, 0x3c, 0xb8);

pub const PRESET_COLORS: [Color32; 6] = [
    Color32::from_rgb(0xff, 0x00, 0x00),
    Color32::from_rgb(0xff, 0xd5, 0x00),
    Color32::from_rgb(0x00, 0xbb, 0xff),
    Color32::from_rgb(0xa2, 0xff, 0x00),
    Color32::from_rgb(0xe6, 0x00, 0xff),
    Color32::from_rgb(0x00, 0xea, 0xff),
];

/// Accepts exactly `#RRGGBB`; anything else yields `None`.
pub fn parse_hex_color(text: &str) -> Option<Color32> {
    let digits = text.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }

    let value = u32::from_str_radix(digits, 16).ok()?;
    Some(Color32::from_rgb(
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    ))
}

pub fn to_hex(color: Color32) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r(), color.g(), color.b())
}

pub fn hsl_to_color(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let hue = hue.rem_euclid(360.0);
    let saturation = (saturation / 100.0).clamp(0.0, 1.0);
    let lightness = (lightness / 100.0).clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - chroma / 2.0;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let channel = |value: f32| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Color32::from_rgb(channel(r), channel(g), channel(b))
}

pub fn hue_of(color: Color32) -> f32 {
    let r = color.r() as f32 / 255.0;
    let g = color.g() as f32 / 255.0;
    let b = color.b() as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if delta <= f32::EPSILON {
        return 0.0;
    }

    let sector = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (sector * 60.0).round()
}
