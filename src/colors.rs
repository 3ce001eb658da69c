use crate::region::RegionId;
use image::Rgba;

pub const DIMMED: &str = "#cccccc";
pub const HIGHLIGHT: &str = "#3182bd";
pub const HAS_ACCESS_DOT: &str = "#ffff00";
pub const NO_ACCESS_DOT: &str = "#ffffff";

/// Two-stop linear gradient, painted top-left to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    pub start: &'static str,
    pub end: &'static str,
}

pub const ACCESS_GRADIENT: Gradient = Gradient { start: "#deebf7", end: "#3182bd" };

pub fn region_gradient(region: RegionId) -> Gradient {
    match region {
        RegionId::West => Gradient { start: "#a6cee3", end: "#1f78b4" },
        RegionId::Central => Gradient { start: "#b2df8a", end: "#33a02c" },
        RegionId::East => Gradient { start: "#fdbf6f", end: "#ff7f00" },
        RegionId::Unknown => Gradient { start: "#cccccc", end: "#999999" },
    }
}

/// Parse `#rrggbb` (the `#` is optional). Bad digits read as 0.
pub fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .unwrap_or(0)
    };
    Rgba([channel(0..2), channel(2..4), channel(4..6), 255])
}

pub fn rgba_to_hex(color: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Linear RGB interpolation, `t` clamped to 0..=1.
pub fn interpolate(from: &str, to: &str, t: f64) -> String {
    rgba_to_hex(mix(hex_to_rgba(from), hex_to_rgba(to), t))
}

pub fn mix(from: Rgba<u8>, to: Rgba<u8>, t: f64) -> Rgba<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgba([
        lerp(from[0], to[0]),
        lerp(from[1], to[1]),
        lerp(from[2], to[2]),
        lerp(from[3], to[3]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(hex_to_rgba("#1f78b4"), Rgba([0x1f, 0x78, 0xb4, 255]));
        assert_eq!(hex_to_rgba("1f78b4"), Rgba([0x1f, 0x78, 0xb4, 255]));
        assert_eq!(rgba_to_hex(hex_to_rgba("#ff7f00")), "#ff7f00");
    }

    #[test]
    fn test_bad_hex_reads_as_black() {
        assert_eq!(hex_to_rgba("#zz"), Rgba([0, 0, 0, 255]));
        assert_eq!(hex_to_rgba(""), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_interpolate_endpoints() {
        let g = ACCESS_GRADIENT;
        assert_eq!(interpolate(g.start, g.end, 0.0), g.start);
        assert_eq!(interpolate(g.start, g.end, 1.0), g.end);
        assert_eq!(interpolate("#000000", "#ffffff", 0.5), "#808080");
        assert_eq!(interpolate(g.start, g.end, f64::NAN), g.start);
    }
}
