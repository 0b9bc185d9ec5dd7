//! Conversions between color temperature, the gateway's chromaticity
//! coordinates and display RGB.
//!
//! Gateways describe a color by two integers (attributes 5709 and 5710): the
//! CIE 1931 `x` and `y` coordinates scaled to `0..=65535`. White spectrum
//! bulbs only accept points on (or close to) the Planckian locus between
//! 2200K and 4000K.

use std::{fmt, str::FromStr};

use palette::{rgb::Rgb, Clamp, FromColor, Hsv, Srgb, Yxy};
use serde::Serialize;

use crate::error::{Error, Result};

pub const MIN_TEMPERATURE: u16 = 2200;
pub const MAX_TEMPERATURE: u16 = 4000;

const CHROMATICITY_SCALE: f64 = 65535.0;

/// Device-native color coordinates (attributes 5709/5710).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Chromaticity {
    pub x: u16,
    pub y: u16,
}

impl Chromaticity {
    pub fn new(x: u16, y: u16) -> Self {
        Chromaticity { x, y }
    }
}

impl fmt::Display for Chromaticity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{};{}}}", self.x, self.y)
    }
}

// Planckian locus approximation, see
// https://en.wikipedia.org/wiki/Planckian_locus#Approximation
fn planckian_locus(temperature: f64) -> (f64, f64) {
    let k = 1000.0 / temperature;

    let xc = if temperature <= 4000.0 {
        -0.2661239 * k.powi(3) - 0.2343580 * k.powi(2) + 0.8776956 * k + 0.179910
    } else {
        -3.0258469 * k.powi(3) + 2.1070379 * k.powi(2) + 0.2226347 * k + 0.24039
    };

    let yc = if temperature <= 2222.0 {
        -1.1063814 * xc.powi(3) - 1.34811020 * xc.powi(2) + 2.18555832 * xc - 0.20219683
    } else if temperature <= 4000.0 {
        -0.9549476 * xc.powi(3) - 1.37418593 * xc.powi(2) + 2.09137015 * xc - 0.16748867
    } else {
        3.0817580 * xc.powi(3) - 5.87338670 * xc.powi(2) + 3.75112997 * xc - 0.37001483
    };

    (xc, yc)
}

fn scale(c: f64) -> u16 {
    (c * CHROMATICITY_SCALE + 0.5) as u16
}

/// Converts a color temperature (Kelvin, 2200..=4000) to the gateway's
/// chromaticity coordinates.
pub fn kelvin_to_chromaticity(temperature: u16) -> Result<Chromaticity> {
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(Error::TemperatureOutOfRange(temperature));
    }

    let (xc, yc) = planckian_locus(f64::from(temperature));

    Ok(Chromaticity::new(scale(xc), scale(yc)))
}

/// Approximates the color temperature of a chromaticity pair.
///
/// There is no closed form inverse of the locus polynomial, so every whole
/// Kelvin value in `2200..4000` is tried in order. A candidate that is worse
/// than the current best on either axis is skipped, and the scan stops as
/// soon as the current best is an exact match. Points far from the locus
/// still produce some temperature in range.
pub fn chromaticity_to_kelvin(chromaticity: Chromaticity) -> u16 {
    let mut x_error = u32::MAX;
    let mut y_error = u32::MAX;
    let mut best = 0;

    for temperature in MIN_TEMPERATURE..MAX_TEMPERATURE {
        let (xc, yc) = planckian_locus(f64::from(temperature));

        let x_current = u32::from(chromaticity.x.abs_diff(scale(xc)));
        let y_current = u32::from(chromaticity.y.abs_diff(scale(yc)));

        if x_current > x_error || y_current > y_error {
            continue;
        }

        if x_error == 0 && y_error == 0 {
            return best;
        }

        x_error = x_current;
        y_error = y_current;
        best = temperature;
    }

    best
}

/// Empirical black body to RGB fit, see
/// https://github.com/mattdesl/kelvin-to-rgb
///
/// This is not derived from the locus formula above, so the result is only
/// a plausible display color for `temperature`.
pub fn kelvin_to_rgb(temperature: u16) -> Srgb<u8> {
    let t = f64::from(temperature / 100);

    let r = if t <= 66.0 {
        255.0
    } else {
        329.698727466 * (t - 60.0).powf(-0.1332047592)
    };

    let g = if t <= 66.0 {
        99.4708025861 * t.ln() - 161.1195681661
    } else {
        288.1221695283 * (t - 60.0).powf(-0.0755148492)
    };

    let b = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.5177312231 * (t - 10.0).ln() - 305.0447927307
    };

    let channel = |c: f64| c.clamp(0.0, 255.0) as u8;

    Srgb::new(channel(r), channel(g), channel(b))
}

/// Display approximation of a chromaticity point at full brightness.
pub fn chromaticity_to_rgb(chromaticity: Chromaticity) -> Srgb<u8> {
    let yxy: Yxy = Yxy::new(
        f32::from(chromaticity.x) / CHROMATICITY_SCALE as f32,
        f32::from(chromaticity.y) / CHROMATICITY_SCALE as f32,
        1.0,
    );

    let mut hsv = Hsv::from_color(yxy);
    hsv.value = 1.0;

    Srgb::from_color(hsv).clamp().into_format()
}

/// Parses `rrggbb` hex, with or without a leading `#`, in either case.
pub fn parse_rgb(hex: &str) -> Result<Srgb<u8>> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if digits.len() != 6 {
        return Err(Error::InvalidRgb(hex.to_string()));
    }

    Rgb::from_str(digits).map_err(|_| Error::InvalidRgb(hex.to_string()))
}

pub fn format_rgb(rgb: Srgb<u8>) -> String {
    format!("{rgb:x}")
}

/// Built-in colors offered by the IKEA app.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preset {
    Blue,
    LightBlue,
    SaturatedPurple,
    Lime,
    LightPurple,
    Yellow,
    SaturatedPink,
    DarkPeach,
    SaturatedRed,
    ColdSky,
    Pink,
    Peach,
    WarmAmber,
    LightPink,
    CoolDaylight,
    Candlelight,
    Sunrise,
    CoolWhite,
    WarmWhite,
    WarmGlow,
}

impl Preset {
    pub const ALL: [Preset; 20] = [
        Preset::Blue,
        Preset::LightBlue,
        Preset::SaturatedPurple,
        Preset::Lime,
        Preset::LightPurple,
        Preset::Yellow,
        Preset::SaturatedPink,
        Preset::DarkPeach,
        Preset::SaturatedRed,
        Preset::ColdSky,
        Preset::Pink,
        Preset::Peach,
        Preset::WarmAmber,
        Preset::LightPink,
        Preset::CoolDaylight,
        Preset::Candlelight,
        Preset::Sunrise,
        Preset::CoolWhite,
        Preset::WarmWhite,
        Preset::WarmGlow,
    ];

    /// `(x, y, rgb, name)`
    fn definition(self) -> (u16, u16, &'static str, &'static str) {
        match self {
            Preset::Blue => (11469, 3277, "4a418a", "Blue"),
            Preset::LightBlue => (13107, 6554, "6c83ba", "Light Blue"),
            Preset::SaturatedPurple => (20316, 8520, "8f2686", "Saturated Purple"),
            Preset::Lime => (26870, 33423, "a9d62b", "Lime"),
            Preset::LightPurple => (22282, 12452, "c984bb", "Light Purple"),
            Preset::Yellow => (29491, 30802, "d6e44b", "Yellow"),
            Preset::SaturatedPink => (32768, 15729, "d9337c", "Saturated Pink"),
            Preset::DarkPeach => (40632, 22282, "da5d41", "Dark Peach"),
            Preset::SaturatedRed => (42926, 21299, "dc4b31", "Saturated Red"),
            Preset::ColdSky => (21109, 21738, "dcf0f8", "Cold sky"),
            Preset::Pink => (32768, 18350, "e491af", "Pink"),
            Preset::Peach => (38011, 22938, "e57345", "Peach"),
            Preset::WarmAmber => (38011, 24904, "e78834", "Warm Amber"),
            Preset::LightPink => (29491, 18350, "e8bedd", "Light Pink"),
            Preset::CoolDaylight => (22616, 23042, "eaf6fb", "Cool daylight"),
            Preset::Candlelight => (35848, 26214, "ebb63e", "Candlelight"),
            Preset::Sunrise => (28633, 26483, "f2eccf", "Sunrise"),
            Preset::CoolWhite => (24930, 24694, "f5faf6", "Cool white"),
            Preset::WarmWhite => (30140, 26909, "f1e0b5", "Warm white"),
            Preset::WarmGlow => (33135, 27211, "efd275", "Warm glow"),
        }
    }
}

/// A lamp color. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Color {
    chromaticity: Chromaticity,
    #[serde(serialize_with = "serialize_rgb")]
    rgb: Srgb<u8>,
    name: String,
    temperature: u16,
}

fn serialize_rgb<S: serde::Serializer>(rgb: &Srgb<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_rgb(*rgb))
}

impl Color {
    /// Exact color for a temperature in the supported range.
    pub fn from_temperature(temperature: u16) -> Result<Self> {
        let chromaticity = kelvin_to_chromaticity(temperature)?;

        Ok(Color {
            chromaticity,
            rgb: kelvin_to_rgb(temperature),
            name: format!("{temperature}K"),
            temperature,
        })
    }

    /// Color as reported by a lamp. The temperature is an approximation and
    /// the display RGB is derived from the coordinates unless the lamp also
    /// reported one.
    pub fn from_chromaticity(chromaticity: Chromaticity, rgb: Option<Srgb<u8>>) -> Self {
        let temperature = chromaticity_to_kelvin(chromaticity);

        Color {
            chromaticity,
            rgb: rgb.unwrap_or_else(|| chromaticity_to_rgb(chromaticity)),
            name: format!("{temperature}K"),
            temperature,
        }
    }

    pub fn preset(preset: Preset) -> Self {
        let (x, y, rgb, name) = preset.definition();
        let chromaticity = Chromaticity::new(x, y);

        // The table only holds well formed hex
        let rgb = parse_rgb(rgb).unwrap_or_default();

        Color {
            chromaticity,
            rgb,
            name: name.to_string(),
            temperature: chromaticity_to_kelvin(chromaticity),
        }
    }

    pub fn chromaticity(&self) -> Chromaticity {
        self.chromaticity
    }

    pub fn rgb(&self) -> Srgb<u8> {
        self.rgb
    }

    /// Lowercase `rrggbb`
    pub fn rgb_hex(&self) -> String {
        format_rgb(self.rgb)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Approximate color temperature in Kelvin
    pub fn temperature(&self) -> u16 {
        self.temperature
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},\"{}\",{}", self.name, self.rgb_hex(), self.chromaticity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_conversion_is_deterministic() {
        for temperature in MIN_TEMPERATURE..MAX_TEMPERATURE {
            assert_eq!(
                kelvin_to_chromaticity(temperature).unwrap(),
                kelvin_to_chromaticity(temperature).unwrap()
            );
        }
    }

    #[test]
    fn forward_conversion_reference_values() {
        assert_eq!(kelvin_to_chromaticity(2200).unwrap(), Chromaticity::new(33125, 27211));
        assert_eq!(kelvin_to_chromaticity(2700).unwrap(), Chromaticity::new(30101, 26913));
        assert_eq!(kelvin_to_chromaticity(4000).unwrap(), Chromaticity::new(24938, 24689));
    }

    #[test]
    fn warm_white_sits_in_the_2700k_band() {
        let warm_white = Color::preset(Preset::WarmWhite);
        let computed = kelvin_to_chromaticity(2700).unwrap();

        assert!(warm_white.chromaticity().x.abs_diff(computed.x) < 50);
        assert!(warm_white.chromaticity().y.abs_diff(computed.y) < 10);
        assert!(warm_white.temperature().abs_diff(2700) <= 10);
    }

    #[test]
    fn out_of_range_temperatures_are_rejected() {
        assert!(matches!(
            kelvin_to_chromaticity(2199),
            Err(Error::TemperatureOutOfRange(2199))
        ));
        assert!(matches!(
            kelvin_to_chromaticity(4001),
            Err(Error::TemperatureOutOfRange(4001))
        ));
        assert!(Color::from_temperature(6500).is_err());
    }

    #[test]
    fn reverse_lookup_recovers_locus_temperatures() {
        for temperature in MIN_TEMPERATURE..MAX_TEMPERATURE {
            let chromaticity = kelvin_to_chromaticity(temperature).unwrap();
            let recovered = chromaticity_to_kelvin(chromaticity);

            assert!(
                recovered.abs_diff(temperature) <= 5,
                "{temperature}K came back as {recovered}K"
            );
        }
    }

    #[test]
    fn reverse_lookup_stays_in_range_for_saturated_colors() {
        let temperature = chromaticity_to_kelvin(Chromaticity::new(11469, 3277));

        assert!((MIN_TEMPERATURE..MAX_TEMPERATURE).contains(&temperature));
    }

    #[test]
    fn rgb_fit_is_six_hex_digits() {
        for temperature in (0..=40000).step_by(100) {
            let hex = format_rgb(kelvin_to_rgb(temperature));

            assert_eq!(hex.len(), 6);
            assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn rgb_fit_reference_values() {
        assert_eq!(format_rgb(kelvin_to_rgb(1900)), "ff8300");
        assert_eq!(format_rgb(kelvin_to_rgb(2700)), "ffa657");
        assert_eq!(format_rgb(kelvin_to_rgb(6600)), "ffffff");
        assert_eq!(format_rgb(kelvin_to_rgb(10000)), "c9daff");
    }

    #[test]
    fn rgb_parsing_tolerates_case_and_hash() {
        let lower = parse_rgb("f1e0b5").unwrap();

        assert_eq!(parse_rgb("F1E0B5").unwrap(), lower);
        assert_eq!(parse_rgb("#f1E0b5").unwrap(), lower);
        assert_eq!(format_rgb(lower), "f1e0b5");
        assert!(parse_rgb("f1e0").is_err());
        assert!(parse_rgb("zzzzzz").is_err());
    }

    #[test]
    fn rgb_formatting_pads_every_channel() {
        assert_eq!(format_rgb(Srgb::new(0, 10, 255)), "000aff");
        assert_eq!(format_rgb(Srgb::new(0, 0, 0)), "000000");
    }

    #[test]
    fn temperature_color_uses_both_formulas() {
        let color = Color::from_temperature(2700).unwrap();

        assert_eq!(color.name(), "2700K");
        assert_eq!(color.temperature(), 2700);
        assert_eq!(color.rgb_hex(), "ffa657");
        assert_eq!(color.chromaticity(), Chromaticity::new(30101, 26913));
    }

    #[test]
    fn presets_keep_their_names() {
        assert_eq!(Preset::ALL.len(), 20);

        let glow = Color::preset(Preset::WarmGlow);
        assert_eq!(glow.name(), "Warm glow");
        assert_eq!(glow.rgb_hex(), "efd275");
        assert_eq!(glow.temperature(), 2200);
        assert_eq!(glow.to_string(), "Warm glow,\"efd275\",{33135;27211}");
    }

    #[test]
    fn device_color_without_rgb_gets_a_display_value() {
        let color = Color::from_chromaticity(Chromaticity::new(30101, 26913), None);

        assert_eq!(color.temperature(), 2700);
        assert_eq!(color.name(), "2700K");
        assert_eq!(color.rgb_hex().len(), 6);
    }
}
