//! Colour values – parsing and conversion.
//!
//! Two parsing tiers, on purpose:
//!
//! - [`parse_legacy`] understands only the legacy sRGB forms (`#hex`,
//!   `rgb()`/`rgba()`, a small named set). This is the model the capture
//!   styling layer speaks.
//! - [`parse_css`] additionally resolves the modern colour-space functions
//!   (`oklch()`, `oklab()`, `lab()`, `lch()`, `color()`) down to sRGB. The
//!   rendering surface uses it to paint-and-read-back values the legacy
//!   tier cannot express.

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let parse_pair = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 | 8 => {
                let r = parse_pair(&hex[0..2])?;
                let g = parse_pair(&hex[2..4])?;
                let b = parse_pair(&hex[4..6])?;
                let a = if hex.len() == 8 {
                    parse_pair(&hex[6..8])?
                } else {
                    1.0
                };
                Some(Self { r, g, b, a })
            }
            3 | 4 => {
                let parse_one =
                    |s: &str| u8::from_str_radix(&s.repeat(2), 16).ok().map(|v| v as f32 / 255.0);
                let r = parse_one(&hex[0..1])?;
                let g = parse_one(&hex[1..2])?;
                let b = parse_one(&hex[2..3])?;
                let a = if hex.len() == 4 {
                    parse_one(&hex[3..4])?
                } else {
                    1.0
                };
                Some(Self { r, g, b, a })
            }
            _ => None,
        }
    }

    /// Raw 0-255 channels, gamut-clipped.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Serialise as a legacy CSS value. Fully transparent becomes the
    /// `transparent` keyword rather than `rgba(0, 0, 0, 0)`.
    pub fn to_css_string(&self) -> String {
        if self.is_transparent() {
            return "transparent".to_string();
        }
        let [r, g, b, _] = self.to_rgba8();
        if self.a >= 0.999 {
            format!("rgb({}, {}, {})", r, g, b)
        } else {
            // Three decimals is enough to round-trip an 8-bit alpha.
            format!("rgba({}, {}, {}, {:.3})", r, g, b, self.a)
        }
    }
}

/// Parse the legacy colour forms only: hex, `rgb()`/`rgba()`, named subset,
/// and the `transparent` keyword.
pub fn parse_legacy(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.starts_with('#') {
        return Color::from_hex(value);
    }
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("rgb(") || lower.starts_with("rgba(") {
        return parse_rgb_function(&lower);
    }
    named_color(&lower)
}

/// Parse any CSS colour this crate understands, including the modern
/// colour-space functions, resolving everything to gamut-clipped sRGB.
pub fn parse_css(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(c) = parse_legacy(value) {
        return Some(c);
    }
    let lower = value.to_ascii_lowercase();
    let (name, args) = split_function(&lower)?;
    match name {
        "oklch" => parse_oklch(&args),
        "oklab" => parse_oklab(&args),
        "lch" => parse_cielch(&args),
        "lab" => parse_cielab(&args),
        "color" => parse_color_function(&args),
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color> {
    let rgb = |r: u8, g: u8, b: u8| Color {
        r: r as f32 / 255.0,
        g: g as f32 / 255.0,
        b: b as f32 / 255.0,
        a: 1.0,
    };
    match name {
        "transparent" => Some(Color::TRANSPARENT),
        "black" => Some(Color::BLACK),
        "white" => Some(Color::WHITE),
        "red" => Some(rgb(255, 0, 0)),
        "green" => Some(rgb(0, 128, 0)),
        "lime" => Some(rgb(0, 255, 0)),
        "blue" => Some(rgb(0, 0, 255)),
        "yellow" => Some(rgb(255, 255, 0)),
        "orange" => Some(rgb(255, 165, 0)),
        "purple" => Some(rgb(128, 0, 128)),
        "navy" => Some(rgb(0, 0, 128)),
        "teal" => Some(rgb(0, 128, 128)),
        "maroon" => Some(rgb(128, 0, 0)),
        "silver" => Some(rgb(192, 192, 192)),
        "gray" | "grey" => Some(rgb(128, 128, 128)),
        _ => None,
    }
}

/// Split `name(args)` returning the function name and the inner argument
/// string. Returns `None` unless the whole value is a single function call.
fn split_function(value: &str) -> Option<(&str, String)> {
    let open = value.find('(')?;
    if !value.ends_with(')') {
        return None;
    }
    let name = value[..open].trim();
    let args = value[open + 1..value.len() - 1].to_string();
    Some((name, args))
}

/// Tokenise function arguments: commas and `/` act as separators alongside
/// whitespace, so both the legacy comma syntax and the modern space syntax
/// parse the same way. The alpha component, when present, is last.
fn split_components(args: &str) -> Vec<String> {
    args.replace(',', " ")
        .replace('/', " ")
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Parse a number or percentage. `percent_base` is what `100%` maps to.
fn component(token: &str, percent_base: f32) -> Option<f32> {
    if token == "none" {
        return Some(0.0);
    }
    if let Some(p) = token.strip_suffix('%') {
        return p.parse::<f32>().ok().map(|v| v / 100.0 * percent_base);
    }
    token
        .trim_end_matches("deg")
        .parse::<f32>()
        .ok()
}

fn parse_rgb_function(lower: &str) -> Option<Color> {
    let (_, args) = split_function(lower)?;
    let parts = split_components(&args);
    if parts.len() < 3 {
        return None;
    }
    let channel = |t: &str| component(t, 255.0).map(|v| (v / 255.0).clamp(0.0, 1.0));
    let r = channel(&parts[0])?;
    let g = channel(&parts[1])?;
    let b = channel(&parts[2])?;
    let a = if parts.len() > 3 {
        component(&parts[3], 1.0)?.clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some(Color { r, g, b, a })
}

fn parse_alpha(parts: &[String], idx: usize) -> Option<f32> {
    if parts.len() > idx {
        component(&parts[idx], 1.0).map(|a| a.clamp(0.0, 1.0))
    } else {
        Some(1.0)
    }
}

fn parse_oklch(args: &str) -> Option<Color> {
    let parts = split_components(args);
    if parts.len() < 3 {
        return None;
    }
    let l = component(&parts[0], 1.0)?;
    let c = component(&parts[1], 0.4)?;
    let h = component(&parts[2], 0.0)?.to_radians();
    let a = parse_alpha(&parts, 3)?;
    Some(oklab_to_srgb(l, c * h.cos(), c * h.sin(), a))
}

fn parse_oklab(args: &str) -> Option<Color> {
    let parts = split_components(args);
    if parts.len() < 3 {
        return None;
    }
    let l = component(&parts[0], 1.0)?;
    let a_axis = component(&parts[1], 0.4)?;
    let b_axis = component(&parts[2], 0.4)?;
    let a = parse_alpha(&parts, 3)?;
    Some(oklab_to_srgb(l, a_axis, b_axis, a))
}

fn parse_cielab(args: &str) -> Option<Color> {
    let parts = split_components(args);
    if parts.len() < 3 {
        return None;
    }
    let l = component(&parts[0], 100.0)?;
    let a_axis = component(&parts[1], 125.0)?;
    let b_axis = component(&parts[2], 125.0)?;
    let a = parse_alpha(&parts, 3)?;
    Some(cielab_to_srgb(l, a_axis, b_axis, a))
}

fn parse_cielch(args: &str) -> Option<Color> {
    let parts = split_components(args);
    if parts.len() < 3 {
        return None;
    }
    let l = component(&parts[0], 100.0)?;
    let c = component(&parts[1], 150.0)?;
    let h = component(&parts[2], 0.0)?.to_radians();
    let a = parse_alpha(&parts, 3)?;
    Some(cielab_to_srgb(l, c * h.cos(), c * h.sin(), a))
}

/// `color(<space> c1 c2 c3 [/ a])` for the spaces a capture source plausibly
/// emits: srgb, srgb-linear, display-p3.
fn parse_color_function(args: &str) -> Option<Color> {
    let parts = split_components(args);
    if parts.len() < 4 {
        return None;
    }
    let space = parts[0].as_str();
    let c1 = component(&parts[1], 1.0)?;
    let c2 = component(&parts[2], 1.0)?;
    let c3 = component(&parts[3], 1.0)?;
    let a = parse_alpha(&parts, 4)?;
    match space {
        "srgb" => Some(Color {
            r: c1.clamp(0.0, 1.0),
            g: c2.clamp(0.0, 1.0),
            b: c3.clamp(0.0, 1.0),
            a,
        }),
        "srgb-linear" => Some(from_linear(c1, c2, c3, a)),
        "display-p3" => {
            let (lr, lg, lb) = (srgb_to_linear(c1), srgb_to_linear(c2), srgb_to_linear(c3));
            // Linear Display-P3 → linear sRGB.
            let r = 1.224_940_2 * lr - 0.224_940_18 * lg;
            let g = -0.042_056_955 * lr + 1.042_056_9 * lg;
            let b = -0.019_637_555 * lr - 0.078_636_04 * lg + 1.098_273_6 * lb;
            Some(from_linear(r, g, b, a))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Colour-space math (CSS Color 4 conversion matrices)
// ---------------------------------------------------------------------------

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn from_linear(r: f32, g: f32, b: f32, a: f32) -> Color {
    Color {
        r: linear_to_srgb(r).clamp(0.0, 1.0),
        g: linear_to_srgb(g).clamp(0.0, 1.0),
        b: linear_to_srgb(b).clamp(0.0, 1.0),
        a: a.clamp(0.0, 1.0),
    }
}

fn oklab_to_srgb(l: f32, a_axis: f32, b_axis: f32, alpha: f32) -> Color {
    let l_ = l + 0.396_337_78 * a_axis + 0.215_803_76 * b_axis;
    let m_ = l - 0.105_561_346 * a_axis - 0.063_854_17 * b_axis;
    let s_ = l - 0.089_484_18 * a_axis - 1.291_485_5 * b_axis;

    let (l3, m3, s3) = (l_ * l_ * l_, m_ * m_ * m_, s_ * s_ * s_);

    let r = 4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3;
    let g = -1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_38 * s3;
    let b = -0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3;

    from_linear(r, g, b, alpha)
}

fn cielab_to_srgb(l: f32, a_axis: f32, b_axis: f32, alpha: f32) -> Color {
    // Lab → XYZ relative to the D50 white point.
    const EPSILON: f32 = 216.0 / 24389.0;
    const KAPPA: f32 = 24389.0 / 27.0;
    const WHITE_D50: [f32; 3] = [0.964_295_7, 1.0, 0.825_104_6];

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a_axis / 500.0;
    let fz = fy - b_axis / 200.0;

    let finv = |f: f32| {
        let f3 = f * f * f;
        if f3 > EPSILON {
            f3
        } else {
            (116.0 * f - 16.0) / KAPPA
        }
    };
    let yr = if l > KAPPA * EPSILON {
        fy * fy * fy
    } else {
        l / KAPPA
    };

    let x = finv(fx) * WHITE_D50[0];
    let y = yr * WHITE_D50[1];
    let z = finv(fz) * WHITE_D50[2];

    // Bradford-adapt D50 → D65.
    let x65 = 0.955_473_44 * x - 0.023_098_537 * y + 0.063_259_31 * z;
    let y65 = -0.028_369_707 * x + 1.009_995_5 * y + 0.021_041_398 * z;
    let z65 = 0.012_314_001 * x - 0.020_507_696 * y + 1.330_366 * z;

    // XYZ (D65) → linear sRGB.
    let r = 3.240_454_2 * x65 - 1.537_138_5 * y65 - 0.498_531_4 * z65;
    let g = -0.969_266 * x65 + 1.876_010_8 * y65 + 0.041_556 * z65;
    let b = 0.055_643_4 * x65 - 0.204_025_9 * y65 + 1.057_225_2 * z65;

    from_linear(r, g, b, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_close(actual: f32, expected: f32) -> bool {
        (actual - expected).abs() < 0.02
    }

    #[test]
    fn hex_forms() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!(channel_close(c.r, 1.0));
        assert!(channel_close(c.g, 0.533));
        let short = Color::from_hex("#f80").unwrap();
        assert!(channel_close(short.r, 1.0));
        let with_alpha = Color::from_hex("#ff880080").unwrap();
        assert!(channel_close(with_alpha.a, 0.502));
    }

    #[test]
    fn legacy_rgb_syntaxes() {
        let comma = parse_legacy("rgb(255, 0, 0)").unwrap();
        let modern = parse_legacy("rgb(255 0 0 / 0.5)").unwrap();
        assert!(channel_close(comma.r, 1.0));
        assert!(channel_close(modern.a, 0.5));
    }

    #[test]
    fn legacy_rejects_modern_functions() {
        assert!(parse_legacy("oklch(0.7 0.1 200)").is_none());
        assert!(parse_legacy("color(srgb 1 0 0)").is_none());
    }

    #[test]
    fn transparent_keyword() {
        assert!(parse_legacy("transparent").unwrap().is_transparent());
    }

    #[test]
    fn oklch_white_and_black() {
        let white = parse_css("oklch(1 0 0)").unwrap();
        assert!(channel_close(white.r, 1.0) && channel_close(white.b, 1.0));
        let black = parse_css("oklch(0 0 0)").unwrap();
        assert!(channel_close(black.r, 0.0) && channel_close(black.g, 0.0));
    }

    #[test]
    fn oklch_known_red() {
        // oklch(0.628 0.2577 29.23) ≈ sRGB red.
        let red = parse_css("oklch(0.628 0.2577 29.23)").unwrap();
        assert!(channel_close(red.r, 1.0));
        assert!(red.g < 0.1 && red.b < 0.1);
    }

    #[test]
    fn oklch_percent_lightness_and_alpha() {
        let c = parse_css("oklch(70% 0.1 200 / 0.25)").unwrap();
        assert!(channel_close(c.a, 0.25));
    }

    #[test]
    fn lab_white() {
        let white = parse_css("lab(100 0 0)").unwrap();
        assert!(channel_close(white.r, 1.0) && channel_close(white.g, 1.0));
    }

    #[test]
    fn color_function_srgb_passthrough() {
        let c = parse_css("color(srgb 0.2 0.4 0.6 / 0.8)").unwrap();
        assert!(channel_close(c.r, 0.2));
        assert!(channel_close(c.b, 0.6));
        assert!(channel_close(c.a, 0.8));
    }

    #[test]
    fn css_string_forms() {
        let opaque = Color {
            r: 1.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        };
        assert_eq!(opaque.to_css_string(), "rgb(255, 0, 0)");
        assert_eq!(Color::TRANSPARENT.to_css_string(), "transparent");
        let translucent = Color {
            a: 0.5,
            ..opaque
        };
        assert!(translucent.to_css_string().starts_with("rgba(255, 0, 0"));
    }
}
