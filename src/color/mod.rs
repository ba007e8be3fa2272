//! Color normalization for fill matching.
//!
//! Shape fills arrive in whatever form the source SVG used: hex literals,
//! `rgb()` / `hsl()` functions, or CSS color names. Palette matching needs a
//! canonical form, so everything resolvable is folded to lowercase
//! `#rrggbb`. Hex literals (3 or 6 digit) are only lowercased, never
//! expanded. Unresolvable input is returned unchanged - matching is
//! best-effort, not validation.

/// Normalize a color value to its canonical form.
///
/// - `#RRGGBB` / `#RGB` → lowercased as-is
/// - `rgb()` / `rgba()` / `hsl()` / `hsla()` → `#rrggbb` (alpha dropped)
/// - CSS named colors → `#rrggbb`
/// - anything else → returned unchanged
pub fn normalize(color: &str) -> String {
    let trimmed = color.trim();

    if let Some(hex) = trimmed.strip_prefix('#') {
        if (hex.len() == 6 || hex.len() == 3) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return trimmed.to_ascii_lowercase();
        }
        return trimmed.to_string();
    }

    let lower = trimmed.to_ascii_lowercase();

    if let Some(args) = function_args(&lower, &["rgba", "rgb"]) {
        if let Some(hex) = rgb_args_to_hex(&args) {
            return hex;
        }
    }

    if let Some(args) = function_args(&lower, &["hsla", "hsl"]) {
        if let Some(hex) = hsl_args_to_hex(&args) {
            return hex;
        }
    }

    if let Some(hex) = named_color(&lower) {
        return hex.to_string();
    }

    trimmed.to_string()
}

/// Check whether two color values denote the same canonical color.
pub fn matches(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Extract the argument list of `name(...)` for any of the given names.
fn function_args(value: &str, names: &[&str]) -> Option<Vec<String>> {
    for name in names {
        let Some(rest) = value.strip_prefix(name) else {
            continue;
        };
        let Some(inner) = rest
            .trim_start()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
        else {
            continue;
        };
        return Some(
            inner
                .split([',', ' ', '/'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        );
    }
    None
}

/// Convert `rgb()` arguments (0-255 or percentages) to hex.
fn rgb_args_to_hex(args: &[String]) -> Option<String> {
    if args.len() < 3 {
        return None;
    }
    let mut channels = [0u8; 3];
    for (slot, arg) in channels.iter_mut().zip(args.iter()) {
        *slot = parse_channel(arg)?;
    }
    Some(format!(
        "#{:02x}{:02x}{:02x}",
        channels[0], channels[1], channels[2]
    ))
}

/// Parse one rgb channel: integer 0-255 or percentage.
fn parse_channel(arg: &str) -> Option<u8> {
    if let Some(pct) = arg.strip_suffix('%') {
        let pct: f64 = pct.trim().parse().ok()?;
        return Some((pct.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8);
    }
    let value: f64 = arg.parse().ok()?;
    Some(value.clamp(0.0, 255.0).round() as u8)
}

/// Convert `hsl()` arguments to hex.
fn hsl_args_to_hex(args: &[String]) -> Option<String> {
    if args.len() < 3 {
        return None;
    }
    let h: f64 = args[0].trim_end_matches("deg").parse().ok()?;
    let s: f64 = args[1].strip_suffix('%')?.parse().ok()?;
    let l: f64 = args[2].strip_suffix('%')?.parse().ok()?;

    let (r, g, b) = hsl_to_rgb(h.rem_euclid(360.0), s / 100.0, l / 100.0);
    Some(format!("#{r:02x}{g:02x}{b:02x}"))
}

/// Standard HSL to RGB conversion.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s.clamp(0.0, 1.0);
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

/// Resolve a CSS named color to its hex value.
///
/// Covers the basic CSS palette plus the extended names that show up in
/// icon sets. Unknown names fall through to best-effort passthrough.
fn named_color(name: &str) -> Option<&'static str> {
    let hex = match name {
        "black" => "#000000",
        "silver" => "#c0c0c0",
        "gray" | "grey" => "#808080",
        "white" => "#ffffff",
        "maroon" => "#800000",
        "red" => "#ff0000",
        "purple" => "#800080",
        "fuchsia" | "magenta" => "#ff00ff",
        "green" => "#008000",
        "lime" => "#00ff00",
        "olive" => "#808000",
        "yellow" => "#ffff00",
        "navy" => "#000080",
        "blue" => "#0000ff",
        "teal" => "#008080",
        "aqua" | "cyan" => "#00ffff",
        "orange" => "#ffa500",
        "brown" => "#a52a2a",
        "gold" => "#ffd700",
        "pink" => "#ffc0cb",
        "hotpink" => "#ff69b4",
        "crimson" => "#dc143c",
        "coral" => "#ff7f50",
        "tomato" => "#ff6347",
        "salmon" => "#fa8072",
        "khaki" => "#f0e68c",
        "indigo" => "#4b0082",
        "violet" => "#ee82ee",
        "orchid" => "#da70d6",
        "plum" => "#dda0dd",
        "turquoise" => "#40e0d0",
        "skyblue" => "#87ceeb",
        "steelblue" => "#4682b4",
        "royalblue" => "#4169e1",
        "slateblue" => "#6a5acd",
        "slategray" | "slategrey" => "#708090",
        "lightgray" | "lightgrey" => "#d3d3d3",
        "darkgray" | "darkgrey" => "#a9a9a9",
        "dimgray" | "dimgrey" => "#696969",
        "gainsboro" => "#dcdcdc",
        "whitesmoke" => "#f5f5f5",
        "ivory" => "#fffff0",
        "beige" => "#f5f5dc",
        "wheat" => "#f5deb3",
        "tan" => "#d2b48c",
        "chocolate" => "#d2691e",
        "sienna" => "#a0522d",
        "firebrick" => "#b22222",
        "darkred" => "#8b0000",
        "darkgreen" => "#006400",
        "forestgreen" => "#228b22",
        "seagreen" => "#2e8b57",
        "olivedrab" => "#6b8e23",
        "darkblue" => "#00008b",
        "midnightblue" => "#191970",
        "darkorange" => "#ff8c00",
        "darkviolet" => "#9400d3",
        "rebeccapurple" => "#663399",
        "lavender" => "#e6e6fa",
        "mintcream" => "#f5fffa",
        "transparent" => "#00000000",
        _ => return None,
    };
    Some(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_lowercased_not_expanded() {
        assert_eq!(normalize("#FFAA00"), "#ffaa00");
        assert_eq!(normalize("#FA0"), "#fa0");
        assert_eq!(normalize("  #ABCDEF "), "#abcdef");
    }

    #[test]
    fn test_invalid_hex_passthrough() {
        // Wrong digit count and non-hex chars pass through untouched
        assert_eq!(normalize("#ffaa0"), "#ffaa0");
        assert_eq!(normalize("#ggg"), "#ggg");
    }

    #[test]
    fn test_rgb_function() {
        assert_eq!(normalize("rgb(255, 170, 0)"), "#ffaa00");
        assert_eq!(normalize("rgb(255 170 0)"), "#ffaa00");
        assert_eq!(normalize("rgba(17, 17, 17, 0.5)"), "#111111");
        assert_eq!(normalize("rgb(100%, 0%, 50%)"), "#ff0080");
    }

    #[test]
    fn test_hsl_function() {
        assert_eq!(normalize("hsl(0, 100%, 50%)"), "#ff0000");
        assert_eq!(normalize("hsl(120, 100%, 50%)"), "#00ff00");
        assert_eq!(normalize("hsl(0, 0%, 100%)"), "#ffffff");
        assert_eq!(normalize("hsla(240, 100%, 50%, 1)"), "#0000ff");
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(normalize("red"), "#ff0000");
        assert_eq!(normalize("Rebeccapurple"), "#663399");
        assert_eq!(normalize("GREY"), "#808080");
    }

    #[test]
    fn test_unresolvable_passthrough() {
        assert_eq!(normalize("url(#gradient)"), "url(#gradient)");
        assert_eq!(normalize("currentColor"), "currentColor");
        assert_eq!(normalize("var(--brand)"), "var(--brand)");
    }

    #[test]
    fn test_matches_across_forms() {
        assert!(matches("rgb(255,0,0)", "red"));
        assert!(matches("#FF0000", "#ff0000"));
        assert!(!matches("#f00", "#ff0000")); // short hex is not expanded
    }
}
