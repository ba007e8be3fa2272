//! View box parsing and aspect-ratio normalization.
//!
//! Normalization only ever grows the box: a too-tall box gains width, a
//! too-wide box gains height, and the added space is split evenly on both
//! sides so the original content stays centered.

use super::format_number;

/// Ratio comparisons tighter than this count as equal.
pub const RATIO_EPSILON: f64 = 1e-9;

/// An SVG view box: origin plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Parse a `viewBox` attribute value (whitespace and/or comma separated).
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<f64> = value
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [x, y, width, height] => Some(Self::new(*x, *y, *width, *height)),
            _ => None,
        }
    }

    /// Format as a `viewBox` attribute value.
    pub fn to_attr(&self) -> String {
        format!(
            "{} {} {} {}",
            format_number(self.x),
            format_number(self.y),
            format_number(self.width),
            format_number(self.height)
        )
    }

    /// Width/height ratio. Zero-height boxes report ratio 0.
    pub fn ratio(&self) -> f64 {
        if self.height == 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }

    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box deviates from the target ratio by more than the
    /// given tolerance.
    pub fn deviates_from(&self, target: f64, tolerance: f64) -> bool {
        (self.ratio() - target).abs() > tolerance
    }

    /// Grow the box to the target width/height ratio, recentering the
    /// original content. Returns `None` when the box already matches.
    pub fn normalized_to(&self, target: f64) -> Option<Self> {
        if self.width <= 0.0 || self.height <= 0.0 || target <= 0.0 {
            return None;
        }
        let current = self.ratio();

        if (current - target).abs() < RATIO_EPSILON {
            return None;
        }

        if current < target {
            // Too tall: grow width, shift origin left by half the gain.
            let required_width = self.height * target;
            let added = required_width - self.width;
            Some(Self::new(
                self.x - added / 2.0,
                self.y,
                required_width,
                self.height,
            ))
        } else {
            // Too wide: grow height, shift origin up by half the gain.
            let required_height = self.width / target;
            let added = required_height - self.height;
            Some(Self::new(
                self.x,
                self.y - added / 2.0,
                self.width,
                required_height,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separators() {
        let expected = Some(ViewBox::new(0.0, -1.5, 24.0, 24.0));
        assert_eq!(ViewBox::parse("0 -1.5 24 24"), expected);
        assert_eq!(ViewBox::parse("0,-1.5,24,24"), expected);
        assert_eq!(ViewBox::parse("0, -1.5,  24 24"), expected);
        assert_eq!(ViewBox::parse("0 0 24"), None);
        assert_eq!(ViewBox::parse("a b c d"), None);
    }

    #[test]
    fn test_matching_ratio_is_noop() {
        let vb = ViewBox::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(vb.normalized_to(2.0), None);
    }

    #[test]
    fn test_too_tall_grows_width_and_recenters() {
        // 50×100 at target 1.0 → 100×100, x shifted left by 25
        let vb = ViewBox::new(0.0, 0.0, 50.0, 100.0);
        let fixed = vb.normalized_to(1.0).unwrap();
        assert_eq!(fixed, ViewBox::new(-25.0, 0.0, 100.0, 100.0));
        assert_eq!(fixed.center(), vb.center());
    }

    #[test]
    fn test_too_wide_grows_height_and_recenters() {
        // 100×50 at target 1.0 → 100×100, y shifted up by 25
        let vb = ViewBox::new(10.0, 10.0, 100.0, 50.0);
        let fixed = vb.normalized_to(1.0).unwrap();
        assert_eq!(fixed, ViewBox::new(10.0, -15.0, 100.0, 100.0));
        assert_eq!(fixed.center(), vb.center());
    }

    #[test]
    fn test_normalized_ratio_hits_target() {
        let vb = ViewBox::new(-3.0, 7.0, 37.0, 19.0);
        let target = 1.6;
        let fixed = vb.normalized_to(target).unwrap();
        assert!((fixed.ratio() - target).abs() < 1e-9);

        let (cx, cy) = vb.center();
        let (fx, fy) = fixed.center();
        assert!((cx - fx).abs() < 1e-9);
        assert!((cy - fy).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_boxes_are_noops() {
        assert_eq!(ViewBox::new(0.0, 0.0, 0.0, 10.0).normalized_to(1.0), None);
        assert_eq!(ViewBox::new(0.0, 0.0, 10.0, 0.0).normalized_to(1.0), None);
        assert_eq!(ViewBox::new(0.0, 0.0, 10.0, 10.0).normalized_to(0.0), None);
    }

    #[test]
    fn test_deviates_from() {
        let vb = ViewBox::new(0.0, 0.0, 100.0, 98.0);
        assert!(!vb.deviates_from(1.0, 0.05));
        assert!(vb.deviates_from(1.5, 0.05));
    }
}
