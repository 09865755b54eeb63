//! RGBA colour values.

use std::fmt;

/// A colour with channels in the 0-1 range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Check whether the colour renders without an alpha channel.
    pub fn is_opaque(&self) -> bool {
        self.alpha > 0.999
    }

    /// Colour channels scaled to 0-255.
    pub fn to_rgb8(&self) -> [u8; 3] {
        [
            channel8(self.red),
            channel8(self.green),
            channel8(self.blue),
        ]
    }
}

fn channel8(value: f64) -> u8 {
    (0.5 + value.clamp(0.0, 1.0) * 255.0).floor() as u8
}

/// Format like C's `%g`: six significant digits, no trailing zeros.
fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_rgb8();
        if self.is_opaque() {
            write!(f, "rgb({r},{g},{b})")
        } else {
            write!(f, "rgba({r},{g},{b},{})", format_g(self.alpha.clamp(0.0, 1.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translucent() {
        assert_eq!(Rgba::new(0.1, 0.2, 0.3, 0.5).to_string(), "rgba(26,51,77,0.5)");
    }

    #[test]
    fn opaque() {
        assert_eq!(Rgba::new(1.0, 0.0, 0.5, 1.0).to_string(), "rgb(255,0,128)");
    }

    #[test]
    fn channels_are_clamped() {
        assert_eq!(Rgba::new(-1.0, 2.0, 0.0, 0.25).to_string(), "rgba(0,255,0,0.25)");
        assert_eq!(Rgba::new(0.0, 0.0, 0.0, -3.0).to_string(), "rgba(0,0,0,0)");
    }

    #[test]
    fn g_formatting() {
        assert_eq!(format_g(0.5), "0.5");
        assert_eq!(format_g(0.123456789), "0.123457");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(0.00001), "1e-05");
        assert_eq!(format_g(0.999), "0.999");
    }
}
