//! Hex color parsing and cluster color aggregation
//!
//! Hex strings are 3, 4, 6 or 8 digits with an optional leading `#`.
//! Alpha digits are accepted and ignored.

/// An RGB triple, each channel 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as a point in 3D space (red=x, green=y, blue=z)
    pub fn to_point(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }

    /// Lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse a hex color into channels.
///
/// Returns `None` when the input does not match the pattern; callers treat
/// that as "cannot plot this entry".
pub fn parse_hex(input: &str) -> Option<Rgb> {
    let digits = input.strip_prefix('#').unwrap_or(input);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| -> u8 {
        // Checked above, every byte is a hex digit
        (digits.as_bytes()[i] as char).to_digit(16).unwrap_or(0) as u8
    };
    let byte = |i: usize| -> u8 { nibble(i) * 16 + nibble(i + 1) };

    match digits.len() {
        3 | 4 => Some(Rgb::new(nibble(0) * 17, nibble(1) * 17, nibble(2) * 17)),
        6 | 8 => Some(Rgb::new(byte(0), byte(2), byte(4))),
        _ => None,
    }
}

/// Validation pattern for normalized hex fields: `#` followed by 3 to 8 hex digits.
///
/// Looser than [`parse_hex`]: a 5 or 7 digit value passes validation but
/// cannot be plotted.
pub fn is_valid_hex(hex: &str) -> bool {
    match hex.strip_prefix('#') {
        Some(digits) => {
            (3..=8).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Root-mean-square average per channel, rounded to nearest.
///
/// Returns `None` for an empty slice.
pub fn aggregate(colors: &[Rgb]) -> Option<Rgb> {
    if colors.is_empty() {
        return None;
    }

    let n = colors.len() as f64;
    let rms = |channel: fn(&Rgb) -> u8| -> u8 {
        let sum_sq: f64 = colors
            .iter()
            .map(|c| {
                let v = channel(c) as f64;
                v * v
            })
            .sum();
        (sum_sq / n).sqrt().round().clamp(0.0, 255.0) as u8
    };

    Some(Rgb::new(rms(|c| c.r), rms(|c| c.g), rms(|c| c.b)))
}
