//! Parsers for the qualitative condition strings stored in the catalog.
//!
//! Catalog entries describe nominal conditions as text ("400-500",
//! "< 2 s", "horas"). These helpers turn them into numbers; unrecognized
//! formats log a warning and fall back to a fixed default.

use tracing::warn;

/// Nominal temperature used when a range cannot be parsed (°C).
pub const FALLBACK_TEMPERATURE_C: f64 = 500.0;
/// Nominal residence time used when a description cannot be parsed (s).
pub const FALLBACK_RESIDENCE_S: f64 = 10.0;

/// Extract unsigned decimal numbers in order of appearance.
fn numbers(s: &str) -> Vec<f64> {
    let mut out = Vec::new();
    let mut buf = String::new();
    for ch in s.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() || (ch == '.' && !buf.is_empty()) {
            buf.push(ch);
        } else if !buf.is_empty() {
            if let Ok(v) = buf.trim_end_matches('.').parse::<f64>() {
                out.push(v);
            }
            buf.clear();
        }
    }
    out
}

/// Midpoint of a temperature range such as "400-500" or "450 °C".
pub fn parse_temperature(raw: &str) -> f64 {
    match numbers(raw).as_slice() {
        [t] => *t,
        [lo, hi] => (lo + hi) / 2.0,
        _ => {
            warn!(raw, fallback = FALLBACK_TEMPERATURE_C, "unrecognized temperature range");
            FALLBACK_TEMPERATURE_C
        }
    }
}

fn unit_seconds(s: &str) -> f64 {
    if s.contains("min") {
        60.0
    } else {
        1.0
    }
}

/// Representative residence time in seconds for a qualitative description.
///
/// - "< N s" style bounds map to three quarters of the bound ("< 2 s" is 1.5 s)
/// - hours ("hours", "horas") map to 3600 s
/// - "seconds to minutes" ("segundos a minutos") maps to 180 s
/// - plain numbers or ranges with an optional "min" unit use their midpoint
pub fn parse_residence_time(raw: &str) -> f64 {
    let t = raw.trim().to_lowercase();
    if let Some(rest) = t.strip_prefix('<') {
        if let Some(bound) = numbers(rest).first() {
            return 0.75 * bound * unit_seconds(rest);
        }
    }
    if t.contains("hour") || t.contains("hora") {
        return 3600.0;
    }
    if t.contains("minut") && (t.contains("second") || t.contains("segundo")) {
        return 180.0;
    }
    match numbers(&t).as_slice() {
        [v] if *v > 0.0 => v * unit_seconds(&t),
        [lo, hi] if lo + hi > 0.0 => (lo + hi) / 2.0 * unit_seconds(&t),
        _ => {
            warn!(raw, fallback = FALLBACK_RESIDENCE_S, "unrecognized residence time");
            FALLBACK_RESIDENCE_S
        }
    }
}

/// First signed percentage embedded in a modifier string ("+8%" is 8.0,
/// "-5 % líquido" is -5.0). Strings without a number count as zero.
pub fn parse_modifier(raw: &str) -> f64 {
    let chars: Vec<char> = raw.chars().collect();
    let Some(start) = chars.iter().position(|c| c.is_ascii_digit()) else {
        if !raw.trim().is_empty() {
            warn!(raw, "yield modifier without a number, treating as 0");
        }
        return 0.0;
    };
    let negative = chars[..start]
        .iter()
        .rev()
        .find(|c| !c.is_whitespace())
        .map_or(false, |c| *c == '-' || *c == '\u{2212}');
    let magnitude = numbers(&chars[start..].iter().collect::<String>())
        .first()
        .copied()
        .unwrap_or(0.0);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
