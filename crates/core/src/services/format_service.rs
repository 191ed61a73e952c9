//! Display formatting for coin market fields.
//!
//! The registry stores every market field as a display string; these helpers
//! are the only place raw numbers turn into text (and back, for sorting).

/// Direction of a signed display value, used for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
}

/// Format a number with en-US thousands grouping and a fixed number of
/// fraction digits (`1234.567, 2` → `"1,234.57"`). Non-finite input yields `"0"`.
pub fn format_number(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let fixed = format!("{:.*}", digits, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    // "-0.00" would be noise; only keep the sign if something non-zero survived rounding.
    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// `105.0` → `"$105.00"`.
pub fn format_price(value: f64) -> String {
    format!("${}", format_number(value, 2))
}

/// Whole-dollar amount used for market cap and volume: `1234567.8` → `"$1,234,568"`.
pub fn format_whole_usd(value: f64) -> String {
    format!("${}", format_number(value, 0))
}

/// Signed percentage with two decimals: `1.2` → `"+1.20%"`, `-0.5` → `"-0.50%"`.
pub fn format_percent(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{sign}{value:.2}%")
}

/// Circulating supply followed by the ticker: `"19,500,000 BTC"`.
pub fn format_supply(value: f64, symbol: &str) -> String {
    format!("{} {}", format_number(value, 0), symbol)
}

/// Compact dollar notation for large figures (`2.5e12` → `"$2.50T"`).
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    let (scaled, suffix) = if abs >= 1e12 {
        (abs / 1e12, "T")
    } else if abs >= 1e9 {
        (abs / 1e9, "B")
    } else if abs >= 1e6 {
        (abs / 1e6, "M")
    } else if abs >= 1e3 {
        (abs / 1e3, "K")
    } else {
        (abs, "")
    };
    format!("{sign}${scaled:.2}{suffix}")
}

/// Parse a formatted display string back into a number.
///
/// Every character that is not a digit, `.` or `-` is stripped first, so
/// `"$1,234.56"` → `1234.56` and `"+1.20%"` → `1.2`. Anything that still
/// fails to parse is treated as `0.0`.
pub fn parse_numeric(value: &str) -> f64 {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Classify a signed display value; `None` when it holds no number at all.
pub fn percent_tone(value: &str) -> Option<Tone> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let parsed: f64 = cleaned.parse().ok()?;
    if parsed >= 0.0 {
        Some(Tone::Positive)
    } else {
        Some(Tone::Negative)
    }
}
