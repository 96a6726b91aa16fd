//! Body-mass-index calculation
//!
//! No validation is applied: zero height yields `Infinity`, a missing or
//! non-numeric value yields `NaN`, and both are passed through as strings.

use serde_json::Value;

/// BMI for `height` in centimeters and `weight` in kilograms,
/// formatted with exactly two decimal places
pub fn calculate_bmi(height: f64, weight: f64) -> String {
    let height_in_meters = height / 100.0;
    to_fixed_2(weight / (height_in_meters * height_in_meters))
}

/// Coerce a stored attribute to a number
///
/// Numbers are used as-is, numeric strings are parsed (blank is 0, `0x`,
/// `0o` and `0b` literals are accepted), booleans are 1/0 and `null` is 0.
/// Arrays go through their comma-joined text, so `[]` is 0 and `[180]` is
/// 180. Objects, missing values and anything unparsable are `NaN`.
pub fn numeric_value(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_numeric_str(s),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Null) => 0.0,
        Some(array @ Value::Array(_)) => parse_numeric_str(&joined_text(array)),
        Some(Value::Object(_)) | None => f64::NAN,
    }
}

/// Text form of a value as it appears inside a joined array
fn joined_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(joined_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn parse_numeric_str(s: &str) -> f64 {
    let trimmed = s.trim();
    if let Some(value) = parse_radix_literal(trimmed) {
        return value;
    }
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings that are not numeric here
        _ if trimmed
            .chars()
            .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') =>
        {
            f64::NAN
        }
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// Unsigned `0x`/`0o`/`0b` literal; `None` when there is no such prefix
fn parse_radix_literal(s: &str) -> Option<f64> {
    let prefix = s.get(..2)?;
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &s[2..];
    if digits.is_empty() {
        return Some(f64::NAN);
    }
    let value = digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix)
                .map(|d| acc.mul_add(f64::from(radix), f64::from(d)))
        })
        .unwrap_or(f64::NAN);
    Some(value)
}

/// Two-decimal text with ties rounded away from zero, measured on the
/// exact binary value; magnitudes of 1e21 and above use exponent form
fn to_fixed_2(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    if value.abs() >= 1e21 {
        return format!("{value:e}").replacen('e', "e+", 1);
    }

    // 1100 places is the full expansion of any finite f64
    let exact = format!("{:.1100}", value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .collect();
    if frac_part.as_bytes().get(2).is_some_and(|d| *d >= b'5') {
        round_up(&mut digits);
    }

    let split = digits.len() - 2;
    let (whole, cents) = digits.split_at(split);
    let sign = if value < 0.0 { "-" } else { "" };
    format!(
        "{sign}{}.{}",
        String::from_utf8_lossy(whole),
        String::from_utf8_lossy(cents)
    )
}

/// Add one to the last place of an ASCII digit string
fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}
