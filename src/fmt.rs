use chrono::Month;
use colored::{ColoredString, Colorize};

use crate::aggregator::classify_variance;
use crate::models::VarianceClass;

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Dollar amount with thousands separators: $1,234.56 / -$1,234.56
pub fn money(val: f64) -> String {
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if val < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{dec_part}", group_thousands(int_part))
}

/// Variance amount colored by sign: green under budget, red over.
pub fn variance(val: f64) -> ColoredString {
    let text = money(val);
    match classify_variance(val) {
        VarianceClass::Positive => text.green(),
        VarianceClass::Negative => text.red(),
        VarianceClass::Neutral => text.normal(),
    }
}

pub fn pct(val: Option<f64>) -> String {
    match val {
        Some(v) => format!("{v:.1}%"),
        None => "—".to_string(),
    }
}

/// Three-letter month label, or the number itself when out of range.
pub fn month_label(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name()[..3].to_string())
        .unwrap_or_else(|| month.to_string())
}
