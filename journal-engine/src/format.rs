//! Presentation-time rounding. Analytics keep full precision; values are
//! rounded only when turned into display strings here.

use common::AnalyticsConfig;

const UNDEFINED: &str = "n/a";

/// Formats currency, ratio and percentage values for display
#[derive(Debug, Clone)]
pub struct Formatter {
    currency_symbol: String,
    currency_decimals: usize,
    ratio_decimals: usize,
}

impl Formatter {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            currency_symbol: config.currency_symbol.clone(),
            currency_decimals: config.currency_decimals,
            ratio_decimals: config.ratio_decimals,
        }
    }

    /// `-$1,234.50`
    pub fn currency(&self, value: f64) -> String {
        if !value.is_finite() {
            return UNDEFINED.to_string();
        }
        let sign = if value < 0.0 && round_to(value.abs(), self.currency_decimals) > 0.0 {
            "-"
        } else {
            ""
        };
        let digits = format!("{:.*}", self.currency_decimals, value.abs());
        format!("{}{}{}", sign, self.currency_symbol, group_thousands(&digits))
    }

    /// Signed currency, `+$12.00` / `-$3.50`
    pub fn signed_currency(&self, value: f64) -> String {
        let formatted = self.currency(value);
        if value.is_finite() && !formatted.starts_with('-') && round_to(value, self.currency_decimals) > 0.0 {
            format!("+{}", formatted)
        } else {
            formatted
        }
    }

    pub fn ratio(&self, value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{:.*}", self.ratio_decimals, v),
            _ => UNDEFINED.to_string(),
        }
    }

    /// `1.50R`
    pub fn r_multiple(&self, value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{:.*}R", self.ratio_decimals, v),
            _ => UNDEFINED.to_string(),
        }
    }

    /// `value` is already in percent
    pub fn percent(&self, value: f64) -> String {
        if value.is_finite() {
            format!("{:.1}%", value)
        } else {
            UNDEFINED.to_string()
        }
    }
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Insert thousands separators into the integer part of `digits`
fn group_thousands(digits: &str) -> String {
    let (integer, fraction) = match digits.find('.') {
        Some(pos) => digits.split_at(pos),
        None => (digits, ""),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(fraction);
    grouped
}
