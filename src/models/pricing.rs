//! Derived money figures. Nothing here is ever persisted.

pub fn compute_profit(price: f64, labour: f64, parts: f64) -> f64 {
    price - (labour + parts)
}

/// Profit as a percentage of cost. With zero cost the result is 100 for any
/// positive price and 0 otherwise.
pub fn compute_profit_percent(price: f64, labour: f64, parts: f64) -> f64 {
    let cost = labour + parts;
    if cost > 0.0 {
        compute_profit(price, labour, parts) / cost * 100.0
    } else if price > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Lenient number parsing for user input: empty or non-numeric text is 0.
pub fn parse_num(input: &str) -> f64 {
    let input = input.trim();
    if input.is_empty() {
        return 0.0;
    }
    input
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// At most two fraction digits, trailing zeros dropped.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.2}", round2(value));
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return "0%".to_string();
    }
    format!("{}%", format_amount(value))
}
