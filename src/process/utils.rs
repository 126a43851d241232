/// Parse a locale-tolerant decimal: trims, accepts `,` as the decimal
/// separator, rejects empty and literal `nan`. Shared by the normalizer and
/// the gold reducers.
pub fn parse_locale_float(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', ".");
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return None;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => None,
        Ok(v) => Some(v),
        Err(_) => None,
    }
}

/// Render a non-negative monetary value the way silver files have always
/// carried it: integral values keep one trailing zero (`150000.0`),
/// everything else prints its shortest representation.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
