/// Rounds to `digits` significant digits and drops trailing zeros.
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    let magnitude = value.abs().log10().floor() as i64;
    let excess = magnitude + 1 - digits as i64;
    if excess > 0 {
        let scale = 10f64.powi(excess as i32);
        return format!("{:.0}", (value / scale).round() * scale);
    }

    let decimals = (digits as i64 - 1 - magnitude).max(0) as usize;
    let rendered = format!("{value:.decimals$}");

    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned()
    } else {
        rendered
    }
}

pub fn model_stem(model: &str) -> &str {
    model.strip_suffix(".pth").unwrap_or(model)
}
