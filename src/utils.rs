/// Shortens a Go-style duration (`"26h3m4.5s"`, `"750ms"`) to the largest
/// whole unit: `1d`, `3h`, `12m`, `45s`.
pub fn format_age(raw: &str) -> String {
    match parse_go_duration(raw) {
        Some(secs) => {
            let secs = secs as u64;
            if secs >= 86400 {
                format!("{}d", secs / 86400)
            } else if secs >= 3600 {
                format!("{}h", secs / 3600)
            } else if secs >= 60 {
                format!("{}m", secs / 60)
            } else {
                format!("{secs}s")
            }
        }
        None => "?".to_string(),
    }
}

fn parse_go_duration(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let mut rest = raw;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let value: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            _ => return None,
        };
        total += value * scale;
        rest = &rest[unit_end..];
    }
    Some(total)
}
