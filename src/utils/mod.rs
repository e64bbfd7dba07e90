/// Human readable byte count (1024-based)
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Fraction downloaded in 0.0..=1.0, or 0.0 when the total is unknown
pub fn progress_fraction(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32).min(1.0),
        _ => 0.0,
    }
}

/// Status line shown while bytes are arriving
pub fn progress_text(downloaded: u64, total: Option<u64>) -> String {
    match total {
        Some(total) => format!(
            "Downloading map ... {} of {}",
            format_size(downloaded),
            format_size(total)
        ),
        None => format!("Downloading map ... {}", format_size(downloaded)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(250 * 1024 * 1024), "250.0 MB");
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(progress_fraction(50, Some(200)), 0.25);
        assert_eq!(progress_fraction(10, None), 0.0);
        assert_eq!(progress_fraction(10, Some(0)), 0.0);
        assert_eq!(progress_fraction(300, Some(200)), 1.0);
    }

    #[test]
    fn test_progress_text() {
        assert_eq!(
            progress_text(1024, Some(2048)),
            "Downloading map ... 1.0 KB of 2.0 KB"
        );
        assert_eq!(progress_text(100, None), "Downloading map ... 100 B");
    }
}
