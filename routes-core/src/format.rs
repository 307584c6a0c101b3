//! Human-readable distance and duration strings

/// "850 m" below one kilometer, "1.2 km" from there on.
/// Meters are truncated, not rounded.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.max(0.0) as u64)
    }
}

/// "14 min" below one hour, "1 h 5 min" from there on.
/// Partial minutes are truncated.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0) as u64;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(999.9), "999 m");
        assert_eq!(format_distance(1000.0), "1.0 km");
        assert_eq!(format_distance(1260.0), "1.3 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59.0), "0 min");
        assert_eq!(format_duration(357.0), "5 min");
        assert_eq!(format_duration(3600.0), "1 h 0 min");
        assert_eq!(format_duration(3900.0), "1 h 5 min");
    }
}
