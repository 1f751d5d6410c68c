//! Number formatting shared by the renderers.

/// Format a number with `decimals` places, switching to scientific notation
/// for values that would otherwise print as zero or be unreadably long.
pub fn number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let abs = value.abs();
    let smallest = 10f64.powi(-(decimals as i32));
    if abs != 0.0 && (abs < smallest || abs >= 1e7) {
        format!("{:.*e}", decimals.min(4), value)
    } else {
        format!("{:.*}", decimals, value)
    }
}

/// Credible interval label, e.g. `95% CrI`.
pub fn level_label(level: f64) -> String {
    let pct = level * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{:.0}% CrI", pct)
    } else {
        format!("{:.1}% CrI", pct)
    }
}

/// `[lower, upper]` with the configured precision.
pub fn interval(lower: f64, upper: f64, decimals: usize) -> String {
    format!("[{}, {}]", number(lower, decimals), number(upper, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number() {
        assert_eq!(number(1.23456, 2), "1.23");
        assert_eq!(number(0.0, 3), "0.000");
        assert_eq!(number(-0.5, 1), "-0.5");
        assert_eq!(number(0.00001, 2), "1.00e-5");
        assert_eq!(number(f64::INFINITY, 2), "inf");
    }

    #[test]
    fn test_level_label() {
        assert_eq!(level_label(0.95), "95% CrI");
        assert_eq!(level_label(0.975), "97.5% CrI");
    }

    #[test]
    fn test_interval() {
        assert_eq!(interval(-1.0, 2.5, 1), "[-1.0, 2.5]");
    }
}
