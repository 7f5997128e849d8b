/// Format a number for display.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e10 {
        format!("{:.0}", n)
    } else {
        format!("{:.2}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::format_number;

    #[test]
    fn test_integers_have_no_decimals() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_fractions_keep_two_decimals() {
        assert_eq!(format_number(499.99), "499.99");
        assert_eq!(format_number(2.5), "2.50");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_number(f64::NAN), "#NAN!");
        assert_eq!(format_number(f64::INFINITY), "#INF!");
    }
}
