/// Intersection of two ascending id lists
pub fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut shared = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

/// Formats a number like C's `%.5g`
///
/// Five significant digits, trailing zeros dropped, scientific notation when
/// the decimal exponent is below -4 or at least 5.
pub fn format_g5(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let scientific = format!("{value:.4e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-4..5).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (4 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

/// Drops trailing zeros of a fractional part, then a dangling point
fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_sorted() {
        assert_eq!(intersect_sorted(&[1, 3, 5, 7], &[2, 3, 4, 7, 9]), vec![3, 7]);
        assert!(intersect_sorted(&[1, 2], &[]).is_empty());
        assert_eq!(intersect_sorted(&[0, 1, 2], &[0, 1, 2]), vec![0, 1, 2]);
    }

    #[test]
    fn test_format_g5_fixed() {
        assert_eq!(format_g5(0.00699300699301), "0.006993");
        assert_eq!(format_g5(0.034965034965), "0.034965");
        assert_eq!(format_g5(1.0), "1");
        assert_eq!(format_g5(5.0), "5");
        assert_eq!(format_g5(2.611164839), "2.6112");
        assert_eq!(format_g5(-2.611164839), "-2.6112");
        assert_eq!(format_g5(12345.0), "12345");
        assert_eq!(format_g5(0.0), "0");
    }

    #[test]
    fn test_format_g5_scientific() {
        assert_eq!(format_g5(0.00001), "1e-05");
        assert_eq!(format_g5(3.9682539682e-3), "0.0039683");
        assert_eq!(format_g5(2.5e-7), "2.5e-07");
        assert_eq!(format_g5(123456.0), "1.2346e+05");
        assert_eq!(format_g5(99999.5), "1e+05");
    }
}
