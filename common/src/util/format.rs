//! Number rendering for the per-step report line. Scientific values use an
//! explicit exponent sign and at least two exponent digits (`1.500E+06`), so
//! existing log parsers keep working.

pub fn sci(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return format!("{}", value).to_uppercase();
    }
    let raw = format!("{:.*E}", precision, value);
    match raw.split_once('E') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

pub fn fixed(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

/// `[a, b, c]` with every element in scientific notation.
pub fn sci_list(values: &[f64], precision: usize) -> String {
    let parts: Vec<String> = values.iter().map(|&v| sci(v, precision)).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_has_sign_and_two_digits() {
        assert_eq!(sci(0.2, 6), "2.000000E-01");
        assert_eq!(sci(5.0e6, 3), "5.000E+06");
        assert_eq!(sci(1.805e9, 4), "1.8050E+09");
        assert_eq!(sci(0.0, 3), "0.000E+00");
        assert_eq!(sci(-1.25e-120, 2), "-1.25E-120");
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(sci(f64::NAN, 3), "NAN");
        assert_eq!(sci(f64::INFINITY, 3), "INF");
    }

    #[test]
    fn list_rendering() {
        assert_eq!(sci_list(&[0.1, 2.0], 3), "[1.000E-01, 2.000E+00]");
        assert_eq!(fixed(120.0, 3), "120.000");
    }
}
