//! Small numeric helpers used by the report formatter and energy checks.

/// Number of decimal digits needed to print `value`, ignoring sign.
pub fn digits(value: i64) -> usize {
    let mut v = value.unsigned_abs();
    let mut n = 1;
    while v >= 10 {
        v /= 10;
        n += 1;
    }
    n
}

/// Poisson-propagated error on the ratio `numerator / denominator`:
/// `|n/d| * sqrt((σn/n)² + (σd/d)²)` with `σ = sqrt(count)`.
///
/// Returns `None` when either count is zero.
pub fn ratio_error(numerator: u64, denominator: u64) -> Option<f64> {
    if numerator == 0 || denominator == 0 {
        return None;
    }
    let n = numerator as f64;
    let d = denominator as f64;
    let rel_n = n.sqrt() / n;
    let rel_d = d.sqrt() / d;
    Some((n / d).abs() * (rel_n * rel_n + rel_d * rel_d).sqrt())
}

/// Inclusive tolerance comparison.
pub fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
