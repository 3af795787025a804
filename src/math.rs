/// ln(e^a + e^b) without leaving log space
///
/// Either argument may be `f64::NEG_INFINITY`, the result is then the other argument.
pub fn log_add(a: f64, b: f64) -> f64 {
    let (max, min) = if a > b { (a, b) } else { (b, a) };
    if max == f64::NEG_INFINITY {
        return max;
    }
    let diff = min - max;
    // exp underflows to 0 long before this, skip the work
    if diff < -30.0 {
        return max;
    }
    max + diff.exp().ln_1p()
}
