/// Asserts that two `f64` values differ by less than `prec`.
#[macro_export]
macro_rules! assert_almost_eq {
    ($a:expr, $b:expr, $prec:expr $(,)?) => {
        if !$crate::numeric::almost_eq($a, $b, $prec) {
            panic!(
                "assertion failed: `abs(left - right) < {:e}`, (left: `{}`, right: `{}`)",
                $prec, $a, $b
            );
        }
    };
}

/// Asserts that two series of `f64` have the same length and agree element-wise
/// to within `prec`. The failure message names the first differing position.
#[macro_export]
macro_rules! assert_series_almost_eq {
    ($a:expr, $b:expr, $prec:expr $(,)?) => {{
        let left: &[f64] = &$a;
        let right: &[f64] = &$b;
        assert_eq!(
            left.len(),
            right.len(),
            "assertion failed: series lengths differ"
        );
        for (position, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            if !$crate::numeric::almost_eq(*l, *r, $prec) {
                panic!(
                    "assertion failed at position {}: `abs(left - right) < {:e}`, (left: `{}`, right: `{}`)",
                    position, $prec, l, r
                );
            }
        }
    }};
}
