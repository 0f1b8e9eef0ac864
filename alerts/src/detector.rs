//! Drop detection.
//
//  Pure: no async, no IO.

/// Both gates a drop must clear before it is worth an alert.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropThresholds {
    /// Minimum relative drop as a fraction of the previous price (0.05 = 5%).
    pub pct: f64,
    /// Minimum absolute drop in whole rupees.
    pub abs: i64,
}

impl Default for DropThresholds {
    fn default() -> Self {
        Self { pct: 0.05, abs: 500 }
    }
}

impl DropThresholds {
    pub fn new(pct: f64, abs: i64) -> Self {
        Self { pct, abs }
    }

    pub fn is_significant(&self, current: i64, previous: i64) -> bool {
        is_significant_drop(current, previous, self.pct, self.abs)
    }
}

/// True iff the drop from `previous` to `current` meets the absolute AND the
/// percentage threshold. A non-positive `previous` has nothing to compare
/// against. Zero thresholds let an unchanged price through.
pub fn is_significant_drop(current: i64, previous: i64, pct_threshold: f64, abs_threshold: i64) -> bool {
    if previous <= 0 {
        return false;
    }

    let drop = previous - current;
    drop >= abs_threshold && (drop as f64 / previous as f64) >= pct_threshold
}

/// Drop from `old` to `new` in percent. Zero when either price is unusable.
pub fn drop_percentage(old: i64, new: i64) -> f64 {
    if old <= 0 || new <= 0 {
        return 0.0;
    }
    (old - new) as f64 / old as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn both_thresholds_met() {
        assert!(is_significant_drop(72900, 79900, 0.05, 500));
    }

    #[test]
    fn absolute_met_but_percentage_not() {
        assert!(!is_significant_drop(79400, 79900, 0.05, 500));
    }

    #[test]
    fn percentage_met_but_absolute_not() {
        assert!(!is_significant_drop(50, 100, 0.05, 500));
        assert!(!is_significant_drop(100, 50, 0.05, 500));
    }

    #[test]
    fn exact_thresholds_qualify() {
        // 500 off 10_000 is exactly 5%
        assert!(is_significant_drop(9500, 10_000, 0.05, 500));
    }

    #[test]
    fn non_positive_previous_never_qualifies() {
        assert!(!is_significant_drop(-1000, 0, 0.0, 0));
        assert!(!is_significant_drop(-1000, -5, 0.0, 0));
    }

    #[test]
    fn zero_thresholds_accept_an_unchanged_price() {
        assert!(is_significant_drop(100, 100, 0.0, 0));
        assert!(!is_significant_drop(101, 100, 0.0, 0));
    }

    #[test]
    fn one_rupee_short_of_either_gate_fails() {
        assert!(!is_significant_drop(9501, 10_000, 0.05, 499));
        assert!(is_significant_drop(9500, 10_000, 0.05, 499));
        assert!(!is_significant_drop(9500, 10_000, 0.0501, 500));
    }

    #[test]
    fn negative_thresholds_let_increases_through() {
        assert!(is_significant_drop(110, 100, -0.5, -20));
        assert!(!is_significant_drop(130, 100, -0.5, -20));
    }

    #[test]
    fn percentage_matches_manual_calculation() {
        let pct = drop_percentage(79900, 72900);
        assert!((pct - 8.7609).abs() < 1e-3);
        assert_eq!(drop_percentage(0, 100), 0.0);
        assert_eq!(drop_percentage(100, 0), 0.0);
        assert!(drop_percentage(100, 120) < 0.0);
    }

    #[test]
    fn default_thresholds() {
        let t = DropThresholds::default();
        assert!(t.is_significant(72900, 79900));
        assert!(!t.is_significant(79400, 79900));
    }

    proptest! {
        #[test]
        fn matches_both_gates_exactly(
            previous in 1i64..10_000_000,
            current in 0i64..10_000_000,
            abs in 0i64..5_000,
            pct in 0.0f64..0.5,
        ) {
            let drop = previous - current;
            let expected = drop >= abs && drop as f64 / previous as f64 >= pct;
            prop_assert_eq!(is_significant_drop(current, previous, pct, abs), expected);
        }

        #[test]
        fn significant_implies_both_gates(previous in 1i64..10_000_000, current in 0i64..10_000_000) {
            if is_significant_drop(current, previous, 0.05, 500) {
                prop_assert!(previous - current >= 500);
                prop_assert!((previous - current) as f64 / previous as f64 >= 0.05);
            }
        }
    }
}
