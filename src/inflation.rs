use serde::{Deserialize, Serialize};

/// Price level all monetary values are restated in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferencePrice {
    pub year: i32,
    pub index: f64,
}

impl Default for ReferencePrice {
    /// CPI-U annual average for 2019.
    fn default() -> Self {
        Self {
            year: 2019,
            index: 255.657,
        }
    }
}

impl ReferencePrice {
    pub fn adjust(&self, value: f64, origin_index: f64) -> Option<f64> {
        adjust(value, self.index, origin_index)
    }
}

/// Restates `value` from the price level `index_origin` to `index_current`.
/// A zero or non-finite origin index has no meaningful ratio and yields `None`.
pub fn adjust(value: f64, index_current: f64, index_origin: f64) -> Option<f64> {
    if index_origin == 0.0 || !index_origin.is_finite() {
        return None;
    }
    let adjusted = value * index_current / index_origin;
    adjusted.is_finite().then_some(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn adjust_restates_2009_budget_in_2019_dollars() {
        let adjusted = ReferencePrice::default()
            .adjust(237_000_000.0, 214.537)
            .expect("adjusted");
        assert!((adjusted - 282_430_000.0).abs() / 282_430_000.0 < 0.01);
    }

    #[test]
    fn adjust_refuses_zero_origin_index() {
        assert_eq!(adjust(100.0, 255.657, 0.0), None);
    }

    proptest! {
        #[test]
        fn adjust_round_trips(
            value in -1e12f64..1e12,
            a in 1.0f64..1000.0,
            b in 1.0f64..1000.0,
        ) {
            let there = adjust(value, b, a).expect("forward");
            let back = adjust(there, a, b).expect("back");
            prop_assert!((back - value).abs() <= 1e-9 * value.abs().max(1.0));
        }
    }
}
