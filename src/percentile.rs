/// Collects the values of one group and answers quantile queries over them.
///
/// The result is the nearest-rank quantile: the smallest observed value with
/// at least `q * n` values at or below it. It is always an observed value,
/// never an interpolation, so the median of an even-sized group is its lower
/// middle element. Accumulators built over disjoint shards of a group can be
/// merged in any order with the same answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentileAccumulator {
    values: Vec<f64>,
}

impl PercentileAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nulls and NaN are ignored, as an SQL percentile aggregate ignores nulls.
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|v| !v.is_nan()) {
            self.values.push(value);
        }
    }

    pub fn merge(&mut self, other: PercentileAccumulator) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.values.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let rank = (q * n as f64).ceil() as usize;
        Some(sorted[rank.clamp(1, n) - 1])
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator(values: &[f64]) -> PercentileAccumulator {
        let mut acc = PercentileAccumulator::new();
        for value in values {
            acc.push(Some(*value));
        }
        acc
    }

    #[test]
    fn median_of_odd_group_is_middle_value() {
        assert_eq!(accumulator(&[5.0, 1.0, 3.0]).median(), Some(3.0));
    }

    #[test]
    fn median_of_even_group_is_lower_middle_value() {
        assert_eq!(accumulator(&[4.0, 1.0, 3.0, 2.0]).median(), Some(2.0));
    }

    #[test]
    fn nulls_and_nan_are_ignored() {
        let mut acc = accumulator(&[10.0]);
        acc.push(None);
        acc.push(Some(f64::NAN));
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.median(), Some(10.0));
    }

    #[test]
    fn empty_group_has_no_median() {
        assert_eq!(PercentileAccumulator::new().median(), None);
    }

    #[test]
    fn merged_shards_agree_with_single_pass() {
        let all = accumulator(&[9.0, 2.0, 7.0, 4.0, 5.0, 1.0]);
        let mut left = accumulator(&[9.0, 2.0, 7.0]);
        left.merge(accumulator(&[4.0, 5.0, 1.0]));
        assert_eq!(left.median(), all.median());
        assert_eq!(left.quantile(0.9), Some(9.0));
        assert_eq!(left.quantile(0.0), Some(1.0));
    }
}
