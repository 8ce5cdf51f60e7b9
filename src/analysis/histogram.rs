//! Equal-width binning of integer samples.

/// Bin counts over an equal-width partition of a value range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// Bins over the observed range `[min, max]`, last bin closed.
    ///
    /// Value `v` falls in bin `floor((v - min) * bins / (max - min))`,
    /// computed exactly. When every value is equal the range is widened
    /// to `[v - 0.5, v + 0.5]`, so the values land in the middle bin.
    pub fn observed(values: &[i64], bins: usize) -> Self {
        let bins = bins.max(1);
        let mut counts = vec![0u64; bins];

        let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
            return Self { counts };
        };

        if min == max {
            counts[bins / 2] += values.len() as u64;
            return Self { counts };
        }

        let span = max as i128 - min as i128;
        for &value in values {
            let offset = value as i128 - min as i128;
            let index = (offset * bins as i128 / span) as usize;
            counts[index.min(bins - 1)] += 1;
        }

        Self { counts }
    }

    /// Bins over the declared integer range `[0, max_value)`.
    ///
    /// Value `v` falls in bin `floor(v * bins / max_value)`, computed
    /// exactly. Returns the first value outside the range as `Err`.
    pub fn declared(values: &[i64], bins: usize, max_value: u64) -> Result<Self, i64> {
        let bins = bins.max(1);
        let mut counts = vec![0u64; bins];

        for &value in values {
            let in_range = u64::try_from(value).ok().filter(|&v| v < max_value);
            let Some(v) = in_range else {
                return Err(value);
            };
            let index = (v as u128 * bins as u128 / max_value as u128) as usize;
            counts[index] += 1;
        }

        Ok(Self { counts })
    }

    /// Returns the count per bin.
    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Returns the number of bins.
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Returns the total number of binned values.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Pearson chi-square statistic against equal expected counts.
    pub fn chi_square(&self) -> f64 {
        let expected = self.total() as f64 / self.bin_count() as f64;
        if expected == 0.0 {
            return 0.0;
        }
        self.counts
            .iter()
            .map(|&observed| (observed as f64 - expected).powi(2) / expected)
            .sum()
    }

    /// Consumes the histogram, returning the counts.
    pub fn into_counts(self) -> Vec<u64> {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_bins_close_last_edge() {
        let values: Vec<i64> = (0..=9).collect();
        let histogram = Histogram::observed(&values, 3);
        // width 3: [0,3) [3,6) [6,9]
        assert_eq!(histogram.counts(), &[3, 3, 4]);
    }

    #[test]
    fn test_constant_values_land_in_middle_bin() {
        let histogram = Histogram::observed(&[5; 12], 10);
        assert_eq!(histogram.counts()[5], 12);
        assert_eq!(histogram.total(), 12);
    }

    #[test]
    fn test_negative_values_binned() {
        let histogram = Histogram::observed(&[-10, -5, 0, 5, 10], 2);
        assert_eq!(histogram.counts(), &[2, 3]);
    }

    #[test]
    fn test_large_offsets_binned_exactly() {
        let offset = 1i64 << 60;
        let values: Vec<i64> = (0..1000).map(|i| offset + i % 100).collect();
        let histogram = Histogram::observed(&values, 10);
        assert_eq!(histogram.counts(), &[100; 10]);
    }

    #[test]
    fn test_full_i64_span() {
        let histogram = Histogram::observed(&[i64::MIN, -1, 0, i64::MAX], 2);
        assert_eq!(histogram.counts(), &[2, 2]);
    }

    #[test]
    fn test_declared_range_is_exact() {
        let values: Vec<i64> = (0..100).collect();
        let histogram = Histogram::declared(&values, 10, 100).unwrap();
        assert_eq!(histogram.counts(), &[10; 10]);
        assert_eq!(histogram.chi_square(), 0.0);
    }

    #[test]
    fn test_declared_range_rejects_outliers() {
        assert_eq!(Histogram::declared(&[1, 100], 10, 100), Err(100));
        assert_eq!(Histogram::declared(&[-1], 10, 100), Err(-1));
    }

    #[test]
    fn test_chi_square_of_skewed_counts() {
        let histogram = Histogram::declared(&[0, 0, 0, 1], 2, 2).unwrap();
        // expected 2 per bin: (3-2)^2/2 + (1-2)^2/2
        assert!((histogram.chi_square() - 1.0).abs() < 1e-12);
    }
}
