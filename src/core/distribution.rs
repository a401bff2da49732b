use super::rng::Rng;
use super::types::SimError;

// Shares are required to sum to 1; empirical tables carry rounding noise.
pub const SHARE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ReturnDistribution {
    asset: String,
    rates: Vec<f64>,
    shares: Vec<f64>,
}

impl ReturnDistribution {
    pub fn new(asset: impl Into<String>, outcomes: &[(f64, f64)]) -> Result<Self, SimError> {
        let asset = asset.into();
        if outcomes.is_empty() {
            return Err(SimError::Distribution(format!(
                "{asset}: distribution has no outcomes"
            )));
        }

        let mut rates = Vec::with_capacity(outcomes.len());
        let mut shares = Vec::with_capacity(outcomes.len());
        for &(rate, share) in outcomes {
            if !rate.is_finite() {
                return Err(SimError::Distribution(format!(
                    "{asset}: rate {rate} is not finite"
                )));
            }
            if !share.is_finite() || share < 0.0 {
                return Err(SimError::Distribution(format!(
                    "{asset}: share {share} must be finite and >= 0"
                )));
            }
            rates.push(rate);
            shares.push(share);
        }

        let sum: f64 = shares.iter().sum();
        if (sum - 1.0).abs() > SHARE_TOLERANCE {
            return Err(SimError::Distribution(format!(
                "{asset}: shares sum to {sum}, expected 1"
            )));
        }

        Ok(Self {
            asset,
            rates,
            shares,
        })
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn outcome_count(&self) -> usize {
        self.rates.len()
    }

    pub fn sample(&self, rng: &mut Rng) -> f64 {
        let u = rng.next_f64();
        let mut cumulative = 0.0;
        for (&rate, &share) in self.rates.iter().zip(&self.shares) {
            cumulative += share;
            if u < cumulative {
                return rate;
            }
        }
        // u landed in the tolerance gap above the cumulative sum.
        self.rates[self.rates.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_distribution() {
        let err = ReturnDistribution::new("sp500", &[]).expect_err("must reject empty table");
        assert!(matches!(err, SimError::Distribution(_)));
    }

    #[test]
    fn rejects_negative_share() {
        let err = ReturnDistribution::new("sp500", &[(0.05, 1.2), (0.01, -0.2)])
            .expect_err("must reject negative share");
        assert!(matches!(err, SimError::Distribution(_)));
        assert!(err.to_string().contains("sp500"));
    }

    #[test]
    fn rejects_shares_not_summing_to_one() {
        let err = ReturnDistribution::new("sp500", &[(0.05, 0.5), (0.01, 0.4)])
            .expect_err("must reject bad share sum");
        assert!(matches!(err, SimError::Distribution(_)));
    }

    #[test]
    fn rejects_non_finite_rate() {
        let err = ReturnDistribution::new("sp500", &[(f64::NAN, 1.0)])
            .expect_err("must reject NaN rate");
        assert!(matches!(err, SimError::Distribution(_)));
    }

    #[test]
    fn accepts_shares_within_tolerance() {
        let dist = ReturnDistribution::new("sp500", &[(0.05, 0.5), (0.01, 0.5 + 5e-7)])
            .expect("tolerance must absorb rounding noise");
        assert_eq!(dist.outcome_count(), 2);
    }

    #[test]
    fn degenerate_distribution_always_returns_its_only_rate() {
        let dist = ReturnDistribution::new("bond", &[(0.03, 1.0)]).expect("valid distribution");
        let mut rng = Rng::new(9);
        for _ in 0..100 {
            assert_eq!(dist.sample(&mut rng), 0.03);
        }
    }

    #[test]
    fn sample_only_ever_returns_listed_rates() {
        let dist = ReturnDistribution::new("sp500", &[(-0.30, 0.2), (0.07, 0.5), (0.25, 0.3)])
            .expect("valid distribution");
        let mut rng = Rng::new(1234);
        for _ in 0..10_000 {
            let rate = dist.sample(&mut rng);
            assert!(
                rate == -0.30 || rate == 0.07 || rate == 0.25,
                "unexpected rate {rate}"
            );
        }
    }

    #[test]
    fn sampling_frequencies_track_shares() {
        let dist = ReturnDistribution::new("sp500", &[(-0.30, 0.2), (0.07, 0.5), (0.25, 0.3)])
            .expect("valid distribution");
        let mut rng = Rng::new(20_240_101);
        let draws = 50_000;
        let mut hits = [0usize; 3];
        for _ in 0..draws {
            match dist.sample(&mut rng) {
                r if r == -0.30 => hits[0] += 1,
                r if r == 0.07 => hits[1] += 1,
                _ => hits[2] += 1,
            }
        }
        let freq = |n: usize| n as f64 / draws as f64;
        assert!((freq(hits[0]) - 0.2).abs() < 0.02, "got {}", freq(hits[0]));
        assert!((freq(hits[1]) - 0.5).abs() < 0.02, "got {}", freq(hits[1]));
        assert!((freq(hits[2]) - 0.3).abs() < 0.02, "got {}", freq(hits[2]));
    }

    #[test]
    fn fixed_seed_sampling_is_reproducible() {
        let dist = ReturnDistribution::new("sp500", &[(-0.10, 0.4), (0.12, 0.6)])
            .expect("valid distribution");
        let mut a = Rng::new(77);
        let mut b = Rng::new(77);
        for _ in 0..256 {
            assert_eq!(dist.sample(&mut a), dist.sample(&mut b));
        }
    }
}
