use rand::Rng;

/// Probabilistic admission check, drawn once per logical request.
#[derive(Debug, Clone, Copy)]
pub struct SamplingGate {
    rate_percent: f64,
}

impl SamplingGate {
    /// `rate_percent` is the chance, in percent, that a request is logged.
    /// Values outside `0..=100` (and NaN) are clamped.
    pub fn new(rate_percent: f64) -> Self {
        let rate_percent = if rate_percent.is_nan() {
            0.0
        } else {
            rate_percent.clamp(0.0, 100.0)
        };
        Self { rate_percent }
    }

    pub fn rate_percent(&self) -> f64 {
        self.rate_percent
    }

    pub fn should_process(&self) -> bool {
        self.should_process_with(&mut rand::thread_rng())
    }

    /// Same as [`should_process`](Self::should_process) with a caller-supplied RNG.
    pub fn should_process_with<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.rate_percent <= 0.0 {
            return false;
        }
        if self.rate_percent >= 100.0 {
            return true;
        }
        rng.gen::<f64>() * 100.0 < self.rate_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_never_samples_and_hundred_always_does() {
        let mut rng = StdRng::seed_from_u64(1);
        let never = SamplingGate::new(0.0);
        let always = SamplingGate::new(100.0);
        for _ in 0..10_000 {
            assert!(!never.should_process_with(&mut rng));
            assert!(always.should_process_with(&mut rng));
        }
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        assert_eq!(SamplingGate::new(-5.0).rate_percent(), 0.0);
        assert_eq!(SamplingGate::new(250.0).rate_percent(), 100.0);
        assert_eq!(SamplingGate::new(f64::NAN).rate_percent(), 0.0);
        assert!(!SamplingGate::new(-1.0).should_process());
        assert!(SamplingGate::new(101.0).should_process());
    }

    #[test]
    fn sampled_fraction_converges_to_rate() {
        const TRIALS: usize = 100_000;
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for rate in [1.0, 10.0, 25.0, 50.0, 90.0, 99.0] {
            let gate = SamplingGate::new(rate);
            let hits = (0..TRIALS)
                .filter(|_| gate.should_process_with(&mut rng))
                .count();

            let p = rate / 100.0;
            let observed = hits as f64 / TRIALS as f64;
            // Five standard deviations of the binomial proportion.
            let tolerance = 5.0 * (p * (1.0 - p) / TRIALS as f64).sqrt();
            assert!(
                (observed - p).abs() <= tolerance,
                "rate {rate}: observed {observed}, expected {p} +/- {tolerance}"
            );
        }
    }
}
