use {
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    rand_distr::StandardNormal,
};

/// Temporally correlated exploration noise from an Ornstein-Uhlenbeck process.
///
/// The internal state advances elementwise via
/// `x <- x + theta * (mu - x) * dt + sigma * sqrt(dt) * N(0, 1)`
/// and is only reset to `mu` at episode boundaries, never between steps.
pub struct OuNoise {
    mu: f64,
    theta: f64,
    sigma: f64,
    dt: f64,
    state: Vec<f64>,
    rng: StdRng,
}
impl OuNoise {
    pub fn new(
        mu: f64,
        theta: f64,
        sigma: f64,
        dt: f64,
        size_action: usize,
    ) -> Self {
        Self {
            mu,
            theta,
            sigma,
            dt,
            state: vec![mu; size_action],
            rng: StdRng::from_entropy(),
        }
    }

    /// Set the internal state back to its mean. Called at episode start.
    pub fn reset(&mut self) {
        self.state.fill(self.mu);
    }

    /// Advance the process by one step and return the new state.
    pub fn sample(&mut self) -> Vec<f64> {
        let scale = self.sigma * self.dt.sqrt();
        for x in self.state.iter_mut() {
            let rand: f64 = self.rng.sample(StandardNormal);
            *x += self.theta * (self.mu - *x) * self.dt + scale * rand;
        }
        self.state.clone()
    }

    pub fn current(&self) -> &[f64] {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_returns_state_to_mean() {
        let mut noise = OuNoise::new(0.5, 0.15, 0.2, 1e-2, 3);
        for _ in 0..100 {
            noise.sample();
        }
        noise.reset();
        assert!(noise.current().iter().all(|&x| x == 0.5));
    }

    #[test]
    fn stationary_statistics_match_the_process() {
        let (mu, theta, sigma, dt) = (0.0, 0.15, 0.2, 1e-2);
        let mut noise = OuNoise::new(mu, theta, sigma, dt, 1);

        // Skip the burn-in towards the stationary distribution.
        for _ in 0..10_000 {
            noise.sample();
        }

        let n = 2_000_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let x = noise.sample()[0];
            sum += x;
            sum_sq += x * x;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;

        // The process mixes slowly (decorrelation time ~1/(theta*dt) steps),
        // so the tolerances stay loose even for millions of samples.
        let stationary_var = sigma * sigma / (2.0 * theta);
        assert!(mean.abs() < 0.1, "empirical mean {mean} too far from {mu}");
        assert!(
            (var - stationary_var).abs() < 0.05,
            "empirical variance {var} too far from {stationary_var}",
        );
    }
}
