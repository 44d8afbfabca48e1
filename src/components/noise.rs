//! Exploration noise added to the continuous actions of an agent.
//!
//! Both processes own their random number generator. Pass in a seeded
//! generator (or use the `seeded` constructors) to get reproducible samples
//! without touching any global random state.

use {
    anyhow::{
        ensure,
        Result,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    rand_distr::StandardNormal,
    serde::{
        Deserialize,
        Serialize,
    },
    strum::Display,
};


/// Parameters for one of the supported noise processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
pub enum NoiseConfig {
    OrnsteinUhlenbeck {
        // Long-running mean of the process
        mu: f64,
        // Speed of mean reversion
        theta: f64,
        // Volatility
        sigma: f64,
    },
    DecayedGaussian {
        // The agent clips its noisy train actions to these bounds
        action_low: f64,
        action_high: f64,
        // Sigma decays linearly from max_sigma to min_sigma over decay_period steps
        min_sigma: f64,
        max_sigma: f64,
        decay_period: usize,
    },
}
impl NoiseConfig {
    pub fn ou() -> Self {
        Self::OrnsteinUhlenbeck {
            mu: 0.0,
            theta: 0.15,
            sigma: 0.2,
        }
    }

    pub fn gaussian() -> Self {
        Self::DecayedGaussian {
            action_low: -1.0,
            action_high: 1.0,
            min_sigma: 1.0,
            max_sigma: 1.0,
            decay_period: 1_000_000,
        }
    }
}


/// The Ornstein-Uhlenbeck process.
///
/// Every call to [`OuNoise::sample`] takes one Euler step of
///
/// $$ x \leftarrow x + \theta (\mu - x) + \sigma u, \quad u_i \sim U[0, 1) $$
///
/// and returns the new state, so consecutive samples form a temporally
/// correlated random walk. Note that the increments are drawn from a uniform
/// distribution on \[0, 1) rather than from a standard normal.
#[derive(Debug, Clone)]
pub struct OuNoise<R: Rng = StdRng> {
    mu: Vec<f64>,
    theta: f64,
    sigma: f64,
    state: Vec<f64>,
    rng: R,
}

impl OuNoise<StdRng> {
    /// Create a process of dimension `size` driven by a `StdRng` seeded with `seed`.
    pub fn seeded(
        size: usize,
        seed: u64,
        mu: f64,
        theta: f64,
        sigma: f64,
    ) -> Result<Self> {
        Self::new(size, mu, theta, sigma, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> OuNoise<R> {
    pub fn new(
        size: usize,
        mu: f64,
        theta: f64,
        sigma: f64,
        rng: R,
    ) -> Result<Self> {
        ensure!(size > 0, "OU noise size must be positive, got {size}");
        ensure!(
            mu.is_finite() && theta.is_finite() && sigma.is_finite(),
            "OU noise parameters must be finite (mu: {mu}, theta: {theta}, sigma: {sigma})",
        );

        let mu = vec![mu; size];
        Ok(Self {
            state: mu.clone(),
            mu,
            theta,
            sigma,
            rng,
        })
    }

    pub fn size(&self) -> usize {
        self.mu.len()
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Reset the internal state to the mean.
    pub fn reset(&mut self) {
        self.state.clone_from(&self.mu);
    }

    /// Advance the process one step and return the new state.
    pub fn sample(&mut self) -> Vec<f64> {
        for (x, mu) in self.state.iter_mut().zip(&self.mu) {
            let u: f64 = self.rng.gen();
            *x += self.theta * (mu - *x) + self.sigma * u;
        }
        self.state.clone()
    }
}


/// Gaussian noise whose scale decays linearly with the step counter.
///
/// The noise itself carries no state between calls: the decay depends only
/// on the `t` that the caller passes to [`GaussianNoise::sample`].
#[derive(Debug, Clone)]
pub struct GaussianNoise<R: Rng = StdRng> {
    action_low: f64,
    action_high: f64,
    min_sigma: f64,
    max_sigma: f64,
    decay_period: usize,
    rng: R,
}

impl GaussianNoise<StdRng> {
    pub fn seeded(
        action_low: f64,
        action_high: f64,
        min_sigma: f64,
        max_sigma: f64,
        decay_period: usize,
        seed: u64,
    ) -> Result<Self> {
        Self::new(
            action_low,
            action_high,
            min_sigma,
            max_sigma,
            decay_period,
            StdRng::seed_from_u64(seed),
        )
    }
}

impl<R: Rng> GaussianNoise<R> {
    pub fn new(
        action_low: f64,
        action_high: f64,
        min_sigma: f64,
        max_sigma: f64,
        decay_period: usize,
        rng: R,
    ) -> Result<Self> {
        ensure!(
            action_low <= action_high,
            "action_low ({action_low}) must not exceed action_high ({action_high})",
        );
        ensure!(
            min_sigma >= 0.0 && max_sigma >= 0.0,
            "Gaussian noise sigmas must be non-negative (min: {min_sigma}, max: {max_sigma})",
        );
        ensure!(
            min_sigma <= max_sigma,
            "min_sigma ({min_sigma}) must not exceed max_sigma ({max_sigma})",
        );
        ensure!(decay_period > 0, "decay_period must be positive");

        Ok(Self {
            action_low,
            action_high,
            min_sigma,
            max_sigma,
            decay_period,
            rng,
        })
    }

    pub fn action_low(&self) -> f64 {
        self.action_low
    }

    pub fn action_high(&self) -> f64 {
        self.action_high
    }

    /// The noise scale at step `t`.
    pub fn sigma(&self, t: usize) -> f64 {
        let progress = (t as f64 / self.decay_period as f64).min(1.0);
        self.max_sigma - (self.max_sigma - self.min_sigma) * progress
    }

    /// Draw `action_size` independent samples from N(0, sigma(t)^2).
    pub fn sample(
        &mut self,
        action_size: usize,
        t: usize,
    ) -> Vec<f64> {
        let sigma = self.sigma(t);
        (0..action_size)
            .map(|_| self.rng.sample::<f64, _>(StandardNormal) * sigma)
            .collect()
    }
}


/// One of the supported exploration noise processes.
#[derive(Debug, Clone)]
pub enum Noise<R: Rng = StdRng> {
    OrnsteinUhlenbeck(OuNoise<R>),
    DecayedGaussian(GaussianNoise<R>),
}

impl Noise<StdRng> {
    /// Build the process described by `config` for actions of dimension `size`.
    pub fn from_config(
        config: &NoiseConfig,
        size: usize,
        seed: u64,
    ) -> Result<Self> {
        Ok(match *config {
            NoiseConfig::OrnsteinUhlenbeck { mu, theta, sigma } => {
                Self::OrnsteinUhlenbeck(OuNoise::seeded(size, seed, mu, theta, sigma)?)
            }
            NoiseConfig::DecayedGaussian {
                action_low,
                action_high,
                min_sigma,
                max_sigma,
                decay_period,
            } => Self::DecayedGaussian(GaussianNoise::seeded(
                action_low,
                action_high,
                min_sigma,
                max_sigma,
                decay_period,
                seed,
            )?),
        })
    }
}

impl<R: Rng> Noise<R> {
    pub fn reset(&mut self) {
        if let Self::OrnsteinUhlenbeck(ou) = self {
            ou.reset()
        }
    }

    /// The range noisy actions are clipped to, if the process carries one.
    pub fn action_bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::OrnsteinUhlenbeck(_) => None,
            Self::DecayedGaussian(gaussian) => Some((gaussian.action_low(), gaussian.action_high())),
        }
    }

    /// Draw one noise vector for step `t`.
    ///
    /// The OU process ignores `t` and only accepts its own dimension.
    pub fn sample(
        &mut self,
        action_size: usize,
        t: usize,
    ) -> Result<Vec<f64>> {
        match self {
            Self::OrnsteinUhlenbeck(ou) => {
                ensure!(
                    action_size == ou.size(),
                    "OU noise has size {} but {action_size} values were requested",
                    ou.size(),
                );
                Ok(ou.sample())
            }
            Self::DecayedGaussian(gaussian) => Ok(gaussian.sample(action_size, t)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ou_reset_returns_to_mu() {
        let mut ou = OuNoise::seeded(3, 7, 0.5, 0.15, 0.2).unwrap();
        assert_eq!(ou.state(), &[0.5, 0.5, 0.5]);

        for _ in 0..10 {
            ou.sample();
        }
        assert_ne!(ou.state(), ou.mu());

        ou.reset();
        assert_eq!(ou.state(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn ou_same_seed_same_sequence() {
        let mut a = OuNoise::seeded(4, 42, 0.0, 0.15, 0.2).unwrap();
        let mut b = OuNoise::seeded(4, 42, 0.0, 0.15, 0.2).unwrap();
        for _ in 0..50 {
            assert_eq!(a.sample(), b.sample());
        }

        let mut c = OuNoise::seeded(4, 43, 0.0, 0.15, 0.2).unwrap();
        a.reset();
        c.reset();
        assert_ne!(a.sample(), c.sample());
    }

    #[test]
    fn ou_first_step_from_mean() {
        let mut ou = OuNoise::seeded(2, 1, 0.0, 0.15, 0.2).unwrap();
        ou.reset();
        assert_eq!(ou.state(), &[0.0, 0.0]);

        let x = ou.sample();
        assert_eq!(x.len(), 2);
        assert!(x.iter().all(|&v| (0.0..0.2).contains(&v)), "{x:?}");
        assert_eq!(ou.state(), x.as_slice());
    }

    #[test]
    fn ou_uses_injected_rng() {
        let mut ou = OuNoise::new(3, 0.0, 0.15, 0.2, StdRng::seed_from_u64(9)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let expected: Vec<f64> = (0..3).map(|_| 0.2 * rng.gen::<f64>()).collect();
        assert_eq!(ou.sample(), expected);
    }

    #[test]
    fn ou_rejects_zero_size() {
        assert!(OuNoise::seeded(0, 1, 0.0, 0.15, 0.2).is_err());
        assert!(OuNoise::seeded(2, 1, f64::NAN, 0.15, 0.2).is_err());
    }

    #[test]
    fn gaussian_sigma_schedule() {
        let noise = GaussianNoise::seeded(-1.0, 1.0, 0.1, 1.0, 100, 0).unwrap();
        assert_eq!(noise.sigma(0), 1.0);
        assert!((noise.sigma(100) - 0.1).abs() < 1e-12);
        assert!((noise.sigma(50) - 0.55).abs() < 1e-12);

        let mut previous = noise.sigma(0);
        for t in 1..=100 {
            let sigma = noise.sigma(t);
            assert!(sigma <= previous);
            previous = sigma;
        }
        for t in [101, 200, 10_000] {
            assert_eq!(noise.sigma(t), noise.sigma(100));
        }
    }

    #[test]
    fn gaussian_constant_sigma() {
        let noise = GaussianNoise::seeded(-1.0, 1.0, 0.3, 0.3, 10, 0).unwrap();
        for t in [0, 1, 5, 10, 11, 1_000] {
            assert_eq!(noise.sigma(t), 0.3);
        }
    }

    #[test]
    fn gaussian_samples_are_scaled() {
        let mut noise = GaussianNoise::seeded(-1.0, 1.0, 0.1, 1.0, 100, 3).unwrap();
        assert_eq!(noise.action_low(), -1.0);
        assert_eq!(noise.action_high(), 1.0);

        let early = noise.sample(4, 0);
        assert_eq!(early.len(), 4);

        // Same draws, scaled by 0.1 instead of 1.0
        let mut a = GaussianNoise::seeded(-1.0, 1.0, 0.1, 1.0, 100, 11).unwrap();
        let mut b = GaussianNoise::seeded(-1.0, 1.0, 0.1, 1.0, 100, 11).unwrap();
        let full = a.sample(4, 0);
        let floor = b.sample(4, 200);
        for (f, l) in full.iter().zip(&floor) {
            assert!((f * 0.1 - l).abs() < 1e-12);
        }

        // Sample standard deviation roughly matches the floor
        let many = noise.sample(20_000, 200);
        let var = many.iter().map(|x| x * x).sum::<f64>() / many.len() as f64;
        assert!((var.sqrt() - 0.1).abs() < 0.01, "std {}", var.sqrt());
    }

    #[test]
    fn gaussian_rejects_bad_config() {
        assert!(GaussianNoise::seeded(1.0, -1.0, 0.1, 1.0, 100, 0).is_err());
        assert!(GaussianNoise::seeded(-1.0, 1.0, 1.0, 0.1, 100, 0).is_err());
        assert!(GaussianNoise::seeded(-1.0, 1.0, 0.1, 1.0, 0, 0).is_err());
    }

    #[test]
    fn noise_enum_dispatch() {
        let mut ou = Noise::from_config(&NoiseConfig::ou(), 2, 5).unwrap();
        assert_eq!(ou.sample(2, 0).unwrap().len(), 2);
        assert!(ou.sample(3, 0).is_err());
        ou.reset();
        match &ou {
            Noise::OrnsteinUhlenbeck(inner) => assert_eq!(inner.state(), &[0.0, 0.0]),
            _ => panic!("expected OU noise"),
        }

        let mut gaussian = Noise::from_config(&NoiseConfig::gaussian(), 2, 5).unwrap();
        assert_eq!(gaussian.sample(5, 10).unwrap().len(), 5);
    }
}
