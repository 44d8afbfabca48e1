use {
    super::{
        Environment,
        Sampleable,
        Step,
        VectorConvertible,
    },
    anyhow::{
        ensure,
        Result,
    },
    rand::{
        rngs::StdRng,
        Rng,
        RngCore,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::{
        f64::consts::PI,
        ops::RangeInclusive,
    },
};

fn angle_normalize(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}


/// The configuration struct for the [`PendulumEnv`].
///
/// The defaults are the physical constants of Gymnasium's Pendulum-v1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendulumConfig {
    // Gravity, mass and length of the pendulum
    pub g: f64,
    pub m: f64,
    pub l: f64,
    // Integration timestep
    pub dt: f64,
    pub max_speed: f64,
    pub max_torque: f64,
    // Episodes are truncated after this many steps
    pub timelimit: usize,
}
impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            g: 10.0,
            m: 1.0,
            l: 1.0,
            dt: 0.05,
            max_speed: 8.0,
            max_torque: 2.0,
            timelimit: 200,
        }
    }
}


/// The action type for the Pendulum environment
///
/// The single value is the torque applied to the free end of the pendulum,
/// normalized to \[-1, 1\]. The environment scales it by `max_torque`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumAction {
    torque: f64,
}
impl PendulumAction {
    pub fn new(torque: f64) -> Self {
        Self { torque }
    }

    pub fn torque(&self) -> f64 {
        self.torque
    }
}
impl Sampleable for PendulumAction {
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        let torque = match domain.first() {
            Some(range) => rng.gen_range(range.clone()),
            None => 0.0,
        };
        Self { torque }
    }
}
impl VectorConvertible for PendulumAction {
    fn from_vec(value: Vec<f64>) -> Result<Self> {
        ensure!(value.len() == 1, "A pendulum action has 1 element, got {}", value.len());
        Ok(Self { torque: value[0] })
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.torque]
    }
}


/// The observation type for the Pendulum environment: \[cos(theta), sin(theta), theta_dot\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumObservation {
    cos: f64,
    sin: f64,
    theta_dot: f64,
}
impl PendulumObservation {
    fn from_state(theta: f64, theta_dot: f64) -> Self {
        Self {
            cos: theta.cos(),
            sin: theta.sin(),
            theta_dot,
        }
    }

    pub fn theta_dot(&self) -> f64 {
        self.theta_dot
    }
}
impl VectorConvertible for PendulumObservation {
    fn from_vec(value: Vec<f64>) -> Result<Self> {
        ensure!(value.len() == 3, "A pendulum observation has 3 elements, got {}", value.len());
        Ok(Self {
            cos: value[0],
            sin: value[1],
            theta_dot: value[2],
        })
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.cos, value.sin, value.theta_dot]
    }
}


/// A native version of the classic inverted pendulum swing-up problem.
///
/// The pendulum starts at a random angle with a random angular velocity and
/// has to be swung up and kept upright. It never terminates, only truncates.
pub struct PendulumEnv {
    config: PendulumConfig,
    theta: f64,
    theta_dot: f64,
    steps: usize,
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;
    type Action = PendulumAction;
    type Observation = PendulumObservation;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn new(config: Self::Config) -> Result<Box<Self>> {
        ensure!(config.dt > 0.0, "The timestep must be positive");
        ensure!(config.m > 0.0 && config.l > 0.0, "Mass and length must be positive");
        ensure!(config.timelimit > 0, "The timelimit must be positive");
        Ok(Box::new(Self {
            config,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
        }))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.theta = rng.gen_range(-PI..=PI);
        self.theta_dot = rng.gen_range(-1.0..=1.0);
        self.steps = 0;
        Ok(self.current_observation())
    }

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>> {
        let PendulumConfig { g, m, l, dt, max_speed, max_torque, timelimit } = self.config;

        let u = (action.torque * max_torque).clamp(-max_torque, max_torque);
        let cost = angle_normalize(self.theta).powi(2) + 0.1 * self.theta_dot.powi(2) + 0.001 * u.powi(2);

        let theta_dot = self.theta_dot + (3.0 * g / (2.0 * l) * self.theta.sin() + 3.0 / (m * l.powi(2)) * u) * dt;
        self.theta_dot = theta_dot.clamp(-max_speed, max_speed);
        self.theta += self.theta_dot * dt;
        self.steps += 1;

        Ok(Step {
            observation: self.current_observation(),
            action,
            reward: -cost,
            terminated: false,
            truncated: self.steps >= timelimit,
        })
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![-1.0..=1.0]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![3]
    }

    fn current_observation(&self) -> Self::Observation {
        PendulumObservation::from_state(self.theta, self.theta_dot)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_seeded() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        let a = env.reset(3).unwrap();
        let b = env.reset(3).unwrap();
        let c = env.reset(4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!((-1.0..=1.0).contains(&a.theta_dot()));
    }

    #[test]
    fn dynamics_stay_in_bounds() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        env.reset(0).unwrap();
        let max_cost = PI.powi(2) + 0.1 * 8.0f64.powi(2) + 0.001 * 2.0f64.powi(2);

        for i in 0..200 {
            let step = env.step(PendulumAction::new(if i % 20 < 10 { 5.0 } else { -5.0 })).unwrap();
            let obs = PendulumObservation::to_vec(step.observation);
            assert!((obs[0].powi(2) + obs[1].powi(2) - 1.0).abs() < 1e-9);
            assert!(obs[2].abs() <= 8.0);
            assert!(step.reward <= 0.0 && step.reward >= -max_cost - 1e-9);
            assert!(!step.terminated);
            assert_eq!(step.truncated, i == 199);
        }
    }

    #[test]
    fn upright_and_still_has_no_cost() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        env.theta = 0.0;
        env.theta_dot = 0.0;
        let step = env.step(PendulumAction::new(0.0)).unwrap();
        assert_eq!(step.reward, 0.0);
        assert_eq!(PendulumObservation::to_vec(step.observation), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn angles_are_normalized() {
        assert!((angle_normalize(PI + 0.5) - (0.5 - PI)).abs() < 1e-12);
        assert!((angle_normalize(0.5) - 0.5).abs() < 1e-12);
        assert!((angle_normalize(-0.5 - 2.0 * PI) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn vector_conversion_checks_length() {
        assert!(PendulumAction::from_vec(vec![0.1, 0.2]).is_err());
        assert_eq!(PendulumAction::from_vec(vec![0.1]).unwrap().torque(), 0.1);
        assert!(PendulumObservation::from_vec(vec![1.0]).is_err());
    }
}
