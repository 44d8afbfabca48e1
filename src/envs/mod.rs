mod pendulum;
#[cfg(feature = "gym")]
mod gym_wrappers;
#[cfg(feature = "gym")]
mod gym_lunarlander;

use {
    anyhow::Result,
    rand::RngCore,
    std::ops::RangeInclusive,
};

pub use crate::envs::pendulum::{
    PendulumAction,
    PendulumConfig,
    PendulumEnv,
    PendulumObservation,
};
#[cfg(feature = "gym")]
pub use crate::envs::gym_lunarlander::{
    LunarLanderAction,
    LunarLanderConfig,
    LunarLanderEnv,
    LunarLanderObservation,
};

pub trait VectorConvertible: Sized {
    fn from_vec(value: Vec<f64>) -> Result<Self>;
    fn to_vec(value: Self) -> Vec<f64>;
}

pub trait Sampleable {
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self;
}

/// Clip every dimension of `value` into the matching range of `domain`.
pub fn clip_to_domain(
    value: &mut [f64],
    domain: &[RangeInclusive<f64>],
) {
    for (v, range) in value.iter_mut().zip(domain) {
        *v = v.clamp(*range.start(), *range.end());
    }
}

#[derive(Debug)]
pub struct Step<O, A> {
    pub observation: O,
    pub action: A,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}
pub trait Environment {
    type Config;
    type Action;
    type Observation;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;
    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation>;
    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>>;
    fn timelimit(&self) -> usize;
    fn action_space(&self) -> Vec<usize>;
    fn action_domain(&self) -> Vec<RangeInclusive<f64>>;
    fn observation_space(&self) -> Vec<usize>;
    fn current_observation(&self) -> Self::Observation;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_to_domain_per_dimension() {
        let mut value = vec![-3.0, 0.5, 7.0];
        clip_to_domain(&mut value, &[-1.0..=1.0, -1.0..=1.0, 0.0..=2.0]);
        assert_eq!(value, vec![-1.0, 0.5, 2.0]);
    }
}
