use {
    super::{
        gym_wrappers::{
            gym_create_env,
            gym_reset_env,
            gym_step_env,
        },
        Environment,
        Sampleable,
        Step,
        VectorConvertible,
    },
    anyhow::{
        ensure,
        Result,
    },
    pyo3::PyObject,
    rand::{
        Rng,
        RngCore,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::ops::RangeInclusive,
};


/// The configuration struct for the LunarLander environment
///
/// Only the name of the Gymnasium environment and the timelimit, which
/// Gymnasium enforces itself, can be configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LunarLanderConfig {
    pub name: String,
    pub timelimit: usize,
}
impl Default for LunarLanderConfig {
    fn default() -> Self {
        Self {
            name: "LunarLanderContinuous-v2".to_owned(),
            timelimit: 1_000,
        }
    }
}


/// The action type for the LunarLander environment: \[main engine, lateral engines\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LunarLanderAction {
    main: f64,
    lateral: f64,
}
impl Sampleable for LunarLanderAction {
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        let mut values = domain.iter().map(|range| rng.gen_range(range.clone()));
        Self {
            main: values.next().unwrap_or_default(),
            lateral: values.next().unwrap_or_default(),
        }
    }
}
impl VectorConvertible for LunarLanderAction {
    fn from_vec(value: Vec<f64>) -> Result<Self> {
        ensure!(value.len() == 2, "A lunar lander action has 2 elements, got {}", value.len());
        Ok(Self {
            main: value[0],
            lateral: value[1],
        })
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.main, value.lateral]
    }
}


/// The observation type for the LunarLander environment
///
/// Position, velocity, angle, angular velocity and the two leg contacts.
#[derive(Debug, Clone, PartialEq)]
pub struct LunarLanderObservation {
    values: [f64; 8],
}
impl VectorConvertible for LunarLanderObservation {
    fn from_vec(value: Vec<f64>) -> Result<Self> {
        let values = <[f64; 8]>::try_from(value)
            .map_err(|v| anyhow::anyhow!("A lunar lander observation has 8 elements, got {}", v.len()))?;
        Ok(Self { values })
    }

    fn to_vec(value: Self) -> Vec<f64> {
        value.values.to_vec()
    }
}


/// A wrapper around the Gymnasium LunarLanderContinuous environment
///
/// For more details, see the Gymnasium Lunar Lander
/// [documentation](https://gymnasium.farama.org/environments/box2d/lunar_lander/).
pub struct LunarLanderEnv {
    config: LunarLanderConfig,
    env: PyObject,
    current_observation: LunarLanderObservation,
    action_space: Vec<usize>,
    observation_space: Vec<usize>,
}

impl Environment for LunarLanderEnv {
    type Config = LunarLanderConfig;
    type Action = LunarLanderAction;
    type Observation = LunarLanderObservation;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn new(config: Self::Config) -> Result<Box<Self>> {
        let (env, action_space, observation_space) = gym_create_env(&config.name)?;
        let current_observation = gym_reset_env(&env, 0)?;
        Ok(Box::new(Self {
            config,
            env,
            current_observation,
            action_space,
            observation_space,
        }))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation> {
        self.current_observation = gym_reset_env(&self.env, seed)?;
        Ok(self.current_observation.clone())
    }

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>> {
        let step: Step<LunarLanderObservation, LunarLanderAction> = gym_step_env(&self.env, action)?;
        self.current_observation = step.observation.clone();
        Ok(step)
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> Vec<usize> {
        self.action_space.clone()
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![-1.0..=1.0; 2]
    }

    fn observation_space(&self) -> Vec<usize> {
        self.observation_space.clone()
    }

    fn current_observation(&self) -> Self::Observation {
        self.current_observation.clone()
    }
}
