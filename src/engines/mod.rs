mod experiment;
mod run;

pub use experiment::{
    evaluate_off_policy,
    run_experiment_off_policy,
};
pub use run::loop_off_policy;

use {
    crate::{
        agents::RunMode,
        configs::{
            TestConfig,
            TrainConfig,
        },
    },
    std::fmt::Display,
};


/// A [`RunMode`] together with the config for that mode.
#[derive(Debug, Clone)]
pub enum ParamRunMode {
    Train(TrainConfig),
    Test(TestConfig),
}

impl ParamRunMode {
    pub fn run_mode(&self) -> RunMode {
        match self {
            ParamRunMode::Train(_) => RunMode::Train,
            ParamRunMode::Test(_) => RunMode::Test,
        }
    }

    pub fn max_episodes(&self) -> usize {
        match self {
            ParamRunMode::Train(config) => config.max_episodes(),
            ParamRunMode::Test(config) => config.max_episodes(),
        }
    }

    pub fn max_episode_steps(&self) -> usize {
        match self {
            ParamRunMode::Train(config) => config.max_episode_steps(),
            ParamRunMode::Test(config) => config.max_episode_steps(),
        }
    }

    pub fn initial_random_actions(&self) -> usize {
        match self {
            ParamRunMode::Train(config) => config.initial_random_actions(),
            ParamRunMode::Test(_) => 0,
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            ParamRunMode::Train(config) => config.seed(),
            ParamRunMode::Test(config) => config.seed(),
        }
    }
}

impl Display for ParamRunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.run_mode())
    }
}
