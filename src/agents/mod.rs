pub mod networks;
mod td3fd;

pub use td3fd::{
    ModelBundle,
    TD3fD,
};


use {
    crate::components::{
        PrioritizedReplayBuffer,
        Transition,
    },
    anyhow::Result,
    candle_core::Device,
    std::{
        fmt::Display,
        path::Path,
    },
};


/// The execution mode of an agent is either training or testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "Train"),
            RunMode::Test => write!(f, "Test"),
        }
    }
}

pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
    ) -> Result<Box<Self>>;

    /// Select an action for the given state. Only `RunMode::Train` explores.
    fn actions(
        &mut self,
        state: &[f64],
        mode: RunMode,
    ) -> Result<Vec<f64>>;

    fn train(&mut self) -> Result<()>;
}

pub trait OffPolicyAlgorithm: Algorithm {
    /// Like [`Algorithm::from_config`], with a replay buffer that is seeded
    /// with demonstrations it keeps forever.
    fn from_demonstrations(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
        demos: Vec<Transition>,
    ) -> Result<Box<Self>>;

    fn remember(
        &mut self,
        transition: Transition,
    );

    /// Called at the start of every episode.
    fn reset(&mut self);

    /// Learn from the replay buffer alone, before interacting with the environment.
    fn pretrain(&mut self) -> Result<()>;

    fn replay_buffer(&self) -> &PrioritizedReplayBuffer;
}

pub trait SaveableAlgorithm {
    fn save<P: AsRef<Path> + ?Sized>(
        &self,
        path: &P,
        name: &str,
    ) -> Result<()>;

    fn load<P: AsRef<Path> + ?Sized>(
        &mut self,
        path: &P,
        name: &str,
    ) -> Result<()>;
}
