use serde::{
    Deserialize,
    Serialize,
};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    // The total number of episodes.
    max_episodes: usize,
    // Episodes are cut off (truncated) after this many steps.
    max_episode_steps: usize,
    // Number of random actions to take at very beginning of training.
    initial_random_actions: usize,
    // Seed for the environment resets and the random actions.
    seed: u64,
}
impl TrainConfig {
    pub fn new(
        max_episodes: usize,
        max_episode_steps: usize,
        initial_random_actions: usize,
        seed: u64,
    ) -> Self {
        Self {
            max_episodes,
            max_episode_steps,
            initial_random_actions,
            seed,
        }
    }

    pub fn pendulum() -> Self {
        Self {
            max_episodes: 100,
            max_episode_steps: 200,
            initial_random_actions: 1_000,
            seed: 42,
        }
    }

    pub fn lunarlander() -> Self {
        Self {
            max_episodes: 1_500,
            max_episode_steps: 300,
            initial_random_actions: 0,
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }
    pub fn max_episode_steps(&self) -> usize {
        self.max_episode_steps
    }
    pub fn initial_random_actions(&self) -> usize {
        self.initial_random_actions
    }
    pub fn seed(&self) -> u64 {
        self.seed
    }
    pub fn set_max_episodes(&mut self, max_episodes: usize) {
        self.max_episodes = max_episodes;
    }
    pub fn set_max_episode_steps(&mut self, max_episode_steps: usize) {
        self.max_episode_steps = max_episode_steps;
    }
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
}
