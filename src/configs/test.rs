use serde::{
    Deserialize,
    Serialize,
};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    // The total number of episodes.
    max_episodes: usize,
    // Episodes are cut off (truncated) after this many steps.
    max_episode_steps: usize,
    // Seed for the environment resets.
    seed: u64,
}
impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_episodes: 10,
            max_episode_steps: 1_000,
            seed: 0,
        }
    }
}
impl TestConfig {
    pub fn new(
        max_episodes: usize,
        max_episode_steps: usize,
        seed: u64,
    ) -> Self {
        Self {
            max_episodes,
            max_episode_steps,
            seed,
        }
    }
}

impl TestConfig {
    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }
    pub fn max_episode_steps(&self) -> usize {
        self.max_episode_steps
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
