mod train;
mod test;
mod td3fd;

pub use train::TrainConfig;
pub use test::TestConfig;
pub use td3fd::TD3fD_Config;


pub trait ActorCriticConfig {
    fn actor_lr(&self) -> f64;
    fn critic_lr(&self) -> (f64, f64);
    fn gamma(&self) -> f64;
    fn tau(&self) -> f64;
}

pub trait OffPolicyConfig {
    fn replay_buffer_capacity(&self) -> usize;
    fn training_batch_size(&self) -> usize;
}

pub trait SeedableConfig {
    fn seed(&self) -> u64;
    fn set_seed(&mut self, seed: u64);
}

impl ActorCriticConfig for TD3fD_Config {
    fn actor_lr(&self) -> f64 {
        self.lr_actor
    }
    fn critic_lr(&self) -> (f64, f64) {
        (self.lr_critic_1, self.lr_critic_2)
    }
    fn gamma(&self) -> f64 {
        self.gamma
    }
    fn tau(&self) -> f64 {
        self.tau
    }
}

impl OffPolicyConfig for TD3fD_Config {
    fn replay_buffer_capacity(&self) -> usize {
        self.buffer_size
    }
    fn training_batch_size(&self) -> usize {
        self.batch_size
    }
}

impl SeedableConfig for TD3fD_Config {
    fn seed(&self) -> u64 {
        self.seed
    }
    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
}
