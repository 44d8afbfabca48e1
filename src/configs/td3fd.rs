use {
    crate::components::NoiseConfig,
    anyhow::{
        ensure,
        Result,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};


#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TD3fD_Config {
    // The discount factor.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // Noise added to the target actions when computing the bootstrap target.
    pub target_smoothing_noise_std: f64,
    pub target_smoothing_noise_clip: f64,
    // The actor (and its target) is updated once every this many critic updates.
    pub delayed_update: usize,
    // The capacity of the replay buffer, not counting demonstrations.
    pub buffer_size: usize,
    // The training batch size for each learning step.
    pub batch_size: usize,
    // The learning rates for the Actor and the two Critic networks.
    pub lr_actor: f64,
    pub lr_critic_1: f64,
    pub lr_critic_2: f64,
    // Number of learning steps on the demonstrations before interacting.
    pub pretrain_step: usize,
    // Number of learning steps per environment step.
    pub multiple_learn: usize,
    // N-step return weight.
    pub lambda1: f64,
    // L2 regularization weight (weight decay).
    pub lambda2: f64,
    // Contribution of the actor loss to the new priorities.
    pub lambda3: f64,
    // Prioritized experience replay parameters.
    pub per_alpha: f64,
    pub per_beta: f64,
    pub per_eps: f64,
    pub per_eps_demo: f64,
    // Length of the N-step returns, 1 disables them.
    pub n_step: usize,
    // The number of neurons in the hidden layers of the Actor and Critic networks.
    pub hidden_sizes_actor: Vec<usize>,
    pub hidden_sizes_critic: Vec<usize>,
    // Exploration noise added to the actions during training.
    pub noise: NoiseConfig,
    // Seed for the noise, the replay buffer and the target smoothing noise.
    pub seed: u64,
}
impl Default for TD3fD_Config {
    fn default() -> Self {
        Self::lunarlander()
    }
}
impl TD3fD_Config {
    pub fn lunarlander() -> Self {
        Self {
            gamma: 0.99,
            tau: 1e-3,
            target_smoothing_noise_std: 0.2,
            target_smoothing_noise_clip: 0.5,
            delayed_update: 2,
            buffer_size: 100_000,
            batch_size: 128,
            lr_actor: 1e-4,
            lr_critic_1: 1e-3,
            lr_critic_2: 1e-3,
            pretrain_step: 0,
            multiple_learn: 1,
            lambda1: 1.0,
            lambda2: 1e-5,
            lambda3: 1.0,
            per_alpha: 0.3,
            per_beta: 1.0,
            per_eps: 1e-6,
            per_eps_demo: 1.0,
            n_step: 3,
            hidden_sizes_actor: vec![256, 256],
            hidden_sizes_critic: vec![256, 256],
            noise: NoiseConfig::gaussian(),
            seed: 42,
        }
    }

    pub fn pendulum() -> Self {
        Self {
            tau: 5e-3,
            buffer_size: 50_000,
            batch_size: 64,
            n_step: 1,
            hidden_sizes_actor: vec![64, 64],
            hidden_sizes_critic: vec![64, 64],
            // The actor acts in the normalized [-1, 1] range of the pendulum
            noise: NoiseConfig::DecayedGaussian {
                action_low: -1.0,
                action_high: 1.0,
                min_sigma: 0.1,
                max_sigma: 0.3,
                decay_period: 20_000,
            },
            ..Self::lunarlander()
        }
    }

    /// Check that the parameters make sense together.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.gamma),
            "gamma must lie in [0, 1], got {}",
            self.gamma,
        );
        ensure!(
            self.tau > 0.0 && self.tau <= 1.0,
            "tau must lie in (0, 1], got {}",
            self.tau,
        );
        ensure!(
            self.target_smoothing_noise_std >= 0.0 && self.target_smoothing_noise_clip >= 0.0,
            "Target smoothing noise std and clip must be non-negative",
        );
        ensure!(self.delayed_update > 0, "delayed_update must be positive");
        ensure!(self.buffer_size > 0, "buffer_size must be positive");
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(
            self.lr_actor > 0.0 && self.lr_critic_1 > 0.0 && self.lr_critic_2 > 0.0,
            "Learning rates must be positive",
        );
        ensure!(self.multiple_learn > 0, "multiple_learn must be positive");
        ensure!(self.n_step > 0, "n_step must be positive");
        ensure!(
            self.lambda1 >= 0.0 && self.lambda2 >= 0.0 && self.lambda3 >= 0.0,
            "The lambda weights must be non-negative",
        );
        ensure!(
            self.per_alpha >= 0.0 && self.per_beta >= 0.0,
            "PER alpha and beta must be non-negative",
        );
        ensure!(
            self.per_eps > 0.0 && self.per_eps_demo >= 0.0,
            "PER eps must be positive and the demo eps non-negative",
        );
        ensure!(
            !self.hidden_sizes_actor.contains(&0) && !self.hidden_sizes_critic.contains(&0),
            "Hidden layer sizes must be positive",
        );
        Ok(())
    }

    /// The numeric hyperparameters as a flat list of named values.
    pub fn hyper_params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("GAMMA", self.gamma),
            ("TAU", self.tau),
            ("TARGET_SMOOTHING_NOISE_STD", self.target_smoothing_noise_std),
            ("TARGET_SMOOTHING_NOISE_CLIP", self.target_smoothing_noise_clip),
            ("DELAYED_UPDATE", self.delayed_update as f64),
            ("BUFFER_SIZE", self.buffer_size as f64),
            ("BATCH_SIZE", self.batch_size as f64),
            ("LR_ACTOR", self.lr_actor),
            ("LR_CRITIC_1", self.lr_critic_1),
            ("LR_CRITIC_2", self.lr_critic_2),
            ("PRETRAIN_STEP", self.pretrain_step as f64),
            ("MULTIPLE_LEARN", self.multiple_learn as f64),
            ("LAMBDA1", self.lambda1),
            ("LAMBDA2", self.lambda2),
            ("LAMBDA3", self.lambda3),
            ("PER_ALPHA", self.per_alpha),
            ("PER_BETA", self.per_beta),
            ("PER_EPS", self.per_eps),
            ("PER_EPS_DEMO", self.per_eps_demo),
            ("N_STEP", self.n_step as f64),
        ]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        TD3fD_Config::lunarlander().validate().unwrap();
        TD3fD_Config::pendulum().validate().unwrap();
        assert_eq!(TD3fD_Config::default(), TD3fD_Config::lunarlander());
    }

    #[test]
    fn rejects_malformed_values() {
        let broken = [
            TD3fD_Config { gamma: 1.5, ..Default::default() },
            TD3fD_Config { tau: 0.0, ..Default::default() },
            TD3fD_Config { delayed_update: 0, ..Default::default() },
            TD3fD_Config { batch_size: 0, ..Default::default() },
            TD3fD_Config { lr_actor: -1e-4, ..Default::default() },
            TD3fD_Config { n_step: 0, ..Default::default() },
            TD3fD_Config { per_eps: 0.0, ..Default::default() },
            TD3fD_Config { hidden_sizes_critic: vec![256, 0], ..Default::default() },
        ];
        for config in broken {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn ron_round_trip_keeps_noise() {
        let config = TD3fD_Config::pendulum();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let back: TD3fD_Config = ron::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn flat_view_names_every_setting() {
        let params = TD3fD_Config::lunarlander().hyper_params();
        assert_eq!(params.len(), 20);
        assert!(params.contains(&("TAU", 1e-3)));
        assert!(params.contains(&("BATCH_SIZE", 128.0)));
    }
}
