use {
    super::{
        networks::{
            hard_update,
            track,
            Mlp,
            MlpConfig,
            OutputActivation,
        },
        Algorithm,
        OffPolicyAlgorithm,
        RunMode,
        SaveableAlgorithm,
    },
    crate::{
        components::{
            n_step_demos,
            NStepTransitionBuffer,
            Noise,
            PrioritizedReplayBuffer,
            SampledBatch,
            Transition,
        },
        configs::{
            ActorCriticConfig,
            OffPolicyConfig,
            TD3fD_Config,
        },
    },
    anyhow::{
        ensure,
        Result,
    },
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    candle_nn::{
        AdamW,
        Optimizer,
        ParamsAdamW,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    rand_distr::StandardNormal,
    std::path::Path,
    tracing::{
        debug,
        info,
        warn,
    },
    unzip_n::unzip_n,
};

unzip_n!(5);


/// The six networks of a TD3fD agent.
///
/// The target networks are hard copies of their online networks at
/// construction and afterwards only ever move towards them through
/// [`track`]. They are never handed to an optimizer.
pub struct ModelBundle {
    pub actor: Mlp,
    pub actor_target: Mlp,
    pub critic_1: Mlp,
    pub critic_2: Mlp,
    pub critic_target_1: Mlp,
    pub critic_target_2: Mlp,
}

impl ModelBundle {
    pub fn new(
        device: &Device,
        config: &TD3fD_Config,
        size_state: usize,
        size_action: usize,
    ) -> candle_core::Result<Self> {
        let actor_config = MlpConfig::new(
            size_state,
            size_action,
            &config.hidden_sizes_actor,
            OutputActivation::Tanh,
        );
        let critic_config = MlpConfig::new(
            size_state + size_action,
            1,
            &config.hidden_sizes_critic,
            OutputActivation::Identity,
        );

        let actor = Mlp::new(device, DType::F64, &actor_config)?;
        let mut actor_target = Mlp::new(device, DType::F64, &actor_config)?;
        hard_update(&actor, &mut actor_target)?;

        let critic_1 = Mlp::new(device, DType::F64, &critic_config)?;
        let critic_2 = Mlp::new(device, DType::F64, &critic_config)?;
        let mut critic_target_1 = Mlp::new(device, DType::F64, &critic_config)?;
        let mut critic_target_2 = Mlp::new(device, DType::F64, &critic_config)?;
        hard_update(&critic_1, &mut critic_target_1)?;
        hard_update(&critic_2, &mut critic_target_2)?;

        Ok(Self {
            actor,
            actor_target,
            critic_1,
            critic_2,
            critic_target_1,
            critic_target_2,
        })
    }

    /// Move all target networks towards their online networks.
    pub fn track_targets(
        &mut self,
        tau: f64,
    ) -> candle_core::Result<()> {
        track(&self.actor, &mut self.actor_target, tau)?;
        track(&self.critic_1, &mut self.critic_target_1, tau)?;
        track(&self.critic_2, &mut self.critic_target_2, tau)
    }

    fn named(&self) -> [(&'static str, &Mlp); 6] {
        [
            ("actor", &self.actor),
            ("actor_target", &self.actor_target),
            ("critic_1", &self.critic_1),
            ("critic_2", &self.critic_2),
            ("critic_target_1", &self.critic_target_1),
            ("critic_target_2", &self.critic_target_2),
        ]
    }

    fn named_mut(&mut self) -> [(&'static str, &mut Mlp); 6] {
        [
            ("actor", &mut self.actor),
            ("actor_target", &mut self.actor_target),
            ("critic_1", &mut self.critic_1),
            ("critic_2", &mut self.critic_2),
            ("critic_target_1", &mut self.critic_target_1),
            ("critic_target_2", &mut self.critic_target_2),
        ]
    }
}

/// Next actions of the target policy, perturbed by the smoothing noise and
/// clamped to the normalized action range.
fn target_actions(
    actor_target: &Mlp,
    next_states: &Tensor,
    smoothing: &Tensor,
) -> candle_core::Result<Tensor> {
    (actor_target.forward(next_states)? + smoothing)?.clamp(-1.0, 1.0)
}

/// Clipped double-Q targets $r + \gamma \min(Q'_1, Q'_2) (1 - d)$.
fn bootstrap_targets(
    rewards: &Tensor,
    dones: &Tensor,
    q_next_1: &Tensor,
    q_next_2: &Tensor,
    gamma: f64,
) -> candle_core::Result<Tensor> {
    let masks = dones.affine(-1.0, 1.0)?;
    let q_next = (q_next_1.minimum(q_next_2)? * masks)?;
    rewards + (q_next * gamma)?
}

fn critic_forward(
    critic: &Mlp,
    states: &Tensor,
    actions: &Tensor,
) -> candle_core::Result<Tensor> {
    critic.forward(&Tensor::cat(&[states, actions], 1)?)
}


struct Batch {
    states: Tensor,
    actions: Tensor,
    rewards: Tensor,
    next_states: Tensor,
    dones: Tensor,
}

impl Batch {
    fn new<'a, I>(
        transitions: I,
        device: &Device,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Transition>,
    {
        let (states, actions, rewards, next_states, dones) = transitions
            .into_iter()
            .map(|t| {
                (
                    t.state.clone(),
                    t.action.clone(),
                    t.reward,
                    t.next_state.clone(),
                    t.done as u8 as f64,
                )
            })
            .unzip_n_vec();

        let batch_size = rewards.len();
        let stack = |rows: Vec<Vec<f64>>| -> Result<Tensor> {
            let width = rows.first().map_or(0, Vec::len);
            ensure!(
                rows.iter().all(|row| row.len() == width),
                "All transitions in a batch must have the same dimensions",
            );
            Ok(Tensor::from_vec(rows.concat(), (batch_size, width), device)?)
        };

        Ok(Self {
            states: stack(states)?,
            actions: stack(actions)?,
            rewards: Tensor::from_vec(rewards, (batch_size, 1), device)?,
            next_states: stack(next_states)?,
            dones: Tensor::from_vec(dones, (batch_size, 1), device)?,
        })
    }
}


/// TD3 from Demonstrations.
///
/// TD3 with two critics, target policy smoothing and delayed actor updates,
/// learning from a prioritized replay buffer that permanently holds a set
/// of demonstrations. Optionally, N-step returns on the same starting states
/// are added to the critic losses.
pub struct TD3fD {
    config: TD3fD_Config,
    models: ModelBundle,
    actor_optim: AdamW,
    critic_1_optim: AdamW,
    critic_2_optim: AdamW,
    noise: Noise,
    memory: PrioritizedReplayBuffer,
    memory_n: Option<NStepTransitionBuffer>,
    // Drives the target policy smoothing noise
    rng: StdRng,

    size_state: usize,
    size_action: usize,
    total_steps: usize,
    update_step: usize,
    device: Device,
}

impl TD3fD {
    pub fn new(
        device: &Device,
        config: &TD3fD_Config,
        size_state: usize,
        size_action: usize,
        demos: Vec<Transition>,
    ) -> Result<Self> {
        config.validate()?;
        ensure!(size_state > 0 && size_action > 0, "State and action sizes must be positive");
        for demo in &demos {
            ensure!(
                demo.state.len() == size_state
                    && demo.next_state.len() == size_state
                    && demo.action.len() == size_action,
                "Demonstration does not match state size {size_state} and action size {size_action}",
            );
        }

        let models = ModelBundle::new(device, config, size_state, size_action)?;

        let optimizer = |network: &Mlp, lr: f64| {
            AdamW::new(
                network.trainable_vars(),
                ParamsAdamW {
                    lr,
                    // lambda2 enters the losses as a coupled L2 penalty
                    weight_decay: 0.0,
                    ..Default::default()
                },
            )
        };
        let (lr_critic_1, lr_critic_2) = config.critic_lr();
        let actor_optim = optimizer(&models.actor, config.actor_lr())?;
        let critic_1_optim = optimizer(&models.critic_1, lr_critic_1)?;
        let critic_2_optim = optimizer(&models.critic_2, lr_critic_2)?;

        let n_demos = demos.len();
        let (memory, memory_n) = if config.n_step > 1 {
            let (demos, demos_n) = n_step_demos(&demos, config.n_step, config.gamma);
            (
                PrioritizedReplayBuffer::new(
                    config.replay_buffer_capacity(),
                    config.per_alpha,
                    config.per_eps_demo,
                    demos,
                    config.seed,
                )?,
                Some(NStepTransitionBuffer::new(
                    config.replay_buffer_capacity(),
                    config.n_step,
                    config.gamma,
                    demos_n,
                )?),
            )
        } else {
            (
                PrioritizedReplayBuffer::new(
                    config.replay_buffer_capacity(),
                    config.per_alpha,
                    config.per_eps_demo,
                    demos,
                    config.seed,
                )?,
                None,
            )
        };
        info!(
            "Created TD3fD agent with {} noise and {} of {n_demos} demonstrations in memory",
            config.noise,
            memory.demo_size(),
        );
        for (name, value) in config.hyper_params() {
            info!("{name}: {value}");
        }

        Ok(Self {
            config: config.clone(),
            models,
            actor_optim,
            critic_1_optim,
            critic_2_optim,
            noise: Noise::from_config(&config.noise, size_action, config.seed.wrapping_add(1))?,
            memory,
            memory_n,
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(2)),
            size_state,
            size_action,
            total_steps: 0,
            update_step: 0,
            device: device.clone(),
        })
    }

    pub fn models(&self) -> &ModelBundle {
        &self.models
    }

    /// Number of transitions remembered so far.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Number of learning steps taken so far.
    pub fn update_step(&self) -> usize {
        self.update_step
    }

    /// Target policy smoothing noise, one normal draw per action dimension
    /// clipped to the configured range.
    fn smoothing_noise(
        &mut self,
        batch_size: usize,
    ) -> Result<Tensor> {
        let std = self.config.target_smoothing_noise_std;
        let clip = self.config.target_smoothing_noise_clip;
        let smoothing: Vec<f64> = (0..batch_size * self.size_action)
            .map(|_| (self.rng.sample::<f64, _>(StandardNormal) * std).clamp(-clip, clip))
            .collect();
        Ok(Tensor::from_vec(smoothing, (batch_size, self.size_action), &self.device)?)
    }

    /// Element-wise squared TD errors of both critics against the bootstrap
    /// targets of `batch`, discounted with `gamma`.
    fn td_errors(
        &mut self,
        batch: &Batch,
        gamma: f64,
    ) -> Result<(Tensor, Tensor)> {
        let smoothing = self.smoothing_noise(batch.rewards.dims()[0])?;
        let next_actions = target_actions(&self.models.actor_target, &batch.next_states, &smoothing)?;
        let q_next_1 = critic_forward(&self.models.critic_target_1, &batch.next_states, &next_actions)?;
        let q_next_2 = critic_forward(&self.models.critic_target_2, &batch.next_states, &next_actions)?;
        let q_target = bootstrap_targets(&batch.rewards, &batch.dones, &q_next_1, &q_next_2, gamma)?;

        let q_1 = critic_forward(&self.models.critic_1, &batch.states, &batch.actions)?;
        let q_2 = critic_forward(&self.models.critic_2, &batch.states, &batch.actions)?;

        Ok((
            (q_1 - &q_target)?.sqr()?,
            (q_2 - &q_target)?.sqr()?,
        ))
    }

    /// Element-wise critic losses: the one-step TD errors plus, when an
    /// N-step batch with its window length is given, `lambda1` times the
    /// N-step TD errors discounted with `gamma^n`.
    fn critic_losses(
        &mut self,
        batch: &Batch,
        batch_n: Option<(&Batch, usize)>,
    ) -> Result<(Tensor, Tensor)> {
        let (loss_1, loss_2) = self.td_errors(batch, self.config.gamma())?;
        let Some((batch_n, n_step)) = batch_n else {
            return Ok((loss_1, loss_2));
        };

        let gamma_n = self.config.gamma.powi(n_step as i32);
        let (loss_n_1, loss_n_2) = self.td_errors(batch_n, gamma_n)?;
        Ok((
            (loss_1 + (loss_n_1 * self.config.lambda1)?)?,
            (loss_2 + (loss_n_2 * self.config.lambda1)?)?,
        ))
    }

    /// Take one learning step on a batch sampled from the replay buffer.
    fn learn(&mut self) -> Result<()> {
        let SampledBatch {
            transitions,
            indices,
            weights,
            eps_d,
        } = match self.memory.sample(self.config.batch_size, self.config.per_beta)? {
            Some(batch) => batch,
            None => return Ok(()),
        };
        let batch_size = transitions.len();
        let batch = Batch::new(&transitions, &self.device)?;
        let weights = Tensor::from_vec(weights, (batch_size, 1), &self.device)?;

        // Critics
        let batch_n = match &self.memory_n {
            Some(memory_n) => {
                let transitions_n: Vec<Transition> = memory_n.get(&indices)?.into_iter().cloned().collect();
                Some((Batch::new(&transitions_n, &self.device)?, memory_n.n_step()))
            },
            None => None,
        };
        let (loss_1, loss_2) = self.critic_losses(&batch, batch_n.as_ref().map(|(b, n)| (b, *n)))?;

        let penalty = (self.models.critic_1.l2_penalty(self.config.lambda2)?
            + self.models.critic_2.l2_penalty(self.config.lambda2)?)?;
        let critic_loss = (weights.broadcast_mul(&(&loss_1 + &loss_2)?)?.mean_all()? + penalty)?;
        let grads = critic_loss.backward()?;
        self.critic_1_optim.step(&grads)?;
        self.critic_2_optim.step(&grads)?;

        // Actor
        let actions = self.models.actor.forward(&batch.states)?;
        let actor_loss_element_wise = critic_forward(&self.models.critic_1, &batch.states, &actions)?.neg()?;

        self.update_step += 1;
        if self.update_step % self.config.delayed_update == 0 {
            let penalty = self.models.actor.l2_penalty(self.config.lambda2)?;
            let actor_loss = (weights.broadcast_mul(&actor_loss_element_wise)?.mean_all()? + penalty)?;
            let grads = actor_loss.backward()?;
            self.actor_optim.step(&grads)?;
            debug!("actor loss: {}", actor_loss.to_scalar::<f64>()?);
        }

        self.models.track_targets(self.config.tau())?;

        // Priorities
        let loss_1 = loss_1.flatten_all()?.to_vec1::<f64>()?;
        let actor_loss_element_wise = actor_loss_element_wise.flatten_all()?.to_vec1::<f64>()?;
        let priorities: Vec<f64> = loss_1
            .iter()
            .zip(&actor_loss_element_wise)
            .zip(&eps_d)
            .map(|((l, a), eps_d)| l + self.config.lambda3 * a.powi(2) + self.config.per_eps + eps_d)
            .collect();
        self.memory.update_priorities(&indices, &priorities)?;

        debug!(
            "learning step {} with critic loss {}",
            self.update_step,
            critic_loss.to_scalar::<f64>()?,
        );
        Ok(())
    }
}

impl Algorithm for TD3fD {
    type Config = TD3fD_Config;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
    ) -> Result<Box<Self>> {
        Ok(Box::new(Self::new(device, config, size_state, size_action, Vec::new())?))
    }

    fn actions(
        &mut self,
        state: &[f64],
        mode: RunMode,
    ) -> Result<Vec<f64>> {
        ensure!(
            state.len() == self.size_state,
            "Expected a state of size {}, got {}",
            self.size_state,
            state.len(),
        );
        // Candle assumes a batch dimension, so we add one and remove it again
        let state = Tensor::from_vec(state.to_vec(), (1, self.size_state), &self.device)?;
        let mut actions = self.models.actor.forward(&state)?.squeeze(0)?.to_vec1::<f64>()?;

        if let RunMode::Train = mode {
            let noise = self.noise.sample(self.size_action, self.total_steps)?;
            let (low, high) = self.noise.action_bounds().unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            for (action, noise) in actions.iter_mut().zip(noise) {
                *action = (*action + noise).clamp(low, high);
            }
        }
        Ok(actions)
    }

    fn train(&mut self) -> Result<()> {
        if self.memory.len() < self.config.training_batch_size() {
            return Ok(());
        }
        for _ in 0..self.config.multiple_learn {
            self.learn()?;
        }
        Ok(())
    }
}

impl OffPolicyAlgorithm for TD3fD {
    fn from_demonstrations(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
        demos: Vec<Transition>,
    ) -> Result<Box<Self>> {
        Ok(Box::new(Self::new(device, config, size_state, size_action, demos)?))
    }

    fn remember(
        &mut self,
        transition: Transition,
    ) {
        self.total_steps += 1;
        let transition = match self.memory_n.as_mut() {
            Some(memory_n) => match memory_n.push(transition) {
                Some(transition) => transition,
                None => return,
            },
            None => transition,
        };
        self.memory.push(transition);
    }

    fn reset(&mut self) {
        self.noise.reset();
    }

    fn pretrain(&mut self) -> Result<()> {
        if self.config.pretrain_step == 0 {
            return Ok(());
        }
        if self.memory.len() < self.config.training_batch_size() {
            warn!(
                "Skipping pretraining, only {} transitions in memory for a batch size of {}",
                self.memory.len(),
                self.config.training_batch_size(),
            );
            return Ok(());
        }

        warn!("Pretraining for {} steps", self.config.pretrain_step);
        for step in 0..self.config.pretrain_step {
            self.learn()?;
            if (step + 1) % 100 == 0 {
                info!("pretraining step {}/{}", step + 1, self.config.pretrain_step);
            }
        }
        warn!("Pretraining done");
        Ok(())
    }

    fn replay_buffer(&self) -> &PrioritizedReplayBuffer {
        &self.memory
    }
}

impl SaveableAlgorithm for TD3fD {
    fn save<P: AsRef<Path> + ?Sized>(
        &self,
        path: &P,
        name: &str,
    ) -> Result<()> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        for (network, model) in self.models.named() {
            model.save(&path.join(format!("{name}_{network}.safetensors")))?;
        }
        Ok(())
    }

    fn load<P: AsRef<Path> + ?Sized>(
        &mut self,
        path: &P,
        name: &str,
    ) -> Result<()> {
        let path = path.as_ref();
        for (network, model) in self.models.named_mut() {
            model.load(&path.join(format!("{name}_{network}.safetensors")))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::components::NoiseConfig,
    };

    fn flat(model: &Mlp) -> Vec<f64> {
        model
            .parameters()
            .unwrap()
            .iter()
            .flat_map(|p| p.flatten_all().unwrap().to_vec1::<f64>().unwrap())
            .collect()
    }

    fn small_config() -> TD3fD_Config {
        TD3fD_Config {
            batch_size: 4,
            buffer_size: 32,
            n_step: 1,
            hidden_sizes_actor: vec![8, 8],
            hidden_sizes_critic: vec![8, 8],
            ..TD3fD_Config::pendulum()
        }
    }

    fn transition(i: usize) -> Transition {
        let x = i as f64 / 10.0;
        Transition::new(vec![x, -x, 0.5], vec![0.1 * x], -x, vec![x + 0.1, -x, 0.5], i % 7 == 6)
    }

    fn agent(config: &TD3fD_Config, demos: Vec<Transition>) -> TD3fD {
        TD3fD::new(&Device::Cpu, config, 3, 1, demos).unwrap()
    }

    fn column(tensor: &Tensor) -> Vec<f64> {
        tensor.flatten_all().unwrap().to_vec1::<f64>().unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    /// Zero all weights so the network outputs its last bias everywhere.
    fn constant(model: &mut Mlp, value: f64) {
        let mut params: Vec<Tensor> = model
            .parameters()
            .unwrap()
            .iter()
            .map(|p| p.zeros_like().unwrap())
            .collect();
        let last = params.len() - 1;
        params[last] = params[last].affine(1.0, value).unwrap();
        model.set_parameters(&params).unwrap();
    }

    #[test]
    fn bootstrap_targets_take_the_minimum_and_mask_done() {
        let device = Device::Cpu;
        let rewards = Tensor::new(&[[1.0f64], [-1.0], [0.5]], &device).unwrap();
        let dones = Tensor::new(&[[0.0f64], [1.0], [0.0]], &device).unwrap();
        let q_next_1 = Tensor::new(&[[3.0f64], [10.0], [-2.0]], &device).unwrap();
        let q_next_2 = Tensor::new(&[[5.0f64], [4.0], [-1.0]], &device).unwrap();

        let targets = bootstrap_targets(&rewards, &dones, &q_next_1, &q_next_2, 0.9).unwrap();
        assert_close(&column(&targets), &[1.0 + 0.9 * 3.0, -1.0, 0.5 - 0.9 * 2.0]);
    }

    #[test]
    fn target_actions_are_clamped() {
        let agent = agent(&small_config(), Vec::new());
        let actor_target = &agent.models().actor_target;
        let next_states = Tensor::new(&[[0.1f64, -0.4, 0.9], [1.0, 0.0, -2.0]], &Device::Cpu).unwrap();
        let zeros = Tensor::zeros((2, 1), DType::F64, &Device::Cpu).unwrap();

        let plain = target_actions(actor_target, &next_states, &zeros).unwrap();
        let expected = actor_target.forward(&next_states).unwrap().clamp(-1.0, 1.0).unwrap();
        assert_eq!(column(&plain), column(&expected));

        let high = target_actions(actor_target, &next_states, &zeros.affine(1.0, 5.0).unwrap()).unwrap();
        assert_eq!(column(&high), vec![1.0, 1.0]);
        let low = target_actions(actor_target, &next_states, &zeros.affine(1.0, -5.0).unwrap()).unwrap();
        assert_eq!(column(&low), vec![-1.0, -1.0]);
    }

    #[test]
    fn smoothing_noise_is_clipped() {
        let config = TD3fD_Config {
            target_smoothing_noise_std: 0.0,
            ..small_config()
        };
        let mut agent = agent(&config, Vec::new());
        assert!(column(&agent.smoothing_noise(16).unwrap()).iter().all(|x| *x == 0.0));

        let config = TD3fD_Config {
            target_smoothing_noise_std: 10.0,
            target_smoothing_noise_clip: 0.5,
            ..small_config()
        };
        let mut clipped = TD3fD::new(&Device::Cpu, &config, 3, 1, Vec::new()).unwrap();
        let noise = column(&clipped.smoothing_noise(100).unwrap());
        assert!(noise.iter().all(|x| x.abs() <= 0.5));
        assert!(noise.iter().any(|x| x.abs() == 0.5));
    }

    #[test]
    fn critic_losses_follow_clipped_double_q() {
        let config = TD3fD_Config {
            gamma: 0.9,
            lambda1: 0.5,
            target_smoothing_noise_std: 0.0,
            ..small_config()
        };
        let mut agent = agent(&config, Vec::new());
        constant(&mut agent.models.critic_1, 1.0);
        constant(&mut agent.models.critic_2, 2.0);
        constant(&mut agent.models.critic_target_1, 3.0);
        constant(&mut agent.models.critic_target_2, 5.0);

        let step = |reward: f64, done: bool| {
            Transition::new(vec![0.1, 0.2, 0.3], vec![0.5], reward, vec![0.2, 0.3, 0.4], done)
        };
        let batch = Batch::new(&vec![step(1.0, false), step(-1.0, true)], &Device::Cpu).unwrap();

        // The smaller target critic bootstraps, a done transition only keeps its reward
        let targets: [f64; 2] = [1.0 + 0.9 * 3.0, -1.0];
        let (loss_1, loss_2) = agent.critic_losses(&batch, None).unwrap();
        let one_step_1: Vec<f64> = targets.iter().map(|y| (1.0 - y).powi(2)).collect();
        let one_step_2: Vec<f64> = targets.iter().map(|y| (2.0 - y).powi(2)).collect();
        assert_close(&column(&loss_1), &one_step_1);
        assert_close(&column(&loss_2), &one_step_2);

        let batch_n = Batch::new(&vec![step(2.0, false), step(0.5, false)], &Device::Cpu).unwrap();
        let targets_n = [2.0 + 0.9f64.powi(3) * 3.0, 0.5 + 0.9f64.powi(3) * 3.0];
        let (loss_1, loss_2) = agent.critic_losses(&batch, Some((&batch_n, 3))).unwrap();
        let combined_1: Vec<f64> = one_step_1
            .iter()
            .zip(&targets_n)
            .map(|(l, y)| l + 0.5 * (1.0 - y).powi(2))
            .collect();
        let combined_2: Vec<f64> = one_step_2
            .iter()
            .zip(&targets_n)
            .map(|(l, y)| l + 0.5 * (2.0 - y).powi(2))
            .collect();
        assert_close(&column(&loss_1), &combined_1);
        assert_close(&column(&loss_2), &combined_2);
    }

    #[test]
    fn targets_start_as_copies() {
        let agent = agent(&TD3fD_Config::lunarlander(), Vec::new());
        let models = agent.models();
        assert_eq!(flat(&models.actor), flat(&models.actor_target));
        assert_eq!(flat(&models.critic_1), flat(&models.critic_target_1));
        assert_eq!(flat(&models.critic_2), flat(&models.critic_target_2));
        assert_ne!(flat(&models.critic_1), flat(&models.critic_2));
    }

    #[test]
    fn rejects_invalid_config_and_demos() {
        let config = TD3fD_Config { gamma: -0.1, ..small_config() };
        assert!(TD3fD::new(&Device::Cpu, &config, 3, 1, Vec::new()).is_err());

        let demo = Transition::new(vec![0.0; 2], vec![0.0], 0.0, vec![0.0; 2], false);
        assert!(TD3fD::new(&Device::Cpu, &small_config(), 3, 1, vec![demo]).is_err());
    }

    #[test]
    fn test_mode_is_deterministic() {
        let mut agent = agent(&small_config(), Vec::new());
        let state = [0.3, -0.2, 1.0];

        let a = agent.actions(&state, RunMode::Test).unwrap();
        let b = agent.actions(&state, RunMode::Test).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert!((-1.0..=1.0).contains(&a[0]));

        let noisy = agent.actions(&state, RunMode::Train).unwrap();
        assert_ne!(noisy, a);
        assert!(agent.actions(&[0.0; 2], RunMode::Test).is_err());
    }

    #[test]
    fn gaussian_train_actions_stay_within_noise_bounds() {
        let config = TD3fD_Config {
            noise: NoiseConfig::DecayedGaussian {
                action_low: -0.25,
                action_high: 0.25,
                min_sigma: 5.0,
                max_sigma: 5.0,
                decay_period: 1,
            },
            ..small_config()
        };
        let mut agent = agent(&config, Vec::new());
        let actions: Vec<f64> = (0..50)
            .flat_map(|_| agent.actions(&[0.3, -0.2, 1.0], RunMode::Train).unwrap())
            .collect();
        assert!(actions.iter().all(|a| (-0.25..=0.25).contains(a)));
        assert!(actions.iter().any(|a| a.abs() == 0.25));
    }

    #[test]
    fn train_waits_for_a_full_batch() {
        let mut agent = agent(&small_config(), Vec::new());
        for i in 0..3 {
            agent.remember(transition(i));
        }
        agent.train().unwrap();
        assert_eq!(agent.update_step(), 0);

        agent.remember(transition(3));
        agent.train().unwrap();
        assert_eq!(agent.update_step(), 1);
        assert_eq!(agent.total_steps(), 4);
    }

    #[test]
    fn soft_update_moves_targets_by_at_most_tau() {
        let config = TD3fD_Config { tau: 1e-3, ..small_config() };
        let mut agent = agent(&config, Vec::new());
        for i in 0..16 {
            agent.remember(transition(i));
        }
        let before = flat(&agent.models().critic_target_1);
        agent.train().unwrap();

        let online = flat(&agent.models().critic_1);
        let after = flat(&agent.models().critic_target_1);
        assert_ne!(before, after);
        for ((o, t0), t1) in online.iter().zip(&before).zip(&after) {
            assert!((t1 - t0).abs() <= 1e-3 * (o - t0).abs() + 1e-12);
        }
    }

    #[test]
    fn actor_updates_are_delayed() {
        let config = TD3fD_Config { delayed_update: 2, ..small_config() };
        let mut agent = agent(&config, Vec::new());
        for i in 0..16 {
            agent.remember(transition(i));
        }
        let actor_0 = flat(&agent.models().actor);
        agent.train().unwrap();
        assert_eq!(flat(&agent.models().actor), actor_0);
        agent.train().unwrap();
        assert_ne!(flat(&agent.models().actor), actor_0);
    }

    #[test]
    fn learning_updates_priorities() {
        let mut agent = agent(&small_config(), Vec::new());
        for i in 0..8 {
            agent.remember(transition(i));
        }
        let before: Vec<f64> = (0..8).map(|i| agent.replay_buffer().priority(i)).collect();
        agent.train().unwrap();
        let after: Vec<f64> = (0..8).map(|i| agent.replay_buffer().priority(i)).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn n_step_transitions_are_delayed() {
        let config = TD3fD_Config { n_step: 3, ..small_config() };
        let mut agent = agent(&config, Vec::new());
        agent.remember(transition(0));
        agent.remember(transition(1));
        assert_eq!(agent.replay_buffer().len(), 0);
        agent.remember(transition(2));
        assert_eq!(agent.replay_buffer().len(), 1);

        for i in 3..10 {
            agent.remember(transition(i));
        }
        agent.train().unwrap();
        assert_eq!(agent.update_step(), 1);
    }

    #[test]
    fn pretrain_on_demonstrations() {
        let demos: Vec<Transition> = (0..10).map(transition).collect();
        let config = TD3fD_Config { pretrain_step: 5, n_step: 3, ..small_config() };
        let mut agent = agent(&config, demos);
        assert_eq!(agent.replay_buffer().demo_size(), 8);

        agent.pretrain().unwrap();
        assert_eq!(agent.update_step(), 5);
        assert_eq!(agent.total_steps(), 0);
    }

    #[test]
    fn pretrain_skips_small_memory() {
        let config = TD3fD_Config { pretrain_step: 5, ..small_config() };
        let mut agent = agent(&config, vec![transition(0)]);
        agent.pretrain().unwrap();
        assert_eq!(agent.update_step(), 0);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("td3fd_checkpoint_{}", std::process::id()));
        let source = agent(&small_config(), Vec::new());
        source.save(&dir, "test").unwrap();

        let mut target = agent(&small_config(), Vec::new());
        assert_ne!(flat(&source.models().actor), flat(&target.models().actor));
        target.load(&dir, "test").unwrap();
        assert_eq!(flat(&source.models().actor), flat(&target.models().actor));
        assert_eq!(flat(&source.models().critic_target_2), flat(&target.models().critic_target_2));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
