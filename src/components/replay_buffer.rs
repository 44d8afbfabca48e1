use {
    super::SumTree,
    anyhow::{
        ensure,
        Result,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};


/// A transition in the replay buffer.
///
/// # Fields
///
/// * `state` - The state the action was taken in.
/// * `action` - The action that was taken.
/// * `reward` - The reward that was received.
/// * `next_state` - The state the environment transitioned to.
/// * `done` - Whether the episode terminated (not truncated) after this step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Vec<f64>,
    pub action: Vec<f64>,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}
impl Transition {
    pub fn new(
        state: Vec<f64>,
        action: Vec<f64>,
        reward: f64,
        next_state: Vec<f64>,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}


/// A batch sampled from the [`PrioritizedReplayBuffer`].
///
/// # Fields
///
/// * `transitions` - The sampled transitions.
/// * `indices` - Where the transitions live in the buffer, for updating their priorities.
/// * `weights` - The importance-sampling weights, normalized so that the largest possible weight is 1.
/// * `eps_d` - The priority bonus of each transition (non-zero for demonstrations).
#[derive(Debug, Clone)]
pub struct SampledBatch {
    pub transitions: Vec<Transition>,
    pub indices: Vec<usize>,
    pub weights: Vec<f64>,
    pub eps_d: Vec<f64>,
}


/// A prioritized replay buffer that keeps a set of demonstrations forever.
///
/// The demonstrations occupy the first `demo_size` slots and are never
/// overwritten. Agent transitions go into a ring buffer of `capacity` slots
/// after them. Transitions are sampled with probability proportional to
/// $p_i^\alpha$, and each new transition gets the highest priority seen so far.
#[derive(Clone)]
pub struct PrioritizedReplayBuffer {
    buffer: Vec<Option<Transition>>,
    capacity: usize,
    demo_size: usize,
    cursor: usize,
    size: usize,
    alpha: f64,
    eps_demo: f64,
    max_priority: f64,
    tree: SumTree,
    rng: StdRng,
}

impl PrioritizedReplayBuffer {
    pub fn new(
        capacity: usize,
        alpha: f64,
        eps_demo: f64,
        demos: Vec<Transition>,
        seed: u64,
    ) -> Result<Self> {
        ensure!(capacity > 0, "Replay buffer capacity must be positive");
        ensure!(alpha >= 0.0, "PER alpha must be non-negative, got {alpha}");

        let demo_size = demos.len();
        let mut buffer: Vec<Option<Transition>> = demos.into_iter().map(Some).collect();
        buffer.resize(demo_size + capacity, None);

        let mut tree = SumTree::new(demo_size + capacity);
        let max_priority = 1.0;
        for i in 0..demo_size {
            tree.set(i, f64::powf(max_priority, alpha));
        }

        Ok(Self {
            buffer,
            capacity,
            demo_size,
            cursor: 0,
            size: 0,
            alpha,
            eps_demo,
            max_priority,
            tree,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of stored transitions, demonstrations included.
    pub fn len(&self) -> usize {
        self.demo_size + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn demo_size(&self) -> usize {
        self.demo_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn priority(
        &self,
        idx: usize,
    ) -> f64 {
        self.tree.get(idx)
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest agent transition is overwritten.
    pub fn push(
        &mut self,
        transition: Transition,
    ) {
        let idx = self.demo_size + self.cursor;
        self.buffer[idx] = Some(transition);
        self.tree.set(idx, self.max_priority.powf(self.alpha));

        self.cursor = (self.cursor + 1) % self.capacity;
        self.size = (self.size + 1).min(self.capacity);
    }

    /// Sample a prioritized batch of transitions.
    ///
    /// When fewer than `batch_size` transitions are stored, `None` is returned.
    pub fn sample(
        &mut self,
        batch_size: usize,
        beta: f64,
    ) -> Result<Option<SampledBatch>> {
        ensure!(batch_size > 0, "Batch size must be positive");
        ensure!(beta >= 0.0, "PER beta must be non-negative, got {beta}");
        if self.len() < batch_size {
            return Ok(None);
        }

        let indices = self.sample_proportional(batch_size);

        let total = self.tree.total();
        let n = self.len() as f64;
        let p_min = self.tree.min() / total;
        let max_weight = (p_min * n).powf(-beta);

        let mut transitions = Vec::with_capacity(batch_size);
        let mut weights = Vec::with_capacity(batch_size);
        let mut eps_d = Vec::with_capacity(batch_size);
        for &idx in &indices {
            let p_sample = self.tree.get(idx) / total;
            weights.push((p_sample * n).powf(-beta) / max_weight);
            eps_d.push(if idx < self.demo_size { self.eps_demo } else { 0.0 });
            transitions.push(
                self.buffer[idx]
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("Sampled an empty slot at index {idx}"))?,
            );
        }

        Ok(Some(SampledBatch {
            transitions,
            indices,
            weights,
            eps_d,
        }))
    }

    fn sample_proportional(
        &mut self,
        batch_size: usize,
    ) -> Vec<usize> {
        let total = self.tree.total();
        let segment = total / batch_size as f64;
        let last = self.len() - 1;

        (0..batch_size)
            .map(|i| {
                let lo = segment * i as f64;
                let upper = lo + self.rng.gen::<f64>() * segment;
                self.tree.find_prefix_sum_idx(upper).min(last)
            })
            .collect()
    }

    /// Set new priorities for the transitions at `indices`.
    pub fn update_priorities(
        &mut self,
        indices: &[usize],
        priorities: &[f64],
    ) -> Result<()> {
        ensure!(
            indices.len() == priorities.len(),
            "Got {} indices but {} priorities",
            indices.len(),
            priorities.len(),
        );
        for (&idx, &priority) in indices.iter().zip(priorities) {
            ensure!(priority > 0.0, "Priorities must be positive, got {priority}");
            ensure!(idx < self.len(), "Index {idx} is out of range");

            self.tree.set(idx, priority.powf(self.alpha));
            self.max_priority = self.max_priority.max(priority);
        }
        Ok(())
    }

    /// Iterate over all stored transitions, demonstrations first.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter().filter_map(Option::as_ref)
    }
}
