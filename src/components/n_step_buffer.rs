use {
    super::Transition,
    anyhow::{
        ensure,
        Result,
    },
    std::collections::VecDeque,
};


/// Fold a window of consecutive transitions into one N-step transition.
///
/// The reward is the discounted sum of the rewards in the window, cut off at
/// the first terminal transition, whose next state and done flag are used.
pub fn n_step_info<'a, I>(
    window: I,
    gamma: f64,
) -> Option<(f64, Vec<f64>, bool)>
where
    I: DoubleEndedIterator<Item = &'a Transition>,
{
    let mut window = window.rev();
    let last = window.next()?;

    let mut reward = last.reward;
    let mut next_state = &last.next_state;
    let mut done = last.done;

    for t in window {
        reward = t.reward + gamma * reward * (1.0 - t.done as u8 as f64);
        if t.done {
            next_state = &t.next_state;
            done = true;
        }
    }
    Some((reward, next_state.clone(), done))
}

/// Split a list of demonstrations into one-step and N-step transitions.
///
/// The i-th element of both lists starts at the same state, so they can be
/// stored at the same indices of the two buffers.
pub fn n_step_demos(
    demos: &[Transition],
    n_step: usize,
    gamma: f64,
) -> (Vec<Transition>, Vec<Transition>) {
    let mut one_step = Vec::new();
    let mut multi_step = Vec::new();
    if n_step == 0 {
        return (one_step, multi_step);
    }

    for window in demos.windows(n_step) {
        let first = &window[0];
        if let Some((reward, next_state, done)) = n_step_info(window.iter(), gamma) {
            one_step.push(first.clone());
            multi_step.push(Transition::new(
                first.state.clone(),
                first.action.clone(),
                reward,
                next_state,
                done,
            ));
        }
    }
    (one_step, multi_step)
}


/// Ring buffer of N-step transitions.
///
/// Demonstrations occupy the first `demo_size` slots permanently. The
/// buffer is meant to be filled in lockstep with a
/// [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer) so that the
/// same index refers to the same starting state in both.
#[derive(Clone)]
pub struct NStepTransitionBuffer {
    window: VecDeque<Transition>,
    buffer: Vec<Option<Transition>>,
    buffer_size: usize,
    demo_size: usize,
    cursor: usize,
    n_step: usize,
    gamma: f64,
}

impl NStepTransitionBuffer {
    pub fn new(
        buffer_size: usize,
        n_step: usize,
        gamma: f64,
        demos: Vec<Transition>,
    ) -> Result<Self> {
        ensure!(buffer_size > 0, "N-step buffer size must be positive");
        ensure!(n_step > 0, "n_step must be positive");

        let demo_size = demos.len();
        let mut buffer: Vec<Option<Transition>> = demos.into_iter().map(Some).collect();
        buffer.resize(demo_size + buffer_size, None);

        Ok(Self {
            window: VecDeque::with_capacity(n_step),
            buffer,
            buffer_size,
            demo_size,
            cursor: 0,
            n_step,
            gamma,
        })
    }

    pub fn n_step(&self) -> usize {
        self.n_step
    }

    /// Push a single-step transition.
    ///
    /// Once `n_step` transitions have been collected, the N-step transition
    /// starting at the oldest one is stored, and that oldest single-step
    /// transition is returned so the caller can store it as well.
    pub fn push(
        &mut self,
        transition: Transition,
    ) -> Option<Transition> {
        if self.window.len() == self.n_step {
            self.window.pop_front();
        }
        self.window.push_back(transition);

        if self.window.len() < self.n_step {
            return None;
        }

        let (reward, next_state, done) = n_step_info(self.window.iter(), self.gamma)?;
        let first = self.window.front()?.clone();

        self.buffer[self.demo_size + self.cursor] = Some(Transition::new(
            first.state.clone(),
            first.action.clone(),
            reward,
            next_state,
            done,
        ));
        self.cursor = (self.cursor + 1) % self.buffer_size;

        Some(first)
    }

    /// Look up the N-step transitions stored at the given indices.
    pub fn get(
        &self,
        indices: &[usize],
    ) -> Result<Vec<&Transition>> {
        indices
            .iter()
            .map(|&i| {
                self.buffer
                    .get(i)
                    .and_then(Option::as_ref)
                    .ok_or_else(|| anyhow::anyhow!("No N-step transition stored at index {i}"))
            })
            .collect()
    }
}
