//! # Components
//!
//! This module contains the components that can be used to build an agent.
//!
//! ## Noise
//!
//! The [`Noise`] components are used to add exploration noise to the actions
//! of an agent. [`OuNoise`] implements the Ornstein-Uhlenbeck process and
//! [`GaussianNoise`] draws Gaussian noise whose scale decays over time.
//!
//! ## Replay Buffer
//!
//! The [`PrioritizedReplayBuffer`] struct implements prioritized experience
//! replay on top of a [`SumTree`], keeping demonstrations around forever. The
//! [`NStepTransitionBuffer`] stores the matching N-step transitions, which are
//! used in the [`crate::agents::TD3fD`] algorithm.

mod noise;
mod n_step_buffer;
mod replay_buffer;
mod sum_tree;

pub use noise::{
    GaussianNoise,
    Noise,
    NoiseConfig,
    OuNoise,
};
pub use n_step_buffer::{
    n_step_demos,
    n_step_info,
    NStepTransitionBuffer,
};
pub use replay_buffer::{
    PrioritizedReplayBuffer,
    SampledBatch,
    Transition,
};
pub use sum_tree::SumTree;
