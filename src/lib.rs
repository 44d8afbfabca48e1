//! Exploration noise and a TD3-from-Demonstrations agent for continuous control.
//!
//! The [`components`] hold the noise processes and the replay memory, the
//! [`agents`] the networks and the [`TD3fD`](agents::TD3fD) agent, and the
//! [`engines`] drive agents on the [`envs`].

pub mod logging;
pub mod util;

pub mod envs;
pub mod components;
pub mod agents;
pub mod configs;
pub mod engines;

pub mod cli;
