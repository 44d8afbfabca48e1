use {
    super::ParamRunMode,
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
            RunMode,
        },
        components::Transition,
        envs::{
            clip_to_domain,
            Environment,
            Sampleable,
            VectorConvertible,
        },
    },
    anyhow::Result,
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    tracing::{
        info,
        warn,
    },
};


/// Run a single train or test run on an environment with an off-policy algorithm.
///
/// In train mode the agent first pretrains on its replay buffer, then every
/// environment step is remembered and followed by a call to `train`. In test
/// mode the agent acts without noise and does not learn.
///
/// Episodes are cut after `max_episode_steps` or the environment's timelimit,
/// whichever comes first. Returns the total reward and the length of every
/// episode.
///
/// # Arguments
///
/// * `env` - The environment to run on.
/// * `alg` - The agent to run with.
/// * `mode` - Whether to train or test, with the config for that mode.
pub fn loop_off_policy<Alg, Env, Obs, Act>(
    env: &mut Env,
    alg: &mut Alg,
    mode: ParamRunMode,
) -> Result<(Vec<f64>, Vec<usize>)>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Alg: Algorithm + OffPolicyAlgorithm,
    Obs: Clone + VectorConvertible,
    Act: VectorConvertible + Sampleable,
{
    warn!("{mode} on action space {:?}", env.action_space());
    warn!("{mode} on observation space {:?}", env.observation_space());

    let run_mode = mode.run_mode();
    let action_domain = env.action_domain();
    let max_episode_steps = mode.max_episode_steps().min(env.timelimit());
    let mut rng = StdRng::seed_from_u64(mode.seed());
    let mut steps_taken = 0;
    let mut mc_returns = Vec::new();
    let mut episode_lengths = Vec::new();

    if let RunMode::Train = run_mode {
        alg.pretrain()?;
    }

    for episode in 0..mode.max_episodes() {
        let mut total_reward = 0.0;
        let mut episode_steps = 0;
        env.reset(rng.gen::<u64>())?;
        alg.reset();

        loop {
            let state = <Obs>::to_vec(env.current_observation());

            // select an action, or randomly sample one
            let mut action = if steps_taken < mode.initial_random_actions() {
                <Act>::to_vec(<Act>::sample(&mut rng, &action_domain))
            } else {
                alg.actions(&state, run_mode)?
            };
            clip_to_domain(&mut action, &action_domain);

            let step = env.step(<Act>::from_vec(action.clone())?)?;
            total_reward += step.reward;
            steps_taken += 1;
            episode_steps += 1;

            let truncated = step.truncated || episode_steps >= max_episode_steps;
            if let RunMode::Train = run_mode {
                alg.remember(Transition::new(
                    state,
                    action,
                    step.reward,
                    <Obs>::to_vec(step.observation),
                    step.terminated,
                ));
                alg.train()?;
            }

            if step.terminated || truncated {
                info!("episode {episode} ended after {episode_steps} steps (terminated: {})", step.terminated);
                break;
            }
        }

        warn!("episode {episode} with total reward of {total_reward}");
        mc_returns.push(total_reward);
        episode_lengths.push(episode_steps);
    }
    Ok((mc_returns, episode_lengths))
}
