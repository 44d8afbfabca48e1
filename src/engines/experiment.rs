use {
    super::{
        run::loop_off_policy,
        ParamRunMode,
    },
    crate::{
        agents::{
            OffPolicyAlgorithm,
            SaveableAlgorithm,
        },
        components::Transition,
        configs::{
            SeedableConfig,
            TestConfig,
            TrainConfig,
        },
        envs::{
            Environment,
            Sampleable,
            VectorConvertible,
        },
        util::write_config,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::Device,
    polars::prelude::{
        DataFrame,
        NamedFrom,
        ParquetWriter,
        Series,
    },
    serde::Serialize,
    std::{
        fs::{
            create_dir_all,
            File,
        },
        path::Path,
    },
    tracing::warn,
};

/// Where to load model weights from: a directory and the checkpoint name.
pub type Checkpoint = (String, String);

fn build<Alg, Env, Obs, Act>(
    env_config: &Env::Config,
    alg_config: &Alg::Config,
    demos: Vec<Transition>,
    load_model: Option<&Checkpoint>,
    device: &Device,
) -> Result<(Env, Alg)>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Clone,
    Alg: OffPolicyAlgorithm + SaveableAlgorithm,
{
    let env = *Env::new(env_config.clone())?;
    let mut alg = *Alg::from_demonstrations(
        device,
        alg_config,
        env.observation_space().iter().product::<usize>(),
        env.action_space().iter().product::<usize>(),
        demos,
    )?;

    if let Some((model_path, model_name)) = load_model {
        warn!("Loading model weights from {model_path} with name {model_name}");
        alg.load(Path::new(model_path), model_name)?;
    }
    Ok((env, alg))
}

/// The configs of repetition `n`, with the agent and training seeds offset by `n`.
fn repetition_configs<C: Clone + SeedableConfig>(
    alg_config: &C,
    train_config: &TrainConfig,
    n: usize,
) -> (C, TrainConfig) {
    let mut alg_config = alg_config.clone();
    alg_config.set_seed(alg_config.seed().wrapping_add(n as u64));
    let mut train_config = train_config.clone();
    train_config.set_seed(train_config.seed().wrapping_add(n as u64));
    (alg_config, train_config)
}

/// Run an experiment with an off-policy algorithm.
///
/// Every repetition trains a fresh agent on a fresh environment. The configs
/// are written to `data/<path>/` once, and every repetition adds a parquet
/// file with its episode returns and lengths plus a checkpoint of the final
/// model weights. Both the agent seed and the training seed are offset by
/// the repetition.
///
/// # Arguments
///
/// * `path` - The path to the directory (under `data/`) where the collected data will be stored.
/// * `n_repetitions` - The number of repeated, identical runs to perform.
/// * `env_config` - The configuration for the environment.
/// * `alg_config` - The configuration for the algorithm.
/// * `train_config` - The configuration for training.
/// * `demos` - Demonstrations to seed the replay buffer with.
/// * `load_model` - Optionally start from saved model weights.
/// * `device` - The device to run the experiment on.
#[allow(clippy::too_many_arguments)]
pub fn run_experiment_off_policy<Alg, Env, Obs, Act>(
    path: &dyn AsRef<Path>,
    n_repetitions: usize,
    env_config: Env::Config,
    alg_config: Alg::Config,
    train_config: TrainConfig,
    demos: Vec<Transition>,
    load_model: Option<Checkpoint>,
    device: &Device,
) -> Result<()>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Clone + Serialize,
    Alg: OffPolicyAlgorithm + SaveableAlgorithm,
    Alg::Config: Clone + Serialize + SeedableConfig,
    Obs: Clone + VectorConvertible,
    Act: VectorConvertible + Sampleable,
{
    let path = Path::new("data/").join(path);

    let alg_config_exists = path.join("config_algorithm.ron").try_exists()?;
    let env_config_exists = path.join("config_environment.ron").try_exists()?;
    if alg_config_exists || env_config_exists {
        Err(anyhow!(concat!(
            "Config files already exist in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    create_dir_all(path.as_path())?;
    write_config(&alg_config, path.join("config_algorithm.ron"))?;
    write_config(&env_config, path.join("config_environment.ron"))?;
    write_config(&train_config, path.join("config_training.ron"))?;

    for n in 0..n_repetitions {
        warn!("Collecting data, run {n}/{n_repetitions}");

        let (run_alg_config, run_config) = repetition_configs(&alg_config, &train_config, n);
        let (mut env, mut alg) = build::<Alg, Env, Obs, Act>(
            &env_config,
            &run_alg_config,
            demos.clone(),
            load_model.as_ref(),
            device,
        )?;

        let (mc_returns, episode_lengths) = loop_off_policy(
            &mut env,
            &mut alg,
            ParamRunMode::Train(run_config),
        )?;

        // Write collected data to file

        let episode_lengths: Vec<u64> = episode_lengths.into_iter().map(|l| l as u64).collect();
        let mut df = DataFrame::new(vec![
            Series::new(
                &format!("run_{n}_total_rewards"),
                &mc_returns,
            ),
            Series::new(
                &format!("run_{n}_episode_lengths"),
                &episode_lengths,
            ),
        ])?;

        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_data.parquet")))?
        ).finish(&mut df)?;

        alg.save(&path.join("checkpoints"), &format!("run_{n}"))?;
    }
    Ok(())
}

/// Evaluate an off-policy algorithm without exploration noise or learning.
///
/// Returns the total reward of every test episode.
pub fn evaluate_off_policy<Alg, Env, Obs, Act>(
    env_config: Env::Config,
    alg_config: Alg::Config,
    test_config: TestConfig,
    load_model: Option<Checkpoint>,
    device: &Device,
) -> Result<Vec<f64>>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Clone,
    Alg: OffPolicyAlgorithm + SaveableAlgorithm,
    Obs: Clone + VectorConvertible,
    Act: VectorConvertible + Sampleable,
{
    if load_model.is_none() {
        warn!("Testing an untrained agent, no model weights were given");
    }
    let (mut env, mut alg) = build::<Alg, Env, Obs, Act>(
        &env_config,
        &alg_config,
        Vec::new(),
        load_model.as_ref(),
        device,
    )?;

    let (mc_returns, _) = loop_off_policy(&mut env, &mut alg, ParamRunMode::Test(test_config))?;
    warn!(
        "Average test return: {}",
        mc_returns.iter().sum::<f64>() / mc_returns.len().max(1) as f64,
    );
    Ok(mc_returns)
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::configs::TD3fD_Config,
    };

    #[test]
    fn repetitions_offset_both_seeds() {
        let alg_config = TD3fD_Config { seed: 42, ..TD3fD_Config::pendulum() };
        let train_config = TrainConfig::new(1, 10, 0, 7);

        let (alg_0, train_0) = repetition_configs(&alg_config, &train_config, 0);
        assert_eq!((alg_0.seed, train_0.seed()), (42, 7));

        let (alg_3, train_3) = repetition_configs(&alg_config, &train_config, 3);
        assert_eq!((alg_3.seed, train_3.seed()), (45, 10));
        assert_eq!(alg_3.hyper_params(), alg_config.hyper_params());
        assert_eq!(train_3.max_episodes(), train_config.max_episodes());
    }
}
