use {
    crate::{
        agents::TD3fD,
        components::NoiseConfig,
        configs::{
            TD3fD_Config,
            TestConfig,
            TrainConfig,
        },
        engines::{
            evaluate_off_policy,
            run_experiment_off_policy,
        },
        envs::{
            Environment,
            PendulumConfig,
            PendulumEnv,
            Sampleable,
            VectorConvertible,
        },
        logging::setup_logging,
        util::{
            read_config,
            read_demos,
        },
    },
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    serde::Serialize,
    std::path::PathBuf,
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Pendulum,
    Lunarlander,
}
impl Env {
    pub fn name(&self) -> &str {
        match self {
            Env::Pendulum => "pendulum",
            Env::Lunarlander => "lunarlander",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    Ou,
    Gaussian,
}
impl NoiseKind {
    pub fn config(&self) -> NoiseConfig {
        match self {
            NoiseKind::Ou => NoiseConfig::ou(),
            NoiseKind::Gaussian => NoiseConfig::gaussian(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    Debug, // every learning step
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::Debug => Some(Level::DEBUG),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The environment to run.
    #[arg(long, value_enum)]
    pub env: Env,

    /// Evaluate without noise or learning instead of training.
    #[arg(long)]
    pub test: bool,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::None)]
    pub log: Loglevel,

    /// Number of episodes to run.
    #[arg(long)]
    pub episodes: Option<usize>,

    /// Maximum number of steps per episode.
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Seed for the agent and the environment.
    #[arg(long)]
    pub seed: Option<u64>,

    /// The exploration noise to use.
    #[arg(long, value_enum)]
    pub noise: Option<NoiseKind>,

    /// Number of repeated, identical training runs.
    #[arg(long, default_value_t = 1)]
    pub repetitions: usize,

    /// Directory under data/ to write the results to.
    #[arg(long)]
    pub output: Option<String>,

    /// Directory to load model weights from.
    #[arg(long)]
    pub load: Option<String>,

    /// Name of the checkpoint to load.
    #[arg(long, default_value = "run_0")]
    pub checkpoint: String,

    /// RON file with demonstration transitions.
    #[arg(long)]
    pub demo: Option<PathBuf>,

    /// RON file with the hyperparameters of the agent.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// This handles setting up logging and the configs, and then either trains
/// or tests the agent on the chosen environment.
pub fn run(args: Args) -> Result<()> {
    let name = args.output.clone().unwrap_or_else(|| {
        format!("{}_{}", args.env.name(), if args.test { "test" } else { "train" })
    });
    if let Some(level) = args.log.level() {
        setup_logging(&format!("{name}.log"), Some(level), Some(level))?;
    }

    match args.env {
        Env::Pendulum => run_on::<PendulumEnv, _, _>(
            PendulumConfig::default(),
            TD3fD_Config::pendulum(),
            TrainConfig::pendulum(),
            &args,
            &name,
        ),
        #[cfg(feature = "gym")]
        Env::Lunarlander => run_on::<crate::envs::LunarLanderEnv, _, _>(
            crate::envs::LunarLanderConfig::default(),
            TD3fD_Config::lunarlander(),
            TrainConfig::lunarlander(),
            &args,
            &name,
        ),
        #[cfg(not(feature = "gym"))]
        Env::Lunarlander => Err(anyhow::anyhow!(
            "The lunarlander environment needs Gymnasium, build with `--features gym`",
        )),
    }
}

fn run_on<E, Obs, Act>(
    env_config: E::Config,
    alg_config: TD3fD_Config,
    mut train_config: TrainConfig,
    args: &Args,
    name: &str,
) -> Result<()>
where
    E: Environment<Action = Act, Observation = Obs>,
    E::Config: Clone + Serialize,
    Obs: Clone + VectorConvertible,
    Act: VectorConvertible + Sampleable,
{
    let mut alg_config = match &args.config {
        Some(path) => read_config(path)?,
        None => alg_config,
    };
    if let Some(noise) = args.noise {
        alg_config.noise = noise.config();
    }
    if let Some(seed) = args.seed {
        alg_config.seed = seed;
        train_config.set_seed(seed);
    }
    if let Some(episodes) = args.episodes {
        train_config.set_max_episodes(episodes);
    }
    if let Some(max_steps) = args.max_steps {
        train_config.set_max_episode_steps(max_steps);
    }
    alg_config.validate()?;

    let device = Device::Cpu;
    let load_model = args.load.clone().map(|dir| (dir, args.checkpoint.clone()));

    if args.test {
        let mut test_config = TestConfig::default();
        if let Some(episodes) = args.episodes {
            test_config.set_max_episodes(episodes);
        }
        if let Some(max_steps) = args.max_steps {
            test_config.set_max_episode_steps(max_steps);
        }
        if let Some(seed) = args.seed {
            test_config.set_seed(seed);
        }
        evaluate_off_policy::<TD3fD, E, Obs, Act>(
            env_config,
            alg_config,
            test_config,
            load_model,
            &device,
        )?;
    } else {
        let demos = match &args.demo {
            Some(path) => read_demos(path)?,
            None => Vec::new(),
        };
        if !demos.is_empty() {
            warn!("Loaded {} demonstrations", demos.len());
        }
        run_experiment_off_policy::<TD3fD, E, Obs, Act>(
            &name,
            args.repetitions,
            env_config,
            alg_config,
            train_config,
            demos,
            load_model,
            &device,
        )?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        clap::CommandFactory,
    };

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let args = Args::parse_from([
            "td3fd", "--env", "pendulum", "--test", "--log", "debug",
            "--episodes", "3", "--noise", "ou", "--seed", "7",
        ]);
        assert_eq!(args.env, Env::Pendulum);
        assert!(args.test);
        assert_eq!(args.log.level(), Some(Level::DEBUG));
        assert_eq!(args.episodes, Some(3));
        assert_eq!(args.noise, Some(NoiseKind::Ou));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.repetitions, 1);
        assert_eq!(args.checkpoint, "run_0");
    }

    #[test]
    fn noise_kinds_map_to_configs() {
        assert_eq!(NoiseKind::Ou.config(), NoiseConfig::ou());
        assert_eq!(NoiseKind::Gaussian.config(), NoiseConfig::gaussian());
    }
}
