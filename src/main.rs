use {
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    ddpg_rl::{
        agents::{
            Algorithm,
            DDPG,
        },
        configs::{
            DDPG_Config,
            EvalConfig,
            TrainConfig,
        },
        engines::{
            evaluation_loop_off_policy,
            loop_off_policy,
            run_experiment_off_policy,
        },
        envs::{
            Environment,
            LineConfig,
            LineEnv,
            PendulumConfig,
            PendulumEnv,
        },
        logging::setup_logging,
    },
    tracing::Level,
};

#[derive(ValueEnum, Debug, Clone)]
enum Env {
    Line,
    Pendulum,
}

#[derive(ValueEnum, Debug, Clone)]
enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::Warn)]
    log: Loglevel,

    /// The environment to run.
    #[arg(long, value_enum)]
    env: Env,

    /// Exploration noise magnitude as a fraction of the action range.
    #[arg(long, default_value_t = 0.1)]
    noise: f64,

    /// Capacity of the replay buffer.
    #[arg(long)]
    replay_capacity: Option<usize>,

    /// Number of training episodes.
    #[arg(long)]
    train_episodes: Option<usize>,

    /// Number of deterministic evaluation episodes run after training.
    #[arg(long, default_value_t = 10)]
    eval_episodes: usize,

    /// Directory under data/ to write the results to.
    #[arg(long)]
    output: Option<String>,
}

impl Args {
    fn apply(
        &self,
        alg_config: &mut DDPG_Config,
        train_config: &mut TrainConfig,
    ) {
        alg_config.noise_scale = self.noise;
        if let Some(capacity) = self.replay_capacity {
            alg_config.replay_buffer_capacity = capacity;
        }
        if let Some(episodes) = self.train_episodes {
            train_config.max_episodes = episodes;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(level) = args.log.level() {
        setup_logging(&"debug.log", Some(level), Some(level))?;
    }

    let device = Device::Cpu;
    match args.env {
        Env::Line => {
            let env_config = LineConfig::default();
            let mut alg_config = DDPG_Config::line();
            let mut train_config = TrainConfig::line();
            args.apply(&mut alg_config, &mut train_config);
            let eval_config = EvalConfig::new(args.eval_episodes);

            if let Some(output) = &args.output {
                run_experiment_off_policy::<DDPG, LineEnv, _, _>(
                    output,
                    1,
                    env_config,
                    alg_config,
                    train_config,
                    eval_config,
                    &device,
                )?;
            } else {
                let mut env = *LineEnv::new(env_config)?;
                let mut agent = *DDPG::from_config(
                    &device,
                    &alg_config,
                    env.observation_space().iter().product::<usize>(),
                    &env.action_domain(),
                )?;
                loop_off_policy(&mut env, &mut agent, train_config, &device)?;
                evaluation_loop_off_policy(&mut env, &mut agent, eval_config, &device)?;
            }
        }

        Env::Pendulum => {
            let env_config = PendulumConfig::default();
            let mut alg_config = DDPG_Config::pendulum();
            let mut train_config = TrainConfig::pendulum();
            args.apply(&mut alg_config, &mut train_config);
            let eval_config = EvalConfig::new(args.eval_episodes);

            if let Some(output) = &args.output {
                run_experiment_off_policy::<DDPG, PendulumEnv, _, _>(
                    output,
                    1,
                    env_config,
                    alg_config,
                    train_config,
                    eval_config,
                    &device,
                )?;
            } else {
                let mut env = *PendulumEnv::new(env_config)?;
                let mut agent = *DDPG::from_config(
                    &device,
                    &alg_config,
                    env.observation_space().iter().product::<usize>(),
                    &env.action_domain(),
                )?;
                loop_off_policy(&mut env, &mut agent, train_config, &device)?;
                evaluation_loop_off_policy(&mut env, &mut agent, eval_config, &device)?;
            }
        }
    }
    Ok(())
}
