use {
    super::{
        evaluation_loop_off_policy,
        loop_off_policy,
    },
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
        },
        configs::{
            EvalConfig,
            TrainConfig,
        },
        envs::{
            Environment,
            Sampleable,
            TensorConvertible,
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

/// Run an experiment with an off-policy algorithm.
///
/// Every repetition trains a freshly constructed agent on a freshly
/// constructed environment, evaluates it deterministically, and writes the
/// collected reward series to Parquet next to RON copies of every config.
///
/// # Arguments
///
/// * `path` - The path to the directory where the collected data will be stored.
/// * `n_repetitions` - The number of repeated, identical runs to perform.
/// * `env_config` - The configuration for the environment.
/// * `alg_config` - The configuration for the algorithm.
/// * `train_config` - The configuration for the training loop.
/// * `eval_config` - The configuration for the evaluation loop.
/// * `device` - The device to run the experiment on.
#[allow(clippy::too_many_arguments)]
pub fn run_experiment_off_policy<Alg, Env, Obs, Act>(
    path: &dyn AsRef<Path>,
    n_repetitions: usize,
    env_config: Env::Config,
    alg_config: Alg::Config,
    train_config: TrainConfig,
    eval_config: EvalConfig,
    device: &Device,
) -> Result<()>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Clone + Serialize,
    Alg: Algorithm + OffPolicyAlgorithm,
    Alg::Config: Clone + Serialize,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
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
    write_config(&eval_config, path.join("config_evaluation.ron"))?;

    for n in 0..n_repetitions {
        warn!("Collecting data, run {n}/{n_repetitions}");

        let mut env = *Env::new(env_config.clone())?;
        let mut alg = *Alg::from_config(
            device,
            &alg_config,
            env.observation_space().iter().product::<usize>(),
            &env.action_domain(),
        )?;

        let (mc_returns, successes) = loop_off_policy(
            &mut env,
            &mut alg,
            train_config.clone(),
            device,
        )?;

        let (eval_mean, eval_returns) = evaluation_loop_off_policy(
            &mut env,
            &mut alg,
            eval_config.clone(),
            device,
        )?;
        warn!("run {n} finished with mean evaluation reward {eval_mean}");

        let mut df = DataFrame::new(vec![
            Series::new(
                &format!("run_{n}_total_rewards"),
                &mc_returns,
            ),
            Series::new(
                &format!("run_{n}_successes"),
                &successes,
            ),
        ])?;
        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_data.parquet")))?
        ).finish(&mut df)?;

        let mut eval_df = DataFrame::new(vec![
            Series::new(
                &format!("run_{n}_eval_rewards"),
                &eval_returns,
            ),
        ])?;
        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_eval.parquet")))?
        ).finish(&mut eval_df)?;
    }
    Ok(())
}
