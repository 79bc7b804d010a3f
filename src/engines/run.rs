use {
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
            RunMode,
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
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::Rng,
    tracing::warn,
};

/// Train a single run on an environment with an off-policy algorithm.
///
/// The run starts with a warm-up phase of `initial_random_actions` steps
/// whose actions come only from the environment's own sampler, so the buffer
/// is populated before the first gradient step and the actor is never
/// consulted. After warm-up, one optimize step runs per environment step.
///
/// Episodes end on an environment-signaled terminal or on truncation at the
/// environment's step cap; both are logged identically, but the stored
/// terminal flag only reflects the former. The agent is notified at every
/// episode end so it can report and reset its episode-scoped state.
///
/// # Arguments
///
/// * `env` - The environment to train on.
/// * `agent` - The agent to train with.
/// * `config` - The configuration for the run.
/// * `device` - The device to run on.
pub fn loop_off_policy<Alg, Env, Obs, Act>(
    env: &mut Env,
    agent: &mut Alg,
    config: TrainConfig,
    device: &Device,
) -> Result<(Vec<f64>, Vec<bool>)>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Alg: Algorithm + OffPolicyAlgorithm,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
{
    warn!("action space: {:?}", env.action_space());
    warn!("observation space: {:?}", env.observation_space());

    let mut mc_returns = Vec::new();
    let mut successes = Vec::new();
    let mut rng = rand::thread_rng();

    env.reset(rng.gen::<u64>())?;
    for _ in 0..config.initial_random_actions {
        let state = <Obs>::to_tensor(env.current_observation(), device)?;
        let action = <Act>::to_tensor(
            <Act>::sample(&mut rng, &env.action_domain()),
            device,
        )?;
        let step = env.step(<Act>::from_tensor_pp(action.clone()))?;

        agent.remember(
            &state,
            &action,
            &Tensor::new(vec![step.reward], device)?,
            &<Obs>::to_tensor(step.observation, device)?,
            &Tensor::new(vec![if step.terminated { 1.0 } else { 0.0 }], device)?,
        );

        if step.terminated || step.truncated {
            env.reset(rng.gen::<u64>())?;
        }
    }

    for episode in 0..config.max_episodes {
        let mut total_reward = 0.0;
        env.reset(rng.gen::<u64>())?;

        loop {
            let state = &<Obs>::to_tensor(env.current_observation(), device)?;
            let action = &agent.actions(state)?;
            let step = env.step(<Act>::from_tensor_pp(action.clone()))?;
            total_reward += step.reward;

            agent.remember(
                state,
                action,
                &Tensor::new(vec![step.reward], device)?,
                &<Obs>::to_tensor(step.observation, device)?,
                &Tensor::new(vec![if step.terminated { 1.0 } else { 0.0 }], device)?,
            );

            // one optimize step per environment step once warm-up is over
            agent.train()?;

            if step.terminated || step.truncated {
                successes.push(step.terminated);
                break;
            }
        }

        // notify at episode end, so the last episode's noise is reported too
        agent.new_episode();
        warn!("episode {episode} with total reward of {total_reward}");
        mc_returns.push(total_reward);
    }
    Ok((mc_returns, successes))
}

/// Evaluate an agent on an environment with its deterministic policy.
///
/// Runs in [`RunMode::Test`], so no exploration noise is layered onto the
/// actor's output and no training happens. Returns the mean and the
/// per-episode rewards.
pub fn evaluation_loop_off_policy<Alg, Env, Obs, Act>(
    env: &mut Env,
    agent: &mut Alg,
    config: EvalConfig,
    device: &Device,
) -> Result<(f64, Vec<f64>)>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Alg: Algorithm + OffPolicyAlgorithm,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible,
{
    let previous_mode = agent.run_mode();
    agent.set_run_mode(RunMode::Test);

    let mut rewards = Vec::new();
    let mut rng = rand::thread_rng();

    for episode in 0..config.max_episodes {
        let mut total_reward = 0.0;
        env.reset(rng.gen::<u64>())?;

        loop {
            let state = &<Obs>::to_tensor(env.current_observation(), device)?;
            let action = agent.actions(state)?;
            let step = env.step(<Act>::from_tensor_pp(action))?;
            total_reward += step.reward;

            if step.terminated || step.truncated {
                break;
            }
        }

        warn!("evaluation episode {episode} with total reward of {total_reward}");
        rewards.push(total_reward);
    }

    agent.set_run_mode(previous_mode);

    let mean_reward = rewards.iter().sum::<f64>() / rewards.len().max(1) as f64;
    warn!("mean evaluation reward: {mean_reward}");
    Ok((mean_reward, rewards))
}
