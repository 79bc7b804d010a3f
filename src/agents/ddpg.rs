use {
    super::{
        Algorithm,
        OffPolicyAlgorithm,
        RunMode,
    },
    crate::{
        components::{
            OuNoise,
            ReplayBuffer,
        },
        configs::DDPG_Config,
    },
    candle_core::{
        bail,
        DType,
        Device,
        Error,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        linear,
        sequential::seq,
        Activation,
        AdamW,
        Optimizer,
        ParamsAdamW,
        Sequential,
        VarBuilder,
        VarMap,
    },
    std::ops::RangeInclusive,
    tracing::info,
};

/// Soft-update the target parameters of a (network, target) pair towards the
/// online parameters: `target <- tau * network + (1 - tau) * target`.
///
/// Both networks live in the same VarMap and are addressed by name prefix,
/// so this only ever reads online parameters and writes target parameters.
/// With `tau = 1.0` the target becomes an exact copy, which is used once at
/// construction and never afterwards.
fn track(
    varmap: &mut VarMap,
    vb: &VarBuilder,
    target_prefix: &str,
    network_prefix: &str,
    dims: &[(usize, usize)],
    tau: f64,
) -> Result<()> {
    for (i, &(in_dim, out_dim)) in dims.iter().enumerate() {
        let target_w = vb.get((out_dim, in_dim), &format!("{target_prefix}-fc{i}.weight"))?;
        let network_w = vb.get((out_dim, in_dim), &format!("{network_prefix}-fc{i}.weight"))?;
        varmap.set_one(
            format!("{target_prefix}-fc{i}.weight"),
            ((tau * network_w)? + ((1.0 - tau) * target_w)?)?,
        )?;

        let target_b = vb.get(out_dim, &format!("{target_prefix}-fc{i}.bias"))?;
        let network_b = vb.get(out_dim, &format!("{network_prefix}-fc{i}.bias"))?;
        varmap.set_one(
            format!("{target_prefix}-fc{i}.bias"),
            ((tau * network_b)? + ((1.0 - tau) * target_b)?)?,
        )?;
    }
    Ok(())
}

/// The deterministic policy network pi(s) -> action and its slowly tracking
/// target copy.
///
/// The online and target networks are built by the same closure and differ
/// only in their name prefix, which guarantees matching parameter shapes.
/// The final tanh is rescaled per dimension into the environment's
/// `[action_low, action_high]`.
struct Actor<'a> {
    varmap: VarMap,
    vb: VarBuilder<'a>,
    network: Sequential,
    target_network: Sequential,
    dims: Vec<(usize, usize)>,
}

impl Actor<'_> {
    fn new(
        device: &Device,
        dtype: DType,
        dims: &[(usize, usize)],
        action_low: &[f64],
        action_high: &[f64],
    ) -> Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let scale = Tensor::new(
            action_low
                .iter()
                .zip(action_high.iter())
                .map(|(low, high)| 0.5 * (high - low))
                .collect::<Vec<f64>>(),
            device,
        )?;
        let offset = Tensor::new(
            action_low
                .iter()
                .zip(action_high.iter())
                .map(|(low, high)| 0.5 * (high + low))
                .collect::<Vec<f64>>(),
            device,
        )?;

        let make_network = |prefix: &str| {
            let scale = scale.clone();
            let offset = offset.clone();
            let seq = seq()
                .add(linear(
                    dims[0].0,
                    dims[0].1,
                    vb.pp(format!("{prefix}-fc0")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[1].0,
                    dims[1].1,
                    vb.pp(format!("{prefix}-fc1")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[2].0,
                    dims[2].1,
                    vb.pp(format!("{prefix}-fc2")),
                )?)
                .add(func(move |xs| {
                    xs.tanh()?.broadcast_mul(&scale)?.broadcast_add(&offset)
                }));
            Ok::<Sequential, Error>(seq)
        };

        let network = make_network("actor")?;
        let target_network = make_network("target-actor")?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&mut varmap, &vb, "target-actor", "actor", dims, 1.0)?;

        Ok(Self {
            varmap,
            vb,
            network,
            target_network,
            dims: dims.to_vec(),
        })
    }

    fn forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(state)
    }

    fn target_forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.target_network.forward(state)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(
            &mut self.varmap,
            &self.vb,
            "target-actor",
            "actor",
            &self.dims,
            tau,
        )
    }
}

/// The action-value network Q(s, a) -> scalar and its slowly tracking
/// target copy.
struct Critic<'a> {
    varmap: VarMap,
    vb: VarBuilder<'a>,
    network: Sequential,
    target_network: Sequential,
    dims: Vec<(usize, usize)>,
}

impl Critic<'_> {
    fn new(
        device: &Device,
        dtype: DType,
        dims: &[(usize, usize)],
    ) -> Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let make_network = |prefix: &str| {
            let seq = seq()
                .add(linear(
                    dims[0].0,
                    dims[0].1,
                    vb.pp(format!("{prefix}-fc0")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[1].0,
                    dims[1].1,
                    vb.pp(format!("{prefix}-fc1")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[2].0,
                    dims[2].1,
                    vb.pp(format!("{prefix}-fc2")),
                )?);
            Ok::<Sequential, Error>(seq)
        };

        let network = make_network("critic")?;
        let target_network = make_network("target-critic")?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&mut varmap, &vb, "target-critic", "critic", dims, 1.0)?;

        Ok(Self {
            varmap,
            vb,
            network,
            target_network,
            dims: dims.to_vec(),
        })
    }

    fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        let xs = Tensor::cat(&[action, state], 1)?;
        self.network.forward(&xs)
    }

    fn target_forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        let xs = Tensor::cat(&[action, state], 1)?;
        self.target_network.forward(&xs)
    }

    /// The gradient of the summed Q values with respect to the actions.
    ///
    /// The actions are wrapped in a fresh `Var` so that the backward pass
    /// tracks them as a leaf, and the gradient is read back out of the
    /// GradStore. This is the external gradient signal handed to the actor,
    /// which never recomputes critic internals itself.
    fn action_grads(
        &self,
        state: &Tensor,
        actions: &Tensor,
    ) -> Result<Tensor> {
        let actions = Var::from_tensor(&actions.detach()?)?;
        let q = self.forward(state, actions.as_tensor())?;
        let grads = q.sum_all()?.backward()?;
        match grads.get(&actions) {
            Some(grad) => Ok(grad.clone()),
            None => bail!("no action gradient was computed by the critic"),
        }
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<()> {
        track(
            &mut self.varmap,
            &self.vb,
            "target-critic",
            "critic",
            &self.dims,
            tau,
        )
    }
}

/// Deep Deterministic Policy Gradient.
///
/// Owns the four networks (actor, critic and their targets), both
/// optimizers, the replay buffer and the exploration noise process. All of
/// the optimize-step machinery runs strictly sequentially: sample a
/// minibatch, regress the critic onto the bootstrapped target, step the
/// actor along the critic's action gradient, then soft-update both target
/// pairs.
#[allow(dead_code)]
#[allow(clippy::upper_case_acronyms)]
pub struct DDPG<'a> {
    actor: Actor<'a>,
    actor_optim: AdamW,
    critic: Critic<'a>,
    critic_optim: AdamW,
    gamma: f64,
    tau: f64,
    replay_buffer: ReplayBuffer,
    batch_size: usize,
    ou_noise: OuNoise,
    // noise_scale * (action_high - action_low), per action dimension
    noise_scaling: Tensor,
    device: Device,
    config: DDPG_Config,

    size_state: usize,
    size_action: usize,
    pub run_mode: RunMode,
}

impl DDPG<'_> {
    pub fn new(
        device: &Device,
        config: DDPG_Config,
        size_state: usize,
        action_domain: &[RangeInclusive<f64>],
    ) -> Result<Self> {
        if size_state == 0 || action_domain.is_empty() {
            bail!(
                "degenerate dimensions: state_dim {size_state}, action_dim {}",
                action_domain.len(),
            )
        }

        let filter_by_prefix = |varmap: &VarMap, prefix: &str| {
            varmap
                .data()
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(name, var)| name.starts_with(prefix).then_some(var.clone()))
                .collect::<Vec<Var>>()
        };

        let size_action = action_domain.len();
        let action_low: Vec<f64> = action_domain.iter().map(|r| *r.start()).collect();
        let action_high: Vec<f64> = action_domain.iter().map(|r| *r.end()).collect();

        let actor = Actor::new(
            device,
            DType::F64,
            &[
                (size_state, config.hidden_1_size),
                (config.hidden_1_size, config.hidden_2_size),
                (config.hidden_2_size, size_action),
            ],
            &action_low,
            &action_high,
        )?;
        let actor_optim = AdamW::new(
            filter_by_prefix(&actor.varmap, "actor"),
            ParamsAdamW {
                lr: config.actor_learning_rate,
                ..Default::default()
            },
        )?;

        let critic = Critic::new(
            device,
            DType::F64,
            &[
                (size_state + size_action, config.hidden_1_size),
                (config.hidden_1_size, config.hidden_2_size),
                (config.hidden_2_size, 1),
            ],
        )?;
        let critic_optim = AdamW::new(
            filter_by_prefix(&critic.varmap, "critic"),
            ParamsAdamW {
                lr: config.critic_learning_rate,
                ..Default::default()
            },
        )?;

        let noise_scaling = Tensor::new(
            action_low
                .iter()
                .zip(action_high.iter())
                .map(|(low, high)| config.noise_scale * (high - low))
                .collect::<Vec<f64>>(),
            device,
        )?;

        Ok(Self {
            actor,
            actor_optim,
            critic,
            critic_optim,
            gamma: config.gamma,
            tau: config.tau,
            replay_buffer: ReplayBuffer::new(config.replay_buffer_capacity),
            batch_size: config.training_batch_size,
            ou_noise: OuNoise::new(
                config.ou_mu,
                config.ou_theta,
                config.ou_sigma,
                config.ou_dt,
                size_action,
            ),
            noise_scaling,
            device: device.clone(),
            size_state,
            size_action,
            run_mode: RunMode::Train,
            config,
        })
    }

    pub fn actor_forward_item(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        self.actor.forward(&state.detach()?.unsqueeze(0)?)?.squeeze(0)
    }

    pub fn critic_forward_item(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor> {
        self.critic.forward(
            &state.detach()?.unsqueeze(0)?,
            &action.detach()?.unsqueeze(0)?,
        )?.squeeze(0)
    }

    /// The bootstrapped regression target `y = r + gamma * (1 - terminal) *
    /// Q_target(s', pi_target(s'))`.
    ///
    /// Environment-signaled terminals zero the bootstrap term exactly;
    /// transitions that merely hit the episode step cap keep it, since the
    /// value of their successor state is still meaningful.
    fn regression_targets(
        &self,
        rewards: &Tensor,
        next_states: &Tensor,
        terminateds: &Tensor,
    ) -> Result<Tensor> {
        let next_actions = self.actor.target_forward(next_states)?;
        let q_next = self.critic.target_forward(next_states, &next_actions)?;
        let non_terminal = terminateds.affine(-1.0, 1.0)?;
        rewards + ((self.gamma * q_next)? * non_terminal)?.detach()?
    }
}

impl Algorithm for DDPG<'_> {
    type Config = DDPG_Config;

    fn config(&self) -> &DDPG_Config {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &DDPG_Config,
        size_state: usize,
        action_domain: &[RangeInclusive<f64>],
    ) -> Result<Box<Self>> {
        Ok(Box::new(Self::new(
            device,
            config.clone(),
            size_state,
            action_domain,
        )?))
    }

    fn actions(
        &mut self,
        state: &Tensor,
    ) -> Result<Tensor> {
        // Candle assumes a batch dimension, so when we don't have one we need
        // to pretend we do by un- and resqueezing the state tensor.
        let actions = self.actor.forward(&state.detach()?.unsqueeze(0)?)?.squeeze(0)?;
        Ok(if let RunMode::Train = self.run_mode {
            let noise = Tensor::new(self.ou_noise.sample(), &self.device)?;
            // The noised action is deliberately NOT clipped back into the
            // action domain before it reaches the environment.
            (actions + (noise * &self.noise_scaling)?)?
        } else {
            actions
        })
    }

    fn train(&mut self) -> Result<()> {
        let (states, actions, rewards, next_states, terminateds) =
            self.replay_buffer.random_batch(self.batch_size)?;

        let q_target = self.regression_targets(&rewards, &next_states, &terminateds)?;
        let q = self.critic.forward(&states, &actions)?;
        let critic_loss = (q_target - q)?.sqr()?.mean_all()?;

        let loss_value = critic_loss.to_scalar::<f64>()?;
        if !loss_value.is_finite() {
            bail!("training diverged: critic loss is {loss_value}")
        }
        self.critic_optim.backward_step(&critic_loss)?;

        // Two-stage hand-off: take dQ/da from the critic at the current
        // policy's actions, then ascend the policy gradient by feeding it
        // into the actor update as a constant.
        let actions_pred = self.actor.forward(&states)?;
        let action_grads = self.critic.action_grads(&states, &actions_pred)?;
        let actor_loss = (actions_pred * action_grads.detach()?)?
            .sum(1)?
            .mean_all()?
            .neg()?;
        self.actor_optim.backward_step(&actor_loss)?;

        self.critic.track(self.tau)?;
        self.actor.track(self.tau)?;

        Ok(())
    }

    fn new_episode(&mut self) {
        info!(
            "episode finished, final exploration noise: {:?}",
            self.ou_noise.current(),
        );
        self.ou_noise.reset();
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    fn set_run_mode(&mut self, mode: RunMode) {
        self.run_mode = mode;
    }
}

impl OffPolicyAlgorithm for DDPG<'_> {
    fn remember(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
    ) {
        info!(
            concat!(
                "\nPushing to replay buffer:",
                "\n{state:?}",
                "\n{action:?}",
                "\n{reward:?}",
                "\n{next_state:?}",
            ),
            state = state,
            action = action,
            reward = reward,
            next_state = next_state,
        );
        self.replay_buffer
            .push(state, action, reward, next_state, terminated)
    }

    fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }
}
