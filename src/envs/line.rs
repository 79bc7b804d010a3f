use {
    super::{
        Environment,
        Sampleable,
        Step,
        TensorConvertible,
        VectorConvertible,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        RngCore,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::ops::RangeInclusive,
    tracing::info,
};

/// The configuration struct for the [`LineEnv`] environment.
///
/// # Fields
/// * `target` - The position the agent has to reach.
/// * `spawn_span` - The agent spawns uniformly within this distance of zero.
/// * `term_radius` - The episode terminates within this distance of the target.
/// * `world_radius` - Positions are bounded to `[-world_radius, world_radius]`.
/// * `max_step` - The magnitude bound of the action domain.
/// * `timelimit` - The maximum number of steps before the episode is truncated.
/// * `seed` - The seed for the random number generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    pub target: f64,
    pub spawn_span: f64,
    pub term_radius: f64,
    pub world_radius: f64,
    pub max_step: f64,
    pub timelimit: usize,
    pub seed: u64,
}
impl Default for LineConfig {
    fn default() -> Self {
        Self {
            target: 0.0,
            spawn_span: 5.0,
            term_radius: 0.5,
            world_radius: 10.0,
            max_step: 1.0,
            timelimit: 50,
            seed: StdRng::from_entropy().gen::<u64>(),
        }
    }
}
impl LineConfig {
    pub fn check(&self) -> Result<()> {
        if self.max_step <= 0.0 {
            return Err(anyhow!("Max step must be positive"));
        }
        if self.term_radius <= 0.0 {
            return Err(anyhow!("Termination radius must be positive"));
        }
        if self.spawn_span <= self.term_radius {
            return Err(anyhow!("Spawn span must exceed the termination radius"));
        }
        if self.world_radius < self.spawn_span + self.target.abs() {
            return Err(anyhow!("World radius must contain the spawn span and target"));
        }
        if self.timelimit == 0 {
            return Err(anyhow!("Timelimit must be at least 1"));
        }
        Ok(())
    }
}

/// The observation type for the [`LineEnv`] environment: the agent's
/// position on the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineObs {
    x: f64,
}
impl LineObs {
    pub fn x(&self) -> f64 {
        self.x
    }
}
impl From<f64> for LineObs {
    fn from(value: f64) -> Self {
        Self { x: value }
    }
}

impl VectorConvertible for LineObs {
    fn from_vec_pp(value: Vec<f64>) -> Self {
        Self::from_vec(value)
    }

    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 1);
        Self::from(value[0])
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.x]
    }
}

impl TensorConvertible for LineObs {
    fn from_tensor_pp(value: Tensor) -> Self {
        Self::from_tensor(value)
    }

    fn from_tensor(value: Tensor) -> Self {
        Self::from_vec(value.to_vec1::<f64>().unwrap())
    }

    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(Self::to_vec(value), device)
    }
}

/// The action type for the [`LineEnv`] environment: a signed displacement
/// along the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAction {
    dx: f64,
}
impl LineAction {
    pub fn dx(&self) -> f64 {
        self.dx
    }
}
impl From<f64> for LineAction {
    fn from(value: f64) -> Self {
        Self { dx: value }
    }
}

impl Sampleable for LineAction {
    /// Sample a displacement uniformly from the action domain.
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        assert!(domain.len() == 1);
        Self::from(rng.gen_range(domain[0].clone()))
    }
}

impl VectorConvertible for LineAction {
    fn from_vec_pp(value: Vec<f64>) -> Self {
        Self::from_vec(value)
    }

    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 1);
        Self::from(value[0])
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.dx]
    }
}

impl TensorConvertible for LineAction {
    fn from_tensor_pp(value: Tensor) -> Self {
        Self::from_tensor(value)
    }

    fn from_tensor(value: Tensor) -> Self {
        Self::from_vec(value.to_vec1::<f64>().unwrap())
    }

    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(Self::to_vec(value), device)
    }
}

/// A 1-dimensional reach-the-target environment.
///
/// Dynamics are `x += dx`, bounded to the world, and the reward is the
/// negative squared distance to the target. The episode terminates when the
/// agent is within `term_radius` of the target and truncates at the
/// timelimit.
pub struct LineEnv {
    config: LineConfig,
    state: f64,
    timestep: usize,
    rng: StdRng,
}

impl LineEnv {
    fn spawn(&mut self) -> f64 {
        // never spawn already inside the termination radius
        loop {
            let x = self
                .rng
                .gen_range(-self.config.spawn_span..=self.config.spawn_span);
            if (x - self.config.target).abs() > self.config.term_radius {
                break x;
            }
        }
    }
}

impl Environment for LineEnv {
    type Config = LineConfig;
    type Action = LineAction;
    type Observation = LineObs;

    fn config(&self) -> &LineConfig {
        &self.config
    }

    fn new(config: LineConfig) -> Result<Box<Self>> {
        config.check()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let mut env = Self {
            config,
            state: 0.0,
            timestep: 0,
            rng,
        };
        env.state = env.spawn();
        Ok(Box::new(env))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<LineObs> {
        self.timestep = 0;
        self.rng = StdRng::seed_from_u64(seed);
        self.state = self.spawn();
        Ok(LineObs::from(self.state))
    }

    fn step(
        &mut self,
        action: LineAction,
    ) -> Result<Step<LineObs, LineAction>> {
        self.timestep += 1;

        let previous = self.state;
        self.state = (self.state + action.dx())
            .clamp(-self.config.world_radius, self.config.world_radius);

        let distance = self.state - self.config.target;
        let reward = -(distance * distance);
        let terminated = distance.abs() <= self.config.term_radius;
        let truncated = !terminated && (self.timestep == self.config.timelimit);

        info!(
            "LineEnv step: x({:.3}) + dx({:.3}), R: {:.3}",
            previous,
            action.dx(),
            reward,
        );

        Ok(Step {
            observation: LineObs::from(self.state),
            action,
            reward,
            terminated,
            truncated,
        })
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![-self.config.max_step..=self.config.max_step]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn current_observation(&self) -> LineObs {
        LineObs::from(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LineConfig {
        LineConfig {
            target: 0.0,
            spawn_span: 5.0,
            term_radius: 0.5,
            world_radius: 10.0,
            max_step: 1.0,
            timelimit: 10,
            seed: 42,
        }
    }

    #[test]
    fn stepping_moves_the_state_and_scores_the_distance() {
        let mut env = *LineEnv::new(test_config()).unwrap();
        env.reset(1).unwrap();

        let before = env.current_observation().x();
        let step = env.step(LineAction::from(0.25)).unwrap();
        let after = step.observation.x();

        assert!((after - (before + 0.25)).abs() < 1e-12);
        assert!((step.reward - (-(after * after))).abs() < 1e-12);
    }

    #[test]
    fn reaching_the_target_terminates() {
        let mut env = *LineEnv::new(test_config()).unwrap();
        env.reset(1).unwrap();

        // walk straight at the target
        loop {
            let x = env.current_observation().x();
            let step = env.step(LineAction::from(-x.signum())).unwrap();
            if step.terminated {
                assert!(step.observation.x().abs() <= 0.5 + 1.0);
                return;
            }
            assert!(!step.truncated, "walked past the timelimit");
        }
    }

    #[test]
    fn hitting_the_timelimit_truncates_without_terminating() {
        let mut env = *LineEnv::new(test_config()).unwrap();
        env.reset(1).unwrap();
        let away = env.current_observation().x().signum();

        for i in 1..=10 {
            let step = env.step(LineAction::from(away * 0.1)).unwrap();
            assert!(!step.terminated);
            assert_eq!(step.truncated, i == 10);
        }
    }

    #[test]
    fn state_is_bounded_by_the_world_radius() {
        let mut env = *LineEnv::new(test_config()).unwrap();
        env.reset(1).unwrap();
        for _ in 0..100 {
            env.step(LineAction::from(3.0)).unwrap();
        }
        assert!(env.current_observation().x() <= 10.0);
    }
}
