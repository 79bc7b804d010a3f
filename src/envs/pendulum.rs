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
    std::{
        f64::consts::PI,
        ops::RangeInclusive,
    },
    tracing::info,
};

/// The configuration struct for the [`PendulumEnv`] environment.
///
/// The physical constants follow the classic swing-up task: a pole of mass
/// `m` and length `l` under gravity `g`, integrated with timestep `dt`,
/// driven by a torque bounded by `max_torque` and with the angular velocity
/// bounded by `max_speed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendulumConfig {
    pub gravity: f64,
    pub mass: f64,
    pub length: f64,
    pub dt: f64,
    pub max_speed: f64,
    pub max_torque: f64,
    pub timelimit: usize,
    pub seed: u64,
}
impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
            dt: 0.05,
            max_speed: 8.0,
            max_torque: 2.0,
            timelimit: 200,
            seed: StdRng::from_entropy().gen::<u64>(),
        }
    }
}
impl PendulumConfig {
    pub fn check(&self) -> Result<()> {
        if self.mass <= 0.0 || self.length <= 0.0 {
            return Err(anyhow!("Mass and length must be positive"));
        }
        if self.dt <= 0.0 {
            return Err(anyhow!("Timestep must be positive"));
        }
        if self.max_speed <= 0.0 || self.max_torque <= 0.0 {
            return Err(anyhow!("Speed and torque bounds must be positive"));
        }
        if self.timelimit == 0 {
            return Err(anyhow!("Timelimit must be at least 1"));
        }
        Ok(())
    }
}

/// The observation type for the [`PendulumEnv`] environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumObs {
    // The (x, y) coordinates of the free end of the pendulum
    x: f64,
    y: f64,
    // The angular velocity of the pendulum
    theta_dot: f64,
}
impl From<(f64, f64)> for PendulumObs {
    /// Build the observation from `(theta, theta_dot)`.
    fn from(value: (f64, f64)) -> Self {
        Self {
            x: value.0.cos(),
            y: value.0.sin(),
            theta_dot: value.1,
        }
    }
}

impl VectorConvertible for PendulumObs {
    fn from_vec_pp(value: Vec<f64>) -> Self {
        Self::from_vec(value)
    }

    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 3);
        Self {
            x: value[0],
            y: value[1],
            theta_dot: value[2],
        }
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.x, value.y, value.theta_dot]
    }
}

impl TensorConvertible for PendulumObs {
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

/// The action type for the [`PendulumEnv`] environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumAction {
    // Torque applied to the free end of the pendulum
    tau: f64,
}
impl PendulumAction {
    pub fn tau(&self) -> f64 {
        self.tau
    }
}
impl From<f64> for PendulumAction {
    fn from(value: f64) -> Self {
        Self { tau: value }
    }
}

impl Sampleable for PendulumAction {
    /// Sample a torque uniformly from the action domain.
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        assert!(domain.len() == 1);
        Self::from(rng.gen_range(domain[0].clone()))
    }
}

impl VectorConvertible for PendulumAction {
    fn from_vec_pp(value: Vec<f64>) -> Self {
        Self::from_vec(value)
    }

    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 1);
        Self::from(value[0])
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.tau]
    }
}

impl TensorConvertible for PendulumAction {
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

/// Map an angle into `[-pi, pi]`.
fn angle_normalize(theta: f64) -> f64 {
    (theta + PI).rem_euclid(2.0 * PI) - PI
}

/// The classic pendulum swing-up task.
///
/// The pendulum starts at a random angle and the goal is to swing it
/// upright and keep it there with bounded torque. The environment clips the
/// incoming torque into its own bounds, never terminates on its own and
/// truncates at the timelimit.
pub struct PendulumEnv {
    config: PendulumConfig,
    theta: f64,
    theta_dot: f64,
    timestep: usize,
    rng: StdRng,
}

impl PendulumEnv {
    fn spawn(&mut self) {
        self.theta = self.rng.gen_range(-PI..=PI);
        self.theta_dot = self.rng.gen_range(-1.0..=1.0);
    }
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;
    type Action = PendulumAction;
    type Observation = PendulumObs;

    fn config(&self) -> &PendulumConfig {
        &self.config
    }

    fn new(config: PendulumConfig) -> Result<Box<Self>> {
        config.check()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let mut env = Self {
            config,
            theta: 0.0,
            theta_dot: 0.0,
            timestep: 0,
            rng,
        };
        env.spawn();
        Ok(Box::new(env))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<PendulumObs> {
        self.timestep = 0;
        self.rng = StdRng::seed_from_u64(seed);
        self.spawn();
        Ok(PendulumObs::from((self.theta, self.theta_dot)))
    }

    fn step(
        &mut self,
        action: PendulumAction,
    ) -> Result<Step<PendulumObs, PendulumAction>> {
        self.timestep += 1;

        let (g, m, l, dt) = (
            self.config.gravity,
            self.config.mass,
            self.config.length,
            self.config.dt,
        );

        // the environment clips the torque into its own bounds
        let torque = action
            .tau()
            .clamp(-self.config.max_torque, self.config.max_torque);

        let angle = angle_normalize(self.theta);
        let cost = angle * angle + 0.1 * self.theta_dot * self.theta_dot
            + 0.001 * torque * torque;

        self.theta_dot += (3.0 * g / (2.0 * l) * self.theta.sin()
            + 3.0 / (m * l * l) * torque)
            * dt;
        self.theta_dot = self
            .theta_dot
            .clamp(-self.config.max_speed, self.config.max_speed);
        self.theta += self.theta_dot * dt;

        let truncated = self.timestep == self.config.timelimit;

        info!(
            "PendulumEnv step: theta({:.3}), theta_dot({:.3}), torque({:.3}), R: {:.3}",
            self.theta, self.theta_dot, torque, -cost,
        );

        Ok(Step {
            observation: PendulumObs::from((self.theta, self.theta_dot)),
            action,
            reward: -cost,
            // the swing-up task never signals terminal on its own
            terminated: false,
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
        vec![-self.config.max_torque..=self.config.max_torque]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![3]
    }

    fn current_observation(&self) -> PendulumObs {
        PendulumObs::from((self.theta, self.theta_dot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_stay_within_their_physical_bounds() {
        let mut env = *PendulumEnv::new(PendulumConfig {
            seed: 3,
            ..Default::default()
        })
        .unwrap();
        env.reset(3).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let action = PendulumAction::sample(&mut rng, &env.action_domain());
            let step = env.step(action).unwrap();
            let obs = PendulumObs::to_vec(step.observation);
            assert!(obs[0].abs() <= 1.0 + 1e-12);
            assert!(obs[1].abs() <= 1.0 + 1e-12);
            assert!(obs[2].abs() <= 8.0);
            assert!(step.reward <= 0.0);
            if step.truncated {
                env.reset(rng.gen::<u64>()).unwrap();
            }
        }
    }

    #[test]
    fn episodes_truncate_at_the_timelimit_and_never_terminate() {
        let mut env = *PendulumEnv::new(PendulumConfig {
            timelimit: 25,
            seed: 9,
            ..Default::default()
        })
        .unwrap();
        env.reset(9).unwrap();

        for i in 1..=25 {
            let step = env.step(PendulumAction::from(0.5)).unwrap();
            assert!(!step.terminated);
            assert_eq!(step.truncated, i == 25);
        }
    }

    #[test]
    fn angle_normalize_wraps_into_minus_pi_pi() {
        assert!((angle_normalize(3.0 * PI) - PI).abs() < 1e-12 || (angle_normalize(3.0 * PI) + PI).abs() < 1e-12);
        assert!((angle_normalize(2.0 * PI)).abs() < 1e-12);
        assert!((angle_normalize(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
        for theta in [-10.0, -1.0, 0.0, 0.5, 7.0, 100.0] {
            let wrapped = angle_normalize(theta);
            assert!((-PI..=PI).contains(&wrapped));
        }
    }
}
