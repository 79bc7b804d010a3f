mod line;
mod pendulum;

use {
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::RngCore,
    std::ops::RangeInclusive,
};

pub use crate::envs::{
    line::{
        LineAction,
        LineConfig,
        LineEnv,
        LineObs,
    },
    pendulum::{
        PendulumAction,
        PendulumConfig,
        PendulumEnv,
        PendulumObs,
    },
};

pub trait TensorConvertible: VectorConvertible {
    fn from_tensor_pp(value: Tensor) -> Self;
    fn from_tensor(value: Tensor) -> Self;
    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor>;
}

pub trait VectorConvertible {
    fn from_vec_pp(value: Vec<f64>) -> Self;
    fn from_vec(value: Vec<f64>) -> Self;
    fn to_vec(value: Self) -> Vec<f64>;
}

pub trait Sampleable {
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self;
}

/// The outcome of a single environment step.
///
/// `terminated` means the environment itself signaled the end of the episode
/// (e.g. the goal was reached); `truncated` means the step cap was hit. Both
/// end the episode, but only `terminated` may zero a bootstrap target.
#[derive(Debug)]
pub struct Step<O, A> {
    pub observation: O,
    pub action: A,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

pub trait Environment {
    type Config;
    type Action;
    type Observation;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;
    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation>;
    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>>;
    fn timelimit(&self) -> usize;
    fn action_space(&self) -> Vec<usize>;
    fn action_domain(&self) -> Vec<RangeInclusive<f64>>;
    fn observation_space(&self) -> Vec<usize>;
    fn current_observation(&self) -> Self::Observation;
}
