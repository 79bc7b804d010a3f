mod ddpg;

pub use ddpg::DDPG;

use {
    crate::components::ReplayBuffer,
    candle_core::{
        Device,
        Result,
        Tensor,
    },
    std::{
        fmt::Display,
        ops::RangeInclusive,
    },
};

/// The execution mode of an agent is either training or testing.
///
/// In training mode the agent layers exploration noise onto its policy
/// output, in testing mode the policy is used as-is.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "Train"),
            RunMode::Test => write!(f, "Test"),
        }
    }
}

pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        action_domain: &[RangeInclusive<f64>],
    ) -> Result<Box<Self>>;

    fn actions(
        &mut self,
        state: &Tensor,
    ) -> Result<Tensor>;

    fn train(&mut self) -> Result<()>;

    /// Notify the agent that an episode has ended so it can report and
    /// reset any episode-scoped state (e.g. the exploration noise process).
    fn new_episode(&mut self);

    fn run_mode(&self) -> RunMode;
    fn set_run_mode(&mut self, mode: RunMode);
}

pub trait OffPolicyAlgorithm: Algorithm {
    fn remember(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
    );

    fn replay_buffer(&self) -> &ReplayBuffer;
}
