use serde::Serialize;

#[derive(Clone, Serialize)]
pub struct TrainConfig {
    // The total number of training episodes.
    pub max_episodes: usize,
    // Number of warm-up steps where actions are sampled from the
    // environment's own action space instead of the policy. Must cover at
    // least one training batch, otherwise the first optimize step fails.
    pub initial_random_actions: usize,
}
impl TrainConfig {
    pub fn new(
        max_episodes: usize,
        initial_random_actions: usize,
    ) -> Self {
        Self {
            max_episodes,
            initial_random_actions,
        }
    }

    pub fn pendulum() -> Self {
        Self {
            max_episodes: 100,
            initial_random_actions: 1000,
        }
    }

    pub fn line() -> Self {
        Self {
            max_episodes: 500,
            initial_random_actions: 1000,
        }
    }
}
