use serde::Serialize;

#[allow(non_camel_case_types)]
#[derive(Clone, Serialize)]
pub struct DDPG_Config {
    // The learning rates for the Actor and Critic networks
    pub actor_learning_rate: f64,
    pub critic_learning_rate: f64,
    // The impact of the q value of the next state on the current state's q value.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // The number of neurons in the hidden layers of the Actor and Critic networks.
    pub hidden_1_size: usize,
    pub hidden_2_size: usize,
    // The capacity of the replay buffer used for sampling training data.
    pub replay_buffer_capacity: usize,
    // The training batch size for each training iteration.
    pub training_batch_size: usize,
    // Ornstein-Uhlenbeck process parameters.
    pub ou_mu: f64,
    pub ou_theta: f64,
    pub ou_sigma: f64,
    pub ou_dt: f64,
    // Exploration noise magnitude as a fraction of the action range.
    pub noise_scale: f64,
}
impl DDPG_Config {
    pub fn pendulum() -> Self {
        Self {
            actor_learning_rate: 1e-4,
            critic_learning_rate: 1e-3,
            gamma: 0.99,
            tau: 0.001,
            hidden_1_size: 400,
            hidden_2_size: 300,
            replay_buffer_capacity: 100_000,
            training_batch_size: 64,
            ou_mu: 0.0,
            ou_theta: 0.15,
            ou_sigma: 0.2,
            ou_dt: 1e-2,
            noise_scale: 0.1,
        }
    }

    pub fn line() -> Self {
        Self {
            actor_learning_rate: 1e-3,
            critic_learning_rate: 1e-3,
            gamma: 0.99,
            tau: 0.001,
            hidden_1_size: 64,
            hidden_2_size: 64,
            replay_buffer_capacity: 50_000,
            training_batch_size: 64,
            ou_mu: 0.0,
            ou_theta: 0.15,
            ou_sigma: 0.2,
            ou_dt: 1e-2,
            noise_scale: 0.1,
        }
    }
}
