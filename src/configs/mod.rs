mod ddpg;
mod eval;
mod train;

pub use ddpg::DDPG_Config;
pub use eval::EvalConfig;
pub use train::TrainConfig;
