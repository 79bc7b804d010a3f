pub mod logging;
pub mod util;

pub mod envs;
pub mod components;
pub mod agents;
pub mod configs;
pub mod engines;
