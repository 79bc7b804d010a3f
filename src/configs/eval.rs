use serde::Serialize;

#[derive(Clone, Serialize)]
pub struct EvalConfig {
    // The number of deterministic evaluation episodes.
    pub max_episodes: usize,
}
impl EvalConfig {
    pub fn new(max_episodes: usize) -> Self {
        Self { max_episodes }
    }
}
