mod experiment;
mod run;

pub use experiment::run_experiment_off_policy;
pub use run::{
    evaluation_loop_off_policy,
    loop_off_policy,
};
