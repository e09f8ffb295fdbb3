use thiserror::Error;

///planner level failures; degenerate inputs are not errors and yield an
///empty candidate pool instead
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planner has not been initialized")]
    NotInitialized,

    #[error("trajectory optimization failed: {0}")]
    OptimizerFailure(String),
}
