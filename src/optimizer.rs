//! Optimization fan-out over the candidate pool.

use rayon::prelude::*;

use crate::error::PlanError;
use crate::obstacle::ObstacleContainer;
use crate::planner_param::Param;
use crate::pool::CandidatePool;

///optimize every candidate exactly once, in parallel when configured; a
///failing candidate does not stop the others, the first failure is surfaced
///after the join and the offender keeps an infinite cost
pub fn optimize_all_tebs( pool: & mut CandidatePool,
                          obstacles: & ObstacleContainer,
                          param: & Param ) -> Result<(), PlanError> {

    let inner = param.no_inner_iterations;
    let outer = param.no_outer_iterations;

    let results: Vec<Result<(), PlanError>> = if param.enable_multithreading {
        pool.tebs_mut()
            .par_iter_mut()
            .map( |teb| teb.optimize( inner, outer, true, obstacles, param ) )
            .collect()
    } else {
        pool.tebs_mut()
            .iter_mut()
            .map( |teb| teb.optimize( inner, outer, true, obstacles, param ) )
            .collect()
    };

    for r in results {
        r?;
    }
    Ok(())
}
