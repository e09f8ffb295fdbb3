//! Planner facing traits and collaborator contracts.

use nalgebra::Point2;

use crate::error::PlanError;
use crate::graph::ExplorationGraph;
use crate::pool::CandidatePool;
use crate::pose::{PoseSE2, Velocity2};
use crate::teb::TimedElasticBand;

pub trait Planner {

    ///plan toward the last pose of the initial plan; only the first and last
    ///poses are consumed, as the current start and the goal
    fn plan( & mut self, initial_plan: & [PoseSE2], start_vel: Option<&Velocity2> ) -> Result<(), PlanError>;

    ///first control action of the committed trajectory, zero when no
    ///feasible candidate exists
    fn velocity_command( & self ) -> Velocity2;

    ///check the first look_ahead_poses + 1 poses of the committed trajectory
    ///against a costmap footprint model
    fn is_trajectory_feasible( & self,
                               costmap: & dyn CostmapModel,
                               footprint: & [Point2<f64>],
                               inscribed_radius: f64,
                               circumscribed_radius: f64,
                               look_ahead_poses: usize ) -> bool;

    fn visualize( & self );
}

///world model supplied by the navigation stack; negative cost means the
///footprint is in collision
pub trait CostmapModel {
    fn footprint_cost( & self,
                       x: f64,
                       y: f64,
                       theta: f64,
                       footprint: & [Point2<f64>],
                       inscribed_radius: f64,
                       circumscribed_radius: f64 ) -> f64;
}

///optional sink for planner introspection
pub trait Visualization {
    fn publish_graph( & self, graph: & ExplorationGraph );
    fn publish_teb_container( & self, pool: & CandidatePool );
    fn publish_local_plan( & self, teb: & TimedElasticBand );
}

///visualization sink that reports summary statistics through the log
#[derive(Default)]
pub struct LogVisualization;

impl Visualization for LogVisualization {

    fn publish_graph( & self, graph: & ExplorationGraph ) {
        debug!( "exploration graph: {} vertices, {} edges", graph.len(), graph.edge_count() );
    }

    fn publish_teb_container( & self, pool: & CandidatePool ) {
        debug!( "candidate pool: {} classes", pool.len() );
    }

    fn publish_local_plan( & self, teb: & TimedElasticBand ) {
        debug!( "local plan: {} poses over {:.2} s", teb.poses().len(), teb.sum_time() );
    }
}
