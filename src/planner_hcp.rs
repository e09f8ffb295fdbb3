//! Homotopy class planning orchestrator.
//!
//! Per planning cycle: re-anchor the surviving candidates on the new
//! boundary conditions, prune and reclassify them, explore the workspace for
//! unrepresented homotopy classes, optimize the whole pool and elect the
//! cheapest candidate.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use nalgebra::Point2;

use crate::error::PlanError;
use crate::graph::{build_roadmap_graph, build_simple_graph, depth_first_explore};
use crate::instrumentation::Timer;
use crate::obstacle::ObstacleContainer;
use crate::optimizer::optimize_all_tebs;
use crate::planner::{CostmapModel, Planner, Visualization};
use crate::planner_param::Param;
use crate::pool::CandidatePool;
use crate::pose::{PoseSE2, Velocity2};
use crate::teb::TebOptimalPlanner;

pub struct HomotopyClassPlanner {

    param: Param,

    ///borrowed world model, read only for the duration of a cycle
    obstacles: ObstacleContainer,

    pool: CandidatePool,

    visualization: Option<Box<dyn Visualization>>,

    ///cooperative cancellation for the roadmap rejection sampling loop
    cancel: Arc<AtomicBool>,

    initialized: bool,

    stat_cycles: u32,
    stat_time_exploration: f64,
    stat_time_optimization: f64,
}

impl HomotopyClassPlanner {

    pub fn new() -> HomotopyClassPlanner {
        HomotopyClassPlanner {
            param: Param::default(),
            obstacles: vec![],
            pool: CandidatePool::new(),
            visualization: None,
            cancel: Arc::new( AtomicBool::new( false ) ),
            initialized: false,
            stat_cycles: 0,
            stat_time_exploration: 0.,
            stat_time_optimization: 0.,
        }
    }

    pub fn initialize( & mut self, param: Param, obstacles: ObstacleContainer ) {
        self.param = param;
        self.obstacles = obstacles;
        self.initialized = true;
    }

    pub fn set_visualization( & mut self, visualization: Box<dyn Visualization> ) {
        self.visualization = Some( visualization );
    }

    ///shared flag checked inside the roadmap sampling loop; setting it stops
    ///an in-flight exploration
    pub fn cancel_flag( & self ) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn pool( & self ) -> & CandidatePool {
        & self.pool
    }

    pub fn best( & self ) -> Option<&TebOptimalPlanner> {
        self.pool.best()
    }

    ///one full planning cycle
    pub fn plan_se2( & mut self,
                     start: & PoseSE2,
                     goal: & PoseSE2,
                     start_vel: Option<&Velocity2> ) -> Result<(), PlanError> {

        if !self.initialized {
            return Err( PlanError::NotInitialized );
        }

        self.pool.update_all( Some( start ), Some( goal ), start_vel );
        self.pool.renew_and_analyze( &self.obstacles, &self.param, false );

        let mut timer = Timer::default();
        self.explore_equivalence_classes( start, goal, start_vel );
        self.stat_time_exploration += timer.dur_ms();

        let mut timer = Timer::default();
        let optimized = optimize_all_tebs( & mut self.pool, &self.obstacles, &self.param );
        self.stat_time_optimization += timer.dur_ms();
        if let Err(ref e) = optimized {
            warn!( "optimization reported a failure: {}", e );
        }

        self.pool.select_best();
        self.pool.prune_detours( 0. );

        self.stat_cycles += 1;
        self.print_stats();

        optimized
    }

    ///build the exploration graph for the configured strategy and seed a new
    ///candidate for every unrepresented class it reaches
    fn explore_equivalence_classes( & mut self,
                                    start: & PoseSE2,
                                    goal: & PoseSE2,
                                    start_vel: Option<&Velocity2> ) {

        //a robot that already carries speed is committed to its heading, so
        //the nearest obstacle keypoints are heading limited
        let limit_heading = match start_vel {
            Some(v) => v.linear.abs() > 0.05,
            _ => false,
        };

        let graph = if self.param.simple_exploration {
            build_simple_graph( start, goal, &self.obstacles, &self.param, limit_heading )
        } else {
            build_roadmap_graph( start, goal, &self.obstacles, &self.param, &self.cancel )
        };

        if self.param.visualize_hc_graph {
            if let Some(vis) = &self.visualization {
                vis.publish_graph( &graph );
            }
        }

        depth_first_explore( &graph,
                             & mut self.pool,
                             &self.obstacles,
                             &self.param,
                             start.theta,
                             goal.theta,
                             start_vel );
    }

    fn print_stats( & self ) {
        info!( "planning cycles: {}", self.stat_cycles );
        info!( "candidate classes: {}", self.pool.len() );
        info!( "stat_time_exploration: {} ms", self.stat_time_exploration );
        info!( "stat_time_optimization: {} ms", self.stat_time_optimization );
    }
}

impl Planner for HomotopyClassPlanner {

    fn plan( & mut self, initial_plan: & [PoseSE2], start_vel: Option<&Velocity2> ) -> Result<(), PlanError> {
        if !self.initialized {
            return Err( PlanError::NotInitialized );
        }
        if initial_plan.is_empty() {
            warn!( "received an empty initial plan" );
            return Ok(());
        }
        let start = initial_plan[0];
        let goal = initial_plan[initial_plan.len() - 1];
        self.plan_se2( &start, &goal, start_vel )
    }

    fn velocity_command( & self ) -> Velocity2 {
        match self.pool.best() {
            Some(teb) => teb.velocity_command(),
            _ => Velocity2::default(),
        }
    }

    fn is_trajectory_feasible( & self,
                               costmap: & dyn CostmapModel,
                               footprint: & [Point2<f64>],
                               inscribed_radius: f64,
                               circumscribed_radius: f64,
                               look_ahead_poses: usize ) -> bool {

        let best = match self.pool.best() {
            Some(teb) => teb,
            _ => return false,
        };

        let poses = best.teb().poses();
        let upper = ( look_ahead_poses + 1 ).min( poses.len() );
        for pose in &poses[..upper] {
            let cost = costmap.footprint_cost( pose.x, pose.y, pose.theta,
                                               footprint,
                                               inscribed_radius, circumscribed_radius );
            if cost < 0. {
                return false;
            }
        }
        true
    }

    fn visualize( & self ) {
        if let Some(vis) = &self.visualization {
            vis.publish_teb_container( &self.pool );
            if let Some(best) = self.pool.best() {
                vis.publish_local_plan( best.teb() );
            }
        }
    }
}
