//! Planner configuration.

use std::sync::Arc;

use serde::Deserialize;

use crate::obstacle::{CircleObstacle, LineObstacle, Obstacle, ObstacleContainer, PointObstacle};

///tuning knobs for the homotopy class planner; serde defaults allow partial
///scenario files
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Param {

    ///upper bound on the candidate pool size and the class enumeration cutoff
    pub max_number_classes: usize,

    ///true selects the deterministic obstacle keypoint graph, false the
    ///probabilistic roadmap
    pub simple_exploration: bool,

    ///angular half width (radians) of the forward cone used for edge pruning
    ///and detour detection
    pub obstacle_heading_threshold: f64,

    ///number of collision free samples for the probabilistic roadmap
    pub roadmap_graph_no_samples: usize,

    ///width of the sampling rectangle around the start-goal axis
    pub roadmap_graph_area_width: f64,

    ///magnitude scale applied to workspace coordinates before computing the
    ///homotopy invariant
    pub h_signature_prescaler: f64,

    ///componentwise equivalence threshold for the long term signature list
    pub h_signature_threshold: f64,

    pub enable_multithreading: bool,

    pub visualize_hc_graph: bool,

    ///start and goal closer than this yield an empty plan
    pub xy_goal_tolerance: f64,

    ///keypoint offset from obstacle centroids and the reference clearance for
    ///graph edges and band repulsion
    pub min_obstacle_dist: f64,

    pub no_inner_iterations: u32,
    pub no_outer_iterations: u32,

    pub max_vel_x: f64,
    pub max_vel_theta: f64,

    ///candidates whose closest pose sits nearer than this to an obstacle are
    ///treated as degenerate and discarded
    pub degenerate_obstacle_dist: f64,
}

impl Default for Param {
    fn default() -> Param {
        Param {
            max_number_classes: 5,
            simple_exploration: false,
            obstacle_heading_threshold: 1.1,
            roadmap_graph_no_samples: 15,
            roadmap_graph_area_width: 6.,
            h_signature_prescaler: 1.,
            h_signature_threshold: 0.1,
            enable_multithreading: true,
            visualize_hc_graph: false,
            xy_goal_tolerance: 0.2,
            min_obstacle_dist: 0.5,
            no_inner_iterations: 5,
            no_outer_iterations: 4,
            max_vel_x: 0.4,
            max_vel_theta: 0.3,
            degenerate_obstacle_dist: 0.03,
        }
    }
}

///serde facing obstacle description for scenario files
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ObstacleSpec {
    Point { x: f64, y: f64 },
    Circle { x: f64, y: f64, radius: f64 },
    Line { x0: f64, y0: f64, x1: f64, y1: f64 },
}

impl ObstacleSpec {
    pub fn build( & self ) -> Arc<dyn Obstacle> {
        match *self {
            ObstacleSpec::Point { x, y } => Arc::new( PointObstacle::new( x, y ) ),
            ObstacleSpec::Circle { x, y, radius } => Arc::new( CircleObstacle::new( x, y, radius ) ),
            ObstacleSpec::Line { x0, y0, x1, y1 } => Arc::new( LineObstacle::new( x0, y0, x1, y1 ) ),
        }
    }
}

pub fn build_obstacles( specs: & [ObstacleSpec] ) -> ObstacleContainer {
    specs.iter().map( |s| s.build() ).collect()
}
