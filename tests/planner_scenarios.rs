//! End to end planning scenarios.

use std::sync::Arc;

use nalgebra::Point2;

use homotopy_planning::hsignature::h_signatures_equal;
use homotopy_planning::obstacle::{CircleObstacle, LineObstacle, Obstacle, ObstacleContainer,
                                  PointObstacle};
use homotopy_planning::planner::{CostmapModel, Planner};
use homotopy_planning::planner_hcp::HomotopyClassPlanner;
use homotopy_planning::planner_param::Param;
use homotopy_planning::pose::PoseSE2;

fn simple_param() -> Param {
    Param {
        simple_exploration: true,
        ..Param::default()
    }
}

fn planner_with( param: Param, obstacles: ObstacleContainer ) -> HomotopyClassPlanner {
    let mut planner = HomotopyClassPlanner::new();
    planner.initialize( param, obstacles );
    planner
}

///costmap stub that reports a collision past a given x coordinate
struct HalfPlaneCostmap {
    x_limit: f64,
}

impl CostmapModel for HalfPlaneCostmap {
    fn footprint_cost( & self, x: f64, _y: f64, _theta: f64,
                       _footprint: & [Point2<f64>],
                       _inscribed_radius: f64, _circumscribed_radius: f64 ) -> f64 {
        if x > self.x_limit { -1. } else { 1. }
    }
}

#[test]
fn straight_corridor_yields_a_single_candidate() {
    let mut planner = planner_with( simple_param(), vec![] );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    planner.plan_se2( &start, &goal, None ).unwrap();

    assert_eq!( planner.pool().len(), 1 );
    assert!( planner.best().is_some() );
    let cmd = planner.velocity_command();
    assert!( cmd.linear > 0.1 );
}

#[test]
fn midpoint_obstacle_yields_two_distinct_classes() {
    let obstacles: ObstacleContainer =
        vec![ Arc::new( CircleObstacle::new( 5., 0., 0.3 ) ) as Arc<dyn Obstacle> ];
    let mut planner = planner_with( simple_param(), obstacles );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    planner.plan_se2( &start, &goal, None ).unwrap();

    assert_eq!( planner.pool().len(), 2 );
    let sigs = planner.pool().h_signatures();
    assert_eq!( sigs.len(), 2 );
    assert!( !h_signatures_equal( &sigs[0], &sigs[1], 0.1 ) );

    //the elected candidate is the cheapest pool member
    let best_cost = planner.best().unwrap().cost_sum();
    assert!( best_cost.is_finite() );
    for teb in planner.pool().tebs() {
        assert!( best_cost <= teb.cost_sum() );
    }
}

#[test]
fn goal_inside_tolerance_produces_an_empty_plan() {
    let mut param = simple_param();
    param.xy_goal_tolerance = 0.1;
    let mut planner = planner_with( param, vec![] );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 0.01, 0., 0. );

    planner.plan_se2( &start, &goal, None ).unwrap();

    assert!( planner.pool().is_empty() );
    assert!( planner.best().is_none() );
    let cmd = planner.velocity_command();
    assert!( cmd.linear.abs() < 1e-12 && cmd.angular.abs() < 1e-12 );
}

#[test]
fn obstacle_behind_the_start_is_ignored() {
    let obstacles: ObstacleContainer =
        vec![ Arc::new( PointObstacle::new( -2., 0. ) ) as Arc<dyn Obstacle> ];
    let mut planner = planner_with( simple_param(), obstacles );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    planner.plan_se2( &start, &goal, None ).unwrap();

    assert_eq!( planner.pool().len(), 1 );
    assert!( planner.best().is_some() );
}

#[test]
fn class_count_cap_bounds_the_pool() {
    let obstacles: ObstacleContainer = ( -2..=2 )
        .map( |k| Arc::new( PointObstacle::new( 5., k as f64 ) ) as Arc<dyn Obstacle> )
        .collect();
    let mut param = simple_param();
    param.max_number_classes = 2;
    let mut planner = planner_with( param, obstacles );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    for _ in 0..3 {
        planner.plan_se2( &start, &goal, None ).unwrap();
        assert!( planner.pool().len() <= 2 );
    }
}

#[test]
fn blocked_corridor_leaves_the_pool_empty() {
    //wall across the whole corridor, no route survives the clearance check
    let obstacles: ObstacleContainer =
        vec![ Arc::new( LineObstacle::new( 5., -3., 5., 3. ) ) as Arc<dyn Obstacle> ];
    let mut planner = planner_with( simple_param(), obstacles );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    planner.plan_se2( &start, &goal, None ).unwrap();

    assert!( planner.pool().is_empty() );
    assert!( planner.best().is_none() );
    let cmd = planner.velocity_command();
    assert!( cmd.linear.abs() < 1e-12 );

    let costmap = HalfPlaneCostmap { x_limit: 100. };
    assert!( !planner.is_trajectory_feasible( &costmap, &[], 0.3, 0.5, 10 ) );
}

#[test]
fn pool_stays_stable_and_deduplicated_across_cycles() {
    let obstacles: ObstacleContainer =
        vec![ Arc::new( CircleObstacle::new( 5., 0., 0.3 ) ) as Arc<dyn Obstacle> ];
    let mut planner = planner_with( simple_param(), obstacles );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    for _ in 0..4 {
        planner.plan_se2( &start, &goal, None ).unwrap();

        //the pool never exceeds the configured class count and no two
        //stored invariants are equivalent
        assert!( planner.pool().len() <= Param::default().max_number_classes );
        let sigs = planner.pool().h_signatures();
        for a in 0..sigs.len() {
            for b in a + 1..sigs.len() {
                assert!( !h_signatures_equal( &sigs[a], &sigs[b],
                                              Param::default().h_signature_threshold ) );
            }
        }
    }

    assert_eq!( planner.pool().len(), 2 );
}

#[test]
fn roadmap_exploration_reaches_the_goal() {
    let obstacles: ObstacleContainer =
        vec![ Arc::new( CircleObstacle::new( 5., 0., 0.3 ) ) as Arc<dyn Obstacle> ];
    let mut param = Param::default();
    param.simple_exploration = false;
    param.roadmap_graph_no_samples = 12;
    let mut planner = planner_with( param.clone(), obstacles );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );

    for _ in 0..3 {
        planner.plan_se2( &start, &goal, None ).unwrap();
        assert!( planner.pool().len() <= param.max_number_classes );
    }

    //a 12 sample roadmap over a single small obstacle finds a route with
    //overwhelming probability
    assert!( !planner.pool().is_empty() );
    assert!( planner.best().is_some() );
    assert!( planner.velocity_command().linear > 0. );
}

#[test]
fn feasibility_follows_the_costmap_verdict() {
    let mut planner = planner_with( simple_param(), vec![] );
    let start = PoseSE2::new( 0., 0., 0. );
    let goal = PoseSE2::new( 10., 0., 0. );
    planner.plan_se2( &start, &goal, None ).unwrap();

    let permissive = HalfPlaneCostmap { x_limit: 100. };
    assert!( planner.is_trajectory_feasible( &permissive, &[], 0.3, 0.5, 5 ) );

    //the look ahead window starts at the robot pose, so a collision right
    //ahead is caught
    let blocking = HalfPlaneCostmap { x_limit: -1. };
    assert!( !planner.is_trajectory_feasible( &blocking, &[], 0.3, 0.5, 5 ) );
}
