//! Scenario driven demo binary for the homotopy class planner.

#[macro_use]
extern crate log;

extern crate pretty_env_logger;

use std::fs::File;

use clap::{App, Arg};
use serde::Deserialize;

use homotopy_planning::planner::{LogVisualization, Planner};
use homotopy_planning::planner_hcp::HomotopyClassPlanner;
use homotopy_planning::planner_param::{build_obstacles, ObstacleSpec, Param};
use homotopy_planning::pose::{PoseSE2, Velocity2};

#[derive(Deserialize)]
struct Scenario {
    start: PoseSE2,
    goal: PoseSE2,
    #[serde(default)]
    velocity: Option<Velocity2>,
    #[serde(default)]
    obstacles: Vec<ObstacleSpec>,
    #[serde(default)]
    param: Param,
}

fn main() {

    pretty_env_logger::init();

    let matches = App::new( "planner" )
        .about( "homotopy class trajectory planner demo" )
        .arg( Arg::with_name( "scenario" )
              .short( "s" )
              .long( "scenario" )
              .help( "path to a scenario json file" )
              .takes_value( true )
              .required( true ) )
        .arg( Arg::with_name( "cycles" )
              .short( "c" )
              .long( "cycles" )
              .help( "number of planning cycles to run" )
              .takes_value( true ) )
        .get_matches();

    let path = matches.value_of( "scenario" ).unwrap();
    let cycles: u32 = matches.value_of( "cycles" )
        .map( |x| x.parse().expect( "cycles must be a number" ) )
        .unwrap_or( 5 );

    let file = File::open( path ).expect( "cannot open scenario file" );
    let scenario: Scenario = serde_json::from_reader( file ).expect( "cannot parse scenario file" );

    let mut planner = HomotopyClassPlanner::new();
    planner.initialize( scenario.param.clone(), build_obstacles( &scenario.obstacles ) );
    planner.set_visualization( Box::new( LogVisualization::default() ) );

    for cycle in 0..cycles {
        match planner.plan_se2( &scenario.start, &scenario.goal, scenario.velocity.as_ref() ) {
            Ok(()) => {},
            Err(e) => {
                warn!( "cycle {}: {}", cycle, e );
            },
        }
        planner.visualize();
    }

    info!( "surviving classes: {}", planner.pool().len() );

    match planner.best() {
        Some(teb) => {
            info!( "best trajectory: {} poses, cost {:.3}", teb.teb().poses().len(), teb.cost_sum() );
            for pose in teb.teb().poses() {
                debug!( "  ({:.2}, {:.2}) theta {:.2}", pose.x, pose.y, pose.theta );
            }
        },
        _ => {
            info!( "no feasible trajectory" );
        },
    }

    let cmd = planner.velocity_command();
    info!( "velocity command: linear {:.3} m/s, angular {:.3} rad/s", cmd.linear, cmd.angular );
}
