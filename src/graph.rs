//! Exploration graph construction and homotopy class enumeration.

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::{Point2, Vector2};
use rand::prelude::*;

use crate::hsignature::compute_h_signature;
use crate::obstacle::ObstacleContainer;
use crate::planner_param::Param;
use crate::pool::CandidatePool;
use crate::pose::{PoseSE2, Velocity2};

#[derive(Debug)]
pub struct Node {

    ///vertex index, stable within a planning cycle
    pub id: usize,

    ///workspace position
    pub pos: Point2<f64>,

    ///out edge targets, kept in insertion order for deterministic enumeration
    pub children: Vec<usize>,
}

///directed waypoint graph between start and goal; vertex 0 is the start and
///the last vertex is the goal, rebuilt from scratch on every cycle
#[derive(Debug, Default)]
pub struct ExplorationGraph {
    pub nodes: Vec<Node>,
}

impl ExplorationGraph {

    pub fn new() -> ExplorationGraph {
        ExplorationGraph { nodes: vec![] }
    }

    pub fn add_vertex( & mut self, pos: Point2<f64> ) -> usize {
        let id = self.nodes.len();
        self.nodes.push( Node { id, pos, children: vec![] } );
        id
    }

    pub fn add_edge( & mut self, from: usize, to: usize ) {
        self.nodes[from].children.push( to );
    }

    pub fn len( & self ) -> usize {
        self.nodes.len()
    }

    pub fn is_empty( & self ) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count( & self ) -> usize {
        self.nodes.iter().map( |n| n.children.len() ).sum()
    }

    ///goal vertex index; meaningless on an empty graph
    pub fn goal_idx( & self ) -> usize {
        self.nodes.len().saturating_sub( 1 )
    }
}

///deterministic keypoint graph: two auxiliary vertices per obstacle, placed
///symmetrically off the centroid along the start-goal normal, force the
///enumeration of left and right routings
pub fn build_simple_graph( start: & PoseSE2,
                           goal: & PoseSE2,
                           obstacles: & ObstacleContainer,
                           param: & Param,
                           limit_obst_heading: bool ) -> ExplorationGraph {

    let mut graph = ExplorationGraph::new();

    let diff: Vector2<f64> = goal.position() - start.position();
    let dist = diff.norm();
    if dist < param.xy_goal_tolerance {
        return graph;
    }

    let dir = diff / dist;
    let normal = Vector2::new( -dir.y, dir.x ) * param.min_obstacle_dist;

    let start_idx = graph.add_vertex( start.position() );

    //keypoints for obstacles ahead of the start; track the obstacle nearest
    //to the start for the optional heading limitation
    let mut nearest: Option<(f64, usize, usize)> = None;
    for obst in obstacles.iter() {
        let c = obst.centroid();
        let to_c = c - start.position();
        if to_c.dot( &dir ) < 0.1 * to_c.norm() {
            //behind or lateral, no routing decision needed
            continue;
        }
        let left = graph.add_vertex( c + normal );
        let right = graph.add_vertex( c - normal );
        let d = to_c.norm();
        match nearest {
            Some(( best, _, _ )) if best <= d => {},
            _ => {
                nearest = Some(( d, left, right ));
            },
        }
    }

    let _goal_idx = graph.add_vertex( goal.position() );

    let limit = if limit_obst_heading { nearest.map( |(_, l, r)| ( l, r ) ) } else { None };
    insert_edges( & mut graph, &dir, start_idx, start, limit, obstacles, param );

    graph
}

///probabilistic roadmap: collision free samples inside a rotated rectangle
///aligned with the start-goal axis; the rejection loop honors a cooperative
///cancellation flag to avoid livelock in over cluttered scenes
pub fn build_roadmap_graph( start: & PoseSE2,
                            goal: & PoseSE2,
                            obstacles: & ObstacleContainer,
                            param: & Param,
                            cancel: & AtomicBool ) -> ExplorationGraph {

    let mut graph = ExplorationGraph::new();

    let diff: Vector2<f64> = goal.position() - start.position();
    let dist = diff.norm();
    if dist < param.xy_goal_tolerance {
        return graph;
    }

    let dir = diff / dist;
    let n_unit = Vector2::new( -dir.y, dir.x );
    let width = param.roadmap_graph_area_width;
    let base = start.position() - n_unit * ( 0.5 * width );

    let start_idx = graph.add_vertex( start.position() );

    let mut rng = SmallRng::from_entropy();

    'sampling: for _ in 0..param.roadmap_graph_no_samples {
        loop {
            if cancel.load( Ordering::Relaxed ) {
                break 'sampling;
            }
            let u: f64 = rng.gen_range( 0., 1. );
            let v: f64 = rng.gen_range( 0., 1. );
            let sample = base + dir * ( u * dist ) + n_unit * ( v * width );
            if !obstacles.iter().any( |o| o.collides( &sample, param.min_obstacle_dist ) ) {
                graph.add_vertex( sample );
                break;
            }
        }
    }

    graph.add_vertex( goal.position() );

    insert_edges( & mut graph, &dir, start_idx, start, None, obstacles, param );

    graph
}

///shared edge insertion: keep edges pointing into the forward cone around the
///start-goal axis and free of obstacle clearance violations
fn insert_edges( graph: & mut ExplorationGraph,
                 dir: & Vector2<f64>,
                 start_idx: usize,
                 start: & PoseSE2,
                 nearest_keypoints: Option<(usize, usize)>,
                 obstacles: & ObstacleContainer,
                 param: & Param ) {

    let goal_idx = graph.goal_idx();
    let cos_thresh = param.obstacle_heading_threshold.cos();
    let clearance = 0.5 * param.min_obstacle_dist;
    let heading = start.orientation_unit_vec();
    let n = graph.len();

    for i in 0..n {
        if i == goal_idx {
            //no edges out of the goal
            continue;
        }
        for j in 0..n {
            if i == j {
                continue;
            }

            let dij = graph.nodes[j].pos - graph.nodes[i].pos;
            let len = dij.norm();
            if len < 1e-9 {
                continue;
            }
            let dij_unit = dij / len;

            if dij_unit.dot( dir ) <= cos_thresh {
                continue;
            }

            if i == start_idx {
                if let Some(( left, right )) = nearest_keypoints {
                    if j == left || j == right {
                        let angle = heading.dot( &dij_unit ).max( -1. ).min( 1. ).acos();
                        if angle > param.obstacle_heading_threshold {
                            continue;
                        }
                    }
                }
            }

            let blocked = obstacles.iter().any( |o| {
                o.intersects_segment( &graph.nodes[i].pos, &graph.nodes[j].pos, clearance )
            });
            if blocked {
                continue;
            }

            graph.add_edge( i, j );
        }
    }
}

///depth first enumeration of simple start-goal paths; each path reaching the
///goal is classified by its homotopy invariant and, if novel, seeds a new
///trajectory candidate in the pool
pub fn depth_first_explore( graph: & ExplorationGraph,
                            pool: & mut CandidatePool,
                            obstacles: & ObstacleContainer,
                            param: & Param,
                            start_theta: f64,
                            goal_theta: f64,
                            start_vel: Option<&Velocity2> ) {

    if graph.len() < 2 {
        return;
    }

    let mut visited = vec![ 0 ];
    descend( graph, & mut visited, pool, obstacles, param, start_theta, goal_theta, start_vel );
}

fn descend( graph: & ExplorationGraph,
            visited: & mut Vec<usize>,
            pool: & mut CandidatePool,
            obstacles: & ObstacleContainer,
            param: & Param,
            start_theta: f64,
            goal_theta: f64,
            start_vel: Option<&Velocity2> ) {

    if pool.len() >= param.max_number_classes {
        return;
    }

    let goal_idx = graph.goal_idx();
    let current = *visited.last().unwrap();

    //first, try to close the path at the goal; a single goal hit per parent
    //is enough to represent a class routed through this node
    for &v in &graph.nodes[current].children {
        if visited.contains( &v ) {
            continue;
        }
        if v == goal_idx {
            visited.push( v );
            let points: Vec<Point2<f64>> = visited.iter().map( |&k| graph.nodes[k].pos ).collect();
            let h = compute_h_signature( points.iter().cloned(), obstacles, param.h_signature_prescaler );
            if pool.register_if_novel( h, param.h_signature_threshold ) {
                pool.add_teb( &points, start_theta, goal_theta, start_vel, param );
            }
            visited.pop();
            break;
        }
    }

    //then descend into the remaining neighbors
    for &v in &graph.nodes[current].children {
        if v == goal_idx || visited.contains( &v ) {
            continue;
        }
        visited.push( v );
        descend( graph, visited, pool, obstacles, param, start_theta, goal_theta, start_vel );
        visited.pop();
        if pool.len() >= param.max_number_classes {
            return;
        }
    }
}
