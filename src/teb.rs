//! Timed elastic band trajectory candidates.
//!
//! A band is a discrete time parameterized trajectory anchored at the current
//! start and goal poses. The optimizer deforms the interior poses under
//! neighbor smoothing and obstacle repulsion, bounded by a fixed iteration
//! budget per cycle.

use nalgebra::{Point2, Vector2};

use crate::error::PlanError;
use crate::obstacle::ObstacleContainer;
use crate::planner_param::Param;
use crate::pose::{average_angles, normalize_theta, PoseSE2, Velocity2};

///spatial resolution of a freshly seeded band
const INIT_SAMPLE_STEP: f64 = 0.5;

///band size ceiling for the auto resize pass
const MAX_POSES: usize = 200;

const MIN_TIMEDIFF: f64 = 0.01;

const SMOOTH_GAIN: f64 = 0.4;
const REPULSION_GAIN: f64 = 0.5;
const MAX_SHIFT: f64 = 0.2;

const OBSTACLE_COST_WEIGHT: f64 = 10.;

#[derive(Clone, Debug)]
pub struct TimedElasticBand {
    poses: Vec<PoseSE2>,
    time_diffs: Vec<f64>,
}

impl TimedElasticBand {

    ///seed a band along a polyline; interior orientations follow the segment
    ///directions, the boundary orientations are fixed by the caller
    pub fn init_from_polyline( points: & [Point2<f64>],
                               theta_start: f64,
                               theta_goal: f64,
                               max_vel: f64 ) -> TimedElasticBand {

        let mut positions: Vec<Point2<f64>> = vec![];
        for seg in points.windows( 2 ) {
            let d = seg[1] - seg[0];
            let len = d.norm();
            let subdiv = ( len / INIT_SAMPLE_STEP ).ceil().max( 1. ) as usize;
            for k in 0..subdiv {
                positions.push( seg[0] + d * ( k as f64 / subdiv as f64 ) );
            }
        }
        if let Some(last) = points.last() {
            positions.push( *last );
        }

        let n = positions.len();
        let mut poses: Vec<PoseSE2> = Vec::with_capacity( n );
        for ( i, p ) in positions.iter().enumerate() {
            let theta = if i == 0 {
                theta_start
            } else if i + 1 == n {
                theta_goal
            } else {
                let d = positions[i + 1] - positions[i - 1];
                d.y.atan2( d.x )
            };
            poses.push( PoseSE2::from_position( *p, theta ) );
        }

        let mut band = TimedElasticBand { poses, time_diffs: vec![] };
        band.recompute_timediffs( max_vel, max_vel );
        band
    }

    pub fn poses( & self ) -> & [PoseSE2] {
        self.poses.as_ref()
    }

    pub fn time_diffs( & self ) -> & [f64] {
        self.time_diffs.as_ref()
    }

    pub fn path_length( & self ) -> f64 {
        self.poses.windows( 2 ).map( |w| w[0].distance( &w[1] ) ).sum()
    }

    pub fn sum_time( & self ) -> f64 {
        self.time_diffs.iter().sum()
    }

    ///index of the pose closest to a workspace point
    pub fn closest_pose_idx( & self, p: & Point2<f64> ) -> usize {
        let mut best = 0;
        let mut best_d = std::f64::INFINITY;
        for ( i, pose ) in self.poses.iter().enumerate() {
            let d = ( pose.position() - p ).norm_squared();
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best
    }

    ///re-anchor the band on new boundary conditions, discarding poses the
    ///robot has already passed
    pub fn update_and_prune( & mut self, start: Option<&PoseSE2>, goal: Option<&PoseSE2> ) {
        if let Some(s) = start {
            if !self.poses.is_empty() {
                let nearest = self.closest_pose_idx( &s.position() );
                if nearest > 0 {
                    self.poses.drain( 0..nearest );
                    self.time_diffs.drain( 0..nearest.min( self.time_diffs.len() ) );
                }
                self.poses[0] = *s;
            }
        }
        if let Some(g) = goal {
            if let Some(last) = self.poses.last_mut() {
                *last = *g;
            }
        }
    }

    ///true if any pose orientation opposes the start-goal direction beyond
    ///the cosine threshold
    pub fn detect_detours_backwards( & self, cos_threshold: f64 ) -> bool {
        if self.poses.len() < 2 {
            return false;
        }
        let d = self.poses[self.poses.len() - 1].position() - self.poses[0].position();
        let len = d.norm();
        if len < 1e-9 {
            return false;
        }
        let dir = d / len;
        self.poses.iter().any( |p| p.orientation_unit_vec().dot( &dir ) < cos_threshold )
    }

    ///split overly long segments and merge vanishing ones
    pub fn auto_resize( & mut self, ref_step: f64 ) {
        let mut i = 0;
        while i + 1 < self.poses.len() {
            let d = self.poses[i].distance( &self.poses[i + 1] );
            if d > 2. * ref_step && self.poses.len() < MAX_POSES {
                let a = self.poses[i].position();
                let b = self.poses[i + 1].position();
                let mid = a + ( b - a ) * 0.5;
                let theta = average_angles( self.poses[i].theta, self.poses[i + 1].theta );
                self.poses.insert( i + 1, PoseSE2::from_position( mid, theta ) );
                let dt = self.time_diffs[i];
                self.time_diffs[i] = dt * 0.5;
                self.time_diffs.insert( i + 1, dt * 0.5 );
                //re-examine the shortened segment
            } else if d < 0.25 * ref_step && self.poses.len() > 2 && i + 2 < self.poses.len() {
                self.poses.remove( i + 1 );
                let dt = self.time_diffs.remove( i + 1 );
                self.time_diffs[i] += dt;
            } else {
                i += 1;
            }
        }
    }

    ///interior orientations follow the local band direction, boundary
    ///orientations stay pinned
    pub fn recompute_orientations( & mut self ) {
        let n = self.poses.len();
        if n < 3 {
            return;
        }
        for i in 1..n - 1 {
            let d = self.poses[i + 1].position() - self.poses[i - 1].position();
            if d.norm() > 1e-9 {
                let theta = d.y.atan2( d.x );
                let p = self.poses[i].position();
                self.poses[i] = PoseSE2::from_position( p, theta );
            }
        }
    }

    pub fn recompute_timediffs( & mut self, max_vel: f64, max_vel_theta: f64 ) {
        self.time_diffs = self.poses.windows( 2 )
            .map( |w| {
                let t_lin = w[0].distance( &w[1] ) / max_vel.max( 1e-6 );
                let t_rot = normalize_theta( w[1].theta - w[0].theta ).abs() / max_vel_theta.max( 1e-6 );
                t_lin.max( t_rot ).max( MIN_TIMEDIFF )
            })
            .collect();
    }

    pub fn is_finite( & self ) -> bool {
        self.poses.iter().all( |p| p.x.is_finite() && p.y.is_finite() && p.theta.is_finite() )
    }

    fn poses_mut( & mut self ) -> & mut Vec<PoseSE2> {
        & mut self.poses
    }
}

///one trajectory candidate: an elastic band plus its cached cost vector
#[derive(Clone, Debug)]
pub struct TebOptimalPlanner {
    band: TimedElasticBand,
    start_vel: Option<Velocity2>,
    cost: Vec<f64>,
    failed: bool,
}

impl TebOptimalPlanner {

    pub fn new_from_polyline( points: & [Point2<f64>],
                              theta_start: f64,
                              theta_goal: f64,
                              param: & Param ) -> TebOptimalPlanner {
        TebOptimalPlanner {
            band: TimedElasticBand::init_from_polyline( points, theta_start, theta_goal, param.max_vel_x ),
            start_vel: None,
            cost: vec![],
            failed: false,
        }
    }

    pub fn teb( & self ) -> & TimedElasticBand {
        & self.band
    }

    pub fn set_start_velocity( & mut self, v: Velocity2 ) {
        self.start_vel = Some( v );
    }

    pub fn update_and_prune( & mut self, start: Option<&PoseSE2>, goal: Option<&PoseSE2> ) {
        self.band.update_and_prune( start, goal );
    }

    ///deform the band for a bounded number of iterations; a degenerate or
    ///diverged band marks the candidate unusable
    pub fn optimize( & mut self,
                     inner_iterations: u32,
                     outer_iterations: u32,
                     compute_cost: bool,
                     obstacles: & ObstacleContainer,
                     param: & Param ) -> Result<(), PlanError> {

        if self.band.poses().len() < 2 {
            self.failed = true;
            return Err( PlanError::OptimizerFailure( "band has fewer than two poses".to_string() ) );
        }

        for _ in 0..outer_iterations {
            self.band.auto_resize( INIT_SAMPLE_STEP );
            for _ in 0..inner_iterations {
                self.relax_once( obstacles, param );
            }
        }

        self.band.recompute_orientations();
        self.band.recompute_timediffs( param.max_vel_x, param.max_vel_theta );

        //seed the first transition time from the velocity the robot already
        //carries, so the command derived from the band stays continuous
        if let Some(v) = self.start_vel {
            if v.linear.abs() > 0.05 && !self.band.time_diffs.is_empty() {
                let d = self.band.poses[0].distance( &self.band.poses[1] );
                self.band.time_diffs[0] = ( d / v.linear.abs() ).max( MIN_TIMEDIFF );
            }
        }

        if !self.band.is_finite() {
            self.failed = true;
            return Err( PlanError::OptimizerFailure( "band diverged to non finite poses".to_string() ) );
        }

        self.failed = false;
        if compute_cost {
            self.cost = self.compute_cost( obstacles, param );
        }
        Ok(())
    }

    fn relax_once( & mut self, obstacles: & ObstacleContainer, param: & Param ) {
        let inflation = 2. * param.min_obstacle_dist;
        let n = self.band.poses().len();
        if n < 3 {
            return;
        }

        let mut shifted: Vec<Point2<f64>> = Vec::with_capacity( n - 2 );
        for i in 1..n - 1 {
            let prev = self.band.poses[i - 1].position();
            let cur = self.band.poses[i].position();
            let next = self.band.poses[i + 1].position();

            let midpoint = prev + ( next - prev ) * 0.5;
            let mut shift: Vector2<f64> = ( midpoint - cur ) * SMOOTH_GAIN;

            for o in obstacles.iter() {
                let d = o.min_distance_to( &cur );
                if d < inflation {
                    let away = cur - o.centroid();
                    let len = away.norm();
                    if len > 1e-9 {
                        shift += away / len * ( ( inflation - d ) * REPULSION_GAIN );
                    }
                }
            }

            let mag = shift.norm();
            if mag > MAX_SHIFT {
                shift *= MAX_SHIFT / mag;
            }
            shifted.push( cur + shift );
        }

        let poses = self.band.poses_mut();
        for ( k, p ) in shifted.into_iter().enumerate() {
            let theta = poses[k + 1].theta;
            poses[k + 1] = PoseSE2::from_position( p, theta );
        }
    }

    fn compute_cost( & self, obstacles: & ObstacleContainer, param: & Param ) -> Vec<f64> {
        let length = self.band.path_length();
        let time = self.band.sum_time();
        let mut obstacle_penalty = 0.;
        for pose in self.band.poses() {
            for o in obstacles.iter() {
                let d = o.min_distance_to( &pose.position() );
                if d < param.min_obstacle_dist {
                    obstacle_penalty += ( param.min_obstacle_dist - d ) * OBSTACLE_COST_WEIGHT;
                }
            }
        }
        vec![ length, time, obstacle_penalty ]
    }

    pub fn current_cost( & self ) -> & [f64] {
        self.cost.as_ref()
    }

    ///summed cost; candidates that never optimized or failed are infinitely
    ///expensive and lose every comparison
    pub fn cost_sum( & self ) -> f64 {
        if self.failed || self.cost.is_empty() {
            return std::f64::INFINITY;
        }
        self.cost.iter().sum()
    }

    ///first control action of the band
    pub fn velocity_command( & self ) -> Velocity2 {
        let poses = self.band.poses();
        if poses.len() < 2 || self.band.time_diffs().is_empty() {
            return Velocity2::default();
        }
        let dt = self.band.time_diffs()[0].max( MIN_TIMEDIFF );
        let d = poses[1].position() - poses[0].position();
        let heading = poses[0].orientation_unit_vec();
        Velocity2 {
            linear: d.dot( &heading ) / dt,
            angular: normalize_theta( poses[1].theta - poses[0].theta ) / dt,
        }
    }
}

#[cfg(test)]
mod tests {

    use std::f64::consts::PI;
    use std::sync::Arc;

    use super::*;
    use crate::obstacle::{Obstacle, PointObstacle};

    fn straight_band() -> TimedElasticBand {
        let points = vec![ Point2::new( 0., 0. ), Point2::new( 10., 0. ) ];
        TimedElasticBand::init_from_polyline( &points, 0., 0., 0.4 )
    }

    #[test]
    fn polyline_seed_densifies_and_pins_boundaries() {
        let band = straight_band();
        assert!( band.poses().len() > 10 );
        assert!( ( band.poses()[0].x ).abs() < 1e-9 );
        assert!( ( band.poses().last().unwrap().x - 10. ).abs() < 1e-9 );
        assert_eq!( band.time_diffs().len(), band.poses().len() - 1 );
        assert!( band.sum_time() > 0. );
    }

    #[test]
    fn update_and_prune_drops_passed_poses() {
        let mut band = straight_band();
        let before = band.poses().len();
        let new_start = PoseSE2::new( 2.1, 0., 0. );
        band.update_and_prune( Some( &new_start ), Some( &PoseSE2::new( 10., 0., 0. ) ) );
        assert!( band.poses().len() < before );
        assert!( ( band.poses()[0].x - 2.1 ).abs() < 1e-9 );
        assert!( ( band.poses().last().unwrap().x - 10. ).abs() < 1e-9 );
        assert_eq!( band.time_diffs().len(), band.poses().len() - 1 );
    }

    #[test]
    fn backwards_orientation_is_a_detour() {
        let points = vec![ Point2::new( 0., 0. ), Point2::new( 10., 0. ) ];
        let band = TimedElasticBand::init_from_polyline( &points, PI, 0., 0.4 );
        assert!( band.detect_detours_backwards( 0. ) );

        let forward = straight_band();
        assert!( !forward.detect_detours_backwards( 0. ) );
    }

    #[test]
    fn closest_pose_idx_finds_the_nearest_sample() {
        let band = straight_band();
        let idx = band.closest_pose_idx( &Point2::new( 5.2, 1. ) );
        assert!( ( band.poses()[idx].x - 5.2 ).abs() < INIT_SAMPLE_STEP );
    }

    #[test]
    fn optimization_pushes_the_band_off_an_obstacle() {
        let obstacles: ObstacleContainer =
            vec![ Arc::new( PointObstacle::new( 5., 0. ) ) as Arc<dyn Obstacle> ];
        let param = Param::default();
        let points = vec![ Point2::new( 0., 0. ), Point2::new( 5., 0.4 ), Point2::new( 10., 0. ) ];
        let mut teb = TebOptimalPlanner::new_from_polyline( &points, 0., 0., &param );

        teb.optimize( 5, 4, true, &obstacles, &param ).unwrap();

        let idx = teb.teb().closest_pose_idx( &Point2::new( 5., 0. ) );
        let clearance = ( teb.teb().poses()[idx].position() - Point2::new( 5., 0. ) ).norm();
        assert!( clearance > 0.4 );
        assert_eq!( teb.current_cost().len(), 3 );
        assert!( teb.cost_sum().is_finite() );
    }

    #[test]
    fn degenerate_band_reports_optimizer_failure() {
        let param = Param::default();
        let mut teb = TebOptimalPlanner::new_from_polyline(
            &[ Point2::new( 0., 0. ) ], 0., 0., &param );
        assert!( teb.optimize( 5, 4, true, &vec![], &param ).is_err() );
        assert!( teb.cost_sum().is_infinite() );
    }

    #[test]
    fn velocity_command_moves_toward_the_next_pose() {
        let param = Param::default();
        let points = vec![ Point2::new( 0., 0. ), Point2::new( 10., 0. ) ];
        let mut teb = TebOptimalPlanner::new_from_polyline( &points, 0., 0., &param );
        teb.optimize( 5, 4, true, &vec![], &param ).unwrap();
        let cmd = teb.velocity_command();
        assert!( cmd.linear > 0. );
        assert!( cmd.angular.abs() < 0.5 );
    }
}
