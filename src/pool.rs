//! Candidate pool: one live elastic band per homotopy class.

use num_complex::Complex;

use nalgebra::Point2;

use crate::hsignature::{compute_h_signature, h_signatures_equal};
use crate::obstacle::ObstacleContainer;
use crate::planner_param::Param;
use crate::pose::{PoseSE2, Velocity2};
use crate::teb::TebOptimalPlanner;

///fixed equivalence threshold for merging candidates that converged into the
///same class during optimization; intentionally distinct from the configured
///long term threshold
const INTERNAL_DEDUP_THRESHOLD: f64 = 0.1;

///ordered collection of trajectory candidates with their class invariants;
///the best selection is an index into the pool, never a second owner
#[derive(Default)]
pub struct CandidatePool {
    tebs: Vec<TebOptimalPlanner>,
    h_signatures: Vec<Complex<f64>>,
    best_idx: Option<usize>,
}

impl CandidatePool {

    pub fn new() -> CandidatePool {
        CandidatePool {
            tebs: vec![],
            h_signatures: vec![],
            best_idx: None,
        }
    }

    pub fn len( & self ) -> usize {
        self.tebs.len()
    }

    pub fn is_empty( & self ) -> bool {
        self.tebs.is_empty()
    }

    pub fn tebs( & self ) -> & [TebOptimalPlanner] {
        self.tebs.as_ref()
    }

    pub fn tebs_mut( & mut self ) -> & mut [TebOptimalPlanner] {
        self.tebs.as_mut()
    }

    pub fn h_signatures( & self ) -> & [Complex<f64>] {
        self.h_signatures.as_ref()
    }

    pub fn clear( & mut self ) {
        self.tebs.clear();
        self.h_signatures.clear();
        self.best_idx = None;
    }

    ///append the signature if no stored one is equivalent under the
    ///threshold; first match wins, the scan stays linear because the
    ///equivalence is not transitive
    pub fn register_if_novel( & mut self, h: Complex<f64>, threshold: f64 ) -> bool {
        for known in &self.h_signatures {
            if h_signatures_equal( known, &h, threshold ) {
                return false;
            }
        }
        self.h_signatures.push( h );
        true
    }

    ///seed a new candidate from an exploration graph path, capped at the
    ///configured class count
    pub fn add_teb( & mut self,
                    points: & [Point2<f64>],
                    theta_start: f64,
                    theta_goal: f64,
                    start_vel: Option<&Velocity2>,
                    param: & Param ) -> bool {
        if self.tebs.len() >= param.max_number_classes || points.len() < 2 {
            return false;
        }
        let mut teb = TebOptimalPlanner::new_from_polyline( points, theta_start, theta_goal, param );
        if let Some(v) = start_vel {
            teb.set_start_velocity( *v );
        }
        self.tebs.push( teb );
        true
    }

    ///re-anchor every candidate on the new boundary conditions
    pub fn update_all( & mut self,
                       start: Option<&PoseSE2>,
                       goal: Option<&PoseSE2>,
                       start_vel: Option<&Velocity2> ) {
        for teb in & mut self.tebs {
            teb.update_and_prune( start, goal );
            if let Some(v) = start_vel {
                teb.set_start_velocity( *v );
            }
        }
    }

    ///start-of-cycle maintenance: drop detouring and degenerate candidates,
    ///reclassify the survivors, merge equivalent classes keeping the cheaper
    ///candidate, then rebuild the signature list from scratch so obstacle
    ///motion can legitimately reassign classes
    pub fn renew_and_analyze( & mut self,
                              obstacles: & ObstacleContainer,
                              param: & Param,
                              delete_detours: bool ) {

        self.h_signatures.clear();
        self.best_idx = None;

        let cos_thresh = param.obstacle_heading_threshold.cos();

        let mut i = 0;
        while i < self.tebs.len() {
            if delete_detours && self.tebs.len() > 1
                && self.tebs[i].teb().detect_detours_backwards( cos_thresh ) {
                self.tebs.remove( i );
                continue;
            }
            if is_degenerate( &self.tebs[i], obstacles, param.degenerate_obstacle_dist ) {
                debug!( "dropping degenerate candidate touching an obstacle" );
                self.tebs.remove( i );
                continue;
            }
            i += 1;
        }

        //classify before deduplicating, so cost comparisons reflect the
        //optimization state carried over from the previous cycle
        let sigs: Vec<Complex<f64>> = self.tebs.iter()
            .map( |t| {
                compute_h_signature( t.teb().poses().iter().map( |p| p.position() ),
                                     obstacles,
                                     param.h_signature_prescaler )
            })
            .collect();

        let n = self.tebs.len();
        let mut removed = vec![ false; n ];
        for a in 0..n {
            if removed[a] {
                continue;
            }
            for b in 0..n {
                if a == b || removed[b] {
                    continue;
                }
                if h_signatures_equal( &sigs[a], &sigs[b], INTERNAL_DEDUP_THRESHOLD ) {
                    if self.tebs[a].cost_sum() > self.tebs[b].cost_sum() {
                        removed[a] = true;
                        break;
                    } else {
                        removed[b] = true;
                    }
                }
            }
        }

        let old = std::mem::replace( & mut self.tebs, vec![] );
        for ( k, teb ) in old.into_iter().enumerate() {
            if removed[k] {
                continue;
            }
            if self.register_if_novel( sigs[k], param.h_signature_threshold ) {
                self.tebs.push( teb );
            } else {
                //cannot happen after the pairwise merge above
                warn!( "class already registered after deduplication, dropping candidate" );
            }
        }
    }

    ///argmin of the summed cost over the pool
    pub fn select_best( & mut self ) -> Option<&TebOptimalPlanner> {
        self.best_idx = None;
        let mut best_cost = std::f64::INFINITY;
        for ( i, teb ) in self.tebs.iter().enumerate() {
            let c = teb.cost_sum();
            if c < best_cost {
                best_cost = c;
                self.best_idx = Some( i );
            }
        }
        self.best()
    }

    pub fn best( & self ) -> Option<&TebOptimalPlanner> {
        match self.best_idx {
            Some(i) => self.tebs.get( i ),
            _ => None,
        }
    }

    ///drop every detouring candidate as long as at least one other remains;
    ///re-elects the best afterwards since pool indices shift
    pub fn prune_detours( & mut self, threshold: f64 ) {
        let mut removed_any = false;
        let mut i = 0;
        while i < self.tebs.len() {
            if self.tebs.len() <= 1 {
                break;
            }
            if self.tebs[i].teb().detect_detours_backwards( threshold ) {
                self.tebs.remove( i );
                removed_any = true;
            } else {
                i += 1;
            }
        }
        if removed_any && self.best_idx.is_some() {
            self.select_best();
        }
    }
}

///a candidate is degenerate when its closest pose to some obstacle nearly
///touches it; the optimizer cannot recover such a band
fn is_degenerate( teb: & TebOptimalPlanner,
                  obstacles: & ObstacleContainer,
                  degenerate_dist: f64 ) -> bool {
    for o in obstacles.iter() {
        let idx = teb.teb().closest_pose_idx( &o.centroid() );
        match teb.teb().poses().get( idx ) {
            Some(pose) => {
                if o.min_distance_to( &pose.position() ) < degenerate_dist {
                    return true;
                }
            },
            _ => {},
        }
    }
    false
}
