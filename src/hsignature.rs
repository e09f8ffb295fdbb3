//! Homotopy class invariant for planar paths.
//!
//! Follows the complex analysis construction of Bhattacharya et al.: each
//! obstacle centroid becomes a pole of a rational function and the invariant
//! is the path integral of that function, evaluated segment by segment with
//! the principal branch of the complex logarithm. Two paths between the same
//! endpoints that route around the obstacle set on the same sides accumulate
//! the same winding terms and therefore the same value.

use num_complex::Complex;

use nalgebra::Point2;

use crate::obstacle::ObstacleContainer;

///guards poles coinciding with path vertices or with each other
const DENOM_EPSILON: f64 = 1e-9;

fn perturbed( z: Complex<f64> ) -> Complex<f64> {
    if z.norm() < DENOM_EPSILON {
        Complex::new( DENOM_EPSILON, DENOM_EPSILON )
    } else {
        z
    }
}

///compute the homotopy invariant of a polyline with respect to an obstacle
///set; paths with fewer than two vertices and empty obstacle sets map to zero
pub fn compute_h_signature<I>( points: I, obstacles: & ObstacleContainer, prescaler: f64 ) -> Complex<f64>
    where I: IntoIterator<Item = Point2<f64>>
{
    let z: Vec<Complex<f64>> = points.into_iter()
        .map( |p| Complex::new( p.x, p.y ) * prescaler )
        .collect();

    if z.len() < 2 || obstacles.is_empty() {
        return Complex::new( 0., 0. );
    }

    let poles: Vec<Complex<f64>> = obstacles.iter()
        .map( |o| {
            let c = o.centroid();
            Complex::new( c.x, c.y ) * prescaler
        })
        .collect();

    //frame points derived from the path endpoints; they translate with the
    //workspace and swap under path reversal, which keeps the invariant
    //translation independent and odd under reversal
    let start = z[0];
    let end = z[z.len() - 1];
    let mut delta = end - start;
    if delta.norm() < 1e-3 {
        delta = Complex::new( 1e-3, 0. );
    }
    let normal = delta * Complex::i();
    let frame_a = start - delta - normal;
    let frame_b = end + delta + normal;

    let m = poles.len();
    let balance_pow = ( ( m - 1 ) + 1 ) / 2; //ceil((m-1)/2)

    let mut h = Complex::new( 0., 0. );

    for ( j, pole ) in poles.iter().enumerate() {

        //numerator polynomial keeps the weight magnitude comparable to the
        //inter obstacle products in the denominator
        let f0 = ( ( pole - frame_a ) * ( pole - frame_b ) ).powi( balance_pow as i32 );

        let mut denom = Complex::new( 1., 0. );
        for ( k, other ) in poles.iter().enumerate() {
            if k == j {
                continue;
            }
            denom *= perturbed( pole - other );
        }

        let sign = if j % 2 == 0 { 1. } else { -1. };
        let weight = f0 * sign / denom;

        let mut winding = Complex::new( 0., 0. );
        for seg in z.windows( 2 ) {
            let num = perturbed( seg[1] - pole );
            let den = perturbed( seg[0] - pole );
            winding += ( num / den ).ln();
        }

        h += weight * winding;
    }

    h
}

///componentwise equivalence under a threshold; deliberately pairwise and
///non transitive, callers keep a linear scan over the live signature list
pub fn h_signatures_equal( a: & Complex<f64>, b: & Complex<f64>, threshold: f64 ) -> bool {
    ( a.re - b.re ).abs() <= threshold && ( a.im - b.im ).abs() <= threshold
}

#[cfg(test)]
mod tests {

    use std::sync::Arc;

    use super::*;
    use crate::obstacle::{Obstacle, PointObstacle};

    fn poly( pts: & [(f64, f64)] ) -> Vec<Point2<f64>> {
        pts.iter().map( |&(x, y)| Point2::new( x, y ) ).collect()
    }

    fn obstacles( pts: & [(f64, f64)] ) -> ObstacleContainer {
        pts.iter()
            .map( |&(x, y)| Arc::new( PointObstacle::new( x, y ) ) as Arc<dyn Obstacle> )
            .collect()
    }

    #[test]
    fn degenerate_path_maps_to_zero() {
        let obst = obstacles( &[ ( 5., 0. ) ] );
        let h = compute_h_signature( poly( &[ ( 0., 0. ) ] ), &obst, 1. );
        assert!( h.norm() < 1e-12 );
    }

    #[test]
    fn empty_obstacle_set_maps_to_zero() {
        let h = compute_h_signature( poly( &[ ( 0., 0. ), ( 10., 0. ) ] ), &vec![], 1. );
        assert!( h.norm() < 1e-12 );
    }

    #[test]
    fn same_side_routes_are_equivalent() {
        let obst = obstacles( &[ ( 5., 0. ) ] );
        let above_a = compute_h_signature( poly( &[ ( 0., 0. ), ( 5., 3. ), ( 10., 0. ) ] ), &obst, 1. );
        let above_b = compute_h_signature(
            poly( &[ ( 0., 0. ), ( 2., 2. ), ( 5., 2.5 ), ( 8., 2. ), ( 10., 0. ) ] ), &obst, 1. );
        assert!( h_signatures_equal( &above_a, &above_b, 1e-6 ) );
    }

    #[test]
    fn opposite_side_routes_are_distinguished() {
        let obst = obstacles( &[ ( 5., 0. ) ] );
        let above = compute_h_signature( poly( &[ ( 0., 0. ), ( 5., 3. ), ( 10., 0. ) ] ), &obst, 1. );
        let below = compute_h_signature( poly( &[ ( 0., 0. ), ( 5., -3. ), ( 10., 0. ) ] ), &obst, 1. );
        assert!( !h_signatures_equal( &above, &below, 0.1 ) );
    }

    #[test]
    fn invariant_under_uniform_translation() {
        let shift = ( 13.7, -4.2 );
        let obst_a = obstacles( &[ ( 3., 1. ), ( 7., -1. ) ] );
        let obst_b = obstacles( &[ ( 3. + shift.0, 1. + shift.1 ), ( 7. + shift.0, -1. + shift.1 ) ] );
        let path_a = poly( &[ ( 0., 0. ), ( 4., 3. ), ( 10., 0. ) ] );
        let path_b: Vec<Point2<f64>> = path_a.iter()
            .map( |p| Point2::new( p.x + shift.0, p.y + shift.1 ) )
            .collect();
        let ha = compute_h_signature( path_a, &obst_a, 1. );
        let hb = compute_h_signature( path_b, &obst_b, 1. );
        assert!( h_signatures_equal( &ha, &hb, 1e-6 ) );
    }

    #[test]
    fn reversal_negates_the_invariant() {
        for count in &[ 1usize, 2, 3 ] {
            let centers: Vec<(f64, f64)> = ( 0..*count )
                .map( |k| ( 3. + 2. * k as f64, ( k as f64 - 1. ) * 0.8 ) )
                .collect();
            let obst = obstacles( &centers );
            let fwd = poly( &[ ( 0., 0. ), ( 4., 3. ), ( 8., -2. ), ( 10., 0. ) ] );
            let mut rev = fwd.clone();
            rev.reverse();
            let hf = compute_h_signature( fwd, &obst, 1. );
            let hr = compute_h_signature( rev, &obst, 1. );
            let neg = Complex::new( -hf.re, -hf.im );
            assert!( h_signatures_equal( &hr, &neg, 1e-6 ), "obstacle count {}", count );
        }
    }

    #[test]
    fn two_obstacles_separate_four_classes() {
        let obst = obstacles( &[ ( 3., 0. ), ( 7., 0. ) ] );
        let hh = compute_h_signature( poly( &[ ( 0., 0. ), ( 3., 2. ), ( 7., 2. ), ( 10., 0. ) ] ), &obst, 1. );
        let ll = compute_h_signature( poly( &[ ( 0., 0. ), ( 3., -2. ), ( 7., -2. ), ( 10., 0. ) ] ), &obst, 1. );
        let hl = compute_h_signature( poly( &[ ( 0., 0. ), ( 3., 2. ), ( 5., 0. ), ( 7., -2. ), ( 10., 0. ) ] ), &obst, 1. );
        assert!( !h_signatures_equal( &hh, &ll, 0.1 ) );
        assert!( !h_signatures_equal( &hh, &hl, 0.1 ) );
        assert!( !h_signatures_equal( &ll, &hl, 0.1 ) );
    }

    #[test]
    fn pole_on_path_vertex_stays_finite() {
        let obst = obstacles( &[ ( 5., 0. ) ] );
        let h = compute_h_signature( poly( &[ ( 0., 0. ), ( 5., 0. ), ( 10., 0. ) ] ), &obst, 1. );
        assert!( h.re.is_finite() && h.im.is_finite() );
    }

    #[test]
    fn equivalence_is_pairwise_not_transitive() {
        let a = Complex::new( 0., 0. );
        let b = Complex::new( 0.09, 0. );
        let c = Complex::new( 0.15, 0. );
        assert!( h_signatures_equal( &a, &b, 0.1 ) );
        assert!( h_signatures_equal( &b, &c, 0.1 ) );
        assert!( !h_signatures_equal( &a, &c, 0.1 ) );
    }
}
