//! Workspace obstacle primitives.

use std::sync::Arc;

use nalgebra::Point2;

///obstacles are read only for the duration of a planning cycle and shared
///across optimizer workers
pub type ObstacleContainer = Vec<Arc<dyn Obstacle>>;

pub trait Obstacle: Send + Sync {
    fn centroid( & self ) -> Point2<f64>;

    ///distance from a point to the obstacle border, negative inside
    fn min_distance_to( & self, p: & Point2<f64> ) -> f64;

    fn collides( & self, p: & Point2<f64>, min_dist: f64 ) -> bool {
        self.min_distance_to( p ) < min_dist
    }

    ///true if the segment a-b passes within min_dist of the obstacle,
    ///measured from the centroid for the purpose of routing
    fn intersects_segment( & self, a: & Point2<f64>, b: & Point2<f64>, min_dist: f64 ) -> bool;
}

///minimum distance between a point and the segment a-b
pub fn point_segment_distance( p: & Point2<f64>, a: & Point2<f64>, b: & Point2<f64> ) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-12 {
        return ( p - a ).norm();
    }
    let t = ( ( p - a ).dot( &ab ) / len_sq ).max( 0. ).min( 1. );
    ( p - ( a + ab * t ) ).norm()
}

///minimum distance between two segments
pub fn segment_segment_distance( a0: & Point2<f64>, a1: & Point2<f64>,
                                 b0: & Point2<f64>, b1: & Point2<f64> ) -> f64 {
    fn orient( a: & Point2<f64>, b: & Point2<f64>, c: & Point2<f64> ) -> f64 {
        ( b.x - a.x ) * ( c.y - a.y ) - ( b.y - a.y ) * ( c.x - a.x )
    }

    let d1 = orient( a0, a1, b0 );
    let d2 = orient( a0, a1, b1 );
    let d3 = orient( b0, b1, a0 );
    let d4 = orient( b0, b1, a1 );

    if ( ( d1 > 0. && d2 < 0. ) || ( d1 < 0. && d2 > 0. ) ) &&
        ( ( d3 > 0. && d4 < 0. ) || ( d3 < 0. && d4 > 0. ) ) {
        return 0.;
    }

    point_segment_distance( b0, a0, a1 )
        .min( point_segment_distance( b1, a0, a1 ) )
        .min( point_segment_distance( a0, b0, b1 ) )
        .min( point_segment_distance( a1, b0, b1 ) )
}

///dimensionless obstacle located at a single workspace point
#[derive(Clone, Copy, Debug)]
pub struct PointObstacle {
    pub pos: Point2<f64>,
}

impl PointObstacle {
    pub fn new( x: f64, y: f64 ) -> PointObstacle {
        PointObstacle { pos: Point2::new( x, y ) }
    }
}

impl Obstacle for PointObstacle {
    fn centroid( & self ) -> Point2<f64> {
        self.pos
    }

    fn min_distance_to( & self, p: & Point2<f64> ) -> f64 {
        ( p - self.pos ).norm()
    }

    fn intersects_segment( & self, a: & Point2<f64>, b: & Point2<f64>, min_dist: f64 ) -> bool {
        point_segment_distance( &self.pos, a, b ) < min_dist
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CircleObstacle {
    pub center: Point2<f64>,
    pub radius: f64,
}

impl CircleObstacle {
    pub fn new( x: f64, y: f64, radius: f64 ) -> CircleObstacle {
        CircleObstacle { center: Point2::new( x, y ), radius }
    }
}

impl Obstacle for CircleObstacle {
    fn centroid( & self ) -> Point2<f64> {
        self.center
    }

    fn min_distance_to( & self, p: & Point2<f64> ) -> f64 {
        ( p - self.center ).norm() - self.radius
    }

    fn intersects_segment( & self, a: & Point2<f64>, b: & Point2<f64>, min_dist: f64 ) -> bool {
        //clearance for routing is measured against the centroid, inflated to
        //at least the body radius
        point_segment_distance( &self.center, a, b ) < min_dist.max( self.radius )
    }
}

///segment shaped obstacle, e.g. a wall section
#[derive(Clone, Copy, Debug)]
pub struct LineObstacle {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl LineObstacle {
    pub fn new( x0: f64, y0: f64, x1: f64, y1: f64 ) -> LineObstacle {
        LineObstacle { start: Point2::new( x0, y0 ), end: Point2::new( x1, y1 ) }
    }
}

impl Obstacle for LineObstacle {
    fn centroid( & self ) -> Point2<f64> {
        Point2::new( ( self.start.x + self.end.x ) * 0.5,
                     ( self.start.y + self.end.y ) * 0.5 )
    }

    fn min_distance_to( & self, p: & Point2<f64> ) -> f64 {
        point_segment_distance( p, &self.start, &self.end )
    }

    fn intersects_segment( & self, a: & Point2<f64>, b: & Point2<f64>, min_dist: f64 ) -> bool {
        segment_segment_distance( &self.start, &self.end, a, b ) < min_dist
    }
}
