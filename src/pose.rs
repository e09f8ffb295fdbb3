//! Planar rigid poses and velocities.

use std::f64::consts::PI;

use nalgebra::{Point2, Vector2};
use serde::Deserialize;

///wrap an angle to (-pi, pi]
pub fn normalize_theta( theta: f64 ) -> f64 {
    let mut t = theta % ( 2. * PI );
    if t <= -PI {
        t += 2. * PI;
    } else if t > PI {
        t -= 2. * PI;
    }
    t
}

///circular mean of two angles, e.g. for the orientation of a pose inserted
///between two band neighbors
pub fn average_angles( a: f64, b: f64 ) -> f64 {
    normalize_theta( a + 0.5 * normalize_theta( b - a ) )
}

///rigid 2d pose, value type
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PoseSE2 {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl PoseSE2 {
    pub fn new( x: f64, y: f64, theta: f64 ) -> PoseSE2 {
        PoseSE2 { x, y, theta: normalize_theta( theta ) }
    }

    pub fn from_position( pos: Point2<f64>, theta: f64 ) -> PoseSE2 {
        PoseSE2::new( pos.x, pos.y, theta )
    }

    pub fn position( & self ) -> Point2<f64> {
        Point2::new( self.x, self.y )
    }

    ///unit vector in the direction of the orientation
    pub fn orientation_unit_vec( & self ) -> Vector2<f64> {
        Vector2::new( self.theta.cos(), self.theta.sin() )
    }

    pub fn distance( & self, other: & PoseSE2 ) -> f64 {
        ( other.position() - self.position() ).norm()
    }
}

///planar twist: linear velocity along the heading, angular velocity about z
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Velocity2 {
    pub linear: f64,
    pub angular: f64,
}
