use chrono::{DateTime, Utc};

pub struct Timer {
    t0: DateTime<Utc>,
}

impl Default for Timer {
    fn default() -> Timer {
        Timer { t0: Utc::now() }
    }
}

impl Timer {
    ///elapsed wall clock time in milliseconds since construction
    pub fn dur_ms( & mut self ) -> f64 {
        let t1 = Utc::now();
        match t1.signed_duration_since( self.t0 ).num_microseconds() {
            Some(us) => us as f64 / 1000.,
            _ => 0.,
        }
    }
}
