use serde::{Deserialize, Serialize};


/// A position on a projected (metric) grid, with coordinates in metres.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Point2d {
    pub x_coord: f64,
    pub y_coord: f64,
}

impl Point2d {
    pub fn new(x_coord: f64, y_coord: f64) -> Point2d {
        Point2d{x_coord, y_coord}
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.x_coord, self.y_coord]
    }

    pub fn minus(&self, other: &Point2d) -> Point2d {
        Point2d::new(self.x_coord - other.x_coord, self.y_coord - other.y_coord)
    }

    pub fn euclidean_distance(&self, other: &Point2d) -> f64 {
        let diff = self.minus(other);
        (diff.x_coord.powi(2) + diff.y_coord.powi(2)).sqrt()
    }

    /// Straight-line distance in kilometres.
    pub fn distance_km(&self, other: &Point2d) -> f64 {
        self.euclidean_distance(other) / 1000.
    }
}
