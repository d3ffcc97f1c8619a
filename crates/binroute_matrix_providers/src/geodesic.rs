use geo::{Distance, Haversine};

use crate::cost_matrix::{Cost, CostMatrix};

/// Great-circle distance in meters between two points (x = longitude, y = latitude).
///
/// The points are ordered before computing so that `a -> b` and `b -> a`
/// produce bit-identical results.
pub fn haversine_meters(from: geo_types::Point, to: geo_types::Point) -> f64 {
    let (a, b) = if (from.y(), from.x()) <= (to.y(), to.x()) {
        (from, to)
    } else {
        (to, from)
    };

    Haversine.distance(a, b)
}

/// Integer cost in whole meters, truncated.
pub fn geodesic_cost(from: geo_types::Point, to: geo_types::Point) -> Cost {
    if from == to {
        return 0;
    }

    haversine_meters(from, to) as Cost
}

pub fn geodesic_matrix<P>(points: &[P]) -> CostMatrix
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    let points: Vec<geo_types::Point> = points
        .iter()
        .map(|point| {
            let point: geo_types::Point = point.into();
            point
        })
        .collect();

    geodesic_points_matrix(&points)
}

pub fn geodesic_points_matrix(points: &[geo_types::Point]) -> CostMatrix {
    let num_points = points.len();
    let mut costs: Vec<Cost> = vec![0; num_points * num_points];

    for i in 0..num_points {
        for j in (i + 1)..num_points {
            let cost = geodesic_cost(points[i], points[j]);
            costs[i * num_points + j] = cost;
            costs[j * num_points + i] = cost;
        }
    }

    CostMatrix::from_flat(costs, num_points)
}
