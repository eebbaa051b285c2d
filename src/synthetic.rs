use itertools::iproduct;
use rand::Rng;

use super::od_matrix::{FreightKey, FreightMatrix, ZoneMatrix};
use super::road_network::{AreaRecord, CountPointRecord, FreightZoneRecord, NetworkRecords,
                          NodeRecord, NodeId, ObservedCounts, SegmentRecord};
use super::vehicle::VehicleType;
use super::zoning::FineZoneRecord;


/// Shape of a synthetic grid city.
#[derive(Clone, Debug, PartialEq)]
pub struct GridParams {
    /// number of intersections in each direction
    pub num_x_nodes: usize,
    pub num_y_nodes: usize,
    /// side length of the square city in metres
    pub city_size_m: f64,
    /// zones are vertical strips of the grid
    pub num_zones: usize,
    pub count_point_fraction: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams {
            num_x_nodes: 6,
            num_y_nodes: 5,
            city_size_m: 5000.,
            num_zones: 3,
            count_point_fraction: 0.5,
        }
    }
}

impl GridParams {
    fn node_id(&self, x_idx: usize, y_idx: usize) -> NodeId {
        (y_idx * self.num_x_nodes + x_idx + 1) as NodeId
    }

    fn zone_of(&self, x_idx: usize) -> String {
        zone_name(x_idx * self.num_zones / self.num_x_nodes)
    }

    /// Zone codes in order.
    pub fn zone_names(&self) -> Vec<String> {
        (0..self.num_zones).map(zone_name).collect()
    }
}

fn zone_name(idx: usize) -> String {
    format!("Z{:02}", idx)
}

/// A grid street network.  The bottom row is a motorway and every other street an A-road.
/// Roughly `count_point_fraction` of the streets carry a count point, counted either in both
/// directions at once or per direction.  Each node gathers one residential and one workplace
/// area placed near it, and each zone is also a freight zone.  Freight zone 1001 is a point at
/// the top right corner.
pub fn generate_grid_network<R: Rng>(params: &GridParams, rng: &mut R) -> NetworkRecords {
    let inter_x_dist = params.city_size_m / params.num_x_nodes as f64;
    let inter_y_dist = params.city_size_m / params.num_y_nodes as f64;
    let position = |x_idx: usize, y_idx: usize| {
        (inter_x_dist * x_idx as f64, inter_y_dist * y_idx as f64)
    };

    let mut records = NetworkRecords::default();
    for (y_idx, x_idx) in iproduct!(0..params.num_y_nodes, 0..params.num_x_nodes) {
        let (xx, yy) = position(x_idx, y_idx);
        records.nodes.push(NodeRecord {
            id: params.node_id(x_idx, y_idx),
            x: xx,
            y: yy,
            zone: Some(params.zone_of(x_idx)),
        });

        // scatter the areas within 40% of the spacing around the node
        let mut near = |rng: &mut R| {
            (xx + (rng.gen::<f64>() - 0.5) * 0.8 * inter_x_dist,
             yy + (rng.gen::<f64>() - 0.5) * 0.8 * inter_y_dist)
        };
        let (ax, ay) = near(rng);
        records.population_areas.push(AreaRecord {
            code: format!("a{}", params.node_id(x_idx, y_idx)),
            zone: params.zone_of(x_idx),
            population: rng.gen_range(100.0..1000.0),
            x: ax,
            y: ay,
        });
        let (wx, wy) = near(rng);
        records.workplace_areas.push(AreaRecord {
            code: format!("w{}", params.node_id(x_idx, y_idx)),
            zone: params.zone_of(x_idx),
            population: rng.gen_range(50.0..500.0),
            x: wx,
            y: wy,
        });
    }

    // streets run right and up from every node
    let mut next_count_point = 1;
    for (y_idx, x_idx) in iproduct!(0..params.num_y_nodes, 0..params.num_x_nodes) {
        let mut others = vec![];
        if x_idx < params.num_x_nodes - 1 {
            others.push((x_idx + 1, y_idx, inter_x_dist, ('E', 'W')));
        }
        if y_idx < params.num_y_nodes - 1 {
            others.push((x_idx, y_idx + 1, inter_y_dist, ('N', 'S')));
        }
        for (other_x, other_y, dist, (forward, backward)) in others {
            let road_number = if y_idx == 0 && other_y == 0 {
                String::from("M1")
            } else {
                format!("A{}", next_count_point)
            };
            let count_point = if rng.gen::<f64>() < params.count_point_fraction {
                let cp = next_count_point;
                if rng.gen::<bool>() {
                    records.count_points.push(CountPointRecord {
                        count_point: cp,
                        direction: 'C',
                        counts: random_counts(rng, 2.),
                    });
                } else {
                    for direction in &[forward, backward] {
                        records.count_points.push(CountPointRecord {
                            count_point: cp,
                            direction: *direction,
                            counts: random_counts(rng, 1.),
                        });
                    }
                }
                Some(cp)
            } else {
                None
            };
            next_count_point += 1;
            records.segments.push(SegmentRecord {
                start_node: params.node_id(x_idx, y_idx),
                end_node: params.node_id(other_x, other_y),
                road_number,
                length_km: dist / 1000.,
                count_point,
                zone: Some(params.zone_of(x_idx)),
            });
        }
    }

    for (ii, zone) in params.zone_names().into_iter().enumerate() {
        records.freight_zones.push(FreightZoneRecord {
            id: ii as u32 + 1,
            zone: Some(zone),
            x: None,
            y: None,
        });
    }
    let (corner_x, corner_y) = position(params.num_x_nodes - 1, params.num_y_nodes - 1);
    records.freight_zones.push(FreightZoneRecord {
        id: 1001,
        zone: None,
        x: Some(corner_x),
        y: Some(corner_y),
    });
    records
}

fn random_counts<R: Rng>(rng: &mut R, scale: f64) -> ObservedCounts {
    let car = rng.gen_range(50.0..500.0) * scale;
    ObservedCounts {
        car: car.round(),
        van: (car * 0.1).round(),
        rigid: (car * 0.03).round(),
        artic: (car * 0.02).round(),
    }
}

/// Random demand between every pair of zones, scaled so that flows sum to `total_trips`.
pub fn generate_passenger_demand<R: Rng>(zones: &[String], total_trips: f64, rng: &mut R)
                                         -> ZoneMatrix {
    let rands: Vec<f64> = iproduct!(zones, zones).map(|_| rng.gen()).collect();
    let total: f64 = rands.iter().sum();
    let mut odm = ZoneMatrix::new();
    for ((origin, destination), rr) in iproduct!(zones, zones).zip(rands) {
        odm.set_zone_flow(origin, destination, rr * total_trips / total);
    }
    odm
}

/// Random freight demand for every pair of freight zones and freight vehicle type.
pub fn generate_freight_demand<R: Rng>(freight_zones: &[u32], total_trips: f64, rng: &mut R)
                                       -> FreightMatrix {
    let keys: Vec<FreightKey> = iproduct!(freight_zones, freight_zones, VehicleType::FREIGHT.iter())
        .map(|(oo, dd, vv)| FreightKey::new(*oo, *dd, *vv))
        .collect();
    let rands: Vec<f64> = keys.iter().map(|_| rng.gen()).collect();
    let total: f64 = rands.iter().sum();
    let mut fm = FreightMatrix::new();
    for (key, rr) in keys.into_iter().zip(rands) {
        fm.set_flow(key, rr * total_trips / total);
    }
    fm
}

/// One fine-grained zone per residential area, centred on it and inside the area's zone.
pub fn generate_fine_zones(records: &NetworkRecords) -> Vec<FineZoneRecord> {
    records.population_areas.iter()
        .map(|area| FineZoneRecord {
            code: format!("t{}", &area.code[1..]),
            lad: area.zone.clone(),
            x: area.x,
            y: area.y,
        })
        .collect()
}
