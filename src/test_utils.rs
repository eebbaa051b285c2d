use rand::SeedableRng;
use rand_isaac::Isaac64Rng;

use super::config::NetworkParams;
use super::road_network::*;


fn counts(car: f64, van: f64, rigid: f64, artic: f64) -> ObservedCounts {
    ObservedCounts{car, van, rigid, artic}
}

fn segment(start_node: NodeId, end_node: NodeId, road_number: &str, length_km: f64,
           count_point: Option<u32>, zone: Option<&str>) -> SegmentRecord {
    SegmentRecord {
        start_node,
        end_node,
        road_number: String::from(road_number),
        length_km,
        count_point,
        zone: zone.map(String::from),
    }
}

fn area(code: &str, zone: &str, population: f64, x: f64, y: f64) -> AreaRecord {
    AreaRecord{code: String::from(code), zone: String::from(zone), population, x, y}
}

/// A six-node network with two zones.
///
/// ```text
///            4 -------- 5
///            ^          |
///            |          |
///  1 <-----> 2 <------> 3 ------> 6
/// ```
/// 1-2 (M1) has a combined count point, 2-3 (M1) has east and west count points, 2-4 (A1) is
/// northbound only, 4-5 (A2) has no count point, 5-3 (A3) is combined and 3-6 (A4) is eastbound
/// only, so node 6 can end but not start a trip.  Edge IDs follow that order: 1:1->2, 2:2->1,
/// 3:2->3, 4:3->2, 5:2->4, 6:4->5, 7:5->4, 8:5->3, 9:3->5, 10:3->6.
pub fn small_records() -> NetworkRecords {
    let node = |id, x, y, zone: &str| NodeRecord{id, x, y, zone: Some(String::from(zone))};
    NetworkRecords {
        nodes: vec![
            node(1, 0., 0., "E01"),
            node(2, 1000., 0., "E01"),
            node(3, 2000., 0., "E02"),
            node(4, 1000., 1000., "E01"),
            node(5, 2000., 1000., "E02"),
            node(6, 3000., 0., "E02"),
        ],
        segments: vec![
            segment(1, 2, "M1", 1.0, Some(101), Some("E01")),
            segment(2, 3, "M1", 1.0, Some(102), Some("E01")),
            segment(2, 4, "A1", 1.2, Some(103), Some("E01")),
            segment(4, 5, "A2", 1.1, None, None),
            segment(5, 3, "A3", 1.0, Some(104), None),
            segment(3, 6, "A4", 1.0, Some(105), Some("E02")),
        ],
        count_points: vec![
            CountPointRecord{count_point: 101, direction: 'C', counts: counts(100., 10., 5., 5.)},
            CountPointRecord{count_point: 102, direction: 'E', counts: counts(80., 8., 2., 1.)},
            CountPointRecord{count_point: 102, direction: 'W', counts: counts(60., 6., 1., 1.)},
            CountPointRecord{count_point: 103, direction: 'N', counts: counts(30., 2., 0., 0.)},
            CountPointRecord{count_point: 104, direction: 'C', counts: counts(40., 4., 1., 0.)},
            CountPointRecord{count_point: 105, direction: 'E', counts: counts(20., 3., 1., 1.)},
        ],
        population_areas: vec![
            area("a1", "E01", 100., 100., 100.),
            area("a2", "E01", 300., 900., 50.),
            area("a3", "E01", 200., 1000., 900.),
            area("b1", "E02", 50., 2000., 100.),
            area("b2", "E02", 150., 2900., 0.),
        ],
        workplace_areas: vec![
            area("w1", "E02", 500., 2000., 50.),
            area("w2", "E01", 200., 0., 50.),
        ],
        freight_zones: vec![
            FreightZoneRecord{id: 1, zone: Some(String::from("E01")), x: None, y: None},
            FreightZoneRecord{id: 2, zone: Some(String::from("E02")), x: None, y: None},
            FreightZoneRecord{id: 1500, zone: None, x: Some(3050.), y: Some(0.)},
        ],
    }
}

pub fn small_network() -> RoadNetwork {
    RoadNetwork::new(small_records(), NetworkParams::default())
}

pub fn seeded_rng() -> Isaac64Rng {
    Isaac64Rng::seed_from_u64(100)
}
