use std::collections::BTreeMap;
use std::path::Path;

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use serde::Deserialize;

use super::error::Result;
use super::geometry::Point2d;
use super::road_network::{NodeId, RoadNetwork};


/// A fine-grained zone: its code, the administrative zone that contains it, and its centroid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FineZoneRecord {
    pub code: String,
    pub lad: String,
    pub x: f64,
    pub y: f64,
}

/// Fine-grained, distance-based zoning.  Each zone is served by the network nodes nearest its
/// centroid, restricted to nodes that can both start and end a trip.
#[derive(Clone, Debug, Default)]
pub struct Zoning {
    zone_to_lad: BTreeMap<String, String>,
    centroids: BTreeMap<String, Point2d>,
    zone_to_sorted_nodes: BTreeMap<String, Vec<(NodeId, f64)>>,
}

impl Zoning {
    pub fn new(records: Vec<FineZoneRecord>, network: &RoadNetwork, top_nodes: usize) -> Zoning {
        let mut tree = KdTree::new(2);
        let mut num_usable = 0;
        for node in network.nodes() {
            if network.is_start_blacklisted(node.id) || network.is_end_blacklisted(node.id) {
                continue;
            }
            match tree.add(node.position.as_array(), node.id) {
                Ok(_) => num_usable += 1,
                Err(ee) => log::error!("Cannot index node {}: {:?}", node.id, ee),
            }
        }

        let mut zoning = Zoning::default();
        let num_nearest = top_nodes.min(num_usable);
        for record in records {
            let centroid = Point2d::new(record.x, record.y);
            let mut nodes = vec![];
            if num_nearest > 0 {
                match tree.nearest(&centroid.as_array(), num_nearest, &squared_euclidean) {
                    Ok(found) => {
                        nodes = found.iter().map(|(sq_dist, id)| (**id, sq_dist.sqrt())).collect();
                    }
                    Err(ee) => log::error!("Nearest-node query failed for {}: {:?}", record.code,
                                           ee),
                }
            }
            if nodes.is_empty() {
                log::warn!("No usable node found for zone {}", record.code);
            }
            zoning.zone_to_sorted_nodes.insert(record.code.clone(), nodes);
            zoning.zone_to_lad.insert(record.code.clone(), record.lad);
            zoning.centroids.insert(record.code, centroid);
        }
        log::info!("Mapped {} fine-grained zones to their nearest nodes",
                   zoning.zone_to_sorted_nodes.len());
        return zoning;
    }

    pub fn read_csv(path: &Path) -> Result<Vec<FineZoneRecord>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = vec![];
        for result in reader.deserialize() {
            let record: FineZoneRecord = result?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn zones(&self) -> impl Iterator<Item = &String> {
        self.zone_to_lad.keys()
    }

    pub fn zone_lad(&self, zone: &str) -> Option<&str> {
        self.zone_to_lad.get(zone).map(|ss| ss.as_str())
    }

    pub fn centroid(&self, zone: &str) -> Option<&Point2d> {
        self.centroids.get(zone)
    }

    /// Candidate nodes with their distances from the centroid, nearest first.
    pub fn sorted_nodes(&self, zone: &str) -> &[(NodeId, f64)] {
        match self.zone_to_sorted_nodes.get(zone) {
            Some(nodes) => nodes.as_slice(),
            None => &[],
        }
    }

    pub fn nearest_node(&self, zone: &str) -> Option<NodeId> {
        self.sorted_nodes(zone).first().map(|(node, _)| *node)
    }

    /// The nearest candidate node that can still start a trip.
    pub fn origin_node(&self, network: &RoadNetwork, zone: &str) -> Option<NodeId> {
        self.sorted_nodes(zone).iter()
            .map(|(node, _)| *node)
            .find(|node| network.node(*node).is_some() && !network.is_start_blacklisted(*node))
    }

    /// The nearest candidate node that can still end a trip.
    pub fn destination_node(&self, network: &RoadNetwork, zone: &str) -> Option<NodeId> {
        self.sorted_nodes(zone).iter()
            .map(|(node, _)| *node)
            .find(|node| network.node(*node).is_some() && !network.is_end_blacklisted(*node))
    }
}


#[cfg(test)]
pub(crate) fn small_zoning(network: &RoadNetwork) -> Zoning {
    let zone = |code: &str, lad: &str, x, y| FineZoneRecord {
        code: String::from(code), lad: String::from(lad), x, y,
    };
    let records = vec![
        zone("t1", "E01", 100., 0.),
        zone("t2", "E01", 1000., 900.),
        zone("t3", "E02", 2100., 900.),
        zone("t4", "E02", 3000., 10.),
    ];
    Zoning::new(records, network, 2)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_utils::small_network;
    use approx::assert_ulps_eq;
    use std::io::Write;

    #[test]
    fn test_nodes_sorted_by_distance() {
        let network = small_network();
        let zoning = small_zoning(&network);
        let nodes = zoning.sorted_nodes("t1");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].0, 1);
        assert_ulps_eq!(nodes[0].1, 100.);
        assert_eq!(nodes[1].0, 2);
        assert!(nodes[0].1 <= nodes[1].1);
        assert_eq!(zoning.nearest_node("t2"), Some(4));
        assert_eq!(zoning.zone_lad("t3"), Some("E02"));
    }

    #[test]
    fn test_unusable_nodes_are_skipped() {
        let network = small_network();
        let zoning = small_zoning(&network);
        // node 6 cannot start a trip, so it is never a candidate
        assert!(zoning.sorted_nodes("t4").iter().all(|(node, _)| *node != 6));
        assert_eq!(zoning.nearest_node("t4"), Some(3));
        assert_eq!(zoning.origin_node(&network, "t4"), Some(3));
        assert_eq!(zoning.destination_node(&network, "nowhere"), None);
    }

    #[test]
    fn test_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "code,lad,x,y").unwrap();
        writeln!(file, "t1,E01,100.0,0.0").unwrap();
        writeln!(file, "t2,E02,2000.0,50.5").unwrap();
        drop(file);
        let records = Zoning::read_csv(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].lad, "E02");
        assert_ulps_eq!(records[1].y, 50.5);
    }
}
