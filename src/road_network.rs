use std::collections::{BTreeMap, HashMap, HashSet};

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::config::NetworkParams;
use super::error::{Result, TransportError};
use super::geometry::Point2d;
use super::vehicle::VehicleType;


pub type NodeId = u32;
pub type EdgeId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadClass {
    Motorway,
    ARoad,
    Ferry,
    Unknown,
}

impl RoadClass {
    /// Road numbers look like "M1", "A34" or "FERRY..."; the first character sets the class.
    pub fn from_road_number(road_number: &str) -> RoadClass {
        match road_number.chars().next() {
            Some('M') => RoadClass::Motorway,
            Some('A') => RoadClass::ARoad,
            Some('F') => RoadClass::Ferry,
            _ => RoadClass::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountDirection {
    North,
    South,
    East,
    West,
    /// one count point covering both directions
    Combined,
}

impl CountDirection {
    pub fn from_char(cc: char) -> Option<CountDirection> {
        match cc {
            'N' => Some(CountDirection::North),
            'S' => Some(CountDirection::South),
            'E' => Some(CountDirection::East),
            'W' => Some(CountDirection::West),
            'C' => Some(CountDirection::Combined),
            _ => None,
        }
    }
}

/// Daily traffic counts observed at a count point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedCounts {
    pub car: f64,
    pub van: f64,
    pub rigid: f64,
    pub artic: f64,
}

impl ObservedCounts {
    /// Autonomous cars are counted as cars.
    pub fn for_vehicle(&self, vehicle: VehicleType) -> f64 {
        match vehicle {
            VehicleType::Car | VehicleType::Av => self.car,
            VehicleType::Van => self.van,
            VehicleType::Rigid => self.rigid,
            VehicleType::Artic => self.artic,
        }
    }

    pub fn total(&self) -> f64 {
        self.car + self.van + self.rigid + self.artic
    }
}

// records handed over by the GIS provider

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub zone: Option<String>,
}

/// An undirected road segment.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SegmentRecord {
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub road_number: String,
    pub length_km: f64,
    pub count_point: Option<u32>,
    pub zone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CountPointRecord {
    pub count_point: u32,
    pub direction: char,
    pub counts: ObservedCounts,
}

/// A sub-area of a zone (output area or workplace zone) with its population and centroid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AreaRecord {
    pub code: String,
    pub zone: String,
    pub population: f64,
    pub x: f64,
    pub y: f64,
}

/// A freight zone either maps onto an administrative zone or is a point (port, airport,
/// distribution centre) that maps to its nearest node.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FreightZoneRecord {
    pub id: u32,
    pub zone: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkRecords {
    pub nodes: Vec<NodeRecord>,
    pub segments: Vec<SegmentRecord>,
    pub count_points: Vec<CountPointRecord>,
    pub population_areas: Vec<AreaRecord>,
    pub workplace_areas: Vec<AreaRecord>,
    pub freight_zones: Vec<FreightZoneRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Point2d,
    pub zone: Option<String>,
    pub gravitating_population: f64,
    pub gravitating_workplace_population: f64,
    /// population-weighted distance (m) from the node's sub-areas
    pub access_egress_distance: f64,
    /// workplace-weighted distance (m) from the node's workplace zones
    pub freight_access_egress_distance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub length_km: f64,
    pub road_number: String,
    pub class: RoadClass,
    pub lanes: u32,
    pub count_point: Option<u32>,
    pub direction: Option<CountDirection>,
    pub observed_counts: Option<ObservedCounts>,
    pub zone: Option<String>,
}

impl Edge {
    /// Free-flow travel time in minutes.  NaN for an unrecognised road class.
    pub fn free_flow_time(&self, params: &NetworkParams) -> f64 {
        let speed = match self.class {
            RoadClass::Motorway => params.free_flow_speed_m_road,
            RoadClass::ARoad => params.free_flow_speed_a_road,
            RoadClass::Ferry => params.average_speed_ferry,
            RoadClass::Unknown => return f64::NAN,
        };
        self.length_km / speed * 60.
    }
}

fn default_lanes(class: RoadClass, params: &NetworkParams) -> u32 {
    match class {
        RoadClass::Motorway => params.lanes_m_road,
        RoadClass::ARoad => params.lanes_a_road,
        _ => 0,
    }
}

/// Everything computed from the graph structure.  Rebuilt as a whole and swapped in.
#[derive(Clone, Debug, Default)]
struct DerivedIndices {
    zone_to_nodes: BTreeMap<String, Vec<NodeId>>,
    node_to_zone: HashMap<NodeId, String>,
    edge_to_zone: HashMap<EdgeId, String>,
    reverse_edges: HashMap<EdgeId, EdgeId>,
    free_flow_times: HashMap<EdgeId, f64>,
    start_blacklist: HashSet<NodeId>,
    end_blacklist: HashSet<NodeId>,
}

type NodeTree = KdTree<f64, NodeId, [f64; 2]>;

/// Where a sub-area's population lands on the network.
#[derive(Clone, Debug, Default)]
struct AreaMapping {
    area_to_node: HashMap<String, NodeId>,
    zone_to_areas: BTreeMap<String, Vec<(String, f64)>>,
}

/// The directed road graph: an arena of nodes and edges addressed by stable integer IDs.
#[derive(Clone, Debug)]
pub struct RoadNetwork {
    graph: StableDiGraph<Node, Edge>,
    node_indices: HashMap<NodeId, NodeIndex>,
    edge_indices: HashMap<EdgeId, EdgeIndex>,
    params: NetworkParams,
    population_mapping: AreaMapping,
    workplace_mapping: AreaMapping,
    freight_zone_to_zone: BTreeMap<u32, String>,
    freight_zone_to_node: BTreeMap<u32, NodeId>,
    derived: DerivedIndices,
}

impl RoadNetwork {
    pub fn new(records: NetworkRecords, params: NetworkParams) -> RoadNetwork {
        let mut network = RoadNetwork {
            graph: StableDiGraph::new(),
            node_indices: HashMap::new(),
            edge_indices: HashMap::new(),
            params,
            population_mapping: AreaMapping::default(),
            workplace_mapping: AreaMapping::default(),
            freight_zone_to_zone: BTreeMap::new(),
            freight_zone_to_node: BTreeMap::new(),
            derived: DerivedIndices::default(),
        };

        for record in records.nodes {
            if network.node_indices.contains_key(&record.id) {
                log::warn!("Duplicate node {} ignored", record.id);
                continue;
            }
            let node = Node {
                id: record.id,
                position: Point2d::new(record.x, record.y),
                zone: record.zone,
                gravitating_population: 0.,
                gravitating_workplace_population: 0.,
                access_egress_distance: 0.,
                freight_access_egress_distance: 0.,
            };
            let ni = network.graph.add_node(node);
            network.node_indices.insert(record.id, ni);
        }

        let mut counts_by_cp: HashMap<u32, Vec<&CountPointRecord>> = HashMap::new();
        for cp in &records.count_points {
            counts_by_cp.entry(cp.count_point).or_insert_with(Vec::new).push(cp);
        }
        let mut next_edge_id: EdgeId = 1;
        for segment in &records.segments {
            network.add_segment_edges(segment, &counts_by_cp, &mut next_edge_id);
        }

        let (per_zone_trees, global_tree) = network.build_node_trees();
        network.population_mapping = network.map_areas(&records.population_areas,
                                                       &per_zone_trees, &global_tree, false);
        network.workplace_mapping = network.map_areas(&records.workplace_areas,
                                                      &per_zone_trees, &global_tree, true);
        for fz in &records.freight_zones {
            if let Some(zone) = &fz.zone {
                network.freight_zone_to_zone.insert(fz.id, zone.clone());
            } else if let (Some(xx), Some(yy)) = (fz.x, fz.y) {
                match nearest_in_tree(&global_tree, &[xx, yy]) {
                    Some((node, _)) => { network.freight_zone_to_node.insert(fz.id, node); },
                    None => log::error!("No node found for freight zone {}", fz.id),
                }
            } else {
                log::error!("Freight zone {} has neither a zone nor a position", fz.id);
            }
        }

        // also rebuilds the derived indices
        network.make_edges_admissible();
        log::info!("Built road network with {} nodes and {} edges", network.node_count(),
                   network.edge_count());
        return network;
    }

    /// Creates one or two directed edges from an undirected segment, as dictated by the
    /// direction codes of its count points.
    fn add_segment_edges(&mut self, segment: &SegmentRecord,
                         counts_by_cp: &HashMap<u32, Vec<&CountPointRecord>>,
                         next_edge_id: &mut EdgeId) {
        let (start, end) = match (self.node(segment.start_node), self.node(segment.end_node)) {
            (Some(start), Some(end)) => (start.clone(), end.clone()),
            _ => {
                log::error!("Segment {} with ends {} and {} references a missing node",
                            segment.road_number, segment.start_node, segment.end_node);
                return;
            }
        };

        let mut to_create: Vec<(NodeId, NodeId, Option<CountDirection>, Option<ObservedCounts>)>
            = vec![];
        let matches = segment.count_point.and_then(|cp| counts_by_cp.get(&cp));
        if let Some(matches) = matches {
            let mut directed_matches = 0;
            for cp in matches {
                let direction = match CountDirection::from_char(cp.direction) {
                    Some(dd) => dd,
                    None => {
                        log::error!("Unrecognised direction {} at count point {}", cp.direction,
                                    cp.count_point);
                        continue;
                    }
                };
                let (from, to) = match direction {
                    CountDirection::Combined if !to_create.is_empty() => {
                        log::warn!("Combined count point {} follows a directed one on {}; ignored",
                                   cp.count_point, segment.road_number);
                        continue;
                    }
                    CountDirection::Combined => {
                        to_create.push((start.id, end.id, Some(direction), Some(cp.counts.clone())));
                        to_create.push((end.id, start.id, Some(direction), Some(cp.counts.clone())));
                        break;
                    }
                    CountDirection::North if end.position.y_coord > start.position.y_coord =>
                        (start.id, end.id),
                    CountDirection::South if end.position.y_coord < start.position.y_coord =>
                        (start.id, end.id),
                    CountDirection::East if end.position.x_coord > start.position.x_coord =>
                        (start.id, end.id),
                    CountDirection::West if end.position.x_coord < start.position.x_coord =>
                        (start.id, end.id),
                    _ => (end.id, start.id),
                };
                if to_create.iter().any(|(ff, tt, _, _)| (*ff, *tt) == (from, to)) {
                    log::warn!("Count point {} gives the direction {} to {} twice; ignored",
                               cp.count_point, from, to);
                    continue;
                }
                to_create.push((from, to, Some(direction), Some(cp.counts.clone())));
                directed_matches += 1;
                if directed_matches == 2 {
                    break;
                }
            }
        }
        if to_create.is_empty() {
            if let Some(cp) = segment.count_point {
                log::warn!("No count point data for {} on {}; creating both directions", cp,
                           segment.road_number);
            }
            to_create.push((start.id, end.id, None, None));
            to_create.push((end.id, start.id, None, None));
        }

        let class = RoadClass::from_road_number(&segment.road_number);
        for (from, to, direction, counts) in to_create {
            let edge = Edge {
                id: *next_edge_id,
                from,
                to,
                length_km: segment.length_km,
                road_number: segment.road_number.clone(),
                class,
                lanes: default_lanes(class, &self.params),
                count_point: segment.count_point,
                direction,
                observed_counts: counts,
                zone: segment.zone.clone(),
            };
            self.insert_edge(edge);
            *next_edge_id += 1;
        }
    }

    fn insert_edge(&mut self, edge: Edge) {
        let from = self.node_indices[&edge.from];
        let to = self.node_indices[&edge.to];
        let id = edge.id;
        let ei = self.graph.add_edge(from, to, edge);
        self.edge_indices.insert(id, ei);
    }

    fn build_node_trees(&self) -> (HashMap<String, NodeTree>, NodeTree) {
        let mut per_zone: HashMap<String, NodeTree> = HashMap::new();
        let mut global = KdTree::new(2);
        for ni in self.graph.node_indices() {
            let node = &self.graph[ni];
            let point = node.position.as_array();
            if let Err(ee) = global.add(point, node.id) {
                log::error!("Cannot index node {}: {:?}", node.id, ee);
                continue;
            }
            if let Some(zone) = &node.zone {
                let tree = per_zone.entry(zone.clone()).or_insert_with(|| KdTree::new(2));
                // the point was accepted by the global tree, so this cannot fail
                let _ = tree.add(point, node.id);
            }
        }
        (per_zone, global)
    }

    /// Maps each sub-area to its nearest node within the same zone (falling back to the whole
    /// network) and accumulates gravitating population and weighted access distance.
    fn map_areas(&mut self, areas: &[AreaRecord], per_zone_trees: &HashMap<String, NodeTree>,
                 global_tree: &NodeTree, workplace: bool) -> AreaMapping {
        let mut mapping = AreaMapping::default();
        let mut weighted: HashMap<NodeId, (f64, f64)> = HashMap::new();
        for area in areas {
            let point = [area.x, area.y];
            let nearest = per_zone_trees.get(&area.zone)
                .and_then(|tree| nearest_in_tree(tree, &point))
                .or_else(|| nearest_in_tree(global_tree, &point));
            let (node_id, distance) = match nearest {
                Some(nearest) => nearest,
                None => {
                    log::warn!("No node found for area {}", area.code);
                    continue;
                }
            };
            mapping.area_to_node.insert(area.code.clone(), node_id);
            mapping.zone_to_areas.entry(area.zone.clone()).or_insert_with(Vec::new)
                .push((area.code.clone(), area.population));
            let entry = weighted.entry(node_id).or_insert((0., 0.));
            entry.0 += area.population;
            entry.1 += area.population * distance;
        }

        for (node_id, (population, weighted_distance)) in weighted {
            let ni = self.node_indices[&node_id];
            let node = &mut self.graph[ni];
            let distance = if population > 0. { weighted_distance / population } else { 0. };
            if workplace {
                node.gravitating_workplace_population = population;
                node.freight_access_egress_distance = distance;
            } else {
                node.gravitating_population = population;
                node.access_egress_distance = distance;
            }
        }
        mapping
    }

    /// Recomputes every derived index from the current graph and swaps the result in.
    pub fn rebuild_derived_indices(&mut self) {
        let derived = self.derive_indices();
        self.derived = derived;
    }

    fn derive_indices(&self) -> DerivedIndices {
        let mut derived = DerivedIndices::default();

        for ni in self.graph.node_indices() {
            let node = &self.graph[ni];
            if self.graph.edges_directed(ni, Direction::Outgoing).next().is_none() {
                derived.start_blacklist.insert(node.id);
            }
            if self.graph.edges_directed(ni, Direction::Incoming).next().is_none() {
                derived.end_blacklist.insert(node.id);
            }
            if let Some(zone) = &node.zone {
                derived.node_to_zone.insert(node.id, zone.clone());
                derived.zone_to_nodes.entry(zone.clone()).or_insert_with(Vec::new).push(node.id);
            }
        }
        for nodes in derived.zone_to_nodes.values_mut() {
            // most populous first
            nodes.sort_by(|aa, bb| {
                let pa = self.graph[self.node_indices[aa]].gravitating_population;
                let pb = self.graph[self.node_indices[bb]].gravitating_population;
                pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal).then(aa.cmp(bb))
            });
        }

        let mut edges_by_cp: BTreeMap<u32, Vec<&Edge>> = BTreeMap::new();
        for ei in self.graph.edge_indices() {
            let edge = &self.graph[ei];
            let fft = edge.free_flow_time(&self.params);
            if fft.is_nan() {
                log::error!("Unrecognised road class for edge {} ({}); free-flow time is NaN",
                            edge.id, edge.road_number);
            }
            derived.free_flow_times.insert(edge.id, fft);
            let zone = edge.zone.clone().or_else(|| derived.node_to_zone.get(&edge.from).cloned());
            if let Some(zone) = zone {
                derived.edge_to_zone.insert(edge.id, zone);
            }
            if let Some(cp) = edge.count_point {
                edges_by_cp.entry(cp).or_insert_with(Vec::new).push(edge);
            }
        }

        for (cp, edges) in edges_by_cp {
            if edges.len() != 2 {
                if edges.len() > 2 {
                    log::warn!("Count point {} is shared by {} edges; no reverse edges assigned",
                               cp, edges.len());
                }
                continue;
            }
            let (aa, bb) = (edges[0], edges[1]);
            if aa.from != bb.to || aa.to != bb.from {
                log::warn!("Edges {} and {} share count point {} but are not opposite", aa.id,
                           bb.id, cp);
                continue;
            }
            if (aa.length_km - bb.length_km).abs() > 1e-9 {
                log::warn!("Reverse edges {} ({} km) and {} ({} km) have different lengths",
                           aa.id, aa.length_km, bb.id, bb.length_km);
            }
            derived.reverse_edges.insert(aa.id, bb.id);
            derived.reverse_edges.insert(bb.id, aa.id);
        }
        derived
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_indices.get(&id).map(|ni| &self.graph[*ni])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_indices.get(&id).map(|ei| &self.graph[*ei])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(move |ni| &self.graph[ni])
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_indices().map(move |ei| &self.graph[ei])
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.node_indices.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self.edge_indices.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn graph(&self) -> &StableDiGraph<Node, Edge> {
        &self.graph
    }

    pub(crate) fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_indices.get(&id).cloned()
    }

    pub fn outgoing_edges(&self, id: NodeId) -> Vec<&Edge> {
        match self.node_indices.get(&id) {
            Some(ni) => self.graph.edges_directed(*ni, Direction::Outgoing)
                .map(|er| er.weight()).collect(),
            None => vec![],
        }
    }

    /// Finds an edge from `from` to `to`, optionally restricted to one count point.
    pub fn find_edge(&self, from: NodeId, to: NodeId, count_point: Option<u32>)
                     -> Option<EdgeId> {
        let (fi, ti) = (self.node_indices.get(&from)?, self.node_indices.get(&to)?);
        self.graph.edges_directed(*fi, Direction::Outgoing)
            .filter(|er| er.target() == *ti)
            .map(|er| er.weight())
            .filter(|edge| count_point.is_none() || edge.count_point == count_point)
            .map(|edge| edge.id)
            .min()
    }

    pub fn straight_line_km(&self, from: NodeId, to: NodeId) -> Option<f64> {
        let (aa, bb) = (self.node(from)?, self.node(to)?);
        Some(aa.position.distance_km(&bb.position))
    }

    pub fn zones(&self) -> impl Iterator<Item = &String> {
        self.derived.zone_to_nodes.keys()
    }

    /// A zone's nodes, most populous first.
    pub fn zone_nodes(&self, zone: &str) -> &[NodeId] {
        match self.derived.zone_to_nodes.get(zone) {
            Some(nodes) => nodes.as_slice(),
            None => &[],
        }
    }

    pub fn node_zone(&self, node: NodeId) -> Option<&str> {
        self.derived.node_to_zone.get(&node).map(|ss| ss.as_str())
    }

    pub fn edge_zone(&self, edge: EdgeId) -> Option<&str> {
        self.derived.edge_to_zone.get(&edge).map(|ss| ss.as_str())
    }

    pub fn reverse_edge(&self, edge: EdgeId) -> Option<EdgeId> {
        self.derived.reverse_edges.get(&edge).cloned()
    }

    pub fn free_flow_time(&self, edge: EdgeId) -> Option<f64> {
        self.derived.free_flow_times.get(&edge).cloned()
    }

    pub fn free_flow_times(&self) -> &HashMap<EdgeId, f64> {
        &self.derived.free_flow_times
    }

    pub fn is_start_blacklisted(&self, node: NodeId) -> bool {
        self.derived.start_blacklist.contains(&node)
    }

    pub fn is_end_blacklisted(&self, node: NodeId) -> bool {
        self.derived.end_blacklist.contains(&node)
    }

    pub fn start_blacklist(&self) -> &HashSet<NodeId> {
        &self.derived.start_blacklist
    }

    pub fn end_blacklist(&self) -> &HashSet<NodeId> {
        &self.derived.end_blacklist
    }

    pub fn area_node(&self, area_code: &str) -> Option<NodeId> {
        self.population_mapping.area_to_node.get(area_code).cloned()
    }

    pub fn workplace_node(&self, workplace_code: &str) -> Option<NodeId> {
        self.workplace_mapping.area_to_node.get(workplace_code).cloned()
    }

    /// Each sub-area's share of its zone's population.  Sums to 1 for a populated zone.
    pub fn area_code_probabilities(&self, zone: &str) -> Vec<(String, f64)> {
        share_of_total(self.population_mapping.zone_to_areas.get(zone))
    }

    pub fn workplace_zone_probabilities(&self, zone: &str) -> Vec<(String, f64)> {
        share_of_total(self.workplace_mapping.zone_to_areas.get(zone))
    }

    pub fn freight_zone_zone(&self, freight_zone: u32) -> Option<&str> {
        self.freight_zone_to_zone.get(&freight_zone).map(|ss| ss.as_str())
    }

    pub fn freight_zone_node(&self, freight_zone: u32) -> Option<NodeId> {
        self.freight_zone_to_node.get(&freight_zone).cloned()
    }

    // mutations; each structural change ends with a full index rebuild

    pub fn set_number_of_lanes(&mut self, edge: EdgeId, lanes: u32) -> Result<()> {
        let ei = *self.edge_indices.get(&edge).ok_or(TransportError::MissingEdge(edge))?;
        self.graph[ei].lanes = lanes;
        Ok(())
    }

    pub fn set_node_zone(&mut self, node: NodeId, zone: Option<String>) -> Result<()> {
        let ni = *self.node_indices.get(&node).ok_or(TransportError::MissingNode(node))?;
        self.graph[ni].zone = zone;
        self.rebuild_derived_indices();
        Ok(())
    }

    /// Lengthens every edge that is shorter than the straight line between its nodes, so that
    /// straight-line heuristics never overestimate.  Returns the number of edges changed.
    pub fn make_edges_admissible(&mut self) -> usize {
        let mut changed = 0;
        let edge_indices: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for ei in edge_indices {
            let (from, to) = (self.graph[ei].from, self.graph[ei].to);
            let straight = match self.straight_line_km(from, to) {
                Some(straight) => straight,
                None => continue,
            };
            let edge = &mut self.graph[ei];
            if edge.length_km < straight {
                log::warn!("Edge {} is shorter ({} km) than the straight line ({} km); overriding",
                           edge.id, edge.length_km, straight);
                edge.length_km = straight;
                changed += 1;
            }
        }
        self.rebuild_derived_indices();
        changed
    }

    fn next_edge_id(&self) -> EdgeId {
        self.edge_indices.keys().max().map_or(1, |max| max + 1)
    }

    /// Builds a new edge between existing nodes.  The length is never shorter than the
    /// straight-line distance, which is also used when no length is given.
    pub fn create_road_link(&mut self, from: NodeId, to: NodeId, road_number: &str,
                            lanes: Option<u32>, length_km: Option<f64>) -> Result<EdgeId> {
        let straight = match self.straight_line_km(from, to) {
            Some(straight) => straight,
            None if self.node(from).is_none() => return Err(TransportError::MissingNode(from)),
            None => return Err(TransportError::MissingNode(to)),
        };
        let mut length_km = length_km.unwrap_or(straight);
        if length_km < straight {
            log::warn!("New link from {} to {} ({} km) is shorter than the straight line ({} km); \
                        using the straight line", from, to, length_km, straight);
            length_km = straight;
        }
        let class = RoadClass::from_road_number(road_number);
        let id = self.next_edge_id();
        let edge = Edge {
            id,
            from,
            to,
            length_km,
            road_number: String::from(road_number),
            class,
            lanes: lanes.unwrap_or_else(|| default_lanes(class, &self.params)),
            count_point: None,
            direction: None,
            observed_counts: None,
            zone: None,
        };
        self.insert_edge(edge);
        self.rebuild_derived_indices();
        log::info!("Created road link {} from {} to {}", id, from, to);
        Ok(id)
    }

    /// Re-inserts an edge (e.g. one returned by `remove_road_link`), keeping its ID.
    pub fn add_road_link(&mut self, edge: Edge) -> Result<()> {
        if self.edge_indices.contains_key(&edge.id) {
            return Err(TransportError::InvalidIntervention {
                name: format!("edge {}", edge.id),
                reason: String::from("an edge with this ID already exists"),
            });
        }
        for node in &[edge.from, edge.to] {
            if !self.node_indices.contains_key(node) {
                return Err(TransportError::MissingNode(*node));
            }
        }
        self.insert_edge(edge);
        self.rebuild_derived_indices();
        Ok(())
    }

    pub fn remove_road_link(&mut self, edge: EdgeId) -> Result<Edge> {
        let ei = self.edge_indices.remove(&edge).ok_or(TransportError::MissingEdge(edge))?;
        let removed = self.graph.remove_edge(ei).ok_or(TransportError::MissingEdge(edge))?;
        self.rebuild_derived_indices();
        log::info!("Removed road link {}", edge);
        Ok(removed)
    }
}

fn nearest_in_tree(tree: &NodeTree, point: &[f64; 2]) -> Option<(NodeId, f64)> {
    match tree.nearest(point, 1, &squared_euclidean) {
        Ok(found) => found.first().map(|(sq_dist, node)| (**node, sq_dist.sqrt())),
        Err(_) => None,
    }
}

fn share_of_total(areas: Option<&Vec<(String, f64)>>) -> Vec<(String, f64)> {
    let areas = match areas {
        Some(areas) => areas,
        None => return vec![],
    };
    let total: f64 = areas.iter().map(|(_, pop)| pop).sum();
    if total <= 0. {
        return vec![];
    }
    areas.iter().map(|(code, pop)| (code.clone(), pop / total)).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_utils::{small_network, small_records};
    use approx::{assert_abs_diff_eq, assert_ulps_eq};

    #[test]
    fn test_directed_edges_from_count_points() {
        let network = small_network();
        assert_eq!(network.node_count(), 6);
        assert_eq!(network.edge_count(), 10);
        // combined count point: both directions
        assert!(network.find_edge(1, 2, Some(101)).is_some());
        assert!(network.find_edge(2, 1, Some(101)).is_some());
        // east and west records on one segment
        assert_eq!(network.find_edge(2, 3, None), Some(3));
        assert_eq!(network.find_edge(3, 2, None), Some(4));
        // a single northbound record makes a one-way edge
        assert_eq!(network.find_edge(2, 4, None), Some(5));
        assert_eq!(network.find_edge(4, 2, None), None);
        // no count point: both directions from the raw segment
        assert_eq!(network.find_edge(4, 5, None), Some(6));
        assert_eq!(network.find_edge(5, 4, None), Some(7));
    }

    #[test]
    fn test_direction_orientation_follows_geometry() {
        // segment digitised against the direction of travel
        let mut records = small_records();
        records.segments.push(SegmentRecord {
            start_node: 4, end_node: 1, road_number: String::from("A9"), length_km: 1.5,
            count_point: Some(200), zone: None,
        });
        records.count_points.push(CountPointRecord {
            count_point: 200, direction: 'S', counts: ObservedCounts::default(),
        });
        let network = RoadNetwork::new(records, NetworkParams::default());
        // node 1 lies south of node 4, so southbound runs 4 -> 1
        assert!(network.find_edge(4, 1, Some(200)).is_some());
        assert!(network.find_edge(1, 4, Some(200)).is_none());
    }

    #[test]
    fn test_reverse_edges() {
        let network = small_network();
        assert_eq!(network.reverse_edge(1), Some(2));
        assert_eq!(network.reverse_edge(2), Some(1));
        assert_eq!(network.reverse_edge(3), Some(4));
        assert_eq!(network.reverse_edge(5), None);
        // no count point, so no reverse edge even though the geometry matches
        assert_eq!(network.reverse_edge(6), None);
    }

    #[test]
    fn test_free_flow_times() {
        let mut records = small_records();
        records.segments.push(SegmentRecord {
            start_node: 1, end_node: 4, road_number: String::from("B123"), length_km: 2.,
            count_point: None, zone: None,
        });
        records.segments.push(SegmentRecord {
            start_node: 1, end_node: 5, road_number: String::from("FERRY1"), length_km: 2.,
            count_point: None, zone: None,
        });
        let network = RoadNetwork::new(records, NetworkParams::default());
        let params = NetworkParams::default();
        assert_ulps_eq!(network.free_flow_time(1).unwrap(),
                        1.0 / params.free_flow_speed_m_road * 60.);
        assert_ulps_eq!(network.free_flow_time(5).unwrap(),
                        1.2 / params.free_flow_speed_a_road * 60.);
        let b_road = network.find_edge(1, 4, None).unwrap();
        assert!(network.free_flow_time(b_road).unwrap().is_nan());
        let ferry = network.find_edge(1, 5, None).unwrap();
        assert_ulps_eq!(network.free_flow_time(ferry).unwrap(), 2. / 20. * 60.);
        assert_eq!(network.edge(ferry).unwrap().lanes, 0);
        assert_eq!(network.edge(1).unwrap().lanes, 3);
        assert_eq!(network.edge(5).unwrap().lanes, 1);
    }

    #[test]
    fn test_blacklists() {
        let network = small_network();
        // node 6 is only reachable, never left
        assert!(network.is_start_blacklisted(6));
        assert!(!network.is_end_blacklisted(6));
        assert!(!network.is_start_blacklisted(2));
        assert_eq!(network.start_blacklist().len(), 1);
        assert!(network.end_blacklist().is_empty());
    }

    #[test]
    fn test_gravitating_population() {
        let network = small_network();
        assert_ulps_eq!(network.node(2).unwrap().gravitating_population, 300.);
        assert_ulps_eq!(network.node(4).unwrap().gravitating_population, 200.);
        assert_ulps_eq!(network.node(5).unwrap().gravitating_population, 0.);
        assert_eq!(network.zone_nodes("E01"), &[2, 4, 1]);
        assert_eq!(network.zone_nodes("E02"), &[6, 3, 5]);
        assert_eq!(network.area_node("a1"), Some(1));
        assert_abs_diff_eq!(network.node(1).unwrap().access_egress_distance,
                            (2. * 100f64.powi(2)).sqrt(), epsilon = 1e-9);
        assert_ulps_eq!(network.node(4).unwrap().access_egress_distance, 100.);
        assert_ulps_eq!(network.node(3).unwrap().gravitating_workplace_population, 500.);
    }

    #[test]
    fn test_area_code_probabilities() {
        let network = small_network();
        for zone in &["E01", "E02"] {
            let probs = network.area_code_probabilities(zone);
            let total: f64 = probs.iter().map(|(_, pp)| pp).sum();
            assert_abs_diff_eq!(total, 1., epsilon = 1e-12);
        }
        let probs: HashMap<String, f64> = network.area_code_probabilities("E01")
            .into_iter().collect();
        assert_ulps_eq!(probs["a2"], 0.5);
        assert!(network.area_code_probabilities("nowhere").is_empty());
    }

    #[test]
    fn test_freight_zones() {
        let network = small_network();
        assert_eq!(network.freight_zone_zone(1), Some("E01"));
        assert_eq!(network.freight_zone_node(1), None);
        assert_eq!(network.freight_zone_node(1500), Some(6));
    }

    #[test]
    fn test_edge_zones() {
        let network = small_network();
        assert_eq!(network.edge_zone(1), Some("E01"));
        // segment without a zone takes the zone of its start node
        assert_eq!(network.edge_zone(8), Some("E02"));
    }

    #[test]
    fn test_make_edges_admissible() {
        let mut records = small_records();
        records.segments[0].length_km = 0.5;
        let mut network = RoadNetwork::new(records, NetworkParams::default());
        // both directions of the short segment are lengthened while building
        for edge_id in &[1, 2] {
            assert_ulps_eq!(network.edge(*edge_id).unwrap().length_km, 1.0);
        }
        let speed = network.params().free_flow_speed_m_road;
        assert_ulps_eq!(network.free_flow_time(1).unwrap(), 1.0 / speed * 60.);
        assert_eq!(network.make_edges_admissible(), 0);
        for edge in network.edges() {
            let straight = network.straight_line_km(edge.from, edge.to).unwrap();
            assert!(edge.length_km >= straight);
        }
    }

    #[test]
    fn test_combined_after_directed_count_point() {
        let mut records = small_records();
        // count point 105 on 3-6 is eastbound; a later combined record must not add edges
        records.count_points.push(CountPointRecord {
            count_point: 105,
            direction: 'C',
            counts: ObservedCounts{car: 50., van: 5., rigid: 1., artic: 1.},
        });
        records.count_points.push(CountPointRecord {
            count_point: 105,
            direction: 'E',
            counts: ObservedCounts{car: 25., van: 3., rigid: 1., artic: 1.},
        });
        let network = RoadNetwork::new(records, NetworkParams::default());
        assert_eq!(network.edge_count(), 10);
        let edge = network.edge(10).unwrap();
        assert_eq!((edge.from, edge.to), (3, 6));
        assert_eq!(edge.direction, Some(CountDirection::East));
        assert_ulps_eq!(edge.observed_counts.as_ref().unwrap().car, 20.);
        assert!(network.is_start_blacklisted(6));
    }

    #[test]
    fn test_create_remove_add_road_link() {
        let mut network = small_network();
        assert!(network.is_start_blacklisted(6));
        let new_id = network.create_road_link(6, 5, "A10", None, None).unwrap();
        assert_eq!(new_id, 11);
        assert!(!network.is_start_blacklisted(6));
        assert_eq!(network.edge(new_id).unwrap().lanes, 1);
        assert_ulps_eq!(network.edge(new_id).unwrap().length_km, (2f64).sqrt());
        assert!(network.free_flow_time(new_id).is_some());

        let removed = network.remove_road_link(new_id).unwrap();
        assert!(network.is_start_blacklisted(6));
        assert!(network.free_flow_time(new_id).is_none());
        assert!(network.remove_road_link(new_id).is_err());

        network.add_road_link(removed.clone()).unwrap();
        assert_eq!(network.edge(new_id), Some(&removed));
        assert!(network.add_road_link(removed).is_err());
        assert!(network.create_road_link(6, 99, "A10", None, None).is_err());

        // too short for the straight line from 1 to 5
        let short_id = network.create_road_link(1, 5, "A11", None, Some(0.5)).unwrap();
        assert_ulps_eq!(network.edge(short_id).unwrap().length_km, (5f64).sqrt());
    }

    #[test]
    fn test_missing_segment_node_is_skipped() {
        let mut records = small_records();
        records.segments.push(SegmentRecord {
            start_node: 1, end_node: 42, road_number: String::from("A1"), length_km: 1.,
            count_point: None, zone: None,
        });
        let network = RoadNetwork::new(records, NetworkParams::default());
        assert_eq!(network.edge_count(), 10);
    }

    #[test]
    fn test_lanes_and_zone_overrides() {
        let mut network = small_network();
        network.set_number_of_lanes(5, 2).unwrap();
        assert_eq!(network.edge(5).unwrap().lanes, 2);
        assert!(network.set_number_of_lanes(99, 2).is_err());
        network.set_node_zone(1, Some(String::from("E02"))).unwrap();
        assert_eq!(network.node_zone(1), Some("E02"));
        assert!(!network.zone_nodes("E01").contains(&1));
    }
}
