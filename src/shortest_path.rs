use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::cmp::Ordering;

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use priority_queue::PriorityQueue;

use super::road_network::{Edge, EdgeId, Node, NodeId, RoadNetwork};


/// A path through the road network.  A path from a node to itself has one node and no edges.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoadPath {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl RoadPath {
    pub fn single_node(node: NodeId) -> RoadPath {
        RoadPath{nodes: vec![node], edges: vec![]}
    }

    /// Builds a path from an edge sequence, returning None unless the edges are contiguous.
    pub fn from_edges(network: &RoadNetwork, edges: Vec<EdgeId>) -> Option<RoadPath> {
        let mut nodes = vec![];
        for edge_id in &edges {
            let edge = network.edge(*edge_id)?;
            match nodes.last() {
                None => {
                    nodes.push(edge.from);
                }
                Some(last) if *last != edge.from => return None,
                _ => (),
            }
            nodes.push(edge.to);
        }
        if nodes.is_empty() {
            return None;
        }
        Some(RoadPath{nodes, edges})
    }

    pub fn origin(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn destination(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }
}


#[derive(Copy, Clone, Debug)]
pub struct MinScored<K, T>(pub K, pub T);

impl<K: PartialOrd, T> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd, T> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            Ordering::Equal
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScore order
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}


fn reconstruct(network: &RoadNetwork, goal: NodeIndex,
               came_from: &HashMap<NodeIndex, EdgeIndex>) -> Option<RoadPath> {
    let graph = network.graph();
    let mut edges = vec![];
    let mut current = goal;
    while let Some(ei) = came_from.get(&current) {
        edges.push(graph[*ei].id);
        let (source, _) = graph.edge_endpoints(*ei)?;
        current = source;
        if edges.len() > graph.edge_count() {
            // a cycle in the predecessor map
            return None;
        }
    }
    edges.reverse();
    RoadPath::from_edges(network, edges)
}

fn endpoints(network: &RoadNetwork, from: NodeId, to: NodeId)
             -> Option<Result<(NodeIndex, NodeIndex), RoadPath>> {
    let start = network.node_index(from)?;
    let goal = network.node_index(to)?;
    if start == goal {
        return Some(Err(RoadPath::single_node(from)));
    }
    Some(Ok((start, goal)))
}

/// Forward Dijkstra from `from` to `to` with a pluggable edge weight.  Edges whose weight is
/// infinite are treated as absent.  Returns None when no path exists.
pub fn dijkstra<F>(network: &RoadNetwork, from: NodeId, to: NodeId, mut edge_cost: F)
                   -> Option<RoadPath>
where F: FnMut(&Edge) -> f64,
{
    let (start, goal) = match endpoints(network, from, to)? {
        Ok(ends) => ends,
        Err(trivial) => return Some(trivial),
    };
    let graph = network.graph();
    let mut visited = HashSet::new();
    let mut scores = HashMap::new();
    let mut came_from = HashMap::new();
    scores.insert(start, 0.);

    let mut visit_next = BinaryHeap::new();
    visit_next.push(MinScored(0., start));
    while let Some(MinScored(node_score, node)) = visit_next.pop() {
        if visited.contains(&node) {
            continue;
        }
        if node == goal {
            return reconstruct(network, goal, &came_from);
        }
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            let next = edge.target();
            if visited.contains(&next) {
                continue;
            }
            let cost = edge_cost(edge.weight());
            if cost.is_infinite() {
                continue;
            }
            let next_score = node_score + cost;
            match scores.entry(next) {
                Occupied(ent) => {
                    if next_score < *ent.get() {
                        *ent.into_mut() = next_score;
                        visit_next.push(MinScored(next_score, next));
                        came_from.insert(next, edge.id());
                    }
                }
                Vacant(ent) => {
                    ent.insert(next_score);
                    visit_next.push(MinScored(next_score, next));
                    came_from.insert(next, edge.id());
                }
            }
        }
        visited.insert(node);
    }
    None
}

/// A* search with a pluggable (cost, heuristic) pair.  The heuristic must never overestimate
/// the remaining cost to `to` for the result to be optimal.
pub fn astar<F, H>(network: &RoadNetwork, from: NodeId, to: NodeId, mut edge_cost: F,
                   mut heuristic: H) -> Option<RoadPath>
where F: FnMut(&Edge) -> f64,
      H: FnMut(&Node) -> f64,
{
    let (start, goal) = match endpoints(network, from, to)? {
        Ok(ends) => ends,
        Err(trivial) => return Some(trivial),
    };
    let graph = network.graph();
    let mut g_scores: HashMap<NodeIndex, f64> = HashMap::new();
    let mut came_from = HashMap::new();
    let mut closed = HashSet::new();
    let mut open = PriorityQueue::new();
    g_scores.insert(start, 0.);
    open.push(start, MinScored(heuristic(&graph[start]), ()));

    while let Some((node, _)) = open.pop() {
        if node == goal {
            return reconstruct(network, goal, &came_from);
        }
        closed.insert(node);
        let node_g = g_scores[&node];
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            let next = edge.target();
            if closed.contains(&next) {
                continue;
            }
            let cost = edge_cost(edge.weight());
            if cost.is_infinite() {
                continue;
            }
            let tentative = node_g + cost;
            let improves = match g_scores.get(&next) {
                Some(old) => tentative < *old,
                None => true,
            };
            if !improves {
                continue;
            }
            g_scores.insert(next, tentative);
            came_from.insert(next, edge.id());
            let priority = MinScored(tentative + heuristic(&graph[next]), ());
            // update the priority if it's in the queue, or insert it if not
            if open.change_priority(&next, priority).is_none() {
                open.push(next, priority);
            }
        }
    }
    None
}

impl RoadNetwork {
    /// Fastest path under the given link travel times (free-flow times when None), found with
    /// A* and a straight-line heuristic at motorway free-flow speed.
    pub fn fastest_path(&self, from: NodeId, to: NodeId,
                        link_times: Option<&HashMap<EdgeId, f64>>) -> Option<RoadPath> {
        let times = link_times.unwrap_or_else(|| self.free_flow_times());
        let goal = self.node(to)?.position.clone();
        let speed = self.params().free_flow_speed_m_road;
        astar(self, from, to,
              |edge| times.get(&edge.id).cloned().unwrap_or(f64::INFINITY),
              |node| node.position.distance_km(&goal) / speed * 60.)
    }

    /// Shortest path by length, found with A* and a straight-line distance heuristic.
    pub fn shortest_distance_path(&self, from: NodeId, to: NodeId) -> Option<RoadPath> {
        let goal = self.node(to)?.position.clone();
        astar(self, from, to, |edge| edge.length_km,
              |node| node.position.distance_km(&goal))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::NetworkParams;
    use super::super::road_network::{NetworkRecords, NodeRecord, SegmentRecord};
    use super::super::test_utils::small_network;
    use approx::assert_abs_diff_eq;

    fn path_time(network: &RoadNetwork, path: &RoadPath) -> f64 {
        path.edges.iter().map(|ee| network.free_flow_time(*ee).unwrap()).sum()
    }

    #[test]
    fn test_min_scored_orders_nan_last() {
        let mut heap = BinaryHeap::new();
        heap.push(MinScored(f64::NAN, 0));
        heap.push(MinScored(2., 1));
        heap.push(MinScored(1., 2));
        assert_eq!(heap.pop().unwrap().1, 2);
        assert_eq!(heap.pop().unwrap().1, 1);
        assert_eq!(heap.pop().unwrap().1, 0);
    }

    #[test]
    fn test_fastest_path() {
        let network = small_network();
        let path = network.fastest_path(1, 3, None).unwrap();
        assert_eq!(path.edges, vec![1, 3]);
        assert_eq!(path.nodes, vec![1, 2, 3]);
        // through 3 is quicker than through 4 on the A roads
        let path = network.fastest_path(2, 5, None).unwrap();
        assert_eq!(path.edges, vec![3, 9]);
    }

    #[test]
    fn test_link_times_change_the_route() {
        let network = small_network();
        let mut times = network.free_flow_times().clone();
        times.insert(3, 100.);
        let path = network.fastest_path(2, 5, Some(&times)).unwrap();
        assert_eq!(path.edges, vec![5, 6]);
    }

    #[test]
    fn test_no_path_and_trivial_path() {
        let network = small_network();
        assert_eq!(network.fastest_path(6, 1, None), None);
        assert_eq!(network.fastest_path(1, 99, None), None);
        let trivial = network.fastest_path(4, 4, None).unwrap();
        assert_eq!(trivial, RoadPath::single_node(4));
        assert_eq!(trivial.origin(), 4);
        assert_eq!(trivial.destination(), 4);
    }

    #[test]
    fn test_dijkstra_with_banned_edge() {
        let network = small_network();
        let path = dijkstra(&network, 2, 5, |edge| {
            if edge.id == 3 { f64::INFINITY } else { edge.length_km }
        }).unwrap();
        assert_eq!(path.edges, vec![5, 6]);
        let none = dijkstra(&network, 2, 3, |edge| {
            if edge.id == 3 || edge.id == 5 { f64::INFINITY } else { edge.length_km }
        });
        assert_eq!(none, None);
    }

    #[test]
    fn test_astar_matches_dijkstra() {
        let network = small_network();
        for from in network.node_ids() {
            for to in network.node_ids() {
                let fast = network.fastest_path(from, to, None);
                let reference = dijkstra(&network, from, to,
                                         |edge| network.free_flow_time(edge.id).unwrap());
                match (fast, reference) {
                    (Some(fast), Some(reference)) => assert_abs_diff_eq!(
                        path_time(&network, &fast), path_time(&network, &reference),
                        epsilon = 1e-9),
                    (None, None) => (),
                    other => panic!("A* and Dijkstra disagree for {} -> {}: {:?}", from, to,
                                    other),
                }
            }
        }
    }

    #[test]
    fn test_fastest_path_with_understated_lengths() {
        let node = |id, x, y| NodeRecord{id, x, y, zone: None};
        let segment = |start_node, end_node, length_km| SegmentRecord {
            start_node, end_node, road_number: String::from("M1"), length_km, count_point: None,
            zone: None,
        };
        // the detour through 3 is recorded as 0.2 km but is over 40 km in a straight line
        let records = NetworkRecords {
            nodes: vec![node(1, 0., 0.), node(2, 5000., 0.), node(3, 0., -20000.)],
            segments: vec![segment(1, 2, 5.), segment(1, 3, 0.1), segment(3, 2, 0.1)],
            ..Default::default()
        };
        let network = RoadNetwork::new(records, NetworkParams::default());
        assert_abs_diff_eq!(network.edge(3).unwrap().length_km, 20., epsilon = 1e-9);

        let fast = network.fastest_path(1, 2, None).unwrap();
        assert_eq!(fast.edges, vec![1]);
        let reference = dijkstra(&network, 1, 2,
                                 |edge| network.free_flow_time(edge.id).unwrap()).unwrap();
        assert_eq!(reference.edges, fast.edges);
        assert_abs_diff_eq!(path_time(&network, &fast), path_time(&network, &reference),
                            epsilon = 1e-12);
    }

    #[test]
    fn test_shortest_distance_path() {
        let network = small_network();
        let path = network.shortest_distance_path(4, 1).unwrap();
        // 4 -> 5 -> 3 -> 2 -> 1
        assert_eq!(path.nodes, vec![4, 5, 3, 2, 1]);
    }

    #[test]
    fn test_from_edges_checks_contiguity() {
        let network = small_network();
        assert!(RoadPath::from_edges(&network, vec![1, 3]).is_some());
        assert!(RoadPath::from_edges(&network, vec![1, 9]).is_none());
        assert!(RoadPath::from_edges(&network, vec![]).is_none());
        assert!(RoadPath::from_edges(&network, vec![42]).is_none());
    }
}
