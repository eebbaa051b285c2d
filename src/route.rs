use std::collections::HashMap;

use super::config::RouteChoiceParams;
use super::road_network::{EdgeId, NodeId, RoadNetwork};
use super::shortest_path::RoadPath;
use super::vehicle::{EnergyParams, EngineType, VehicleType};


/// What a route's utility depends on besides the route itself.
#[derive(Clone, Copy, Debug)]
pub struct UtilityContext<'a> {
    pub vehicle: VehicleType,
    pub engine: EngineType,
    /// minutes per edge for the time of day being evaluated
    pub link_times: &'a HashMap<EdgeId, f64>,
    pub energy: &'a EnergyParams,
    pub params: &'a RouteChoiceParams,
}

/// An ordered sequence of edges from an origin node to a destination node.  Derived attributes
/// are computed on demand and cached until `invalidate` is called.
#[derive(Clone, Debug)]
pub struct Route {
    edges: Vec<EdgeId>,
    origin: NodeId,
    destination: NodeId,
    length: Option<f64>,
    time: Option<f64>,
    cost: Option<f64>,
    utility: Option<f64>,
}

impl PartialEq for Route {
    fn eq(&self, other: &Route) -> bool {
        self.edges == other.edges && self.origin == other.origin &&
            self.destination == other.destination
    }
}

impl Eq for Route {}

impl Route {
    fn with_edges(edges: Vec<EdgeId>, origin: NodeId, destination: NodeId) -> Route {
        Route {
            edges,
            origin,
            destination,
            length: None,
            time: None,
            cost: None,
            utility: None,
        }
    }

    pub fn from_path(path: &RoadPath) -> Route {
        Route::with_edges(path.edges.clone(), path.origin(), path.destination())
    }

    /// Builds a route from an edge sequence; None if the edges are unknown or not contiguous.
    pub fn from_edges(network: &RoadNetwork, edges: Vec<EdgeId>) -> Option<Route> {
        let path = RoadPath::from_edges(network, edges)?;
        Some(Route::from_path(&path))
    }

    /// Trusts the caller that the edges run contiguously from `origin` to `destination`.
    pub fn from_edges_unchecked(edges: Vec<EdgeId>, origin: NodeId, destination: NodeId)
                                -> Route {
        Route::with_edges(edges, origin, destination)
    }

    /// A route that starts and ends at the same node.
    pub fn single_node(node: NodeId) -> Route {
        Route::with_edges(vec![], node, node)
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn is_single_node(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn number_of_intersections(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Contiguous known edges, starting at a node that can start a trip and ending at one that
    /// can end a trip.  A single-node route is valid whenever its node exists.
    pub fn is_valid(&self, network: &RoadNetwork) -> bool {
        if self.edges.is_empty() {
            return self.origin == self.destination && network.node(self.origin).is_some();
        }
        match RoadPath::from_edges(network, self.edges.clone()) {
            Some(path) => {
                path.origin() == self.origin && path.destination() == self.destination &&
                    !network.is_start_blacklisted(self.origin) &&
                    !network.is_end_blacklisted(self.destination)
            }
            None => false,
        }
    }

    /// Drops cached time, cost and utility.  Length depends only on the graph and is kept.
    pub fn invalidate(&mut self) {
        self.time = None;
        self.cost = None;
        self.utility = None;
    }

    pub fn length(&self) -> Option<f64> {
        self.length
    }

    pub fn time(&self) -> Option<f64> {
        self.time
    }

    pub fn cost(&self) -> Option<f64> {
        self.cost
    }

    pub fn utility(&self) -> Option<f64> {
        self.utility
    }

    /// Length in km, without touching the cache.
    pub fn length_km(&self, network: &RoadNetwork) -> f64 {
        self.edges.iter()
            .map(|ee| network.edge(*ee).map_or(f64::NAN, |edge| edge.length_km))
            .sum()
    }

    /// Travel time in minutes, without touching the cache.
    pub fn time_min(&self, network: &RoadNetwork, link_times: &HashMap<EdgeId, f64>,
                    average_intersection_delay: f64) -> f64 {
        route_time(&self.edges, network, link_times) +
            self.number_of_intersections() as f64 * average_intersection_delay
    }

    /// Length in km.
    pub fn calculate_length(&mut self, network: &RoadNetwork) -> f64 {
        if let Some(length) = self.length {
            return length;
        }
        let length = self.length_km(network);
        self.length = Some(length);
        length
    }

    /// Travel time in minutes, including a fixed delay at every intersection.  Edges missing
    /// from `link_times` use their free-flow time.
    pub fn calculate_time(&mut self, network: &RoadNetwork, link_times: &HashMap<EdgeId, f64>,
                          average_intersection_delay: f64) -> f64 {
        if let Some(time) = self.time {
            return time;
        }
        let time = self.time_min(network, link_times, average_intersection_delay);
        self.time = Some(time);
        time
    }

    /// Monetary cost of the energy used, from the speed-dependent per-link consumption.
    pub fn calculate_cost(&mut self, network: &RoadNetwork, ctx: &UtilityContext) -> f64 {
        if let Some(cost) = self.cost {
            return cost;
        }
        let mut consumption = 0.;
        for edge_id in &self.edges {
            let (length, time) = match network.edge(*edge_id) {
                Some(edge) => (edge.length_km, link_time(*edge_id, network, ctx.link_times)),
                None => (f64::NAN, f64::NAN),
            };
            consumption += ctx.energy.link_consumption(ctx.vehicle, ctx.engine, length, time);
        }
        let cost = consumption * ctx.energy.energy_unit_cost(ctx.engine);
        self.cost = Some(cost);
        cost
    }

    /// Linear utility in time, length, cost and intersections.  Never positive when the
    /// coefficients are valid.
    pub fn calculate_utility(&mut self, network: &RoadNetwork, ctx: &UtilityContext) -> f64 {
        if let Some(utility) = self.utility {
            return utility;
        }
        let length = self.calculate_length(network);
        let time = self.calculate_time(network, ctx.link_times,
                                       ctx.params.average_intersection_delay);
        let cost = self.calculate_cost(network, ctx);
        let utility = ctx.params.time * time + ctx.params.length * length +
            ctx.params.cost * cost +
            ctx.params.intersections * self.number_of_intersections() as f64;
        self.utility = Some(utility);
        utility
    }

    #[cfg(test)]
    pub(crate) fn set_utility(&mut self, utility: f64) {
        self.utility = Some(utility);
    }
}

fn link_time(edge: EdgeId, network: &RoadNetwork, link_times: &HashMap<EdgeId, f64>) -> f64 {
    match link_times.get(&edge) {
        Some(time) => *time,
        None => network.free_flow_time(edge).unwrap_or(f64::NAN),
    }
}

fn route_time(edges: &[EdgeId], network: &RoadNetwork, link_times: &HashMap<EdgeId, f64>)
              -> f64 {
    edges.iter().map(|ee| link_time(*ee, network, link_times)).sum()
}
