use std::collections::HashMap;

use rand::Rng;

use super::road_network::{EdgeId, NodeId, RoadNetwork};
use super::route::{Route, UtilityContext};


/// The choice set of routes between one origin node and one destination node, with path-size
/// logit utilities and choice probabilities.
#[derive(Clone, Debug)]
pub struct RouteSet {
    origin: NodeId,
    destination: NodeId,
    routes: Vec<Route>,
    pathsizes: Option<Vec<f64>>,
    utilities: Option<Vec<f64>>,
    probabilities: Option<Vec<f64>>,
}

impl RouteSet {
    pub fn new(origin: NodeId, destination: NodeId) -> RouteSet {
        RouteSet {
            origin,
            destination,
            routes: vec![],
            pathsizes: None,
            utilities: None,
            probabilities: None,
        }
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains_edges(&self, edges: &[EdgeId]) -> bool {
        self.routes.iter().any(|rr| rr.edges() == edges)
    }

    /// Adds a route unless an identical edge sequence is already present.  Any addition
    /// invalidates the cached path-sizes, utilities and probabilities of every route.
    pub fn add_route(&mut self, route: Route) -> bool {
        if route.origin() != self.origin || route.destination() != self.destination {
            log::warn!("Route from {} to {} does not belong to the set from {} to {}",
                       route.origin(), route.destination(), self.origin, self.destination);
            return false;
        }
        if self.contains_edges(route.edges()) {
            return false;
        }
        self.routes.push(route);
        self.invalidate();
        true
    }

    pub fn invalidate(&mut self) {
        for route in self.routes.iter_mut() {
            route.invalidate();
        }
        self.pathsizes = None;
        self.utilities = None;
        self.probabilities = None;
    }

    pub fn pathsizes(&self) -> Option<&[f64]> {
        self.pathsizes.as_deref()
    }

    pub fn utilities(&self) -> Option<&[f64]> {
        self.utilities.as_deref()
    }

    pub fn probabilities(&self) -> Option<&[f64]> {
        self.probabilities.as_deref()
    }

    /// Path-size of each route: the length-weighted share of its edges, each edge divided by the
    /// number of routes in the set that use it.  Routes of zero length get 1.
    pub fn calculate_pathsizes(&mut self, network: &RoadNetwork) {
        let mut edge_usage: HashMap<EdgeId, usize> = HashMap::new();
        for route in &self.routes {
            let mut edges = route.edges().to_vec();
            edges.sort_unstable();
            edges.dedup();
            for edge in edges {
                *edge_usage.entry(edge).or_insert(0) += 1;
            }
        }

        let mut pathsizes = Vec::with_capacity(self.routes.len());
        for route in self.routes.iter_mut() {
            let route_length = route.calculate_length(network);
            if route_length <= 0. {
                pathsizes.push(1.);
                continue;
            }
            let mut pathsize = 0.;
            for edge in route.edges() {
                let edge_length = network.edge(*edge).map_or(0., |ee| ee.length_km);
                pathsize += edge_length / route_length / edge_usage[edge] as f64;
            }
            pathsizes.push(pathsize);
        }
        self.pathsizes = Some(pathsizes);
    }

    /// Route utilities corrected by the log of their path-size.
    pub fn calculate_utilities(&mut self, network: &RoadNetwork, ctx: &UtilityContext) {
        if self.pathsizes.is_none() {
            self.calculate_pathsizes(network);
        }
        let mut utilities = Vec::with_capacity(self.routes.len());
        for route in self.routes.iter_mut() {
            utilities.push(route.calculate_utility(network, ctx));
        }
        if let Some(pathsizes) = &self.pathsizes {
            for (utility, pathsize) in utilities.iter_mut().zip(pathsizes) {
                *utility += pathsize.ln();
            }
        }
        self.utilities = Some(utilities);
        self.probabilities = None;
    }

    /// Multinomial-logit probabilities from the current utilities.  Afterwards the routes,
    /// path-sizes, utilities and probabilities are all sorted by ascending utility.
    pub fn calculate_probabilities(&mut self) {
        let utilities = match &self.utilities {
            Some(utilities) if !utilities.is_empty() => utilities.clone(),
            _ => {
                self.probabilities = None;
                return;
            }
        };
        let max_utility = utilities.iter().fold(f64::NEG_INFINITY, |mm, &uu| mm.max(uu));
        let exp_values: Vec<f64> = utilities.iter().map(|uu| (uu - max_utility).exp()).collect();
        let sigma: f64 = exp_values.iter().sum();
        let probabilities: Vec<f64> = exp_values.iter().map(|ee| ee / sigma).collect();

        let mut order: Vec<usize> = (0..utilities.len()).collect();
        order.sort_by(|aa, bb| utilities[*aa].partial_cmp(&utilities[*bb])
                      .unwrap_or(std::cmp::Ordering::Equal));
        let mut routes: Vec<Option<Route>> = self.routes.drain(..).map(Some).collect();
        self.routes = order.iter().filter_map(|ii| routes[*ii].take()).collect();
        self.pathsizes = self.pathsizes.as_ref()
            .map(|pathsizes| order.iter().map(|ii| pathsizes[*ii]).collect());
        self.utilities = Some(order.iter().map(|ii| utilities[*ii]).collect());
        self.probabilities = Some(order.iter().map(|ii| probabilities[*ii]).collect());
    }

    /// Path-sizes, utilities and probabilities in one go.
    pub fn calculate_choice_probabilities(&mut self, network: &RoadNetwork, ctx: &UtilityContext) {
        self.calculate_pathsizes(network);
        self.calculate_utilities(network, ctx);
        self.calculate_probabilities();
    }

    /// Draws a route by inverse sampling of the cumulative probabilities.  None if the set is
    /// empty, probabilities have not been calculated or any of them is not finite.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<&Route> {
        let probabilities = self.probabilities.as_ref()?;
        if probabilities.iter().any(|pp| !pp.is_finite()) {
            log::warn!("Route set from {} to {} has non-finite choice probabilities",
                       self.origin, self.destination);
            return None;
        }
        if self.routes.len() == 1 {
            return self.routes.first();
        }
        let draw: f64 = rng.gen();
        let chosen = probabilities.iter()
            .scan(0., |cumulative, pp| {
                *cumulative += pp;
                Some(*cumulative)
            })
            .position(|cumulative| draw < cumulative)
            .unwrap_or(self.routes.len() - 1);
        self.routes.get(chosen)
    }

    /// Sets utilities directly, bypassing the route attributes.
    #[cfg(test)]
    pub(crate) fn set_utilities(&mut self, utilities: Vec<f64>) {
        for (route, utility) in self.routes.iter_mut().zip(&utilities) {
            route.set_utility(*utility);
        }
        self.utilities = Some(utilities);
        self.probabilities = None;
    }
}
