use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::{Rng, SeedableRng};
use rand_isaac::Isaac64Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{GenerationStrategy, RouteGenerationParams};
use super::error::Result;
use super::road_network::{Edge, EdgeId, NodeId, RoadNetwork};
use super::route::{Route, UtilityContext};
use super::route_set::RouteSet;
use super::shortest_path::dijkstra;
use super::zoning::Zoning;


static GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How a route store is written.  Reading detects compression on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreFormat {
    Plain,
    Gzip,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct RouteSetRecord {
    origin: NodeId,
    destination: NodeId,
    routes: Vec<Vec<EdgeId>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteSetStatistics {
    pub route_sets: usize,
    pub routes: usize,
    pub average_routes_per_set: f64,
    pub largest_route_set: usize,
}

/// Builds and stores the route choice sets of many origin-destination node pairs.
#[derive(Clone, Debug, Default)]
pub struct RouteSetGenerator {
    params: RouteGenerationParams,
    route_sets: BTreeMap<(NodeId, NodeId), RouteSet>,
}

impl RouteSetGenerator {
    pub fn new(params: RouteGenerationParams) -> RouteSetGenerator {
        RouteSetGenerator {
            params,
            route_sets: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &RouteGenerationParams {
        &self.params
    }

    pub fn route_set(&self, origin: NodeId, destination: NodeId) -> Option<&RouteSet> {
        self.route_sets.get(&(origin, destination))
    }

    pub fn route_sets(&self) -> impl Iterator<Item = &RouteSet> {
        self.route_sets.values()
    }

    /// Number of route sets.
    pub fn len(&self) -> usize {
        self.route_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route_sets.is_empty()
    }

    pub fn number_of_routes(&self) -> usize {
        self.route_sets.values().map(|rs| rs.len()).sum()
    }

    pub fn clear(&mut self) {
        self.route_sets.clear();
    }

    /// Adds a route to the set of its origin and destination, creating the set if needed.
    pub fn add_route(&mut self, route: Route) -> bool {
        let key = (route.origin(), route.destination());
        self.route_sets.entry(key)
            .or_insert_with(|| RouteSet::new(key.0, key.1))
            .add_route(route)
    }

    /// Generates routes for one node pair under free-flow times and adds them to the store.
    /// Returns the number of new routes.
    pub fn generate_route_set<R: Rng>(&mut self, network: &RoadNetwork, origin: NodeId,
                                      destination: NodeId, rng: &mut R) -> usize {
        let generated = generate_for_pair(network, &self.params, network.free_flow_times(),
                                          origin, destination, rng);
        self.merge_route_set(generated)
    }

    /// Generates routes for many node pairs in parallel.  Each pair gets its own generator
    /// seeded from `rng`, so the result does not depend on thread scheduling.
    pub fn generate_route_sets<R: Rng>(&mut self, network: &RoadNetwork,
                                       pairs: &[(NodeId, NodeId)], rng: &mut R) -> usize {
        let link_times = network.free_flow_times();
        let params = &self.params;
        let pairs_and_seeds: Vec<((NodeId, NodeId), u64)> = pairs.iter()
            .map(|pair| (*pair, rng.gen::<u64>()))
            .collect();
        let generated: Vec<RouteSet> = pairs_and_seeds.par_iter().map(
            |((origin, destination), seed)| {
                let mut rng = Isaac64Rng::seed_from_u64(*seed);
                generate_for_pair(network, params, link_times, *origin, *destination, &mut rng)
            }).collect();

        let mut added = 0;
        for route_set in generated {
            added += self.merge_route_set(route_set);
        }
        let stats = self.statistics();
        log::debug!("Generated {} routes for {} pairs; store has {} sets, {:.2} routes per set",
                    added, pairs.len(), stats.route_sets, stats.average_routes_per_set);
        added
    }

    /// Generates routes between administrative zones, using each zone's most populous nodes
    /// as surrogate origins and destinations.
    pub fn generate_route_sets_for_zones<R: Rng>(&mut self, network: &RoadNetwork,
                                                 zone_pairs: &[(String, String)], rng: &mut R)
                                                 -> usize {
        let top_nodes = self.params.top_nodes;
        let mut pairs = vec![];
        for (origin_zone, destination_zone) in zone_pairs {
            let origins: Vec<NodeId> = network.zone_nodes(origin_zone).iter().cloned()
                .filter(|nn| !network.is_start_blacklisted(*nn))
                .take(top_nodes)
                .collect();
            let destinations: Vec<NodeId> = network.zone_nodes(destination_zone).iter().cloned()
                .filter(|nn| !network.is_end_blacklisted(*nn))
                .take(top_nodes)
                .collect();
            if origins.is_empty() || destinations.is_empty() {
                log::debug!("No usable nodes between zones {} and {}", origin_zone,
                            destination_zone);
            }
            for origin in &origins {
                for destination in &destinations {
                    pairs.push((*origin, *destination));
                }
            }
        }
        self.generate_route_sets(network, &pairs, rng)
    }

    /// Generates routes between fine-grained zones, each represented by its nearest usable
    /// node.
    pub fn generate_route_sets_for_fine_zones<R: Rng>(&mut self, network: &RoadNetwork,
                                                      zoning: &Zoning,
                                                      zone_pairs: &[(String, String)],
                                                      rng: &mut R) -> usize {
        let mut pairs = vec![];
        for (origin_zone, destination_zone) in zone_pairs {
            match (zoning.origin_node(network, origin_zone),
                   zoning.destination_node(network, destination_zone)) {
                (Some(origin), Some(destination)) => pairs.push((origin, destination)),
                _ => log::debug!("No usable nodes between fine zones {} and {}", origin_zone,
                                 destination_zone),
            }
        }
        self.generate_route_sets(network, &pairs, rng)
    }

    /// A single-node route set for every node, so that trips starting and ending at the same
    /// node always resolve.
    pub fn generate_single_node_routes(&mut self, network: &RoadNetwork) -> usize {
        let mut added = 0;
        for node in network.node_ids() {
            if self.add_route(Route::single_node(node)) {
                added += 1;
            }
        }
        added
    }

    fn merge_route_set(&mut self, route_set: RouteSet) -> usize {
        let mut added = 0;
        for route in route_set.routes() {
            if self.add_route(route.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Adds every route of `other`, skipping edge sequences already stored for the same pair.
    pub fn merge(&mut self, other: &RouteSetGenerator) -> usize {
        let mut added = 0;
        for route_set in other.route_sets.values() {
            for route in route_set.routes() {
                if self.add_route(route.clone()) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Drops routes made invalid by changes to the network.  Returns the number removed.
    pub fn remove_invalid_routes(&mut self, network: &RoadNetwork) -> usize {
        let mut removed = 0;
        let mut rebuilt = BTreeMap::new();
        for (key, route_set) in self.route_sets.iter() {
            let mut kept = RouteSet::new(key.0, key.1);
            for route in route_set.routes() {
                if route.is_valid(network) {
                    kept.add_route(route.clone());
                } else {
                    removed += 1;
                }
            }
            if !kept.is_empty() {
                rebuilt.insert(*key, kept);
            }
        }
        self.route_sets = rebuilt;
        if removed > 0 {
            log::info!("Removed {} routes that are no longer valid", removed);
        }
        removed
    }

    pub fn calculate_all_pathsizes(&mut self, network: &RoadNetwork) {
        for route_set in self.route_sets.values_mut() {
            route_set.calculate_pathsizes(network);
        }
    }

    /// Utilities and choice probabilities of every set under one utility context.
    pub fn calculate_all_probabilities(&mut self, network: &RoadNetwork, ctx: &UtilityContext) {
        for route_set in self.route_sets.values_mut() {
            route_set.calculate_choice_probabilities(network, ctx);
        }
    }

    pub fn statistics(&self) -> RouteSetStatistics {
        let routes = self.number_of_routes();
        let route_sets = self.route_sets.len();
        let average_routes_per_set = if route_sets > 0 {
            routes as f64 / route_sets as f64
        } else {
            0.
        };
        RouteSetStatistics {
            route_sets,
            routes,
            average_routes_per_set,
            largest_route_set: self.route_sets.values().map(|rs| rs.len()).max().unwrap_or(0),
        }
    }

    pub fn save_routes(&self, path: &Path, format: StoreFormat) -> Result<()> {
        let records: Vec<RouteSetRecord> = self.route_sets.values()
            .map(|rs| RouteSetRecord {
                origin: rs.origin(),
                destination: rs.destination(),
                routes: rs.routes().iter().map(|rr| rr.edges().to_vec()).collect(),
            })
            .collect();
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            StoreFormat::Plain => {
                bincode::serialize_into(&mut writer, &records)?;
            }
            StoreFormat::Gzip => {
                let mut encoder = GzEncoder::new(&mut writer, Compression::default());
                bincode::serialize_into(&mut encoder, &records)?;
                encoder.finish()?;
            }
        }
        writer.flush()?;
        log::info!("Saved {} route sets to {:?}", records.len(), path);
        Ok(())
    }

    /// Reads a route store written by `save_routes`, plain or gzipped.  With `check_validity`,
    /// routes that are not contiguous valid routes of `network` are rejected; without it the
    /// stored edge sequences are trusted as they are.  Returns the number of routes added.
    pub fn read_routes(&mut self, network: &RoadNetwork, path: &Path, check_validity: bool)
                       -> Result<usize> {
        let mut reader = BufReader::new(File::open(path)?);
        let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let records: Vec<RouteSetRecord> = if is_gzip {
            bincode::deserialize_from(GzDecoder::new(reader))?
        } else {
            bincode::deserialize_from(reader)?
        };

        let mut added = 0;
        let mut rejected = 0;
        for record in records {
            for edges in record.routes {
                let route = if edges.is_empty() {
                    if record.origin != record.destination {
                        rejected += 1;
                        continue;
                    }
                    Route::single_node(record.origin)
                } else if check_validity {
                    match Route::from_edges(network, edges) {
                        Some(route) if route.origin() == record.origin &&
                            route.destination() == record.destination &&
                            route.is_valid(network) => route,
                        _ => {
                            rejected += 1;
                            continue;
                        }
                    }
                } else {
                    Route::from_edges_unchecked(edges, record.origin, record.destination)
                };
                if self.add_route(route) {
                    added += 1;
                }
            }
        }
        if rejected > 0 {
            log::warn!("Rejected {} invalid routes from {:?}", rejected, path);
        }
        log::info!("Read {} routes from {:?}", added, path);
        Ok(added)
    }
}

fn edge_time(edge: &Edge, link_times: &HashMap<EdgeId, f64>) -> f64 {
    match link_times.get(&edge.id) {
        Some(time) if !time.is_nan() => *time,
        _ => f64::INFINITY,
    }
}

/// The fastest route plus alternatives found by re-searching with one link of an existing
/// route removed, or with randomly perturbed link times.
fn generate_for_pair<R: Rng>(network: &RoadNetwork, params: &RouteGenerationParams,
                             link_times: &HashMap<EdgeId, f64>, origin: NodeId,
                             destination: NodeId, rng: &mut R) -> RouteSet {
    let mut route_set = RouteSet::new(origin, destination);
    if origin == destination {
        if network.node(origin).is_some() {
            route_set.add_route(Route::single_node(origin));
        }
        return route_set;
    }
    if network.is_start_blacklisted(origin) || network.is_end_blacklisted(destination) {
        return route_set;
    }
    let fastest = match dijkstra(network, origin, destination,
                                 |edge| edge_time(edge, link_times)) {
        Some(path) => Route::from_path(&path),
        None => {
            log::debug!("No path from {} to {}", origin, destination);
            return route_set;
        }
    };
    route_set.add_route(fastest);

    let mut attempts = 0;
    while route_set.len() < params.route_limit && attempts < params.generation_limit {
        attempts += 1;
        let path = match params.strategy {
            GenerationStrategy::LinkElimination => {
                let routes = route_set.routes();
                let edges = routes[rng.gen_range(0..routes.len())].edges();
                let banned = edges[rng.gen_range(0..edges.len())];
                dijkstra(network, origin, destination, |edge| {
                    if edge.id == banned { f64::INFINITY } else { edge_time(edge, link_times) }
                })
            }
            GenerationStrategy::Perturbation => {
                let spread = params.perturbation;
                let mut factors: HashMap<EdgeId, f64> = HashMap::new();
                dijkstra(network, origin, destination, |edge| {
                    let factor = *factors.entry(edge.id)
                        .or_insert_with(|| 1. + spread * rng.gen_range(-1.0..1.0));
                    edge_time(edge, link_times) * factor
                })
            }
        };
        if let Some(path) = path {
            let route = Route::from_path(&path);
            if route.is_valid(network) {
                route_set.add_route(route);
            }
        }
    }
    route_set
}
