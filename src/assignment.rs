use std::collections::{BTreeMap, HashMap, HashSet};

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::config::{AssignmentParams, RouteChoiceParams};
use super::od_matrix::{FreightKey, FreightMatrix, OdMatrix, ZoneMatrix, ZonePair};
use super::road_network::{CountDirection, Edge, EdgeId, NodeId, RoadClass, RoadNetwork};
use super::route::{Route, UtilityContext};
use super::route_set::RouteSet;
use super::route_set_generator::RouteSetGenerator;
use super::skim_matrix::SkimMatrix;
use super::trip::{Trip, TripEnds};
use super::vehicle::{EnergyParams, EnergyType, EngineType, TimeOfDay, VehicleType};
use super::zoning::Zoning;


/// Trips and the link volumes they produce, for one demand segment.
#[derive(Clone, Debug)]
struct FlowAccumulator {
    trips: Vec<Trip>,
    volumes: BTreeMap<VehicleType, HashMap<EdgeId, f64>>,
    pcu_volumes_per_hour: Vec<HashMap<EdgeId, f64>>,
}

impl FlowAccumulator {
    fn new() -> FlowAccumulator {
        FlowAccumulator {
            trips: vec![],
            volumes: BTreeMap::new(),
            pcu_volumes_per_hour: vec![HashMap::new(); TimeOfDay::ALL.len()],
        }
    }

    fn reset_volumes(&mut self) {
        self.volumes.clear();
        for hourly in self.pcu_volumes_per_hour.iter_mut() {
            hourly.clear();
        }
    }

    fn accumulate(&mut self, trip: Trip) {
        let vehicle_volumes = self.volumes.entry(trip.vehicle).or_insert_with(HashMap::new);
        let hourly = &mut self.pcu_volumes_per_hour[trip.time_of_day.index()];
        for edge in trip.route.edges() {
            *vehicle_volumes.entry(*edge).or_insert(0.) += 1.;
            *hourly.entry(*edge).or_insert(0.) += trip.vehicle.pcu();
        }
        self.trips.push(trip);
    }
}

/// Observed against simulated volume at one count point (or one direction of it).
#[derive(Clone, Debug, PartialEq)]
pub struct CountComparison {
    pub count_point: u32,
    pub edges: Vec<EdgeId>,
    pub simulated: f64,
    pub observed: f64,
}

/// Counts do not tell autonomous cars apart from other cars.
fn count_class(vehicle: VehicleType) -> VehicleType {
    match vehicle {
        VehicleType::Av => VehicleType::Car,
        other => other,
    }
}

/// Root-mean-square error normalised by the mean observed count, as a percentage.
pub fn rmsn(comparisons: &[CountComparison]) -> f64 {
    let total_observed: f64 = comparisons.iter().map(|cc| cc.observed).sum();
    if comparisons.is_empty() || total_observed <= 0. {
        log::warn!("RMSN is undefined without positive observed counts");
        return f64::NAN;
    }
    let squared_error: f64 = comparisons.iter()
        .map(|cc| (cc.simulated - cc.observed).powi(2))
        .sum();
    (comparisons.len() as f64 * squared_error).sqrt() / total_observed * 100.
}

fn weighted_index(weights: &[f64]) -> Option<WeightedIndex<f64>> {
    WeightedIndex::new(weights.iter().cloned()).ok()
}

/// Draws vehicle engines and departure hours from the configured fractions.
struct TripSampler {
    hours: Option<WeightedIndex<f64>>,
    engines: BTreeMap<VehicleType, (Vec<EngineType>, Option<WeightedIndex<f64>>)>,
}

impl TripSampler {
    fn new(hour_fractions: &[f64], energy: &EnergyParams) -> TripSampler {
        let mut engines = BTreeMap::new();
        for vehicle in VehicleType::ALL.iter() {
            let fractions = energy.engine_fractions(*vehicle);
            let types: Vec<EngineType> = fractions.iter().map(|(ee, _)| *ee).collect();
            let weights: Vec<f64> = fractions.iter().map(|(_, ff)| *ff).collect();
            engines.insert(*vehicle, (types, weighted_index(&weights)));
        }
        TripSampler {
            hours: weighted_index(hour_fractions),
            engines,
        }
    }

    fn hour<R: Rng>(&self, rng: &mut R) -> TimeOfDay {
        match &self.hours {
            Some(dist) => TimeOfDay::ALL[dist.sample(rng)],
            None => TimeOfDay::EIGHT_AM,
        }
    }

    /// Vehicles without engine fractions run on petrol.
    fn engine<R: Rng>(&self, vehicle: VehicleType, rng: &mut R) -> EngineType {
        match self.engines.get(&vehicle) {
            Some((types, Some(dist))) => types[dist.sample(rng)],
            _ => EngineType::IcePetrol,
        }
    }
}

/// Picks trip end nodes inside a zone, weighted by the population (or workplace population)
/// of the sub-areas mapped to each node.
struct EndpointSampler<'n> {
    network: &'n RoadNetwork,
    workplace: bool,
    cache: HashMap<String, Option<(Vec<NodeId>, WeightedIndex<f64>)>>,
}

impl<'n> EndpointSampler<'n> {
    fn new(network: &'n RoadNetwork, workplace: bool) -> EndpointSampler<'n> {
        EndpointSampler{network, workplace, cache: HashMap::new()}
    }

    fn usable(&self, node: NodeId, as_origin: bool) -> bool {
        if as_origin {
            !self.network.is_start_blacklisted(node)
        } else {
            !self.network.is_end_blacklisted(node)
        }
    }

    fn node_distribution(&self, zone: &str) -> Option<(Vec<NodeId>, WeightedIndex<f64>)> {
        let probabilities = if self.workplace {
            self.network.workplace_zone_probabilities(zone)
        } else {
            self.network.area_code_probabilities(zone)
        };
        let mut node_weights: BTreeMap<NodeId, f64> = BTreeMap::new();
        for (code, probability) in probabilities {
            let node = if self.workplace {
                self.network.workplace_node(&code)
            } else {
                self.network.area_node(&code)
            };
            if let Some(node) = node {
                *node_weights.entry(node).or_insert(0.) += probability;
            }
        }
        let nodes: Vec<NodeId> = node_weights.keys().cloned().collect();
        let weights: Vec<f64> = node_weights.values().cloned().collect();
        weighted_index(&weights).map(|dist| (nodes, dist))
    }

    fn sample<R: Rng>(&mut self, zone: &str, as_origin: bool, rng: &mut R) -> Option<NodeId> {
        if !self.cache.contains_key(zone) {
            let distribution = self.node_distribution(zone);
            self.cache.insert(String::from(zone), distribution);
        }
        let sampled = match self.cache.get(zone) {
            Some(Some((nodes, dist))) => Some(nodes[dist.sample(rng)]),
            _ => None,
        };
        match sampled {
            Some(node) if self.usable(node, as_origin) => Some(node),
            // fall back to the zone's most populous usable node
            _ => self.network.zone_nodes(zone).iter().cloned()
                .find(|nn| self.usable(*nn, as_origin)),
        }
    }
}

type ChoiceKey = (NodeId, NodeId, VehicleType, EngineType, TimeOfDay);

/// Routes resolved during one assignment call.  Link times do not change within a call, so
/// resolved routes and computed choice probabilities can be reused.
#[derive(Default)]
struct RouteCache {
    fastest: HashMap<(NodeId, NodeId, TimeOfDay), Option<Route>>,
    choice_sets: HashMap<ChoiceKey, RouteSet>,
}

/// Per-iteration assignment of passenger and freight demand onto the road network, with
/// capacity-restrained link travel times.
#[derive(Clone, Debug)]
pub struct RoadNetworkAssignment {
    params: AssignmentParams,
    route_choice: RouteChoiceParams,
    energy: EnergyParams,
    passenger: FlowAccumulator,
    freight: FlowAccumulator,
    link_travel_times: Vec<HashMap<EdgeId, f64>>,
    dropped_trips: usize,
}

impl RoadNetworkAssignment {
    pub fn new(network: &RoadNetwork, params: AssignmentParams, route_choice: RouteChoiceParams,
               energy: EnergyParams) -> RoadNetworkAssignment {
        let mut rna = RoadNetworkAssignment {
            params,
            route_choice,
            energy,
            passenger: FlowAccumulator::new(),
            freight: FlowAccumulator::new(),
            link_travel_times: vec![],
            dropped_trips: 0,
        };
        rna.reset_link_travel_times(network);
        return rna;
    }

    pub fn params(&self) -> &AssignmentParams {
        &self.params
    }

    pub fn route_choice_params(&self) -> &RouteChoiceParams {
        &self.route_choice
    }

    pub fn energy_params(&self) -> &EnergyParams {
        &self.energy
    }

    pub fn set_energy_unit_cost(&mut self, energy: EnergyType, cost: f64) {
        self.energy.set_energy_unit_cost(energy, cost);
    }

    pub fn set_engine_type_fractions(&mut self, vehicle: VehicleType,
                                     fractions: Vec<(EngineType, f64)>) {
        self.energy.set_engine_type_fractions(vehicle, fractions);
    }

    pub fn set_use_route_choice_model(&mut self, use_route_choice: bool) {
        self.params.use_route_choice_model = use_route_choice;
    }

    // state transitions

    /// Clears link volumes and stored trips.  Link travel times are kept.
    pub fn reset(&mut self) {
        self.reset_link_volumes();
        self.reset_trip_storages();
    }

    pub fn reset_link_volumes(&mut self) {
        self.passenger.reset_volumes();
        self.freight.reset_volumes();
    }

    pub fn reset_trip_storages(&mut self) {
        self.passenger.trips.clear();
        self.freight.trips.clear();
        self.dropped_trips = 0;
    }

    /// Sets every hour's link travel times back to free-flow times.
    pub fn reset_link_travel_times(&mut self, network: &RoadNetwork) {
        self.link_travel_times = vec![network.free_flow_times().clone(); TimeOfDay::ALL.len()];
    }

    /// Disaggregates a zone-to-zone passenger matrix into car trips, with start and end nodes
    /// drawn by population inside each zone.  Returns the number of trips assigned.
    pub fn assign_passenger_flows<R: Rng>(&mut self, network: &RoadNetwork, odm: &ZoneMatrix,
                                          route_sets: Option<&RouteSetGenerator>, rng: &mut R)
                                          -> usize {
        let sampler = TripSampler::new(&self.params.time_of_day_distribution, &self.energy);
        let mut endpoints = EndpointSampler::new(network, false);
        let mut cache = RouteCache::default();
        let mut assigned = 0;
        let mut dropped = 0;

        for ((origin_zone, destination_zone), _) in odm.iter() {
            let key = (origin_zone.clone(), destination_zone.clone());
            for _ in 0..odm.int_flow(&key) {
                let vehicle = if rng.gen::<f64>() < self.params.av_fraction {
                    VehicleType::Av
                } else {
                    VehicleType::Car
                };
                let engine = sampler.engine(vehicle, rng);
                let hour = sampler.hour(rng);
                let ends = (endpoints.sample(origin_zone, true, rng),
                            endpoints.sample(destination_zone, false, rng));
                let (origin, destination) = match ends {
                    (Some(origin), Some(destination)) => (origin, destination),
                    _ => {
                        dropped += 1;
                        continue;
                    }
                };
                let route = match self.resolve_route(network, origin, destination, vehicle,
                                                     engine, hour, route_sets, &mut cache, rng) {
                    Some(route) => route,
                    None => {
                        dropped += 1;
                        continue;
                    }
                };
                let trip = Trip {
                    vehicle,
                    engine,
                    time_of_day: hour,
                    route,
                    ends: TripEnds::Zones {
                        origin: origin_zone.clone(),
                        destination: destination_zone.clone(),
                    },
                    access_distance: access_distance(network, origin, false),
                    egress_distance: access_distance(network, destination, false),
                };
                self.passenger.accumulate(trip);
                assigned += 1;
            }
        }
        self.record_dropped("passenger", dropped);
        assigned
    }

    /// Assigns a matrix of fine-grained zones, each served by its nearest usable node.  In
    /// `combined` mode only trips within one administrative zone use the fine zones' nodes;
    /// the others are drawn by population inside the enclosing administrative zones.
    pub fn assign_fine_zone_flows<R: Rng>(&mut self, network: &RoadNetwork, odm: &ZoneMatrix,
                                          zoning: &Zoning, combined: bool,
                                          route_sets: Option<&RouteSetGenerator>, rng: &mut R)
                                          -> usize {
        let sampler = TripSampler::new(&self.params.time_of_day_distribution, &self.energy);
        let mut endpoints = EndpointSampler::new(network, false);
        let mut cache = RouteCache::default();
        let mut assigned = 0;
        let mut dropped = 0;

        for ((origin_zone, destination_zone), _) in odm.iter() {
            let key = (origin_zone.clone(), destination_zone.clone());
            let origin_lad = zoning.zone_lad(origin_zone);
            let use_lads = combined && origin_lad.is_some() &&
                origin_lad != zoning.zone_lad(destination_zone);
            for _ in 0..odm.int_flow(&key) {
                let vehicle = if rng.gen::<f64>() < self.params.av_fraction {
                    VehicleType::Av
                } else {
                    VehicleType::Car
                };
                let engine = sampler.engine(vehicle, rng);
                let hour = sampler.hour(rng);
                let ends = if use_lads {
                    let origin_lad = zoning.zone_lad(origin_zone).unwrap_or("");
                    let destination_lad = zoning.zone_lad(destination_zone).unwrap_or("");
                    (endpoints.sample(origin_lad, true, rng),
                     endpoints.sample(destination_lad, false, rng))
                } else {
                    (zoning.origin_node(network, origin_zone),
                     zoning.destination_node(network, destination_zone))
                };
                let (origin, destination) = match ends {
                    (Some(origin), Some(destination)) => (origin, destination),
                    _ => {
                        dropped += 1;
                        continue;
                    }
                };
                let route = match self.resolve_route(network, origin, destination, vehicle,
                                                     engine, hour, route_sets, &mut cache, rng) {
                    Some(route) => route,
                    None => {
                        dropped += 1;
                        continue;
                    }
                };
                let (access, egress) = if use_lads {
                    (access_distance(network, origin, false),
                     access_distance(network, destination, false))
                } else {
                    (centroid_distance(zoning, origin_zone, origin),
                     centroid_distance(zoning, destination_zone, destination))
                };
                let trip = Trip {
                    vehicle,
                    engine,
                    time_of_day: hour,
                    route,
                    ends: TripEnds::Zones {
                        origin: origin_zone.clone(),
                        destination: destination_zone.clone(),
                    },
                    access_distance: access,
                    egress_distance: egress,
                };
                self.passenger.accumulate(trip);
                assigned += 1;
            }
        }
        self.record_dropped("fine-zone passenger", dropped);
        assigned
    }

    /// Disaggregates a freight matrix.  Point freight zones use their nearest node; zonal ones
    /// draw nodes by workplace population.
    pub fn assign_freight_flows<R: Rng>(&mut self, network: &RoadNetwork, fm: &FreightMatrix,
                                        route_sets: Option<&RouteSetGenerator>, rng: &mut R)
                                        -> usize {
        let sampler = TripSampler::new(&self.params.time_of_day_distribution_freight,
                                       &self.energy);
        let mut endpoints = EndpointSampler::new(network, true);
        let mut cache = RouteCache::default();
        let mut assigned = 0;
        let mut dropped = 0;

        for (key, _) in fm.iter() {
            for _ in 0..fm.int_flow(key) {
                let engine = sampler.engine(key.vehicle, rng);
                let hour = sampler.hour(rng);
                let origin = freight_node(network, &mut endpoints, key.origin, true, rng);
                let destination = freight_node(network, &mut endpoints, key.destination, false,
                                               rng);
                let (origin, destination) = match (origin, destination) {
                    (Some(origin), Some(destination)) => (origin, destination),
                    _ => {
                        dropped += 1;
                        continue;
                    }
                };
                let route = match self.resolve_route(network, origin, destination, key.vehicle,
                                                     engine, hour, route_sets, &mut cache, rng) {
                    Some(route) => route,
                    None => {
                        dropped += 1;
                        continue;
                    }
                };
                let trip = Trip {
                    vehicle: key.vehicle,
                    engine,
                    time_of_day: hour,
                    route,
                    ends: TripEnds::FreightZones {
                        origin: key.origin,
                        destination: key.destination,
                    },
                    access_distance: access_distance(network, origin, true),
                    egress_distance: access_distance(network, destination, true),
                };
                self.freight.accumulate(trip);
                assigned += 1;
            }
        }
        self.record_dropped("freight", dropped);
        assigned
    }

    fn record_dropped(&mut self, segment: &str, dropped: usize) {
        if dropped > 0 {
            log::warn!("Dropped {} {} trips without endpoints or a route", dropped, segment);
        }
        self.dropped_trips += dropped;
    }

    /// A route for one trip: a draw from the pair's route set under route choice, otherwise
    /// the fastest path under the current link times of the trip's hour.
    #[allow(clippy::too_many_arguments)]
    fn resolve_route<R: Rng>(&self, network: &RoadNetwork, origin: NodeId, destination: NodeId,
                             vehicle: VehicleType, engine: EngineType, hour: TimeOfDay,
                             route_sets: Option<&RouteSetGenerator>, cache: &mut RouteCache,
                             rng: &mut R) -> Option<Route> {
        if origin == destination {
            return Some(Route::single_node(origin));
        }
        let link_times = &self.link_travel_times[hour.index()];

        if self.params.use_route_choice_model {
            if let Some(route_set) = route_sets.and_then(|rs| rs.route_set(origin, destination)) {
                let key = (origin, destination, vehicle, engine, hour);
                let choice_set = cache.choice_sets.entry(key).or_insert_with(|| {
                    let mut choice_set = route_set.clone();
                    let ctx = UtilityContext {
                        vehicle,
                        engine,
                        link_times,
                        energy: &self.energy,
                        params: &self.route_choice,
                    };
                    choice_set.calculate_choice_probabilities(network, &ctx);
                    choice_set
                });
                if let Some(route) = choice_set.choose(rng) {
                    return Some(route.clone());
                }
            }
            log::debug!("No route set from {} to {}; using the fastest path", origin,
                        destination);
        }

        cache.fastest.entry((origin, destination, hour))
            .or_insert_with(|| {
                network.fastest_path(origin, destination, Some(link_times))
                    .map(|path| Route::from_path(&path))
            })
            .clone()
    }

    /// Recomputes every hour's link travel times from that hour's volume in PCU, smoothed
    /// against the previous times with the configured averaging weight.
    pub fn update_link_travel_times(&mut self, network: &RoadNetwork) {
        let weight = self.params.link_travel_time_averaging_weight;
        self.update_link_travel_times_with_weight(network, weight);
    }

    /// `weight` times the congested time plus `1 - weight` times the previous time.
    pub fn update_link_travel_times_with_weight(&mut self, network: &RoadNetwork, weight: f64) {
        for hour in TimeOfDay::ALL.iter() {
            let hh = hour.index();
            let mut updated = HashMap::new();
            for edge in network.edges() {
                let fft = network.free_flow_time(edge.id).unwrap_or(f64::NAN);
                let pcu = self.passenger.pcu_volumes_per_hour[hh].get(&edge.id).unwrap_or(&0.) +
                    self.freight.pcu_volumes_per_hour[hh].get(&edge.id).unwrap_or(&0.);
                let congested = self.congested_time(edge, fft, pcu);
                let previous = self.link_travel_times[hh].get(&edge.id).cloned().unwrap_or(fft);
                updated.insert(edge.id, weight * congested + (1. - weight) * previous);
            }
            self.link_travel_times[hh] = updated;
        }
    }

    /// Free-flow time inflated by the hourly volume per lane relative to capacity.  Ferries
    /// and lane-less edges are not congestible.
    fn congested_time(&self, edge: &Edge, fft: f64, hourly_pcu: f64) -> f64 {
        let (capacity, beta) = match edge.class {
            RoadClass::Motorway => (self.params.maximum_capacity_m_road, self.params.beta_m_road),
            RoadClass::ARoad => (self.params.maximum_capacity_a_road, self.params.beta_a_road),
            _ => return fft,
        };
        if edge.lanes == 0 {
            return fft;
        }
        let flow = hourly_pcu / edge.lanes as f64;
        fft * (1. + self.params.alpha * (flow / capacity).powf(beta))
    }

    pub fn link_travel_times(&self, hour: TimeOfDay) -> &HashMap<EdgeId, f64> {
        &self.link_travel_times[hour.index()]
    }

    pub fn copy_of_link_travel_times(&self) -> Vec<HashMap<EdgeId, f64>> {
        self.link_travel_times.clone()
    }

    /// Sum over hours and edges of the absolute change against an earlier copy.
    pub fn absolute_difference_in_link_travel_times(&self, other: &[HashMap<EdgeId, f64>])
                                                    -> f64 {
        let mut difference = 0.;
        for (current, previous) in self.link_travel_times.iter().zip(other) {
            for (edge, time) in current {
                if let Some(old) = previous.get(edge) {
                    difference += (time - old).abs();
                }
            }
        }
        difference
    }

    // trips and volumes

    pub fn passenger_trips(&self) -> &[Trip] {
        &self.passenger.trips
    }

    pub fn freight_trips(&self) -> &[Trip] {
        &self.freight.trips
    }

    pub fn dropped_trips(&self) -> usize {
        self.dropped_trips
    }

    /// Number of stored passenger trips per zone pair.
    pub fn trips_per_zone_pair(&self) -> BTreeMap<ZonePair, usize> {
        let mut counts = BTreeMap::new();
        for trip in &self.passenger.trips {
            if let TripEnds::Zones{origin, destination} = &trip.ends {
                *counts.entry((origin.clone(), destination.clone())).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of stored freight trips per freight key.
    pub fn trips_per_freight_key(&self) -> BTreeMap<FreightKey, usize> {
        let mut counts = BTreeMap::new();
        for trip in &self.freight.trips {
            if let TripEnds::FreightZones{origin, destination} = &trip.ends {
                *counts.entry(FreightKey::new(*origin, *destination, trip.vehicle))
                    .or_insert(0) += 1;
            }
        }
        counts
    }

    /// Daily vehicle counts per edge, passenger and freight combined.
    pub fn link_volumes_per_vehicle_type(&self) -> BTreeMap<VehicleType, HashMap<EdgeId, f64>> {
        let mut combined: BTreeMap<VehicleType, HashMap<EdgeId, f64>> = BTreeMap::new();
        for accumulator in &[&self.passenger, &self.freight] {
            for (vehicle, volumes) in &accumulator.volumes {
                let entry = combined.entry(*vehicle).or_insert_with(HashMap::new);
                for (edge, volume) in volumes {
                    *entry.entry(*edge).or_insert(0.) += volume;
                }
            }
        }
        combined
    }

    pub fn link_volume(&self, vehicle: VehicleType, edge: EdgeId) -> f64 {
        [&self.passenger, &self.freight].iter()
            .filter_map(|acc| acc.volumes.get(&vehicle).and_then(|vv| vv.get(&edge)))
            .sum()
    }

    pub fn link_volumes_in_pcu_per_hour(&self) -> Vec<HashMap<EdgeId, f64>> {
        let mut combined = self.passenger.pcu_volumes_per_hour.clone();
        for (hourly, freight) in combined.iter_mut().zip(&self.freight.pcu_volumes_per_hour) {
            for (edge, volume) in freight {
                *hourly.entry(*edge).or_insert(0.) += volume;
            }
        }
        combined
    }

    /// Daily volume per edge in passenger-car units.
    pub fn link_volumes_in_pcu(&self) -> HashMap<EdgeId, f64> {
        let mut daily = HashMap::new();
        for hourly in self.link_volumes_in_pcu_per_hour() {
            for (edge, volume) in hourly {
                *daily.entry(edge).or_insert(0.) += volume;
            }
        }
        daily
    }

    // statistics

    /// Peak-hour PCU flow per edge, as a share of daily flow.
    pub fn peak_link_point_capacities(&self, network: &RoadNetwork) -> HashMap<EdgeId, f64> {
        let daily = self.link_volumes_in_pcu();
        network.edges()
            .map(|edge| {
                let volume = daily.get(&edge.id).cloned().unwrap_or(0.);
                (edge.id, volume * self.params.peak_hour_percentage)
            })
            .collect()
    }

    /// Peak-hour flow as a percentage of lane capacity, for congestible edges.
    pub fn peak_link_capacity_utilisation(&self, network: &RoadNetwork) -> HashMap<EdgeId, f64> {
        let point_capacities = self.peak_link_point_capacities(network);
        let mut utilisation = HashMap::new();
        for edge in network.edges() {
            let max_capacity = match edge.class {
                RoadClass::Motorway => self.params.maximum_capacity_m_road,
                RoadClass::ARoad => self.params.maximum_capacity_a_road,
                _ => continue,
            };
            if edge.lanes == 0 {
                continue;
            }
            let flow = point_capacities.get(&edge.id).cloned().unwrap_or(0.);
            utilisation.insert(edge.id, flow / (edge.lanes as f64 * max_capacity) * 100.);
        }
        utilisation
    }

    /// Peak-hour vehicles per km per lane, at the speed implied by the 8am link times.
    pub fn peak_link_densities(&self, network: &RoadNetwork) -> HashMap<EdgeId, f64> {
        let point_capacities = self.peak_link_point_capacities(network);
        let times = &self.link_travel_times[TimeOfDay::EIGHT_AM.index()];
        let mut densities = HashMap::new();
        for edge in network.edges() {
            let time = match times.get(&edge.id) {
                Some(time) if *time > 0. => *time,
                _ => continue,
            };
            if edge.lanes == 0 {
                continue;
            }
            let speed = edge.length_km / (time / 60.);
            let flow = point_capacities.get(&edge.id).cloned().unwrap_or(0.);
            densities.insert(edge.id, flow / edge.lanes as f64 / speed);
        }
        densities
    }

    fn all_trips(&self) -> impl Iterator<Item = &Trip> {
        self.passenger.trips.iter().chain(self.freight.trips.iter())
    }

    /// Total energy used by all trips, per energy type.
    pub fn energy_consumptions(&self, network: &RoadNetwork) -> BTreeMap<EnergyType, f64> {
        let mut consumptions: BTreeMap<EnergyType, f64> =
            EnergyType::ALL.iter().map(|ee| (*ee, 0.)).collect();
        for trip in self.all_trips() {
            *consumptions.entry(trip.engine.energy_type()).or_insert(0.) +=
                trip.consumption(network, &self.energy);
        }
        consumptions
    }

    /// kg of CO2 emitted by all trips, per energy type.
    pub fn co2_emissions(&self, network: &RoadNetwork) -> BTreeMap<EnergyType, f64> {
        let mut emissions: BTreeMap<EnergyType, f64> =
            EnergyType::ALL.iter().map(|ee| (*ee, 0.)).collect();
        for trip in self.all_trips() {
            *emissions.entry(trip.engine.energy_type()).or_insert(0.) +=
                trip.co2(network, &self.energy);
        }
        emissions
    }

    /// Volume times length, summed per edge zone and vehicle type.
    pub fn vehicle_kilometres(&self, network: &RoadNetwork)
                              -> BTreeMap<String, BTreeMap<VehicleType, f64>> {
        let mut vkm: BTreeMap<String, BTreeMap<VehicleType, f64>> = BTreeMap::new();
        for (vehicle, volumes) in self.link_volumes_per_vehicle_type() {
            for (edge_id, volume) in volumes {
                let (zone, edge) = match (network.edge_zone(edge_id), network.edge(edge_id)) {
                    (Some(zone), Some(edge)) => (zone, edge),
                    _ => continue,
                };
                *vkm.entry(String::from(zone)).or_insert_with(BTreeMap::new)
                    .entry(vehicle).or_insert(0.) += volume * edge.length_km;
            }
        }
        vkm
    }

    fn passenger_skim<F>(&self, mut value_of: F) -> SkimMatrix
    where F: FnMut(&Trip) -> f64,
    {
        let mut sums: BTreeMap<ZonePair, (f64, usize)> = BTreeMap::new();
        for trip in &self.passenger.trips {
            if let TripEnds::Zones{origin, destination} = &trip.ends {
                let entry = sums.entry((origin.clone(), destination.clone())).or_insert((0., 0));
                entry.0 += value_of(trip);
                entry.1 += 1;
            }
        }
        let mut skim = SkimMatrix::new();
        for (key, (sum, count)) in sums {
            skim.set_cost(key, sum / count as f64);
        }
        skim
    }

    fn freight_skim<F>(&self, mut value_of: F) -> SkimMatrix<FreightKey>
    where F: FnMut(&Trip) -> f64,
    {
        let mut sums: BTreeMap<FreightKey, (f64, usize)> = BTreeMap::new();
        for trip in &self.freight.trips {
            if let TripEnds::FreightZones{origin, destination} = &trip.ends {
                let key = FreightKey::new(*origin, *destination, trip.vehicle);
                let entry = sums.entry(key).or_insert((0., 0));
                entry.0 += value_of(trip);
                entry.1 += 1;
            }
        }
        let mut skim = SkimMatrix::new();
        for (key, (sum, count)) in sums {
            skim.set_cost(key, sum / count as f64);
        }
        skim
    }

    fn trip_time(&self, network: &RoadNetwork, trip: &Trip) -> f64 {
        let speed = if trip.is_freight() {
            self.params.access_egress_speed_freight
        } else {
            self.params.access_egress_speed_car
        };
        trip.time_min(network, &self.link_travel_times[trip.time_of_day.index()],
                      self.route_choice.average_intersection_delay, speed)
    }

    /// Mean passenger trip time in minutes per zone pair, under the current link times.
    pub fn calculate_time_skim_matrix(&self, network: &RoadNetwork) -> SkimMatrix {
        self.passenger_skim(|trip| self.trip_time(network, trip))
    }

    pub fn calculate_cost_skim_matrix(&self, network: &RoadNetwork) -> SkimMatrix {
        self.passenger_skim(|trip| trip.cost(network, &self.energy))
    }

    /// Mean passenger trip length in km per zone pair.
    pub fn calculate_distance_skim_matrix(&self, network: &RoadNetwork) -> SkimMatrix {
        self.passenger_skim(|trip| trip.length_km(network))
    }

    pub fn calculate_time_skim_matrix_freight(&self, network: &RoadNetwork)
                                              -> SkimMatrix<FreightKey> {
        self.freight_skim(|trip| self.trip_time(network, trip))
    }

    pub fn calculate_cost_skim_matrix_freight(&self, network: &RoadNetwork)
                                              -> SkimMatrix<FreightKey> {
        self.freight_skim(|trip| trip.cost(network, &self.energy))
    }

    // goodness of fit

    fn simulated_volume(&self, edge: EdgeId, classes: &HashSet<VehicleType>) -> f64 {
        VehicleType::ALL.iter()
            .filter(|vv| classes.contains(&count_class(**vv)))
            .map(|vv| self.link_volume(*vv, edge))
            .sum()
    }

    /// Simulated against observed volumes for every counted edge.  A count point covering both
    /// directions is compared once, against the sum of both directed edges.
    pub fn count_comparisons(&self, network: &RoadNetwork, vehicles: &[VehicleType])
                             -> Vec<CountComparison> {
        let classes: HashSet<VehicleType> = vehicles.iter().map(|vv| count_class(*vv)).collect();
        let mut edges: Vec<&Edge> = network.edges()
            .filter(|ee| ee.observed_counts.is_some() && ee.count_point.is_some())
            .collect();
        edges.sort_by_key(|ee| ee.id);

        let mut seen_combined = HashSet::new();
        let mut comparisons = vec![];
        for edge in edges {
            let (count_point, counts) = match (edge.count_point, &edge.observed_counts) {
                (Some(cp), Some(counts)) => (cp, counts),
                _ => continue,
            };
            let observed: f64 = classes.iter().map(|cc| counts.for_vehicle(*cc)).sum();
            let mut counted_edges = vec![edge.id];
            if edge.direction == Some(CountDirection::Combined) {
                if !seen_combined.insert(count_point) {
                    continue;
                }
                if let Some(reverse) = network.reverse_edge(edge.id) {
                    counted_edges.push(reverse);
                }
            }
            let simulated: f64 = counted_edges.iter()
                .map(|ee| self.simulated_volume(*ee, &classes))
                .sum();
            comparisons.push(CountComparison {
                count_point,
                edges: counted_edges,
                simulated,
                observed,
            });
        }
        comparisons
    }

    /// RMSN over all vehicle types.
    pub fn calculate_rmsn(&self, network: &RoadNetwork) -> f64 {
        self.calculate_rmsn_for_vehicle_types(network, &VehicleType::ALL)
    }

    pub fn calculate_rmsn_for_vehicle_types(&self, network: &RoadNetwork,
                                            vehicles: &[VehicleType]) -> f64 {
        rmsn(&self.count_comparisons(network, vehicles))
    }

    /// Observed over simulated volume on every counted edge with traffic, per count class.
    fn count_ratios(&self, network: &RoadNetwork) -> HashMap<(EdgeId, VehicleType), f64> {
        let mut ratios = HashMap::new();
        for class in [VehicleType::Car, VehicleType::Van, VehicleType::Rigid,
                      VehicleType::Artic].iter() {
            for comparison in self.count_comparisons(network, &[*class]) {
                if comparison.simulated > 0. {
                    let ratio = comparison.observed / comparison.simulated;
                    for edge in comparison.edges {
                        ratios.insert((edge, *class), ratio);
                    }
                }
            }
        }
        ratios
    }

    fn scaling_factors<K, F>(trips: &[Trip], ratios: &HashMap<(EdgeId, VehicleType), f64>,
                             key_of: F) -> OdMatrix<K>
    where K: Ord + Clone,
          F: Fn(&Trip) -> Option<K>,
    {
        let mut sums: BTreeMap<K, (f64, usize)> = BTreeMap::new();
        for trip in trips {
            let key = match key_of(trip) {
                Some(key) => key,
                None => continue,
            };
            let entry = sums.entry(key).or_insert((0., 0));
            for edge in trip.route.edges() {
                if let Some(ratio) = ratios.get(&(*edge, count_class(trip.vehicle))) {
                    entry.0 += ratio;
                    entry.1 += 1;
                }
            }
        }
        let mut factors = OdMatrix::new();
        for (key, (sum, count)) in sums {
            let factor = if count > 0 { sum / count as f64 } else { 1. };
            factors.set_flow(key, factor);
        }
        factors
    }

    /// Per zone pair, the mean observed-over-simulated ratio along the routes its trips took.
    pub fn passenger_scaling_factors(&self, network: &RoadNetwork) -> ZoneMatrix {
        let ratios = self.count_ratios(network);
        RoadNetworkAssignment::scaling_factors(&self.passenger.trips, &ratios, |trip| {
            match &trip.ends {
                TripEnds::Zones{origin, destination} =>
                    Some((origin.clone(), destination.clone())),
                _ => None,
            }
        })
    }

    pub fn freight_scaling_factors(&self, network: &RoadNetwork) -> FreightMatrix {
        let ratios = self.count_ratios(network);
        RoadNetworkAssignment::scaling_factors(&self.freight.trips, &ratios, |trip| {
            match &trip.ends {
                TripEnds::FreightZones{origin, destination} =>
                    Some(FreightKey::new(*origin, *destination, trip.vehicle)),
                _ => None,
            }
        })
    }
}

fn access_distance(network: &RoadNetwork, node: NodeId, freight: bool) -> f64 {
    match network.node(node) {
        Some(nn) if freight => nn.freight_access_egress_distance,
        Some(nn) => nn.access_egress_distance,
        None => 0.,
    }
}

fn centroid_distance(zoning: &Zoning, zone: &str, node: NodeId) -> f64 {
    zoning.sorted_nodes(zone).iter()
        .find(|(nn, _)| *nn == node)
        .map_or(0., |(_, distance)| *distance)
}

fn freight_node<R: Rng>(network: &RoadNetwork, endpoints: &mut EndpointSampler,
                        freight_zone: u32, as_origin: bool, rng: &mut R) -> Option<NodeId> {
    if let Some(node) = network.freight_zone_node(freight_zone) {
        let usable = if as_origin {
            !network.is_start_blacklisted(node)
        } else {
            !network.is_end_blacklisted(node)
        };
        return if usable { Some(node) } else { None };
    }
    let zone = network.freight_zone_zone(freight_zone)?;
    endpoints.sample(zone, as_origin, rng)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::RouteGenerationParams;
    use super::super::test_utils::{seeded_rng, small_network};
    use super::super::zoning::small_zoning;
    use approx::{assert_abs_diff_eq, assert_ulps_eq};

    fn small_assignment(network: &RoadNetwork) -> RoadNetworkAssignment {
        RoadNetworkAssignment::new(network, AssignmentParams::default(),
                                   RouteChoiceParams::default(), EnergyParams::default())
    }

    fn small_odm() -> ZoneMatrix {
        let mut odm = ZoneMatrix::new();
        odm.set_zone_flow("E01", "E01", 20.);
        odm.set_zone_flow("E01", "E02", 150.);
        odm.set_zone_flow("E02", "E01", 80.4);
        odm.set_zone_flow("E02", "E02", 10.);
        odm
    }

    #[test]
    fn test_trips_match_flows() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        let odm = small_odm();
        let assigned = rna.assign_passenger_flows(&network, &odm, None, &mut seeded_rng());
        assert_eq!(assigned as u64, odm.total_int_flow());
        assert_eq!(rna.dropped_trips(), 0);
        let per_pair = rna.trips_per_zone_pair();
        for (key, _) in odm.iter() {
            assert_eq!(per_pair[key] as u64, odm.int_flow(key));
        }
        for trip in rna.passenger_trips() {
            assert!(trip.route.is_valid(&network));
            assert_eq!(trip.vehicle, VehicleType::Car);
            assert_eq!(network.node_zone(trip.origin_node()),
                       match &trip.ends { TripEnds::Zones{origin, ..} => Some(origin.as_str()),
                                          _ => None });
        }
    }

    #[test]
    fn test_volumes_follow_routes() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        rna.assign_passenger_flows(&network, &small_odm(), None, &mut seeded_rng());
        let mut expected: HashMap<EdgeId, f64> = HashMap::new();
        for trip in rna.passenger_trips() {
            for edge in trip.route.edges() {
                *expected.entry(*edge).or_insert(0.) += 1.;
            }
        }
        let volumes = rna.link_volumes_per_vehicle_type();
        assert_eq!(volumes[&VehicleType::Car], expected);
        let pcu = rna.link_volumes_in_pcu();
        for (edge, volume) in expected {
            assert_ulps_eq!(pcu[&edge], volume);
        }
        rna.reset();
        assert!(rna.passenger_trips().is_empty());
        assert!(rna.link_volumes_in_pcu().is_empty());
    }

    #[test]
    fn test_travel_times_never_below_free_flow() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        for hour in TimeOfDay::ALL.iter() {
            assert_eq!(rna.link_travel_times(*hour), network.free_flow_times());
        }
        let mut rng = seeded_rng();
        for _ in 0..3 {
            rna.reset();
            rna.assign_passenger_flows(&network, &small_odm().scaled(100.), None, &mut rng);
            rna.update_link_travel_times_with_weight(&network, 0.9);
            for hour in TimeOfDay::ALL.iter() {
                for (edge, time) in rna.link_travel_times(*hour) {
                    assert!(*time >= network.free_flow_time(*edge).unwrap() - 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_weighted_averaging() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        rna.assign_passenger_flows(&network, &small_odm().scaled(100.), None,
                                   &mut seeded_rng());
        let previous = rna.copy_of_link_travel_times();
        let mut unsmoothed = rna.clone();
        unsmoothed.update_link_travel_times_with_weight(&network, 1.);
        rna.update_link_travel_times_with_weight(&network, 0.9);
        for hour in TimeOfDay::ALL.iter() {
            for (edge, time) in rna.link_travel_times(*hour) {
                let recomputed = unsmoothed.link_travel_times(*hour)[edge];
                let old = previous[hour.index()][edge];
                assert_abs_diff_eq!(*time, 0.9 * recomputed + 0.1 * old, epsilon = 1e-11);
            }
        }
        assert!(rna.absolute_difference_in_link_travel_times(&previous) > 0.);
    }

    #[test]
    fn test_congested_time() {
        let network = small_network();
        let rna = small_assignment(&network);
        let params = AssignmentParams::default();
        let motorway = network.edge(1).unwrap();
        let fft = network.free_flow_time(1).unwrap();
        // three lanes at full capacity
        let pcu = 3. * params.maximum_capacity_m_road;
        assert_ulps_eq!(rna.congested_time(motorway, fft, pcu), fft * (1. + params.alpha));
        assert_ulps_eq!(rna.congested_time(motorway, fft, 0.), fft);
    }

    #[test]
    fn test_route_choice_assignment() {
        let network = small_network();
        let mut generator = RouteSetGenerator::new(RouteGenerationParams::default());
        let mut pairs = vec![];
        for origin in &[1, 2, 4] {
            for destination in &[3, 6] {
                pairs.push((*origin, *destination));
            }
        }
        // 4 -> 6 is left out and falls back to the fastest path
        pairs.retain(|pair| *pair != (4, 6));
        generator.generate_route_sets(&network, &pairs, &mut seeded_rng());
        let mut params = AssignmentParams::default();
        params.use_route_choice_model = true;
        let mut rna = RoadNetworkAssignment::new(&network, params, RouteChoiceParams::default(),
                                                 EnergyParams::default());
        let mut odm = ZoneMatrix::new();
        odm.set_zone_flow("E01", "E02", 200.);
        let assigned = rna.assign_passenger_flows(&network, &odm, Some(&generator),
                                                  &mut seeded_rng());
        assert_eq!(assigned, 200);
        for trip in rna.passenger_trips() {
            assert!(trip.route.is_valid(&network));
            match generator.route_set(trip.origin_node(), trip.destination_node()) {
                Some(route_set) => assert!(route_set.contains_edges(trip.route.edges())),
                None => assert_eq!(trip.route.edges(), &[6, 8, 10]),
            }
        }
    }

    #[test]
    fn test_freight_assignment() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        let mut fm = FreightMatrix::new();
        fm.set_flow(FreightKey::new(1, 2, VehicleType::Van), 10.);
        fm.set_flow(FreightKey::new(1, 1500, VehicleType::Artic), 4.);
        // freight zone 1500 maps to node 6, which cannot start a trip
        fm.set_flow(FreightKey::new(1500, 1, VehicleType::Rigid), 3.);
        let assigned = rna.assign_freight_flows(&network, &fm, None, &mut seeded_rng());
        assert_eq!(assigned, 14);
        assert_eq!(rna.dropped_trips(), 3);
        let per_key = rna.trips_per_freight_key();
        assert_eq!(per_key[&FreightKey::new(1, 1500, VehicleType::Artic)], 4);
        for trip in rna.freight_trips() {
            if let TripEnds::FreightZones{destination: 1500, ..} = trip.ends {
                assert_eq!(trip.destination_node(), 6);
            }
            // workplaces in E01 are all mapped to node 1
            assert_eq!(trip.origin_node(), 1);
        }
        assert!(rna.passenger_trips().is_empty());
        let artic_volume = rna.link_volume(VehicleType::Artic, 1);
        assert_ulps_eq!(artic_volume, 4.);
        let pcu = rna.link_volumes_in_pcu();
        assert!(pcu[&1] >= 4. * 2.9);
    }

    #[test]
    fn test_fine_zone_assignment() {
        let network = small_network();
        let zoning = small_zoning(&network);
        let mut odm = ZoneMatrix::new();
        odm.set_zone_flow("t1", "t3", 12.);
        odm.set_zone_flow("t2", "t1", 5.);
        let mut rna = small_assignment(&network);
        let assigned = rna.assign_fine_zone_flows(&network, &odm, &zoning, false, None,
                                                  &mut seeded_rng());
        assert_eq!(assigned, 17);
        for trip in rna.passenger_trips() {
            match &trip.ends {
                TripEnds::Zones{origin, ..} if origin == "t1" => {
                    assert_eq!(trip.origin_node(), 1);
                    assert_eq!(trip.destination_node(), 5);
                    assert_ulps_eq!(trip.access_distance, 100.);
                }
                _ => assert_eq!(trip.origin_node(), 4),
            }
        }

        // t1 -> t3 crosses administrative zones, so combined mode samples E01 and E02 nodes
        let mut combined = small_assignment(&network);
        combined.assign_fine_zone_flows(&network, &odm, &zoning, true, None, &mut seeded_rng());
        for trip in combined.passenger_trips() {
            if let TripEnds::Zones{origin, ..} = &trip.ends {
                if origin == "t1" {
                    assert_eq!(network.node_zone(trip.origin_node()), Some("E01"));
                    assert_eq!(network.node_zone(trip.destination_node()), Some("E02"));
                }
            }
        }
    }

    #[test]
    fn test_rmsn() {
        let comparisons = vec![
            CountComparison{count_point: 1, edges: vec![1], simulated: 90., observed: 100.},
            CountComparison{count_point: 2, edges: vec![2], simulated: 60., observed: 50.},
        ];
        let expected = (2f64 * (100. + 100.)).sqrt() / 150. * 100.;
        assert_ulps_eq!(rmsn(&comparisons), expected);
        assert!(rmsn(&[]).is_nan());
    }

    #[test]
    fn test_count_comparisons() {
        let network = small_network();
        let rna = small_assignment(&network);
        let comparisons = rna.count_comparisons(&network, &VehicleType::ALL);
        // 101 and 104 are combined and compared once; 102 has two directions
        let cps: Vec<u32> = comparisons.iter().map(|cc| cc.count_point).collect();
        assert_eq!(cps, vec![101, 102, 102, 103, 104, 105]);
        assert_eq!(comparisons[0].edges, vec![1, 2]);
        assert_ulps_eq!(comparisons[0].observed, 120.);
        let cars = rna.count_comparisons(&network, &[VehicleType::Av]);
        assert_ulps_eq!(cars[0].observed, 100.);
        // nothing assigned yet, so the error is the full observed count
        assert_ulps_eq!(rna.calculate_rmsn(&network),
                        rmsn(&comparisons));
        assert!(rna.calculate_rmsn(&network) > 0.);
    }

    #[test]
    fn test_statistics() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        rna.assign_passenger_flows(&network, &small_odm(), None, &mut seeded_rng());
        rna.update_link_travel_times(&network);

        let utilisation = rna.peak_link_capacity_utilisation(&network);
        let daily = rna.link_volumes_in_pcu();
        let params = AssignmentParams::default();
        let expected = daily.get(&1).cloned().unwrap_or(0.) * params.peak_hour_percentage /
            (3. * params.maximum_capacity_m_road) * 100.;
        assert_ulps_eq!(utilisation[&1], expected);
        assert!(rna.peak_link_densities(&network).values().all(|dd| *dd >= 0.));

        let energy = rna.energy_consumptions(&network);
        let total: f64 = rna.passenger_trips().iter()
            .map(|tt| tt.consumption(&network, rna.energy_params())).sum();
        assert_abs_diff_eq!(energy.values().sum::<f64>(), total, epsilon = 1e-9);
        assert!(rna.co2_emissions(&network)[&EnergyType::Petrol] > 0.);
        assert_ulps_eq!(rna.co2_emissions(&network)[&EnergyType::Electricity], 0.);

        let vkm = rna.vehicle_kilometres(&network);
        let total_vkm: f64 = vkm.values().flat_map(|vv| vv.values()).sum();
        let expected_vkm: f64 = rna.passenger_trips().iter()
            .map(|tt| tt.route.length_km(&network)).sum();
        assert_abs_diff_eq!(total_vkm, expected_vkm, epsilon = 1e-9);
    }

    #[test]
    fn test_skims() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        let odm = small_odm();
        rna.assign_passenger_flows(&network, &odm, None, &mut seeded_rng());
        let time_skim = rna.calculate_time_skim_matrix(&network);
        let distance_skim = rna.calculate_distance_skim_matrix(&network);
        let cost_skim = rna.calculate_cost_skim_matrix(&network);
        assert_eq!(time_skim.len(), odm.len());
        for (key, _) in odm.iter() {
            let trips: Vec<&Trip> = rna.passenger_trips().iter()
                .filter(|tt| tt.ends == TripEnds::Zones{origin: key.0.clone(),
                                                         destination: key.1.clone()})
                .collect();
            let mean_length = trips.iter().map(|tt| tt.length_km(&network)).sum::<f64>() /
                trips.len() as f64;
            assert_abs_diff_eq!(distance_skim.cost(key).unwrap(), mean_length, epsilon = 1e-9);
            assert!(time_skim.cost(key).unwrap() > 0.);
            assert!(cost_skim.cost(key).unwrap() > 0.);
        }
    }

    #[test]
    fn test_scaling_factors() {
        let network = small_network();
        let mut rna = small_assignment(&network);
        let mut odm = ZoneMatrix::new();
        odm.set_zone_flow("E01", "E02", 500.);
        rna.assign_passenger_flows(&network, &odm, None, &mut seeded_rng());
        let factors = rna.passenger_scaling_factors(&network);
        assert_eq!(factors.len(), 1);
        let factor = factors.zone_flow("E01", "E02");
        // observed car counts are far below 500 trips
        assert!(factor > 0. && factor < 1.);
    }
}
