use std::collections::BTreeSet;
use std::path::Path;

use rand::Rng;

use super::assignment::RoadNetworkAssignment;
use super::calibration::{DemandZoning, FreightCalibration, MatrixRebalancer,
                         PassengerCalibration, Spsa};
use super::config::{AssignmentType, TransportConfig};
use super::error::Result;
use super::intervention::{self, Intervention, InterventionRegistry};
use super::od_matrix::{FreightMatrix, ZoneMatrix};
use super::road_network::{NetworkRecords, NodeId, RoadNetwork};
use super::route_set_generator::{RouteSetGenerator, StoreFormat};
use super::skim_matrix::SkimMatrix;
use super::trip::Trip;
use super::zoning::{FineZoneRecord, Zoning};


/// Everything one model run works on: the network, the route stores, the assignment engine
/// and the interventions that may change the network between years.
pub struct TransportModel {
    config: TransportConfig,
    network: RoadNetwork,
    zoning: Option<Zoning>,
    passenger_routes: RouteSetGenerator,
    freight_routes: RouteSetGenerator,
    assignment: RoadNetworkAssignment,
    interventions: Vec<Intervention>,
}

impl TransportModel {
    pub fn new(config: TransportConfig, records: NetworkRecords,
               fine_zones: Option<Vec<FineZoneRecord>>) -> TransportModel {
        let network = RoadNetwork::new(records, config.network.clone());
        let zoning = fine_zones.map(|records| {
            Zoning::new(records, &network, config.route_generation.top_nodes)
        });
        if zoning.is_none() && config.assignment_type != AssignmentType::Lad {
            log::warn!("{:?} assignment needs fine zones; assigning between zones instead",
                       config.assignment_type);
        }
        let assignment = RoadNetworkAssignment::new(&network, config.assignment.clone(),
                                                    config.route_choice.clone(),
                                                    config.energy.clone());
        log::info!("Model has {} nodes and {} edges", network.node_count(),
                   network.edge_count());
        TransportModel {
            passenger_routes: RouteSetGenerator::new(config.route_generation.clone()),
            freight_routes: RouteSetGenerator::new(config.route_generation.clone()),
            config,
            network,
            zoning,
            assignment,
            interventions: vec![],
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn assignment(&self) -> &RoadNetworkAssignment {
        &self.assignment
    }

    pub fn assignment_mut(&mut self) -> &mut RoadNetworkAssignment {
        &mut self.assignment
    }

    pub fn passenger_routes(&self) -> &RouteSetGenerator {
        &self.passenger_routes
    }

    pub fn freight_routes(&self) -> &RouteSetGenerator {
        &self.freight_routes
    }

    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    pub fn add_intervention(&mut self, intervention: Intervention) {
        self.interventions.push(intervention);
    }

    /// Reads every intervention file named in the configuration.
    pub fn load_interventions(&mut self, registry: &InterventionRegistry) -> Result<usize> {
        for path in &self.config.files.intervention_files {
            let intervention = registry.load_from_file(path)?;
            log::info!("Loaded intervention {} from {:?}", intervention.name, path);
            self.interventions.push(intervention);
        }
        Ok(self.config.files.intervention_files.len())
    }

    /// Installs the interventions active in `year` and removes the others, then drops stored
    /// routes the changed network no longer supports.
    pub fn apply_interventions(&mut self, year: u32) -> Result<usize> {
        let changed = intervention::apply_for_year(&mut self.interventions, &mut self.network,
                                                   year)?;
        if changed > 0 {
            self.passenger_routes.remove_invalid_routes(&self.network);
            self.freight_routes.remove_invalid_routes(&self.network);
            self.assignment.reset_link_travel_times(&self.network);
        }
        Ok(changed)
    }

    /// Loads route stores named in the configuration.  Missing files are skipped.
    pub fn load_routes(&mut self) -> Result<usize> {
        let mut added = 0;
        let passenger_file = match self.config.assignment_type {
            AssignmentType::Lad => &self.config.files.passenger_routes,
            _ => &self.config.files.tempro_routes,
        };
        let stores = [(passenger_file, &mut self.passenger_routes),
                      (&self.config.files.freight_routes, &mut self.freight_routes)];
        for (path, routes) in stores {
            if let Some(path) = path {
                if path.exists() {
                    added += routes.read_routes(&self.network, path, true)?;
                } else {
                    log::info!("No route store at {:?}", path);
                }
            }
        }
        Ok(added)
    }

    /// Generates route sets for every OD pair with demand, plus single-node routes.
    pub fn generate_routes<R: Rng>(&mut self, odm: &ZoneMatrix, fm: &FreightMatrix, rng: &mut R)
                                   -> usize {
        let zone_pairs: Vec<(String, String)> = odm.iter()
            .filter(|(_, flow)| **flow > 0.)
            .map(|(key, _)| key.clone())
            .collect();
        let mut added = self.passenger_routes.generate_single_node_routes(&self.network);
        added += match (self.config.assignment_type, &self.zoning) {
            (AssignmentType::Lad, _) | (_, None) =>
                self.passenger_routes.generate_route_sets_for_zones(&self.network, &zone_pairs,
                                                                    rng),
            (_, Some(zoning)) =>
                self.passenger_routes.generate_route_sets_for_fine_zones(&self.network, zoning,
                                                                         &zone_pairs, rng),
        };

        let mut node_pairs = BTreeSet::new();
        for (key, flow) in fm.iter() {
            if *flow <= 0. {
                continue;
            }
            let origins = self.freight_zone_nodes(key.origin, true);
            let destinations = self.freight_zone_nodes(key.destination, false);
            for oo in &origins {
                for dd in &destinations {
                    node_pairs.insert((*oo, *dd));
                }
            }
        }
        let node_pairs: Vec<(NodeId, NodeId)> = node_pairs.into_iter().collect();
        added += self.freight_routes.generate_single_node_routes(&self.network);
        added += self.freight_routes.generate_route_sets(&self.network, &node_pairs, rng);
        log::info!("Generated {} routes", added);
        added
    }

    fn freight_zone_nodes(&self, freight_zone: u32, as_origin: bool) -> Vec<NodeId> {
        if let Some(node) = self.network.freight_zone_node(freight_zone) {
            return vec![node];
        }
        let zone = match self.network.freight_zone_zone(freight_zone) {
            Some(zone) => zone,
            None => return vec![],
        };
        self.network.zone_nodes(zone).iter().cloned()
            .filter(|nn| if as_origin {
                !self.network.is_start_blacklisted(*nn)
            } else {
                !self.network.is_end_blacklisted(*nn)
            })
            .take(self.config.route_generation.top_nodes)
            .collect()
    }

    pub fn save_routes(&self, folder: &Path) -> Result<()> {
        self.passenger_routes.save_routes(&folder.join("passengerRoutes.dat.gz"),
                                          StoreFormat::Gzip)?;
        self.freight_routes.save_routes(&folder.join("freightRoutes.dat.gz"), StoreFormat::Gzip)
    }

    fn assign_once<R: Rng>(&mut self, odm: &ZoneMatrix, fm: &FreightMatrix, rng: &mut R) {
        self.assignment.reset();
        let passenger_routes = Some(&self.passenger_routes);
        match demand_zoning(self.config.assignment_type, &self.zoning) {
            DemandZoning::Lad =>
                self.assignment.assign_passenger_flows(&self.network, odm, passenger_routes, rng),
            DemandZoning::Fine(zoning) =>
                self.assignment.assign_fine_zone_flows(&self.network, odm, zoning, false,
                                                       passenger_routes, rng),
            DemandZoning::Combined(zoning) =>
                self.assignment.assign_fine_zone_flows(&self.network, odm, zoning, true,
                                                       passenger_routes, rng),
        };
        self.assignment.assign_freight_flows(&self.network, fm, Some(&self.freight_routes), rng);
    }

    /// Runs the configured number of assignment passes, smoothing link travel times after each
    /// one.  Returns the RMSN of the last pass against the counts.
    pub fn assign<R: Rng>(&mut self, odm: &ZoneMatrix, fm: &FreightMatrix, rng: &mut R) -> f64 {
        let iterations = self.config.assignment.assignment_iterations.max(1);
        for ii in 0..iterations {
            let previous_times = self.assignment.copy_of_link_travel_times();
            self.assign_once(odm, fm, rng);
            self.assignment.update_link_travel_times(&self.network);
            let change = self.assignment.absolute_difference_in_link_travel_times(&previous_times);
            log::debug!("Assignment pass {}: {} passenger and {} freight trips, travel times \
                         moved by {:.3} min", ii + 1, self.assignment.passenger_trips().len(),
                        self.assignment.freight_trips().len(), change);
        }
        let rmsn = self.assignment.calculate_rmsn(&self.network);
        log::info!("Assigned {} trips; RMSN {:.2}%",
                   self.assignment.passenger_trips().len() + self.assignment.freight_trips().len(),
                   rmsn);
        rmsn
    }

    /// SPSA calibration of the passenger matrix.  Returns the calibrated matrix and the loss
    /// of every iteration.
    pub fn calibrate_passenger_spsa<R: Rng>(&mut self, initial: &ZoneMatrix, rng: &mut R)
                                            -> (ZoneMatrix, Vec<f64>) {
        let zoning = demand_zoning(self.config.assignment_type, &self.zoning);
        let mut target = PassengerCalibration::new(&self.network, &mut self.assignment,
                                                   Some(&self.passenger_routes), zoning);
        let mut spsa = Spsa::new(self.config.spsa.clone());
        let calibrated = spsa.run(&mut target, initial, rng);
        (calibrated, spsa.loss_history().to_vec())
    }

    pub fn calibrate_freight_spsa<R: Rng>(&mut self, initial: &FreightMatrix, rng: &mut R)
                                          -> (FreightMatrix, Vec<f64>) {
        let mut target = FreightCalibration::new(&self.network, &mut self.assignment,
                                                 Some(&self.freight_routes));
        let mut spsa = Spsa::new(self.config.spsa.clone());
        let calibrated = spsa.run(&mut target, initial, rng);
        (calibrated, spsa.loss_history().to_vec())
    }

    /// Count-ratio rebalancing of the passenger matrix.
    pub fn rebalance_passenger<R: Rng>(&mut self, initial: &ZoneMatrix, rng: &mut R)
                                       -> (ZoneMatrix, Vec<f64>) {
        let zoning = demand_zoning(self.config.assignment_type, &self.zoning);
        let mut target = PassengerCalibration::new(&self.network, &mut self.assignment,
                                                   Some(&self.passenger_routes), zoning);
        let mut rebalancer = MatrixRebalancer::new(self.config.rebalancing_iterations);
        let rebalanced = rebalancer.run(&mut target, initial, rng);
        (rebalanced, rebalancer.loss_history().to_vec())
    }

    pub fn rebalance_freight<R: Rng>(&mut self, initial: &FreightMatrix, rng: &mut R)
                                     -> (FreightMatrix, Vec<f64>) {
        let mut target = FreightCalibration::new(&self.network, &mut self.assignment,
                                                 Some(&self.freight_routes));
        let mut rebalancer = MatrixRebalancer::new(self.config.rebalancing_iterations);
        let rebalanced = rebalancer.run(&mut target, initial, rng);
        (rebalanced, rebalancer.loss_history().to_vec())
    }

    /// Writes skims and trip lists of the last assignment into `folder`.
    pub fn write_outputs(&self, folder: &Path) -> Result<()> {
        std::fs::create_dir_all(folder)?;
        let time_skim: SkimMatrix = self.assignment.calculate_time_skim_matrix(&self.network);
        time_skim.write_csv(&folder.join("timeSkimMatrix.csv"))?;
        self.assignment.calculate_cost_skim_matrix(&self.network)
            .write_csv(&folder.join("costSkimMatrix.csv"))?;
        Trip::write_csv(self.assignment.passenger_trips(), &folder.join("passengerTrips.csv"))?;
        Trip::write_csv(self.assignment.freight_trips(), &folder.join("freightTrips.csv"))?;

        let mut writer = csv::Writer::from_path(folder.join("vehicleKilometres.csv"))?;
        writer.write_record(&["zone", "vehicle", "km"])?;
        for (zone, per_vehicle) in self.assignment.vehicle_kilometres(&self.network) {
            for (vehicle, km) in per_vehicle {
                writer.write_record(&[zone.clone(), format!("{:?}", vehicle), km.to_string()])?;
            }
        }
        writer.flush()?;
        log::info!("Wrote outputs to {:?}", folder);
        Ok(())
    }
}

fn demand_zoning(assignment_type: AssignmentType, zoning: &Option<Zoning>) -> DemandZoning<'_> {
    match (assignment_type, zoning) {
        (AssignmentType::Tempro, Some(zoning)) => DemandZoning::Fine(zoning),
        (AssignmentType::Combined, Some(zoning)) => DemandZoning::Combined(zoning),
        _ => DemandZoning::Lad,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::intervention::{InterventionKind, RoadDevelopment};
    use super::super::synthetic::{generate_fine_zones, generate_freight_demand,
                                  generate_grid_network, generate_passenger_demand, GridParams};
    use super::super::vehicle::{EngineType, EnergyType, TimeOfDay, VehicleType};
    use super::super::test_utils::seeded_rng;
    use rand_isaac::Isaac64Rng;

    fn grid_model(config: TransportConfig, rng: &mut Isaac64Rng)
                  -> (TransportModel, ZoneMatrix, FreightMatrix) {
        let grid = GridParams::default();
        let records = generate_grid_network(&grid, rng);
        let fine_zones = generate_fine_zones(&records);
        let zones: Vec<String> = match config.assignment_type {
            AssignmentType::Lad => grid.zone_names(),
            _ => fine_zones.iter().map(|fz| fz.code.clone()).collect(),
        };
        let model = TransportModel::new(config, records, Some(fine_zones));
        let odm = generate_passenger_demand(&zones, 400., rng).rounded();
        let fm = generate_freight_demand(&[1, 2, 3, 1001], 60., rng).rounded();
        (model, odm, fm)
    }

    #[test]
    fn test_assign_every_trip() {
        let mut rng = seeded_rng();
        let mut config = TransportConfig::default();
        config.assignment.assignment_iterations = 3;
        config.assignment.link_travel_time_averaging_weight = 0.5;
        let (mut model, odm, fm) = grid_model(config, &mut rng);
        assert!(model.generate_routes(&odm, &fm, &mut rng) > 0);
        let rmsn = model.assign(&odm, &fm, &mut rng);
        assert!(rmsn.is_finite());
        assert_eq!(model.assignment().passenger_trips().len() as u64, odm.total_int_flow());
        assert_eq!(model.assignment().freight_trips().len() as u64, fm.total_int_flow());
        assert_eq!(model.assignment().dropped_trips(), 0);

        let free_flow = model.network().free_flow_times();
        for hour in TimeOfDay::ALL.iter() {
            for (edge, time) in model.assignment().link_travel_times(*hour) {
                assert!(*time >= free_flow[edge] - 1e-9);
            }
        }
    }

    #[test]
    fn test_route_choice_and_fine_zones() {
        let mut rng = seeded_rng();
        let mut config = TransportConfig::default();
        config.assignment.use_route_choice_model = true;
        config.assignment_type = AssignmentType::Tempro;
        let (mut model, odm, fm) = grid_model(config, &mut rng);
        model.generate_routes(&odm, &fm, &mut rng);
        assert!(model.passenger_routes().len() > model.network().node_count());
        model.assign(&odm, &fm, &mut rng);
        assert_eq!(model.assignment().passenger_trips().len() as u64, odm.total_int_flow());
        for trip in model.assignment().passenger_trips() {
            assert!(trip.route.is_valid(model.network()));
        }
    }

    #[test]
    fn test_energy_from_config() {
        let mut rng = seeded_rng();
        let mut config = TransportConfig::default();
        config.energy.set_energy_unit_cost(EnergyType::Petrol, 2.5);
        config.energy.set_engine_type_fractions(VehicleType::Car, vec![(EngineType::Bev, 1.)]);
        let (mut model, odm, fm) = grid_model(config.clone(), &mut rng);
        assert_eq!(model.assignment().energy_params(), &config.energy);

        model.assign(&odm, &fm, &mut rng);
        let cars: Vec<_> = model.assignment().passenger_trips().iter()
            .filter(|trip| trip.vehicle == VehicleType::Car)
            .collect();
        assert!(!cars.is_empty());
        assert!(cars.iter().all(|trip| trip.engine == EngineType::Bev));
    }

    #[test]
    fn test_interventions_change_network() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut rng = seeded_rng();
        let (mut model, odm, fm) = grid_model(TransportConfig::default(), &mut rng);
        model.generate_routes(&odm, &fm, &mut rng);
        let edges_before = model.network().edge_count();
        let development = RoadDevelopment::new(1, 30, true, 2, 4.5, "A");
        model.add_intervention(Intervention::new("bypass", 2016, 2020,
                                                 InterventionKind::RoadDevelopment(development)));

        assert_eq!(model.apply_interventions(2015)?, 0);
        assert_eq!(model.apply_interventions(2017)?, 1);
        assert_eq!(model.network().edge_count(), edges_before + 2);
        assert!(model.interventions()[0].is_installed());
        model.assign(&odm, &fm, &mut rng);

        assert_eq!(model.apply_interventions(2021)?, 1);
        assert_eq!(model.network().edge_count(), edges_before);
        for route_set in model.passenger_routes().route_sets() {
            for route in route_set.routes() {
                assert!(route.is_valid(model.network()));
            }
        }
        Ok(())
    }

    #[test]
    fn test_calibration_matrices() {
        let mut rng = seeded_rng();
        let mut config = TransportConfig::default();
        config.spsa.iterations = 4;
        config.rebalancing_iterations = 3;
        let (mut model, odm, fm) = grid_model(config, &mut rng);
        model.generate_routes(&odm, &fm, &mut rng);

        let (calibrated, losses) = model.calibrate_passenger_spsa(&odm, &mut rng);
        assert_eq!(losses.len(), 5);
        assert_eq!(calibrated.len(), odm.len());
        for (_, flow) in calibrated.iter() {
            assert!(*flow >= 0.);
        }

        let (rebalanced, losses) = model.rebalance_freight(&fm, &mut rng);
        assert_eq!(losses.len(), 3);
        assert_eq!(rebalanced.len(), fm.len());
    }

    #[test]
    fn test_write_outputs() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut rng = seeded_rng();
        let (mut model, odm, fm) = grid_model(TransportConfig::default(), &mut rng);
        model.assign(&odm, &fm, &mut rng);
        let dir = tempfile::tempdir()?;
        model.write_outputs(dir.path())?;
        model.save_routes(dir.path())?;
        for name in &["timeSkimMatrix.csv", "costSkimMatrix.csv", "passengerTrips.csv",
                      "freightTrips.csv", "vehicleKilometres.csv", "passengerRoutes.dat.gz",
                      "freightRoutes.dat.gz"] {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }
        Ok(())
    }
}
