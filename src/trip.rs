use std::collections::HashMap;
use std::path::Path;

use super::error::Result;
use super::road_network::{EdgeId, NodeId, RoadNetwork};
use super::route::Route;
use super::vehicle::{EnergyParams, EngineType, TimeOfDay, VehicleType};


/// What a trip was demanded between.  Passenger trips remember their zones; freight zones can
/// be points that several zones share, so they are kept separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TripEnds {
    Zones{origin: String, destination: String},
    FreightZones{origin: u32, destination: u32},
}

/// One vehicle journey on a route, with the access and egress legs off the network.
#[derive(Clone, Debug, PartialEq)]
pub struct Trip {
    pub vehicle: VehicleType,
    pub engine: EngineType,
    pub time_of_day: TimeOfDay,
    pub route: Route,
    pub ends: TripEnds,
    /// metres from the trip's true start to the origin node
    pub access_distance: f64,
    /// metres from the destination node to the trip's true end
    pub egress_distance: f64,
}

impl Trip {
    pub fn origin_node(&self) -> NodeId {
        self.route.origin()
    }

    pub fn destination_node(&self) -> NodeId {
        self.route.destination()
    }

    pub fn is_freight(&self) -> bool {
        self.vehicle.is_freight()
    }

    /// km, including access and egress.
    pub fn length_km(&self, network: &RoadNetwork) -> f64 {
        self.route.length_km(network) + self.access_distance / 1000. +
            self.egress_distance / 1000.
    }

    /// Minutes, with access and egress covered at `access_speed_kph`.
    pub fn time_min(&self, network: &RoadNetwork, link_times: &HashMap<EdgeId, f64>,
                    average_intersection_delay: f64, access_speed_kph: f64) -> f64 {
        let route_time = self.route.time_min(network, link_times, average_intersection_delay);
        let access_time = self.access_distance / 1000. / access_speed_kph * 60.;
        let egress_time = self.egress_distance / 1000. / access_speed_kph * 60.;
        route_time + access_time + egress_time
    }

    /// Energy used, in the units of the engine's energy type.
    pub fn consumption(&self, network: &RoadNetwork, energy: &EnergyParams) -> f64 {
        self.length_km(network) / 100. * energy.consumption_per_100km(self.vehicle, self.engine)
    }

    pub fn cost(&self, network: &RoadNetwork, energy: &EnergyParams) -> f64 {
        self.consumption(network, energy) * energy.energy_unit_cost(self.engine)
    }

    /// kg of CO2 emitted.
    pub fn co2(&self, network: &RoadNetwork, energy: &EnergyParams) -> f64 {
        let per_unit = energy.unit_co2_emissions.get(&self.engine.energy_type()).cloned()
            .unwrap_or(0.);
        self.consumption(network, energy) * per_unit
    }

    /// Writes one line per trip: ends, vehicle, engine, hour and the route's edges.
    pub fn write_csv(trips: &[Trip], path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&["origin", "destination", "vehicle", "engine", "hour", "edges"])?;
        for trip in trips {
            let (origin, destination) = match &trip.ends {
                TripEnds::Zones{origin, destination} => (origin.clone(), destination.clone()),
                TripEnds::FreightZones{origin, destination} =>
                    (origin.to_string(), destination.to_string()),
            };
            let edges: Vec<String> = trip.route.edges().iter().map(|ee| ee.to_string()).collect();
            writer.write_record(&[origin, destination, format!("{:?}", trip.vehicle),
                                  format!("{:?}", trip.engine), trip.time_of_day.hour().to_string(),
                                  edges.join(" ")])?;
        }
        writer.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_utils::small_network;
    use approx::{assert_abs_diff_eq, assert_ulps_eq};

    fn car_trip(network: &RoadNetwork, edges: Vec<EdgeId>, engine: EngineType) -> Trip {
        let route = Route::from_edges(network, edges).unwrap();
        Trip {
            vehicle: VehicleType::Car,
            engine,
            time_of_day: TimeOfDay::EIGHT_AM,
            access_distance: network.node(route.origin()).unwrap().access_egress_distance,
            egress_distance: network.node(route.destination()).unwrap().access_egress_distance,
            route,
            ends: TripEnds::Zones{origin: String::from("E01"), destination: String::from("E02")},
        }
    }

    #[test]
    fn test_length_and_time() {
        let network = small_network();
        // node 4 gathers area a3 at 100 m, node 3 gathers b1 at 100 m
        let trip = car_trip(&network, vec![6, 8], EngineType::IcePetrol);
        assert_abs_diff_eq!(trip.length_km(&network), 2.1 + 0.1 + 0.1, epsilon = 1e-12);
        let times = network.free_flow_times();
        let route_time = times[&6] + times[&8] + 0.8;
        let expected = route_time + 2. * 0.1 / 30. * 60.;
        assert_abs_diff_eq!(trip.time_min(&network, times, 0.8, 30.), expected, epsilon = 1e-12);
        assert_eq!(trip.origin_node(), 4);
        assert_eq!(trip.destination_node(), 3);
        assert!(!trip.is_freight());
    }

    #[test]
    fn test_cost_and_consumption() {
        let network = small_network();
        let mut energy = EnergyParams::default();
        energy.consumption_per_100km.insert((VehicleType::Car, EngineType::IcePetrol), 5.4);
        energy.set_relative_fuel_efficiency(VehicleType::Car, EngineType::IcePetrol, 0.9);
        energy.set_energy_unit_cost(super::super::vehicle::EnergyType::Petrol, 1.17);
        let trip = car_trip(&network, vec![6, 8], EngineType::IcePetrol);
        let length = trip.length_km(&network);
        assert_ulps_eq!(trip.consumption(&network, &energy), length / 100. * 5.4 * 0.9);
        assert_ulps_eq!(trip.cost(&network, &energy), length / 100. * 5.4 * 0.9 * 1.17);
        let bev = car_trip(&network, vec![6, 8], EngineType::Bev);
        assert_ulps_eq!(bev.co2(&network, &energy), 0.);
    }

    #[test]
    fn test_write_csv() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let network = small_network();
        let trips = vec![car_trip(&network, vec![6, 8], EngineType::IcePetrol)];
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("trips.csv");
        Trip::write_csv(&trips, &path)?;
        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.contains("E01,E02,Car,IcePetrol,8,6 8"));
        Ok(())
    }
}
