// imports of other modules from this crate
mod error;
pub use error::{Result, TransportError};

mod geometry;
pub use geometry::Point2d;

mod config_utils;

mod config;
pub use config::{AssignmentParams, AssignmentType, DataFiles, GenerationStrategy,
                 NetworkParams, RouteChoiceParams, RouteGenerationParams, SpsaParams,
                 TransportConfig};

mod vehicle;
pub use vehicle::{EnergyParams, EnergyType, EngineType, TimeOfDay, VehicleType, WebTagParams};

mod road_network;
pub use road_network::{AreaRecord, CountDirection, CountPointRecord, Edge, EdgeId,
                       FreightZoneRecord, NetworkRecords, Node, NodeId, NodeRecord, ObservedCounts,
                       RoadClass, RoadNetwork, SegmentRecord};

mod shortest_path;
pub use shortest_path::RoadPath;

mod route;
pub use route::{Route, UtilityContext};

mod route_set;
pub use route_set::RouteSet;

mod route_set_generator;
pub use route_set_generator::{RouteSetGenerator, RouteSetStatistics, StoreFormat};

mod zoning;
pub use zoning::{FineZoneRecord, Zoning};

mod od_matrix;
pub use od_matrix::{FreightKey, FreightMatrix, OdMatrix, ZoneMatrix, ZonePair};

mod skim_matrix;
pub use skim_matrix::SkimMatrix;

mod trip;
pub use trip::{Trip, TripEnds};

mod assignment;
pub use assignment::{rmsn, CountComparison, RoadNetworkAssignment};

mod calibration;
pub use calibration::{CalibrationTarget, DemandZoning, FreightCalibration, MatrixRebalancer,
                      PassengerCalibration, Spsa, THETA_MAX, THETA_MIN};

mod intervention;
pub use intervention::{apply_for_year, Intervention, InterventionKind, InterventionRegistry,
                       RoadDevelopment, RoadExpansion};

mod model;
pub use model::TransportModel;

mod synthetic;
pub use synthetic::{generate_fine_zones, generate_freight_demand, generate_grid_network,
                    generate_passenger_demand, GridParams};

#[cfg(test)]
mod test_utils;
