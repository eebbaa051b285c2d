use std::path::{Path, PathBuf};

use yaml_rust::Yaml;

use super::config_utils;
use super::error::{Result, TransportError};
use super::vehicle::{EnergyParams, EnergyType, EngineType, TimeOfDay, VehicleType};


/// Speeds and lane defaults that determine free-flow travel times.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkParams {
    /// km/h
    pub free_flow_speed_m_road: f64,
    pub free_flow_speed_a_road: f64,
    pub average_speed_ferry: f64,
    pub lanes_m_road: u32,
    pub lanes_a_road: u32,
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams {
            free_flow_speed_m_road: 115.7923,
            free_flow_speed_a_road: 90.203731,
            average_speed_ferry: 20.,
            lanes_m_road: 3,
            lanes_a_road: 1,
        }
    }
}

impl NetworkParams {
    fn from_yaml(yaml_cfg: &Yaml) -> Result<NetworkParams> {
        let dflt = NetworkParams::default();
        Ok(NetworkParams {
            free_flow_speed_m_road: config_utils::get_f64(yaml_cfg, "FREE_FLOW_SPEED_M_ROAD",
                                                          dflt.free_flow_speed_m_road)?,
            free_flow_speed_a_road: config_utils::get_f64(yaml_cfg, "FREE_FLOW_SPEED_A_ROAD",
                                                          dflt.free_flow_speed_a_road)?,
            average_speed_ferry: config_utils::get_f64(yaml_cfg, "AVERAGE_SPEED_FERRY",
                                                       dflt.average_speed_ferry)?,
            lanes_m_road: config_utils::get_usize(yaml_cfg, "NUMBER_OF_LANES_M_ROAD",
                                                  dflt.lanes_m_road as usize)? as u32,
            lanes_a_road: config_utils::get_usize(yaml_cfg, "NUMBER_OF_LANES_A_ROAD",
                                                  dflt.lanes_a_road as usize)? as u32,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentParams {
    /// PCU per hour per lane
    pub maximum_capacity_m_road: f64,
    pub maximum_capacity_a_road: f64,
    pub peak_hour_percentage: f64,
    pub alpha: f64,
    pub beta_m_road: f64,
    pub beta_a_road: f64,
    /// km/h
    pub access_egress_speed_car: f64,
    pub access_egress_speed_freight: f64,
    pub use_route_choice_model: bool,
    pub assignment_iterations: usize,
    pub link_travel_time_averaging_weight: f64,
    pub time_of_day_distribution: Vec<f64>,
    pub time_of_day_distribution_freight: Vec<f64>,
    pub av_fraction: f64,
}

impl Default for AssignmentParams {
    fn default() -> Self {
        let uniform = vec![1. / TimeOfDay::ALL.len() as f64; TimeOfDay::ALL.len()];
        AssignmentParams {
            maximum_capacity_m_road: 2330.,
            maximum_capacity_a_road: 1380.,
            peak_hour_percentage: 0.10322,
            alpha: 0.15,
            beta_m_road: 5.55,
            beta_a_road: 4.,
            access_egress_speed_car: 30.,
            access_egress_speed_freight: 30.,
            use_route_choice_model: false,
            assignment_iterations: 1,
            link_travel_time_averaging_weight: 1.,
            time_of_day_distribution: uniform.clone(),
            time_of_day_distribution_freight: uniform,
            av_fraction: 0.,
        }
    }
}

impl AssignmentParams {
    fn from_yaml(yaml_cfg: &Yaml) -> Result<AssignmentParams> {
        let dflt = AssignmentParams::default();
        let weight = config_utils::get_f64(yaml_cfg, "LINK_TRAVEL_TIME_AVERAGING_WEIGHT",
                                           dflt.link_travel_time_averaging_weight)?;
        if !(0. ..=1.).contains(&weight) {
            return Err(TransportError::config("LINK_TRAVEL_TIME_AVERAGING_WEIGHT",
                                              "must lie in [0, 1]"));
        }
        let av_fraction = config_utils::get_f64(yaml_cfg, "AV_FRACTION", dflt.av_fraction)?;
        if !(0. ..=1.).contains(&av_fraction) {
            return Err(TransportError::config("AV_FRACTION", "must lie in [0, 1]"));
        }
        Ok(AssignmentParams {
            maximum_capacity_m_road: config_utils::get_f64(yaml_cfg, "MAXIMUM_CAPACITY_M_ROAD",
                                                           dflt.maximum_capacity_m_road)?,
            maximum_capacity_a_road: config_utils::get_f64(yaml_cfg, "MAXIMUM_CAPACITY_A_ROAD",
                                                           dflt.maximum_capacity_a_road)?,
            peak_hour_percentage: config_utils::get_f64(yaml_cfg, "PEAK_HOUR_PERCENTAGE",
                                                        dflt.peak_hour_percentage)?,
            alpha: config_utils::get_f64(yaml_cfg, "ALPHA", dflt.alpha)?,
            beta_m_road: config_utils::get_f64(yaml_cfg, "BETA_M_ROAD", dflt.beta_m_road)?,
            beta_a_road: config_utils::get_f64(yaml_cfg, "BETA_A_ROAD", dflt.beta_a_road)?,
            access_egress_speed_car: config_utils::get_f64(
                yaml_cfg, "AVERAGE_ACCESS_EGRESS_SPEED_CAR", dflt.access_egress_speed_car)?,
            access_egress_speed_freight: config_utils::get_f64(
                yaml_cfg, "AVERAGE_ACCESS_EGRESS_SPEED_FREIGHT", dflt.access_egress_speed_freight)?,
            use_route_choice_model: config_utils::get_bool(yaml_cfg, "USE_ROUTE_CHOICE_MODEL",
                                                           dflt.use_route_choice_model)?,
            assignment_iterations: config_utils::get_usize(yaml_cfg, "ASSIGNMENT_ITERATIONS",
                                                           dflt.assignment_iterations)?,
            link_travel_time_averaging_weight: weight,
            time_of_day_distribution: tod_distribution(yaml_cfg, "TIME_OF_DAY_DISTRIBUTION",
                                                       dflt.time_of_day_distribution)?,
            time_of_day_distribution_freight: tod_distribution(
                yaml_cfg, "TIME_OF_DAY_DISTRIBUTION_FREIGHT", dflt.time_of_day_distribution_freight)?,
            av_fraction,
        })
    }
}

fn tod_distribution(yaml_cfg: &Yaml, key: &str, default: Vec<f64>) -> Result<Vec<f64>> {
    let dist = match config_utils::get_f64_list(yaml_cfg, key)? {
        Some(dist) => dist,
        None => return Ok(default),
    };
    if dist.len() != TimeOfDay::ALL.len() {
        return Err(TransportError::config(key, format!("expected {} hourly fractions, got {}",
                                                       TimeOfDay::ALL.len(), dist.len())));
    }
    if dist.iter().any(|ff| *ff < 0.) || dist.iter().sum::<f64>() <= 0. {
        return Err(TransportError::config(key, "fractions must be non-negative with a positive sum"));
    }
    Ok(dist)
}

/// Coefficients of the linear route utility.  All coefficients must be non-positive so that
/// utilities are never positive.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteChoiceParams {
    pub time: f64,
    pub length: f64,
    pub cost: f64,
    pub intersections: f64,
    /// minutes added per intersection when computing route time
    pub average_intersection_delay: f64,
}

impl Default for RouteChoiceParams {
    fn default() -> Self {
        RouteChoiceParams {
            time: -1.5,
            length: -1.0,
            cost: -3.6,
            intersections: -0.1,
            average_intersection_delay: 0.8,
        }
    }
}

impl RouteChoiceParams {
    pub fn from_yaml(yaml_cfg: &Yaml) -> Result<RouteChoiceParams> {
        let dflt = RouteChoiceParams::default();
        let params = RouteChoiceParams {
            time: config_utils::get_f64(yaml_cfg, "TIME", dflt.time)?,
            length: config_utils::get_f64(yaml_cfg, "LENGTH", dflt.length)?,
            cost: config_utils::get_f64(yaml_cfg, "COST", dflt.cost)?,
            intersections: config_utils::get_f64(yaml_cfg, "INTERSECTIONS", dflt.intersections)?,
            average_intersection_delay: config_utils::get_f64(
                yaml_cfg, "AVERAGE_INTERSECTION_DELAY", dflt.average_intersection_delay)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let coefficients = [("TIME", self.time), ("LENGTH", self.length), ("COST", self.cost),
                            ("INTERSECTIONS", self.intersections)];
        for (key, value) in coefficients.iter() {
            if *value > 0. || value.is_nan() {
                return Err(TransportError::config(key, "route choice coefficients must be <= 0"));
            }
        }
        if self.average_intersection_delay < 0. {
            return Err(TransportError::config("AVERAGE_INTERSECTION_DELAY", "must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationStrategy {
    /// re-search with one random link of the fastest path removed
    LinkElimination,
    /// re-search with randomly perturbed link times
    Perturbation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteGenerationParams {
    pub route_limit: usize,
    pub generation_limit: usize,
    pub top_nodes: usize,
    pub perturbation: f64,
    pub strategy: GenerationStrategy,
}

impl Default for RouteGenerationParams {
    fn default() -> Self {
        RouteGenerationParams {
            route_limit: 5,
            generation_limit: 10,
            top_nodes: 3,
            perturbation: 0.3,
            strategy: GenerationStrategy::LinkElimination,
        }
    }
}

impl RouteGenerationParams {
    fn from_yaml(yaml_cfg: &Yaml) -> Result<RouteGenerationParams> {
        let dflt = RouteGenerationParams::default();
        let strategy = match config_utils::get_str(yaml_cfg, "ROUTE_GENERATION_STRATEGY")? {
            None => dflt.strategy,
            Some("linkElimination") => GenerationStrategy::LinkElimination,
            Some("perturbation") => GenerationStrategy::Perturbation,
            Some(other) => return Err(TransportError::config(
                "ROUTE_GENERATION_STRATEGY", format!("unknown strategy {}", other))),
        };
        let perturbation = config_utils::get_f64(yaml_cfg, "PERTURBATION", dflt.perturbation)?;
        if !(0. ..1.).contains(&perturbation) {
            return Err(TransportError::config("PERTURBATION", "must lie in [0, 1)"));
        }
        Ok(RouteGenerationParams {
            route_limit: config_utils::get_usize(yaml_cfg, "ROUTE_LIMIT", dflt.route_limit)?,
            generation_limit: config_utils::get_usize(yaml_cfg, "GENERATION_LIMIT",
                                                      dflt.generation_limit)?,
            top_nodes: config_utils::get_usize(yaml_cfg, "TOP_NODES", dflt.top_nodes)?,
            perturbation,
            strategy,
        })
    }
}

/// Gain-sequence hyperparameters for SPSA.
#[derive(Clone, Debug, PartialEq)]
pub struct SpsaParams {
    pub a: f64,
    pub big_a: f64,
    pub c: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub iterations: usize,
}

impl Default for SpsaParams {
    fn default() -> Self {
        SpsaParams {
            a: 100.,
            big_a: 1.,
            c: 10.,
            alpha: 0.602,
            gamma: 0.101,
            iterations: 20,
        }
    }
}

impl SpsaParams {
    fn from_yaml(yaml_cfg: &Yaml) -> Result<SpsaParams> {
        let dflt = SpsaParams::default();
        Ok(SpsaParams {
            a: config_utils::get_f64(yaml_cfg, "SPSA_a", dflt.a)?,
            big_a: config_utils::get_f64(yaml_cfg, "SPSA_A", dflt.big_a)?,
            c: config_utils::get_f64(yaml_cfg, "SPSA_c", dflt.c)?,
            alpha: config_utils::get_f64(yaml_cfg, "SPSA_alpha", dflt.alpha)?,
            gamma: config_utils::get_f64(yaml_cfg, "SPSA_gamma", dflt.gamma)?,
            iterations: config_utils::get_usize(yaml_cfg, "SPSA_ITERATIONS", dflt.iterations)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentType {
    /// administrative zones only
    Lad,
    /// fine-grained zones only
    Tempro,
    /// fine-grained zones inside administrative zones
    Combined,
}

/// Input and output locations, resolved against the directory holding the config file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataFiles {
    pub base_year_od_matrix: Option<PathBuf>,
    pub base_year_freight_matrix: Option<PathBuf>,
    pub tempro_od_matrix: Option<PathBuf>,
    pub passenger_routes: Option<PathBuf>,
    pub freight_routes: Option<PathBuf>,
    pub tempro_routes: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub intervention_files: Vec<PathBuf>,
}

impl DataFiles {
    fn from_yaml(yaml_cfg: &Yaml, base_dir: &Path) -> Result<DataFiles> {
        let path_for = |key: &str| -> Result<Option<PathBuf>> {
            Ok(config_utils::get_str(yaml_cfg, key)?
               .map(|ss| config_utils::str_to_absolute_path(ss, base_dir)))
        };
        let intervention_files = config_utils::get_prefixed_strs(yaml_cfg, "interventionFile")
            .into_iter()
            .map(|(_, ss)| config_utils::str_to_absolute_path(ss, base_dir))
            .collect();
        Ok(DataFiles {
            base_year_od_matrix: path_for("baseYearODMatrixFile")?,
            base_year_freight_matrix: path_for("baseYearFreightMatrixFile")?,
            tempro_od_matrix: path_for("temproODMatrixFile")?,
            passenger_routes: path_for("passengerRoutesFile")?,
            freight_routes: path_for("freightRoutesFile")?,
            tempro_routes: path_for("temproRoutesFile")?,
            output_folder: path_for("outputFolder")?,
            intervention_files,
        })
    }
}

fn key_name<T: std::fmt::Debug>(item: &T) -> String {
    format!("{:?}", item).to_uppercase()
}

/// Overrides the built-in energy parameters.  Keys carry upper-case suffixes, for example
/// `ENERGY_UNIT_COST_PETROL`, `UNIT_CO2_EMISSIONS_DIESEL`, `RELATIVE_FUEL_EFFICIENCY_CAR_BEV`
/// and `ENGINE_TYPE_FRACTIONS_VAN`, the last being one fraction per engine type in
/// declaration order.
fn energy_from_yaml(yaml_cfg: &Yaml) -> Result<EnergyParams> {
    let mut energy = EnergyParams::default();
    for energy_type in EnergyType::ALL.iter() {
        let key = format!("ENERGY_UNIT_COST_{}", key_name(energy_type));
        let cost = config_utils::get_f64(yaml_cfg, &key, energy.energy_unit_costs[energy_type])?;
        if cost < 0. {
            return Err(TransportError::config(&key, "unit cost must be non-negative"));
        }
        energy.set_energy_unit_cost(*energy_type, cost);

        let key = format!("UNIT_CO2_EMISSIONS_{}", key_name(energy_type));
        let co2 = config_utils::get_f64(yaml_cfg, &key, energy.unit_co2_emissions[energy_type])?;
        if co2 < 0. {
            return Err(TransportError::config(&key, "emissions must be non-negative"));
        }
        energy.set_unit_co2_emission(*energy_type, co2);
    }

    for vehicle in VehicleType::ALL.iter() {
        for engine in EngineType::ALL.iter() {
            let key = format!("RELATIVE_FUEL_EFFICIENCY_{}_{}", key_name(vehicle),
                              key_name(engine));
            let efficiency = config_utils::get_f64(yaml_cfg, &key,
                                                   energy.relative_efficiency(*vehicle, *engine))?;
            if efficiency <= 0. {
                return Err(TransportError::config(&key, "efficiency must be positive"));
            }
            energy.set_relative_fuel_efficiency(*vehicle, *engine, efficiency);
        }

        let key = format!("ENGINE_TYPE_FRACTIONS_{}", key_name(vehicle));
        let fractions = match config_utils::get_f64_list(yaml_cfg, &key)? {
            Some(fractions) => fractions,
            None => continue,
        };
        if fractions.len() != EngineType::ALL.len() {
            return Err(TransportError::config(&key, format!(
                "expected {} engine fractions, got {}", EngineType::ALL.len(), fractions.len())));
        }
        let total: f64 = fractions.iter().sum();
        if fractions.iter().any(|ff| *ff < 0.) || total <= 0. {
            return Err(TransportError::config(&key, "fractions must be non-negative with a positive sum"));
        }
        let by_engine = EngineType::ALL.iter().cloned().zip(fractions)
            .filter(|(_, ff)| *ff > 0.)
            .map(|(engine, ff)| (engine, ff / total))
            .collect();
        energy.set_engine_type_fractions(*vehicle, by_engine);
    }
    Ok(energy)
}

/// The full run configuration.  Built from a flat YAML mapping; every key is optional.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportConfig {
    pub network: NetworkParams,
    pub assignment: AssignmentParams,
    pub route_choice: RouteChoiceParams,
    pub route_generation: RouteGenerationParams,
    pub spsa: SpsaParams,
    pub energy: EnergyParams,
    pub rebalancing_iterations: usize,
    pub assignment_type: AssignmentType,
    pub base_year: u32,
    pub seed: u64,
    pub files: DataFiles,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            network: NetworkParams::default(),
            assignment: AssignmentParams::default(),
            route_choice: RouteChoiceParams::default(),
            route_generation: RouteGenerationParams::default(),
            spsa: SpsaParams::default(),
            energy: EnergyParams::default(),
            rebalancing_iterations: 5,
            assignment_type: AssignmentType::Lad,
            base_year: 2015,
            seed: 1234,
            files: DataFiles::default(),
        }
    }
}

impl TransportConfig {
    pub fn from_file(config_path: &Path) -> Result<TransportConfig> {
        let yaml_cfg = config_utils::load_yaml_file(config_path)?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        TransportConfig::from_yaml(&yaml_cfg, base_dir)
    }

    pub fn from_yaml(yaml_cfg: &Yaml, base_dir: &Path) -> Result<TransportConfig> {
        let dflt = TransportConfig::default();
        let assignment_type = match config_utils::get_str(yaml_cfg, "ASSIGNMENT_TYPE")? {
            None => dflt.assignment_type,
            Some(ss) => match ss.to_lowercase().as_str() {
                "lad" => AssignmentType::Lad,
                "tempro" => AssignmentType::Tempro,
                "combined" => AssignmentType::Combined,
                _ => return Err(TransportError::config(
                    "ASSIGNMENT_TYPE", format!("unknown assignment type {}", ss))),
            },
        };
        let base_year = config_utils::get_usize(yaml_cfg, "baseYear",
                                                dflt.base_year as usize)? as u32;
        Ok(TransportConfig {
            network: NetworkParams::from_yaml(yaml_cfg)?,
            assignment: AssignmentParams::from_yaml(yaml_cfg)?,
            route_choice: RouteChoiceParams::from_yaml(yaml_cfg)?,
            route_generation: RouteGenerationParams::from_yaml(yaml_cfg)?,
            spsa: SpsaParams::from_yaml(yaml_cfg)?,
            energy: energy_from_yaml(yaml_cfg)?,
            rebalancing_iterations: config_utils::get_usize(yaml_cfg, "REBALANCING_ITERATIONS",
                                                            dflt.rebalancing_iterations)?,
            assignment_type,
            base_year,
            seed: config_utils::get_u64(yaml_cfg, "SEED", dflt.seed)?,
            files: DataFiles::from_yaml(yaml_cfg, base_dir)?,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use yaml_rust::YamlLoader;

    fn parse(text: &str) -> Result<TransportConfig> {
        let docs = YamlLoader::load_from_str(text).unwrap();
        TransportConfig::from_yaml(&docs[0], Path::new("/base"))
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let cfg = parse("SEED: 7\n").unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.network, NetworkParams::default());
        assert_eq!(cfg.route_choice, RouteChoiceParams::default());
        assert_eq!(cfg.assignment.time_of_day_distribution.len(), 24);
        assert_eq!(cfg.assignment_type, AssignmentType::Lad);
    }

    #[test]
    fn test_overrides() {
        let cfg = parse("TIME: -2.0\nUSE_ROUTE_CHOICE_MODEL: true\nASSIGNMENT_TYPE: tempro\n\
                         SPSA_a: 5\nSPSA_ITERATIONS: 3\nROUTE_GENERATION_STRATEGY: perturbation\n\
                         passengerRoutesFile: routes/passenger.dat\n\
                         interventionFile0: interventions/roadExpansion.yml\n").unwrap();
        assert_eq!(cfg.route_choice.time, -2.);
        assert!(cfg.assignment.use_route_choice_model);
        assert_eq!(cfg.assignment_type, AssignmentType::Tempro);
        assert_eq!(cfg.spsa.a, 5.);
        assert_eq!(cfg.spsa.iterations, 3);
        assert_eq!(cfg.route_generation.strategy, GenerationStrategy::Perturbation);
        assert_eq!(cfg.files.passenger_routes, Some(PathBuf::from("/base/routes/passenger.dat")));
        assert_eq!(cfg.files.intervention_files,
                   vec![PathBuf::from("/base/interventions/roadExpansion.yml")]);
    }

    #[test]
    fn test_energy_overrides() {
        let cfg = parse("ENERGY_UNIT_COST_PETROL: 1.5\nUNIT_CO2_EMISSIONS_DIESEL: 2.9\n\
                         RELATIVE_FUEL_EFFICIENCY_CAR_BEV: 0.8\n\
                         ENGINE_TYPE_FRACTIONS_VAN: [0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 1]\n").unwrap();
        assert_eq!(cfg.energy.energy_unit_cost(EngineType::HevPetrol), 1.5);
        assert_eq!(cfg.energy.energy_unit_costs[&EnergyType::Diesel],
                   EnergyParams::default().energy_unit_costs[&EnergyType::Diesel]);
        assert_eq!(cfg.energy.unit_co2_emissions[&EnergyType::Diesel], 2.9);
        assert_eq!(cfg.energy.relative_efficiency(VehicleType::Car, EngineType::Bev), 0.8);
        assert_eq!(cfg.energy.relative_efficiency(VehicleType::Van, EngineType::Bev), 1.);
        assert_eq!(cfg.energy.engine_fractions(VehicleType::Van),
                   &[(EngineType::IceDiesel, 0.75), (EngineType::Bev, 0.25)]);
        assert_eq!(cfg.energy.engine_fractions(VehicleType::Car),
                   EnergyParams::default().engine_fractions(VehicleType::Car));

        assert_eq!(parse("SEED: 7\n").unwrap().energy, EnergyParams::default());
        assert!(parse("ENERGY_UNIT_COST_LPG: -1\n").is_err());
        assert!(parse("ENGINE_TYPE_FRACTIONS_CAR: [1, 0]\n").is_err());
    }

    #[test]
    fn test_rejects_positive_coefficients() {
        match parse("COST: 0.5\n") {
            Err(TransportError::Config{key, ..}) => assert_eq!(key, "COST"),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse("LINK_TRAVEL_TIME_AVERAGING_WEIGHT: 1.5\n").is_err());
        assert!(parse("ASSIGNMENT_TYPE: regional\n").is_err());
        assert!(parse("TIME_OF_DAY_DISTRIBUTION: [0.5, 0.5]\n").is_err());
        assert!(parse("ROUTE_LIMIT: many\n").is_err());
    }

    #[test]
    fn test_from_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("config.yml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "baseYear: 2020\noutputFolder: output")?;
        let cfg = TransportConfig::from_file(&path)?;
        assert_eq!(cfg.base_year, 2020);
        assert_eq!(cfg.files.output_folder, Some(dir.path().join("output")));
        Ok(())
    }
}
