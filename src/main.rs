use std::path::Path;

use rand::SeedableRng;
use rand_isaac::Isaac64Rng;

use road_transport_model::{generate_fine_zones, generate_freight_demand, generate_grid_network,
                           generate_passenger_demand, AssignmentType, FreightMatrix, GridParams,
                           InterventionRegistry, Result, TransportConfig, TransportModel,
                           ZoneMatrix};


fn run(config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => TransportConfig::from_file(Path::new(path))?,
        None => {
            log::info!("No config file given; using defaults");
            TransportConfig::default()
        }
    };
    let mut rng = Isaac64Rng::seed_from_u64(config.seed);

    let grid = GridParams::default();
    let records = generate_grid_network(&grid, &mut rng);
    let fine_zones = generate_fine_zones(&records);
    let passenger_zones: Vec<String> = match config.assignment_type {
        AssignmentType::Lad => grid.zone_names(),
        _ => fine_zones.iter().map(|fz| fz.code.clone()).collect(),
    };
    let mut freight_zones: Vec<u32> = (1..=grid.num_zones as u32).collect();
    freight_zones.push(1001);

    let passenger_file = match config.assignment_type {
        AssignmentType::Lad => config.files.base_year_od_matrix.clone(),
        _ => config.files.tempro_od_matrix.clone(),
    };
    let odm = match passenger_file {
        Some(path) => ZoneMatrix::read_csv(&path)?,
        None => generate_passenger_demand(&passenger_zones, 5000., &mut rng).rounded(),
    };
    let fm = match &config.files.base_year_freight_matrix {
        Some(path) => FreightMatrix::read_csv(path)?,
        None => generate_freight_demand(&freight_zones, 500., &mut rng).rounded(),
    };
    log::info!("Demand: {} passenger and {} freight trips", odm.total_int_flow(),
               fm.total_int_flow());

    let base_year = config.base_year;
    let mut model = TransportModel::new(config, records, Some(fine_zones));
    model.load_interventions(&InterventionRegistry::default())?;
    model.apply_interventions(base_year)?;

    if model.load_routes()? == 0 {
        model.generate_routes(&odm, &fm, &mut rng);
    }
    model.assign(&odm, &fm, &mut rng);

    let mut calibrated_odm = odm.clone();
    let mut calibrated_fm = fm.clone();
    if model.config().spsa.iterations > 0 {
        let (matrix, losses) = model.calibrate_passenger_spsa(&odm, &mut rng);
        log::info!("Passenger SPSA losses: {:?}", losses);
        calibrated_odm = matrix;
        let (matrix, losses) = model.calibrate_freight_spsa(&fm, &mut rng);
        log::info!("Freight SPSA losses: {:?}", losses);
        calibrated_fm = matrix;
    }
    if model.config().rebalancing_iterations > 0 {
        let (matrix, losses) = model.rebalance_passenger(&calibrated_odm, &mut rng);
        log::info!("Passenger rebalancing losses: {:?}", losses);
        calibrated_odm = matrix;
        let (matrix, losses) = model.rebalance_freight(&calibrated_fm, &mut rng);
        log::info!("Freight rebalancing losses: {:?}", losses);
        calibrated_fm = matrix;
    }

    let rmsn = model.assign(&calibrated_odm, &calibrated_fm, &mut rng);
    log::info!("Final RMSN {:.2}%", rmsn);

    if let Some(folder) = model.config().files.output_folder.clone() {
        model.write_outputs(&folder)?;
        model.save_routes(&folder)?;
        calibrated_odm.write_csv(&folder.join("calibratedPassengerMatrix.csv"))?;
        calibrated_fm.write_csv(&folder.join("calibratedFreightMatrix.csv"))?;
    }
    Ok(())
}

fn main () {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if let Err(ee) = run(args.get(1).map(|ss| ss.as_str())) {
        log::error!("{}", ee);
        std::process::exit(1);
    }
}
