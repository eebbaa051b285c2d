use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};


#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    /// autonomous car
    Av,
    Van,
    Rigid,
    Artic,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [VehicleType::Car, VehicleType::Av, VehicleType::Van,
                                       VehicleType::Rigid, VehicleType::Artic];
    pub const FREIGHT: [VehicleType; 3] = [VehicleType::Van, VehicleType::Rigid,
                                           VehicleType::Artic];

    /// Passenger-car-unit factor used when converting volumes to capacity consumption.
    pub fn pcu(&self) -> f64 {
        match self {
            VehicleType::Car | VehicleType::Av | VehicleType::Van => 1.,
            VehicleType::Rigid => 1.9,
            VehicleType::Artic => 2.9,
        }
    }

    pub fn is_freight(&self) -> bool {
        matches!(self, VehicleType::Van | VehicleType::Rigid | VehicleType::Artic)
    }

    /// Numeric codes used by freight matrices: 1 van, 2 rigid, 3 artic.
    pub fn from_freight_code(code: u32) -> Option<VehicleType> {
        match code {
            1 => Some(VehicleType::Van),
            2 => Some(VehicleType::Rigid),
            3 => Some(VehicleType::Artic),
            _ => None,
        }
    }

    pub fn freight_code(&self) -> Option<u32> {
        match self {
            VehicleType::Van => Some(1),
            VehicleType::Rigid => Some(2),
            VehicleType::Artic => Some(3),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergyType {
    Petrol,
    Diesel,
    Lpg,
    Electricity,
    Hydrogen,
    Cng,
}

impl EnergyType {
    pub const ALL: [EnergyType; 6] = [EnergyType::Petrol, EnergyType::Diesel, EnergyType::Lpg,
                                      EnergyType::Electricity, EnergyType::Hydrogen,
                                      EnergyType::Cng];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EngineType {
    IcePetrol,
    IceDiesel,
    IceLpg,
    IceH2,
    IceCng,
    HevPetrol,
    HevDiesel,
    FcevH2,
    PhevPetrol,
    PhevDiesel,
    Bev,
}

impl EngineType {
    pub const ALL: [EngineType; 11] = [
        EngineType::IcePetrol, EngineType::IceDiesel, EngineType::IceLpg, EngineType::IceH2,
        EngineType::IceCng, EngineType::HevPetrol, EngineType::HevDiesel, EngineType::FcevH2,
        EngineType::PhevPetrol, EngineType::PhevDiesel, EngineType::Bev,
    ];

    /// The energy an engine is costed on.  Plug-in hybrids are costed on their fuel.
    pub fn energy_type(&self) -> EnergyType {
        match self {
            EngineType::IcePetrol | EngineType::HevPetrol | EngineType::PhevPetrol =>
                EnergyType::Petrol,
            EngineType::IceDiesel | EngineType::HevDiesel | EngineType::PhevDiesel =>
                EnergyType::Diesel,
            EngineType::IceLpg => EnergyType::Lpg,
            EngineType::IceH2 | EngineType::FcevH2 => EnergyType::Hydrogen,
            EngineType::IceCng => EnergyType::Cng,
            EngineType::Bev => EnergyType::Electricity,
        }
    }
}

/// One-hour time-of-day buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay(u8);

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 24] = [
        TimeOfDay(0), TimeOfDay(1), TimeOfDay(2), TimeOfDay(3), TimeOfDay(4), TimeOfDay(5),
        TimeOfDay(6), TimeOfDay(7), TimeOfDay(8), TimeOfDay(9), TimeOfDay(10), TimeOfDay(11),
        TimeOfDay(12), TimeOfDay(13), TimeOfDay(14), TimeOfDay(15), TimeOfDay(16), TimeOfDay(17),
        TimeOfDay(18), TimeOfDay(19), TimeOfDay(20), TimeOfDay(21), TimeOfDay(22), TimeOfDay(23),
    ];
    pub const EIGHT_AM: TimeOfDay = TimeOfDay(8);

    pub fn from_hour(hour: u8) -> Option<TimeOfDay> {
        if hour < 24 {
            Some(TimeOfDay(hour))
        } else {
            None
        }
    }

    pub fn hour(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Coefficients of the per-kilometre consumption curve L(v) = a/v + b + c*v + d*v^2,
/// with v in km/h.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WebTagParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl WebTagParams {
    pub fn consumption_per_km(&self, speed_kph: f64) -> f64 {
        self.a / speed_kph + self.b + self.c * speed_kph + self.d * speed_kph.powi(2)
    }
}

// reference speed used to derive default per-100km consumptions
static REFERENCE_SPEED_KPH: f64 = 60.;

fn default_webtag(vehicle: VehicleType, energy: EnergyType) -> WebTagParams {
    match (vehicle, energy) {
        (_, EnergyType::Electricity) => WebTagParams{a: 0.61, b: 0.1, c: -0.00015, d: 1.3e-6},
        (VehicleType::Car, EnergyType::Diesel) | (VehicleType::Av, EnergyType::Diesel) =>
            WebTagParams{a: 0.51, b: 0.0503, c: -0.0000785, d: 1.67e-6},
        (VehicleType::Car, _) | (VehicleType::Av, _) =>
            WebTagParams{a: 1.11932239320862, b: 0.0440047704089497,
                         c: -0.0000813834474888197, d: 2.44908328418021E-06},
        (VehicleType::Van, _) => WebTagParams{a: 0.99, b: 0.0666, c: -0.00015, d: 3.1e-6},
        (VehicleType::Rigid, _) => WebTagParams{a: 1.68, b: 0.1665, c: -0.00197, d: 1.75e-5},
        (VehicleType::Artic, _) => WebTagParams{a: 3.04, b: 0.2475, c: -0.00315, d: 2.3e-5},
    }
}

/// Energy consumption and emission parameters for every (vehicle, engine) combination.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyParams {
    pub consumption_curves: BTreeMap<(VehicleType, EngineType), WebTagParams>,
    pub consumption_per_100km: BTreeMap<(VehicleType, EngineType), f64>,
    pub relative_fuel_efficiency: BTreeMap<(VehicleType, EngineType), f64>,
    pub energy_unit_costs: BTreeMap<EnergyType, f64>,
    /// kg CO2 per unit of energy
    pub unit_co2_emissions: BTreeMap<EnergyType, f64>,
    pub engine_type_fractions: BTreeMap<VehicleType, Vec<(EngineType, f64)>>,
}

impl Default for EnergyParams {
    fn default() -> Self {
        let mut consumption_curves = BTreeMap::new();
        let mut consumption_per_100km = BTreeMap::new();
        let mut relative_fuel_efficiency = BTreeMap::new();
        for vehicle in VehicleType::ALL.iter() {
            for engine in EngineType::ALL.iter() {
                let curve = default_webtag(*vehicle, engine.energy_type());
                consumption_per_100km.insert((*vehicle, *engine),
                                             curve.consumption_per_km(REFERENCE_SPEED_KPH) * 100.);
                consumption_curves.insert((*vehicle, *engine), curve);
                relative_fuel_efficiency.insert((*vehicle, *engine), 1.);
            }
        }

        let energy_unit_costs = [
            (EnergyType::Petrol, 1.17), (EnergyType::Diesel, 1.2), (EnergyType::Lpg, 0.6),
            (EnergyType::Electricity, 0.16), (EnergyType::Hydrogen, 7.0), (EnergyType::Cng, 0.8),
        ].iter().cloned().collect();
        let unit_co2_emissions = [
            (EnergyType::Petrol, 2.3), (EnergyType::Diesel, 2.7), (EnergyType::Lpg, 1.6),
            (EnergyType::Electricity, 0.), (EnergyType::Hydrogen, 0.), (EnergyType::Cng, 2.5),
        ].iter().cloned().collect();

        let mut engine_type_fractions = BTreeMap::new();
        let car_fractions = vec![(EngineType::IcePetrol, 0.55), (EngineType::IceDiesel, 0.4),
                                 (EngineType::PhevPetrol, 0.02), (EngineType::Bev, 0.03)];
        engine_type_fractions.insert(VehicleType::Car, car_fractions.clone());
        engine_type_fractions.insert(VehicleType::Av, car_fractions);
        engine_type_fractions.insert(VehicleType::Van,
                                     vec![(EngineType::IceDiesel, 0.95), (EngineType::IcePetrol, 0.05)]);
        engine_type_fractions.insert(VehicleType::Rigid, vec![(EngineType::IceDiesel, 1.)]);
        engine_type_fractions.insert(VehicleType::Artic, vec![(EngineType::IceDiesel, 1.)]);

        EnergyParams {
            consumption_curves,
            consumption_per_100km,
            relative_fuel_efficiency,
            energy_unit_costs,
            unit_co2_emissions,
            engine_type_fractions,
        }
    }
}

impl EnergyParams {
    pub fn set_energy_unit_cost(&mut self, energy: EnergyType, cost: f64) {
        self.energy_unit_costs.insert(energy, cost);
    }

    pub fn set_unit_co2_emission(&mut self, energy: EnergyType, kg_per_unit: f64) {
        self.unit_co2_emissions.insert(energy, kg_per_unit);
    }

    pub fn set_engine_type_fractions(&mut self, vehicle: VehicleType,
                                     fractions: Vec<(EngineType, f64)>) {
        self.engine_type_fractions.insert(vehicle, fractions);
    }

    pub fn set_consumption_curve(&mut self, vehicle: VehicleType, engine: EngineType,
                                 curve: WebTagParams) {
        self.consumption_curves.insert((vehicle, engine), curve);
    }

    pub fn set_relative_fuel_efficiency(&mut self, vehicle: VehicleType, engine: EngineType,
                                        efficiency: f64) {
        self.relative_fuel_efficiency.insert((vehicle, engine), efficiency);
    }

    pub fn energy_unit_cost(&self, engine: EngineType) -> f64 {
        self.energy_unit_costs.get(&engine.energy_type()).cloned().unwrap_or(f64::NAN)
    }

    pub fn relative_efficiency(&self, vehicle: VehicleType, engine: EngineType) -> f64 {
        self.relative_fuel_efficiency.get(&(vehicle, engine)).cloned().unwrap_or(1.)
    }

    /// Energy used per 100 km for trip-level statistics, scaled by relative efficiency.
    pub fn consumption_per_100km(&self, vehicle: VehicleType, engine: EngineType) -> f64 {
        let base = self.consumption_per_100km.get(&(vehicle, engine)).cloned()
            .unwrap_or(f64::NAN);
        base * self.relative_efficiency(vehicle, engine)
    }

    /// Energy used to drive `length_km` in `time_min` minutes, from the speed-dependent curve.
    pub fn link_consumption(&self, vehicle: VehicleType, engine: EngineType, length_km: f64,
                            time_min: f64) -> f64 {
        if length_km <= 0. {
            return 0.;
        }
        let curve = match self.consumption_curves.get(&(vehicle, engine)) {
            Some(curve) => curve,
            None => return f64::NAN,
        };
        let speed_kph = length_km / (time_min / 60.);
        length_km * curve.consumption_per_km(speed_kph) * self.relative_efficiency(vehicle, engine)
    }

    pub fn engine_fractions(&self, vehicle: VehicleType) -> &[(EngineType, f64)] {
        match self.engine_type_fractions.get(&vehicle) {
            Some(fractions) => fractions.as_slice(),
            None => &[],
        }
    }
}
