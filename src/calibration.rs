use ndarray::prelude::*;
use rand::Rng;

use super::assignment::RoadNetworkAssignment;
use super::config::SpsaParams;
use super::od_matrix::{FreightKey, FreightMatrix, OdMatrix, ZoneMatrix, ZonePair};
use super::road_network::RoadNetwork;
use super::route_set_generator::RouteSetGenerator;
use super::vehicle::VehicleType;
use super::zoning::Zoning;


pub const THETA_MIN: f64 = 0.;
pub const THETA_MAX: f64 = 1e7;

/// Something whose fit to observed counts depends on an OD matrix.
pub trait CalibrationTarget {
    type Key: Ord + Clone;

    fn reset(&mut self);

    fn assign<R: Rng>(&mut self, flows: &OdMatrix<Self::Key>, rng: &mut R);

    /// Misfit of the last assignment; lower is better.
    fn loss(&self) -> f64;

    /// Per-key multipliers that would move the last assignment towards the observations.
    fn scaling_factors(&self) -> OdMatrix<Self::Key>;
}

/// How passenger zones are turned into trip end nodes.
#[derive(Clone, Copy, Debug)]
pub enum DemandZoning<'a> {
    Lad,
    Fine(&'a Zoning),
    Combined(&'a Zoning),
}

/// Calibrates a passenger matrix against car counts.
pub struct PassengerCalibration<'a> {
    network: &'a RoadNetwork,
    assignment: &'a mut RoadNetworkAssignment,
    route_sets: Option<&'a RouteSetGenerator>,
    zoning: DemandZoning<'a>,
}

impl<'a> PassengerCalibration<'a> {
    pub fn new(network: &'a RoadNetwork, assignment: &'a mut RoadNetworkAssignment,
               route_sets: Option<&'a RouteSetGenerator>, zoning: DemandZoning<'a>)
               -> PassengerCalibration<'a> {
        PassengerCalibration{network, assignment, route_sets, zoning}
    }
}

impl<'a> CalibrationTarget for PassengerCalibration<'a> {
    type Key = ZonePair;

    fn reset(&mut self) {
        self.assignment.reset();
    }

    fn assign<R: Rng>(&mut self, flows: &ZoneMatrix, rng: &mut R) {
        match self.zoning {
            DemandZoning::Lad =>
                self.assignment.assign_passenger_flows(self.network, flows, self.route_sets, rng),
            DemandZoning::Fine(zoning) =>
                self.assignment.assign_fine_zone_flows(self.network, flows, zoning, false,
                                                       self.route_sets, rng),
            DemandZoning::Combined(zoning) =>
                self.assignment.assign_fine_zone_flows(self.network, flows, zoning, true,
                                                       self.route_sets, rng),
        };
    }

    fn loss(&self) -> f64 {
        self.assignment.calculate_rmsn_for_vehicle_types(self.network,
                                                         &[VehicleType::Car, VehicleType::Av])
    }

    fn scaling_factors(&self) -> ZoneMatrix {
        self.assignment.passenger_scaling_factors(self.network)
    }
}

/// Calibrates a freight matrix against van and lorry counts.
pub struct FreightCalibration<'a> {
    network: &'a RoadNetwork,
    assignment: &'a mut RoadNetworkAssignment,
    route_sets: Option<&'a RouteSetGenerator>,
}

impl<'a> FreightCalibration<'a> {
    pub fn new(network: &'a RoadNetwork, assignment: &'a mut RoadNetworkAssignment,
               route_sets: Option<&'a RouteSetGenerator>) -> FreightCalibration<'a> {
        FreightCalibration{network, assignment, route_sets}
    }
}

impl<'a> CalibrationTarget for FreightCalibration<'a> {
    type Key = FreightKey;

    fn reset(&mut self) {
        self.assignment.reset();
    }

    fn assign<R: Rng>(&mut self, flows: &FreightMatrix, rng: &mut R) {
        self.assignment.assign_freight_flows(self.network, flows, self.route_sets, rng);
    }

    fn loss(&self) -> f64 {
        self.assignment.calculate_rmsn_for_vehicle_types(self.network, &VehicleType::FREIGHT)
    }

    fn scaling_factors(&self) -> FreightMatrix {
        self.assignment.freight_scaling_factors(self.network)
    }
}

fn clamp_theta(value: f64) -> f64 {
    value.max(THETA_MIN).min(THETA_MAX)
}

fn to_matrix<K: Ord + Clone>(keys: &[K], theta: &Array<f64, Ix1>) -> OdMatrix<K> {
    let mut matrix = OdMatrix::new();
    for (key, value) in keys.iter().zip(theta.iter()) {
        matrix.set_flow(key.clone(), value.round());
    }
    matrix
}

fn evaluate<T, R>(target: &mut T, keys: &[T::Key], theta: &Array<f64, Ix1>, rng: &mut R) -> f64
where T: CalibrationTarget,
      R: Rng,
{
    let matrix = to_matrix(keys, theta);
    target.reset();
    target.assign(&matrix, rng);
    target.loss()
}

/// Simultaneous perturbation stochastic approximation over the cells of an OD matrix.  Each
/// iteration perturbs every cell at once by a random +/- step and estimates the gradient from
/// two loss evaluations.
#[derive(Clone, Debug)]
pub struct Spsa {
    params: SpsaParams,
    loss_history: Vec<f64>,
    theta_ranges: Vec<(f64, f64)>,
}

impl Spsa {
    pub fn new(params: SpsaParams) -> Spsa {
        Spsa {
            params,
            loss_history: vec![],
            theta_ranges: vec![],
        }
    }

    /// Loss before each iteration, then the loss of the final estimate.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    /// Smallest and largest cell of the estimate after each iteration.
    pub fn theta_ranges(&self) -> &[(f64, f64)] {
        &self.theta_ranges
    }

    pub fn run<T, R>(&mut self, target: &mut T, initial: &OdMatrix<T::Key>, rng: &mut R)
                     -> OdMatrix<T::Key>
    where T: CalibrationTarget,
          R: Rng,
    {
        self.loss_history.clear();
        self.theta_ranges.clear();
        let keys: Vec<T::Key> = initial.keys().cloned().collect();
        let mut theta: Array<f64, Ix1> = keys.iter().map(|kk| clamp_theta(initial.flow(kk)))
            .collect();
        let pp = &self.params;

        for kk in 1..=pp.iterations {
            let loss = evaluate(target, &keys, &theta, rng);
            log::info!("SPSA iteration {} of {}: loss {:.4}", kk, pp.iterations, loss);
            self.loss_history.push(loss);

            let ak = pp.a / (pp.big_a + kk as f64).powf(pp.alpha);
            let ck = pp.c / (kk as f64).powf(pp.gamma);
            let delta: Array<f64, Ix1> = (0..keys.len())
                .map(|_| if rng.gen::<bool>() { 1. } else { -1. })
                .collect();
            let theta_plus = (&theta + &(&delta * ck)).mapv(clamp_theta);
            let theta_minus = (&theta - &(&delta * ck)).mapv(clamp_theta);
            let y_plus = evaluate(target, &keys, &theta_plus, rng);
            let y_minus = evaluate(target, &keys, &theta_minus, rng);

            let mut gradient: Array<f64, Ix1> = Array::zeros(keys.len());
            if (y_plus - y_minus).is_finite() {
                for ii in 0..keys.len() {
                    let dx = theta_plus[ii] - theta_minus[ii];
                    // both sides were clamped to the same bound
                    if dx != 0. {
                        gradient[ii] = (y_plus - y_minus) / dx;
                    }
                }
            } else {
                log::warn!("Non-finite loss at SPSA iteration {}; estimate left unchanged", kk);
            }
            theta = (&theta - &(gradient * ak)).mapv(clamp_theta);

            let lowest = theta.iter().cloned().fold(f64::INFINITY, f64::min);
            let highest = theta.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            self.theta_ranges.push((lowest, highest));
        }

        let loss = evaluate(target, &keys, &theta, rng);
        log::info!("SPSA final loss {:.4}", loss);
        self.loss_history.push(loss);
        to_matrix(&keys, &theta)
    }
}

/// Repeatedly assigns a matrix and scales each cell by the observed-over-simulated count ratio
/// along the routes its trips took.
#[derive(Clone, Debug)]
pub struct MatrixRebalancer {
    iterations: usize,
    loss_history: Vec<f64>,
}

impl MatrixRebalancer {
    pub fn new(iterations: usize) -> MatrixRebalancer {
        MatrixRebalancer{iterations, loss_history: vec![]}
    }

    /// Loss of the assignment made at the start of each iteration.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    pub fn run<T, R>(&mut self, target: &mut T, initial: &OdMatrix<T::Key>, rng: &mut R)
                     -> OdMatrix<T::Key>
    where T: CalibrationTarget,
          R: Rng,
    {
        self.loss_history.clear();
        let mut matrix = initial.rounded();
        for ii in 0..self.iterations {
            target.reset();
            target.assign(&matrix, rng);
            let loss = target.loss();
            log::info!("Rebalancing iteration {} of {}: loss {:.4}", ii + 1, self.iterations,
                       loss);
            self.loss_history.push(loss);
            let factors = target.scaling_factors();
            matrix = matrix.scaled_by(&factors).rounded();
        }
        matrix
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::{AssignmentParams, RouteChoiceParams};
    use super::super::test_utils::{seeded_rng, small_network};
    use super::super::vehicle::EnergyParams;
    use approx::assert_ulps_eq;

    /// Loss is the distance from a fixed matrix.
    struct DistanceTarget {
        goal: OdMatrix<u32>,
        current: OdMatrix<u32>,
    }

    impl DistanceTarget {
        fn new(goal: &[f64]) -> DistanceTarget {
            let mut matrix = OdMatrix::new();
            for (ii, flow) in goal.iter().enumerate() {
                matrix.set_flow(ii as u32, *flow);
            }
            DistanceTarget{goal: matrix, current: OdMatrix::new()}
        }
    }

    impl CalibrationTarget for DistanceTarget {
        type Key = u32;

        fn reset(&mut self) {
            self.current = OdMatrix::new();
        }

        fn assign<R: Rng>(&mut self, flows: &OdMatrix<u32>, _rng: &mut R) {
            self.current = flows.clone();
        }

        fn loss(&self) -> f64 {
            self.goal.keys()
                .map(|kk| (self.goal.flow(kk) - self.current.flow(kk)).powi(2))
                .sum::<f64>()
                .sqrt()
        }

        fn scaling_factors(&self) -> OdMatrix<u32> {
            let mut factors = OdMatrix::new();
            for (kk, goal) in self.goal.iter() {
                let current = self.current.flow(kk);
                if current > 0. {
                    factors.set_flow(*kk, goal / current);
                }
            }
            factors
        }
    }

    fn start(flows: &[f64]) -> OdMatrix<u32> {
        let mut matrix = OdMatrix::new();
        for (ii, flow) in flows.iter().enumerate() {
            matrix.set_flow(ii as u32, *flow);
        }
        matrix
    }

    #[test]
    fn test_spsa_moves_towards_goal() {
        let mut target = DistanceTarget::new(&[500.]);
        let mut spsa = Spsa::new(SpsaParams::default());
        let estimate = spsa.run(&mut target, &start(&[0.]), &mut seeded_rng());
        let history = spsa.loss_history();
        assert_eq!(history.len(), SpsaParams::default().iterations + 1);
        assert_ulps_eq!(history[0], 500.);
        assert!(history[history.len() - 1] < history[0]);
        assert!((estimate.flow(&0) - 500.).abs() < 500.);
        assert_eq!(estimate.flow(&0), estimate.flow(&0).round());
    }

    #[test]
    fn test_spsa_respects_bounds() {
        let mut target = DistanceTarget::new(&[2e7, 0., 30.]);
        let mut params = SpsaParams::default();
        params.a = 1e9;
        let mut spsa = Spsa::new(params);
        spsa.run(&mut target, &start(&[9.9e6, 5., 30.]), &mut seeded_rng());
        assert_eq!(spsa.theta_ranges().len(), 20);
        for (lowest, highest) in spsa.theta_ranges() {
            assert!(*lowest >= THETA_MIN);
            assert!(*highest <= THETA_MAX);
        }
    }

    #[test]
    fn test_spsa_on_small_network() {
        let network = small_network();
        let mut assignment = RoadNetworkAssignment::new(&network, AssignmentParams::default(),
                                                        RouteChoiceParams::default(),
                                                        EnergyParams::default());
        let mut odm = ZoneMatrix::new();
        odm.set_zone_flow("E01", "E02", 50.);
        odm.set_zone_flow("E02", "E01", 30.);
        odm.set_zone_flow("E01", "E01", 10.);
        odm.set_zone_flow("E02", "E02", 5.);

        let mut rng = seeded_rng();
        let mut spsa = Spsa::new(SpsaParams{iterations: 20, ..Default::default()});
        let calibrated = {
            let mut target = PassengerCalibration::new(&network, &mut assignment, None,
                                                       DemandZoning::Lad);
            spsa.run(&mut target, &odm, &mut rng)
        };
        assert_eq!(spsa.loss_history().len(), 21);
        assert!(spsa.loss_history().iter().all(|loss| loss.is_finite()));
        assert_eq!(spsa.theta_ranges().len(), 20);
        for (lowest, highest) in spsa.theta_ranges() {
            assert!(*lowest >= THETA_MIN && *lowest <= *highest && *highest <= THETA_MAX);
        }
        assert_eq!(calibrated.len(), 4);
        for (_, flow) in calibrated.iter() {
            assert!(*flow >= 0.);
            assert_eq!(*flow, flow.round());
        }
    }

    #[test]
    fn test_rebalancing() {
        let mut target = DistanceTarget::new(&[500., 20.]);
        let mut rebalancer = MatrixRebalancer::new(3);
        let result = rebalancer.run(&mut target, &start(&[100., 40.]), &mut seeded_rng());
        assert_ulps_eq!(result.flow(&0), 500.);
        assert_ulps_eq!(result.flow(&1), 20.);
        let history = rebalancer.loss_history();
        assert_eq!(history.len(), 3);
        assert!(history[0] > 0.);
        assert_ulps_eq!(history[1], 0.);
    }
}
