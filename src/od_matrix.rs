use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, TransportError};
use super::vehicle::VehicleType;


pub type ZonePair = (String, String);

/// Freight flows are keyed by freight zone and vehicle type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FreightKey {
    pub origin: u32,
    pub destination: u32,
    pub vehicle: VehicleType,
}

impl FreightKey {
    pub fn new(origin: u32, destination: u32, vehicle: VehicleType) -> FreightKey {
        FreightKey{origin, destination, vehicle}
    }
}

/// A sparse origin-destination flow table.  Flows are stored as reals; discrete trip counts are
/// read off by rounding.
#[derive(Clone, Debug, PartialEq)]
pub struct OdMatrix<K: Ord> {
    flows: BTreeMap<K, f64>,
}

pub type ZoneMatrix = OdMatrix<ZonePair>;
pub type FreightMatrix = OdMatrix<FreightKey>;

impl<K: Ord> Default for OdMatrix<K> {
    fn default() -> Self {
        OdMatrix{flows: BTreeMap::new()}
    }
}

impl<K: Ord + Clone> OdMatrix<K> {
    pub fn new() -> OdMatrix<K> {
        OdMatrix::default()
    }

    pub fn set_flow(&mut self, key: K, flow: f64) {
        self.flows.insert(key, flow);
    }

    pub fn add_flow(&mut self, key: K, flow: f64) {
        *self.flows.entry(key).or_insert(0.) += flow;
    }

    /// Zero for keys that are not in the matrix.
    pub fn flow(&self, key: &K) -> f64 {
        self.flows.get(key).cloned().unwrap_or(0.)
    }

    /// The flow as a discrete number of trips.
    pub fn int_flow(&self, key: &K) -> u64 {
        let flow = self.flow(key);
        if flow > 0. { flow.round() as u64 } else { 0 }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.flows.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.flows.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &f64)> {
        self.flows.iter()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn total_flow(&self) -> f64 {
        self.flows.values().sum()
    }

    pub fn total_int_flow(&self) -> u64 {
        self.flows.keys().map(|kk| self.int_flow(kk)).sum()
    }

    /// A copy with every flow rounded to the nearest integer.
    pub fn rounded(&self) -> OdMatrix<K> {
        let flows = self.flows.iter().map(|(kk, ff)| (kk.clone(), ff.round())).collect();
        OdMatrix{flows}
    }

    pub fn scaled(&self, factor: f64) -> OdMatrix<K> {
        let flows = self.flows.iter().map(|(kk, ff)| (kk.clone(), ff * factor)).collect();
        OdMatrix{flows}
    }

    /// Multiplies each flow by the matching factor; keys without a factor are unchanged.
    pub fn scaled_by(&self, factors: &OdMatrix<K>) -> OdMatrix<K> {
        let flows = self.flows.iter()
            .map(|(kk, ff)| {
                let factor = factors.flows.get(kk).cloned().unwrap_or(1.);
                (kk.clone(), ff * factor)
            })
            .collect();
        OdMatrix{flows}
    }
}

impl OdMatrix<ZonePair> {
    pub fn set_zone_flow(&mut self, origin: &str, destination: &str, flow: f64) {
        self.set_flow((String::from(origin), String::from(destination)), flow);
    }

    pub fn zone_flow(&self, origin: &str, destination: &str) -> f64 {
        self.flow(&(String::from(origin), String::from(destination)))
    }

    pub fn origins(&self) -> Vec<String> {
        let origins: BTreeSet<&String> = self.flows.keys().map(|(oo, _)| oo).collect();
        origins.into_iter().cloned().collect()
    }

    pub fn destinations(&self) -> Vec<String> {
        let dests: BTreeSet<&String> = self.flows.keys().map(|(_, dd)| dd).collect();
        dests.into_iter().cloned().collect()
    }

    /// Sums fine-grained flows into the zones returned by `zone_of`.  Flows from or to an
    /// unmapped zone are dropped with a warning.
    pub fn aggregate<'a, F>(&self, zone_of: F) -> ZoneMatrix
    where F: Fn(&str) -> Option<&'a str>,
    {
        let mut aggregated = ZoneMatrix::new();
        let mut unmapped = 0;
        for ((origin, destination), flow) in &self.flows {
            match (zone_of(origin), zone_of(destination)) {
                (Some(oz), Some(dz)) => {
                    aggregated.add_flow((String::from(oz), String::from(dz)), *flow);
                }
                _ => unmapped += 1,
            }
        }
        if unmapped > 0 {
            log::warn!("{} OD pairs could not be mapped to coarser zones", unmapped);
        }
        aggregated
    }

    /// Reads a matrix-format CSV: a header of destination codes after one leading column, then
    /// one row per origin.
    pub fn read_csv(path: &Path) -> Result<ZoneMatrix> {
        let mut reader = csv::Reader::from_path(path)?;
        let destinations: Vec<String> = reader.headers()?.iter().skip(1).map(String::from)
            .collect();
        let mut matrix = ZoneMatrix::new();
        for result in reader.records() {
            let record = result?;
            let origin = match record.get(0) {
                Some(origin) => origin.to_string(),
                None => continue,
            };
            for (dest, cell) in destinations.iter().zip(record.iter().skip(1)) {
                let flow: f64 = cell.trim().parse()?;
                matrix.set_flow((origin.clone(), dest.clone()), flow);
            }
        }
        Ok(matrix)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let origins = self.origins();
        let destinations = self.destinations();
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![String::from("origin")];
        header.extend(destinations.iter().cloned());
        writer.write_record(&header)?;
        for origin in &origins {
            let mut row = vec![origin.clone()];
            for dest in &destinations {
                row.push(self.zone_flow(origin, dest).to_string());
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a list-format CSV with columns origin, destination, flow.
    pub fn read_list_csv(path: &Path) -> Result<ZoneMatrix> {
        #[derive(Deserialize)]
        struct Row {
            origin: String,
            destination: String,
            flow: f64,
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut matrix = ZoneMatrix::new();
        for result in reader.deserialize() {
            let row: Row = result?;
            matrix.set_flow((row.origin, row.destination), row.flow);
        }
        Ok(matrix)
    }

    pub fn write_list_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&["origin", "destination", "flow"])?;
        for ((origin, destination), flow) in &self.flows {
            writer.write_record(&[origin.clone(), destination.clone(), flow.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl OdMatrix<FreightKey> {
    /// Reads a freight CSV with columns origin, destination, vehicleType, flow.  Vehicle types
    /// are the numeric freight codes.
    pub fn read_csv(path: &Path) -> Result<FreightMatrix> {
        #[derive(Deserialize)]
        struct Row {
            origin: u32,
            destination: u32,
            #[serde(rename = "vehicleType")]
            vehicle_type: u32,
            flow: f64,
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut matrix = FreightMatrix::new();
        for result in reader.deserialize() {
            let row: Row = result?;
            let vehicle = VehicleType::from_freight_code(row.vehicle_type).ok_or_else(|| {
                TransportError::config("vehicleType",
                                       format!("unknown freight vehicle code {}", row.vehicle_type))
            })?;
            matrix.set_flow(FreightKey::new(row.origin, row.destination, vehicle), row.flow);
        }
        Ok(matrix)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&["origin", "destination", "vehicleType", "flow"])?;
        for (key, flow) in &self.flows {
            let code = key.vehicle.freight_code().unwrap_or(0);
            writer.write_record(&[key.origin.to_string(), key.destination.to_string(),
                                  code.to_string(), flow.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;
    use std::io::Write;

    fn small_matrix() -> ZoneMatrix {
        let mut odm = ZoneMatrix::new();
        odm.set_zone_flow("E01", "E01", 3.);
        odm.set_zone_flow("E01", "E02", 5.4);
        odm.set_zone_flow("E02", "E01", 2.5);
        odm.set_zone_flow("E02", "E02", 0.);
        odm
    }

    #[test]
    fn test_flows_and_totals() {
        let odm = small_matrix();
        assert_ulps_eq!(odm.zone_flow("E01", "E02"), 5.4);
        assert_ulps_eq!(odm.zone_flow("E03", "E02"), 0.);
        assert_eq!(odm.int_flow(&(String::from("E01"), String::from("E02"))), 5);
        assert_eq!(odm.int_flow(&(String::from("E02"), String::from("E01"))), 3);
        assert_ulps_eq!(odm.total_flow(), 10.9);
        assert_eq!(odm.total_int_flow(), 11);
        assert_eq!(odm.origins(), vec!["E01", "E02"]);
        let rounded = odm.rounded();
        assert_ulps_eq!(rounded.zone_flow("E01", "E02"), 5.);
    }

    #[test]
    fn test_scaling() {
        let odm = small_matrix();
        assert_ulps_eq!(odm.scaled(2.).zone_flow("E01", "E01"), 6.);
        let mut factors = ZoneMatrix::new();
        factors.set_zone_flow("E01", "E01", 0.5);
        let scaled = odm.scaled_by(&factors);
        assert_ulps_eq!(scaled.zone_flow("E01", "E01"), 1.5);
        assert_ulps_eq!(scaled.zone_flow("E01", "E02"), 5.4);
    }

    #[test]
    fn test_aggregate() {
        let mut fine = ZoneMatrix::new();
        fine.set_zone_flow("t1", "t3", 2.);
        fine.set_zone_flow("t2", "t3", 3.);
        fine.set_zone_flow("t2", "t1", 1.);
        fine.set_zone_flow("t9", "t1", 7.);
        let lads: BTreeMap<&str, &str> = [("t1", "E01"), ("t2", "E01"), ("t3", "E02")]
            .iter().cloned().collect();
        let coarse = fine.aggregate(|zone| lads.get(zone).cloned());
        assert_eq!(coarse.len(), 2);
        assert_ulps_eq!(coarse.zone_flow("E01", "E02"), 5.);
        assert_ulps_eq!(coarse.zone_flow("E01", "E01"), 1.);
    }

    #[test]
    fn test_matrix_csv() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("odm.csv");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "origin,E01,E02")?;
        writeln!(file, "E01,3,5")?;
        writeln!(file, "E02,2,0")?;
        drop(file);
        let odm = ZoneMatrix::read_csv(&path)?;
        assert_eq!(odm.len(), 4);
        assert_ulps_eq!(odm.zone_flow("E01", "E02"), 5.);

        let out = dir.path().join("out.csv");
        odm.write_csv(&out)?;
        assert_eq!(ZoneMatrix::read_csv(&out)?, odm);
        let list = dir.path().join("list.csv");
        odm.write_list_csv(&list)?;
        assert_eq!(ZoneMatrix::read_list_csv(&list)?, odm);
        Ok(())
    }

    #[test]
    fn test_freight_csv() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("freight.csv");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "origin,destination,vehicleType,flow")?;
        writeln!(file, "1,2,1,4")?;
        writeln!(file, "2,1500,3,2")?;
        drop(file);
        let fm = FreightMatrix::read_csv(&path)?;
        assert_eq!(fm.len(), 2);
        assert_eq!(fm.int_flow(&FreightKey::new(2, 1500, VehicleType::Artic)), 2);
        let out = dir.path().join("out.csv");
        fm.write_csv(&out)?;
        assert_eq!(FreightMatrix::read_csv(&out)?, fm);

        let bad = dir.path().join("bad.csv");
        let mut file = std::fs::File::create(&bad)?;
        writeln!(file, "origin,destination,vehicleType,flow")?;
        writeln!(file, "1,2,7,4")?;
        drop(file);
        assert!(FreightMatrix::read_csv(&bad).is_err());
        Ok(())
    }
}
