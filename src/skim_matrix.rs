use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::error::Result;
use super::od_matrix::{OdMatrix, ZonePair};


/// Sparse origin-destination costs: travel time, monetary cost or distance.
#[derive(Clone, Debug, PartialEq)]
pub struct SkimMatrix<K: Ord = ZonePair> {
    costs: BTreeMap<K, f64>,
}

impl<K: Ord> Default for SkimMatrix<K> {
    fn default() -> Self {
        SkimMatrix{costs: BTreeMap::new()}
    }
}

impl<K: Ord + Clone> SkimMatrix<K> {
    pub fn new() -> SkimMatrix<K> {
        SkimMatrix::default()
    }

    pub fn set_cost(&mut self, key: K, cost: f64) {
        self.costs.insert(key, cost);
    }

    pub fn cost(&self, key: &K) -> Option<f64> {
        self.costs.get(key).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &f64)> {
        self.costs.iter()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Unweighted mean over all stored pairs.
    pub fn average_cost(&self) -> f64 {
        if self.costs.is_empty() {
            return f64::NAN;
        }
        self.costs.values().sum::<f64>() / self.costs.len() as f64
    }

    /// Mean weighted by the integer flows of `flows`, over the pairs present in both.
    pub fn average_cost_weighted(&self, flows: &OdMatrix<K>) -> f64 {
        let mut weighted = 0.;
        let mut total_flow = 0;
        for (key, cost) in &self.costs {
            let flow = flows.int_flow(key);
            weighted += flow as f64 * cost;
            total_flow += flow;
        }
        weighted / total_flow as f64
    }

    /// Sum of absolute cost differences over this matrix's pairs.  Pairs missing from `other`
    /// count their full cost.
    pub fn absolute_difference(&self, other: &SkimMatrix<K>) -> f64 {
        self.costs.iter()
            .map(|(key, cost)| (cost - other.cost(key).unwrap_or(0.)).abs())
            .sum()
    }
}

impl SkimMatrix<ZonePair> {
    pub fn zone_cost(&self, origin: &str, destination: &str) -> Option<f64> {
        self.cost(&(String::from(origin), String::from(destination)))
    }

    /// Reads the same matrix layout as an OD matrix, with real-valued cells.  Empty cells are
    /// skipped.
    pub fn read_csv(path: &Path) -> Result<SkimMatrix> {
        let mut reader = csv::Reader::from_path(path)?;
        let destinations: Vec<String> = reader.headers()?.iter().skip(1).map(String::from)
            .collect();
        let mut skim = SkimMatrix::new();
        for result in reader.records() {
            let record = result?;
            let origin = match record.get(0) {
                Some(origin) => origin.to_string(),
                None => continue,
            };
            for (dest, cell) in destinations.iter().zip(record.iter().skip(1)) {
                if cell.trim().is_empty() {
                    continue;
                }
                skim.set_cost((origin.clone(), dest.clone()), cell.trim().parse()?);
            }
        }
        Ok(skim)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let origins: BTreeSet<&String> = self.costs.keys().map(|(oo, _)| oo).collect();
        let destinations: BTreeSet<&String> = self.costs.keys().map(|(_, dd)| dd).collect();
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![String::from("origin")];
        header.extend(destinations.iter().map(|dd| (*dd).clone()));
        writer.write_record(&header)?;
        for origin in &origins {
            let mut row = vec![(*origin).clone()];
            for dest in &destinations {
                let cell = self.costs.get(&((*origin).clone(), (*dest).clone()))
                    .map_or(String::new(), |cc| cc.to_string());
                row.push(cell);
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::od_matrix::ZoneMatrix;
    use approx::assert_ulps_eq;

    fn key(origin: &str, destination: &str) -> ZonePair {
        (String::from(origin), String::from(destination))
    }

    #[test]
    fn test_averages() {
        let mut skim = SkimMatrix::new();
        skim.set_cost(key("E01", "E01"), 2.);
        skim.set_cost(key("E01", "E02"), 10.);
        assert_ulps_eq!(skim.average_cost(), 6.);
        let mut flows = ZoneMatrix::new();
        flows.set_zone_flow("E01", "E01", 3.);
        flows.set_zone_flow("E01", "E02", 1.);
        assert_ulps_eq!(skim.average_cost_weighted(&flows), 4.);
        assert!(SkimMatrix::<ZonePair>::new().average_cost().is_nan());
    }

    #[test]
    fn test_absolute_difference() {
        let mut aa = SkimMatrix::new();
        aa.set_cost(key("E01", "E01"), 2.);
        aa.set_cost(key("E01", "E02"), 10.);
        let mut bb = aa.clone();
        assert_ulps_eq!(aa.absolute_difference(&bb), 0.);
        bb.set_cost(key("E01", "E02"), 7.5);
        assert_ulps_eq!(aa.absolute_difference(&bb), 2.5);
    }

    #[test]
    fn test_csv_round_trip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("skim.csv");
        let mut skim = SkimMatrix::new();
        skim.set_cost(key("E01", "E01"), 1.25);
        skim.set_cost(key("E02", "E01"), 7.5);
        skim.write_csv(&path)?;
        let read = SkimMatrix::<ZonePair>::read_csv(&path)?;
        assert_eq!(read, skim);
        assert_eq!(read.zone_cost("E01", "E02"), None);
        Ok(())
    }
}
