use std::collections::BTreeMap;
use std::path::Path;

use yaml_rust::Yaml;

use super::config_utils;
use super::error::{Result, TransportError};
use super::road_network::{EdgeId, NodeId, RoadNetwork};


/// Adds lanes to the edge between two nodes that carries a given count point.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadExpansion {
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub count_point: u32,
    pub lanes: u32,
    expanded_edge: Option<EdgeId>,
}

impl RoadExpansion {
    pub fn new(from_node: NodeId, to_node: NodeId, count_point: u32, lanes: u32)
               -> RoadExpansion {
        RoadExpansion{from_node, to_node, count_point, lanes, expanded_edge: None}
    }

    fn from_yaml(yaml_cfg: &Yaml) -> Result<RoadExpansion> {
        Ok(RoadExpansion::new(
            config_utils::require_usize(yaml_cfg, "fromNode")? as NodeId,
            config_utils::require_usize(yaml_cfg, "toNode")? as NodeId,
            config_utils::require_usize(yaml_cfg, "CP")? as u32,
            config_utils::require_usize(yaml_cfg, "number")? as u32,
        ))
    }

    pub fn expanded_edge(&self) -> Option<EdgeId> {
        self.expanded_edge
    }

    fn install(&mut self, network: &mut RoadNetwork) -> Result<()> {
        let edge_id = network.find_edge(self.from_node, self.to_node, Some(self.count_point))
            .ok_or_else(|| TransportError::InvalidIntervention {
                name: String::from("RoadExpansion"),
                reason: format!("no edge from {} to {} with count point {}", self.from_node,
                                self.to_node, self.count_point),
            })?;
        let lanes = network.edge(edge_id).map_or(0, |edge| edge.lanes);
        network.set_number_of_lanes(edge_id, lanes + self.lanes)?;
        self.expanded_edge = Some(edge_id);
        log::info!("Expanded edge {} from {} to {} lanes", edge_id, lanes, lanes + self.lanes);
        Ok(())
    }

    fn uninstall(&mut self, network: &mut RoadNetwork) -> Result<()> {
        if let Some(edge_id) = self.expanded_edge.take() {
            let lanes = network.edge(edge_id).map_or(0, |edge| edge.lanes);
            network.set_number_of_lanes(edge_id, lanes.saturating_sub(self.lanes))?;
            log::info!("Removed expansion of edge {}", edge_id);
        }
        Ok(())
    }
}

/// Builds a new road link between existing nodes, optionally in both directions.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadDevelopment {
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub bidirectional: bool,
    pub lanes_per_direction: u32,
    pub length_km: f64,
    /// road number or class prefix, e.g. "A" or "M"
    pub road_class: String,
    developed_edges: Vec<EdgeId>,
}

impl RoadDevelopment {
    pub fn new(from_node: NodeId, to_node: NodeId, bidirectional: bool, lanes_per_direction: u32,
               length_km: f64, road_class: &str) -> RoadDevelopment {
        RoadDevelopment {
            from_node,
            to_node,
            bidirectional,
            lanes_per_direction,
            length_km,
            road_class: String::from(road_class),
            developed_edges: vec![],
        }
    }

    fn from_yaml(yaml_cfg: &Yaml) -> Result<RoadDevelopment> {
        let road_class = config_utils::get_str(yaml_cfg, "roadClass")?.unwrap_or("A");
        Ok(RoadDevelopment::new(
            config_utils::require_usize(yaml_cfg, "fromNode")? as NodeId,
            config_utils::require_usize(yaml_cfg, "toNode")? as NodeId,
            config_utils::get_bool(yaml_cfg, "biDirectional", false)?,
            config_utils::require_usize(yaml_cfg, "lanesPerDirection")? as u32,
            config_utils::require_f64(yaml_cfg, "length")?,
            road_class,
        ))
    }

    pub fn developed_edges(&self) -> &[EdgeId] {
        &self.developed_edges
    }

    fn install(&mut self, network: &mut RoadNetwork) -> Result<()> {
        let mut ends = vec![(self.from_node, self.to_node)];
        if self.bidirectional {
            ends.push((self.to_node, self.from_node));
        }
        for (from, to) in ends {
            let created = network.create_road_link(from, to, &self.road_class,
                                                   Some(self.lanes_per_direction),
                                                   Some(self.length_km));
            match created {
                Ok(id) => self.developed_edges.push(id),
                Err(ee) => {
                    // leave the network as it was
                    self.uninstall(network)?;
                    return Err(ee);
                }
            }
        }
        Ok(())
    }

    fn uninstall(&mut self, network: &mut RoadNetwork) -> Result<()> {
        for edge_id in self.developed_edges.drain(..) {
            network.remove_road_link(edge_id)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterventionKind {
    RoadExpansion(RoadExpansion),
    RoadDevelopment(RoadDevelopment),
}

/// A change to the road network that is in force between two years, inclusive.
#[derive(Clone, Debug, PartialEq)]
pub struct Intervention {
    pub name: String,
    pub start_year: u32,
    pub end_year: u32,
    pub kind: InterventionKind,
    installed: bool,
}

impl Intervention {
    pub fn new(name: &str, start_year: u32, end_year: u32, kind: InterventionKind)
               -> Intervention {
        Intervention {
            name: String::from(name),
            start_year,
            end_year,
            kind,
            installed: false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn is_active(&self, year: u32) -> bool {
        self.start_year <= year && year <= self.end_year
    }

    /// Must be called between assignment passes; derived network indices are rebuilt.
    pub fn install(&mut self, network: &mut RoadNetwork) -> Result<()> {
        if self.installed {
            log::warn!("Intervention {} is already installed", self.name);
            return Ok(());
        }
        log::info!("Installing intervention {}", self.name);
        match &mut self.kind {
            InterventionKind::RoadExpansion(expansion) => expansion.install(network)?,
            InterventionKind::RoadDevelopment(development) => development.install(network)?,
        }
        self.installed = true;
        Ok(())
    }

    pub fn uninstall(&mut self, network: &mut RoadNetwork) -> Result<()> {
        if !self.installed {
            return Ok(());
        }
        log::info!("Uninstalling intervention {}", self.name);
        match &mut self.kind {
            InterventionKind::RoadExpansion(expansion) => expansion.uninstall(network)?,
            InterventionKind::RoadDevelopment(development) => development.uninstall(network)?,
        }
        self.installed = false;
        Ok(())
    }
}

/// Installs the interventions active in `year` and removes those that are not.  Returns how
/// many changed state.
pub fn apply_for_year(interventions: &mut [Intervention], network: &mut RoadNetwork, year: u32)
                      -> Result<usize> {
    let mut changed = 0;
    for intervention in interventions.iter_mut() {
        if intervention.is_active(year) && !intervention.is_installed() {
            intervention.install(network)?;
            changed += 1;
        } else if !intervention.is_active(year) && intervention.is_installed() {
            intervention.uninstall(network)?;
            changed += 1;
        }
    }
    Ok(changed)
}

type Constructor = Box<dyn Fn(&Yaml) -> Result<InterventionKind> + Send + Sync>;

/// Maps the `type` key of an intervention file to the constructor of its variant.
pub struct InterventionRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl Default for InterventionRegistry {
    fn default() -> Self {
        let mut registry = InterventionRegistry{constructors: BTreeMap::new()};
        registry.register("RoadExpansion", Box::new(|yaml_cfg: &Yaml| {
            Ok(InterventionKind::RoadExpansion(RoadExpansion::from_yaml(yaml_cfg)?))
        }));
        registry.register("RoadDevelopment", Box::new(|yaml_cfg: &Yaml| {
            Ok(InterventionKind::RoadDevelopment(RoadDevelopment::from_yaml(yaml_cfg)?))
        }));
        registry
    }
}

impl InterventionRegistry {
    pub fn register(&mut self, type_name: &str, constructor: Constructor) {
        self.constructors.insert(String::from(type_name), constructor);
    }

    pub fn type_names(&self) -> impl Iterator<Item = &String> {
        self.constructors.keys()
    }

    pub fn create(&self, yaml_cfg: &Yaml) -> Result<Intervention> {
        let type_name = config_utils::get_str(yaml_cfg, "type")?
            .ok_or_else(|| TransportError::config("type", "missing intervention type"))?;
        let constructor = self.constructors.get(type_name)
            .ok_or_else(|| TransportError::UnknownIntervention(String::from(type_name)))?;
        let kind = constructor(yaml_cfg)?;
        let name = config_utils::get_str(yaml_cfg, "name")?.unwrap_or(type_name);
        let start_year = config_utils::require_usize(yaml_cfg, "startYear")? as u32;
        let end_year = config_utils::require_usize(yaml_cfg, "endYear")? as u32;
        if end_year < start_year {
            return Err(TransportError::InvalidIntervention {
                name: String::from(name),
                reason: format!("end year {} precedes start year {}", end_year, start_year),
            });
        }
        Ok(Intervention::new(name, start_year, end_year, kind))
    }

    pub fn load_from_file(&self, path: &Path) -> Result<Intervention> {
        let yaml_cfg = config_utils::load_yaml_file(path)?;
        self.create(&yaml_cfg)
    }
}
