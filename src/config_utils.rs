use std::path::Path;
use std::path::PathBuf;

use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::error::{Result, TransportError};


pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

/// Reads the first document of a YAML file.  An empty file yields an empty mapping.
pub fn load_yaml_file(path: &Path) -> Result<Yaml> {
    let file_contents = std::fs::read_to_string(path)?;
    let mut docs = YamlLoader::load_from_str(&file_contents)?;
    if docs.is_empty() {
        return Ok(Yaml::Hash(Default::default()));
    }
    Ok(docs.swap_remove(0))
}

fn as_number(value: &Yaml) -> Option<f64> {
    match value {
        Yaml::Real(_) => value.as_f64(),
        Yaml::Integer(ii) => Some(*ii as f64),
        _ => None,
    }
}

pub fn get_f64(yaml_cfg: &Yaml, key: &str, default: f64) -> Result<f64> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() {
        return Ok(default);
    }
    as_number(value).ok_or_else(|| TransportError::config(key, "expected a number"))
}

pub fn get_usize(yaml_cfg: &Yaml, key: &str, default: usize) -> Result<usize> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() {
        return Ok(default);
    }
    match value.as_i64() {
        Some(ii) if ii >= 0 => Ok(ii as usize),
        _ => Err(TransportError::config(key, "expected a non-negative integer")),
    }
}

/// Like `get_usize`, but a missing key is an error.
pub fn require_usize(yaml_cfg: &Yaml, key: &str) -> Result<usize> {
    if yaml_cfg[key].is_badvalue() {
        return Err(TransportError::config(key, "missing required value"));
    }
    get_usize(yaml_cfg, key, 0)
}

pub fn require_f64(yaml_cfg: &Yaml, key: &str) -> Result<f64> {
    if yaml_cfg[key].is_badvalue() {
        return Err(TransportError::config(key, "missing required value"));
    }
    get_f64(yaml_cfg, key, 0.)
}

pub fn get_u64(yaml_cfg: &Yaml, key: &str, default: u64) -> Result<u64> {
    Ok(get_usize(yaml_cfg, key, default as usize)? as u64)
}

pub fn get_bool(yaml_cfg: &Yaml, key: &str, default: bool) -> Result<bool> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() {
        return Ok(default);
    }
    value.as_bool().ok_or_else(|| TransportError::config(key, "expected true or false"))
}

pub fn get_str<'a>(yaml_cfg: &'a Yaml, key: &str) -> Result<Option<&'a str>> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    match value.as_str() {
        Some(ss) => Ok(Some(ss)),
        None => Err(TransportError::config(key, "expected a string")),
    }
}

/// Accepts either a YAML sequence of numbers or a single comma-separated string.
pub fn get_f64_list(yaml_cfg: &Yaml, key: &str) -> Result<Option<Vec<f64>>> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    if let Some(items) = value.as_vec() {
        let numbers: Option<Vec<f64>> = items.iter().map(as_number).collect();
        return numbers.map(Some)
            .ok_or_else(|| TransportError::config(key, "expected a list of numbers"));
    }
    if let Some(ss) = value.as_str() {
        let mut numbers = vec![];
        for part in ss.split(',') {
            numbers.push(part.trim().parse::<f64>()
                .map_err(|ee| TransportError::config(key, ee.to_string()))?);
        }
        return Ok(Some(numbers));
    }
    Err(TransportError::config(key, "expected a list of numbers"))
}

/// Returns the string-valued entries whose keys start with `prefix`, ordered by key.
pub fn get_prefixed_strs<'a>(yaml_cfg: &'a Yaml, prefix: &str) -> Vec<(&'a str, &'a str)> {
    let mut entries = vec![];
    if let Some(hash) = yaml_cfg.as_hash() {
        for (key, value) in hash {
            if let (Some(key), Some(value)) = (key.as_str(), value.as_str()) {
                if key.starts_with(prefix) {
                    entries.push((key, value));
                }
            }
        }
    }
    entries.sort();
    entries
}
