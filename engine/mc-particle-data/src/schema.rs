//! Raw on-disk schema of a data set
//!
//! These types mirror the generated JSON/YAML one-to-one and do no
//! validation beyond what serde enforces. The loader turns them into the
//! checked model in [`profile`](crate::profile) and [`rules`](crate::rules).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::profile::{Behavior, SizeCurve};

/// Serialization format of a data-set document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(DataError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// A whole data set: one game version's profiles and rules
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DataSetDefinition {
    /// Game version, e.g. "1.20.4"
    pub version: String,
    /// Particle id to physics profile
    #[serde(default)]
    pub physics: BTreeMap<String, ProfileDefinition>,
    /// Block type id to its emission rules, in declaration order
    #[serde(default)]
    pub blocks: BTreeMap<String, Vec<RuleDefinition>>,
    /// Entity type id to its emission rules, in declaration order
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<RuleDefinition>>,
}

impl DataSetDefinition {
    /// Load a data set from a JSON or YAML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = DataFormat::from_path(path)?;
        let text = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str_with(&text, format)
    }

    /// Parse a data set from a string
    pub fn from_str_with(text: &str, format: DataFormat) -> Result<Self> {
        Ok(match format {
            DataFormat::Json => serde_json::from_str(text)?,
            DataFormat::Yaml => serde_yaml_ng::from_str(text)?,
        })
    }

    /// Load a data set from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_str_with(json, DataFormat::Json)
    }

    /// Load a data set from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::from_str_with(yaml, DataFormat::Yaml)
    }
}

/// Formula source as it appears in the data: text, a bare number or a flag
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExprSource {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ExprSource {
    /// Formula text to compile
    pub fn formula(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            // `{:?}` keeps a decimal point so `1.0` stays a double
            Self::Number(v) => format!("{v:?}"),
            Self::Text(v) => v.clone(),
        }
    }
}

impl From<&str> for ExprSource {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// `[min, max]` or a single fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RangeDefinition {
    Fixed(u32),
    Range([u32; 2]),
}

/// Scalar applied to all axes, or one value per axis
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AxesDefinition {
    Uniform(f64),
    PerAxis([f64; 3]),
}

/// Physics profile of one particle type
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDefinition {
    pub lifetime: Option<RangeDefinition>,
    pub gravity: Option<f64>,
    pub friction: Option<AxesDefinition>,
    #[serde(default)]
    pub skips_friction: bool,
    pub velocity_multiplier: Option<AxesDefinition>,
    pub velocity_add: Option<AxesDefinition>,
    pub velocity_jitter: Option<AxesDefinition>,
    /// RGB or RGBA, components in `[0, 1]`
    pub color_base: Option<Vec<f64>>,
    pub color_target: Option<Vec<f64>>,
    pub color_scale: Option<f64>,
    #[serde(default)]
    pub lifetime_animation: bool,
    pub base_size: Option<f64>,
    pub size_curve: Option<SizeCurve>,
    #[serde(default)]
    pub spawns_particles: Vec<ChildDefinition>,
    #[serde(default)]
    pub on_death: Vec<ChildDefinition>,
    pub behavior: Option<Behavior>,
    #[serde(default)]
    pub textures: Vec<String>,
    #[serde(default)]
    pub sprite_from_age: bool,
}

/// Conditional child spawn attached to a profile
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChildDefinition {
    pub particle: String,
    /// Defaults to always
    pub probability: Option<ExprSource>,
    pub lifetime: Option<u32>,
}

/// Fixed payload for parameterized particle kinds (colored dust and the like)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OptionsDefinition {
    pub color: Option<Vec<f64>>,
    pub scale: Option<f64>,
}

/// Counted emission loop
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoopDefinition {
    pub count: ExprSource,
    /// Name the iteration index is bound to
    #[serde(default = "default_loop_index")]
    pub index: String,
}

fn default_loop_index() -> String {
    "i".to_string()
}

/// One emission rule of a block or entity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleDefinition {
    pub hook: String,
    pub particle: String,
    pub options: Option<OptionsDefinition>,
    pub condition: Option<String>,
    #[serde(default)]
    pub position: Vec<ExprSource>,
    #[serde(default)]
    pub velocity: Vec<ExprSource>,
    pub probability: Option<ExprSource>,
    pub count: Option<ExprSource>,
    #[serde(rename = "loop")]
    pub emission_loop: Option<LoopDefinition>,
    pub lifetime: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DataFormat::from_path(&PathBuf::from("a/b.JSON")).unwrap(),
            DataFormat::Json
        );
        assert_eq!(
            DataFormat::from_path(&PathBuf::from("b.yml")).unwrap(),
            DataFormat::Yaml
        );
        assert!(DataFormat::from_path(&PathBuf::from("b.toml")).is_err());
    }

    #[test]
    fn test_expr_source_formula() {
        assert_eq!(ExprSource::Number(1.0).formula(), "1.0");
        assert_eq!(ExprSource::Number(0.25).formula(), "0.25");
        assert_eq!(ExprSource::Bool(true).formula(), "true");
        assert_eq!(ExprSource::from("$0.x").formula(), "$0.x");
    }

    #[test]
    fn test_profile_definition_yaml() {
        let yaml = r#"
version: "1.20.4"
physics:
  flame:
    lifetime: [8, 12]
    friction: [0.96, 0.9, 0.96]
    colorBase: [1.0, 0.6, 0.2]
    sizeCurve: { type: quadratic_shrink, factor: 1.0 }
    behavior: { type: rising_flame, drift: 0.004 }
"#;
        let set = DataSetDefinition::from_yaml_str(yaml).unwrap();
        let flame = &set.physics["flame"];
        assert_eq!(flame.lifetime, Some(RangeDefinition::Range([8, 12])));
        assert_eq!(
            flame.friction,
            Some(AxesDefinition::PerAxis([0.96, 0.9, 0.96]))
        );
        assert_eq!(flame.gravity, None);
        assert!(set.blocks.is_empty());
    }

    #[test]
    fn test_rule_definition_json() {
        let json = r#"{
            "version": "1.20.4",
            "blocks": {
                "candle": [{
                    "hook": "animateTick",
                    "particle": "small_flame",
                    "condition": "LIT && CANDLES=1",
                    "position": ["$2.getX() + 0.5", "$2.getY() + 0.7", 0.5],
                    "velocity": [0, 0, 0],
                    "loop": { "count": 2 }
                }]
            }
        }"#;
        let set = DataSetDefinition::from_json_str(json).unwrap();
        let rule = &set.blocks["candle"][0];
        assert_eq!(rule.position[2], ExprSource::Number(0.5));
        assert_eq!(rule.emission_loop.as_ref().map(|l| l.index.as_str()), Some("i"));
    }
}
