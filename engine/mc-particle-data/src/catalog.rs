//! Loading data sets side by side, one per game version

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::{debug, warn};

use crate::error::{DataError, Result};
use crate::hooks::SourceKind;
use crate::profile::{ParticleProfile, ProfileRef};
use crate::registry::ProfileRegistry;
use crate::rules::{EmissionRule, RuleIndex};
use crate::schema::{DataSetDefinition, RuleDefinition};
use crate::version::GameVersion;

/// Which entry of a data set a rejection refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionScope {
    Profile {
        particle: String,
    },
    Rule {
        source: SourceKind,
        source_id: String,
        hook: String,
        /// Position in the source's rule list
        index: usize,
    },
}

impl fmt::Display for RejectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile { particle } => write!(f, "particle `{particle}`"),
            Self::Rule {
                source,
                source_id,
                hook,
                index,
            } => write!(f, "{source} `{source_id}` rule #{index} ({hook})"),
        }
    }
}

/// A profile or rule that was left out of a data set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub version: GameVersion,
    pub scope: RejectionScope,
    pub reason: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.version, self.scope, self.reason)
    }
}

/// Outcome of loading one data set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub version: GameVersion,
    pub profiles_loaded: usize,
    pub rules_loaded: usize,
    pub rejections: Vec<Rejection>,
    /// Non-fatal findings, e.g. child cycles
    pub warnings: Vec<String>,
}

impl LoadReport {
    fn new(version: GameVersion) -> Self {
        Self {
            version,
            profiles_loaded: 0,
            rules_loaded: 0,
            rejections: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when nothing was rejected
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
    }

    fn reject(&mut self, scope: RejectionScope, reason: String) {
        let rejection = Rejection {
            version: self.version,
            scope,
            reason,
        };
        warn!("Rejected {rejection}");
        self.rejections.push(rejection);
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} profiles, {} rules loaded, {} rejected, {} warnings",
            self.version,
            self.profiles_loaded,
            self.rules_loaded,
            self.rejections.len(),
            self.warnings.len()
        )
    }
}

/// Profiles and rules of one game version
#[derive(Debug)]
pub struct DataSet {
    version: GameVersion,
    profiles: ProfileRegistry,
    rules: RuleIndex,
}

impl DataSet {
    /// Validate and compile a definition. Only an unparsable version is
    /// fatal; broken entries are rejected into the report.
    pub fn from_definition(def: &DataSetDefinition) -> Result<(Self, LoadReport)> {
        let version = GameVersion::from_string(&def.version)?;
        let mut report = LoadReport::new(version);

        let profiles = load_profiles(def, &mut report);
        for cycle in profiles.find_cycles() {
            let message = format!(
                "particle cycle {}; bounded by the spawn depth cap",
                cycle.join(" -> ")
            );
            warn!("[{version}] {message}");
            report.warnings.push(message);
        }

        let mut rules = RuleIndex::new();
        load_rules(SourceKind::Block, &def.blocks, &profiles, &mut rules, &mut report);
        load_rules(SourceKind::Entity, &def.entities, &profiles, &mut rules, &mut report);

        report.profiles_loaded = profiles.len();
        report.rules_loaded = rules.len();
        debug!("Loaded data set {report}");

        Ok((
            Self {
                version,
                profiles,
                rules,
            },
            report,
        ))
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn rules(&self) -> &RuleIndex {
        &self.rules
    }

    /// Resolve a particle id within this data set
    pub fn resolve(&self, id: &str) -> Option<&ProfileRef> {
        self.profiles.resolve(id)
    }

    /// Rules for a source and hook, in declaration order
    pub fn lookup(&self, source: SourceKind, source_id: &str, hook: &str) -> &[EmissionRule] {
        self.rules.lookup(source, source_id, hook)
    }
}

fn load_profiles(def: &DataSetDefinition, report: &mut LoadReport) -> ProfileRegistry {
    let mut registry = ProfileRegistry::new();
    for (id, profile_def) in &def.physics {
        match ParticleProfile::from_definition(id, profile_def) {
            Ok(profile) => registry.insert(profile),
            Err(reasons) => report.reject(
                RejectionScope::Profile {
                    particle: id.clone(),
                },
                reasons.join("; "),
            ),
        }
    }

    // Dropping a profile can orphan its parents, so repeat until stable
    loop {
        let broken: Vec<(String, String)> = registry
            .iter()
            .filter_map(|profile| {
                child_problem(profile, &registry).map(|reason| (profile.id.clone(), reason))
            })
            .collect();
        if broken.is_empty() {
            break;
        }
        for (id, reason) in broken {
            registry.remove(&id);
            report.reject(RejectionScope::Profile { particle: id }, reason);
        }
    }
    registry
}

fn child_problem(profile: &ParticleProfile, registry: &ProfileRegistry) -> Option<String> {
    for child in profile.spawns_particles.iter().chain(&profile.on_death) {
        let Some(target) = registry.resolve(&child.particle) else {
            return Some(format!("unknown child particle `{}`", child.particle));
        };
        if target.lifetime.is_none() && child.lifetime.is_none() {
            return Some(format!(
                "child particle `{}` has no lifetime and the entry does not supply one",
                child.particle
            ));
        }
    }
    None
}

fn load_rules(
    source: SourceKind,
    sources: &BTreeMap<String, Vec<RuleDefinition>>,
    profiles: &ProfileRegistry,
    rules: &mut RuleIndex,
    report: &mut LoadReport,
) {
    for (source_id, defs) in sources {
        for (index, def) in defs.iter().enumerate() {
            let scope = || RejectionScope::Rule {
                source,
                source_id: source_id.clone(),
                hook: def.hook.clone(),
                index,
            };
            let rule = match EmissionRule::compile(source, source_id, def) {
                Ok(rule) => rule,
                Err(reason) => {
                    report.reject(scope(), reason);
                    continue;
                }
            };
            let Some(profile) = profiles.resolve(&rule.particle) else {
                report.reject(scope(), format!("unknown particle `{}`", rule.particle));
                continue;
            };
            if profile.lifetime.is_none()
                && rule.lifetime.is_none()
                && rule.hook.default_lifetime.is_none()
            {
                report.reject(
                    scope(),
                    format!(
                        "particle `{}` has no lifetime and the rule does not supply one",
                        rule.particle
                    ),
                );
                continue;
            }
            rules.push(rule);
        }
    }
}

/// Every loaded data set, keyed by version
#[derive(Debug, Default)]
pub struct ParticleCatalog {
    sets: BTreeMap<GameVersion, DataSet>,
}

impl ParticleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data set; a version can only be loaded once
    pub fn add(&mut self, def: &DataSetDefinition) -> Result<LoadReport> {
        let version = GameVersion::from_string(&def.version)?;
        if self.sets.contains_key(&version) {
            return Err(DataError::DuplicateVersion(version));
        }
        let (set, report) = DataSet::from_definition(def)?;
        self.sets.insert(version, set);
        Ok(report)
    }

    /// Load a JSON or YAML data set from disk
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadReport> {
        let path = path.as_ref();
        debug!("Loading data set {}", path.display());
        let def = DataSetDefinition::from_path(path)?;
        self.add(&def)
    }

    /// Data set of `version`
    pub fn data_set(&self, version: GameVersion) -> Result<&DataSet> {
        self.sets
            .get(&version)
            .ok_or(DataError::UnknownVersion(version))
    }

    /// Resolve a particle id in the data set of `version`
    pub fn resolve(&self, id: &str, version: GameVersion) -> Option<&ProfileRef> {
        self.sets.get(&version)?.resolve(id)
    }

    /// Rules for a source and hook in the data set of `version`
    pub fn lookup(
        &self,
        version: GameVersion,
        source: SourceKind,
        source_id: &str,
        hook: &str,
    ) -> &[EmissionRule] {
        self.sets
            .get(&version)
            .map(|set| set.lookup(source, source_id, hook))
            .unwrap_or(&[])
    }

    /// Loaded versions, oldest first
    pub fn versions(&self) -> impl Iterator<Item = GameVersion> + '_ {
        self.sets.keys().copied()
    }

    /// Newest loaded version
    pub fn latest(&self) -> Option<GameVersion> {
        self.sets.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const YAML: &str = r#"
version: "1.20.4"
physics:
  lava:
    lifetime: [16, 40]
    spawnsParticles:
      - particle: smoke
        probability: "random() > age / lifetime"
  smoke:
    lifetime: 8
  orphan:
    lifetime: 4
    onDeath:
      - particle: missing
  dust: {}
blocks:
  lava:
    - hook: animateTick
      particle: lava
      position: ["$2.getX() + 0.5", "$2.getY() + 1.0", "$2.getZ() + 0.5"]
      velocity: [0, 0, 0]
    - hook: animateTick
      particle: dust
      position: [0, 0, 0]
      velocity: [0, 0, 0]
    - hook: animateTick
      particle: dust
      lifetime: 10
      position: [0, 0, 0]
      velocity: [0, 0, 0]
    - hook: animateTick
      particle: ghost
      position: [0, 0, 0]
      velocity: [0, 0, 0]
"#;

    #[test]
    fn test_load_rejects_only_broken_entries() {
        let mut catalog = ParticleCatalog::new();
        let report = catalog.add(&DataSetDefinition::from_yaml_str(YAML).unwrap()).unwrap();

        assert_eq!(report.profiles_loaded, 3);
        assert_eq!(report.rules_loaded, 2);
        let scopes: Vec<String> = report.rejections.iter().map(|r| r.scope.to_string()).collect();
        assert_eq!(
            scopes,
            vec![
                "particle `orphan`".to_string(),
                "block `lava` rule #1 (animateTick)".to_string(),
                "block `lava` rule #3 (animateTick)".to_string(),
            ]
        );

        let version = GameVersion::new(1, 20, 4);
        assert!(catalog.resolve("lava", version).is_some());
        assert!(catalog.resolve("orphan", version).is_none());
        let rules = catalog.lookup(version, SourceKind::Block, "lava", "animateTick");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].lifetime, Some(10));
    }

    #[test]
    fn test_duplicate_version_is_an_error() {
        let def = DataSetDefinition::from_yaml_str(YAML).unwrap();
        let mut catalog = ParticleCatalog::new();
        catalog.add(&def).unwrap();
        assert!(matches!(
            catalog.add(&def),
            Err(DataError::DuplicateVersion(_))
        ));
    }

    #[test]
    fn test_versions_stay_separate() {
        let mut catalog = ParticleCatalog::new();
        catalog.add(&DataSetDefinition::from_yaml_str(YAML).unwrap()).unwrap();
        let older = DataSetDefinition {
            version: "1.19.2".to_string(),
            ..DataSetDefinition::default()
        };
        catalog.add(&older).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.latest(), Some(GameVersion::new(1, 20, 4)));
        assert!(catalog.resolve("lava", GameVersion::new(1, 19, 2)).is_none());
        assert!(matches!(
            catalog.data_set(GameVersion::new(1, 18, 0)),
            Err(DataError::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_invalid_version_is_fatal() {
        let def = DataSetDefinition {
            version: "latest".to_string(),
            ..DataSetDefinition::default()
        };
        assert!(matches!(
            ParticleCatalog::new().add(&def),
            Err(DataError::InvalidVersion(_))
        ));
    }
}
