//! `key=value` settings file handling.
//!
//! Each line is split at its first `=`; key and value are trimmed. Lines
//! without `=` and `#` comments are ignored, and a later duplicate key wins.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Default settings file, looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "settings.config";

/// Setting names understood by the workflows
pub mod keys {
    pub const PROGRAM_METHOD: &str = "ProgramMethod";
    pub const GRAPH_FILENAME: &str = "GraphFilename";
    pub const DIRECTORY: &str = "Directory";
    pub const OUTPUT_DIRECTORY: &str = "OutputDirectory";
    pub const NUMBER_GRAPHS_GENERATED: &str = "NumberGraphsGenerated";
    pub const NUMBER_EDGE_SWAPS: &str = "NumberEdgeSwaps";
    pub const STRICT_EDGE_SWAPS: &str = "StrictEdgeSwaps";
    pub const MAX_RANDOMIZE_ATTEMPTS: &str = "MaxRandomizeAttempts";
    pub const RANDOMIZE_NODES: &str = "RandomizeNodes";
    pub const MIN_NODE_PRODUCTION: &str = "MinNodeProduction";
    pub const MAX_NODE_PRODUCTION: &str = "MaxNodeProduction";
    pub const MIN_NODE_CONSUMPTION: &str = "MinNodeConsumption";
    pub const MAX_NODE_CONSUMPTION: &str = "MaxNodeConsumption";
    pub const POWER_SUPPLIED_THRESHOLD: &str = "PowerSuppliedThreshold";
    pub const PERCENTAGE_OF_EDGES_TO_CUT: &str = "PercentageOfEdgesToCut";
    pub const MAX_COMPONENTS: &str = "MaxComponents";
}

/// Settings loading and lookup errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<String>),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Unknown program method '{0}' (expected Randomize, Test, Stress or BatchStress)")]
    UnknownMode(String),
}

/// Parsed settings, kept sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Self { values }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading settings from: {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Log every setting as `key = value`
    pub fn log_entries(&self) {
        for (key, value) in &self.values {
            log::info!("{} = {}", key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check that every key is present, reporting all missing keys together
    pub fn require(&self, keys: &[&str]) -> Result<(), ConfigError> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.contains(key))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingConfiguration(missing))
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        self.get_str(key)
            .ok_or_else(|| ConfigError::MissingConfiguration(vec![key.to_string()]))
    }

    /// Decimal value, if present
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get_str(key)
            .map(|value| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|parsed| parsed.is_finite())
                    .ok_or_else(|| invalid(key, value))
            })
            .transpose()
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, ConfigError> {
        self.get_f64(key)?
            .ok_or_else(|| ConfigError::MissingConfiguration(vec![key.to_string()]))
    }

    /// Non-negative decimal truncated to a count, if present
    pub fn get_count(&self, key: &str) -> Result<Option<usize>, ConfigError> {
        match self.get_f64(key)? {
            Some(value) if value >= 0.0 => Ok(Some(value.trunc() as usize)),
            Some(_) => Err(invalid(key, self.get_str(key).unwrap_or_default())),
            None => Ok(None),
        }
    }

    pub fn require_count(&self, key: &str) -> Result<usize, ConfigError> {
        self.get_count(key)?
            .ok_or_else(|| ConfigError::MissingConfiguration(vec![key.to_string()]))
    }

    /// `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`, if present
    pub fn get_flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.get_str(key) else {
            return Ok(None);
        };

        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(Some(true)),
            "false" | "no" | "off" => Ok(Some(false)),
            other => other
                .parse::<f64>()
                .map(|number| Some(number != 0.0))
                .map_err(|_| invalid(key, value)),
        }
    }

    /// Mode selected by `ProgramMethod`, defaulting to [`ProgramMode::Stress`]
    pub fn program_mode(&self) -> Result<ProgramMode, ConfigError> {
        self.get_str(keys::PROGRAM_METHOD)
            .map_or(Ok(ProgramMode::Stress), |method| method.parse())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Top-level workflow to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProgramMode {
    Randomize,
    Test,
    Stress,
    BatchStress,
}

impl ProgramMode {
    /// Keys every run of this mode needs
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            ProgramMode::Randomize => &[
                keys::NUMBER_GRAPHS_GENERATED,
                keys::GRAPH_FILENAME,
                keys::OUTPUT_DIRECTORY,
            ],
            ProgramMode::Test => &[keys::GRAPH_FILENAME],
            ProgramMode::Stress => &[
                keys::GRAPH_FILENAME,
                keys::POWER_SUPPLIED_THRESHOLD,
                keys::PERCENTAGE_OF_EDGES_TO_CUT,
            ],
            ProgramMode::BatchStress => &[
                keys::DIRECTORY,
                keys::POWER_SUPPLIED_THRESHOLD,
                keys::PERCENTAGE_OF_EDGES_TO_CUT,
            ],
        }
    }
}

impl fmt::Display for ProgramMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgramMode::Randomize => "Randomize",
            ProgramMode::Test => "Test",
            ProgramMode::Stress => "Stress",
            ProgramMode::BatchStress => "BatchStress",
        };
        f.write_str(name)
    }
}

impl FromStr for ProgramMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "randomize" => Ok(ProgramMode::Randomize),
            "test" => Ok(ProgramMode::Test),
            "stress" => Ok(ProgramMode::Stress),
            "batchstress" | "batch-stress" | "batch_stress" => Ok(ProgramMode::BatchStress),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::parse(
            "GraphFilename=grid.graph\n\
             # a comment=ignored\n\
             no separator here\n\
             Expression = a=b \n\
             PowerSuppliedThreshold=0.5\n\
             PowerSuppliedThreshold=0.75\n",
        );

        assert_eq!(settings.get_str("GraphFilename"), Some("grid.graph"));
        assert_eq!(settings.get_str("Expression"), Some("a=b"));
        assert_eq!(settings.require_f64("PowerSuppliedThreshold").unwrap(), 0.75);
        assert!(!settings.contains("# a comment"));
        assert_eq!(settings.iter().count(), 3);
    }

    #[test]
    fn test_missing_keys_are_collected() {
        let settings: Settings = [("GraphFilename", "g.graph")].into_iter().collect();

        match settings.require(ProgramMode::Stress.required_keys()) {
            Err(ConfigError::MissingConfiguration(missing)) => {
                assert_eq!(
                    missing,
                    vec!["PowerSuppliedThreshold", "PercentageOfEdgesToCut"]
                );
            }
            other => panic!("expected missing configuration, got {:?}", other),
        }

        assert!(settings.require(ProgramMode::Test.required_keys()).is_ok());
    }

    #[test]
    fn test_typed_accessors() {
        let settings: Settings = [
            ("Count", "3.9"),
            ("Negative", "-2"),
            ("Word", "many"),
            ("FlagOne", "1"),
            ("FlagYes", "Yes"),
            ("FlagZero", "0"),
        ]
        .into_iter()
        .collect();

        assert_eq!(settings.get_count("Count").unwrap(), Some(3));
        assert!(settings.get_count("Negative").is_err());
        assert!(matches!(
            settings.get_f64("Word"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(settings.get_f64("Absent").unwrap(), None);
        assert_eq!(settings.get_flag("FlagOne").unwrap(), Some(true));
        assert_eq!(settings.get_flag("FlagYes").unwrap(), Some(true));
        assert_eq!(settings.get_flag("FlagZero").unwrap(), Some(false));
        assert!(settings.get_flag("Word").is_err());
        assert!(matches!(
            settings.require_count("Absent"),
            Err(ConfigError::MissingConfiguration(_))
        ));
    }

    #[test]
    fn test_program_mode() {
        assert_eq!(Settings::default().program_mode().unwrap(), ProgramMode::Stress);

        let settings: Settings = [("ProgramMethod", "Randomize")].into_iter().collect();
        assert_eq!(settings.program_mode().unwrap(), ProgramMode::Randomize);

        assert_eq!("BatchStress".parse::<ProgramMode>().unwrap(), ProgramMode::BatchStress);
        assert_eq!(ProgramMode::BatchStress.to_string(), "BatchStress");
        assert!(matches!(
            "Shuffle".parse::<ProgramMode>(),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_load_settings_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "ProgramMethod=Test\nGraphFilename=a.graph\n").unwrap();

        let settings = Settings::load(temp_file.path()).unwrap();
        assert_eq!(settings.program_mode().unwrap(), ProgramMode::Test);

        let missing = Settings::load(Path::new("/nonexistent/settings.config"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
