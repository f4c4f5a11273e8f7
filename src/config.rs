use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::{distinct::AliasTable, io_utils};

pub const DEFAULT_PREVIEW_ROWS: usize = 50;
pub const DEFAULT_DISTINCT_CAP: usize = 1000;

/// Settings for one consolidation job.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidateConfig {
    /// Columns removed from the consolidated output.
    pub drop_columns: Vec<String>,
    pub preview_rows: usize,
    pub distinct_cap: usize,
    #[serde(with = "delimiter_serde")]
    pub delimiter: u8,
    /// WHATWG label of the entries' text encoding; UTF-8 when unset.
    pub input_encoding: Option<String>,
    /// Delete the source archive once the job reaches a terminal state.
    pub remove_source: bool,
    pub aliases: AliasTable,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            drop_columns: Vec::new(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            distinct_cap: DEFAULT_DISTINCT_CAP,
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            input_encoding: None,
            remove_source: false,
            aliases: AliasTable::default(),
        }
    }
}

impl ConsolidateConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: ConsolidateConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config YAML")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.delimiter.is_ascii() && self.delimiter != b'"',
            "Delimiter must be an ASCII character other than '\"'"
        );
        self.encoding()?;
        Ok(())
    }

    pub fn encoding(&self) -> Result<&'static Encoding> {
        io_utils::resolve_encoding(self.input_encoding.as_deref())
    }
}

mod delimiter_serde {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::cli::parse_delimiter;

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        let label = match value {
            b'\t' => "tab".to_string(),
            other => (*other as char).to_string(),
        };
        serializer.serialize_str(&label)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_delimiter(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_documented_caps() {
        let config = ConsolidateConfig::default();
        assert_eq!(config.preview_rows, 50);
        assert_eq!(config.distinct_cap, 1000);
        assert_eq!(config.delimiter, b',');
        assert!(config.drop_columns.is_empty());
        assert!(!config.remove_source);
    }

    #[test]
    fn load_fills_unspecified_keys_with_defaults() {
        let mut file = NamedTempFile::new().expect("temp config");
        writeln!(
            file,
            "drop_columns: [Status, Carrier Code]\ndelimiter: tab\naliases:\n  journey_type: [Route Kind]"
        )
        .expect("write config");
        let config = ConsolidateConfig::load(file.path()).expect("load config");
        assert_eq!(config.drop_columns, ["Status", "Carrier Code"]);
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.preview_rows, DEFAULT_PREVIEW_ROWS);
        assert_eq!(config.aliases.journey_type, ["Route Kind"]);
        assert_eq!(
            config.aliases.current_station,
            AliasTable::default().current_station
        );
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let mut config = ConsolidateConfig::default();
        config.drop_columns = vec!["Status".into()];
        config.delimiter = b';';
        let yaml = config.to_yaml().expect("yaml");
        let parsed: ConsolidateConfig = serde_yaml::from_str(&yaml).expect("parse yaml");
        assert_eq!(parsed, config);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let config = ConsolidateConfig {
            input_encoding: Some("not-an-encoding".into()),
            ..ConsolidateConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
