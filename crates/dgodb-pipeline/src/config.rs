//! Pipeline and export configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique name of the object whose frame-pointer links are left alone
/// outside [`GameVersion::Jak1`]
pub const FP_LINK_EXEMPT_OBJECT: &str = "effect-control-v0";

/// Game release whose object files are being processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVersion {
    /// First release
    #[default]
    Jak1,
    /// Second release
    Jak2,
}

impl GameVersion {
    /// Numeric version as used in configuration files
    pub const fn number(self) -> u8 {
        match self {
            Self::Jak1 => 1,
            Self::Jak2 => 2,
        }
    }

    /// Version from its number
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Jak1),
            2 => Some(Self::Jak2),
            _ => None,
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Settings read by the analysis phases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Selects version-specific handling during code discovery
    pub game_version: GameVersion,
    /// Split functions into basic blocks and analyse their prologues
    pub find_basic_blocks: bool,
}

impl PipelineConfig {
    /// Whether frame-pointer-relative links are resolved for `unique_name`
    pub fn resolves_fp_links(&self, unique_name: &str) -> bool {
        self.game_version == GameVersion::Jak1 || unique_name != FP_LINK_EXEMPT_OBJECT
    }
}

/// Settings for the artifact writers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Dump raw words only for objects with three segments
    pub dump_v3_only: bool,
    /// Write disassembly even for objects without functions
    pub disassemble_objects_without_functions: bool,
    /// Write raw word dumps
    pub write_words: bool,
    /// Write disassembly
    pub write_disassembly: bool,
    /// Write the combined script file
    pub write_scripts: bool,
    /// Write the archive listing
    pub write_listing: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fp_link_rule() {
        let jak1 = PipelineConfig::default();
        assert!(jak1.resolves_fp_links("effect-control-v0"));

        let jak2 = PipelineConfig {
            game_version: GameVersion::Jak2,
            ..PipelineConfig::default()
        };
        assert!(!jak2.resolves_fp_links("effect-control-v0"));
        assert!(jak2.resolves_fp_links("effect-control-v1"));
        assert!(jak2.resolves_fp_links("gkernel-v0"));
    }

    #[test]
    fn test_config_from_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"game_version": "jak2", "find_basic_blocks": true}"#).unwrap();
        assert_eq!(
            config,
            PipelineConfig {
                game_version: GameVersion::Jak2,
                find_basic_blocks: true,
            }
        );

        let partial: ExportOptions = serde_json::from_str(r#"{"dump_v3_only": true}"#).unwrap();
        assert!(partial.dump_v3_only);
        assert!(!partial.write_words);
    }

    #[test]
    fn test_version_numbers() {
        assert_eq!(GameVersion::from_number(2), Some(GameVersion::Jak2));
        assert_eq!(GameVersion::from_number(3), None);
        assert_eq!(GameVersion::Jak1.to_string(), "1");
    }
}
