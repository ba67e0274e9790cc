//! # Engine Configuration
//!
//! Governance parameters and the engine's static wiring (governor,
//! arbitrator, meta-evidence). Loaded from YAML or JSON and validated before
//! an engine is built.
//!
//! ```yaml
//! governor: "0xgovernor"
//! arbitrator: "0xarbitrator"
//! registration_meta_evidence: "/ipfs/QmRegistration"
//! clearing_meta_evidence: "/ipfs/QmClearing"
//! params:
//!   base_deposit: "10"
//!   challenge_period_secs: 302400
//!   appeal_period_secs: 259200
//!   multipliers:
//!     shared: 10000
//!     winner: 10000
//!     loser: 20000
//! ```
//!
//! Parameters are snapshotted into every request at creation; a later
//! governance update never changes an open request.

use std::path::Path;

use arbitrable_core::{Address, Amount, Multiplier, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::round::Standing;

/// Upper bound for any configured period: ten years.
const MAX_PERIOD_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Stake multipliers applied on top of the arbitrator's fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeMultipliers {
    /// Used for deposits and when the ruling favors nobody.
    pub shared: Multiplier,
    /// Used for the side the current ruling favors.
    pub winner: Multiplier,
    /// Used for the side the current ruling disfavors.
    pub loser: Multiplier,
}

impl StakeMultipliers {
    /// The multiplier that applies to a party with the given standing.
    pub fn for_standing(&self, standing: Standing) -> Multiplier {
        match standing {
            Standing::Winner => self.winner,
            Standing::Loser => self.loser,
            Standing::Undecided => self.shared,
        }
    }
}

/// Governance-controlled parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Stake required from requesters and challengers on top of the
    /// arbitration cost.
    pub base_deposit: Amount,
    /// Opaque bytes forwarded to the arbitrator on every call.
    #[serde(default)]
    pub arbitrator_extra_data: Vec<u8>,
    /// How long a request stays open to challenges.
    pub challenge_period_secs: u64,
    /// How long appeal funding stays open after a ruling. The losing side
    /// may only contribute during the first half.
    pub appeal_period_secs: u64,
    /// Stake multipliers.
    pub multipliers: StakeMultipliers,
}

impl GovernanceParams {
    /// Check the parameters for values that would make the engine unusable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a period is zero, exceeds ten
    /// years, or the appeal period is too short to split in halves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("challenge_period_secs", self.challenge_period_secs, 1)?;
        check_period("appeal_period_secs", self.appeal_period_secs, 2)?;
        Ok(())
    }
}

fn check_period(field: &str, seconds: u64, min: u64) -> Result<(), ConfigError> {
    let reason = if seconds < min {
        format!("must be at least {min}s")
    } else if seconds > MAX_PERIOD_SECS {
        format!("must not exceed {MAX_PERIOD_SECS}s")
    } else {
        return Ok(());
    };
    Err(ConfigError::Invalid(ValidationError::InvalidDuration {
        field: field.to_string(),
        seconds,
        reason,
    }))
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The only address allowed to change governance parameters.
    pub governor: Address,
    /// The arbitrator every dispute is sent to.
    pub arbitrator: Address,
    /// Initial governance parameters.
    pub params: GovernanceParams,
    /// Meta-evidence URI describing registration requests.
    pub registration_meta_evidence: String,
    /// Meta-evidence URI describing clearing requests.
    pub clearing_meta_evidence: String,
}

impl EngineConfig {
    /// Parse and validate a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] on malformed input and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_yaml_str`](Self::from_yaml_str).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// See [`GovernanceParams::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The YAML document is malformed or does not match the schema.
    #[error("malformed YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON document is malformed or does not match the schema.
    #[error("malformed JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured value is out of range.
    #[error("invalid configuration value: {0}")]
    Invalid(#[from] ValidationError),

    /// The gateway handed to the engine is not the configured arbitrator.
    #[error("gateway address {gateway} does not match configured arbitrator {configured}")]
    ArbitratorMismatch {
        /// The arbitrator named in the configuration.
        configured: Address,
        /// The address reported by the gateway.
        gateway: Address,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
governor: "0xgovernor"
arbitrator: "0xarbitrator"
registration_meta_evidence: "/ipfs/QmRegistration"
clearing_meta_evidence: "/ipfs/QmClearing"
params:
  base_deposit: "10"
  challenge_period_secs: 302400
  appeal_period_secs: 259200
  multipliers:
    shared: 10000
    winner: 10000
    loser: 20000
"#;

    #[test]
    fn parses_sample_yaml() {
        let config = EngineConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.governor.as_str(), "0xgovernor");
        assert_eq!(config.params.base_deposit, Amount::new(10));
        assert!(config.params.arbitrator_extra_data.is_empty());
        assert_eq!(
            config.params.multipliers.for_standing(Standing::Loser),
            Multiplier::from_basis_points(20_000)
        );
    }

    #[test]
    fn json_and_yaml_agree() {
        let yaml = EngineConfig::from_yaml_str(SAMPLE).unwrap();
        let json = serde_json::to_string(&yaml).unwrap();
        let back = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(back, yaml);
    }

    #[test]
    fn rejects_zero_challenge_period() {
        let yaml = SAMPLE.replace("302400", "0");
        let err = EngineConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(format!("{err}").contains("challenge_period_secs"));
    }

    #[test]
    fn rejects_unsplittable_appeal_period() {
        let yaml = SAMPLE.replace("259200", "1");
        assert!(EngineConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn rejects_invalid_address() {
        let yaml = SAMPLE.replace("0xgovernor", "not an address");
        assert!(matches!(
            EngineConfig::from_yaml_str(&yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/engine.yaml")).unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/engine.yaml"));
    }
}
