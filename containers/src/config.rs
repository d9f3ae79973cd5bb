use crate::Wei;
use chain::DEVNET_PARAMS;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Economic and timing parameters fixed at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct RootChainConfig {
    pub max_requests: u64,
    #[serde(rename = "NRE_LENGTH", alias = "NRELength")]
    pub nre_length: u64,
    pub cost_ero: Wei,
    pub cost_eru: Wei,
    pub cost_urb_prepare: Wei,
    pub cost_urb: Wei,
    pub cost_orb: Wei,
    pub cost_nrb: Wei,
    pub cp_computation: u64,
    pub cp_withholding: u64,
    pub prepare_timeout: u64,
    pub operator_timeout: u64,
    pub max_finalization_steps: u64,
}

impl Default for RootChainConfig {
    fn default() -> Self {
        Self {
            max_requests: DEVNET_PARAMS.max_requests,
            nre_length: DEVNET_PARAMS.nre_length,
            cost_ero: DEVNET_PARAMS.cost_ero,
            cost_eru: DEVNET_PARAMS.cost_eru,
            cost_urb_prepare: DEVNET_PARAMS.cost_urb_prepare,
            cost_urb: DEVNET_PARAMS.cost_urb,
            cost_orb: DEVNET_PARAMS.cost_orb,
            cost_nrb: DEVNET_PARAMS.cost_nrb,
            cp_computation: DEVNET_PARAMS.cp_computation,
            cp_withholding: DEVNET_PARAMS.cp_withholding,
            prepare_timeout: DEVNET_PARAMS.prepare_timeout,
            operator_timeout: DEVNET_PARAMS.operator_timeout,
            max_finalization_steps: DEVNET_PARAMS.max_finalization_steps,
        }
    }
}

impl RootChainConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::Zero("MAX_REQUESTS"));
        }
        if self.nre_length == 0 {
            return Err(ConfigError::Zero("NRE_LENGTH"));
        }
        if self.max_finalization_steps == 0 {
            return Err(ConfigError::Zero("MAX_FINALIZATION_STEPS"));
        }
        Ok(())
    }

    /// Number of request blocks needed to carry `num_requests` requests.
    pub fn request_blocks_for(&self, num_requests: u64) -> u64 {
        num_requests.div_ceil(self.max_requests)
    }

    /// Challenge period of a block, measured from its submission.
    pub fn challenge_period(&self, is_request: bool) -> u64 {
        if is_request {
            self.cp_withholding + self.cp_computation
        } else {
            self.cp_withholding
        }
    }
}
