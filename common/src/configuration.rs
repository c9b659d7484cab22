use crate::address::AddressNetwork;
use crate::protocol_params::{LinearFee, TxParams, MAINNET_PROTOCOL_MAGIC};
use crate::rational_number::rational_number_from_decimal;
use crate::tx::Era;
use anyhow::{anyhow, Context, Result};
use config::Config;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

pub const CONFIG_KEY_ERA: &str = "protocol.era";
pub const CONFIG_KEY_NETWORK: &str = "protocol.network";
pub const CONFIG_KEY_PROTOCOL_MAGIC: &str = "protocol.protocol-magic";
pub const CONFIG_KEY_FEE_CONSTANT: &str = "fee.constant";
pub const CONFIG_KEY_FEE_COEFFICIENT: &str = "fee.coefficient";
pub const CONFIG_KEY_MIN_UTXO_VALUE: &str = "min-utxo.value";
pub const CONFIG_KEY_MAX_FEE_ITERATIONS: &str = "builder.max-fee-iterations";
pub const CONFIG_KEY_SELECTION: &str = "builder.selection";
pub const CONFIG_KEY_GAP_LIMIT: &str = "discovery.gap-limit";
pub const CONFIG_KEY_ACCOUNT: &str = "discovery.account";

pub const DEFAULT_MAX_FEE_ITERATIONS: usize = 10;
pub const DEFAULT_GAP_LIMIT: u32 = 20;

/// Order in which the builder draws on the UTXO pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputSelection {
    /// Largest coin first, UTXOs holding still-missing tokens ahead of the rest
    #[default]
    LargestFirst,
    /// Every supplied UTXO, in the order given
    All,
}

impl Display for InputSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSelection::LargestFirst => write!(f, "largest-first"),
            InputSelection::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    pub params: TxParams,
    pub selection: InputSelection,
    pub max_fee_iterations: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            params: TxParams::default(),
            selection: InputSelection::default(),
            max_fee_iterations: DEFAULT_MAX_FEE_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub account: u32,
    pub gap_limit: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            account: 0,
            gap_limit: DEFAULT_GAP_LIMIT,
        }
    }
}

// Absent keys take the default, present but malformed keys are errors
fn get_or<'de, T: Deserialize<'de>>(config: &Config, key: &str, default: T) -> Result<T> {
    match config.get::<T>(key) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => Ok(default),
        Err(e) => Err(anyhow!("Bad configuration value for {key}: {e}")),
    }
}

impl TxParams {
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = LinearFee::default();
        let coefficient = match config.get_string(CONFIG_KEY_FEE_COEFFICIENT) {
            Ok(text) => rational_number_from_decimal(&text)
                .with_context(|| format!("Bad configuration value for {CONFIG_KEY_FEE_COEFFICIENT}"))?,
            Err(config::ConfigError::NotFound(_)) => defaults.coefficient,
            Err(e) => return Err(anyhow!("Bad configuration value for {CONFIG_KEY_FEE_COEFFICIENT}: {e}")),
        };

        Ok(Self {
            era: get_or(config, CONFIG_KEY_ERA, Era::Shelley)?,
            network: get_or(config, CONFIG_KEY_NETWORK, AddressNetwork::Main)?,
            protocol_magic: get_or(config, CONFIG_KEY_PROTOCOL_MAGIC, MAINNET_PROTOCOL_MAGIC)?,
            fee: LinearFee {
                constant: get_or(config, CONFIG_KEY_FEE_CONSTANT, defaults.constant)?,
                coefficient,
            },
            min_utxo_value: get_or(config, CONFIG_KEY_MIN_UTXO_VALUE, 1_000_000)?,
        })
    }
}

impl BuilderConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            params: TxParams::from_config(config)?,
            selection: get_or(config, CONFIG_KEY_SELECTION, InputSelection::LargestFirst)?,
            max_fee_iterations: get_or(
                config,
                CONFIG_KEY_MAX_FEE_ITERATIONS,
                DEFAULT_MAX_FEE_ITERATIONS,
            )?,
        })
    }
}

impl DiscoveryConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            account: get_or(config, CONFIG_KEY_ACCOUNT, 0)?,
            gap_limit: get_or(config, CONFIG_KEY_GAP_LIMIT, DEFAULT_GAP_LIMIT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational_number::RationalNumber;
    use config::{File, FileFormat};

    fn load(text: &str) -> Config {
        Config::builder().add_source(File::from_str(text, FileFormat::Toml)).build().unwrap()
    }

    #[test]
    fn empty_config_gives_mainnet_defaults() {
        let config = load("");
        assert_eq!(BuilderConfig::from_config(&config).unwrap(), BuilderConfig::default());
        assert_eq!(DiscoveryConfig::from_config(&config).unwrap(), DiscoveryConfig::default());
    }

    #[test]
    fn values_are_read_from_toml() {
        let config = load(
            r#"
            [protocol]
            era = "byron"
            network = "testnet"
            protocol-magic = 1097911063

            [fee]
            constant = 44
            coefficient = "0.5"

            [builder]
            selection = "all"
            max-fee-iterations = 4

            [discovery]
            gap-limit = 5
            "#,
        );

        let builder = BuilderConfig::from_config(&config).unwrap();
        assert_eq!(builder.params.era, Era::Byron);
        assert_eq!(builder.params.network, AddressNetwork::Test);
        assert_eq!(builder.params.protocol_magic, 1097911063);
        assert_eq!(builder.params.fee.constant, 44);
        assert_eq!(builder.params.fee.coefficient, RationalNumber::new(1, 2));
        assert_eq!(builder.selection, InputSelection::All);
        assert_eq!(builder.max_fee_iterations, 4);
        assert_eq!(DiscoveryConfig::from_config(&config).unwrap().gap_limit, 5);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(TxParams::from_config(&load("[fee]\ncoefficient = \"abc\"")).is_err());
        assert!(TxParams::from_config(&load("[protocol]\nera = \"alonzo\"")).is_err());
    }
}
