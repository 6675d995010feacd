use anyhow::{Result, bail};
use derive_deref::Deref;
use serde::Deserialize;
use slog::{Logger, error, info};
use std::collections::HashMap;
use std::fs;

/// What the NAT knows about a controller that presents a given token.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BscCreds {
    pub lac: u16,
    #[serde(default)]
    pub description: Option<String>,
}

/// Controllers the NAT accepts, keyed by the unit name token they present.
#[derive(Deref, Debug, Default)]
pub struct BscTable(HashMap<String, BscCreds>);

impl BscTable {
    /// Parse a table of `[token-<name>]` sections.
    pub fn from_toml(contents: &str, source: &str, logger: &Logger) -> Result<Self> {
        let table: HashMap<String, BscCreds> = toml::from_str(contents)?;
        let mut new_table = HashMap::new();
        for (key, value) in table.into_iter() {
            let Some(token) = key.strip_prefix("token-") else {
                bail!("Key {} in {source} does not start with 'token-'", key)
            };
            info!(
                logger,
                "Loaded controller token {token} for LAC {} from {source}", value.lac
            );
            new_table.insert(token.to_string(), value);
        }
        Ok(BscTable(new_table))
    }
}

/// Load the controller tokens from file into memory.
pub fn load_bscs_file(filename: &str, logger: &Logger) -> Result<&'static BscTable> {
    let path = std::env::current_dir()?;
    let contents = fs::read_to_string(filename).inspect_err(|e| {
        error!(
            logger,
            "Failed to load controller file {filename} (current directory {}) with error code {e}",
            path.display()
        )
    })?;
    let b = Box::new(BscTable::from_toml(&contents, filename, logger)?);
    Ok(Box::leak(b))
}
