use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use error_stack::{ensure, Result, ResultExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use crate::config::filename::{Filename, PathContext};
pub use crate::config::ports::{PortRole, DEFAULT_PORT, PORT_STEP};

mod accessors;
pub mod coerce;
mod codec;
pub mod filename;
mod ports;
mod validate;

pub use codec::{decode, encode};

pub const DEFAULT_BINARY: &str = "gaiad";
pub const DEFAULT_HERMES_BINARY: &str = "hermes";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}: no such file or directory")]
    NotFound(PathBuf),
    #[error("config is a directory: {0}")]
    IsDirectory(PathBuf),
    #[error("could not read config file {0}")]
    Read(PathBuf),
    #[error("could not write config file {0}")]
    Write(PathBuf),
    #[error("could not decode config")]
    Decode,
    #[error("could not encode config")]
    Encode,
    #[error("invalid value at {0}")]
    InvalidValue(String),
    #[error("invalid port {port} at {location}")]
    InvalidPort { port: u64, location: String },
    #[error("invalid name {0:?}, names must be non-empty and must not contain '.'")]
    InvalidName(String),
    #[error("invalid key {0}")]
    InvalidKey(String),
    #[error("{0} chain undefined")]
    UndefinedChain(String),
    #[error("{0} duplicate definition")]
    DuplicateChain(String),
    #[error("duplicate node {0}")]
    DuplicateNode(String),
    #[error("duplicate wallet name {0}")]
    DuplicateWalletName(String),
    #[error("duplicate wallet mnemonic for wallet {0}")]
    DuplicateWalletMnemonic(String),
    #[error("at least one validator required at {0} definition")]
    MissingValidator(String),
    #[error("chain name and node name cannot both match {0}")]
    NodeNameIsChainName(String),
    #[error("connection {connection} in node {node} points to self")]
    SelfConnection { node: String, connection: String },
    #[error("connection {connection} in node {node} points to other network")]
    CrossChainConnection { node: String, connection: String },
    #[error("connection {connection} is duplicated in node {node}")]
    DuplicateConnection { node: String, connection: String },
    #[error("connection {connection} in node {node} cannot be resolved")]
    UnresolvedConnection { node: String, connection: String },
    #[error("no Hermes nodes at {0}.[[hermes]] definition")]
    NoHermesNodes(usize),
    #[error("config path {path} has to be unique at {index}.[[hermes]] definition")]
    DuplicateHermesConfig { index: usize, path: String },
    #[error("node {node} cannot be resolved at {index}.[[hermes]] definition")]
    UnresolvedHermesNode { index: usize, node: String },
    #[error("multiple node connection to {chain} chain at {index}.[[hermes]] definition")]
    MultipleHermesNodesPerChain { index: usize, chain: String },
    #[error("no Hermes definition at index {0}")]
    UnknownHermes(usize),
    #[error("preset port {port} conflicts with automatically assigned ports between ({base}-{cursor}) at {node}")]
    PortConflict {
        node: String,
        port: u16,
        base: u16,
        cursor: u16,
    },
    #[error("no ports left to assign to {0}")]
    PortsExhausted(String),
    #[error("{0} not found in config")]
    UnknownNode(String),
    #[error("chain {0} not found in config")]
    UnknownChain(String),
    #[error("could not expand {0}")]
    Expand(String),
    #[error("cannot get denomination from genesis {0}")]
    Denom(PathBuf),
    #[error("cannot read wallet keys from {0}")]
    Keys(PathBuf),
}

/// The testnets manager configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub binary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub home: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stop_maintain: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_config_override: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub port: u16,
    #[serde(rename = "wallet", skip_serializing_if = "Vec::is_empty")]
    pub wallets: Vec<Wallet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hermes: Vec<HermesConfig>,
    #[serde(skip)]
    pub chains: BTreeMap<String, ChainConfig>,
    #[serde(skip)]
    pub filename: Filename,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct HermesConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub binary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub home: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_level: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub telemetry_enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub telemetry_host: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub telemetry_port: u16,
    #[serde(rename = "mnemonics", skip_serializing_if = "String::is_empty")]
    pub mnemonic: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct ChainConfig {
    #[serde(rename = "hdpath", skip_serializing_if = "String::is_empty")]
    pub hd_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub binary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub home: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub denom: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stop_maintain: bool,
    #[serde(skip)]
    pub nodes: BTreeMap<String, Node>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct Node {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub validator: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub binary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub home: String,
    /// Signing mnemonic of a validator, generated when empty. Unused on full nodes.
    #[serde(rename = "mnemonics", skip_serializing_if = "String::is_empty")]
    pub mnemonic: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub port: u16,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stop_maintain: bool,
    /// Nodes of the same chain to peer with. When empty, the node connects to every validator.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Wallet {
    pub name: String,
    #[serde(rename = "mnemonics", default, skip_serializing_if = "String::is_empty")]
    pub mnemonic: String,
}

fn is_zero(port: &u16) -> bool {
    *port == 0
}

impl Config {
    pub fn new(filename: Filename) -> Self {
        Self {
            filename,
            ..Self::default()
        }
    }

    /// Reads, decodes and validates the configuration file described by `filename`.
    pub fn load(filename: Filename) -> Result<Self, Error> {
        let path = filename.path.clone();
        ensure!(path.exists(), Error::NotFound(path));
        ensure!(!path.is_dir(), Error::IsDirectory(path));

        info!(path = %path.display(), "loading config file");

        let content = fs::read_to_string(&path).change_context_lazy(|| Error::Read(path.clone()))?;
        decode(&content, filename).attach_printable_lazy(|| path.display().to_string())
    }

    /// Runs validation, then assigns the unset ports.
    pub fn finalize(self) -> Result<Self, Error> {
        let mut cfg = validate::validate(self)?;
        ports::assign(&mut cfg)?;

        Ok(cfg)
    }

    /// The configuration written by `init`.
    pub fn default_for(filename: Filename) -> Result<Self, Error> {
        let testnet_1 = ChainConfig {
            stop_maintain: true,
            nodes: BTreeMap::from([("validator1".to_string(), Node::validator())]),
            ..ChainConfig::default()
        };
        let testnet_2 = ChainConfig {
            nodes: BTreeMap::from([
                ("validator1".to_string(), Node::validator()),
                ("fullnode1".to_string(), Node::default()),
            ]),
            ..ChainConfig::default()
        };

        Config {
            binary: find_binary(DEFAULT_BINARY)?,
            chains: BTreeMap::from([
                ("testnet-1".to_string(), testnet_1),
                ("testnet-2".to_string(), testnet_2),
            ]),
            hermes: vec![HermesConfig {
                binary: find_binary(DEFAULT_HERMES_BINARY)?,
                nodes: vec!["testnet-1.validator1".to_string(), "fullnode1".to_string()],
                ..HermesConfig::default()
            }],
            ..Config::new(filename)
        }
        .finalize()
    }

    /// Writes the configuration, replacing any existing file.
    pub fn save(&self) -> Result<(), Error> {
        let path = self.filename.path.clone();
        let content = encode(&self.clone().finalize()?)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).change_context_lazy(|| Error::Write(path.clone()))?;
        }
        fs::write(&path, content).change_context_lazy(|| Error::Write(path.clone()))
    }

    /// Writes the configuration only if no file exists yet. Returns whether it wrote.
    pub fn save_if_absent(&self) -> Result<bool, Error> {
        if self.filename.path.exists() {
            debug!(path = %self.filename.path.display(), "config file found");
            return Ok(false);
        }

        debug!(path = %self.filename.path.display(), "writing config file");
        self.save().map(|_| true)
    }

    /// Full names of every node, ordered by chain, then node.
    pub fn node_names(&self) -> Vec<String> {
        self.chains
            .iter()
            .flat_map(|(chain_name, chain)| {
                chain
                    .nodes
                    .keys()
                    .map(move |node_name| crate::resolver::full_name(chain_name, node_name))
            })
            .collect()
    }
}

impl Node {
    pub fn validator() -> Self {
        Self {
            validator: true,
            ..Self::default()
        }
    }
}

/// Shell-expands `name` and looks it up on PATH.
///
/// Falls back to the expanded name when the binary cannot be found.
pub fn find_binary(name: &str) -> Result<String, Error> {
    let expanded = shellexpand::full(name).change_context_lazy(|| Error::Expand(name.to_string()))?;

    let found = which::which(&*expanded)
        .ok()
        .and_then(|path| std::path::absolute(path).ok());

    Ok(match found {
        Some(path) => path.to_string_lossy().into_owned(),
        None => expanded.into_owned(),
    })
}
