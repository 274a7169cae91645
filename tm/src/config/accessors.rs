//! Derived values for a node or chain, each falling back from the node to the chain, to the global
//! settings, to a built-in default.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use error_stack::{Report, Result, ResultExt};
use serde::Deserialize;
use tracing::debug;

use crate::config::{
    find_binary, ChainConfig, Config, Error, HermesConfig, Node, PortRole, DEFAULT_BINARY,
    DEFAULT_HERMES_BINARY,
};
use crate::resolver;

const GENESIS_PATH: &str = "config/genesis.json";
const BOND_DENOM_POINTER: &str = "/app_state/staking/params/bond_denom";
const MNEMONICS_DIR: &str = "config/mnemonics";

/// Key listing written by `<binary> keys add --output json`.
#[derive(Deserialize)]
struct Keys {
    #[serde(default)]
    mnemonic: String,
}

fn expand(value: &str) -> Result<String, Error> {
    shellexpand::full(value)
        .map(|expanded| expanded.into_owned())
        .change_context_lazy(|| Error::Expand(value.to_string()))
}

fn first_set<'a>(values: impl IntoIterator<Item = &'a String>) -> Option<&'a str> {
    values
        .into_iter()
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

impl Config {
    pub fn find_node(&self, full_name: &str) -> Result<(&ChainConfig, &Node), Error> {
        let unknown = || Report::new(Error::UnknownNode(full_name.to_string()));

        let (chain_name, node_name) = resolver::split(full_name).ok_or_else(unknown)?;
        let chain = self.chains.get(chain_name).ok_or_else(unknown)?;
        let node = chain.nodes.get(node_name).ok_or_else(unknown)?;

        Ok((chain, node))
    }

    /// Accepts both `chain` and `chain.node` references.
    fn find_chain<'a>(&self, reference: &'a str) -> Result<(&'a str, &ChainConfig), Error> {
        let chain_name = reference
            .split_once('.')
            .map_or(reference, |(chain, _)| chain);

        self.chains
            .get(chain_name)
            .map(|chain| (chain_name, chain))
            .ok_or_else(|| Report::new(Error::UnknownChain(chain_name.to_string())))
    }

    /// The global home directory, defaulting to the directory of the config file.
    pub fn global_home(&self) -> Result<PathBuf, Error> {
        match first_set([&self.home]) {
            Some(home) => expand(home).map(PathBuf::from),
            None => Ok(self.filename.dir.clone()),
        }
    }

    pub fn home(&self, full_name: &str) -> Result<PathBuf, Error> {
        let (chain, node) = self.find_node(full_name)?;
        let (chain_name, node_name) = resolver::split(full_name)
            .ok_or_else(|| Report::new(Error::UnknownNode(full_name.to_string())))?;

        if !node.home.is_empty() {
            return expand(&node.home).map(PathBuf::from);
        }
        if !chain.home.is_empty() {
            return expand(&chain.home).map(|home| Path::new(&home).join(node_name));
        }

        Ok(self.global_home()?.join(chain_name).join(node_name))
    }

    pub fn chain_home(&self, reference: &str) -> Result<PathBuf, Error> {
        let (chain_name, chain) = self.find_chain(reference)?;

        match first_set([&chain.home]) {
            Some(home) => expand(home).map(PathBuf::from),
            None => Ok(self.global_home()?.join(chain_name)),
        }
    }

    /// Path of `suffix` inside the node home.
    pub fn path(&self, full_name: &str, suffix: impl AsRef<Path>) -> Result<PathBuf, Error> {
        Ok(self.home(full_name)?.join(suffix))
    }

    /// Path of `suffix` inside the chain home.
    pub fn chain_path(&self, reference: &str, suffix: impl AsRef<Path>) -> Result<PathBuf, Error> {
        Ok(self.chain_home(reference)?.join(suffix))
    }

    pub fn binary(&self, full_name: &str) -> Result<String, Error> {
        let (chain, node) = self.find_node(full_name)?;

        match first_set([&node.binary, &chain.binary, &self.binary]) {
            Some(binary) => expand(binary),
            None => find_binary(DEFAULT_BINARY),
        }
    }

    /// The chain binary wins over a node binary, which is only consulted without any chain or
    /// global setting.
    pub fn chain_binary(&self, reference: &str) -> Result<String, Error> {
        let (_, chain) = self.find_chain(reference)?;
        let node_binary = match resolver::split(reference) {
            Some(_) => Some(&self.find_node(reference)?.1.binary),
            None => None,
        };

        match first_set([&chain.binary, &self.binary].into_iter().chain(node_binary)) {
            Some(binary) => expand(binary),
            None => find_binary(DEFAULT_BINARY),
        }
    }

    pub fn stop_maintain(&self, full_name: &str) -> Result<bool, Error> {
        let (chain, node) = self.find_node(full_name)?;

        Ok(node.stop_maintain || chain.stop_maintain || self.stop_maintain)
    }

    /// Full names of the peers of a node.
    ///
    /// Without explicit connections a node connects to every other validator of its chain.
    pub fn connections(&self, full_name: &str) -> Result<Vec<String>, Error> {
        let (chain, node) = self.find_node(full_name)?;
        let (chain_name, node_name) = resolver::split(full_name)
            .ok_or_else(|| Report::new(Error::UnknownNode(full_name.to_string())))?;

        let mut connections: Vec<String> = if node.connections.is_empty() {
            chain
                .nodes
                .iter()
                .filter(|(name, peer)| peer.validator && name.as_str() != node_name)
                .map(|(name, _)| resolver::full_name(chain_name, name))
                .collect()
        } else {
            node.connections
                .iter()
                .map(|name| resolver::full_name(chain_name, name))
                .collect()
        };
        connections.sort();

        Ok(connections)
    }

    /// The bond denomination of a chain, read from its genesis unless set in the config.
    pub fn denom(&self, reference: &str) -> Result<String, Error> {
        let (_, chain) = self.find_chain(reference)?;
        if !chain.denom.is_empty() {
            return Ok(chain.denom.clone());
        }

        let genesis = self.chain_path(reference, GENESIS_PATH)?;
        debug!(path = %genesis.display(), "reading bond denomination from genesis");

        let content = fs::read_to_string(&genesis)
            .change_context_lazy(|| Error::Denom(genesis.clone()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .change_context_lazy(|| Error::Denom(genesis.clone()))?;

        value
            .pointer(BOND_DENOM_POINTER)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Report::new(Error::Denom(genesis.clone())))
            .attach_printable(BOND_DENOM_POINTER)
    }

    /// The mnemonic stored for `wallet` under the chain home. `None` when nothing was stored.
    pub fn mnemonic(&self, reference: &str, wallet: &str) -> Result<Option<String>, Error> {
        let path = self.chain_path(
            reference,
            Path::new(MNEMONICS_DIR).join(format!("{wallet}.json")),
        )?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), wallet, "no stored mnemonic");
                return Ok(None);
            }
            Err(err) => return Err(Report::new(err).change_context(Error::Keys(path))),
        };

        let keys: Keys =
            serde_json::from_str(&content).change_context_lazy(|| Error::Keys(path.clone()))?;

        Ok(Some(keys.mnemonic).filter(|mnemonic| !mnemonic.is_empty()))
    }

    pub fn base_port(&self, full_name: &str) -> Result<u16, Error> {
        self.find_node(full_name).map(|(_, node)| node.port)
    }

    pub fn port(&self, full_name: &str, role: PortRole) -> Result<u16, Error> {
        let base = self.base_port(full_name)?;

        base.checked_add(role.offset()).ok_or_else(|| {
            Report::new(Error::InvalidPort {
                port: u64::from(base).saturating_add(u64::from(role.offset())),
                location: format!("{full_name} ({role})"),
            })
        })
    }

    fn find_hermes(&self, index: usize) -> Result<&HermesConfig, Error> {
        self.hermes
            .get(index)
            .ok_or_else(|| Report::new(Error::UnknownHermes(index)))
    }

    pub fn hermes_binary(&self, index: usize) -> Result<String, Error> {
        match first_set([&self.find_hermes(index)?.binary]) {
            Some(binary) => expand(binary),
            None => find_binary(DEFAULT_HERMES_BINARY),
        }
    }

    pub fn hermes_config_path(&self, index: usize) -> Result<PathBuf, Error> {
        self.resolve_hermes_config_path(self.find_hermes(index)?)
    }

    pub fn hermes_home(&self, index: usize) -> Result<PathBuf, Error> {
        let hermes = self.find_hermes(index)?;
        if !hermes.home.is_empty() {
            return expand(&hermes.home).map(PathBuf::from);
        }

        let config = self.resolve_hermes_config_path(hermes)?;
        Ok(config.parent().map(Path::to_path_buf).unwrap_or_default())
    }

    pub(crate) fn resolve_hermes_config_path(
        &self,
        hermes: &HermesConfig,
    ) -> Result<PathBuf, Error> {
        if !hermes.config.is_empty() {
            return expand(&hermes.config).map(PathBuf::from);
        }
        if !hermes.home.is_empty() {
            return expand(&hermes.home).map(|home| Path::new(&home).join("config.toml"));
        }

        Ok(self.global_home()?.join("hermes").join("config.toml"))
    }
}
