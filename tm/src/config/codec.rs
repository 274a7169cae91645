//! Conversion between the typed configuration and its TOML document.
//!
//! Chains and nodes are not known ahead of time, so the document is decoded twice: once into the
//! static part of [`Config`] and once into an untyped table from which every `[chain]` and
//! `[chain.node]` table is picked up by hand.

use std::collections::BTreeMap;
use std::fmt::Write;

use error_stack::{bail, ensure, report, Result, ResultExt};
use itertools::Itertools;
use serde::Serialize;
use toml::value::Table;
use toml::Value;

use crate::config::coerce::{self, extract_bool, extract_string, extract_string_list, extract_uint};
use crate::config::{ChainConfig, Config, Error, Filename, Node};

/// Keys decoded straight into [`Config`].
const ROOT_KEYS: [&str; 7] = [
    "binary",
    "home",
    "stop_maintain",
    "no_config_override",
    "port",
    "wallet",
    "hermes",
];

/// Decodes a configuration document, then validates it and assigns ports.
pub fn decode(data: &str, filename: Filename) -> Result<Config, Error> {
    let mut cfg: Config = toml::from_str(data).change_context(Error::Decode)?;
    let document: Table = toml::from_str(data).change_context(Error::Decode)?;

    cfg.chains = decode_chains(&document)?;
    cfg.filename = filename;

    cfg.finalize()
}

fn decode_chains(document: &Table) -> Result<BTreeMap<String, ChainConfig>, Error> {
    let mut definitions = Vec::new();

    for (chain_key, value) in document
        .iter()
        .filter(|(key, _)| !ROOT_KEYS.contains(&key.as_str()))
    {
        let chain_table = match value {
            Value::Table(table) => table,
            value if is_table_array(value) => bail!(Error::InvalidKey(chain_key.clone())),
            // stray scalars at the root are ignored
            _ => continue,
        };
        definitions.push((chain_key.clone(), chain_table));

        for (node_key, value) in chain_table {
            let key = format!("{chain_key}.{node_key}");
            let node_table = match value {
                Value::Table(table) => table,
                value if is_table_array(value) => bail!(Error::InvalidKey(key)),
                _ => continue,
            };

            if let Some((nested, _)) = node_table
                .iter()
                .find(|(_, value)| value.is_table() || is_table_array(value))
            {
                bail!(Error::InvalidKey(format!("{key}.{nested}")));
            }
            definitions.push((key, node_table));
        }
    }

    // chains have to exist before their nodes are added
    definitions.sort_by_key(|(key, _)| key.split('.').count());

    let mut chains: BTreeMap<String, ChainConfig> = BTreeMap::new();
    for (key, table) in definitions {
        match key.split('.').collect::<Vec<_>>().as_slice() {
            [chain_name] => {
                ensure!(
                    !chains.contains_key(*chain_name),
                    Error::DuplicateChain(key.clone())
                );
                chains.insert(chain_name.to_string(), decode_chain(&key, table)?);
            }
            [chain_name, node_name] => {
                let chain = chains
                    .get_mut(*chain_name)
                    .ok_or_else(|| report!(Error::UndefinedChain(key.clone())))?;
                ensure!(
                    !chain.nodes.contains_key(*node_name),
                    Error::DuplicateNode(key.clone())
                );
                chain
                    .nodes
                    .insert(node_name.to_string(), decode_node(&key, table)?);
            }
            _ => bail!(Error::InvalidKey(key.clone())),
        }
    }

    Ok(chains)
}

/// `[[a.b]]` sections decode into arrays of tables.
fn is_table_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().any(Value::is_table))
}

fn field<T>(
    table: &Table,
    key: &str,
    name: &str,
    extract: fn(Option<&Value>) -> Result<T, coerce::Error>,
) -> Result<T, Error> {
    extract(table.get(name)).change_context_lazy(|| Error::InvalidValue(format!("{key}.{name}")))
}

fn decode_chain(key: &str, table: &Table) -> Result<ChainConfig, Error> {
    Ok(ChainConfig {
        hd_path: field(table, key, "hdpath", extract_string)?,
        binary: field(table, key, "binary", extract_string)?,
        home: field(table, key, "home", extract_string)?,
        denom: field(table, key, "denom", extract_string)?,
        stop_maintain: field(table, key, "stop_maintain", extract_bool)?,
        nodes: BTreeMap::new(),
    })
}

fn decode_node(key: &str, table: &Table) -> Result<Node, Error> {
    let port = field(table, key, "port", extract_uint)?;
    let port = u16::try_from(port).change_context_lazy(|| Error::InvalidPort {
        port,
        location: key.to_string(),
    })?;

    Ok(Node {
        validator: field(table, key, "validator", extract_bool)?,
        binary: field(table, key, "binary", extract_string)?,
        home: field(table, key, "home", extract_string)?,
        mnemonic: field(table, key, "mnemonics", extract_string)?,
        port,
        stop_maintain: field(table, key, "stop_maintain", extract_bool)?,
        connections: field(table, key, "connections", extract_string_list)?,
    })
}

/// Encodes the configuration as a TOML document.
///
/// The serializer only nests one level of named tables, so chain and node headers are written out
/// explicitly.
pub fn encode(cfg: &Config) -> Result<String, Error> {
    let mut document = toml::to_string(cfg).change_context(Error::Encode)?;

    for (chain_name, chain) in &cfg.chains {
        write_table(&mut document, &[chain_name.as_str()], chain)?;

        for (node_name, node) in &chain.nodes {
            write_table(&mut document, &[chain_name.as_str(), node_name.as_str()], node)?;
        }
    }

    Ok(document)
}

fn write_table<T: Serialize>(document: &mut String, path: &[&str], value: &T) -> Result<(), Error> {
    let body = toml::to_string(value).change_context(Error::Encode)?;
    let header = path.iter().map(|segment| table_key(segment)).join(".");

    if !document.is_empty() {
        document.push('\n');
    }
    write!(document, "[{header}]\n{body}").change_context(Error::Encode)
}

fn table_key(segment: &str) -> String {
    let is_bare = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if is_bare {
        segment.to_string()
    } else {
        // a JSON string literal is a valid TOML basic string
        serde_json::Value::String(segment.to_string()).to_string()
    }
}
