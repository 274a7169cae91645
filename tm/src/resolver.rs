//! Resolution of node references to full `chain.node` names.
//!
//! A reference is either a full name (`testnet-1.validator1`) or a bare node
//! name (`validator1`). Bare names only resolve when they are unique across
//! every chain.

use error_stack::{bail, ensure, Result};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("empty node name not allowed")]
    Empty,
    #[error("too many fields in node name {0}")]
    TooManyFields(String),
    #[error("node name not found {0}")]
    NotFound(String),
    #[error("ambiguous moniker {0}")]
    Ambiguous(String),
}

/// Joins a chain name and a node name into a full node name.
pub fn full_name(chain: &str, node: &str) -> String {
    format!("{chain}.{node}")
}

/// Splits a full node name into its chain and node components.
pub fn split(full_name: &str) -> Option<(&str, &str)> {
    let (chain, node) = full_name.split_once('.')?;
    if node.contains('.') {
        return None;
    }

    Some((chain, node))
}

/// Finds the full name `token` refers to among `all_nodes`.
pub fn resolve<'a, I>(all_nodes: I, token: &str) -> Result<String, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    ensure!(!token.is_empty(), Error::Empty);

    match token.matches('.').count() {
        0 => resolve_moniker(all_nodes, token),
        1 => {
            ensure!(
                all_nodes.into_iter().any(|name| name == token),
                Error::NotFound(token.to_string())
            );
            Ok(token.to_string())
        }
        _ => bail!(Error::TooManyFields(token.to_string())),
    }
}

fn resolve_moniker<'a, I>(all_nodes: I, moniker: &str) -> Result<String, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut matches = all_nodes
        .into_iter()
        .filter(|name| split(name).is_some_and(|(_, node)| node == moniker));

    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found.to_string()),
        (Some(_), Some(_)) => bail!(Error::Ambiguous(moniker.to_string())),
        (None, _) => bail!(Error::NotFound(moniker.to_string())),
    }
}
