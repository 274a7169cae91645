//! Turns command line arguments into the list of nodes a command operates on.

use error_stack::{Result, ResultExt};
use itertools::Itertools;

use crate::config::Config;
use crate::resolver;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid input {0}")]
pub struct InvalidInput(pub String);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub chains: Vec<String>,
    pub nodes: Vec<String>,
    pub validators: Vec<String>,
    /// Selected full node names, in the order they were first named.
    pub input: Vec<String>,
}

impl Selection {
    /// No arguments select every node. A chain name selects every node of that chain, anything
    /// else has to resolve to a single node.
    pub fn new<S: AsRef<str>>(cfg: &Config, args: &[S]) -> Result<Self, InvalidInput> {
        let chains: Vec<String> = cfg.chains.keys().cloned().collect();
        let nodes = cfg.node_names();
        let validators = cfg
            .chains
            .iter()
            .flat_map(|(chain_name, chain)| {
                chain
                    .nodes
                    .iter()
                    .filter(|(_, node)| node.validator)
                    .map(move |(node_name, _)| resolver::full_name(chain_name, node_name))
            })
            .collect();

        let input = if args.is_empty() {
            nodes.clone()
        } else {
            let mut input = Vec::new();
            for arg in args.iter().map(|arg| arg.as_ref().trim()) {
                match cfg.chains.get(arg) {
                    Some(chain) => input.extend(
                        chain
                            .nodes
                            .keys()
                            .map(|node_name| resolver::full_name(arg, node_name)),
                    ),
                    None => input.push(
                        resolver::resolve(nodes.iter().map(String::as_str), arg)
                            .change_context_lazy(|| InvalidInput(arg.to_string()))?,
                    ),
                }
            }
            input.into_iter().unique().collect()
        };

        Ok(Self {
            chains,
            nodes,
            validators,
            input,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_ok::assert_ok;

    use super::{InvalidInput, Selection};
    use crate::config::tests::debug_config;
    use crate::resolver;

    #[test]
    fn no_arguments_select_every_node() {
        let cfg = assert_ok!(debug_config().finalize());
        let selection = assert_ok!(Selection::new::<&str>(&cfg, &[]));

        assert_eq!(selection.input, cfg.node_names());
        assert_eq!(selection.chains, vec!["testnet-1", "testnet-2"]);
        assert_eq!(
            selection.validators,
            vec!["testnet-1.validator1", "testnet-2.validator1"]
        );
    }

    #[test]
    fn chain_name_selects_its_nodes() {
        let cfg = assert_ok!(debug_config().finalize());
        let selection = assert_ok!(Selection::new(&cfg, &[" testnet-2 "]));

        assert_eq!(
            selection.input,
            vec!["testnet-2.fullnode1", "testnet-2.validator1"]
        );
    }

    #[test]
    fn selection_is_unique_in_first_seen_order() {
        let cfg = assert_ok!(debug_config().finalize());
        let selection = assert_ok!(Selection::new(
            &cfg,
            &["fullnode2", "testnet-1", "testnet-1.fullnode2"]
        ));

        assert_eq!(
            selection.input,
            vec![
                "testnet-1.fullnode2",
                "testnet-1.fullnode1",
                "testnet-1.validator1"
            ]
        );
    }

    #[test]
    fn ambiguous_input_is_rejected() {
        let cfg = assert_ok!(debug_config().finalize());
        let err = Selection::new(&cfg, &["validator1"]).unwrap_err();

        assert_eq!(err.current_context(), &InvalidInput("validator1".into()));
        assert!(err
            .frames()
            .filter_map(|frame| frame.downcast_ref::<resolver::Error>())
            .any(|err| matches!(err, resolver::Error::Ambiguous(_))));
    }

    #[test]
    fn unknown_input_is_rejected() {
        let cfg = assert_ok!(debug_config().finalize());
        assert!(Selection::new(&cfg, &["testnet-3.validator1"]).is_err());
    }
}
