use std::collections::HashSet;

use error_stack::{bail, ensure, Result, ResultExt};
use itertools::Itertools;

use crate::config::{ChainConfig, Config, Error, HermesConfig, Node, Wallet};
use crate::resolver;

/// Checks the node logic of the configuration and normalizes it.
///
/// Strings get trimmed, node connections are stored without their chain prefix and Hermes
/// nodes with it. The first violation found is returned.
pub fn validate(mut cfg: Config) -> Result<Config, Error> {
    trim(&mut cfg);

    validate_names(&cfg)?;
    validate_wallets(&cfg.wallets)?;
    let all_nodes = validate_chains(&cfg)?;

    for (chain_name, chain) in cfg.chains.iter_mut() {
        for (node_name, node) in chain.nodes.iter_mut() {
            node.connections = normalize_connections(&all_nodes, chain_name, node_name, node)?;
        }
    }

    let mut hermes = std::mem::take(&mut cfg.hermes);
    validate_hermes(&cfg, &all_nodes, &mut hermes)?;
    cfg.hermes = hermes;

    Ok(cfg)
}

fn trim(cfg: &mut Config) {
    trim_string(&mut cfg.binary);
    trim_string(&mut cfg.home);

    for wallet in cfg.wallets.iter_mut() {
        trim_string(&mut wallet.name);
        trim_string(&mut wallet.mnemonic);
    }

    for chain in cfg.chains.values_mut() {
        trim_string(&mut chain.hd_path);
        trim_string(&mut chain.binary);
        trim_string(&mut chain.home);
        trim_string(&mut chain.denom);

        for node in chain.nodes.values_mut() {
            trim_string(&mut node.binary);
            trim_string(&mut node.home);
            trim_string(&mut node.mnemonic);
            node.connections.iter_mut().for_each(trim_string);
        }
    }

    for hermes in cfg.hermes.iter_mut() {
        trim_string(&mut hermes.binary);
        trim_string(&mut hermes.home);
        trim_string(&mut hermes.config);
        trim_string(&mut hermes.log_level);
        trim_string(&mut hermes.telemetry_host);
        trim_string(&mut hermes.mnemonic);
        hermes.nodes.iter_mut().for_each(trim_string);
    }
}

fn trim_string(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn validate_names(cfg: &Config) -> Result<(), Error> {
    let is_valid = |name: &str| !name.is_empty() && !name.contains('.');

    for (chain_name, chain) in &cfg.chains {
        ensure!(is_valid(chain_name), Error::InvalidName(chain_name.clone()));

        if let Some(node_name) = chain.nodes.keys().find(|name| !is_valid(name)) {
            bail!(Error::InvalidName(resolver::full_name(chain_name, node_name)));
        }
    }

    Ok(())
}

fn validate_wallets(wallets: &[Wallet]) -> Result<(), Error> {
    let mut names = HashSet::new();
    let mut mnemonics = HashSet::new();

    for wallet in wallets {
        ensure!(
            names.insert(wallet.name.as_str()),
            Error::DuplicateWalletName(wallet.name.clone())
        );
        ensure!(
            wallet.mnemonic.is_empty() || mnemonics.insert(wallet.mnemonic.as_str()),
            Error::DuplicateWalletMnemonic(wallet.name.clone())
        );
    }

    Ok(())
}

/// Returns the full name of every node.
fn validate_chains(cfg: &Config) -> Result<Vec<String>, Error> {
    let mut all_nodes = Vec::new();
    let mut seen = HashSet::new();

    for (chain_name, chain) in &cfg.chains {
        for node_name in chain.nodes.keys() {
            ensure!(
                !cfg.chains.contains_key(node_name),
                Error::NodeNameIsChainName(node_name.clone())
            );

            let full_name = resolver::full_name(chain_name, node_name);
            ensure!(
                seen.insert(full_name.clone()),
                Error::DuplicateNode(full_name)
            );
            all_nodes.push(full_name);
        }

        ensure!(
            has_validator(chain),
            Error::MissingValidator(chain_name.clone())
        );
    }

    Ok(all_nodes)
}

fn has_validator(chain: &ChainConfig) -> bool {
    chain.nodes.values().any(|node| node.validator)
}

fn normalize_connections(
    all_nodes: &[String],
    chain_name: &str,
    node_name: &str,
    node: &Node,
) -> Result<Vec<String>, Error> {
    let self_name = resolver::full_name(chain_name, node_name);
    let mut resolved = HashSet::new();

    node.connections
        .iter()
        .map(|connection| {
            let target = if connection.contains('.') {
                connection.clone()
            } else {
                resolver::full_name(chain_name, connection)
            };

            let full_name = resolver::resolve(all_nodes.iter().map(String::as_str), &target)
                .change_context_lazy(|| Error::UnresolvedConnection {
                    node: self_name.clone(),
                    connection: connection.clone(),
                })?;

            ensure!(
                full_name != self_name,
                Error::SelfConnection {
                    node: self_name.clone(),
                    connection: connection.clone(),
                }
            );

            let Some((target_chain, target_node)) = resolver::split(&full_name) else {
                bail!(Error::UnresolvedConnection {
                    node: self_name.clone(),
                    connection: connection.clone(),
                });
            };
            ensure!(
                target_chain == chain_name,
                Error::CrossChainConnection {
                    node: self_name.clone(),
                    connection: connection.clone(),
                }
            );
            ensure!(
                resolved.insert(full_name.clone()),
                Error::DuplicateConnection {
                    node: self_name.clone(),
                    connection: connection.clone(),
                }
            );

            Ok(target_node.to_string())
        })
        .collect()
}

fn validate_hermes(
    cfg: &Config,
    all_nodes: &[String],
    hermes: &mut [HermesConfig],
) -> Result<(), Error> {
    let mut config_paths = HashSet::new();

    // definitions are numbered from 1, as they appear in the file
    for (index, entry) in (1..).zip(hermes.iter_mut()) {
        ensure!(!entry.nodes.is_empty(), Error::NoHermesNodes(index));

        let path = cfg.resolve_hermes_config_path(entry)?;
        ensure!(
            config_paths.insert(path.clone()),
            Error::DuplicateHermesConfig {
                index,
                path: path.display().to_string(),
            }
        );

        entry.nodes = entry
            .nodes
            .iter()
            .map(|node| {
                resolver::resolve(all_nodes.iter().map(String::as_str), node).change_context_lazy(
                    || Error::UnresolvedHermesNode {
                        index,
                        node: node.clone(),
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(chain) = entry
            .nodes
            .iter()
            .filter_map(|node| resolver::split(node).map(|(chain, _)| chain))
            .duplicates()
            .next()
        {
            bail!(Error::MultipleHermesNodesPerChain {
                index,
                chain: chain.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_ok::assert_ok;
    use error_stack::Report;

    use super::validate;
    use crate::config::tests::debug_config;
    use crate::config::{ChainConfig, Config, Error, HermesConfig, Node, Wallet};
    use crate::resolver;

    fn chain(nodes: Vec<(&str, Node)>) -> ChainConfig {
        ChainConfig {
            nodes: nodes
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
            ..ChainConfig::default()
        }
    }

    fn connected(validator: bool, connections: &[&str]) -> Node {
        Node {
            validator,
            connections: connections.iter().map(|c| c.to_string()).collect(),
            ..Node::default()
        }
    }

    fn single_chain(nodes: Vec<(&str, Node)>) -> Config {
        Config {
            chains: BTreeMap::from([("testnet-1".to_string(), chain(nodes))]),
            ..Config::default()
        }
    }

    fn two_chains() -> Config {
        Config {
            chains: BTreeMap::from([
                (
                    "testnet-1".to_string(),
                    chain(vec![
                        ("validator1", Node::validator()),
                        ("fullnode1", Node::default()),
                    ]),
                ),
                (
                    "testnet-2".to_string(),
                    chain(vec![
                        ("validator1", Node::validator()),
                        ("fullnode2", Node::default()),
                    ]),
                ),
            ]),
            ..Config::default()
        }
    }

    fn with_hermes(mut cfg: Config, nodes: &[&str]) -> Config {
        cfg.hermes.push(HermesConfig {
            config: format!("/tmp/hermes-{}/config.toml", cfg.hermes.len()),
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            ..HermesConfig::default()
        });
        cfg
    }

    fn context(result: Result<Config, Report<Error>>) -> Error {
        match result {
            Ok(_) => panic!("validation should fail"),
            Err(report) => report.current_context().clone(),
        }
    }

    #[test]
    fn connections_are_normalized_to_node_names() {
        let cfg = single_chain(vec![
            ("validator1", connected(true, &["fullnode2", "fullnode1"])),
            (
                "fullnode1",
                Node {
                    stop_maintain: true,
                    ..Node::default()
                },
            ),
            ("fullnode2", connected(false, &["testnet-1.fullnode1"])),
        ]);

        let cfg = assert_ok!(validate(cfg));
        let nodes = &cfg.chains["testnet-1"].nodes;
        assert_eq!(nodes["fullnode2"].connections, vec!["fullnode1"]);
        assert_eq!(
            nodes["validator1"].connections,
            vec!["fullnode2", "fullnode1"]
        );
    }

    #[test]
    fn strings_are_trimmed() {
        let mut cfg = single_chain(vec![("validator1", connected(true, &[" fullnode1 "]))]);
        cfg.chains
            .get_mut("testnet-1")
            .unwrap()
            .nodes
            .insert("fullnode1".into(), Node::default());
        cfg.binary = "  gaiad ".into();
        cfg.wallets.push(Wallet {
            name: " wallet1 ".into(),
            mnemonic: " a b c ".into(),
        });

        let cfg = assert_ok!(validate(cfg));
        assert_eq!(cfg.binary, "gaiad");
        assert_eq!(cfg.wallets[0].name, "wallet1");
        assert_eq!(cfg.wallets[0].mnemonic, "a b c");
        assert_eq!(
            cfg.chains["testnet-1"].nodes["validator1"].connections,
            vec!["fullnode1"]
        );
    }

    #[test]
    fn self_connection_is_rejected() {
        let cfg = single_chain(vec![("validator1", connected(true, &["validator1"]))]);
        assert!(matches!(
            context(validate(cfg)),
            Error::SelfConnection { .. }
        ));
    }

    #[test]
    fn duplicate_connection_is_rejected() {
        let cfg = single_chain(vec![
            ("validator1", Node::validator()),
            (
                "fullnode1",
                connected(false, &["validator1", "testnet-1.validator1"]),
            ),
        ]);
        assert!(matches!(
            context(validate(cfg)),
            Error::DuplicateConnection { .. }
        ));
    }

    #[test]
    fn cross_chain_connection_is_rejected() {
        let mut cfg = two_chains();
        cfg.chains
            .get_mut("testnet-1")
            .unwrap()
            .nodes
            .insert("fullnode3".into(), connected(false, &["testnet-2.fullnode2"]));

        assert!(matches!(
            context(validate(cfg)),
            Error::CrossChainConnection { .. }
        ));
    }

    #[test]
    fn unknown_connection_is_rejected() {
        let cfg = single_chain(vec![("validator1", connected(true, &["sentry"]))]);
        assert!(matches!(
            context(validate(cfg)),
            Error::UnresolvedConnection { .. }
        ));
    }

    #[test]
    fn bare_connection_stays_within_its_chain() {
        let mut cfg = two_chains();
        cfg.chains
            .get_mut("testnet-1")
            .unwrap()
            .nodes
            .insert("fullnode3".into(), connected(false, &["validator1"]));

        let cfg = assert_ok!(validate(cfg));
        assert_eq!(
            cfg.chains["testnet-1"].nodes["fullnode3"].connections,
            vec!["validator1"]
        );
    }

    #[test]
    fn chain_without_validator_is_rejected() {
        let cfg = single_chain(vec![("fullnode1", Node::default())]);
        assert_eq!(
            context(validate(cfg)),
            Error::MissingValidator("testnet-1".into())
        );

        assert!(matches!(
            context(validate(single_chain(vec![]))),
            Error::MissingValidator(_)
        ));
    }

    #[test]
    fn node_named_after_chain_is_rejected() {
        let mut cfg = two_chains();
        cfg.chains
            .get_mut("testnet-1")
            .unwrap()
            .nodes
            .insert("testnet-2".into(), Node::default());

        assert_eq!(
            context(validate(cfg)),
            Error::NodeNameIsChainName("testnet-2".into())
        );
    }

    #[test]
    fn dotted_names_are_rejected() {
        let cfg = single_chain(vec![("validator.1", Node::validator())]);
        assert!(matches!(context(validate(cfg)), Error::InvalidName(_)));

        let mut cfg = two_chains();
        let chain = cfg.chains.remove("testnet-2").unwrap();
        cfg.chains.insert("testnet.2".into(), chain);
        assert!(matches!(context(validate(cfg)), Error::InvalidName(_)));
    }

    #[test]
    fn duplicate_wallet_name_is_rejected() {
        let mut cfg = two_chains();
        cfg.wallets = vec![
            Wallet {
                name: "wallet1".into(),
                mnemonic: "a b c".into(),
            },
            Wallet {
                name: "wallet1".into(),
                mnemonic: "d e f".into(),
            },
        ];

        assert_eq!(
            context(validate(cfg)),
            Error::DuplicateWalletName("wallet1".into())
        );
    }

    #[test]
    fn duplicate_wallet_mnemonic_is_rejected() {
        let mut cfg = two_chains();
        cfg.wallets = vec![
            Wallet {
                name: "wallet1".into(),
                mnemonic: "a b c".into(),
            },
            Wallet {
                name: "wallet2".into(),
                mnemonic: "a b c".into(),
            },
        ];

        assert_eq!(
            context(validate(cfg)),
            Error::DuplicateWalletMnemonic("wallet2".into())
        );
    }

    #[test]
    fn empty_wallet_mnemonics_may_repeat() {
        let mut cfg = two_chains();
        cfg.wallets = vec![
            Wallet {
                name: "wallet1".into(),
                mnemonic: String::new(),
            },
            Wallet {
                name: "wallet2".into(),
                mnemonic: String::new(),
            },
        ];

        assert_ok!(validate(cfg));
    }

    #[test]
    fn hermes_nodes_across_chains_are_resolved() {
        let cfg = with_hermes(two_chains(), &["testnet-1.validator1", "testnet-2.validator1"]);
        assert_ok!(validate(cfg));

        let cfg = with_hermes(two_chains(), &["fullnode1", "fullnode2"]);
        let cfg = assert_ok!(validate(cfg));
        assert_eq!(
            cfg.hermes[0].nodes,
            vec!["testnet-1.fullnode1", "testnet-2.fullnode2"]
        );
    }

    #[test]
    fn hermes_with_two_nodes_in_one_chain_is_rejected() {
        let cfg = with_hermes(two_chains(), &["testnet-1.validator1", "testnet-1.fullnode1"]);
        assert_eq!(
            context(validate(cfg)),
            Error::MultipleHermesNodesPerChain {
                index: 1,
                chain: "testnet-1".into()
            }
        );
    }

    #[test]
    fn hermes_without_nodes_is_rejected() {
        let cfg = with_hermes(two_chains(), &[]);
        assert_eq!(context(validate(cfg)), Error::NoHermesNodes(1));
    }

    #[test]
    fn hermes_with_ambiguous_node_is_rejected() {
        let cfg = with_hermes(two_chains(), &["validator1"]);
        let err = validate(cfg).unwrap_err();

        assert!(matches!(
            err.current_context(),
            Error::UnresolvedHermesNode { index: 1, .. }
        ));
        assert!(err
            .frames()
            .filter_map(|frame| frame.downcast_ref::<resolver::Error>())
            .any(|err| matches!(err, resolver::Error::Ambiguous(_))));
    }

    #[test]
    fn hermes_config_paths_must_be_unique() {
        let mut cfg = with_hermes(two_chains(), &["testnet-1.validator1"]);
        cfg = with_hermes(cfg, &["testnet-2.validator1"]);
        cfg.hermes[1].config = cfg.hermes[0].config.clone();

        assert!(matches!(
            context(validate(cfg)),
            Error::DuplicateHermesConfig { index: 2, .. }
        ));
    }

    #[test]
    fn hermes_entries_sharing_the_default_config_path_are_rejected() {
        let mut cfg = with_hermes(two_chains(), &["testnet-1.validator1"]);
        cfg = with_hermes(cfg, &["testnet-2.validator1"]);
        cfg.home = "/tmp/tm".into();
        cfg.hermes.iter_mut().for_each(|entry| entry.config.clear());

        assert_eq!(
            context(validate(cfg)),
            Error::DuplicateHermesConfig {
                index: 2,
                path: "/tmp/tm/hermes/config.toml".into(),
            }
        );
    }

    #[test]
    fn hermes_entries_with_distinct_homes_are_accepted() {
        let mut cfg = with_hermes(two_chains(), &["testnet-1.validator1"]);
        cfg = with_hermes(cfg, &["testnet-2.validator1"]);
        cfg.home = "/tmp/tm".into();
        for (entry, home) in cfg.hermes.iter_mut().zip(["/tmp/hermes-a", "/tmp/hermes-b"]) {
            entry.config.clear();
            entry.home = home.into();
        }

        let cfg = assert_ok!(validate(cfg));
        assert_eq!(cfg.hermes.len(), 2);
    }

    #[test]
    fn debug_config_validates() {
        let cfg = assert_ok!(validate(debug_config()));
        assert_eq!(
            cfg.chains["testnet-1"].nodes["fullnode2"].connections,
            vec!["fullnode1"]
        );
    }
}
