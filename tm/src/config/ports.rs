use std::fmt::{self, Display, Formatter};

use error_stack::{bail, Result, ResultExt};
use tracing::debug;

use crate::config::{Config, Error};
use crate::resolver;

pub const DEFAULT_PORT: u16 = 26600;
pub const PORT_STEP: u16 = 10;

/// Secondary ports, derived from a node's base port by a fixed offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortRole {
    Rpc,
    App,
    Grpc,
    P2p,
    Pprof,
    Kms,
    GrpcWeb,
}

impl PortRole {
    pub const ALL: [PortRole; 7] = [
        PortRole::Rpc,
        PortRole::App,
        PortRole::Grpc,
        PortRole::P2p,
        PortRole::Pprof,
        PortRole::Kms,
        PortRole::GrpcWeb,
    ];

    pub fn offset(self) -> u16 {
        match self {
            PortRole::Rpc => 0,
            PortRole::App => 1,
            PortRole::Grpc => 2,
            PortRole::P2p => 3,
            PortRole::Pprof => 4,
            PortRole::Kms => 5,
            PortRole::GrpcWeb => 6,
        }
    }
}

impl Display for PortRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortRole::Rpc => "rpc",
            PortRole::App => "api",
            PortRole::Grpc => "grpc",
            PortRole::P2p => "p2p",
            PortRole::Pprof => "pprof",
            PortRole::Kms => "kms",
            PortRole::GrpcWeb => "grpc-web",
        })
    }
}

/// Assigns a port to every node that has none.
///
/// Ports are handed out from the global port upwards in steps of [`PORT_STEP`]. A preset port
/// that falls strictly inside the range handed out is rejected because it could collide with an
/// assigned one. The global port is left pointing past the last assignment.
pub fn assign(cfg: &mut Config) -> Result<(), Error> {
    if cfg.port == 0 {
        cfg.port = DEFAULT_PORT;
    }
    let base = cfg.port;
    let mut cursor = base;
    let mut assigned = 0usize;
    let mut presets = Vec::new();

    for (chain_name, chain) in cfg.chains.iter_mut() {
        for (node_name, node) in chain.nodes.iter_mut() {
            let full_name = || resolver::full_name(chain_name, node_name);

            if node.port == 0 {
                node.port = cursor;
                cursor = cursor
                    .checked_add(PORT_STEP)
                    .ok_or(Error::PortsExhausted(full_name()))
                    .attach_printable_lazy(|| format!("last assigned port {}", node.port))?;
                assigned = assigned.saturating_add(1);
            } else {
                presets.push((full_name(), node.port));
            }
        }
    }

    // presets are checked against the final range
    if let Some((node, port)) = presets
        .into_iter()
        .find(|(_, port)| *port > base && *port < cursor)
    {
        bail!(Error::PortConflict {
            node,
            port,
            base,
            cursor,
        });
    }

    debug!(base, next = cursor, assigned, "assigned node ports");
    cfg.port = cursor;

    Ok(())
}
