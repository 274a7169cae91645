use error_stack::{Result, ResultExt};

use crate::commands::{load, select};
use crate::config::{Config, Filename, PortRole};
use crate::Error;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Chain names, full node names or unique node names. Selects every node when omitted
    #[arg(value_name = "NODE")]
    pub nodes: Vec<String>,
}

pub fn run(filename: Filename, args: Args) -> Result<Option<String>, Error> {
    let cfg = load(filename)?;
    let selection = select(&cfg, &args.nodes)?;

    let lines = selection
        .input
        .iter()
        .map(|node| describe(&cfg, node))
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Some(lines.join("\n")))
}

fn describe(cfg: &Config, node: &str) -> Result<String, Error> {
    let ports = PortRole::ALL
        .iter()
        .map(|role| {
            cfg.port(node, *role)
                .map(|port| format!("{role}={port}"))
                .change_context_lazy(|| Error::Query(format!("{role} port of {node}")))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(format!("{node} {}", ports.join(" ")))
}
