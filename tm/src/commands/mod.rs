use clap::Subcommand;
use error_stack::{Result, ResultExt};

use crate::config::{Config, Filename};
use crate::context::Selection;
use crate::Error;

pub mod init;
pub mod nodes;
pub mod ports;
pub mod show;

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Write the default configuration unless a config file already exists
    Init,
    /// Print the configuration with every port assigned
    Show,
    /// List the selected nodes
    Nodes(nodes::Args),
    /// List the ports of the selected nodes
    Ports(ports::Args),
}

fn load(filename: Filename) -> Result<Config, Error> {
    Config::load(filename).change_context(Error::LoadConfig)
}

fn select(cfg: &Config, args: &[String]) -> Result<Selection, Error> {
    Selection::new(cfg, args).change_context(Error::InvalidInput)
}
