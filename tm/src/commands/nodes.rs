use error_stack::Result;
use itertools::Itertools;

use crate::commands::{load, select};
use crate::config::Filename;
use crate::Error;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Chain names, full node names or unique node names. Selects every node when omitted
    #[arg(value_name = "NODE")]
    pub nodes: Vec<String>,

    /// Only list validators
    #[arg(long)]
    pub validators: bool,
}

pub fn run(filename: Filename, args: Args) -> Result<Option<String>, Error> {
    let cfg = load(filename)?;
    let selection = select(&cfg, &args.nodes)?;

    let listed = selection
        .input
        .iter()
        .filter(|node| !args.validators || selection.validators.contains(*node))
        .join("\n");

    Ok(Some(listed))
}
