use error_stack::{Result, ResultExt};

use crate::commands::load;
use crate::config::{encode, Filename};
use crate::Error;

pub fn run(filename: Filename) -> Result<Option<String>, Error> {
    let cfg = load(filename)?;

    encode(&cfg).change_context(Error::Encode).map(Some)
}
