use error_stack::{Result, ResultExt};

use crate::config::{Config, Filename};
use crate::Error;

pub fn run(filename: Filename) -> Result<Option<String>, Error> {
    let cfg = Config::default_for(filename).change_context(Error::SaveConfig)?;
    let path = cfg.filename.path.display();

    let msg = if cfg.save_if_absent().change_context(Error::SaveConfig)? {
        format!("config written to {path}")
    } else {
        format!("config file {path} already exists, left untouched")
    };

    Ok(Some(msg))
}
