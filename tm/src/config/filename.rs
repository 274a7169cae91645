use std::path::{Path, PathBuf};

use error_stack::{report, Result, ResultExt};

use crate::config::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_HOME: &str = ".tm";

/// Location overrides given on the command line or through the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathContext {
    pub config: Option<String>,
    pub home: Option<String>,
}

/// Describes the config file path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filename {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub base: String,
    /// Extension without the leading dot.
    pub extension: String,
    pub base_no_ext: String,
}

impl Filename {
    /// An explicit config path wins over an explicit home directory, which wins over `~/.tm`.
    pub fn resolve(ctx: &PathContext) -> Result<Self, Error> {
        let path = match (&ctx.config, &ctx.home) {
            (Some(config), _) => absolute(config)?,
            (None, Some(home)) => absolute(home)?.join(CONFIG_FILE_NAME),
            (None, None) => user_home(dirs::home_dir())?
                .join(DEFAULT_HOME)
                .join(CONFIG_FILE_NAME),
        };

        Ok(Self::from_path(path))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = |p: Option<&std::ffi::OsStr>| {
            p.map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            base: name(path.file_name()),
            extension: name(path.extension()),
            base_no_ext: name(path.file_stem()),
            path,
        }
    }
}

fn user_home(home: Option<PathBuf>) -> Result<PathBuf, Error> {
    home.filter(|home| home.is_absolute())
        .ok_or_else(|| report!(Error::Expand("~".to_string())))
        .attach_printable("no home directory found, set --home or --config")
}

fn absolute(raw: &str) -> Result<PathBuf, Error> {
    let raw = raw.trim();
    let expanded = shellexpand::full(raw).change_context_lazy(|| Error::Expand(raw.to_string()))?;

    std::path::absolute(&*expanded)
        .change_context_lazy(|| Error::Expand(raw.to_string()))
}
