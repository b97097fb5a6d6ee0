use config::Config;
use serde::Deserialize;

use std::path::PathBuf;

mod link;
pub use link::LinkConfig;

mod logger;
pub use logger::LoggerConfig;

#[derive(Deserialize)]
pub struct ServiceConfig {
    /// Instance name of the form `<scope>__<kind>__<interface_name>`.
    pub name: String,

    /// Logical targets served by this interface.
    #[serde(default)]
    pub targets: Vec<String>,

    pub link: LinkConfig,

    #[serde(default)]
    pub shutdown_timeout: Option<u64>,

    #[serde(default = "default_exception_dir")]
    pub exception_dir: PathBuf,

    #[serde(default)]
    pub logger: LoggerConfig,
}

fn default_exception_dir() -> PathBuf {
    PathBuf::from("exceptions")
}

impl ServiceConfig {
    pub fn from_path(path: PathBuf) -> eyre::Result<Self> {
        let config = Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
