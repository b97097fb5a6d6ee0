use std::path::PathBuf;

use clap::Args;

#[derive(Args, Debug)]
pub struct Run {
    /// Path to the microservice configuration file.
    #[clap(long, short, default_value = "gndifd.toml")]
    pub config: PathBuf,
}
