//! Config command implementation

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to the XDG location)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the config file path instead of its contents
    #[arg(long)]
    pub path: bool,
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    if args.path {
        let path = args.config.unwrap_or_else(config::default_config_path);
        println!("{}", path.display());
        return Ok(());
    }

    let config = config::load(args.config.as_deref()).await?;
    print!("{}", config::to_toml(&config)?);
    Ok(())
}
