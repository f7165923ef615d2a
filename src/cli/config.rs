use anyhow::Result;
use clap::Args;

use crate::config::LoadedConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {}

pub fn cmd_config(_args: ConfigArgs, loaded: &LoadedConfig) -> Result<()> {
    if let Some(path) = &loaded.path {
        println!("# from {}", path.display());
    }
    println!("{}", serde_yaml::to_string(&loaded.config)?);
    Ok(())
}
