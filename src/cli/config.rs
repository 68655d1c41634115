//! Configuration management command

use clap::Subcommand;
use std::path::{Path, PathBuf};
use studentdesk_core::{
    config::default_config_path,
    error::{PortalError, Result},
    PortalConfig,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,

    /// Write a default configuration file
    Init {
        /// Destination (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Handle configuration management command
pub async fn handle(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = PortalConfig::load(config_path)?;
            print!("{}", config.redacted().to_toml()?);
            Ok(())
        }
        ConfigAction::Init { path, force } => {
            let path = path.or_else(default_config_path).ok_or_else(|| {
                PortalError::Config("could not determine a config directory".to_string())
            })?;
            if path.exists() && !force {
                return Err(PortalError::AlreadyExists(format!(
                    "{} (use --force to overwrite)",
                    path.display()
                )));
            }

            PortalConfig::default().to_file(&path)?;
            println!("✓ Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
