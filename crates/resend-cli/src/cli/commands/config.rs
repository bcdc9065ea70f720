//! `resend config` – show where the config lives and what it resolves to.

use anyhow::Result;
use resend_core::config::ResendConfig;
use std::path::Path;

pub fn run_config(cfg: &ResendConfig, path: &Path) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", cfg.to_toml_string()?);
    Ok(())
}
