use std::{fs, path::Path};

use anyhow::{Context as _, bail};
use console::style;
use napthe_core::NapTheConfig;

use crate::Context;

const CONFIG_HEADER: &str = "\
# NapThe configuration
# partner_id and partner_key can also be set with NAPTHE_PARTNER_ID / NAPTHE_PARTNER_KEY
";

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct InitCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        println!(
            "{}{} {}\n",
            style("Nap"),
            style("The").green(),
            style("redeems prepaid top-up cards for your server.").dim()
        );

        write_default_config(&ctx.config_path, self.force)?;

        println!(
            "{} Wrote {}",
            style("✓").green(),
            style(ctx.config_path.display()).bold()
        );
        println!(
            "  {}",
            style("Fill in partner_id and partner_key before charging cards").dim()
        );
        Ok(())
    }
}

fn write_default_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    let yaml = NapTheConfig::default()
        .to_yaml()
        .context("Failed to render default config")?;
    fs::write(path, format!("{CONFIG_HEADER}{yaml}"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("napthe.yaml");

        write_default_config(&path, false).unwrap();
        let config = NapTheConfig::load(&path).unwrap();
        assert_eq!(config.reconcile.interval, 30);
        assert!(config.partner_id.is_empty());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("napthe.yaml");
        fs::write(&path, "partner_id: keep-me\n").unwrap();

        assert!(write_default_config(&path, false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "partner_id: keep-me\n");

        write_default_config(&path, true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("# NapThe"));
    }
}
