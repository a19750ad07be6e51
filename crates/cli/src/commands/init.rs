//! `sentia init`: write a default config file.

use std::path::Path;

use anyhow::Context;
use sentia_config::AppConfig;

pub fn run(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };

    if path.exists() && !force {
        println!("  Config already exists: {}", path.display());
        println!("  Use --force to overwrite it.");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("  Wrote {}", path.display());
    println!();
    println!("  Set at least one provider key to get generated replies:");
    for (name, var) in sentia_config::PROVIDER_KEY_VARS {
        println!("    {var:<18} ({name})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_config_and_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        run(Some(path.as_path()), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(AppConfig::load_from(&path).is_ok());

        std::fs::write(&path, "# edited\n").unwrap();
        run(Some(path.as_path()), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");

        run(Some(path.as_path()), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }
}
