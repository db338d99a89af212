use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::InitArgs;
use crate::config::{RenderConfig, CONFIG_FILE_NAME};

pub fn run(args: InitArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    init_in(&cwd, args.force)
}

fn init_in(dir: &Path, force: bool) -> Result<()> {
    let path = dir.join(CONFIG_FILE_NAME);

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    fs::write(&path, RenderConfig::example())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    println!("\nNext steps:");
    println!("  1. Point [specs.*].inputs at your ytt templates");
    println!("  2. Run: ytt-render render");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_valid_config() {
        let temp = TempDir::new().unwrap();
        init_in(temp.path(), false).unwrap();

        let config = RenderConfig::from_file(temp.path().join(CONFIG_FILE_NAME)).unwrap();
        config.validate().unwrap();
        assert!(!config.specs.is_empty());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "# mine\n").unwrap();

        assert!(init_in(temp.path(), false).is_err());
        assert_eq!(
            fs::read_to_string(temp.path().join(CONFIG_FILE_NAME)).unwrap(),
            "# mine\n"
        );

        init_in(temp.path(), true).unwrap();
        assert_ne!(
            fs::read_to_string(temp.path().join(CONFIG_FILE_NAME)).unwrap(),
            "# mine\n"
        );
    }
}
