//! Config command - inspect and edit the JSON configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use factura_core::FacturaConfig;

/// Arguments for `factura config`.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,

    /// Write a configuration file with default values
    Init(InitArgs),

    /// Print one value by dotted key
    Get {
        /// Configuration key (e.g., "pricing.min_markup")
        key: String,
    },

    /// Change one value by dotted key, validating before saving
    Set {
        /// Configuration key
        key: String,
        /// JSON value, or a bare string
        value: String,
    },

    /// Print where the configuration file lives
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Write here instead of the configuration path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Replace an existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, &path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => show_path(&path),
    }
}

fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("factura").join("config.json"),
        None => PathBuf::from("factura.json"),
    }
}

fn load_or_default(path: &Path) -> anyhow::Result<FacturaConfig> {
    if path.exists() {
        Ok(FacturaConfig::from_file(path)?)
    } else {
        Ok(FacturaConfig::default())
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!(
            "{} {} does not exist, using defaults.",
            style("ℹ").blue(),
            path.display()
        );
    }
    let config = load_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, path: &Path) -> anyhow::Result<()> {
    let target = args.output.unwrap_or_else(|| path.to_path_buf());
    if target.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (pass --force to replace it)",
            target.display()
        );
    }

    ensure_parent(&target)?;
    FacturaConfig::default().save(&target)?;

    println!(
        "{} Wrote default configuration to {}",
        style("✓").green(),
        target.display()
    );

    Ok(())
}

/// Walk a dotted key path through a JSON value.
fn lookup<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |current, part| current.get(part))
}

fn get_config(path: &Path, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(load_or_default(path)?)?;

    let value = lookup(&json, key)
        .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;

    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

/// Set `key` in a JSON tree, creating the last segment if needed.
fn assign(json: &mut Value, key: &str, value: Value) -> anyhow::Result<()> {
    let (parent_path, last) = match key.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, key),
    };

    let mut parent = json;
    if let Some(parent_path) = parent_path {
        for part in parent_path.split('.') {
            parent = parent
                .get_mut(part)
                .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
        }
    }

    match parent.as_object_mut() {
        Some(obj) => {
            obj.insert(last.to_string(), value);
            Ok(())
        }
        None => anyhow::bail!("Cannot set value at non-object path"),
    }
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = load_or_default(path)?;

    let parsed_value: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut tree = serde_json::to_value(&config)?;
    assign(&mut tree, key, parsed_value.clone())?;

    let updated: FacturaConfig = serde_json::from_value(tree)?;
    updated.validate()?;

    ensure_parent(path)?;
    updated.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    let state = if path.exists() {
        style("present").green()
    } else {
        style("not created").yellow()
    };
    println!("{} ({})", path.display(), state);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_dotted_key() {
        let json = json!({ "pricing": { "min_markup": "20" } });

        assert_eq!(lookup(&json, "pricing.min_markup"), Some(&json!("20")));
        assert_eq!(lookup(&json, "pricing.nope"), None);
    }

    #[test]
    fn test_assign_dotted_key() {
        let mut json = json!({ "pricing": { "min_markup": "20" } });

        assign(&mut json, "pricing.min_markup", json!("25")).unwrap();
        assert_eq!(json["pricing"]["min_markup"], "25");

        assert!(assign(&mut json, "missing.key", json!(1)).is_err());
        assert!(assign(&mut json, "pricing.min_markup.deeper", json!(1)).is_err());
    }
}
