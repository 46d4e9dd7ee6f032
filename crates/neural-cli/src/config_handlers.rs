//! `neural config` subcommands.
//!
//! `get` reads the merged configuration (file, then `NEURAL_*` environment),
//! so it shows what `rewrite` would actually use. `set` edits the file on
//! disk and only accepts keys that [`NeuralConfig`] knows about.

use std::path::{Path, PathBuf};

use neural_core::{Error, Result};
use toml::{Table, Value};

use crate::cli::ConfigAction;
use crate::config::NeuralConfig;

// ============================================================================
// Command dispatch
// ============================================================================

/// Handle a config subcommand.
///
/// Takes the raw `--config` path since `path` and `init` must work before
/// any file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => show_path(config_path),
        ConfigAction::Get { key } => {
            let config = NeuralConfig::load(config_path)?;
            println!("{}", display_value(&lookup(&config, &key)?));
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut file = ConfigFile::open(config_path)?;
            file.set(&key, &value)?;
            file.save()?;
            println!("{key} = {value} ({})", file.path.display());
            Ok(())
        }
        ConfigAction::Init { file, force } => {
            let path = init_file(file.as_deref(), force)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        ConfigAction::Export { docker_env } => {
            let config = NeuralConfig::load(config_path)?;
            for (key, value) in config.to_env_vars()? {
                if docker_env {
                    println!("--env {key}={value}");
                } else {
                    println!("{key}={value}");
                }
            }
            Ok(())
        }
    }
}

fn show_path(config_path: Option<&str>) -> Result<()> {
    let path = NeuralConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("No config directory on this platform"))?;
    println!("{}", path.display());
    if !path.exists() {
        log::info!("{} does not exist yet; `neural config init` creates it", path.display());
    }
    Ok(())
}

fn init_file(file: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = file
        .map(PathBuf::from)
        .or_else(NeuralConfig::default_config_path)
        .ok_or_else(|| Error::config("No config directory on this platform"))?;

    if path.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists (pass --force to replace it)",
            path.display()
        )));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(e, dir))?;
    }

    let contents = NeuralConfig::default().to_toml_string()?;
    std::fs::write(&path, contents).map_err(|e| Error::io_with_path(e, &path))?;
    Ok(path)
}

// ============================================================================
// Key lookup
// ============================================================================

/// Value of a dotted key in the effective configuration.
fn lookup(config: &NeuralConfig, key: &str) -> Result<Value> {
    let table = as_table(config)?;
    let mut parts = key.split('.');
    let first = parts.next().and_then(|part| table.get(part));
    parts
        .try_fold(first, |node, part| {
            node.and_then(Value::as_table).map(|t| t.get(part))
        })
        .flatten()
        .cloned()
        .ok_or_else(|| Error::config(format!("No configuration value at '{key}'")))
}

/// Every settable leaf key, e.g. `inference.retry.max_attempts`.
fn settable_keys() -> Result<Vec<String>> {
    let mut sample = NeuralConfig::default();
    sample.inference.auth_header = Some(String::new());
    sample.rewrite.tensor_position = Some(0);

    let mut keys = Vec::new();
    collect_leaf_keys(&as_table(&sample)?, "", &mut keys);
    Ok(keys)
}

fn collect_leaf_keys(table: &Table, prefix: &str, out: &mut Vec<String>) {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            Value::Table(inner) => collect_leaf_keys(inner, &key, out),
            _ => out.push(key),
        }
    }
}

fn as_table(config: &NeuralConfig) -> Result<Table> {
    toml::from_str(&config.to_toml_string()?).map_err(|e| Error::serialization(e.to_string()))
}

/// Interpret a command-line value as TOML, falling back to a plain string.
///
/// `4` is an integer, `true` a boolean, `[1, 2]` an array and
/// `http://host:9200` (not valid TOML) a string.
fn interpret(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Config file editing
// ============================================================================

/// A configuration file loaded for editing.
struct ConfigFile {
    path: PathBuf,
    doc: Table,
}

impl ConfigFile {
    fn open(config_path: Option<&str>) -> Result<Self> {
        let path = NeuralConfig::resolve_config_path(config_path)
            .ok_or_else(|| Error::config("No config directory on this platform"))?;
        if !path.exists() {
            return Err(Error::config(format!(
                "{} does not exist; run `neural config init` first",
                path.display()
            )));
        }
        let doc = read_table(&path)?;
        Ok(Self { path, doc })
    }

    /// Set `key` to `raw`, creating missing sections.
    fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        if !settable_keys()?.iter().any(|known| known == key) {
            return Err(Error::config(format!("Unknown configuration key '{key}'")));
        }

        let (sections, leaf) = key
            .rsplit_once('.')
            .ok_or_else(|| Error::config(format!("Key '{key}' must name a section")))?;
        let mut table = &mut self.doc;
        for section in sections.split('.') {
            table = table
                .entry(section)
                .or_insert(Value::Table(Table::new()))
                .as_table_mut()
                .ok_or_else(|| Error::config(format!("'{section}' is not a section")))?;
        }
        table.insert(leaf.to_string(), interpret(raw));
        Ok(())
    }

    /// Write the document back, refusing anything that would not load.
    fn save(&self) -> Result<()> {
        let contents =
            toml::to_string_pretty(&self.doc).map_err(|e| Error::serialization(e.to_string()))?;
        let parsed: NeuralConfig = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("Rejected edit: {e}")))?;
        parsed.validate()?;
        std::fs::write(&self.path, contents).map_err(|e| Error::io_with_path(e, &self.path))
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    toml::from_str(&text).map_err(|e| Error::config(format!("{}: {e}", path.display())))
}

// ============================================================================
// Tests
// ============================================================================
