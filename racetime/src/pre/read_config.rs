use crate::core::config::RaceConfig;
use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;

/// read_config reads the JSON file and decodes the JSON string into the race
/// configuration struct. The configuration must pass the shape check.
pub fn read_config(filepath: &Path) -> anyhow::Result<RaceConfig> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open configuration file {}!",
            filepath.display()
        ))?;
    let config: RaceConfig = serde_json::from_reader(&fh).context(format!(
        "Failed to parse configuration file {}!",
        filepath.display()
    ))?;
    config.check().context(format!(
        "Invalid configuration in {}!",
        filepath.display()
    ))?;
    Ok(config)
}
