use std::path::Path;

use anyhow::bail;
use flagmon_core::{parse_targets, MonitorConfig};

pub fn init(canaries: &str, namespace: Option<&str>, path: &str, force: bool) -> anyhow::Result<()> {
    let names = parse_targets(canaries)?;
    let output = Path::new(path);
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let config = MonitorConfig::scaffold(&names.join(", "), namespace);
    std::fs::write(output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
