//! Resolve a preset and print the export profile it generates.

use cutsync_common::AppConfig;
use cutsync_export::preset::{DefaultCodecSettings, ExportPreset};
use cutsync_templates::TemplateSet;

pub fn run(config: AppConfig, name: String) -> anyhow::Result<()> {
    let templates = TemplateSet::from_pairs(
        config.templates.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )
    .map_err(|e| anyhow::anyhow!("bad template in configuration: {e}"))?;

    let preset = config
        .presets
        .iter()
        .find(|p| p.name == name)
        .map(ExportPreset::from)
        .ok_or_else(|| {
            let known: Vec<&str> = config.presets.iter().map(|p| p.name.as_str()).collect();
            anyhow::anyhow!("no preset named '{name}' (configured: {})", known.join(", "))
        })?;

    let path = preset.resolve_profile(
        &templates,
        &DefaultCodecSettings,
        "generated by cutsync preset",
        &config.cache_dir,
        "cutsync-cli",
    )?;

    println!("{}", std::fs::read_to_string(&path)?);
    eprintln!("written to {}", path.display());
    Ok(())
}
