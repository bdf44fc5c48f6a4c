//! Validate the configuration: templates parse, presets reference
//! registered templates, the queue binary is reachable.

use cutsync_common::AppConfig;
use cutsync_templates::{Template, TemplateSet};

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Cutsync Configuration Check");
    println!("{}", "=".repeat(50));

    let mut errors = 0usize;

    let mut templates = TemplateSet::new();
    for (name, pattern) in &config.templates {
        match Template::parse(pattern) {
            Ok(template) => {
                println!("[OK] template {name}: {pattern}");
                templates.insert(name.clone(), template);
            }
            Err(e) => {
                println!("[ERR] template {name}: {e}");
                errors += 1;
            }
        }
    }

    for preset in &config.presets {
        let referenced = [
            ("render", &preset.render_template),
            ("batch", &preset.batch_template),
            ("batch_render", &preset.batch_render_template),
            ("quicktime", &preset.quicktime_template),
            ("batch_quicktime", &preset.batch_quicktime_template),
            ("shot_clip", &preset.shot_clip_template),
            ("segment_clip", &preset.segment_clip_template),
        ];
        let mut missing = Vec::new();
        for (role, name) in referenced {
            if !templates.contains(name) {
                missing.push(format!("{role} -> '{name}'"));
            }
        }
        if missing.is_empty() {
            println!("[OK] preset {}", preset.name);
        } else {
            println!("[ERR] preset {}: unknown templates: {}", preset.name, missing.join(", "));
            errors += missing.len();
        }
        if preset.handle_length < 0 {
            println!("[ERR] preset {}: negative handle length", preset.name);
            errors += 1;
        }
    }

    let binary = &config.backburner.binary;
    if binary.is_absolute() && !binary.exists() {
        println!("[WARN] queue binary not found at {}", binary.display());
    } else {
        println!("[OK] queue binary: {}", binary.display());
    }

    println!();
    if errors == 0 {
        println!("Configuration is valid.");
        Ok(())
    } else {
        anyhow::bail!("{errors} configuration issue(s) found")
    }
}
