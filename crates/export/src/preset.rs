//! Export preset resolution.
//!
//! A preset is a configuration snapshot: which templates drive each
//! output, how long the handles are, and which review media to produce.
//! Resolving a preset turns the configured templates into the host's own
//! token syntax and writes the resulting profile document to the app's
//! cache area.

use std::path::{Path, PathBuf};

use cutsync_common::{CutsyncError, CutsyncResult, PresetConfig};
use cutsync_templates::{Template, TemplateSet};

use crate::profile::ProfileDoc;

/// Default frame-counter padding when the template carries no spec.
const DEFAULT_FRAME_PADDING: usize = 4;

/// Default version padding when the template carries no spec.
const DEFAULT_VERSION_PADDING: usize = 3;

/// A resolved export preset. Read-only for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct ExportPreset {
    pub name: String,
    pub render_template: String,
    pub batch_template: String,
    pub batch_render_template: String,
    pub quicktime_template: String,
    pub batch_quicktime_template: String,
    pub shot_clip_template: String,
    pub segment_clip_template: String,
    pub handle_length: i64,
    pub cut_type: String,
    pub upload_quicktime: bool,
    pub highres_quicktime: bool,
}

impl From<&PresetConfig> for ExportPreset {
    fn from(config: &PresetConfig) -> Self {
        Self {
            name: config.name.clone(),
            render_template: config.render_template.clone(),
            batch_template: config.batch_template.clone(),
            batch_render_template: config.batch_render_template.clone(),
            quicktime_template: config.quicktime_template.clone(),
            batch_quicktime_template: config.batch_quicktime_template.clone(),
            shot_clip_template: config.shot_clip_template.clone(),
            segment_clip_template: config.segment_clip_template.clone(),
            handle_length: config.handle_length,
            cut_type: config.cut_type.clone(),
            upload_quicktime: config.upload_quicktime,
            highres_quicktime: config.highres_quicktime,
        }
    }
}

/// Graphics/codec settings delegated to an external hook, spliced into
/// the generated profile.
pub trait CodecSettings {
    /// Inner markup of the profile's `<video>` section describing file
    /// type and codec.
    fn video_settings_xml(&self, preset: &ExportPreset) -> String;
}

/// Stock 10-bit DPX settings, used when no studio hook is configured.
pub struct DefaultCodecSettings;

impl CodecSettings for DefaultCodecSettings {
    fn video_settings_xml(&self, _preset: &ExportPreset) -> String {
        "<fileType>Dpx</fileType>\n<bitDepth>10</bitDepth>\n<compress>False</compress>"
            .to_string()
    }
}

/// Substitution table from template field names to host tokens.
fn host_token(field: &str) -> Option<String> {
    let token = match field {
        "Sequence" | "SequenceParent" => "<name>",
        "Shot" => "<shot name>",
        "Segment" => "<segment name>",
        "version" => "<version>",
        "frame" | "SEQ" => "<frame>",
        "width" => "<width>",
        "height" => "<height>",
        "YYYY" => "<YYYY>",
        "MM" => "<MM>",
        "DD" => "<DD>",
        "hh" => "<hh>",
        "mm" => "<mm>",
        "ss" => "<ss>",
        _ => return None,
    };
    Some(token.to_string())
}

/// Rewrite a template as a host name pattern: map every field through
/// the token table, strip the literal extension, and append the generic
/// extension token (which carries its own separator).
fn host_name_pattern(template: &Template) -> CutsyncResult<String> {
    let mut pattern = template
        .transcribe(host_token)
        .map_err(|e| CutsyncError::template(e.to_string()))?;

    if let Some(dot) = pattern.rfind('.') {
        if !pattern[dot..].contains('/') {
            pattern.truncate(dot);
        }
    }
    pattern.push_str("<ext>");
    Ok(pattern)
}

impl ExportPreset {
    /// Look up one of this preset's templates; an unregistered name is a
    /// configuration error.
    pub fn template<'a>(
        &self,
        templates: &'a TemplateSet,
        name: &str,
    ) -> CutsyncResult<&'a Template> {
        templates
            .get(name)
            .map_err(|e| CutsyncError::config(e.to_string()))
    }

    /// Frame-counter padding, taken from the render template's frame
    /// field format spec.
    pub fn frame_padding(&self, templates: &TemplateSet) -> CutsyncResult<usize> {
        let render = self.template(templates, &self.render_template)?;
        Ok(render
            .field_padding("frame")
            .or_else(|| render.field_padding("SEQ"))
            .unwrap_or(DEFAULT_FRAME_PADDING))
    }

    /// Version padding, taken from the render template's version field.
    pub fn version_padding(&self, templates: &TemplateSet) -> CutsyncResult<usize> {
        let render = self.template(templates, &self.render_template)?;
        Ok(render
            .field_padding("version")
            .unwrap_or(DEFAULT_VERSION_PADDING))
    }

    /// Produce the host export-profile document and write it to the
    /// per-app-instance cache location, overwriting any previous profile.
    /// Returns the written path.
    pub fn resolve_profile(
        &self,
        templates: &TemplateSet,
        codec: &dyn CodecSettings,
        comment: &str,
        cache_dir: &Path,
        app_instance: &str,
    ) -> CutsyncResult<PathBuf> {
        let render = self.template(templates, &self.render_template)?;
        let shot_clip = self.template(templates, &self.shot_clip_template)?;
        let segment_clip = self.template(templates, &self.segment_clip_template)?;

        let doc = ProfileDoc {
            comment: comment.to_string(),
            handle_length: self.handle_length,
            video_name_pattern: host_name_pattern(render)?,
            shot_clip_name_pattern: host_name_pattern(shot_clip)?,
            segment_clip_name_pattern: host_name_pattern(segment_clip)?,
            frame_padding: self.frame_padding(templates)?,
            version_padding: self.version_padding(templates)?,
        };
        let xml = doc.to_xml(&codec.video_settings_xml(self));

        let profile_dir = cache_dir.join(app_instance);
        std::fs::create_dir_all(&profile_dir)?;
        let profile_path = profile_dir.join("export_profile.xml");
        std::fs::write(&profile_path, xml)?;

        tracing::debug!(path = %profile_path.display(), preset = %self.name, "wrote export profile");
        Ok(profile_path)
    }
}

/// Identify which preset produced a rendered path by validating it
/// against each preset's batch-render template, in configuration order.
/// Used when no in-memory preset exists (batch / Flare mode). Returns
/// the first match, or `None` (never an error) when nothing matches.
pub fn find_preset_for_path<'a>(
    path: &str,
    presets: &'a [ExportPreset],
    templates: &TemplateSet,
) -> Option<&'a ExportPreset> {
    for preset in presets {
        match templates.get(&preset.batch_render_template) {
            Ok(template) if template.validate(path) => return Some(preset),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(preset = %preset.name, "skipping preset with bad template: {e}");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(name: &str, batch_render: &str) -> ExportPreset {
        ExportPreset {
            name: name.to_string(),
            render_template: "render".to_string(),
            batch_template: "batch".to_string(),
            batch_render_template: batch_render.to_string(),
            quicktime_template: "qt".to_string(),
            batch_quicktime_template: "bqt".to_string(),
            shot_clip_template: "shot_clip".to_string(),
            segment_clip_template: "segment_clip".to_string(),
            handle_length: 10,
            cut_type: "Conform".to_string(),
            upload_quicktime: true,
            highres_quicktime: false,
        }
    }

    fn templates() -> TemplateSet {
        TemplateSet::from_pairs([
            (
                "render",
                "sequences/{Sequence}/{Shot}/{Segment}/v{version:03d}/{Segment}.{frame:04d}.dpx",
            ),
            ("batch", "sequences/{Sequence}/{Shot}/batch/{Shot}.v{version:03d}.batch"),
            ("batch_a", "batch/{Shot}/v{version:03d}/{Shot}.{frame:04d}.dpx"),
            ("batch_b", "batch/{Shot}/{Shot}.v{version:03d}.{frame:04d}.dpx"),
            ("qt", "review/{Shot}.v{version:03d}.mov"),
            ("bqt", "review/batch/{Shot}.v{version:03d}.mov"),
            ("shot_clip", "sequences/{Sequence}/{Shot}/{Shot}.clip"),
            ("segment_clip", "sequences/{Sequence}/{Shot}/{Segment}.clip"),
        ])
        .unwrap()
    }

    #[test]
    fn test_padding_from_template_specs() {
        let p = preset("A", "batch_a");
        let t = templates();
        assert_eq!(p.frame_padding(&t).unwrap(), 4);
        assert_eq!(p.version_padding(&t).unwrap(), 3);
    }

    #[test]
    fn test_padding_defaults_without_specs() {
        let mut t = templates();
        t.insert(
            "render",
            Template::parse("sequences/{Shot}/{Segment}.exr").unwrap(),
        );
        let p = preset("A", "batch_a");
        assert_eq!(p.frame_padding(&t).unwrap(), DEFAULT_FRAME_PADDING);
        assert_eq!(p.version_padding(&t).unwrap(), DEFAULT_VERSION_PADDING);
    }

    #[test]
    fn test_unknown_template_is_config_error() {
        let p = preset("A", "nope");
        let t = templates();
        let err = p.template(&t, "does_not_exist").unwrap_err();
        assert!(matches!(err, CutsyncError::Config { .. }));
    }

    #[test]
    fn test_host_name_pattern_tokens_and_extension() {
        let t = templates();
        let pattern = host_name_pattern(t.get("render").unwrap()).unwrap();
        assert_eq!(
            pattern,
            "sequences/<name>/<shot name>/<segment name>/v<version>/<segment name>.<frame><ext>"
        );
    }

    #[test]
    fn test_resolve_profile_writes_and_overwrites() {
        let dir = std::env::temp_dir().join("cutsync_test_profile");
        let _ = std::fs::remove_dir_all(&dir);

        let p = preset("A", "batch_a");
        let t = templates();
        let path = p
            .resolve_profile(&t, &DefaultCodecSettings, "first", &dir, "tk-flame-export")
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("first"));

        let path2 = p
            .resolve_profile(&t, &DefaultCodecSettings, "second", &dir, "tk-flame-export")
            .unwrap();
        assert_eq!(path, path2);
        assert!(std::fs::read_to_string(&path).unwrap().contains("second"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_find_preset_for_path_first_configured_wins() {
        let t = templates();
        let presets = vec![preset("A", "batch_a"), preset("B", "batch_a")];
        let found = find_preset_for_path("batch/010/v004/010.1001.dpx", &presets, &t);
        assert_eq!(found.unwrap().name, "A");
    }

    #[test]
    fn test_find_preset_for_path_selects_matching_template() {
        let t = templates();
        let presets = vec![preset("A", "batch_a"), preset("B", "batch_b")];
        let found = find_preset_for_path("batch/010/010.v004.1001.dpx", &presets, &t);
        assert_eq!(found.unwrap().name, "B");
    }

    #[test]
    fn test_find_preset_for_path_none_when_unmatched() {
        let t = templates();
        let presets = vec![preset("A", "batch_a"), preset("B", "batch_b")];
        assert!(find_preset_for_path("/elsewhere/010.dpx", &presets, &t).is_none());
    }
}
