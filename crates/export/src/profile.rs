//! Generated export-profile document.
//!
//! The host consumes a declarative XML profile describing where and how
//! to export. The document is assembled from a typed builder and written
//! through a small element writer so every interpolated value is escaped;
//! only the codec block, delegated to the [`crate::preset::CodecSettings`]
//! hook, is spliced in as raw markup.

use std::fmt::Write as _;

/// Escape a value for use as XML element text.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal indenting element writer.
struct XmlWriter {
    buf: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            buf: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn open(&mut self, tag: &str) {
        let _ = writeln!(self.buf, "{}<{tag}>", "   ".repeat(self.depth));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        let _ = writeln!(self.buf, "{}</{tag}>", "   ".repeat(self.depth));
    }

    fn leaf(&mut self, tag: &str, value: &str) {
        let _ = writeln!(
            self.buf,
            "{}<{tag}>{}</{tag}>",
            "   ".repeat(self.depth),
            escape_xml(value)
        );
    }

    /// Splice pre-built markup, indented but not escaped.
    fn raw_block(&mut self, markup: &str) {
        for line in markup.lines() {
            let _ = writeln!(self.buf, "{}{}", "   ".repeat(self.depth), line.trim_end());
        }
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Typed description of the profile document.
#[derive(Debug, Clone)]
pub struct ProfileDoc {
    /// User comment baked into the profile.
    pub comment: String,

    /// Handle frames exported beyond cut bounds.
    pub handle_length: i64,

    /// Host-token pattern for rendered frames.
    pub video_name_pattern: String,

    /// Host-token pattern for the per-segment open clip.
    pub segment_clip_name_pattern: String,

    /// Host-token pattern for the per-shot open clip.
    pub shot_clip_name_pattern: String,

    /// Zero-padding of the frame counter.
    pub frame_padding: usize,

    /// Zero-padding of the version number.
    pub version_padding: usize,
}

impl ProfileDoc {
    /// Serialize the profile, splicing in the codec settings block.
    pub fn to_xml(&self, codec_block: &str) -> String {
        let mut w = XmlWriter::new();
        w.open("preset");
        w.leaf("type", "sequence");
        w.leaf("comment", &self.comment);

        w.open("sequence");
        w.leaf("fileType", "NONE");
        w.leaf("namePattern", &self.shot_clip_name_pattern);

        w.open("videoMedia");
        w.leaf("mediaFileType", "video");
        w.leaf("commit", "Original");
        w.leaf("flatten", "NoChange");
        w.leaf("exportHandles", "True");
        w.leaf("nbHandles", &self.handle_length.to_string());
        w.close("videoMedia");
        w.close("sequence");

        w.open("video");
        w.raw_block(codec_block);
        w.leaf("namePattern", &self.video_name_pattern);
        w.leaf("framePadding", &self.frame_padding.to_string());
        w.leaf("versionPadding", &self.version_padding.to_string());
        w.leaf("versionName", "v<version>");
        w.close("video");

        w.open("name");
        w.leaf("namePattern", &self.segment_clip_name_pattern);
        w.leaf("framePadding", &self.frame_padding.to_string());
        w.close("name");

        w.close("preset");
        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ProfileDoc {
        ProfileDoc {
            comment: "Client review & final".to_string(),
            handle_length: 10,
            video_name_pattern: "sequences/<name>/<shot name>/<segment name>.<frame>".to_string(),
            segment_clip_name_pattern: "sequences/<name>/<segment name>".to_string(),
            shot_clip_name_pattern: "sequences/<name>/<shot name>".to_string(),
            frame_padding: 4,
            version_padding: 3,
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_profile_escapes_interpolated_values() {
        let xml = doc().to_xml("<fileType>OpenEXR</fileType>");
        assert!(xml.contains("Client review &amp; final"));
        // The name patterns carry host tokens, escaped as text.
        assert!(xml.contains("&lt;shot name&gt;"));
    }

    #[test]
    fn test_codec_block_is_spliced_raw() {
        let xml = doc().to_xml("<fileType>OpenEXR</fileType>\n<codec>PIZ</codec>");
        assert!(xml.contains("<fileType>OpenEXR</fileType>"));
        assert!(xml.contains("<codec>PIZ</codec>"));
    }

    #[test]
    fn test_profile_carries_padding_and_handles() {
        let xml = doc().to_xml("");
        assert!(xml.contains("<framePadding>4</framePadding>"));
        assert!(xml.contains("<versionPadding>3</versionPadding>"));
        assert!(xml.contains("<nbHandles>10</nbHandles>"));
    }
}
