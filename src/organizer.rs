//! Groups raw `Group:Tag` entries into titled, ordered display groups.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::labels::{LabelLookup, KEYS_SECTION};
use crate::tags;
use crate::value::{MetaValue, RawMetadata};

/// Bucket for keys without a group or with a group not in [`GROUPS`]
pub const FALLBACK_GROUP: &str = "Information";

/// Label section consulted for group titles
pub const GROUPS_SECTION: &str = "GROUPS";

/// Display values longer than this many characters are shortened
pub const MAX_DISPLAY_CHARS: usize = 100;

const BASE64_PREFIX: &str = "base64:";

pub const ICON_INFO: &str = "dialog-information-symbolic";
pub const ICON_LOCATION: &str = "mark-location-symbolic";
pub const ICON_CALENDAR: &str = "x-office-calendar-symbolic";
pub const ICON_DIMENSIONS: &str = "view-fullscreen-symbolic";
pub const ICON_CAMERA: &str = "camera-photo-symbolic";

/// Known groups: (name, title, icon)
const GROUPS: &[(&str, &str, &str)] = &[
    ("EXIF", "Camera Information", ICON_CAMERA),
    ("GPS", "Location", ICON_LOCATION),
    ("File", "File Information", "text-x-generic-symbolic"),
    ("Composite", "Computed Values", "applications-science-symbolic"),
    ("XMP", "XMP Metadata", "text-x-script-symbolic"),
    ("IPTC", "IPTC Metadata", "document-properties-symbolic"),
    ("MakerNotes", "Maker Notes", ICON_CAMERA),
    ("ICC_Profile", "Color Profile", "applications-graphics-symbolic"),
    ("JFIF", "JFIF Header", "image-x-generic-symbolic"),
    ("QuickTime", "Video Information", "video-x-generic-symbolic"),
    ("PDF", "Document Information", "x-office-document-symbolic"),
    ("ID3", "Audio Tags", "audio-x-generic-symbolic"),
    ("ExifTool", "ExifTool", ICON_INFO),
    ("PNG", "PNG Chunks", "image-x-generic-symbolic"),
    ("RIFF", "RIFF Container", "video-x-generic-symbolic"),
    ("Photoshop", "Photoshop Data", "applications-graphics-symbolic"),
    ("FlashPix", "FlashPix Data", "image-x-generic-symbolic"),
    ("Matroska", "Matroska Container", "video-x-generic-symbolic"),
    ("Vorbis", "Vorbis Comments", "audio-x-generic-symbolic"),
    ("FLAC", "FLAC Stream", "audio-x-generic-symbolic"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEntry {
    /// Full `Group:Tag` key
    pub key: String,
    pub display_key: String,
    pub display_value: String,
    /// Rendered value before truncation
    pub full_value: String,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGroup {
    pub name: String,
    pub title: String,
    pub icon: &'static str,
    pub read_only: bool,
    pub collapsed: bool,
    pub entries: Vec<FieldEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganizedMetadata {
    pub groups: Vec<FieldGroup>,
}

impl OrganizedMetadata {
    pub fn group(&self, name: &str) -> Option<&FieldGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn entry(&self, key: &str) -> Option<&FieldEntry> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .find(|e| e.key == key)
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }
}

fn known_group(name: &str) -> Option<(&'static str, &'static str)> {
    GROUPS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, title, icon)| (*title, *icon))
}

/// Group bucket for a key
fn bucket_of(key: &str) -> &str {
    match tags::group_of(key) {
        Some(group) if known_group(group).is_some() => group,
        _ => FALLBACK_GROUP,
    }
}

/// Icon hint for a single field, from its key.
pub fn icon_for_key(key: &str) -> &'static str {
    if key.contains("GPS") || key.contains("Location") {
        ICON_LOCATION
    } else if key.contains("Date") || key.contains("Time") {
        ICON_CALENDAR
    } else if key.contains("Size") || key.contains("Width") || key.contains("Height") {
        ICON_DIMENSIONS
    } else if key.contains("Camera") || key.contains("Make") || key.contains("Model") {
        ICON_CAMERA
    } else {
        ICON_INFO
    }
}

/// Render a value for display: structured values as pretty JSON and
/// `base64:` payloads decoded to text. Returns `None` for nulls.
pub fn render_value(value: &MetaValue) -> Option<String> {
    match value {
        MetaValue::Null => None,
        MetaValue::String(s) => Some(decode_binary(s)),
        other => Some(other.to_text()),
    }
}

fn decode_binary(s: &str) -> String {
    match s.strip_prefix(BASE64_PREFIX) {
        Some(payload) => match STANDARD.decode(payload.trim()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => s.to_string(),
        },
        None => s.to_string(),
    }
}

/// Shorten to the first `MAX_DISPLAY_CHARS - 3` characters plus `...`.
pub fn truncate_display(s: &str) -> String {
    if s.chars().count() <= MAX_DISPLAY_CHARS {
        s.to_string()
    } else {
        let head: String = s.chars().take(MAX_DISPLAY_CHARS - 3).collect();
        format!("{}...", head)
    }
}

/// Build display groups from a raw snapshot (or a snapshot with pending
/// edits already laid over it).
pub fn organize(raw: &RawMetadata, labels: &dyn LabelLookup) -> OrganizedMetadata {
    // BTreeMap iteration keeps entries sorted by full key
    let mut buckets: BTreeMap<&str, Vec<FieldEntry>> = BTreeMap::new();

    for (key, value) in raw {
        let full_value = match render_value(value) {
            Some(v) => v,
            None => continue,
        };
        let short = tags::display_name(key);
        let entry = FieldEntry {
            key: key.clone(),
            display_key: labels.label_or(KEYS_SECTION, short, short),
            display_value: truncate_display(&full_value),
            full_value,
            icon: icon_for_key(key),
        };
        buckets.entry(bucket_of(key)).or_default().push(entry);
    }

    let fallback = buckets.remove(FALLBACK_GROUP);
    let mut groups: Vec<FieldGroup> = buckets
        .into_iter()
        .map(|(name, entries)| build_group(name, entries, labels))
        .collect();
    if let Some(entries) = fallback {
        groups.push(build_group(FALLBACK_GROUP, entries, labels));
    }

    OrganizedMetadata { groups }
}

fn build_group(name: &str, entries: Vec<FieldEntry>, labels: &dyn LabelLookup) -> FieldGroup {
    let (title, icon) = known_group(name).unwrap_or((name, ICON_INFO));
    let read_only = tags::is_read_only_group(name);
    FieldGroup {
        name: name.to_string(),
        title: labels.label_or(GROUPS_SECTION, name, title),
        icon,
        read_only,
        collapsed: read_only,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{LabelFile, NoLabels};

    fn sample() -> RawMetadata {
        let mut raw = RawMetadata::new();
        raw.insert("EXIF:Make".into(), "Nikon".into());
        raw.insert("GPS:Latitude".into(), 41.0.into());
        raw.insert("File:FileSize".into(), "2 MB".into());
        raw
    }

    // ==================== grouping tests ====================

    #[test]
    fn test_groups_by_prefix() {
        let organized = organize(&sample(), &NoLabels);
        let names: Vec<&str> = organized.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["EXIF", "File", "GPS"]);
        assert_eq!(organized.group("GPS").unwrap().entries[0].display_value, "41.0");
    }

    #[test]
    fn test_unknown_and_ungrouped_keys_go_last() {
        let mut raw = sample();
        raw.insert("SourceFile".into(), "/a.jpg".into());
        raw.insert("Weird:Thing".into(), "x".into());

        let organized = organize(&raw, &NoLabels);
        let last = organized.groups.last().unwrap();
        assert_eq!(last.name, FALLBACK_GROUP);
        let keys: Vec<&str> = last.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["SourceFile", "Weird:Thing"]);
        assert_eq!(last.icon, ICON_INFO);
    }

    #[test]
    fn test_entries_sorted_within_group() {
        let mut raw = RawMetadata::new();
        raw.insert("EXIF:Model".into(), "D750".into());
        raw.insert("EXIF:Artist".into(), "Jane".into());
        raw.insert("EXIF:Make".into(), "Nikon".into());

        let organized = organize(&raw, &NoLabels);
        let keys: Vec<&str> = organized.groups[0]
            .entries
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["EXIF:Artist", "EXIF:Make", "EXIF:Model"]);
    }

    #[test]
    fn test_read_only_groups_are_collapsed() {
        let mut raw = sample();
        raw.insert("Composite:ImageSize".into(), "640x480".into());
        let organized = organize(&raw, &NoLabels);

        for name in ["File", "Composite"] {
            let g = organized.group(name).unwrap();
            assert!(g.read_only && g.collapsed, "{} should be read-only", name);
        }
        let exif = organized.group("EXIF").unwrap();
        assert!(!exif.read_only && !exif.collapsed);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(organize(&RawMetadata::new(), &NoLabels).groups.is_empty());
    }

    // ==================== value rendering tests ====================

    #[test]
    fn test_nulls_are_omitted() {
        let mut raw = sample();
        raw.insert("EXIF:Artist".into(), MetaValue::Null);
        let organized = organize(&raw, &NoLabels);
        assert!(organized.entry("EXIF:Artist").is_none());
        assert_eq!(organized.entry_count(), 3);
    }

    #[test]
    fn test_long_values_truncated() {
        let mut raw = RawMetadata::new();
        raw.insert("EXIF:UserComment".into(), "é".repeat(150).into());
        let organized = organize(&raw, &NoLabels);
        let entry = organized.entry("EXIF:UserComment").unwrap();

        assert_eq!(entry.display_value.chars().count(), 100);
        assert!(entry.display_value.ends_with("..."));
        assert_eq!(entry.full_value.chars().count(), 150);
    }

    #[test]
    fn test_truncate_boundary() {
        let exact = "a".repeat(100);
        assert_eq!(truncate_display(&exact), exact);
        let over = "a".repeat(101);
        assert_eq!(truncate_display(&over), format!("{}...", "a".repeat(97)));
    }

    #[test]
    fn test_structured_values_render_as_json() {
        let mut raw = RawMetadata::new();
        let keywords: MetaValue = serde_json::from_str(r#"["Berg", "Straße"]"#).unwrap();
        raw.insert("IPTC:Keywords".into(), keywords);
        let organized = organize(&raw, &NoLabels);
        assert_eq!(
            organized.entry("IPTC:Keywords").unwrap().full_value,
            "[\n  \"Berg\",\n  \"Straße\"\n]"
        );
    }

    #[test]
    fn test_base64_values_decoded() {
        assert_eq!(
            render_value(&MetaValue::from("base64:aGVsbG8=")).as_deref(),
            Some("hello")
        );
        assert_eq!(
            render_value(&MetaValue::from("base64:!!!")).as_deref(),
            Some("base64:!!!")
        );
    }

    // ==================== label and icon tests ====================

    #[test]
    fn test_labels_applied_to_keys_and_groups() {
        let labels = LabelFile::parse(
            "[KEYS]\nMake = \"Camera maker\"\n\n[GROUPS]\nGPS = \"Where\"\n",
        )
        .unwrap();
        let organized = organize(&sample(), &labels);

        assert_eq!(organized.entry("EXIF:Make").unwrap().display_key, "Camera maker");
        assert_eq!(organized.entry("File:FileSize").unwrap().display_key, "FileSize");
        assert_eq!(organized.group("GPS").unwrap().title, "Where");
        assert_eq!(organized.group("EXIF").unwrap().title, "Camera Information");
    }

    #[test]
    fn test_icon_hints() {
        assert_eq!(icon_for_key("GPS:GPSLatitude"), ICON_LOCATION);
        assert_eq!(icon_for_key("EXIF:DateTimeOriginal"), ICON_CALENDAR);
        assert_eq!(icon_for_key("File:ImageWidth"), ICON_DIMENSIONS);
        assert_eq!(icon_for_key("EXIF:Model"), ICON_CAMERA);
        assert_eq!(icon_for_key("EXIF:Artist"), ICON_INFO);
    }

    #[test]
    fn test_same_input_same_output() {
        assert_eq!(organize(&sample(), &NoLabels), organize(&sample(), &NoLabels));
    }
}
