//! `Group:Tag` key handling.

use once_cell::sync::Lazy;
use regex::Regex;

/// Groups the tool computes or derives from the file system; never written.
const READ_ONLY_GROUPS: &[&str] = &["File", "Composite"];

/// Tags that may be staged on a file that does not carry them yet.
pub const ADDABLE_TAGS: &[&str] = &[
    "EXIF:Artist",
    "EXIF:Copyright",
    "EXIF:ImageDescription",
    "EXIF:Make",
    "EXIF:Model",
    "EXIF:Software",
    "EXIF:DateTimeOriginal",
    "EXIF:UserComment",
    "XMP:Title",
    "XMP:Description",
    "XMP:Creator",
    "XMP:Rights",
    "XMP:Subject",
    "XMP:Rating",
    "IPTC:Keywords",
    "IPTC:Caption-Abstract",
    "IPTC:By-line",
    "IPTC:CopyrightNotice",
    "IPTC:ObjectName",
];

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+:[A-Za-z0-9_-]+$").expect("key pattern is valid")
});

/// Whether `key` has the `Group:Tag` shape.
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Group part of a key, if the key has one.
pub fn group_of(key: &str) -> Option<&str> {
    key.split_once(':').map(|(group, _)| group)
}

/// Tag name the tool accepts on its command line: the part after the first
/// `:`, or the whole key when there is no group.
pub fn write_name(key: &str) -> &str {
    key.split_once(':').map(|(_, tag)| tag).unwrap_or(key)
}

/// Short display name: text after the last `:`, trimmed.
pub fn display_name(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key).trim()
}

pub fn is_read_only_group(group: &str) -> bool {
    READ_ONLY_GROUPS.contains(&group)
}

pub fn is_read_only_key(key: &str) -> bool {
    group_of(key).map(is_read_only_group).unwrap_or(false)
}

pub fn is_addable(key: &str) -> bool {
    ADDABLE_TAGS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape() {
        assert!(is_valid_key("EXIF:Make"));
        assert!(is_valid_key("IPTC:Caption-Abstract"));
        assert!(is_valid_key("ICC_Profile:ProfileDescription"));
        assert!(!is_valid_key("Make"));
        assert!(!is_valid_key("EXIF:"));
        assert!(!is_valid_key(":Make"));
        assert!(!is_valid_key("EXIF:Make=x"));
        assert!(!is_valid_key("EXIF:Make; rm -rf"));
    }

    #[test]
    fn test_split_helpers() {
        assert_eq!(group_of("EXIF:Make"), Some("EXIF"));
        assert_eq!(group_of("Make"), None);
        assert_eq!(write_name("EXIF:Make"), "Make");
        assert_eq!(write_name("Make"), "Make");
        assert_eq!(display_name("XMP:XMP-dc: Title "), "Title");
        assert_eq!(display_name("SourceFile"), "SourceFile");
    }

    #[test]
    fn test_read_only_groups() {
        assert!(is_read_only_key("File:FileSize"));
        assert!(is_read_only_key("Composite:ImageSize"));
        assert!(!is_read_only_key("EXIF:Make"));
        assert!(!is_read_only_key("SourceFile"));
    }
}
