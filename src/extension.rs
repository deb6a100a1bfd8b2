//! Mapping between raw asset extensions and their packed counterparts.

use std::path::Path;

/// Extensions whose files are line-oriented text and go through path rewriting.
pub const TEXTUAL_EXTENSIONS: &[&str] = &[
    ".txt", ".cfg", ".anm", ".anm2", ".xml", ".ini", ".frag", ".vert", ".sdrf", ".sdrv", ".fnt",
];

/// Returns the packed extension for a raw one (dot included).
///
/// Unknown extensions, and the empty extension, are returned unchanged.
pub fn packed_extension(raw: &str) -> &str {
    match raw {
        ".ogg" | ".wav" => ".snd",
        ".anm" | ".anm2" => ".anm",
        ".png" => ".img",
        ".fnt" | ".ttf" => ".fnt",
        ".ico" => ".icn",
        ".frag" => ".sdrf",
        ".vert" => ".sdrv",
        ".xml" => ".cfg",
        other => other,
    }
}

/// Returns `.ext` for a path, or `None` if it has no extension.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// Returns `true` if the file is treated as a textual asset.
pub fn is_textual(path: &Path) -> bool {
    dotted_extension(path).is_some_and(|ext| TEXTUAL_EXTENSIONS.contains(&ext.as_str()))
}

/// Renames `name.ext` to `name` + packed extension.
pub fn packed_file_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) => {
            let (stem, ext) = file_name.split_at(dot);
            format!("{stem}{}", packed_extension(ext))
        }
        None => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!(packed_extension(".png"), ".img");
        assert_eq!(packed_extension(".xml"), ".cfg");
        assert_eq!(packed_extension(".ogg"), ".snd");
        assert_eq!(packed_extension(".wav"), ".snd");
        assert_eq!(packed_extension(".anm2"), ".anm");
        assert_eq!(packed_extension(".ttf"), ".fnt");
        assert_eq!(packed_extension(".ico"), ".icn");
        assert_eq!(packed_extension(".frag"), ".sdrf");
        assert_eq!(packed_extension(".vert"), ".sdrv");
    }

    #[test]
    fn unknown_extensions_pass_through() {
        assert_eq!(packed_extension(".unknown"), ".unknown");
        assert_eq!(packed_extension(""), "");
        assert_eq!(packed_extension(".PNG"), ".PNG");
    }

    #[test]
    fn renames_files() {
        assert_eq!(packed_file_name("sprite.png"), "sprite.img");
        assert_eq!(packed_file_name("level.1.xml"), "level.1.cfg");
        assert_eq!(packed_file_name("README"), "README");
        assert_eq!(packed_file_name("notes.txt"), "notes.txt");
    }

    #[test]
    fn classifies_textual_files() {
        assert!(is_textual(Path::new("a/b/config.xml")));
        assert!(is_textual(Path::new("shader.frag")));
        assert!(is_textual(Path::new("packed.sdrv")));
        assert!(!is_textual(Path::new("sprite.png")));
        assert!(!is_textual(Path::new("noext")));
    }
}
