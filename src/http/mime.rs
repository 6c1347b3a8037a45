use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TYPES: &[(&str, &str)] = &[
    (".mp4", "video/mp4"),
    (".webm", "video/webm"),
    (".mkv", "video/x-matroska"),
    (".wmv", "video/x-ms-wmv"),
    (".flv", "video/x-flv"),
    (".jpeg", "image/jpeg"),
    (".jpg", "image/jpeg"),
    (".gif", "image/gif"),
    (".png", "image/png"),
    (".tiff", "image/tiff"),
    (".zip", "application/x-zip-compressed"),
    (".html", "text/html"),
    (".htm", "text/html"),
    (".xml", "text/xml"),
];

/// Content type for a served file, chosen by file-name suffix
/// (case-insensitive).
///
/// Matches on the whole file name rather than `Path::extension`, so a
/// dotfile such as `.png` still maps to `image/png`.
pub fn content_type(path: &Path) -> &'static str {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    let name = name.to_ascii_lowercase();

    TYPES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        let cases = [
            ("clip.mp4", "video/mp4"),
            ("clip.webm", "video/webm"),
            ("clip.mkv", "video/x-matroska"),
            ("clip.flv", "video/x-flv"),
            ("a.jpg", "image/jpeg"),
            ("a.jpeg", "image/jpeg"),
            ("a.gif", "image/gif"),
            ("a.png", "image/png"),
            ("a.tiff", "image/tiff"),
            ("bundle.zip", "application/x-zip-compressed"),
            ("index.html", "text/html"),
            ("index.htm", "text/html"),
            ("feed.xml", "text/xml"),
        ];

        for (name, expected) in cases {
            assert_eq!(content_type(Path::new(name)), expected, "{}", name);
        }
    }

    #[test]
    fn extension_case_is_ignored() {
        assert_eq!(content_type(Path::new("PHOTO.PNG")), "image/png");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(content_type(Path::new("notes.txt")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(Path::new("Makefile")), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn dotfile_named_like_an_extension() {
        assert_eq!(content_type(Path::new(".png")), "image/png");
        assert_eq!(content_type(Path::new("/srv/media/.MP4")), "video/mp4");
    }
}
