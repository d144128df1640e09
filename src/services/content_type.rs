//! Extension-based MIME lookup for media referenced by URL.

pub const OCTET_STREAM: &str = "application/octet-stream";

const MIME_TABLE: [(&str, &str); 12] = [
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("txt", "text/plain"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

/// Map a bare extension (no leading dot, any case) to a MIME type.
pub fn mime_for_extension(ext: &str) -> &'static str {
    let ext = ext.to_ascii_lowercase();
    MIME_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// Infer a MIME type from a filename's final extension.
pub fn mime_for_filename(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => mime_for_extension(ext),
        None => OCTET_STREAM,
    }
}

/// Text after the final `/` of a URL, or the whole string if it has none.
pub fn last_path_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(mime_for_filename("s3-101.mp4"), "video/mp4");
        assert_eq!(
            mime_for_filename("deck.PPTX"),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
        assert_eq!(mime_for_filename("photo.JPEG"), "image/jpeg");
        assert_eq!(mime_for_filename("photo.jpg"), "image/jpeg");
        assert_eq!(mime_for_filename("notes.txt"), "text/plain");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(mime_for_filename("file.unknownext"), OCTET_STREAM);
        assert_eq!(mime_for_filename("README"), OCTET_STREAM);
        assert_eq!(mime_for_filename("archive."), OCTET_STREAM);
        assert_eq!(mime_for_filename(""), OCTET_STREAM);
    }

    #[test]
    fn only_last_extension_counts() {
        assert_eq!(mime_for_filename("backup.pdf.gz"), OCTET_STREAM);
        assert_eq!(mime_for_filename("v1.2.webm"), "video/webm");
    }

    #[test]
    fn segment_is_text_after_final_slash() {
        assert_eq!(
            last_path_segment("https://cdn.example.com/vids/s3-101.mp4"),
            "s3-101.mp4"
        );
        assert_eq!(last_path_segment("https://x.test/dir/"), "");
        assert_eq!(last_path_segment("plain.pdf"), "plain.pdf");
    }
}
