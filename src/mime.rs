// MIME resolution — extension lookup table and BOM handling for text-like payloads.

use bytes::BytesMut;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{DEFAULT_MIME_TYPE, UTF8_BOM};
use crate::host::traits::Blob;

/// `type/subtype` shape for a caller-supplied MIME string (parameters stripped
/// before matching).
static MIME_TYPE_REGEXP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\-]+/[a-zA-Z0-9.\-+]+$").expect("valid regexp"));

/// `text/*` and XML variants declaring a UTF-8 charset get a BOM prepended.
static BOM_ELIGIBLE_REGEXP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:text/\S*|application/xml|\S*/\S*\+xml)\s*;.*charset\s*=\s*utf-8")
        .expect("valid regexp")
});

/// Extension to MIME type mapping, ordered by key for binary search.
static MIME_TYPES: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("bmp", "image/bmp"),
    ("conf", "text/plain"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("dmg", "application/x-apple-diskimage"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("gif", "image/gif"),
    ("gz", "application/x-gzip"),
    ("html", "text/html"),
    ("jar", "application/java-archive"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("log", "text/plain"),
    ("map", "application/json"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mp3"),
    ("mp4", "video/mp4"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("pps", "application/vnd.ms-powerpoint"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("ps", "application/postscript"),
    ("psd", "image/vnd.adobe.photoshop"),
    ("qt", "video/quicktime"),
    ("rar", "application/x-rar-compressed"),
    ("rtf", "text/rtf"),
    ("svg", "image/svg+xml"),
    ("text", "text/plain"),
    ("tiff", "image/tiff"),
    ("torrent", "application/x-bittorrent"),
    ("txt", "text/plain"),
    ("war", "application/java-archive"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("zip", "application/zip"),
];

/// Look up the MIME type mapped to a (lower-cased) file extension.
pub fn lookup(extension: &str) -> Option<&'static str> {
    MIME_TYPES
        .binary_search_by_key(&extension, |&(ext, _)| ext)
        .ok()
        .map(|i| MIME_TYPES[i].1)
}

/// Resolve the MIME type for a save request.
///
/// A supplied string that already has a `type/subtype` shape is used verbatim
/// (lower-cased); otherwise it is tried as a table key. With no string at all
/// the filename's extension is looked up instead. Any miss falls back to
/// [`DEFAULT_MIME_TYPE`].
pub fn resolve(requested: Option<&str>, filename: &str) -> String {
    let Some(requested) = requested.filter(|s| !s.is_empty()) else {
        let start = filename.rfind('.').map(|i| i + 1).unwrap_or(0);
        let extension = filename[start..].to_lowercase();
        return lookup(&extension).unwrap_or(DEFAULT_MIME_TYPE).to_string();
    };

    let lowered = requested.to_lowercase();
    let base = lowered.split(';').next().unwrap_or_default();
    if MIME_TYPE_REGEXP.is_match(base) {
        return lowered;
    }

    lookup(&lowered)
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Whether a blob of this MIME type should get a byte-order mark.
pub fn bom_eligible(mime_type: &str) -> bool {
    BOM_ELIGIBLE_REGEXP.is_match(mime_type)
}

/// Prepend the UTF-8 BOM when the blob's MIME type calls for one.
pub fn with_bom(blob: Blob) -> Blob {
    if !bom_eligible(&blob.mime_type) {
        return blob;
    }

    let mut data = BytesMut::with_capacity(UTF8_BOM.len() + blob.data.len());
    data.extend_from_slice(&UTF8_BOM);
    data.extend_from_slice(&blob.data);
    Blob {
        data: data.freeze(),
        mime_type: blob.mime_type,
    }
}
