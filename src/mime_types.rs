use data_url::mime::Mime;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

/// Used when nothing better is known about binary content
pub(crate) const OCTET_STREAM: (&str, &str) = ("application", "octet-stream");

pub(crate) const EXTENSIONS: &[(&str, (&str, &str))] = &[
    ("apng", ("image", "apng")),
    ("avif", ("image", "avif")),
    ("bmp", ("image", "bmp")),
    ("css", ("text", "css")),
    ("csv", ("text", "csv")),
    ("eot", ("application", "vnd.ms-fontobject")),
    ("gif", ("image", "gif")),
    ("htm", ("text", "html")),
    ("html", ("text", "html")),
    ("ico", ("image", "vnd.microsoft.icon")),
    ("jpeg", ("image", "jpeg")),
    ("jpg", ("image", "jpeg")),
    ("js", ("text", "javascript")),
    ("json", ("application", "json")),
    ("md", ("text", "markdown")),
    ("mjs", ("text", "javascript")),
    ("mp3", ("audio", "mpeg")),
    ("mp4", ("video", "mp4")),
    ("oga", ("audio", "ogg")),
    ("ogg", ("audio", "ogg")),
    ("ogv", ("video", "ogg")),
    ("otf", ("font", "otf")),
    ("pdf", ("application", "pdf")),
    ("png", ("image", "png")),
    ("svg", ("image", "svg+xml")),
    ("svgz", ("image", "svg+xml")), // gzipped, same type
    ("tif", ("image", "tiff")),
    ("tiff", ("image", "tiff")),
    ("ttf", ("font", "ttf")),
    ("txt", ("text", "plain")),
    ("wasm", ("application", "wasm")),
    ("wav", ("audio", "wav")),
    ("weba", ("audio", "webm")),
    ("webm", ("video", "webm")),
    ("webp", ("image", "webp")),
    ("woff", ("font", "woff")),
    ("woff2", ("font", "woff2")),
    ("xml", ("application", "xml")),
];

static BY_EXTENSION: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    let by_extension: HashMap<_, _> = EXTENSIONS.iter().copied().collect();
    assert_eq!(by_extension.len(), EXTENSIONS.len());
    by_extension
});

pub(crate) fn mime(type_: &str, subtype: &str) -> Mime {
    Mime {
        type_: type_.into(),
        subtype: subtype.into(),
        parameters: Vec::new(),
    }
}

/// Looks only at the extension, case-insensitively. The file content is never sniffed.
pub(crate) fn from_path(path: &Path) -> Option<Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    BY_EXTENSION.get(ext.as_str()).map(|&(type_, subtype)| mime(type_, subtype))
}

pub(crate) fn from_path_or_octet_stream(path: &Path) -> Mime {
    from_path(path).unwrap_or_else(|| mime(OCTET_STREAM.0, OCTET_STREAM.1))
}

#[test]
fn lookup() {
    let png = from_path(Path::new("/srv/static/logo.PNG")).unwrap();
    assert_eq!(png.to_string(), "image/png");
    assert_eq!(from_path(Path::new("icon.svg")).unwrap().to_string(), "image/svg+xml");
    assert!(from_path(Path::new("README")).is_none());
    assert!(from_path(Path::new("archive.tar.zst")).is_none());
    assert_eq!(from_path_or_octet_stream(Path::new("blob.bin")).to_string(), "application/octet-stream");
}
