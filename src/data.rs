use crate::fetch;
use crate::mime_types;
use crate::DataUriError;
use data_url::mime::Mime;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use url::Url;

/// How the payload is written after the comma
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Percent-encoded, for text that should stay readable in the URI
    Text,
    /// `;base64`, for everything else
    Binary,
}

/// A payload ready to be dumped as a `data:` URI.
///
/// It can't be modified after construction. Every conversion builds a new one.
#[derive(Debug)]
pub struct Data {
    content: Vec<u8>,
    mime: Mime,
    parameters: Vec<(String, String)>,
    strict: bool,
    encoding: Encoding,
}

impl Data {
    /// Payload from raw content.
    ///
    /// Without an explicit `mime`, text defaults to `text/plain` with a `charset` matching the content,
    /// and binary content to `application/octet-stream`.
    ///
    /// `parameters` are extra RFC 2397 attributes, written in the given order.
    /// Names must be non-empty and may only use ASCII letters, digits, `-`, `_` and `.`.
    /// `length` and `base64` are reserved.
    pub fn new(content: impl Into<Vec<u8>>, encoding: Encoding, mime: Option<&str>, parameters: Vec<(String, String)>, strict: bool) -> Result<Self, DataUriError> {
        let content = content.into();
        let mime = match mime {
            Some(mime) => mime.trim().parse::<Mime>().map_err(|_| DataUriError::InvalidMime(mime.to_owned()))?,
            None => default_mime(&content, encoding),
        };
        if let Some((name, _)) = parameters.iter().find(|(name, _)| !is_valid_parameter_name(name)) {
            return Err(DataUriError::InvalidParameter(name.clone()));
        }
        Ok(Self { content, mime, parameters, strict, encoding })
    }

    /// Reads the whole file. The media type comes from the file extension.
    pub fn from_file(path: impl AsRef<Path>, strict: bool) -> Result<Self, DataUriError> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|err| DataUriError::Io(path.to_path_buf(), err))?;
        Ok(Self {
            content,
            mime: mime_types::from_path_or_octet_stream(path),
            parameters: Vec::new(),
            strict,
            encoding: Encoding::Binary,
        })
    }

    /// Fetches `http`/`https` URLs with the given client. `file:` URLs are read from disk.
    ///
    /// The media type comes from the `Content-Type` response header, or the extension of the URL path.
    pub fn from_url(url: &Url, strict: bool, client: &Client) -> Result<Self, DataUriError> {
        match url.scheme() {
            "file" => {
                let path = url.to_file_path().map_err(|()| DataUriError::NotLocalFile(url.to_string()))?;
                Self::from_file(path, strict)
            },
            "http" | "https" => {
                let fetched = fetch::get(client, url)?;
                let mime = fetched.content_type.as_deref()
                    .and_then(|content_type| content_type.trim().parse::<Mime>().ok())
                    .unwrap_or_else(|| mime_types::from_path_or_octet_stream(Path::new(url.path())));
                Ok(Self {
                    content: fetched.bytes,
                    mime,
                    parameters: Vec::new(),
                    strict,
                    encoding: Encoding::Binary,
                })
            },
            other => Err(DataUriError::UnsupportedScheme(other.to_owned())),
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// Strict payloads carry a `length` attribute
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn default_mime(content: &[u8], encoding: Encoding) -> Mime {
    match encoding {
        Encoding::Text => {
            let charset = if content.is_ascii() { "US-ASCII" } else { "UTF-8" };
            let mut mime = mime_types::mime("text", "plain");
            mime.parameters.push(("charset".into(), charset.into()));
            mime
        },
        Encoding::Binary => mime_types::mime(mime_types::OCTET_STREAM.0, mime_types::OCTET_STREAM.1),
    }
}

/// Attributes the encoder writes itself
const RESERVED_PARAMETERS: [&str; 2] = ["length", "base64"];

fn is_valid_parameter_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.'))
        && !RESERVED_PARAMETERS.iter().any(|reserved| name.eq_ignore_ascii_case(reserved))
}

#[test]
fn default_media_types() {
    let ascii = Data::new("hello", Encoding::Text, None, vec![], true).unwrap();
    assert_eq!(ascii.mime().to_string(), "text/plain;charset=US-ASCII");
    let unicode = Data::new("zażółć", Encoding::Text, None, vec![], true).unwrap();
    assert_eq!(unicode.mime().to_string(), "text/plain;charset=UTF-8");
    let binary = Data::new(vec![0u8, 159, 146, 150], Encoding::Binary, None, vec![], false).unwrap();
    assert_eq!(binary.mime().to_string(), "application/octet-stream");
    assert_eq!(binary.len(), 4);
}

#[test]
fn explicit_media_type() {
    let data = Data::new("<b>hi</b>", Encoding::Text, Some(" Text/HTML;Charset=utf-8 "), vec![], true).unwrap();
    assert_eq!(data.mime().type_, "text");
    assert_eq!(data.mime().subtype, "html");
    assert_eq!(data.mime().parameters, vec![("charset".to_string(), "utf-8".to_string())]);

    assert!(matches!(
        Data::new("x", Encoding::Text, Some("not a media type"), vec![], true),
        Err(DataUriError::InvalidMime(m)) if m == "not a media type"
    ));
}

#[test]
fn parameter_names() {
    let ok = Data::new("x", Encoding::Text, None, vec![("filename".into(), "a b.txt".into()), ("x-id".into(), "1".into())], true).unwrap();
    assert_eq!(ok.parameters().len(), 2);
    assert_eq!(ok.parameters()[0].0, "filename");

    for bad in ["", "a=b", "semi;colon", "spa ce", "length", "Base64", "LENGTH"] {
        assert!(matches!(
            Data::new("x", Encoding::Text, None, vec![(bad.into(), "v".into())], true),
            Err(DataUriError::InvalidParameter(name)) if name == bad
        ));
    }
}

#[test]
fn unreadable_file() {
    let err = Data::from_file("/nonexistent/dir/file.png", true).unwrap_err();
    assert!(matches!(err, DataUriError::Io(..)));
    assert!(err.to_string().contains("/nonexistent/dir/file.png"));
}

#[test]
fn unsupported_scheme() {
    let client = Client::new();
    let url = Url::parse("ftp://example.com/logo.png").unwrap();
    assert!(matches!(Data::from_url(&url, true, &client), Err(DataUriError::UnsupportedScheme(s)) if s == "ftp"));
}

#[cfg(unix)]
#[test]
fn remote_file_url() {
    let client = Client::new();
    let url = Url::parse("file://server/share/logo.png").unwrap();
    let err = Data::from_url(&url, true, &client).unwrap_err();
    assert!(matches!(&err, DataUriError::NotLocalFile(u) if u == "file://server/share/logo.png"));
    assert_eq!(err.to_string(), "Not a local file URL: file://server/share/logo.png");
}
