//! Turns files, URLs, streams and plain strings into [RFC 2397](https://www.ietf.org/rfc/rfc2397.txt) `data:` URIs,
//! usually from inside a template.
//!
//! ```rust
//! use data_uri_filter::*;
//! let filter = DataUriFilter::new();
//! let uri = filter.convert(Source::from("hello"), &Options::default());
//! assert_eq!(uri.as_deref(), Some("data:text/plain;charset=US-ASCII;length=5,hello"));
//!
//! let mut env = minijinja::Environment::new();
//! template::add_to_environment(&mut env, DataUriFilter::new());
//! let out = env.render_str("<img src='{{ 'hi'|data_uri(false, 'text/html') }}'>", minijinja::context! {})?;
//! assert_eq!(out, "<img src='data:text/html,hi'>");
//! # Ok::<_, minijinja::Error>(())
//! ```

use once_cell::sync::OnceCell;
use quick_error::quick_error;
use reqwest::blocking::Client;
use std::borrow::Cow;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};
use url::Url;

quick_error! {
    /// Anything that can go wrong while building or encoding a payload.
    ///
    /// [`DataUriFilter::convert`] turns all of these into a warning.
    #[derive(Debug)]
    pub enum DataUriError {
        UnsupportedSource(shape: String) {
            display("Tried to convert an unsupported source format ({})", shape)
        }
        Io(path: PathBuf, err: io::Error) {
            display("Can't read {}: {}", path.display(), err)
            source(err)
        }
        Stream(err: io::Error) {
            display("Can't read stream: {}", err)
            source(err)
        }
        Client(err: reqwest::Error) {
            display("Can't create HTTP client: {}", err)
            source(err)
        }
        Http(url: String, err: reqwest::Error) {
            display("Can't fetch {}: {}", url, err)
            source(err)
        }
        HttpStatus(url: String, status: u16) {
            display("Can't fetch {}: HTTP status {}", url, status)
        }
        UnsupportedScheme(scheme: String) {
            display("Unsupported URL scheme: {}", scheme)
        }
        NotLocalFile(url: String) {
            display("Not a local file URL: {}", url)
        }
        InvalidMime(mime: String) {
            display("Invalid media type: {:?}", mime)
        }
        InvalidParameter(name: String) {
            display("Invalid parameter name: {:?}", name)
        }
        TooLong(length: usize, max: usize) {
            display("Too long data: {} bytes, the limit is {}", length, max)
        }
    }
}

/// Building blocks of the payload, if you want to skip the classification
pub mod data;
/// Serializes a [`data::Data`]
pub mod dumper;
mod fetch;
mod mime_types;
/// `minijinja` integration
pub mod template;

pub use crate::data::{Data, Encoding};

/// Longest literal RFC 2397 suggests. Pass it to [`DataUriFilter::set_max_length`] to enforce it.
pub const LITERAL_LIMIT: usize = 1024;

/// What to convert
pub enum Source<'a> {
    /// Read to the end and encoded as binary
    Stream(&'a mut dyn Read),
    /// A URL, a path to an existing file, or literal content, checked in that order
    Text(Cow<'a, str>),
    /// Anything else. The string describes what it was.
    Unsupported(&'a str),
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Source<'static> {
    fn from(text: String) -> Self {
        Source::Text(Cow::Owned(text))
    }
}

/// Arguments of the filter besides the source
#[derive(Debug, Clone)]
pub struct Options {
    /// Write a `length` attribute
    pub strict: bool,
    /// Media type of streams and literals. URLs and files bring their own.
    pub mime: Option<String>,
    /// Extra attributes for streams and literals, in order
    pub parameters: Vec<(String, String)>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strict: true,
            mime: None,
            parameters: Vec::new(),
        }
    }
}

/// The main entry point. Call [`DataUriFilter::new`], then [`DataUriFilter::convert`],
/// or register it in a template environment with [`template::add_to_environment`].
pub struct DataUriFilter {
    max_length: Option<usize>,
    allow_urls: bool,
    allow_files: bool,
    /// Built on first use
    client: OnceCell<Client>,
}

impl DataUriFilter {
    /// Create new filter instance, with URLs and files enabled and no length limit.
    pub fn new() -> Self {
        Self {
            max_length: None,
            allow_urls: true,
            allow_files: true,
            client: OnceCell::new(),
        }
    }

    /// Payloads longer than this many raw bytes fail with [`DataUriError::TooLong`].
    pub fn set_max_length(&mut self, max_length: Option<usize>) {
        self.max_length = max_length;
    }

    /// When disabled, URL-looking text is not fetched. It's tried as a path, then used literally.
    pub fn allow_urls(&mut self, allow: bool) {
        self.allow_urls = allow;
    }

    /// When disabled, text is never looked up on the filesystem.
    ///
    /// `file:` URLs are still read unless [`DataUriFilter::allow_urls`] is disabled too.
    pub fn allow_files(&mut self, allow: bool) {
        self.allow_files = allow;
    }

    /// Use this client for `http`/`https` sources instead of the default one
    pub fn set_http_client(&mut self, client: Client) {
        self.client = OnceCell::from(client);
    }

    /// Converts the source, or returns `None` after logging a warning.
    ///
    /// Only [`DataUriError`]s are absorbed here; panics are not caught.
    pub fn convert(&self, source: Source<'_>, options: &Options) -> Option<String> {
        match self.try_convert(source, options) {
            Ok(uri) => Some(uri),
            Err(DataUriError::UnsupportedSource(shape)) => {
                tracing::warn!(%shape, "Tried to convert an unsupported source format");
                None
            },
            Err(err) => {
                tracing::warn!("Error while building data URI: {}", err);
                None
            },
        }
    }

    /// Same as [`DataUriFilter::convert`], but returns the error instead of logging it
    pub fn try_convert(&self, source: Source<'_>, options: &Options) -> Result<String, DataUriError> {
        let data = match source {
            Source::Stream(reader) => self.data_from_stream(reader, options)?,
            Source::Text(text) => self.data_from_text(&text, options)?,
            Source::Unsupported(shape) => return Err(DataUriError::UnsupportedSource(shape.to_owned())),
        };
        if let Some(max) = self.max_length {
            if data.len() > max {
                return Err(DataUriError::TooLong(data.len(), max));
            }
        }
        Ok(dumper::dump(&data))
    }

    fn data_from_stream(&self, reader: &mut dyn Read, options: &Options) -> Result<Data, DataUriError> {
        // read_to_end keeps going through short reads until EOF
        let mut content = Vec::new();
        reader.read_to_end(&mut content).map_err(DataUriError::Stream)?;
        Data::new(content, Encoding::Binary, options.mime.as_deref(), options.parameters.clone(), options.strict)
    }

    fn data_from_text(&self, text: &str, options: &Options) -> Result<Data, DataUriError> {
        if self.allow_urls {
            if let Some(url) = absolute_url(text) {
                tracing::debug!(%url, "data URI from URL");
                return Data::from_url(&url, options.strict, self.client()?);
            }
        }
        if self.allow_files && path_exists(text) {
            tracing::debug!(path = text, "data URI from file");
            return Data::from_file(text, options.strict);
        }
        Data::new(text, Encoding::Text, options.mime.as_deref(), options.parameters.clone(), options.strict)
    }

    fn client(&self) -> Result<&Client, DataUriError> {
        self.client.get_or_try_init(fetch::default_client)
    }
}

impl Default for DataUriFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Schemes that are URLs even without a host
const HOSTLESS_SCHEMES: [&str; 3] = ["file", "mailto", "news"];

/// A URL needs a host, unless it's one of `HOSTLESS_SCHEMES`. `note: hi` or `data:,x` are text.
///
/// Hostless `mailto:`/`news:` URLs are still URLs, and fail later as an unsupported scheme.
fn absolute_url(text: &str) -> Option<Url> {
    // `Url::parse` strips leading/trailing whitespace and control chars, and would make a URL out of a sentence
    if text.is_empty() || text.contains(|c: char| c.is_whitespace() || c.is_control()) {
        return None;
    }
    let url = Url::parse(text).ok()?;
    if url.host().is_none() && !HOSTLESS_SCHEMES.contains(&url.scheme()) {
        return None;
    }
    Some(url)
}

fn path_exists(text: &str) -> bool {
    !text.is_empty() && !text.contains('\0') && Path::new(text).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_test::traced_test;

    /// Hands out at most 3 bytes per read, to exercise short reads
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.0.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "pipe went away"))
        }
    }

    fn warnings(lines: &[&str]) -> usize {
        lines.iter().filter(|line| line.contains("WARN")).count()
    }

    #[test]
    fn url_detection() {
        assert!(absolute_url("https://example.com/a.png").is_some());
        assert!(absolute_url("http://127.0.0.1:8080").is_some());
        assert!(absolute_url("file:///etc/hosts").is_some());
        assert!(absolute_url("mailto:someone@example.com").is_some());
        assert!(absolute_url("news:comp.lang.rust").is_some());
        assert!(absolute_url("  https://example.com/  ").is_none());
        assert!(absolute_url("https://example.com/\n").is_none());
        assert!(absolute_url("hello").is_none());
        assert!(absolute_url("data:text/plain,hi").is_none());
        assert!(absolute_url("note: buy milk").is_none());
        assert!(absolute_url("/etc/hosts").is_none());
        assert!(absolute_url("http://").is_none());
        assert!(absolute_url("see https://example.com").is_none());
        assert!(absolute_url("").is_none());
    }

    #[test]
    fn padded_url_is_literal() {
        let f = DataUriFilter::new();
        let options = Options { strict: false, ..Options::default() };
        assert_eq!(
            f.try_convert("  http://127.0.0.1:9/x.png  ".into(), &options).unwrap(),
            "data:text/plain;charset=US-ASCII,%20%20http%3A%2F%2F127.0.0.1%3A9%2Fx.png%20%20"
        );
    }

    #[test]
    #[traced_test]
    fn hostless_urls_are_not_literals() {
        let f = DataUriFilter::new();
        assert!(matches!(
            f.try_convert("mailto:someone@example.com".into(), &Options::default()),
            Err(DataUriError::UnsupportedScheme(scheme)) if scheme == "mailto"
        ));
        assert!(f.convert("news:comp.lang.rust".into(), &Options::default()).is_none());
        assert!(logs_contain("Unsupported URL scheme: news"));
    }

    #[test]
    #[traced_test]
    fn literal_content() {
        let f = DataUriFilter::new();
        let options = Options { strict: true, mime: Some("text/plain".into()), parameters: vec![] };
        assert_eq!(f.convert("hello".into(), &options).unwrap(), "data:text/plain;length=5,hello");
        let expected = dumper::dump(&Data::new("hello", Encoding::Text, Some("text/plain"), vec![], true).unwrap());
        assert_eq!(f.convert("hello".into(), &options).unwrap(), expected);
        logs_assert(|lines: &[&str]| match warnings(lines) {
            0 => Ok(()),
            n => Err(format!("{n} warnings")),
        });
    }

    #[test]
    fn missing_path_is_literal() {
        let f = DataUriFilter::new();
        let options = Options { strict: false, ..Options::default() };
        assert_eq!(
            f.convert("/nonexistent/path/xyz".into(), &options).unwrap(),
            "data:text/plain;charset=US-ASCII,%2Fnonexistent%2Fpath%2Fxyz"
        );
    }

    #[test]
    fn existing_path_is_read() {
        let mut file = tempfile::Builder::new().suffix(".svg").tempfile().unwrap();
        file.write_all(b"<svg/>").unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        let f = DataUriFilter::new();
        // mime and parameters only apply to literals
        let options = Options { strict: true, mime: Some("text/plain".into()), parameters: vec![("a".into(), "b".into())] };
        assert_eq!(f.convert(path.clone().into(), &options).unwrap(), "data:image/svg+xml;length=6;base64,PHN2Zy8+");

        let mut no_files = DataUriFilter::new();
        no_files.allow_files(false);
        let literal = no_files.convert(path.clone().into(), &options).unwrap();
        assert!(literal.starts_with("data:text/plain;a=b;length="), "{literal}");
    }

    #[test]
    fn file_url() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"from url").unwrap();
        let url = Url::from_file_path(file.path()).unwrap().to_string();

        let f = DataUriFilter::new();
        assert_eq!(f.convert(url.clone().into(), &Options::default()).unwrap(), "data:text/plain;length=8;base64,ZnJvbSB1cmw=");

        let mut no_urls = DataUriFilter::new();
        no_urls.allow_urls(false);
        let literal = no_urls.convert(url.into(), &Options { strict: false, ..Options::default() }).unwrap();
        assert!(literal.starts_with("data:text/plain;charset=US-ASCII,file%3A%2F%2F%2F"), "{literal}");
    }

    #[test]
    fn stream_is_binary_and_complete() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let f = DataUriFilter::new();
        let options = Options { strict: true, mime: Some("application/x-blob".into()), parameters: vec![("v".into(), "1".into())] };
        let uri = f.convert(Source::Stream(&mut Trickle(&payload)), &options).unwrap();
        let prefix = "data:application/x-blob;v=1;length=10000;base64,";
        assert!(uri.starts_with(prefix));
        assert_eq!(base64::decode(&uri[prefix.len()..]).unwrap(), payload);
    }

    #[test]
    fn text_stream_is_still_binary() {
        let f = DataUriFilter::new();
        let uri = f.convert(Source::Stream(&mut &b"hello"[..]), &Options::default()).unwrap();
        assert_eq!(uri, "data:application/octet-stream;length=5;base64,aGVsbG8=");
    }

    #[test]
    #[traced_test]
    fn unsupported_source() {
        let f = DataUriFilter::new();
        assert!(f.convert(Source::Unsupported("map"), &Options::default()).is_none());
        assert!(logs_contain("Tried to convert an unsupported source format"));
        logs_assert(|lines: &[&str]| match warnings(lines) {
            1 => Ok(()),
            n => Err(format!("expected one warning, got {n}")),
        });
    }

    #[test]
    #[traced_test]
    fn domain_errors_are_absorbed() {
        let f = DataUriFilter::new();
        let options = Options { mime: Some("nope".into()), ..Options::default() };
        assert!(f.convert("hello".into(), &options).is_none());
        assert!(logs_contain("Error while building data URI: Invalid media type: \"nope\""));
        logs_assert(|lines: &[&str]| match warnings(lines) {
            1 => Ok(()),
            n => Err(format!("expected one warning, got {n}")),
        });
    }

    #[test]
    #[traced_test]
    fn broken_stream() {
        let f = DataUriFilter::new();
        assert!(f.convert(Source::Stream(&mut Broken), &Options::default()).is_none());
        assert!(logs_contain("pipe went away"));
    }

    #[test]
    fn max_length() {
        let mut f = DataUriFilter::new();
        f.set_max_length(Some(LITERAL_LIMIT));
        let long = "x".repeat(LITERAL_LIMIT + 1);
        assert!(matches!(
            f.try_convert(long.as_str().into(), &Options::default()),
            Err(DataUriError::TooLong(1025, 1024))
        ));
        assert!(f.try_convert("x".repeat(LITERAL_LIMIT).into(), &Options::default()).is_ok());
    }

    #[test]
    fn unreachable_url() {
        let f = DataUriFilter::new();
        // nothing listens on port 9 (discard) on test machines
        let err = f.try_convert("http://127.0.0.1:9/logo.png".into(), &Options::default()).unwrap_err();
        assert!(matches!(err, DataUriError::Http(..)), "{err}");
        assert!(f.convert("http://127.0.0.1:9/logo.png".into(), &Options::default()).is_none());
    }
}
