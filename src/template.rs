use crate::{DataUriFilter, Options, Source};
use minijinja::value::{Object, ObjectRepr, Value, ValueKind};
use minijinja::{Environment, Error, ErrorKind};
use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

/// Name the filter is registered under
pub const FILTER_NAME: &str = "data_uri";
/// Also registered, for templates written against Twig's `dataUri`
pub const FILTER_ALIAS: &str = "dataUri";

/// Registers `data_uri` (and its `dataUri` alias) in the environment:
///
/// ```jinja
/// <img src="{{ logo|data_uri }}">
/// <a href="{{ report|data_uri(false, 'text/csv', {'name': 'report.csv'}) }}">
/// ```
///
/// Arguments are positional: `strict` (default `true`), `mime` and `parameters` (a map).
/// A failed conversion logs a warning and renders as undefined, so `|default(...)` works on it.
/// A `parameters` argument that isn't a map is a template error.
pub fn add_to_environment(env: &mut Environment<'_>, filter: DataUriFilter) {
    let filter = Arc::new(filter);
    for name in [FILTER_NAME, FILTER_ALIAS] {
        let filter = Arc::clone(&filter);
        env.add_filter(name, move |value: Value, strict: Option<bool>, mime: Option<String>, parameters: Option<Value>| {
            data_uri(&filter, &value, strict, mime, parameters)
        });
    }
}

fn data_uri(filter: &DataUriFilter, value: &Value, strict: Option<bool>, mime: Option<String>, parameters: Option<Value>) -> Result<Value, Error> {
    let options = Options {
        strict: strict.unwrap_or(true),
        mime,
        parameters: match parameters {
            Some(parameters) => parameter_list(&parameters)?,
            None => Vec::new(),
        },
    };

    let uri = if let Some(stream) = value.downcast_object_ref::<StreamSource>() {
        let mut reader = stream.reader.lock().unwrap_or_else(PoisonError::into_inner);
        filter.convert(Source::Stream(&mut **reader), &options)
    } else if value.kind() == ValueKind::Bytes {
        let mut bytes = value.as_bytes().unwrap_or_default();
        filter.convert(Source::Stream(&mut bytes), &options)
    } else {
        filter.convert(source_from_value(value), &options)
    };
    Ok(uri.map(Value::from).unwrap_or(Value::UNDEFINED))
}

/// Strings are used as-is, numbers and booleans are stringified. Streams and bytes are handled by the caller.
fn source_from_value(value: &Value) -> Source<'_> {
    match value.kind() {
        ValueKind::String => match value.as_str() {
            Some(text) => Source::Text(Cow::Borrowed(text)),
            None => Source::Text(Cow::Owned(value.to_string())),
        },
        ValueKind::Number | ValueKind::Bool => Source::Text(Cow::Owned(value.to_string())),
        kind => Source::Unsupported(shape(kind)),
    }
}

fn shape(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Undefined => "undefined",
        ValueKind::None => "none",
        ValueKind::Bool => "bool",
        ValueKind::Number => "number",
        ValueKind::String => "string",
        ValueKind::Bytes => "bytes",
        ValueKind::Seq => "sequence",
        ValueKind::Map => "map",
        ValueKind::Iterable => "iterable",
        _ => "object",
    }
}

fn parameter_list(parameters: &Value) -> Result<Vec<(String, String)>, Error> {
    match parameters.kind() {
        ValueKind::Undefined | ValueKind::None => return Ok(Vec::new()),
        ValueKind::Map => {},
        kind => return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("{} parameters must be a map, not {}", FILTER_NAME, shape(kind)),
        )),
    }
    let mut list = Vec::new();
    for key in parameters.try_iter()? {
        let value = parameters.get_item(&key)?;
        list.push((key.to_string(), value.to_string()));
    }
    Ok(list)
}

/// An open reader that templates can pass to `data_uri`.
///
/// ```rust
/// # use data_uri_filter::{template::*, DataUriFilter};
/// let mut env = minijinja::Environment::new();
/// add_to_environment(&mut env, DataUriFilter::new());
/// let ctx = minijinja::context! { blob => StreamSource::value(&b"\x00\x01"[..]) };
/// assert_eq!(env.render_str("{{ blob|data_uri(false) }}", ctx)?, "data:application/octet-stream;base64,AAE=");
/// # Ok::<_, minijinja::Error>(())
/// ```
///
/// The stream is read to the end by the first conversion. Later conversions see it empty.
pub struct StreamSource {
    reader: Mutex<Box<dyn Read + Send>>,
}

impl StreamSource {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self { reader: Mutex::new(Box::new(reader)) }
    }

    /// Wraps the reader in a template [`Value`]
    pub fn value(reader: impl Read + Send + 'static) -> Value {
        Value::from_object(Self::new(reader))
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamSource")
    }
}

impl Object for StreamSource {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }
}
