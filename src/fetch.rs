use crate::DataUriError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::io::Read;
use url::Url;

pub(crate) struct Fetched {
    pub bytes: Vec<u8>,
    /// Raw header value, not validated
    pub content_type: Option<String>,
}

/// Plain GET. Redirects are followed as configured on the client; any non-2xx final status is an error.
pub(crate) fn get(client: &Client, url: &Url) -> Result<Fetched, DataUriError> {
    let mut response = client.get(url.as_str()).send()
        .map_err(|err| DataUriError::Http(url.to_string(), err))?;
    let status = response.status();
    if !status.is_success() {
        return Err(DataUriError::HttpStatus(url.to_string(), status.as_u16()));
    }
    let content_type = response.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut bytes = Vec::new();
    response.read_to_end(&mut bytes).map_err(DataUriError::Stream)?;
    Ok(Fetched { bytes, content_type })
}

/// Builds the client used when none was configured
pub(crate) fn default_client() -> Result<Client, DataUriError> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(DataUriError::Client)
}
