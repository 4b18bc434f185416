use crate::data::{Data, Encoding};
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;

/// Everything except RFC 3986 unreserved characters gets escaped
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Serializes the payload:
///
/// `data:<type>/<subtype>[;mime params][;name=value...][;length=<n>][;base64],<payload>`
///
/// `length` is only written for strict payloads and counts raw bytes, not the encoded output.
pub fn dump(data: &Data) -> String {
    let content = data.content();
    let mut out = String::with_capacity(64 + match data.encoding() {
        Encoding::Binary => content.len() * 4 / 3 + 4,
        Encoding::Text => content.len() * 3 / 2,
    });
    out.push_str("data:");
    let mime = data.mime();
    out.push_str(&mime.type_);
    out.push('/');
    out.push_str(&mime.subtype);
    // Quoted values may hold a `,`, so media-type parameters are escaped like attributes
    for (name, value) in mime.parameters.iter().chain(data.parameters()) {
        out.push(';');
        out.push_str(name);
        out.push('=');
        out.extend(percent_encode(value.as_bytes(), UNRESERVED));
    }
    if data.is_strict() {
        // Writing to a String can't fail
        let _ = write!(out, ";length={}", content.len());
    }
    match data.encoding() {
        Encoding::Binary => {
            out.push_str(";base64,");
            base64::encode_config_buf(content, base64::STANDARD, &mut out);
        },
        Encoding::Text => {
            out.push(',');
            out.extend(percent_encode(content, UNRESERVED));
        },
    }
    out
}

#[test]
fn text() {
    let data = Data::new("hello", Encoding::Text, Some("text/plain"), vec![], true).unwrap();
    assert_eq!(dump(&data), "data:text/plain;length=5,hello");

    let data = Data::new("hello world & more?", Encoding::Text, None, vec![], false).unwrap();
    assert_eq!(dump(&data), "data:text/plain;charset=US-ASCII,hello%20world%20%26%20more%3F");

    let data = Data::new("€", Encoding::Text, None, vec![], true).unwrap();
    assert_eq!(dump(&data), "data:text/plain;charset=UTF-8;length=3,%E2%82%AC");
}

#[test]
fn binary() {
    let data = Data::new(&b"hi"[..], Encoding::Binary, Some("text/html"), vec![], false).unwrap();
    assert_eq!(dump(&data), "data:text/html;base64,aGk=");

    let data = Data::new(vec![0xFF, 0xD8, 0xFF], Encoding::Binary, Some("image/jpeg"), vec![], true).unwrap();
    assert_eq!(dump(&data), "data:image/jpeg;length=3;base64,/9j/");

    let data = Data::new(Vec::new(), Encoding::Binary, None, vec![], true).unwrap();
    assert_eq!(dump(&data), "data:application/octet-stream;length=0;base64,");
}

#[test]
fn parameters_keep_order() {
    let params = vec![
        ("name".to_string(), "my file.txt".to_string()),
        ("author".to_string(), "a;b".to_string()),
    ];
    let data = Data::new("x", Encoding::Text, Some("text/plain"), params, true).unwrap();
    assert_eq!(dump(&data), "data:text/plain;name=my%20file.txt;author=a%3Bb;length=1,x");
}

#[test]
fn quoted_mime_parameters() {
    let data = Data::new("hello", Encoding::Text, Some("text/plain;title=\"a,b\""), vec![], false).unwrap();
    let uri = dump(&data);
    assert_eq!(uri, "data:text/plain;title=a%2Cb,hello");
    let parsed = data_url::DataUrl::process(&uri).unwrap();
    assert_eq!(parsed.decode_to_vec().unwrap().0, b"hello");
}

#[test]
fn decodes_back() {
    let payloads: [&[u8]; 4] = [b"", b"plain", b"\x00\x01\xfe\xff", "ünïcödé ,;#%".as_bytes()];
    for payload in payloads {
        for encoding in [Encoding::Text, Encoding::Binary] {
            let data = Data::new(payload, encoding, Some("application/x-test"), vec![("k".into(), "v v".into())], true).unwrap();
            let uri = dump(&data);
            let parsed = data_url::DataUrl::process(&uri).unwrap();
            assert_eq!(parsed.mime_type().type_, "application");
            assert_eq!(parsed.mime_type().subtype, "x-test");
            let (body, _) = parsed.decode_to_vec().unwrap();
            assert_eq!(body, payload, "{uri}");
        }
    }
}
