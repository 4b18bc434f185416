#![no_main]
use data_uri_filter::{dumper, Data, Encoding};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (bool, bool, &str, &[u8])| {
    let (binary, strict, title, content) = input;
    let encoding = if binary { Encoding::Binary } else { Encoding::Text };
    // any quoted-string value is a valid media-type parameter
    let title = title.replace(['\\', '"'], "");
    let mime = format!("application/x-fuzz;title=\"{title}\"");
    let Ok(data) = Data::new(content, encoding, Some(&mime), vec![], strict) else { return };
    let uri = dumper::dump(&data);
    let parsed = data_url::DataUrl::process(&uri).unwrap();
    assert_eq!(parsed.mime_type().subtype, "x-fuzz");
    assert_eq!(parsed.decode_to_vec().unwrap().0, content);
});
