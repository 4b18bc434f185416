#![no_main]
use data_uri_filter::{DataUriFilter, Options, Source};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let mut filter = DataUriFilter::new();
    // keep the fuzzer off the network and the disk
    filter.allow_urls(false);
    filter.allow_files(false);
    let uri = filter.convert(Source::from(text), &Options::default()).unwrap();
    let parsed = data_url::DataUrl::process(&uri).unwrap();
    assert_eq!(parsed.decode_to_vec().unwrap().0, text.as_bytes());
});
