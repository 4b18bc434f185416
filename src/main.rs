use data_uri_filter::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: data-uri [--no-strict] [--mime=<type>] [--param=<name>=<value>]... [SOURCE | -]";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut options = Options::default();
    let mut source = None;
    for arg in std::env::args().skip(1) {
        if arg == "--no-strict" {
            options.strict = false;
        } else if let Some(mime) = arg.strip_prefix("--mime=") {
            options.mime = Some(mime.to_owned());
        } else if let Some(param) = arg.strip_prefix("--param=") {
            let Some((name, value)) = param.split_once('=') else {
                eprintln!("{USAGE}");
                return ExitCode::FAILURE;
            };
            options.parameters.push((name.to_owned(), value.to_owned()));
        } else if arg == "-h" || arg == "--help" {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        } else if source.is_none() {
            source = Some(arg);
        } else {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    }

    let filter = DataUriFilter::new();
    let result = match source.as_deref() {
        None | Some("-") => {
            let mut stdin = std::io::stdin().lock();
            filter.try_convert(Source::Stream(&mut stdin), &options)
        },
        Some(text) => filter.try_convert(Source::from(text), &options),
    };
    match result {
        Ok(uri) => {
            println!("{uri}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Can't convert {}: {e}", source.as_deref().unwrap_or("stdin"));
            ExitCode::FAILURE
        },
    }
}
