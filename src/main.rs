//! CLI binary: fetch one URL with the built-in HTTP/1.1 client.
//!
//! Thin wrapper around the `http_loader` library: argument parsing, logger
//! and crypto-provider initialization, and output formatting. The status
//! line and headers go to stdout followed by the body, streamed or
//! buffered per `--stream`.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncWriteExt;

use http_loader::config::Opt;
use http_loader::{
    init_crypto_provider, init_logger, Body, BodyMode, UploadSource, UrlLoader, UrlRequest,
};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logger(opt.log_level.clone().into());
    init_crypto_provider();

    let mut body = Vec::new();
    if let Some(data) = &opt.data {
        body.push(UploadSource::from_bytes(data.clone().into_bytes()));
    }
    if let Some(path) = &opt.data_file {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        body.push(UploadSource::from_reader(file));
    }

    let headers = opt
        .headers
        .iter()
        .map(|raw| parse_header_arg(raw))
        .collect::<Result<Vec<_>>>()?;

    let request = UrlRequest {
        url: opt.url.clone(),
        method: opt.method.clone(),
        headers,
        body,
        mode: if opt.stream {
            BodyMode::Stream
        } else {
            BodyMode::Buffer
        },
    };

    match UrlLoader::new().load(request).await {
        Ok(response) => {
            println!("{}", response.status_line);
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!();

            let mut stdout = tokio::io::stdout();
            match response.body {
                Body::Buffer(bytes) => stdout.write_all(&bytes).await?,
                Body::Stream(mut stream) => {
                    tokio::io::copy(&mut stream, &mut stdout).await?;
                }
            }
            stdout.flush().await?;
            Ok(())
        }
        Err(e) => {
            eprintln!("http_loader error: {e}");
            process::exit(1);
        }
    }
}

fn parse_header_arg(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("header {raw:?} must be \"Name: value\""))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}
