//! Raw request command implementation

use colored::Colorize;
use log::debug;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::client::RequestOptions;
use crate::error::{ApiError, Error, Result};

/// Arguments of `pulsakit request`
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub path: String,
    pub method: String,
    pub headers: Vec<String>,
    pub data: Option<String>,
    pub retries: Option<u32>,
    /// Drop the deadline and wait until the response or Ctrl-C
    pub wait: bool,
}

/// Send one request through the executor and print the response.
///
/// Normally the call is bounded by the executor deadline. With `wait`, the
/// deadline is replaced by Ctrl-C, which also interrupts a backoff wait in
/// progress. A non-2xx final response is printed and then reported as a
/// failure.
pub async fn run(opts: &GlobalOptions, args: RequestArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let mut options = build_options(&args)?;

    let watcher = if args.wait {
        let token = CancellationToken::new();
        options = options.signal(token.clone());
        Some(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, cancelling request");
                token.cancel();
            }
        }))
    } else {
        None
    };

    let retries = args.retries.unwrap_or_else(|| ctx.retries());
    let result = ctx.executor.execute(&args.path, options, retries).await;
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    let response = match result {
        Err(Error::Api(err)) if err.is_abort() && args.wait => {
            eprintln!("{}", "Request cancelled".yellow());
            return Err(err.into());
        }
        other => other?,
    };
    let status = response.status();
    let text = response.text().await.map_err(ApiError::from)?;
    let body: Option<serde_json::Value> = serde_json::from_str(&text).ok();

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "status": status.as_u16(),
                "body": body.clone().unwrap_or(serde_json::Value::String(text.clone())),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            let line = format!("HTTP {}", status);
            if status.is_success() {
                eprintln!("{}", line.green());
            } else {
                eprintln!("{}", line.red());
            }
            match body {
                Some(ref value) => println!("{}", serde_json::to_string_pretty(value)?),
                None if !text.is_empty() => println!("{}", text),
                None => {}
            }
        }
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Other(format!("request returned {}", status)))
    }
}

/// Translate CLI arguments into executor options
fn build_options(args: &RequestArgs) -> Result<RequestOptions> {
    let method = Method::from_bytes(args.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ApiError::InvalidRequest(format!("invalid method '{}'", args.method)))?;

    let mut options = RequestOptions::new(method);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    if let Some(ref data) = args.data {
        let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
            ApiError::InvalidRequest(format!("--data is not valid JSON: {}", e))
        })?;
        options = options.body(serde_json::to_vec(&value)?);
    }
    Ok(options)
}

/// Split `Name: value`
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw.split_once(':').ok_or_else(|| {
        ApiError::InvalidRequest(format!("header '{}' must look like 'Name: value'", raw))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidRequest(format!("header '{}' has no name", raw)).into());
    }
    Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, headers: &[&str], data: Option<&str>) -> RequestArgs {
        RequestArgs {
            path: "/members".to_string(),
            method: method.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            data: data.map(String::from),
            retries: None,
            wait: false,
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("X-Trace: abc").unwrap(), ("X-Trace", "abc"));
        assert_eq!(
            parse_header("Authorization:Bearer a:b").unwrap(),
            ("Authorization", "Bearer a:b")
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_build_options_method_and_body() {
        let options = build_options(&args("post", &["X-Trace: 1"], Some(r#"{"a":1}"#))).unwrap();

        assert_eq!(options.method, Method::POST);
        assert_eq!(options.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
        assert_eq!(options.headers.len(), 1);
    }

    #[test]
    fn test_build_options_rejects_bad_json() {
        let err = build_options(&args("POST", &[], Some("{oops"))).unwrap_err();
        assert!(err.to_string().contains("--data"));
    }

    #[test]
    fn test_build_options_rejects_bad_method() {
        assert!(build_options(&args("GE T", &[], None)).is_err());
    }
}
