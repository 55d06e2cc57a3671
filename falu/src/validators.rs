//! Option value parsers, wired into clap via `value_parser`.

use reqwest::Url;
use std::net::IpAddr;

const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS",
];

fn non_empty(value: &str, what: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    Ok(value.to_string())
}

/// Dotted lowercase event type such as `message.delivered`
pub fn parse_event_type(value: &str) -> Result<String, String> {
    let value = non_empty(value, "event type")?;
    let valid = value.split('.').all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    });
    if !valid {
        return Err(format!(
            "'{value}' is not a valid event type (expected e.g. message.delivered)"
        ));
    }
    Ok(value)
}

/// IPv4/IPv6 address with an optional `/prefix`
pub fn parse_ip_address(value: &str) -> Result<String, String> {
    let value = non_empty(value, "IP address")?;
    let (address, prefix) = match value.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (value.as_str(), None),
    };
    let ip: IpAddr = address
        .parse()
        .map_err(|_| format!("'{value}' is not a valid IP address"))?;

    if let Some(prefix) = prefix {
        let max = if ip.is_ipv4() { 32 } else { 128 };
        match prefix.parse::<u8>() {
            Ok(bits) if bits <= max => {}
            _ => return Err(format!("'{value}' has an invalid network prefix")),
        }
    }
    Ok(value)
}

/// Standard HTTP method, normalized to upper case
pub fn parse_http_method(value: &str) -> Result<String, String> {
    let method = non_empty(value, "HTTP method")?.to_ascii_uppercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
        return Err(format!(
            "'{value}' is not a supported HTTP method ({})",
            HTTP_METHODS.join(", ")
        ));
    }
    Ok(method)
}

/// Absolute request path; may end in `*` to match a prefix
pub fn parse_request_path(value: &str) -> Result<String, String> {
    let value = non_empty(value, "request path")?;
    if !value.starts_with('/') {
        return Err(format!("'{value}' must start with '/'"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(format!("'{value}' must not contain whitespace"));
    }
    Ok(value)
}

pub fn parse_status_code(value: &str) -> Result<u16, String> {
    match value.trim().parse::<u16>() {
        Ok(code) if (100..=599).contains(&code) => Ok(code),
        _ => Err(format!("'{value}' is not an HTTP status code (100-599)")),
    }
}

/// Request source such as `api`, `dashboard` or `cli`
pub fn parse_source(value: &str) -> Result<String, String> {
    let value = non_empty(value, "source")?.to_ascii_lowercase();
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!("'{value}' is not a valid source"));
    }
    Ok(value)
}

/// Absolute http(s) URL
pub fn parse_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| format!("'{value}' is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("'{value}' uses unsupported scheme '{scheme}'")),
    }
}

fn parse_object_id(value: &str, prefix: &str, what: &str) -> Result<String, String> {
    let value = non_empty(value, what)?;
    let valid = value
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()));
    if !valid {
        return Err(format!("'{value}' is not a valid {what} (expected {prefix}...)"));
    }
    Ok(value)
}

pub fn parse_workspace_id(value: &str) -> Result<String, String> {
    parse_object_id(value, "wksp_", "workspace id")
}

pub fn parse_webhook_endpoint_id(value: &str) -> Result<String, String> {
    parse_object_id(value, "we_", "webhook endpoint id")
}
