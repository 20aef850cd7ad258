// SPDX-License-Identifier: MIT
//! RPC endpoint normalisation.
//!
//! Every endpoint URL is normalised before being used as a pool key so that
//! `tcp://node:26657`, `node:26657` and `http://node:26657/` all resolve to
//! the same client. The algorithm is idempotent: `normalize(normalize(x)) ==
//! normalize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

static ENDS_WITH_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r":\d+$").expect("static regex"));

/// Rewrite the scheme so only `http`, `https`, `ws` and `wss` survive.
///
/// A missing scheme becomes `http://`, `tcp://` becomes `http://`, and any
/// other scheme is replaced with `http://`.
fn coerce_scheme(endpoint: &str) -> String {
    match endpoint.split_once("://") {
        None => format!("http://{endpoint}"),
        Some(("tcp", rest)) => format!("http://{rest}"),
        Some(("http" | "https" | "ws" | "wss", _)) => endpoint.to_string(),
        Some((_, rest)) => format!("http://{rest}"),
    }
}

/// Normalise an RPC endpoint into `scheme://host:port[/subpath]` form.
///
/// Steps: coerce the scheme, strip a trailing `/`, then append the default
/// port (`:80` for http/ws, `:443` for https/wss) when the host part carries
/// none.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = coerce_scheme(endpoint.trim());
    let endpoint = endpoint.trim_end_matches('/');

    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("", endpoint),
    };

    let (host, sub_path) = match rest.split_once('/') {
        Some((host, sub_path)) => (host, Some(sub_path)),
        None => (rest, None),
    };

    let mut host = host.to_string();
    if !ENDS_WITH_PORT.is_match(&host) {
        match scheme {
            "http" | "ws" | "" => host.push_str(":80"),
            "https" | "wss" => host.push_str(":443"),
            _ => {}
        }
    }

    let mut out = String::new();
    if !scheme.is_empty() {
        out.push_str(scheme);
        out.push_str("://");
    }
    out.push_str(&host);
    if let Some(sub_path) = sub_path {
        out.push('/');
        out.push_str(sub_path);
    }
    out
}

/// Map an endpoint onto a scheme `reqwest` can speak: `ws` → `http`,
/// `wss` → `https`. Used when the pool constructs the actual HTTP client;
/// the normalised form stays the pool key.
pub fn http_base_url(endpoint: &str) -> String {
    let normalized = normalize_endpoint(endpoint);
    if let Some(rest) = normalized.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if let Some(rest) = normalized.strip_prefix("wss://") {
        format!("https://{rest}")
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn adds_missing_scheme_and_port() {
        assert_eq!(normalize_endpoint("node.example.org"), "http://node.example.org:80");
    }

    #[test]
    fn rewrites_tcp_scheme() {
        assert_eq!(
            normalize_endpoint("tcp://node.example.org:26657"),
            "http://node.example.org:26657"
        );
    }

    #[test]
    fn keeps_websocket_schemes() {
        assert_eq!(normalize_endpoint("ws://node"), "ws://node:80");
        assert_eq!(normalize_endpoint("wss://node"), "wss://node:443");
    }

    #[test]
    fn defaults_https_port() {
        assert_eq!(normalize_endpoint("https://rpc.chain.io"), "https://rpc.chain.io:443");
    }

    #[test]
    fn strips_trailing_slash_and_keeps_subpath() {
        assert_eq!(
            normalize_endpoint("https://rpc.chain.io/tendermint/"),
            "https://rpc.chain.io:443/tendermint"
        );
        assert_eq!(
            normalize_endpoint("http://10.0.0.4:26657/"),
            "http://10.0.0.4:26657"
        );
    }

    #[test]
    fn unknown_scheme_becomes_http() {
        assert_eq!(normalize_endpoint("ftp://node:26657"), "http://node:26657");
    }

    #[test]
    fn http_base_rewrites_ws() {
        assert_eq!(http_base_url("ws://node:26657"), "http://node:26657");
        assert_eq!(http_base_url("wss://node"), "https://node:443");
    }

    proptest! {
        // Idempotence over the scheme/host/port matrix.
        #[test]
        fn normalization_is_idempotent(
            scheme in prop::sample::select(vec!["", "http://", "https://", "tcp://", "ws://", "wss://"]),
            host in "[a-z][a-z0-9.-]{0,20}",
            port in prop::option::of(1u16..65535),
            sub in prop::option::of("[a-z]{1,8}"),
        ) {
            let mut raw = format!("{scheme}{host}");
            if let Some(p) = port {
                raw.push_str(&format!(":{p}"));
            }
            if let Some(s) = sub {
                raw.push('/');
                raw.push_str(&s);
            }
            let once = normalize_endpoint(&raw);
            let twice = normalize_endpoint(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
