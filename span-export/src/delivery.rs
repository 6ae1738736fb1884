// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::Outcome;
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, Uri};
use log::{debug, error, warn};
use std::net::{IpAddr, ToSocketAddrs};

/// Identity of the exporting process, attached to encoded spans where the
/// backend schema carries one. Resolved once at construction; resolution
/// failures degrade to a name-only endpoint, never an error.
#[derive(Clone, Debug)]
pub struct LocalEndpoint {
    pub service_name: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

/// Best-effort local address discovery. Any step failing leaves the
/// corresponding fields empty.
pub fn resolve_local_endpoint(service_name: &str) -> LocalEndpoint {
    let mut endpoint = LocalEndpoint {
        service_name: service_name.to_owned(),
        ipv4: None,
        ipv6: None,
    };

    let host = match local_hostname() {
        Some(host) => host,
        None => {
            debug!("could not determine local hostname, endpoint keeps service name only");
            return endpoint;
        }
    };

    match (host.as_str(), 0u16).to_socket_addrs() {
        Ok(addrs) => {
            for addr in addrs {
                match addr.ip() {
                    IpAddr::V4(ip) if endpoint.ipv4.is_none() => {
                        endpoint.ipv4 = Some(ip.to_string());
                    }
                    IpAddr::V6(ip) if endpoint.ipv6.is_none() => {
                        endpoint.ipv6 = Some(ip.to_string());
                    }
                    _ => {}
                }
            }
        }
        Err(e) => debug!("could not resolve addresses for {host}: {e}"),
    }

    endpoint
}

fn local_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }

    let len = buf.iter().position(|&b| b == 0)?;
    let host = std::str::from_utf8(&buf[..len]).ok()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_owned())
    }
}

/// Sends encoded batches to the destination endpoint and classifies what
/// came back. The connection pool inside the hyper client is the only
/// shared mutable resource and is safe for concurrent use by construction.
pub struct HttpDelivery {
    client: Client<HttpConnector>,
    endpoint: Uri,
    content_type: &'static str,
    accepted_status: Vec<u16>,
}

impl HttpDelivery {
    pub fn new(endpoint: Uri, content_type: &'static str, accepted_status: Vec<u16>) -> Self {
        HttpDelivery {
            client: Client::new(),
            endpoint,
            content_type,
            accepted_status,
        }
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Transmits one payload. Classification is coarse: any transport
    /// error is retryable, a response with an accepted status is success,
    /// and a response outside the accepted set is retryable. Callers own
    /// retry and backoff policy.
    pub async fn send(&self, payload: Bytes) -> Outcome {
        let request = match Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, self.content_type)
            .body(Body::from(payload))
        {
            Ok(request) => request,
            Err(e) => {
                error!("could not build delivery request: {e}");
                return Outcome::FailedTerminal;
            }
        };

        match self.client.request(request).await {
            Ok(response) => {
                let status = response.status().as_u16();
                if self.accepted_status.contains(&status) {
                    Outcome::Success
                } else {
                    warn!("span batch rejected by backend with status {status}");
                    Outcome::FailedRetryable
                }
            }
            Err(e) => {
                debug!("span batch transport failure: {e}");
                Outcome::FailedRetryable
            }
        }
    }
}
