use std::fmt;

use async_trait::async_trait;
use color_eyre::Result;
use serde::Deserialize;

use crate::settings::HubSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// A request addressed relative to the hub root, e.g. `15001/65537`.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub payload: Option<String>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Request {
            method: Method::Get,
            path: path.into(),
            payload: None,
        }
    }

    pub fn put(path: impl Into<String>, payload: impl Into<String>) -> Self {
        Request {
            method: Method::Put,
            path: path.into(),
            payload: Some(payload.into()),
        }
    }
}

/// Whatever the secure channel got back for one request.
///
/// `code` uses the CoAP encoding (`class << 5 | detail`, so 2.05 is 69). A
/// request that never got an answer carries code 0 and one of the flags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransportResponse {
    pub code: u8,
    pub payload: Option<String>,
    pub cancelled: bool,
    pub rejected: bool,
    pub timed_out: bool,
}

impl TransportResponse {
    pub fn new(code: u8, payload: Option<String>) -> Self {
        TransportResponse {
            code,
            payload,
            ..Default::default()
        }
    }

    pub fn timed_out() -> Self {
        TransportResponse {
            timed_out: true,
            ..Default::default()
        }
    }
}

/// The secure request/response channel to a gateway (CoAP over DTLS with a
/// pre-shared key on real hardware).
///
/// Implementations report a hard channel failure as `Err`. Anything the
/// channel can still describe (error codes, timeouts, rejects) is an `Ok`
/// response.
#[async_trait]
pub trait Transport: Send {
    async fn open(&mut self, settings: &HubSettings) -> Result<()>;

    async fn request(&mut self, request: &Request) -> Result<TransportResponse>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn open(&mut self, settings: &HubSettings) -> Result<()> {
        (**self).open(settings).await
    }

    async fn request(&mut self, request: &Request) -> Result<TransportResponse> {
        (**self).request(request).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

/// Deserializes a response body, keeping track of the JSON path on failure.
pub fn decode_payload<T: for<'a> Deserialize<'a>>(
    payload: &str,
) -> Result<T, serde_path_to_error::Error<serde_json::Error>> {
    let de = &mut serde_json::Deserializer::from_str(payload);
    serde_path_to_error::deserialize(de)
}
