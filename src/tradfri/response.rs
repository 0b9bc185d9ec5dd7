use std::fmt;

use serde::Serialize;

use crate::protocols::transport::TransportResponse;

/// Response status codes, encoded like CoAP codes (`class << 5 | detail`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StatusCode {
    /// 0.00, no response was received
    Empty = 0,
    Created = 65,
    Deleted = 66,
    Valid = 67,
    Changed = 68,
    Content = 69,
    Continue = 95,
    NotModified = 100,
    BadRequest = 128,
    Unauthorized = 129,
    BadOption = 130,
    Forbidden = 131,
    NotFound = 132,
    MethodNotAllowed = 133,
    NotAcceptable = 134,
    RequestEntityIncomplete = 136,
    Conflict = 137,
    PreconditionFailed = 140,
    RequestEntityTooLarge = 141,
    UnsupportedMediaType = 143,
    Teapot = 146,
    UnprocessableEntity = 150,
    InternalServerError = 160,
    NotImplemented = 161,
    BadGateway = 162,
    ServiceUnavailable = 163,
    GatewayTimeout = 164,
    ProxyingNotSupported = 165,
    /// 5.23, only produced locally when the liveness check fails
    DeviceUnreachable = 183,
    /// Any code without a variant, the raw value stays on the response
    Unknown = 255,
}

impl StatusCode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => StatusCode::Empty,
            65 => StatusCode::Created,
            66 => StatusCode::Deleted,
            67 => StatusCode::Valid,
            68 => StatusCode::Changed,
            69 => StatusCode::Content,
            95 => StatusCode::Continue,
            100 => StatusCode::NotModified,
            128 => StatusCode::BadRequest,
            129 => StatusCode::Unauthorized,
            130 => StatusCode::BadOption,
            131 => StatusCode::Forbidden,
            132 => StatusCode::NotFound,
            133 => StatusCode::MethodNotAllowed,
            134 => StatusCode::NotAcceptable,
            136 => StatusCode::RequestEntityIncomplete,
            137 => StatusCode::Conflict,
            140 => StatusCode::PreconditionFailed,
            141 => StatusCode::RequestEntityTooLarge,
            143 => StatusCode::UnsupportedMediaType,
            146 => StatusCode::Teapot,
            150 => StatusCode::UnprocessableEntity,
            160 => StatusCode::InternalServerError,
            161 => StatusCode::NotImplemented,
            162 => StatusCode::BadGateway,
            163 => StatusCode::ServiceUnavailable,
            164 => StatusCode::GatewayTimeout,
            165 => StatusCode::ProxyingNotSupported,
            183 => StatusCode::DeviceUnreachable,
            _ => StatusCode::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Empty => "0.00 Empty",
            StatusCode::Created => "2.01 Created",
            StatusCode::Deleted => "2.02 Deleted",
            StatusCode::Valid => "2.03 Valid",
            StatusCode::Changed => "2.04 Changed",
            StatusCode::Content => "2.05 Content",
            StatusCode::Continue => "2.31 Continue",
            StatusCode::NotModified => "3.04 Not Modified",
            StatusCode::BadRequest => "4.00 Bad Request",
            StatusCode::Unauthorized => "4.01 Unauthorized",
            StatusCode::BadOption => "4.02 Bad Option",
            StatusCode::Forbidden => "4.03 Forbidden",
            StatusCode::NotFound => "4.04 Not Found",
            StatusCode::MethodNotAllowed => "4.05 Method Not Allowed",
            StatusCode::NotAcceptable => "4.06 Not Acceptable",
            StatusCode::RequestEntityIncomplete => "4.08 Request Entity Incomplete",
            StatusCode::Conflict => "4.09 Conflict",
            StatusCode::PreconditionFailed => "4.12 Precondition Failed",
            StatusCode::RequestEntityTooLarge => "4.13 Request Entity Too Large",
            StatusCode::UnsupportedMediaType => "4.15 Unsupported Media Type",
            StatusCode::Teapot => "4.18 I'm a teapot",
            StatusCode::UnprocessableEntity => "4.22 Unprocessable Entity",
            StatusCode::InternalServerError => "5.00 Internal Server Error",
            StatusCode::NotImplemented => "5.01 Not Implemented",
            StatusCode::BadGateway => "5.02 Bad Gateway",
            StatusCode::ServiceUnavailable => "5.03 Service Unavailable",
            StatusCode::GatewayTimeout => "5.04 Gateway Timeout",
            StatusCode::ProxyingNotSupported => "5.05 Proxying Not Supported",
            StatusCode::DeviceUnreachable => {
                "5.23 Device unreachable - No such device or it is currently unavailable."
            }
            StatusCode::Unknown => "Unknown",
        }
    }

    /// 2.xx
    pub fn is_success(self) -> bool {
        (64..96).contains(&self.code())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a response came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResponseOrigin {
    /// Sent by the gateway (or the transport, for timeouts and rejects)
    Transport,
    /// The device failed the liveness check, nothing was written
    LivenessCheck,
    /// The gateway accepted the write but the read-back did not match
    Verification,
}

/// Result of a request against the gateway. It describes the request, not
/// the addressed resource.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControllerResponse {
    pub code: u8,
    pub code_string: String,
    pub status: StatusCode,
    pub cancelled: bool,
    pub rejected: bool,
    pub timed_out: bool,
    pub payload: Option<String>,
    pub origin: ResponseOrigin,
}

impl ControllerResponse {
    pub fn from_transport(response: TransportResponse) -> Self {
        let status = StatusCode::from_code(response.code);
        let code_string = match status {
            StatusCode::Unknown => format!("{}.{:02}", response.code >> 5, response.code & 0x1f),
            status => status.as_str().to_string(),
        };

        ControllerResponse {
            code: response.code,
            code_string,
            status,
            cancelled: response.cancelled,
            rejected: response.rejected,
            timed_out: response.timed_out,
            payload: response.payload,
            origin: ResponseOrigin::Transport,
        }
    }

    fn local(status: StatusCode, origin: ResponseOrigin) -> Self {
        ControllerResponse {
            code: status.code(),
            code_string: status.as_str().to_string(),
            status,
            cancelled: false,
            rejected: false,
            timed_out: false,
            payload: None,
            origin,
        }
    }

    pub fn device_unreachable() -> Self {
        Self::local(StatusCode::DeviceUnreachable, ResponseOrigin::LivenessCheck)
    }

    pub fn not_modified() -> Self {
        Self::local(StatusCode::NotModified, ResponseOrigin::Verification)
    }

    /// True when the response never came off the wire.
    pub fn is_synthetic(&self) -> bool {
        self.origin != ResponseOrigin::Transport
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.rejected && !self.timed_out && self.status.is_success()
    }
}

impl fmt::Display for ControllerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_string)?;

        if self.timed_out {
            write!(f, " (timed out)")?;
        }
        if self.rejected {
            write!(f, " (rejected)")?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }

        Ok(())
    }
}
