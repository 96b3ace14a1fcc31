//! HTTP status code vocabulary.
//!
//! The status table is a closed set: [`StatusCode::from_code`] rejects
//! numeric codes that are not in the table, so a [`Response`](super::Response)
//! can never carry a status Weld does not know how to serialize.

use crate::error::{MessageError, MessageResult};

macro_rules! status_codes {
    ($($variant:ident => ($code:expr, $reason:expr),)+) => {
        /// A recognized HTTP status code with its canonical reason phrase.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $(
                #[doc = $reason]
                $variant,
            )+
        }

        impl StatusCode {
            /// Returns the numeric code.
            pub fn code(&self) -> u16 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Returns the canonical reason phrase.
            pub fn reason(&self) -> &'static str {
                match self {
                    $(Self::$variant => $reason,)+
                }
            }

            /// Looks up a status by numeric code.
            ///
            /// Fails with [`MessageError::InvalidStatus`] for codes outside
            /// the recognized table.
            pub fn from_code(code: u16) -> MessageResult<Self> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(MessageError::InvalidStatus(other)),
                }
            }
        }
    };
}

status_codes! {
    Continue => (100, "Continue"),
    SwitchingProtocols => (101, "Switching Protocols"),
    Ok => (200, "OK"),
    Created => (201, "Created"),
    Accepted => (202, "Accepted"),
    NoContent => (204, "No Content"),
    PartialContent => (206, "Partial Content"),
    MovedPermanently => (301, "Moved Permanently"),
    Found => (302, "Found"),
    SeeOther => (303, "See Other"),
    NotModified => (304, "Not Modified"),
    TemporaryRedirect => (307, "Temporary Redirect"),
    PermanentRedirect => (308, "Permanent Redirect"),
    BadRequest => (400, "Bad Request"),
    Unauthorized => (401, "Unauthorized"),
    Forbidden => (403, "Forbidden"),
    NotFound => (404, "Not Found"),
    MethodNotAllowed => (405, "Method Not Allowed"),
    NotAcceptable => (406, "Not Acceptable"),
    RequestTimeout => (408, "Request Timeout"),
    Conflict => (409, "Conflict"),
    Gone => (410, "Gone"),
    LengthRequired => (411, "Length Required"),
    PreconditionFailed => (412, "Precondition Failed"),
    PayloadTooLarge => (413, "Payload Too Large"),
    UriTooLong => (414, "URI Too Long"),
    UnsupportedMediaType => (415, "Unsupported Media Type"),
    ExpectationFailed => (417, "Expectation Failed"),
    ImATeapot => (418, "I'm a Teapot"),
    UnprocessableEntity => (422, "Unprocessable Entity"),
    TooManyRequests => (429, "Too Many Requests"),
    InternalServerError => (500, "Internal Server Error"),
    NotImplemented => (501, "Not Implemented"),
    BadGateway => (502, "Bad Gateway"),
    ServiceUnavailable => (503, "Service Unavailable"),
    GatewayTimeout => (504, "Gateway Timeout"),
    HttpVersionNotSupported => (505, "HTTP Version Not Supported"),
}

impl StatusCode {
    /// Returns true for 4xx codes.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code())
    }

    /// Returns true for 5xx codes.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code())
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_codes_round_trip() {
        for code in [200, 204, 301, 400, 404, 418, 500, 503] {
            let status = StatusCode::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn unrecognized_code_is_rejected() {
        assert!(matches!(
            StatusCode::from_code(299),
            Err(MessageError::InvalidStatus(299))
        ));
        assert!(StatusCode::from_code(999).is_err());
    }

    #[test]
    fn display_is_status_line_fragment() {
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
    }

    #[test]
    fn class_predicates() {
        assert!(StatusCode::BadRequest.is_client_error());
        assert!(StatusCode::InternalServerError.is_server_error());
        assert!(!StatusCode::Ok.is_client_error());
    }
}
