use thiserror::Error;

/// Failures raised by the HTTP client and the subscription repository.
///
/// The `Display` text of each variant is what ends up on the display surface,
/// so keep it short and readable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("API key is not configured")]
    MissingCredential,
    #[error("Invalid subscription id: '{0}'")]
    InvalidArgument(String),
    #[error("Unusable base_url: {0}")]
    InsecureEndpoint(String),
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("HTTP {code}{}", body_suffix(.body))]
    HttpStatus { code: u16, body: Option<String> },
    #[error("Malformed response body: {0}")]
    MalformedBody(String),
    #[error("Request rejected ({code}): {message}")]
    RemoteRejected { code: i64, message: String },
    #[error("Unexpected response shape: {0}")]
    InvalidShape(String),
}

fn body_suffix(body: &Option<String>) -> String {
    match body.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(": {}", text),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_without_body() {
        let err = ApiError::HttpStatus {
            code: 502,
            body: None,
        };
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[test]
    fn http_status_with_body() {
        let err = ApiError::HttpStatus {
            code: 401,
            body: Some(" invalid token \n".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP 401: invalid token");
    }

    #[test]
    fn http_status_blank_body_is_omitted() {
        let err = ApiError::HttpStatus {
            code: 500,
            body: Some("   ".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn remote_rejected_message() {
        let err = ApiError::RemoteRejected {
            code: 403,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "Request rejected (403): quota exceeded");
    }

    #[test]
    fn insecure_endpoint_message() {
        let err = ApiError::InsecureEndpoint("must use HTTPS, got: http://x".to_string());
        assert_eq!(err.to_string(), "Unusable base_url: must use HTTPS, got: http://x");
    }

    #[test]
    fn timeout_message_mentions_bound() {
        let err = ApiError::Timeout { after_ms: 8000 };
        assert!(err.to_string().contains("8000 ms"));
    }
}
