use thiserror::Error;

/// Errors produced by [`WeatherClient`](crate::client::WeatherClient) calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Rejected locally, no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The service answered with a non-2xx status.
    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Failures of a one-shot position lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location access denied. Please enable location permissions.")]
    PermissionDenied,

    #[error("Location information unavailable.")]
    PositionUnavailable,

    #[error("Location request timed out.")]
    Timeout,

    #[error("Location error: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_displays_provider_message() {
        let err = ClientError::Request {
            status: 401,
            message: "Invalid API key".into(),
        };
        assert_eq!(err.to_string(), "Invalid API key");
    }

    #[test]
    fn geolocation_messages_are_user_facing() {
        assert_eq!(
            GeolocationError::Timeout.to_string(),
            "Location request timed out."
        );
        assert_eq!(
            GeolocationError::Unknown("boom".into()).to_string(),
            "Location error: boom"
        );
    }
}
