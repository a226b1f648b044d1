use reqwest::StatusCode;

/// Fault types the server raises when the credentials or the session are not accepted.
const AUTHENTICATION_FAULTS: [&str; 3] = ["InvalidLogin", "NotAuthenticated", "NoPermission"];

/// Errors that can occur when talking to the management endpoint.
#[derive(Debug, thiserror::Error)]
pub enum VimError {
    /// The endpoint could not be reached or the connection broke off.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response without a fault payload.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Non-2xx response carrying a typed fault.
    #[error("server fault {fault_type}: {message}")]
    Fault { fault_type: String, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("login succeeded but no session id was returned")]
    MissingSessionId,

    #[error("service content does not expose a {0}")]
    MissingManager(&'static str),

    #[error("endpoint {0} cannot carry a request path")]
    InvalidEndpoint(url::Url),
}

impl VimError {
    /// Whether the server rejected the credentials or the session, as opposed to not being reachable at all.
    pub fn is_authentication(&self) -> bool {
        match self {
            VimError::Fault { fault_type, .. } => AUTHENTICATION_FAULTS.contains(&fault_type.as_str()),
            VimError::Status { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }

    /// Builds the error for a non-2xx response from its raw body.
    pub(crate) fn from_response_body(status: StatusCode, body: String) -> Self {
        let fault = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                let fault_type = value.get("_typeName")?.as_str()?.to_string();
                let message = ["faultstring", "localizedMessage", "message"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(|m| m.as_str()))
                    .or_else(|| {
                        value
                            .get("faultMessage")
                            .and_then(|messages| messages.get(0))
                            .and_then(|first| first.get("message"))
                            .and_then(|m| m.as_str())
                    })
                    .unwrap_or_default()
                    .to_string();
                Some((fault_type, message))
            });

        match fault {
            Some((fault_type, message)) => VimError::Fault { fault_type, message },
            None => VimError::Status { status, body },
        }
    }
}

pub type Result<T, E = VimError> = std::result::Result<T, E>;
