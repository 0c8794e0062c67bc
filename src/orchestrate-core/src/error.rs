use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Details of a non-success response from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    /// Machine-readable error code from the body, e.g. `items_not_found`
    pub code: Option<String>,
    pub message: String,
    pub details: Option<Value>,
    /// Value of the `X-ORCHESTRATE-REQ-ID` header
    pub request_id: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " {}", code)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Error body shape returned by the service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

impl ApiError {
    /// Build from a status and a raw body. Bodies that are empty or not JSON
    /// keep their text as the message and carry no code.
    pub fn from_body(status: u16, body: &[u8], request_id: Option<String>) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => Self {
                status,
                code: parsed.code,
                message: parsed.message.unwrap_or_default(),
                details: parsed.details,
                request_id,
            },
            Err(_) => Self {
                status,
                code: None,
                message: String::from_utf8_lossy(body).trim().to_string(),
                details: None,
                request_id,
            },
        }
    }
}

/// Why a search or range parameter set was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum SearchParamError {
    /// Both members of a mutually exclusive pair were supplied
    Conflict { first: String, second: String },
    InvalidLimit(String),
    UnknownOption(String),
    /// Rejected by the service (`search_param_invalid`)
    Server(ApiError),
}

impl fmt::Display for SearchParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { first, second } => {
                write!(f, "'{}' and '{}' are mutually exclusive", first, second)
            }
            Self::InvalidLimit(value) => write!(f, "limit must be numeric, got {}", value),
            Self::UnknownOption(name) => write!(f, "unknown range option '{}'", name),
            Self::Server(api) => write!(f, "{}", api),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unauthorized: {0}")]
    Unauthorized(ApiError),

    #[error("not found: {0}")]
    NotFound(ApiError),

    #[error("malformed ref: {0}")]
    MalformedRef(ApiError),

    #[error("version mismatch: {0}")]
    VersionMismatch(ApiError),

    #[error("already present: {0}")]
    AlreadyPresent(ApiError),

    #[error("bad request: {0}")]
    BadRequest(ApiError),

    #[error("indexing conflict: {0}")]
    IndexingConflict(ApiError),

    #[error("invalid search parameter: {0}")]
    InvalidSearchParam(SearchParamError),

    #[error("malformed search query: {0}")]
    SearchQueryMalformed(ApiError),

    #[error("request failed: {0}")]
    RequestError(ApiError),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("batch error: {0}")]
    Batch(String),
}

impl Error {
    /// Translate a non-success status into the matching variant.
    ///
    /// The status picks the variant; for 400 and 412 the body's `code`
    /// refines it further.
    pub fn from_status(api: ApiError) -> Self {
        match (api.status, api.code.as_deref()) {
            (400, Some("item_ref_malformed")) => Self::MalformedRef(api),
            (400, Some("search_query_malformed")) => Self::SearchQueryMalformed(api),
            (400, Some("search_param_invalid")) => {
                Self::InvalidSearchParam(SearchParamError::Server(api))
            }
            (400, _) => Self::BadRequest(api),
            (401, _) => Self::Unauthorized(api),
            (404, _) => Self::NotFound(api),
            (409, _) => Self::IndexingConflict(api),
            (412, Some("item_already_present")) => Self::AlreadyPresent(api),
            (412, _) => Self::VersionMismatch(api),
            _ => Self::RequestError(api),
        }
    }

    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// HTTP details, when the error came from a response
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Unauthorized(api)
            | Self::NotFound(api)
            | Self::MalformedRef(api)
            | Self::VersionMismatch(api)
            | Self::AlreadyPresent(api)
            | Self::BadRequest(api)
            | Self::IndexingConflict(api)
            | Self::SearchQueryMalformed(api)
            | Self::RequestError(api)
            | Self::InvalidSearchParam(SearchParamError::Server(api)) => Some(api),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api().map(|api| api.status)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
