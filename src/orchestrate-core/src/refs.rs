//! Refs and the conditional headers built from them.

pub const IF_MATCH: &str = "If-Match";
pub const IF_NONE_MATCH: &str = "If-None-Match";

/// Quote a ref for use as a header value.
///
/// Embedded quotes are removed before wrapping, so an already quoted ref
/// comes out the same as the bare one.
pub fn format_ref(ref_: &str) -> String {
    format!("\"{}\"", ref_.replace('"', ""))
}

/// Strip the quotes a server puts around an `ETag`
pub fn unquote_ref(etag: &str) -> String {
    etag.trim().trim_start_matches("W/").replace('"', "")
}

/// Precondition attached to a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Condition {
    /// Unconditional write
    #[default]
    None,
    /// Write only if the current ref matches
    MatchRef(String),
    /// Write only if the key holds no value
    RequireAbsent,
}

impl Condition {
    /// Header implied by this condition, if any
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Self::None => None,
            Self::MatchRef(ref_) => Some((IF_MATCH, format_ref(ref_))),
            Self::RequireAbsent => Some((IF_NONE_MATCH, "*".to_string())),
        }
    }
}

impl From<Option<&str>> for Condition {
    fn from(ref_: Option<&str>) -> Self {
        match ref_ {
            Some(ref_) => Self::MatchRef(ref_.to_string()),
            None => Self::None,
        }
    }
}

/// `If-Match` header for an optional ref
pub fn if_match(ref_: Option<&str>) -> Option<(&'static str, String)> {
    Condition::from(ref_).header()
}
