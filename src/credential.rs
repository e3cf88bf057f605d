//! Bearer credentials for the search API.
//!
//! A [`Credential`] is handed to each live fetch; the client never looks one
//! up on its own.

use std::fmt;

/// A bearer token for the search API.
///
/// The token is opaque to this crate. It may be given bare or already
/// prefixed with `Bearer `; either way the request carries
/// `Authorization: Bearer <token>`. `Debug` never prints the token.
///
/// ```
/// use trendfetch::Credential;
///
/// let bare = Credential::new("abc");
/// let prefixed = Credential::new("Bearer abc");
/// assert_eq!(bare.authorization(), prefixed.authorization());
/// assert_eq!(format!("{:?}", bare), "Credential(<redacted>)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns `None` for an empty or whitespace-only token.
    pub fn non_empty(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The `Authorization` header value for this token.
    pub fn authorization(&self) -> String {
        let token = self.0.trim();
        match token.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => {
                format!("Bearer {}", token[7..].trim_start())
            }
            _ => format!("Bearer {}", token),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}
