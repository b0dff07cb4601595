//! Caller principal type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Principal`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalError {
    /// The input string is empty.
    #[error("principal cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("principal must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside the textual alphabet.
    #[error("principal contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// A dash-separated group is empty or longer than five characters.
    #[error("principal group {index} is malformed")]
    MalformedGroup {
        /// Zero-based group index.
        index: usize,
    },
}

/// The textual form of a caller identity.
///
/// Principals are opaque to the storefront: they are compared by string
/// equality and passed back to the backend unchanged.
///
/// ## Constraints
///
/// - Length: 1-63 characters
/// - Alphabet: lowercase base32 (`a-z`, `2-7`) and `-`
/// - Dash-separated groups of 1-5 characters
///
/// ## Examples
///
/// ```
/// use atelier_core::Principal;
///
/// assert!(Principal::parse("2vxsx-fae").is_ok());
/// assert!(Principal::parse("").is_err());
/// assert!(Principal::parse("Not-Valid").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Maximum length of a textual principal.
    pub const MAX_LENGTH: usize = 63;

    const ANONYMOUS: &'static str = "2vxsx-fae";

    /// Parse a `Principal` from its textual form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, contains characters
    /// outside the textual alphabet, or has malformed groups.
    pub fn parse(s: &str) -> Result<Self, PrincipalError> {
        if s.is_empty() {
            return Err(PrincipalError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(PrincipalError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '2'..='7' | '-'))
        {
            return Err(PrincipalError::InvalidCharacter(c));
        }

        for (index, group) in s.split('-').enumerate() {
            if group.is_empty() || group.len() > 5 {
                return Err(PrincipalError::MalformedGroup { index });
            }
        }

        Ok(Self(s.to_owned()))
    }

    /// The principal used by callers that have not logged in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_owned())
    }

    /// Returns true for the anonymous principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    /// Returns the principal as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
