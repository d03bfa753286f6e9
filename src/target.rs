//! The thing a user asked to share.

use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;

/// Marker argument meaning "read standard input".
pub const STDIN_MARKER: &str = "-";

/// What the invocation points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationTarget {
    /// Bytes piped into standard input.
    Stdin,
    /// A path on the local filesystem.
    NamedFile(PathBuf),
}

impl InvocationTarget {
    /// Build a target from the optional positional argument.
    ///
    /// An absent argument or `-` selects standard input.
    ///
    /// # Examples
    ///
    /// ```
    /// use blink_lib::InvocationTarget;
    /// use std::ffi::OsStr;
    ///
    /// assert_eq!(InvocationTarget::from_arg(None), InvocationTarget::Stdin);
    /// assert_eq!(
    ///     InvocationTarget::from_arg(Some(OsStr::new("-"))),
    ///     InvocationTarget::Stdin
    /// );
    /// ```
    pub fn from_arg(arg: Option<&OsStr>) -> Self {
        match arg {
            None => Self::Stdin,
            Some(a) if a == STDIN_MARKER => Self::Stdin,
            Some(a) => Self::NamedFile(PathBuf::from(a)),
        }
    }
}

impl fmt::Display for InvocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("stdin"),
            Self::NamedFile(p) => write!(f, "{}", p.display()),
        }
    }
}
