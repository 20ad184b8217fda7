//! Request lifecycle phases.

use std::borrow::Cow;

use derive_more::Display;

/// A named stage of a request's lifecycle.
///
/// The dispatcher runs [`Phase::Request`] before the transport send, then
/// [`Phase::Response`] or [`Phase::Error`] depending on the outcome.
/// [`Phase::Custom`] phases are never run by the built-in dispatch loop;
/// they exist for callers driving a [`crate::Chain`] directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    /// Before the request is handed to the transport.
    #[display("request")]
    Request,
    /// After the transport produced a response.
    #[display("response")]
    Response,
    /// After the transport or a plugin recorded an error.
    #[display("error")]
    Error,
    /// A caller-defined stage.
    #[display("{_0}")]
    Custom(Cow<'static, str>),
}

impl Phase {
    /// Create a custom phase.
    #[must_use]
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Custom(name.into())
    }

    /// Phase name as used in logs and the context store.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Error => "error",
            Self::Custom(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Request.to_string(), "request");
        assert_eq!(Phase::Response.to_string(), "response");
        assert_eq!(Phase::Error.to_string(), "error");
        assert_eq!(Phase::custom("drain").to_string(), "drain");
    }

    #[test]
    fn custom_phases_compare_by_name() {
        assert_eq!(Phase::custom("drain"), Phase::custom("drain".to_string()));
        assert_ne!(Phase::custom("drain"), Phase::Request);
    }
}
