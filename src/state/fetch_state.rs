/// Terminal fetch states a record can reach through the strategy chain
use std::fmt;

/// How the strategy chain settled a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    // ===== Success States =====
    /// Host is on the trusted list; original URL recorded, nothing written
    TrustedSuccess,

    /// Streamed directly to disk under one of the identities
    DirectSuccess,

    /// Written via the rendering fallback (inner document or page capture)
    RenderedSuccess,

    // ===== Failure State =====
    /// Every applicable strategy failed
    Exhausted,
}

impl FetchState {
    /// Returns true if the record counts as successful
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }

    /// Returns true if reaching this state implies a local artifact write
    ///
    /// Decides whether the outcome points at the mirror or at the source.
    pub fn wrote_artifact(&self) -> bool {
        matches!(self, Self::DirectSuccess | Self::RenderedSuccess)
    }

    /// Short label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrustedSuccess => "trusted_success",
            Self::DirectSuccess => "direct_success",
            Self::RenderedSuccess => "rendered_success",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        assert!(FetchState::TrustedSuccess.is_success());
        assert!(FetchState::DirectSuccess.is_success());
        assert!(FetchState::RenderedSuccess.is_success());

        assert!(!FetchState::Exhausted.is_success());
    }

    #[test]
    fn test_wrote_artifact() {
        assert!(FetchState::DirectSuccess.wrote_artifact());
        assert!(FetchState::RenderedSuccess.wrote_artifact());

        assert!(!FetchState::TrustedSuccess.wrote_artifact());
        assert!(!FetchState::Exhausted.wrote_artifact());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FetchState::TrustedSuccess), "trusted_success");
        assert_eq!(format!("{}", FetchState::DirectSuccess), "direct_success");
        assert_eq!(format!("{}", FetchState::Exhausted), "exhausted");
    }
}
