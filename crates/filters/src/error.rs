use thiserror::Error;

/// Error produced when an exclusion pattern cannot be compiled into a matcher.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The pattern has no matchable content once separators are trimmed.
    #[error("exclusion pattern '{pattern}' is empty")]
    Empty {
        /// The offending pattern as supplied.
        pattern: String,
    },
    /// The pattern expanded to an invalid glob expression.
    #[error("failed to compile exclusion pattern '{pattern}': {source}")]
    Glob {
        /// The offending pattern as supplied.
        pattern: String,
        /// Underlying glob compilation failure.
        #[source]
        source: globset::Error,
    },
}

impl FilterError {
    /// Returns the offending pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Empty { pattern } | Self::Glob { pattern, .. } => pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilterError;
    use globset::GlobBuilder;
    use std::error::Error as _;

    #[test]
    fn glob_error_preserves_pattern_and_source() {
        let glob_err = GlobBuilder::new("[").build().unwrap_err();
        let error = FilterError::Glob {
            pattern: "[".into(),
            source: glob_err.clone(),
        };

        assert_eq!(error.pattern(), "[");
        assert!(error.to_string().contains("failed to compile"));
        assert_eq!(error.source().unwrap().to_string(), glob_err.to_string());
    }

    #[test]
    fn empty_error_names_pattern() {
        let error = FilterError::Empty {
            pattern: "/".into(),
        };
        assert_eq!(error.pattern(), "/");
        assert_eq!(error.to_string(), "exclusion pattern '/' is empty");
        assert!(error.source().is_none());
    }
}
