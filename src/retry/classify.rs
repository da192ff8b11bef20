//! Classify attempt failures into recoverable and unrecoverable.

use std::fmt;

/// Failure of a single attempt, tagged with whether it may be retried.
///
/// Operations return `Result<T, Attempt<E>>`. A plain `E` converts into
/// `Attempt::Recoverable`, so `?` inside an operation records ordinary
/// errors as retryable; use [`unrecoverable`] to stop the loop immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<E> {
    /// Eligible for another attempt (subject to the retry predicate and budgets).
    Recoverable(E),
    /// Explicitly marked "do not retry".
    Unrecoverable(E),
}

impl<E> Attempt<E> {
    /// The underlying error, without the tag.
    pub fn error(&self) -> &E {
        match self {
            Attempt::Recoverable(e) | Attempt::Unrecoverable(e) => e,
        }
    }

    pub fn into_error(self) -> E {
        match self {
            Attempt::Recoverable(e) | Attempt::Unrecoverable(e) => e,
        }
    }

    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Attempt::Unrecoverable(_))
    }
}

impl<E> From<E> for Attempt<E> {
    fn from(err: E) -> Self {
        Attempt::Recoverable(err)
    }
}

impl<E: fmt::Display> fmt::Display for Attempt<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error())
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Attempt<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}

/// Wrap an error so the retry loop stops on it regardless of remaining attempts.
pub fn unrecoverable<E>(err: E) -> Attempt<E> {
    Attempt::Unrecoverable(err)
}

/// Default retry predicate: everything is retryable unless marked unrecoverable.
///
/// Exported so custom predicates can compose with it.
pub fn is_recoverable<E>(attempt: &Attempt<E>) -> bool {
    !attempt.is_unrecoverable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Boom;

    fn fails() -> Result<(), Boom> {
        Err(Boom)
    }

    fn op() -> Result<(), Attempt<Boom>> {
        fails()?;
        Ok(())
    }

    #[test]
    fn question_mark_yields_recoverable() {
        let err = op().unwrap_err();
        assert_eq!(err, Attempt::Recoverable(Boom));
        assert!(is_recoverable(&err));
    }

    #[test]
    fn unrecoverable_is_not_recoverable() {
        let err = unrecoverable(Boom);
        assert!(err.is_unrecoverable());
        assert!(!is_recoverable(&err));
        assert_eq!(err.into_error(), Boom);
    }

    #[test]
    fn display_shows_underlying_error() {
        let err = unrecoverable("disk full");
        assert_eq!(err.to_string(), "disk full");
    }
}
