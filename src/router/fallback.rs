//! Fallback-chain execution.
//!
//! Candidates are attempted strictly in order, one at a time. A failed
//! candidate is logged and recorded, then the next one is tried. Errors that
//! signal a broken configuration stop the chain immediately.

use std::future::Future;

use crate::config::Candidate;
use crate::error::Error;

/// Record of one failed candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub provider: String,
    pub model: String,
    pub message: String,
}

/// Errors that decide whether the chain may continue past them.
pub trait ChainError: std::fmt::Display {
    /// `true` when trying further candidates cannot help.
    fn is_fatal(&self) -> bool;
}

impl ChainError for Error {
    fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingAdapter { .. } | Error::Config(_))
    }
}

/// Outcome of running a fallback chain.
///
/// `attempts` holds every failed candidate, in order, regardless of whether
/// the chain eventually succeeded.
pub struct FallbackOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: Vec<AttemptRecord>,
}

/// Format failed attempts for the `x-caregate-failed-candidates` header.
///
/// Format: `"anthropic/claude-3-5-sonnet, openai/gpt-4o"`. Returns `None`
/// when nothing failed.
pub fn format_attempts(attempts: &[AttemptRecord]) -> Option<String> {
    if attempts.is_empty() {
        return None;
    }
    Some(
        attempts
            .iter()
            .map(|a| format!("{}/{}", a.provider, a.model))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Try each candidate in order until one succeeds.
///
/// When every candidate fails, the error is built by `exhausted` from the
/// number of failed attempts and the last failure (`None` only for an empty
/// chain).
pub async fn run_chain<T, E, F, Fut, X>(
    candidates: &[Candidate],
    send: F,
    exhausted: X,
) -> FallbackOutcome<T, E>
where
    E: ChainError,
    F: Fn(&Candidate) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    X: FnOnce(usize, Option<E>) -> E,
{
    let mut attempts = Vec::with_capacity(candidates.len());
    let mut last_error: Option<E> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        match send(candidate).await {
            Ok(value) => {
                if index > 0 {
                    tracing::info!(
                        provider = %candidate.provider,
                        model = %candidate.model,
                        failed = index,
                        "Fallback candidate succeeded"
                    );
                }
                return FallbackOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(err) if err.is_fatal() => {
                return FallbackOutcome {
                    result: Err(err),
                    attempts,
                };
            }
            Err(err) => {
                tracing::warn!(
                    provider = %candidate.provider,
                    model = %candidate.model,
                    error = %err,
                    "Fallback candidate failed, trying next"
                );
                attempts.push(AttemptRecord {
                    provider: candidate.provider.clone(),
                    model: candidate.model.clone(),
                    message: err.to_string(),
                });
                last_error = Some(err);
            }
        }
    }

    FallbackOutcome {
        result: Err(exhausted(attempts.len(), last_error)),
        attempts,
    }
}
