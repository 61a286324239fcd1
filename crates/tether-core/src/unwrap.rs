//! Stripping of wrapper layers down to the root cause.
//!
//! A failed attempt can carry up to two layers around its real cause: the
//! orchestrator's diagnostic wrapper ([`CommandError::Attempt`]) and a
//! transport wrapper raised by the execution framework
//! ([`CommandError::BadRequest`] or [`CommandError::Runtime`]). Callers only
//! ever see what is left after both are removed.
//!
//! All functions here are pure and idempotent.

use crate::error::CommandError;

/// Removes the diagnostic wrapper, if present.
pub fn unwrap_diagnostic(error: CommandError) -> CommandError {
    match error {
        CommandError::Attempt { source, .. } => unwrap_diagnostic(*source),
        other => other,
    }
}

/// Replaces a transport wrapper by its recorded cause.
///
/// A wrapper without a recorded cause is returned unchanged. Anything that is
/// not a transport wrapper passes through untouched.
pub fn unwrap_transport(error: CommandError) -> CommandError {
    match error {
        CommandError::BadRequest { cause: Some(cause), .. }
        | CommandError::Runtime { cause: Some(cause), .. } => CommandError::Failed(cause),
        other => other,
    }
}

/// Strips every known wrapper layer, diagnostic first, then transport.
pub fn root_cause(error: CommandError) -> CommandError {
    unwrap_transport(unwrap_diagnostic(error))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use thiserror::Error;

    use super::*;
    use crate::{Cause, CommandIdentity, RuntimeFailure};

    #[derive(Debug, Error)]
    #[error("validation failed: {0}")]
    struct Validation(String);

    fn identity() -> CommandIdentity {
        CommandIdentity::new("broker", "publish")
    }

    fn cause_of(error: &CommandError) -> &Cause {
        match error {
            CommandError::Failed(cause) => cause,
            other => panic!("expected bare root cause, got {other:?}"),
        }
    }

    #[test]
    fn bare_root_cause_passes_through() {
        let cause: Cause = Arc::new(Validation("id".into()));
        let unwrapped = root_cause(CommandError::Failed(cause.clone()));

        assert!(Arc::ptr_eq(cause_of(&unwrapped), &cause));
    }

    #[test]
    fn transport_wrappers_replaced_by_cause() {
        let bad_request = CommandError::bad_request_caused_by("rejected", Validation("a".into()));
        let unwrapped = unwrap_transport(bad_request);
        assert_eq!(cause_of(&unwrapped).to_string(), "validation failed: a");

        let runtime = CommandError::runtime_caused_by(
            RuntimeFailure::CommandException,
            "failed",
            Validation("b".into()),
        );
        let unwrapped = unwrap_transport(runtime);
        assert_eq!(cause_of(&unwrapped).to_string(), "validation failed: b");
    }

    #[test]
    fn wrapper_without_cause_returned_unchanged() {
        let unwrapped = root_cause(CommandError::runtime(RuntimeFailure::ShortCircuited, "open"));

        match unwrapped {
            CommandError::Runtime { kind, message, cause } => {
                assert_eq!(kind, RuntimeFailure::ShortCircuited);
                assert_eq!(message, "open");
                assert!(cause.is_none());
            },
            other => panic!("expected runtime wrapper, got {other:?}"),
        }
    }

    #[test]
    fn double_wrapped_failure_fully_unwrapped() {
        let cause: Cause = Arc::new(Validation("deep".into()));
        let error = CommandError::attempt(
            identity(),
            2,
            CommandError::Runtime {
                kind: RuntimeFailure::Timeout,
                message: "slow".into(),
                cause: Some(cause.clone()),
            },
        );

        let unwrapped = root_cause(error);
        assert!(Arc::ptr_eq(cause_of(&unwrapped), &cause));
    }

    #[test]
    fn diagnostic_layer_stripped_before_transport_layer() {
        let error =
            CommandError::attempt(identity(), 1, CommandError::bad_request("no cause recorded"));

        let without_diagnostic = unwrap_diagnostic(error);
        assert!(matches!(without_diagnostic, CommandError::BadRequest { cause: None, .. }));

        // Transport unwrapping alone leaves the diagnostic layer in place.
        let error = CommandError::attempt(identity(), 1, CommandError::timeout("slow"));
        assert!(matches!(unwrap_transport(error), CommandError::Attempt { .. }));
    }

    fn failure_strategy() -> impl Strategy<Value = CommandError> {
        let leaf = prop_oneof![
            "[a-z]{1,12}".prop_map(|m| CommandError::failed(Validation(m))),
            "[a-z]{1,12}".prop_map(CommandError::invalid_argument),
            "[a-z]{1,12}".prop_map(CommandError::bad_request),
            "[a-z]{1,12}".prop_map(CommandError::timeout),
        ];

        (leaf, any::<bool>(), any::<bool>(), 1u32..10).prop_map(
            |(leaf, transport, diagnostic, attempt)| {
                let mut error = leaf;
                if transport {
                    error = CommandError::bad_request_caused_by("wrapped", error);
                }
                if diagnostic {
                    error = CommandError::attempt(identity(), attempt, error);
                }
                error
            },
        )
    }

    proptest! {
        #[test]
        fn unwrapping_is_idempotent(error in failure_strategy()) {
            let once = root_cause(error);
            let description = once.to_string();
            let kind = once.kind();

            let twice = root_cause(once);
            prop_assert_eq!(twice.to_string(), description);
            prop_assert_eq!(twice.kind(), kind);
        }

        #[test]
        fn unwrapped_failure_never_has_diagnostic_layer(error in failure_strategy()) {
            let unwrapped = root_cause(error);
            let is_diagnostic = matches!(unwrapped, CommandError::Attempt { .. });
            prop_assert!(!is_diagnostic);
        }
    }
}
