use thiserror::Error;

/// Typed external-boundary errors: malformed caller usage, returned rather than silently
/// swallowed. Distinct from the per-action `ActionOutcome` bookkeeping (invalid/infeasible
/// actions never surface as an `Err`) and from invariant violations, which this crate treats as
/// fatal via the `invariant!` macro rather than a recoverable `Result`.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("expected an action array of length {expected}, got {actual}")]
    ActionsArrayWrongLength { expected: usize, actual: usize },

    #[error("step() called before reset()")]
    StepBeforeReset,
}

pub type SimResult<T> = Result<T, SimError>;

/// Panics with a `crit!`-logged message if `cond` is false. Reserved for invariant violations
/// that indicate an implementation bug rather than caller misuse; these are never
/// recoverable and the policy is to abort rather than limp on with corrupted state.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            common::crit!("invariant violation"; "detail" => format!($($arg)+));
            panic!("invariant violation: {}", format!($($arg)+));
        }
    };
}
