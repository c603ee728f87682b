// Panic guard - one bad peer message must not take an mpeer worker down

use std::any::Any;
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Outcome of running a handler call under the guard
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// The handler returned normally
    Success(T),
    /// The handler panicked; carries the panic payload as text
    Panicked(String),
}

/// Run one handler call, turning a panic into `Panicked`.
///
/// The worker answers a panicked item with `StatusCode::UNEXPECTED`, still
/// releases it, and moves on to the next delivery.
///
/// # Example
/// ```text
/// let code = match execute_guarded(AssertUnwindSafe(|| handler.process(&mut item))) {
///     PanicGuardResult::Success(code) => code,
///     PanicGuardResult::Panicked(_) => StatusCode::UNEXPECTED,
/// };
/// ```
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    catch_unwind(f).map_or_else(
        |payload| {
            let msg = payload_text(payload.as_ref());
            error!(panic_msg = %msg, "mpeer handler panicked while processing msg");
            PanicGuardResult::Panicked(msg)
        },
        PanicGuardResult::Success,
    )
}

/// `panic!` payloads are `&str` for literals and `String` for formatted messages
fn payload_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
