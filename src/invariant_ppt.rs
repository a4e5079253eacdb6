//! Invariant checking with contract-test support
//!
//! Production code states its invariants with [`assert_invariant!`]; tests
//! then call [`contract_test`] to prove those invariants were actually
//! exercised.
//!
//! ```rust,ignore
//! use camera2_session::assert_invariant;
//!
//! assert_invariant!(
//!     state == SessionState::Stopped,
//!     "Session is stopped before resources are released",
//!     "Camera2Session::report_error"
//! );
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Session state is touched only from the thread that owns it.
pub const CAMERA_THREAD_CONFINEMENT: &str = "Session state is only mutated on the camera thread";
/// Teardown marks the session stopped before releasing anything.
pub const STOPPED_BEFORE_RELEASE: &str = "Session is stopped before resources are released";
/// A creation outcome is reported at most once.
pub const SINGLE_CREATION_OUTCOME: &str = "Creation outcome is reported at most once";

/// Assert an invariant and log it for contract testing.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    record_invariant(message);

    if !condition {
        let ctx = context.unwrap_or("unknown");
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Log an invariant as checked without asserting it.
///
/// Used where a violation is reported through an error instead of a panic.
pub fn record_invariant(message: &str) {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().insert(message.to_string());
    });
}

/// Check that specific invariants were verified on this thread.
///
/// # Panics
/// Panics if any required invariant was not checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let log = INVARIANT_LOG.with(|log| log.borrow().clone());

    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| !log.contains(*invariant))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().clear();
    });
}
