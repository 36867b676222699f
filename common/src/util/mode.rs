//! Scoped read-only execution mode.
//!
//! Metric evaluation runs inside a [`NoGradGuard`]; differentiable operators
//! query [`is_grad_enabled`] and skip gradient bookkeeping while it is off.
//! The previous mode is restored when the guard drops, on every return path.

use std::cell::Cell;

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|g| g.get())
}

#[must_use = "gradient tracking is restored as soon as the guard is dropped"]
pub struct NoGradGuard {
    prev: bool,
}

impl NoGradGuard {
    pub fn enter() -> Self {
        let prev = GRAD_ENABLED.with(|g| g.replace(false));
        Self { prev }
    }
}

impl Drop for NoGradGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|g| g.set(self.prev));
    }
}
