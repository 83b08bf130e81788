// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Stage hook for the Fastfood datapath.
//!
//! Every transform reports the stages it runs, in order:
//!
//! * software path: `signs`, `hadamard`, `permutation`, `gaussian`,
//!   `hadamard`, then `scale`;
//! * hardware path: the operator label (`Vp`, `Vg` or `Vf`), then `scale`.
//!
//! Shapes are `[rows, cols]` of the buffer entering and leaving the stage.
//! The software path works on `(examples · k, d)` blocks between the
//! Hadamard stages, so block shapes show up there.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, RwLock};

/// One completed datapath stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: &'static str,
    pub input_shape: [usize; 2],
    pub output_shape: [usize; 2],
}

pub type StageObserver = Arc<dyn Fn(&StageEvent) + Send + Sync + 'static>;

static OBSERVER: OnceLock<RwLock<Option<StageObserver>>> = OnceLock::new();

thread_local! {
    // Set while this thread runs the observer, so a callback that transforms
    // data itself does not recurse.
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

fn slot() -> &'static RwLock<Option<StageObserver>> {
    OBSERVER.get_or_init(|| RwLock::new(None))
}

/// Replaces the process-wide observer and returns the previous one.
pub fn set_stage_observer(observer: Option<StageObserver>) -> Option<StageObserver> {
    let mut guard = slot().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::replace(&mut *guard, observer)
}

/// Installs `observer` until the returned guard drops, then restores
/// whatever was installed before.
pub fn observe_stages(observer: StageObserver) -> ObserverGuard {
    ObserverGuard {
        previous: Some(set_stage_observer(Some(observer))),
    }
}

#[must_use = "the observer is removed when the guard drops"]
pub struct ObserverGuard {
    previous: Option<Option<StageObserver>>,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_stage_observer(previous);
        }
    }
}

/// Reports a finished stage. Free when nothing is installed; a panicking
/// observer never unwinds into the transform.
pub fn emit_stage(stage: &'static str, input_shape: (usize, usize), output_shape: (usize, usize)) {
    let Some(lock) = OBSERVER.get() else {
        return;
    };
    let observer = lock
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    let Some(observer) = observer else {
        return;
    };
    if DISPATCHING.with(|flag| flag.replace(true)) {
        return;
    }
    let event = StageEvent {
        stage,
        input_shape: [input_shape.0, input_shape.1],
        output_shape: [output_shape.0, output_shape.1],
    };
    let _ = catch_unwind(AssertUnwindSafe(|| observer(&event)));
    DISPATCHING.with(|flag| flag.set(false));
}
