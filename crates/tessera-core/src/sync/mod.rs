// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cooperative cancellation and the upload critical section.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag polled by the drain between steps and inside long loops.
///
/// Raising it never interrupts a renderer call in progress: the current item
/// finishes and the drain stops at the next check.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Re-arms the token so it can drive another drain.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Serializes drains against each other and against teardown.
///
/// Change notifications never take this lock; they only touch the stores'
/// own locks.
#[derive(Debug, Default)]
pub struct UploadLock {
    inner: Mutex<()>,
}

impl UploadLock {
    /// Creates an unlocked upload lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the critical section is free.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock()
    }

    /// Enters the critical section only if it is free.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, ()>> {
        self.inner.try_lock()
    }
}
