//! Scoped runtime reset

use std::ops::{Deref, DerefMut};

use super::Runtime;

/// Borrows a runtime for one file run and resets it when dropped
pub struct ResetGuard<'a, R: Runtime + ?Sized> {
    runtime: &'a mut R,
}

impl<'a, R: Runtime + ?Sized> ResetGuard<'a, R> {
    pub fn new(runtime: &'a mut R) -> Self {
        Self { runtime }
    }
}

impl<R: Runtime + ?Sized> Deref for ResetGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.runtime
    }
}

impl<R: Runtime + ?Sized> DerefMut for ResetGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.runtime
    }
}

impl<R: Runtime + ?Sized> Drop for ResetGuard<'_, R> {
    fn drop(&mut self) {
        self.runtime.reset();
    }
}
