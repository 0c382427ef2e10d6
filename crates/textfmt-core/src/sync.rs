//! Lock shim for state shared through the registry.
//!
//! With the `threads` feature this is a `std::sync::Mutex`; without it the
//! library is single-threaded and the lock is a `RefCell`.

#[cfg(feature = "threads")]
pub struct Lock<T> {
    inner: std::sync::Mutex<T>,
}

#[cfg(feature = "threads")]
impl<T> Lock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: std::sync::Mutex::new(value),
        }
    }

    /// Run `f` with exclusive access to the protected value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(not(feature = "threads"))]
pub struct Lock<T> {
    inner: std::cell::RefCell<T>,
}

#[cfg(not(feature = "threads"))]
impl<T> Lock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: std::cell::RefCell::new(value),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
