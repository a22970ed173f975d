//! Narrowing between wrapper kinds.
//!
//! Whether a native object implements another interface is only knowable by
//! asking it (`QueryInterface`). [`Cast`] wraps that question behind one
//! generic contract, implemented for every [`Interface`]:
//!
//! | method           | unsupported interface   | other native failure |
//! |------------------|-------------------------|----------------------|
//! | [`Cast::probe`]  | `false`                 | `false`              |
//! | [`Cast::cast_to`]| `Err(DebugError::Cast)` | `Err(Native)`        |
//! | [`Cast::try_as`] | `Ok(None)`              | `Err(Native)`        |
//! | [`Cast::as_kind`]| `None`                  | `None` (logged)      |
//!
//! The target is chosen at compile time through `T::KIND`; a query result is
//! the only way a pointer moves to another wrapper kind.

use crate::core::error::{DebugError, DebugResult};
use crate::core::interface::Interface;
use tracing::debug;

pub trait Cast: Interface {
    /// Reports whether the native object also implements `T`. Never fails.
    fn probe<T: Interface>(&self) -> bool {
        matches!(self.com().query(T::KIND), Ok(Some(_)))
    }

    /// Returns a new `T` over the same native object.
    ///
    /// The new wrapper holds its own reference and is tracked separately.
    fn cast_to<T: Interface>(&self) -> DebugResult<T> {
        match self.com().query(T::KIND)? {
            // The query adopted the pointer under `T::KIND`.
            Some(ptr) => Ok(unsafe { T::from_com(ptr) }),
            None => Err(DebugError::Cast {
                from: Self::KIND.name(),
                to: T::KIND.name(),
            }),
        }
    }

    /// Like [`Cast::cast_to`], but an unsupported interface is `Ok(None)`.
    /// Released wrappers and native failures are still errors.
    fn try_as<T: Interface>(&self) -> DebugResult<Option<T>> {
        match self.cast_to::<T>() {
            Ok(target) => Ok(Some(target)),
            Err(err) if err.is_cast_failure() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Lossy form of [`Cast::cast_to`]: any failure becomes `None`.
    ///
    /// Use [`Cast::try_as`] when a native failure must not be mistaken for an
    /// unsupported interface.
    fn as_kind<T: Interface>(&self) -> Option<T> {
        match self.cast_to::<T>() {
            Ok(target) => Some(target),
            Err(err) => {
                if !err.is_cast_failure() {
                    debug!(
                        from = Self::KIND.name(),
                        to = T::KIND.name(),
                        error = %err,
                        "as_kind suppressed a non-cast failure"
                    );
                }
                None
            }
        }
    }
}

impl<K: Interface> Cast for K {}
