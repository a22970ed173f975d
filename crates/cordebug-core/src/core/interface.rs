//! The contract shared by every wrapper type.
//!
//! Each native interface gets one wrapper type generated by
//! `com_interface!`. The wrapper owns a single
//! [`ComPtr`] and implements [`Interface`], which gives it:
//!
//! - the wrap factory ([`Interface::wrap`]),
//! - explicit, idempotent release ([`Interface::release`]),
//! - equality and hashing by native handle,
//! - casting through the blanket [`Cast`](crate::core::cast::Cast) impl.

use crate::core::com_ptr::ComPtr;
use crate::core::error::DebugResult;
use crate::core::registry::ResourceRegistry;
use crate::types::kind::{HandleId, WrapperKind};
use std::ffi::c_void;
use std::sync::Arc;

pub(crate) mod private {
    use crate::core::com_ptr::ComPtr;

    /// Access to the owned pointer. Not nameable outside the crate, and a
    /// pointer only changes kind through `QueryInterface`.
    pub trait Sealed: Sized {
        /// # Safety
        /// `ptr` must hold an interface of `Self`'s kind.
        unsafe fn from_com(ptr: ComPtr) -> Self;

        fn com(&self) -> &ComPtr;

        fn release_com(&mut self) -> bool;

        fn into_com(self) -> ComPtr;
    }
}

/// A wrapper over one native interface.
///
/// Wrappers are created by [`Interface::wrap`] or by casting; the owned
/// pointer cannot be moved into a wrapper of another kind.
///
/// ```compile_fail
/// use cordebug_core::prelude::*;
///
/// fn retype(frame: Frame) -> NativeFrame {
///     NativeFrame::from_com(frame.into_com())
/// }
/// ```
///
/// ```compile_fail
/// use cordebug_core::prelude::*;
///
/// fn retype<A: Interface, B: Interface>(from: A) -> B {
///     B::from_com(from.into_com())
/// }
/// ```
///
/// # Safety
/// `Raw` must be the native interface structure identified by `KIND.iid()`,
/// and `Vtbl` its vtable layout. Implementations are generated by
/// `com_interface!`; hand-written impls must uphold the same pairing.
pub unsafe trait Interface: private::Sealed {
    /// The native interface structure, e.g. `ICorDebugChain`.
    type Raw;
    /// The vtable layout of `Raw`.
    type Vtbl;

    const KIND: WrapperKind;

    /// Wraps a raw interface pointer. Returns `None` for null.
    ///
    /// # Safety
    /// `raw` must be null or a live pointer to `Self::Raw`, and the caller
    /// hands over one reference on it (the usual out-parameter convention).
    /// Wrapping the same pointer twice therefore needs two references.
    unsafe fn wrap(raw: *mut Self::Raw, registry: &Arc<ResourceRegistry>) -> Option<Self> {
        unsafe { ComPtr::adopt(raw.cast::<c_void>(), Self::KIND, registry) }
            .map(|ptr| unsafe { Self::from_com(ptr) })
    }

    /// Releases the native reference. Calling it again does nothing.
    fn release(&mut self) {
        self.release_com();
    }

    fn is_released(&self) -> bool {
        self.com().is_released()
    }

    /// Identity of the wrapped native object, `None` once released.
    fn handle_id(&self) -> Option<HandleId> {
        self.com().handle_id()
    }

    #[doc(hidden)]
    fn vtable(&self) -> DebugResult<(*mut c_void, &Self::Vtbl)> {
        unsafe { self.com().vtable::<Self::Vtbl>() }
    }
}

/// Null-safe handle equality: two absent wrappers are equal, an absent and a
/// present wrapper are not.
pub fn same_handle<K: Interface>(a: Option<&K>, b: Option<&K>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.com() == b.com(),
        _ => false,
    }
}

/// Declares a wrapper type over a native interface.
///
/// ```ignore
/// com_interface! {
///     /// Wrapper over `ICorDebugChain`.
///     pub struct Chain => ICorDebugChain, ICorDebugChainVtbl, IID_ICorDebugChain;
/// }
/// ```
macro_rules! com_interface {
    (
        $(#[$meta:meta])*
        pub struct $name:ident => $raw:ident, $vtbl:ident, $iid:ident;
    ) => {
        $(#[$meta])*
        pub struct $name {
            ptr: crate::core::com_ptr::ComPtr,
        }

        impl crate::core::interface::private::Sealed for $name {
            unsafe fn from_com(ptr: crate::core::com_ptr::ComPtr) -> Self {
                debug_assert_eq!(
                    ptr.kind(),
                    <Self as crate::core::interface::Interface>::KIND
                );
                Self { ptr }
            }

            fn com(&self) -> &crate::core::com_ptr::ComPtr {
                &self.ptr
            }

            fn release_com(&mut self) -> bool {
                self.ptr.release()
            }

            fn into_com(self) -> crate::core::com_ptr::ComPtr {
                self.ptr
            }
        }

        unsafe impl crate::core::interface::Interface for $name {
            type Raw = ::cordebug_sys::$raw;
            type Vtbl = ::cordebug_sys::$vtbl;

            const KIND: crate::types::kind::WrapperKind = crate::types::kind::WrapperKind::new(
                stringify!($name),
                stringify!($raw),
                ::cordebug_sys::$iid,
            );
        }

        impl Clone for $name {
            /// Takes another native reference; the copy is released independently.
            fn clone(&self) -> Self {
                Self {
                    ptr: self.ptr.duplicate(),
                }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.ptr == other.ptr
            }
        }

        impl Eq for $name {}

        impl ::std::hash::Hash for $name {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                ::std::hash::Hash::hash(&self.ptr, state);
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(&self.ptr, f)
            }
        }
    };
}

pub(crate) use com_interface;
