//! Wrapper types for the native debugger interfaces.

pub mod chain;
pub mod enums;
pub mod frame;

use crate::core::com_ptr::ComPtr;
use crate::core::error::{DebugResult, HResult};
use crate::core::interface::Interface;
use cordebug_sys::HRESULT;
use std::ptr;

/// Runs a native call that returns one interface through an out-parameter and
/// wraps the result. A null result is `Ok(None)`.
pub(crate) fn out_interface<T: Interface>(
    owner: &ComPtr,
    call: &'static str,
    invoke: impl FnOnce(*mut *mut T::Raw) -> HRESULT,
) -> DebugResult<Option<T>> {
    let mut out: *mut T::Raw = ptr::null_mut();
    HResult(invoke(&raw mut out)).check(call)?;
    Ok(unsafe { owner.wrap_out::<T>(out) })
}
