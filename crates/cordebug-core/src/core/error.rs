use cordebug_sys::{
    CORDBG_E_CANT_SET_IP_INTO_FINALLY, CORDBG_E_OBJECT_NEUTERED, CORDBG_E_PROCESS_TERMINATED,
    E_ABORT, E_FAIL, E_INVALIDARG, E_NOINTERFACE, E_NOTIMPL, E_OUTOFMEMORY, E_POINTER,
    E_UNEXPECTED, HRESULT,
};
use num_enum::TryFromPrimitive;
use std::fmt;
use thiserror::Error;

pub type DebugResult<T> = anyhow::Result<T, DebugError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugError {
    /// An operation was attempted on a wrapper whose handle has been released.
    #[error("{kind} used after its native handle was released")]
    Released { kind: &'static str },

    /// The native object does not implement the requested interface.
    #[error("native object behind {from} does not implement {to}")]
    Cast { from: &'static str, to: &'static str },

    /// A native call returned a failure code. The code is passed through untouched.
    #[error("{call} failed with {hresult}")]
    Native { call: &'static str, hresult: HResult },

    /// A native call reported success but left a mandatory out-pointer null.
    #[error("{call} succeeded but returned a null interface pointer")]
    NullOutput { call: &'static str },
}

impl DebugError {
    pub fn is_cast_failure(&self) -> bool {
        matches!(self, DebugError::Cast { .. })
    }

    pub fn is_released(&self) -> bool {
        matches!(self, DebugError::Released { .. })
    }

    /// The native failure code, if this error came from a native call.
    pub fn hresult(&self) -> Option<HResult> {
        match self {
            DebugError::Native { hresult, .. } => Some(*hresult),
            _ => None,
        }
    }
}

/// Failure codes the debugger runtime is known to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(i32)]
pub enum KnownHResult {
    NotImplemented = E_NOTIMPL,
    NoInterface = E_NOINTERFACE,
    InvalidPointer = E_POINTER,
    Aborted = E_ABORT,
    Fail = E_FAIL,
    Unexpected = E_UNEXPECTED,
    OutOfMemory = E_OUTOFMEMORY,
    InvalidArg = E_INVALIDARG,
    ProcessTerminated = CORDBG_E_PROCESS_TERMINATED,
    ObjectNeutered = CORDBG_E_OBJECT_NEUTERED,
    CantSetIpIntoFinally = CORDBG_E_CANT_SET_IP_INTO_FINALLY,
}

/// A native status code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HResult(pub HRESULT);

impl HResult {
    pub const OK: HResult = HResult(cordebug_sys::S_OK);
    pub const FALSE: HResult = HResult(cordebug_sys::S_FALSE);

    #[inline]
    pub const fn code(self) -> HRESULT {
        self.0
    }

    #[inline]
    pub const fn is_success(self) -> bool {
        cordebug_sys::SUCCEEDED(self.0)
    }

    /// `S_FALSE`: the call succeeded but did less than asked (e.g. an enumerator
    /// ran out of elements).
    #[inline]
    pub const fn is_false(self) -> bool {
        self.0 == cordebug_sys::S_FALSE
    }

    pub fn known(self) -> Option<KnownHResult> {
        KnownHResult::try_from(self.0).ok()
    }

    /// Maps a failure code to `DebugError::Native`, passing success codes through.
    pub fn check(self, call: &'static str) -> DebugResult<HResult> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DebugError::Native {
                call,
                hresult: self,
            })
        }
    }
}

impl From<HRESULT> for HResult {
    fn from(value: HRESULT) -> Self {
        HResult(value)
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known() {
            Some(known) => write!(f, "0x{:08X} ({:?})", self.0 as u32, known),
            None => write!(f, "0x{:08X}", self.0 as u32),
        }
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
