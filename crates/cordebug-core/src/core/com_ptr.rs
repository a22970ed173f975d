use crate::core::error::{DebugError, DebugResult, HResult};
use crate::core::registry::ResourceRegistry;
use crate::types::kind::{HandleId, WrapperKind};
use cordebug_sys::{E_NOINTERFACE, IUnknownVtbl};
use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// One owned reference to a native interface, tracked in a [`ResourceRegistry`].
///
/// Every wrapper type stores exactly one `ComPtr`. The pointer itself never
/// leaves the crate; callers only ever see its [`HandleId`].
///
/// # Object Lifecycle
///
/// A `ComPtr` adopts one native reference when it is created and gives it back
/// with `Release` exactly once, either through [`ComPtr::release`] or on drop.
/// After that it is in the released state and every call through it fails with
/// [`DebugError::Released`].
pub struct ComPtr {
    raw: Option<NonNull<c_void>>,
    kind: WrapperKind,
    registry: Arc<ResourceRegistry>,
}

impl ComPtr {
    /// Takes ownership of one reference on `raw`. Returns `None` for null.
    ///
    /// # Safety
    /// `raw` must be null or a live interface pointer whose vtable matches
    /// `kind`, and the caller must own the reference being handed over.
    pub(crate) unsafe fn adopt(
        raw: *mut c_void,
        kind: WrapperKind,
        registry: &Arc<ResourceRegistry>,
    ) -> Option<Self> {
        let raw = NonNull::new(raw)?;
        registry.track(HandleId::from_ptr(raw.as_ptr()), kind);
        Some(Self {
            raw: Some(raw),
            kind,
            registry: Arc::clone(registry),
        })
    }

    pub(crate) fn as_raw(&self) -> DebugResult<NonNull<c_void>> {
        self.raw.ok_or(DebugError::Released {
            kind: self.kind.name(),
        })
    }

    /// Reads the vtable of the live object as `V`.
    ///
    /// # Safety
    /// `V` must be the vtable layout of this pointer's interface, or a prefix of it.
    pub(crate) unsafe fn vtable<V>(&self) -> DebugResult<(*mut c_void, &V)> {
        let raw = self.as_raw()?;
        unsafe {
            let vtbl = *(raw.as_ptr() as *const *const V);
            Ok((raw.as_ptr(), &*vtbl))
        }
    }

    fn unknown(&self) -> DebugResult<(*mut c_void, &IUnknownVtbl)> {
        unsafe { self.vtable::<IUnknownVtbl>() }
    }

    /// Asks the native object for `target`.
    ///
    /// `Ok(None)` means the object answered `E_NOINTERFACE`; any other failure
    /// is returned as a native error.
    pub(crate) fn query(&self, target: WrapperKind) -> DebugResult<Option<ComPtr>> {
        let (this, vtbl) = self.unknown()?;
        let mut out: *mut c_void = ptr::null_mut();
        let hr = HResult(unsafe { (vtbl.QueryInterface)(this, target.iid(), &mut out) });
        if hr.code() == E_NOINTERFACE {
            return Ok(None);
        }
        hr.check("IUnknown::QueryInterface")?;
        match unsafe { ComPtr::adopt(out, target, &self.registry) } {
            Some(ptr) => Ok(Some(ptr)),
            None => Err(DebugError::NullOutput {
                call: "IUnknown::QueryInterface",
            }),
        }
    }

    /// A second owned reference on the same object, tracked separately.
    /// Duplicating a released pointer gives another released pointer.
    pub(crate) fn duplicate(&self) -> ComPtr {
        if let Ok((this, vtbl)) = self.unknown() {
            unsafe { (vtbl.AddRef)(this) };
            self.registry.track(HandleId::from_ptr(this), self.kind);
        }
        ComPtr {
            raw: self.raw,
            kind: self.kind,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Wraps an interface pointer returned through an out-parameter, sharing
    /// this pointer's registry.
    ///
    /// # Safety
    /// Same contract as [`Interface::wrap`](crate::core::interface::Interface::wrap).
    pub(crate) unsafe fn wrap_out<T: crate::core::interface::Interface>(
        &self,
        raw: *mut T::Raw,
    ) -> Option<T> {
        unsafe { T::wrap(raw, &self.registry) }
    }

    /// Gives the native reference back and stops tracking it.
    ///
    /// Returns `false` when the pointer was already released.
    pub fn release(&mut self) -> bool {
        let Some(raw) = self.raw.take() else {
            return false;
        };
        self.registry
            .release(HandleId::from_ptr(raw.as_ptr()), self.kind);
        unsafe {
            let vtbl = &**(raw.as_ptr() as *const *const IUnknownVtbl);
            (vtbl.Release)(raw.as_ptr());
        }
        true
    }

    pub fn is_released(&self) -> bool {
        self.raw.is_none()
    }

    pub fn handle_id(&self) -> Option<HandleId> {
        self.raw.map(|raw| HandleId::from_ptr(raw.as_ptr()))
    }

    pub fn kind(&self) -> WrapperKind {
        self.kind
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }
}

impl PartialEq for ComPtr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.raw == other.raw
    }
}

impl Eq for ComPtr {}

impl Hash for ComPtr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.handle_id().hash(state);
    }
}

impl fmt::Debug for ComPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle_id() {
            Some(handle) => write!(f, "{}({})", self.kind.name(), handle),
            None => write!(f, "{}(released)", self.kind.name()),
        }
    }
}

impl Drop for ComPtr {
    fn drop(&mut self) {
        self.release();
    }
}

// A ComPtr may be dropped on another thread (deferred release). Calls on one
// instance still require external synchronization, hence no `Sync`.
unsafe impl Send for ComPtr {}
