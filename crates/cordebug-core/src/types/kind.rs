use cordebug_sys::GUID;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies one wrapper type and the native interface it mirrors.
///
/// Two kinds are equal when they share an interface identity.
#[derive(Clone, Copy)]
pub struct WrapperKind {
    name: &'static str,
    interface: &'static str,
    iid: GUID,
}

impl WrapperKind {
    pub const fn new(name: &'static str, interface: &'static str, iid: GUID) -> Self {
        Self {
            name,
            interface,
            iid,
        }
    }

    /// The Rust wrapper type name, e.g. `ChainEnum`.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The native interface name, e.g. `ICorDebugChainEnum`.
    pub const fn interface(&self) -> &'static str {
        self.interface
    }

    pub const fn iid(&self) -> &GUID {
        &self.iid
    }
}

impl PartialEq for WrapperKind {
    fn eq(&self, other: &Self) -> bool {
        self.iid == other.iid
    }
}

impl Eq for WrapperKind {}

impl Hash for WrapperKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.iid.hash(state);
    }
}

impl fmt::Debug for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.interface)
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of a native object: the address of its interface pointer.
///
/// Carries no ownership and cannot be turned back into a pointer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HandleId(usize);

impl HandleId {
    pub const NULL: HandleId = HandleId(0);

    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        HandleId(ptr as usize)
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({:#x})", self.0)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
