//! Reference-tracked wrappers over the `ICorDebug` interop interfaces.
//!
//! Native debugger objects are reference counted and reached through raw
//! interface pointers. This crate never hands those pointers to callers.
//! Instead every pointer is adopted by a wrapper type (see [`wrappers`]) that:
//!
//! - releases its reference exactly once, on [`Interface::release`] or drop,
//! - reports its lifetime to the session's [`ResourceRegistry`],
//! - compares equal to another wrapper of the same kind over the same object,
//! - can be narrowed to another interface through [`Cast`].
//!
//! # Example
//!
//! ```ignore
//! use cordebug_core::prelude::*;
//!
//! let session = DebugSession::start(SessionConfig::default());
//! let chains: ChainEnum = unsafe { session.wrap(raw_chain_enum) }.expect("non-null");
//!
//! for chain in chains.items(8) {
//!     let chain = chain?;
//!     if let Some(frame) = chain.active_frame()? {
//!         if let Some(il) = frame.as_kind::<IlFrame>() {
//!             println!("IL offset {:?}", il.ip()?);
//!         }
//!     }
//! }
//! drop(chains);
//! assert!(session.shutdown().is_clean());
//! ```

pub mod core;
pub mod types;
pub mod wrappers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cordebug_sys as sys;

pub use crate::core::cast::Cast;
pub use crate::core::enumerator::{EnumCursor, EnumerationBatch, Enumerator, Items, NEXT_CHUNK};
pub use crate::core::error::{DebugError, DebugResult, HResult, KnownHResult};
pub use crate::core::interface::{Interface, same_handle};
pub use crate::core::registry::{LeakRecord, LeakReport, RegistryStats, ResourceRegistry};
pub use crate::core::session::{DebugSession, LeakPolicy, ReleaseQueue, SessionConfig};

pub mod prelude {
    pub use crate::core::cast::Cast;
    pub use crate::core::enumerator::{EnumCursor, EnumerationBatch, Enumerator};
    pub use crate::core::error::{DebugError, DebugResult, HResult};
    pub use crate::core::interface::{Interface, same_handle};
    pub use crate::core::registry::{LeakReport, ResourceRegistry};
    pub use crate::core::session::{DebugSession, LeakPolicy, SessionConfig};
    pub use crate::types::flags::{ChainReason, MappingResult};
    pub use crate::types::kind::{HandleId, WrapperKind};
    pub use crate::wrappers::chain::Chain;
    pub use crate::wrappers::enums::{ChainEnum, CorEnum, FrameEnum};
    pub use crate::wrappers::frame::{Frame, FrameOps, IlFrame, NativeFrame};
}
