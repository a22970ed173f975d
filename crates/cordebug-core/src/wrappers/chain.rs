use crate::core::error::{DebugError, DebugResult, HResult};
use crate::core::interface::{Interface, com_interface};
use crate::types::flags::ChainReason;
use crate::wrappers::enums::FrameEnum;
use crate::wrappers::frame::Frame;
use crate::wrappers::out_interface;
use cordebug_sys::{BOOL, CORDB_ADDRESS, CorDebugChainReason};

com_interface! {
    /// A contiguous run of frames on one thread's stack.
    ///
    /// Chains are linked to the chains around them (`caller`, `callee`) and
    /// to the previous/next chain on the same thread. Managed chains expose
    /// their frames through [`Chain::enumerate_frames`].
    pub struct Chain => ICorDebugChain, ICorDebugChainVtbl, IID_ICorDebugChain;
}

impl Chain {
    /// The address range of the chain's stack segment, as `(start, end)`.
    pub fn stack_range(&self) -> DebugResult<(CORDB_ADDRESS, CORDB_ADDRESS)> {
        let (this, vtbl) = self.vtable()?;
        let (mut start, mut end): (CORDB_ADDRESS, CORDB_ADDRESS) = (0, 0);
        HResult(unsafe { (vtbl.GetStackRange)(this, &mut start, &mut end) })
            .check("ICorDebugChain::GetStackRange")?;
        Ok((start, end))
    }

    pub fn caller(&self) -> DebugResult<Option<Chain>> {
        let (this, vtbl) = self.vtable()?;
        out_interface(&self.ptr, "ICorDebugChain::GetCaller", |out| unsafe {
            (vtbl.GetCaller)(this, out)
        })
    }

    pub fn callee(&self) -> DebugResult<Option<Chain>> {
        let (this, vtbl) = self.vtable()?;
        out_interface(&self.ptr, "ICorDebugChain::GetCallee", |out| unsafe {
            (vtbl.GetCallee)(this, out)
        })
    }

    /// The chain before this one on the same thread.
    pub fn previous_chain(&self) -> DebugResult<Option<Chain>> {
        let (this, vtbl) = self.vtable()?;
        out_interface(&self.ptr, "ICorDebugChain::GetPrevious", |out| unsafe {
            (vtbl.GetPrevious)(this, out)
        })
    }

    /// The chain after this one on the same thread.
    pub fn next_chain(&self) -> DebugResult<Option<Chain>> {
        let (this, vtbl) = self.vtable()?;
        out_interface(&self.ptr, "ICorDebugChain::GetNext", |out| unsafe {
            (vtbl.GetNext)(this, out)
        })
    }

    pub fn is_managed(&self) -> DebugResult<bool> {
        let (this, vtbl) = self.vtable()?;
        let mut managed: BOOL = 0;
        HResult(unsafe { (vtbl.IsManaged)(this, &mut managed) })
            .check("ICorDebugChain::IsManaged")?;
        Ok(managed != 0)
    }

    pub fn enumerate_frames(&self) -> DebugResult<FrameEnum> {
        let (this, vtbl) = self.vtable()?;
        out_interface(&self.ptr, "ICorDebugChain::EnumerateFrames", |out| unsafe {
            (vtbl.EnumerateFrames)(this, out)
        })?
        .ok_or(DebugError::NullOutput {
            call: "ICorDebugChain::EnumerateFrames",
        })
    }

    /// The innermost frame, or `None` for chains without managed frames.
    pub fn active_frame(&self) -> DebugResult<Option<Frame>> {
        let (this, vtbl) = self.vtable()?;
        out_interface(&self.ptr, "ICorDebugChain::GetActiveFrame", |out| unsafe {
            (vtbl.GetActiveFrame)(this, out)
        })
    }

    pub fn reason(&self) -> DebugResult<ChainReason> {
        let (this, vtbl) = self.vtable()?;
        let mut reason: CorDebugChainReason = 0;
        HResult(unsafe { (vtbl.GetReason)(this, &mut reason) })
            .check("ICorDebugChain::GetReason")?;
        Ok(ChainReason::from_bits_retain(reason))
    }
}
