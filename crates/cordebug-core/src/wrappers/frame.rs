use crate::core::error::{DebugResult, HResult};
use crate::core::interface::{Interface, com_interface};
use crate::types::flags::MappingResult;
use crate::wrappers::chain::Chain;
use crate::wrappers::out_interface;
use cordebug_sys::{
    CORDB_ADDRESS, CorDebugMappingResult, ICorDebugFrameVtbl, S_OK, ULONG32, mdMethodDef,
};
use std::ffi::c_void;

com_interface! {
    /// One activation record on a chain.
    ///
    /// A frame is usually also an IL frame or a native frame; narrow it with
    /// [`Cast::as_kind`](crate::core::cast::Cast::as_kind) to reach the
    /// instruction pointer.
    pub struct Frame => ICorDebugFrame, ICorDebugFrameVtbl, IID_ICorDebugFrame;
}

com_interface! {
    /// A frame executing IL.
    pub struct IlFrame => ICorDebugILFrame, ICorDebugILFrameVtbl, IID_ICorDebugILFrame;
}

com_interface! {
    /// A frame executing native (jitted or unmanaged) code.
    pub struct NativeFrame => ICorDebugNativeFrame, ICorDebugNativeFrameVtbl, IID_ICorDebugNativeFrame;
}

/// Operations inherited from `ICorDebugFrame`.
pub trait FrameOps: Interface {
    #[doc(hidden)]
    fn frame_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugFrameVtbl;

    #[doc(hidden)]
    fn frame_entry(&self) -> DebugResult<(*mut c_void, &ICorDebugFrameVtbl)> {
        let (this, vtbl) = self.vtable()?;
        Ok((this, Self::frame_vtbl(vtbl)))
    }

    /// The chain this frame belongs to.
    fn chain(&self) -> DebugResult<Option<Chain>> {
        let (this, vtbl) = self.frame_entry()?;
        out_interface(self.com(), "ICorDebugFrame::GetChain", |out| unsafe {
            (vtbl.GetChain)(this, out)
        })
    }

    /// Metadata token of the method running in this frame.
    fn function_token(&self) -> DebugResult<mdMethodDef> {
        let (this, vtbl) = self.frame_entry()?;
        let mut token: mdMethodDef = 0;
        HResult(unsafe { (vtbl.GetFunctionToken)(this, &mut token) })
            .check("ICorDebugFrame::GetFunctionToken")?;
        Ok(token)
    }

    fn stack_range(&self) -> DebugResult<(CORDB_ADDRESS, CORDB_ADDRESS)> {
        let (this, vtbl) = self.frame_entry()?;
        let (mut start, mut end): (CORDB_ADDRESS, CORDB_ADDRESS) = (0, 0);
        HResult(unsafe { (vtbl.GetStackRange)(this, &mut start, &mut end) })
            .check("ICorDebugFrame::GetStackRange")?;
        Ok((start, end))
    }

    /// The frame that called this one, if it is on the same chain.
    fn caller(&self) -> DebugResult<Option<Frame>> {
        let (this, vtbl) = self.frame_entry()?;
        out_interface(self.com(), "ICorDebugFrame::GetCaller", |out| unsafe {
            (vtbl.GetCaller)(this, out)
        })
    }

    fn callee(&self) -> DebugResult<Option<Frame>> {
        let (this, vtbl) = self.frame_entry()?;
        out_interface(self.com(), "ICorDebugFrame::GetCallee", |out| unsafe {
            (vtbl.GetCallee)(this, out)
        })
    }
}

impl FrameOps for Frame {
    fn frame_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugFrameVtbl {
        vtbl
    }
}

impl FrameOps for IlFrame {
    fn frame_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugFrameVtbl {
        &vtbl.base
    }
}

impl FrameOps for NativeFrame {
    fn frame_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugFrameVtbl {
        &vtbl.base
    }
}

impl IlFrame {
    /// The IL offset of the instruction pointer and how precisely it maps.
    pub fn ip(&self) -> DebugResult<(u32, MappingResult)> {
        let (this, vtbl) = self.vtable()?;
        let mut offset: ULONG32 = 0;
        let mut mapping: CorDebugMappingResult = 0;
        HResult(unsafe { (vtbl.GetIP)(this, &mut offset, &mut mapping) })
            .check("ICorDebugILFrame::GetIP")?;
        Ok((offset, MappingResult::from_bits_retain(mapping)))
    }

    pub fn set_ip(&self, offset: u32) -> DebugResult<()> {
        let (this, vtbl) = self.vtable()?;
        HResult(unsafe { (vtbl.SetIP)(this, offset) }).check("ICorDebugILFrame::SetIP")?;
        Ok(())
    }

    /// Whether [`IlFrame::set_ip`] would succeed for `offset`.
    ///
    /// `S_OK` is yes and any other success code is no. A failure code is
    /// returned as an error, since it carries the reason the move is refused.
    pub fn can_set_ip(&self, offset: u32) -> DebugResult<bool> {
        let (this, vtbl) = self.vtable()?;
        let hr = HResult(unsafe { (vtbl.CanSetIP)(this, offset) }).check("ICorDebugILFrame::CanSetIP")?;
        Ok(hr.code() == S_OK)
    }

    /// Number of values on the evaluation stack.
    pub fn stack_depth(&self) -> DebugResult<u32> {
        let (this, vtbl) = self.vtable()?;
        let mut depth: ULONG32 = 0;
        HResult(unsafe { (vtbl.GetStackDepth)(this, &mut depth) })
            .check("ICorDebugILFrame::GetStackDepth")?;
        Ok(depth)
    }
}

impl NativeFrame {
    /// Offset of the instruction pointer from the start of the native code.
    pub fn ip(&self) -> DebugResult<u32> {
        let (this, vtbl) = self.vtable()?;
        let mut offset: ULONG32 = 0;
        HResult(unsafe { (vtbl.GetIP)(this, &mut offset) }).check("ICorDebugNativeFrame::GetIP")?;
        Ok(offset)
    }

    pub fn set_ip(&self, offset: u32) -> DebugResult<()> {
        let (this, vtbl) = self.vtable()?;
        HResult(unsafe { (vtbl.SetIP)(this, offset) }).check("ICorDebugNativeFrame::SetIP")?;
        Ok(())
    }
}
