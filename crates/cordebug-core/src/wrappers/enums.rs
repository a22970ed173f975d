use crate::core::enumerator::{EnumCursor, Enumerator};
use crate::core::interface::com_interface;
use crate::wrappers::chain::Chain;
use crate::wrappers::frame::Frame;
use cordebug_sys::{EnumNextFn, ICorDebugChain, ICorDebugEnumVtbl, ICorDebugFrame};

com_interface! {
    /// The untyped base enumerator. Native `Clone` hands one of these back;
    /// narrow it with `cast_to` to get the typed enumerator.
    pub struct CorEnum => ICorDebugEnum, ICorDebugEnumVtbl, IID_ICorDebugEnum;
}

impl EnumCursor for CorEnum {
    fn enum_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugEnumVtbl {
        vtbl
    }
}

com_interface! {
    /// Enumerates the chains of a thread's stack, innermost first.
    pub struct ChainEnum => ICorDebugChainEnum, ICorDebugChainEnumVtbl, IID_ICorDebugChainEnum;
}

impl EnumCursor for ChainEnum {
    fn enum_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugEnumVtbl {
        &vtbl.base
    }
}

impl Enumerator for ChainEnum {
    type Item = Chain;

    const NEXT_CALL: &'static str = "ICorDebugChainEnum::Next";

    fn next_fn(vtbl: &Self::Vtbl) -> EnumNextFn<ICorDebugChain> {
        vtbl.Next
    }
}

com_interface! {
    /// Enumerates the frames of one chain.
    pub struct FrameEnum => ICorDebugFrameEnum, ICorDebugFrameEnumVtbl, IID_ICorDebugFrameEnum;
}

impl EnumCursor for FrameEnum {
    fn enum_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugEnumVtbl {
        &vtbl.base
    }
}

impl Enumerator for FrameEnum {
    type Item = Frame;

    const NEXT_CALL: &'static str = "ICorDebugFrameEnum::Next";

    fn next_fn(vtbl: &Self::Vtbl) -> EnumNextFn<ICorDebugFrame> {
        vtbl.Next
    }
}
