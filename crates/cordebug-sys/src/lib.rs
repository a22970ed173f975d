//! Raw ABI for the `ICorDebug` interop interfaces.
//!
//! Every interface is a pointer to a structure whose first field is a pointer
//! to its vtable. Derived interfaces embed the vtable of their base as the
//! first field (`base`), so a pointer to a derived interface is also a valid
//! pointer to every interface it inherits from.
//!
//! Methods take `this` as an untyped pointer. Out-parameters that return
//! interface pointers hand the caller one reference which must be balanced by
//! a call to `Release`.

#![allow(non_snake_case, non_camel_case_types, clippy::upper_case_acronyms)]

use std::ffi::c_void;

pub type HRESULT = i32;
pub type ULONG = u32;
pub type ULONG32 = u32;
pub type DWORD = u32;
pub type BOOL = i32;
pub type mdMethodDef = u32;
pub type CORDB_ADDRESS = u64;
pub type CorDebugChainReason = u32;
pub type CorDebugMappingResult = u32;

// ========== HRESULT CODES ==========

pub const S_OK: HRESULT = 0;
pub const S_FALSE: HRESULT = 1;
pub const E_NOTIMPL: HRESULT = 0x8000_4001_u32 as i32;
pub const E_NOINTERFACE: HRESULT = 0x8000_4002_u32 as i32;
pub const E_POINTER: HRESULT = 0x8000_4003_u32 as i32;
pub const E_ABORT: HRESULT = 0x8000_4004_u32 as i32;
pub const E_FAIL: HRESULT = 0x8000_4005_u32 as i32;
pub const E_UNEXPECTED: HRESULT = 0x8000_FFFF_u32 as i32;
pub const E_OUTOFMEMORY: HRESULT = 0x8007_000E_u32 as i32;
pub const E_INVALIDARG: HRESULT = 0x8007_0057_u32 as i32;
pub const CORDBG_E_PROCESS_TERMINATED: HRESULT = 0x8013_1301_u32 as i32;
pub const CORDBG_E_OBJECT_NEUTERED: HRESULT = 0x8013_134F_u32 as i32;
pub const CORDBG_E_CANT_SET_IP_INTO_FINALLY: HRESULT = 0x8013_1309_u32 as i32;

/// Returns true when `hr` is a success code (including `S_FALSE`).
#[inline]
pub const fn SUCCEEDED(hr: HRESULT) -> bool {
    hr >= 0
}

/// Returns true when `hr` is a failure code.
#[inline]
pub const fn FAILED(hr: HRESULT) -> bool {
    hr < 0
}

// ========== INTERFACE IDENTITY ==========

/// A 128-bit interface identifier.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GUID {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl GUID {
    /// Builds a GUID from its canonical big-endian 128-bit form, i.e.
    /// `0x00000000_0000_0000_C000_000000000046` for `IUnknown`.
    pub const fn from_u128(uuid: u128) -> Self {
        Self {
            data1: (uuid >> 96) as u32,
            data2: (uuid >> 80 & 0xffff) as u16,
            data3: (uuid >> 64 & 0xffff) as u16,
            data4: (uuid as u64).to_be_bytes(),
        }
    }
}

impl std::fmt::Display for GUID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1]
        )?;
        for byte in &self.data4[2..] {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

pub type REFIID = *const GUID;

pub const IID_IUnknown: GUID = GUID::from_u128(0x00000000_0000_0000_C000_000000000046);
pub const IID_ICorDebugEnum: GUID = GUID::from_u128(0xCC7BCB01_8A68_11D2_983C_0000F808342D);
pub const IID_ICorDebugChainEnum: GUID = GUID::from_u128(0xCC7BCB08_8A68_11D2_983C_0000F808342D);
pub const IID_ICorDebugFrameEnum: GUID = GUID::from_u128(0xCC7BCB07_8A68_11D2_983C_0000F808342D);
pub const IID_ICorDebugChain: GUID = GUID::from_u128(0xCC7BCAEE_8A68_11D2_983C_0000F808342D);
pub const IID_ICorDebugFrame: GUID = GUID::from_u128(0xCC7BCAEF_8A68_11D2_983C_0000F808342D);
pub const IID_ICorDebugILFrame: GUID = GUID::from_u128(0x03E26311_4F76_11D3_88C6_006097945418);
pub const IID_ICorDebugNativeFrame: GUID =
    GUID::from_u128(0x03E26314_4F76_11D3_88C6_006097945418);

// ========== CHAIN REASONS / MAPPING RESULTS ==========

pub const CHAIN_NONE: CorDebugChainReason = 0x000;
pub const CHAIN_CLASS_INIT: CorDebugChainReason = 0x001;
pub const CHAIN_EXCEPTION_FILTER: CorDebugChainReason = 0x002;
pub const CHAIN_SECURITY: CorDebugChainReason = 0x004;
pub const CHAIN_CONTEXT_POLICY: CorDebugChainReason = 0x008;
pub const CHAIN_INTERCEPTION: CorDebugChainReason = 0x010;
pub const CHAIN_PROCESS_START: CorDebugChainReason = 0x020;
pub const CHAIN_THREAD_START: CorDebugChainReason = 0x040;
pub const CHAIN_ENTER_MANAGED: CorDebugChainReason = 0x080;
pub const CHAIN_ENTER_UNMANAGED: CorDebugChainReason = 0x100;
pub const CHAIN_DEBUGGER_EVAL: CorDebugChainReason = 0x200;
pub const CHAIN_CONTEXT_SWITCH: CorDebugChainReason = 0x400;
pub const CHAIN_FUNC_EVAL: CorDebugChainReason = 0x800;

pub const MAPPING_PROLOG: CorDebugMappingResult = 0x01;
pub const MAPPING_EPILOG: CorDebugMappingResult = 0x02;
pub const MAPPING_NO_INFO: CorDebugMappingResult = 0x04;
pub const MAPPING_UNMAPPED_ADDRESS: CorDebugMappingResult = 0x08;
pub const MAPPING_EXACT: CorDebugMappingResult = 0x10;
pub const MAPPING_APPROXIMATE: CorDebugMappingResult = 0x20;

// ========== IUnknown ==========

#[repr(C)]
pub struct IUnknownVtbl {
    pub QueryInterface: unsafe extern "system" fn(
        this: *mut c_void,
        riid: REFIID,
        ppvObject: *mut *mut c_void,
    ) -> HRESULT,
    pub AddRef: unsafe extern "system" fn(this: *mut c_void) -> ULONG,
    pub Release: unsafe extern "system" fn(this: *mut c_void) -> ULONG,
}

#[repr(C)]
pub struct IUnknown {
    pub lpVtbl: *const IUnknownVtbl,
}

// ========== ENUMERATORS ==========

/// `Next` slot shared by every typed enumerator; `T` is the element interface.
pub type EnumNextFn<T> = unsafe extern "system" fn(
    this: *mut c_void,
    celt: ULONG,
    items: *mut *mut T,
    pceltFetched: *mut ULONG,
) -> HRESULT;

#[repr(C)]
pub struct ICorDebugEnumVtbl {
    pub base: IUnknownVtbl,
    pub Skip: unsafe extern "system" fn(this: *mut c_void, celt: ULONG) -> HRESULT,
    pub Reset: unsafe extern "system" fn(this: *mut c_void) -> HRESULT,
    pub Clone:
        unsafe extern "system" fn(this: *mut c_void, ppEnum: *mut *mut ICorDebugEnum) -> HRESULT,
    pub GetCount: unsafe extern "system" fn(this: *mut c_void, pcelt: *mut ULONG) -> HRESULT,
}

#[repr(C)]
pub struct ICorDebugEnum {
    pub lpVtbl: *const ICorDebugEnumVtbl,
}

#[repr(C)]
pub struct ICorDebugChainEnumVtbl {
    pub base: ICorDebugEnumVtbl,
    pub Next: EnumNextFn<ICorDebugChain>,
}

#[repr(C)]
pub struct ICorDebugChainEnum {
    pub lpVtbl: *const ICorDebugChainEnumVtbl,
}

#[repr(C)]
pub struct ICorDebugFrameEnumVtbl {
    pub base: ICorDebugEnumVtbl,
    pub Next: EnumNextFn<ICorDebugFrame>,
}

#[repr(C)]
pub struct ICorDebugFrameEnum {
    pub lpVtbl: *const ICorDebugFrameEnumVtbl,
}

// ========== ICorDebugChain ==========

/// Out-parameters typed `*mut *mut c_void` return interfaces that have no
/// declaration in this crate (threads, contexts, register sets).
#[repr(C)]
pub struct ICorDebugChainVtbl {
    pub base: IUnknownVtbl,
    pub GetThread: unsafe extern "system" fn(this: *mut c_void, ppThread: *mut *mut c_void) -> HRESULT,
    pub GetStackRange: unsafe extern "system" fn(
        this: *mut c_void,
        pStart: *mut CORDB_ADDRESS,
        pEnd: *mut CORDB_ADDRESS,
    ) -> HRESULT,
    pub GetContext:
        unsafe extern "system" fn(this: *mut c_void, ppContext: *mut *mut c_void) -> HRESULT,
    pub GetCaller:
        unsafe extern "system" fn(this: *mut c_void, ppChain: *mut *mut ICorDebugChain) -> HRESULT,
    pub GetCallee:
        unsafe extern "system" fn(this: *mut c_void, ppChain: *mut *mut ICorDebugChain) -> HRESULT,
    pub GetPrevious:
        unsafe extern "system" fn(this: *mut c_void, ppChain: *mut *mut ICorDebugChain) -> HRESULT,
    pub GetNext:
        unsafe extern "system" fn(this: *mut c_void, ppChain: *mut *mut ICorDebugChain) -> HRESULT,
    pub IsManaged: unsafe extern "system" fn(this: *mut c_void, pManaged: *mut BOOL) -> HRESULT,
    pub EnumerateFrames: unsafe extern "system" fn(
        this: *mut c_void,
        ppFrames: *mut *mut ICorDebugFrameEnum,
    ) -> HRESULT,
    pub GetActiveFrame:
        unsafe extern "system" fn(this: *mut c_void, ppFrame: *mut *mut ICorDebugFrame) -> HRESULT,
    pub GetRegisterSet:
        unsafe extern "system" fn(this: *mut c_void, ppRegisters: *mut *mut c_void) -> HRESULT,
    pub GetReason: unsafe extern "system" fn(
        this: *mut c_void,
        pReason: *mut CorDebugChainReason,
    ) -> HRESULT,
}

#[repr(C)]
pub struct ICorDebugChain {
    pub lpVtbl: *const ICorDebugChainVtbl,
}

// ========== ICorDebugFrame ==========

#[repr(C)]
pub struct ICorDebugFrameVtbl {
    pub base: IUnknownVtbl,
    pub GetChain:
        unsafe extern "system" fn(this: *mut c_void, ppChain: *mut *mut ICorDebugChain) -> HRESULT,
    pub GetCode: unsafe extern "system" fn(this: *mut c_void, ppCode: *mut *mut c_void) -> HRESULT,
    pub GetFunction:
        unsafe extern "system" fn(this: *mut c_void, ppFunction: *mut *mut c_void) -> HRESULT,
    pub GetFunctionToken:
        unsafe extern "system" fn(this: *mut c_void, pToken: *mut mdMethodDef) -> HRESULT,
    pub GetStackRange: unsafe extern "system" fn(
        this: *mut c_void,
        pStart: *mut CORDB_ADDRESS,
        pEnd: *mut CORDB_ADDRESS,
    ) -> HRESULT,
    pub GetCaller:
        unsafe extern "system" fn(this: *mut c_void, ppFrame: *mut *mut ICorDebugFrame) -> HRESULT,
    pub GetCallee:
        unsafe extern "system" fn(this: *mut c_void, ppFrame: *mut *mut ICorDebugFrame) -> HRESULT,
    pub CreateStepper:
        unsafe extern "system" fn(this: *mut c_void, ppStepper: *mut *mut c_void) -> HRESULT,
}

#[repr(C)]
pub struct ICorDebugFrame {
    pub lpVtbl: *const ICorDebugFrameVtbl,
}

#[repr(C)]
pub struct ICorDebugILFrameVtbl {
    pub base: ICorDebugFrameVtbl,
    pub GetIP: unsafe extern "system" fn(
        this: *mut c_void,
        pnOffset: *mut ULONG32,
        pMappingResult: *mut CorDebugMappingResult,
    ) -> HRESULT,
    pub SetIP: unsafe extern "system" fn(this: *mut c_void, nOffset: ULONG32) -> HRESULT,
    pub EnumerateLocalVariables:
        unsafe extern "system" fn(this: *mut c_void, ppValueEnum: *mut *mut c_void) -> HRESULT,
    pub GetLocalVariable: unsafe extern "system" fn(
        this: *mut c_void,
        dwIndex: DWORD,
        ppValue: *mut *mut c_void,
    ) -> HRESULT,
    pub EnumerateArguments:
        unsafe extern "system" fn(this: *mut c_void, ppValueEnum: *mut *mut c_void) -> HRESULT,
    pub GetArgument: unsafe extern "system" fn(
        this: *mut c_void,
        dwIndex: DWORD,
        ppValue: *mut *mut c_void,
    ) -> HRESULT,
    pub GetStackDepth: unsafe extern "system" fn(this: *mut c_void, pDepth: *mut ULONG32) -> HRESULT,
    pub GetStackValue: unsafe extern "system" fn(
        this: *mut c_void,
        dwIndex: DWORD,
        ppValue: *mut *mut c_void,
    ) -> HRESULT,
    pub CanSetIP: unsafe extern "system" fn(this: *mut c_void, nOffset: ULONG32) -> HRESULT,
}

#[repr(C)]
pub struct ICorDebugILFrame {
    pub lpVtbl: *const ICorDebugILFrameVtbl,
}

/// Leading slots of `ICorDebugNativeFrame`. The register accessors that follow
/// `GetRegisterSet` in the native header are not declared.
#[repr(C)]
pub struct ICorDebugNativeFrameVtbl {
    pub base: ICorDebugFrameVtbl,
    pub GetIP: unsafe extern "system" fn(this: *mut c_void, pnOffset: *mut ULONG32) -> HRESULT,
    pub SetIP: unsafe extern "system" fn(this: *mut c_void, nOffset: ULONG32) -> HRESULT,
    pub GetRegisterSet:
        unsafe extern "system" fn(this: *mut c_void, ppRegisters: *mut *mut c_void) -> HRESULT,
}

#[repr(C)]
pub struct ICorDebugNativeFrame {
    pub lpVtbl: *const ICorDebugNativeFrameVtbl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_from_u128_splits_fields() {
        assert_eq!(IID_IUnknown.data1, 0);
        assert_eq!(IID_IUnknown.data4, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);
        assert_eq!(IID_ICorDebugChain.data1, 0xCC7BCAEE);
        assert_eq!(IID_ICorDebugChain.data2, 0x8A68);
        assert_eq!(IID_ICorDebugChain.data3, 0x11D2);
    }

    #[test]
    fn guid_display_is_canonical() {
        assert_eq!(
            IID_ICorDebugILFrame.to_string(),
            "03E26311-4F76-11D3-88C6-006097945418"
        );
    }

    #[test]
    fn success_and_failure_codes() {
        assert!(SUCCEEDED(S_OK));
        assert!(SUCCEEDED(S_FALSE));
        assert!(FAILED(E_NOINTERFACE));
        assert!(FAILED(CORDBG_E_OBJECT_NEUTERED));
    }

    #[test]
    fn derived_vtables_start_with_base() {
        use std::mem::{offset_of, size_of};
        assert_eq!(offset_of!(ICorDebugILFrameVtbl, base), 0);
        assert_eq!(
            offset_of!(ICorDebugChainEnumVtbl, Next),
            size_of::<ICorDebugEnumVtbl>()
        );
    }
}
