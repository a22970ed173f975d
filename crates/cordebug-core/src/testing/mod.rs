//! An in-process stand-in for the debugger runtime.
//!
//! [`MockProcess`] builds native-layout objects whose vtables are implemented
//! in Rust, so the wrapper layer can be driven without a debuggee. Objects are
//! reference counted the way the runtime's are: creation hands out one
//! reference, `QueryInterface` and enumerator `Next` hand out more, and the
//! object is freed when the last one is released.
//!
//! Every object is counted in the process heap, so a test can assert that all
//! native references were given back ([`MockProcess::live_objects`]).

use cordebug_sys::*;
use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct NativeHeap {
    live: AtomicUsize,
    created: AtomicUsize,
}

// ========== OBJECT LAYOUT ==========

/// Fields shared by every mock object. Sits first so the vtable pointer is at
/// offset zero, as the interface layout requires.
#[repr(C)]
struct Header {
    vtbl: *const c_void,
    refs: AtomicU32,
    interfaces: &'static [GUID],
    query_failure: Option<HRESULT>,
    heap: Arc<NativeHeap>,
}

impl Drop for Header {
    fn drop(&mut self) {
        self.heap.live.fetch_sub(1, Ordering::AcqRel);
    }
}

#[repr(C)]
struct MockObject<T> {
    header: Header,
    body: T,
}

impl<T> MockObject<T> {
    fn allocate(
        heap: &Arc<NativeHeap>,
        vtbl: *const c_void,
        interfaces: &'static [GUID],
        query_failure: Option<HRESULT>,
        body: T,
    ) -> *mut c_void {
        heap.live.fetch_add(1, Ordering::AcqRel);
        heap.created.fetch_add(1, Ordering::AcqRel);
        let object = Box::new(MockObject {
            header: Header {
                vtbl,
                refs: AtomicU32::new(1),
                interfaces,
                query_failure,
                heap: Arc::clone(heap),
            },
            body,
        });
        Box::into_raw(object).cast()
    }
}

unsafe fn header<'a>(this: *mut c_void) -> &'a Header {
    unsafe { &*(this as *const Header) }
}

unsafe fn body<'a, T>(this: *mut c_void) -> &'a T {
    unsafe { &(*(this as *const MockObject<T>)).body }
}

unsafe fn add_ref_raw(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let vtbl = &**(ptr as *const *const IUnknownVtbl);
        (vtbl.AddRef)(ptr);
    }
}

unsafe fn release_raw(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let vtbl = &**(ptr as *const *const IUnknownVtbl);
        (vtbl.Release)(ptr);
    }
}

/// Writes `value` to an out-parameter, adding the reference the caller will own.
unsafe fn hand_out<T>(out: *mut *mut T, value: *mut c_void) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    unsafe {
        add_ref_raw(value);
        *out = value.cast();
    }
    S_OK
}

// ========== IUnknown ==========

unsafe extern "system" fn query_interface(
    this: *mut c_void,
    riid: REFIID,
    out: *mut *mut c_void,
) -> HRESULT {
    if out.is_null() || riid.is_null() {
        return E_POINTER;
    }
    unsafe {
        *out = ptr::null_mut();
        let header = header(this);
        if let Some(failure) = header.query_failure {
            return failure;
        }
        let iid = &*riid;
        if *iid == IID_IUnknown || header.interfaces.contains(iid) {
            header.refs.fetch_add(1, Ordering::AcqRel);
            *out = this;
            S_OK
        } else {
            E_NOINTERFACE
        }
    }
}

unsafe extern "system" fn add_ref(this: *mut c_void) -> ULONG {
    unsafe { header(this).refs.fetch_add(1, Ordering::AcqRel) + 1 }
}

unsafe extern "system" fn release<T>(this: *mut c_void) -> ULONG {
    let header = unsafe { header(this) };
    let previous = header.refs.fetch_sub(1, Ordering::AcqRel);
    if previous == 1 {
        drop(unsafe { Box::from_raw(this as *mut MockObject<T>) });
    }
    previous - 1
}

const fn unknown<T>() -> IUnknownVtbl {
    IUnknownVtbl {
        QueryInterface: query_interface,
        AddRef: add_ref,
        Release: release::<T>,
    }
}

unsafe extern "system" fn not_implemented<T>(_this: *mut c_void, out: *mut *mut T) -> HRESULT {
    if !out.is_null() {
        unsafe { *out = ptr::null_mut() };
    }
    E_NOTIMPL
}

unsafe extern "system" fn not_implemented_at(
    this: *mut c_void,
    _index: DWORD,
    out: *mut *mut c_void,
) -> HRESULT {
    unsafe { not_implemented(this, out) }
}

unsafe extern "system" fn no_interface<T>(_this: *mut c_void, out: *mut *mut T) -> HRESULT {
    unsafe { hand_out(out, ptr::null_mut()) }
}

unsafe fn write_range(
    range: (CORDB_ADDRESS, CORDB_ADDRESS),
    start: *mut CORDB_ADDRESS,
    end: *mut CORDB_ADDRESS,
) -> HRESULT {
    if start.is_null() || end.is_null() {
        return E_POINTER;
    }
    unsafe {
        *start = range.0;
        *end = range.1;
    }
    S_OK
}

// ========== ENUMERATORS ==========

struct EnumBody {
    items: Vec<*mut c_void>,
    cursor: AtomicUsize,
    next_failure: Option<HRESULT>,
    /// Subtracted from the count `Next` reports, after the slots are written.
    under_report: ULONG,
}

impl Drop for EnumBody {
    fn drop(&mut self) {
        for item in self.items.drain(..) {
            unsafe { release_raw(item) };
        }
    }
}

static ENUM_INTERFACES_CHAIN: [GUID; 2] = [IID_ICorDebugEnum, IID_ICorDebugChainEnum];
static ENUM_INTERFACES_FRAME: [GUID; 2] = [IID_ICorDebugEnum, IID_ICorDebugFrameEnum];

const ENUM_BASE: ICorDebugEnumVtbl = ICorDebugEnumVtbl {
    base: unknown::<EnumBody>(),
    Skip: enum_skip,
    Reset: enum_reset,
    Clone: enum_clone,
    GetCount: enum_count,
};

static CHAIN_ENUM_VTBL: ICorDebugChainEnumVtbl = ICorDebugChainEnumVtbl {
    base: ENUM_BASE,
    Next: enum_next::<ICorDebugChain>,
};

static FRAME_ENUM_VTBL: ICorDebugFrameEnumVtbl = ICorDebugFrameEnumVtbl {
    base: ENUM_BASE,
    Next: enum_next::<ICorDebugFrame>,
};

unsafe extern "system" fn enum_next<R>(
    this: *mut c_void,
    celt: ULONG,
    items: *mut *mut R,
    fetched: *mut ULONG,
) -> HRESULT {
    let body = unsafe { body::<EnumBody>(this) };
    if let Some(failure) = body.next_failure {
        return failure;
    }
    if items.is_null() || (celt > 1 && fetched.is_null()) {
        return E_POINTER;
    }

    let start = body.cursor.load(Ordering::Acquire).min(body.items.len());
    let end = start.saturating_add(celt as usize).min(body.items.len());
    for (slot, &item) in body.items[start..end].iter().enumerate() {
        unsafe {
            add_ref_raw(item);
            *items.add(slot) = item.cast();
        }
    }
    body.cursor.store(end, Ordering::Release);

    let produced = ((end - start) as ULONG).saturating_sub(body.under_report);
    if !fetched.is_null() {
        unsafe { *fetched = produced };
    }
    if produced == celt { S_OK } else { S_FALSE }
}

unsafe extern "system" fn enum_skip(this: *mut c_void, celt: ULONG) -> HRESULT {
    let body = unsafe { body::<EnumBody>(this) };
    let target = body
        .cursor
        .load(Ordering::Acquire)
        .saturating_add(celt as usize);
    body.cursor
        .store(target.min(body.items.len()), Ordering::Release);
    if target > body.items.len() { S_FALSE } else { S_OK }
}

unsafe extern "system" fn enum_reset(this: *mut c_void) -> HRESULT {
    unsafe { body::<EnumBody>(this) }
        .cursor
        .store(0, Ordering::Release);
    S_OK
}

unsafe extern "system" fn enum_count(this: *mut c_void, count: *mut ULONG) -> HRESULT {
    if count.is_null() {
        return E_POINTER;
    }
    unsafe { *count = body::<EnumBody>(this).items.len() as ULONG };
    S_OK
}

unsafe extern "system" fn enum_clone(this: *mut c_void, out: *mut *mut ICorDebugEnum) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    let (header, body) = unsafe { (header(this), body::<EnumBody>(this)) };
    for &item in &body.items {
        unsafe { add_ref_raw(item) };
    }
    let copy = MockObject::allocate(
        &header.heap,
        header.vtbl,
        header.interfaces,
        None,
        EnumBody {
            items: body.items.clone(),
            cursor: AtomicUsize::new(body.cursor.load(Ordering::Acquire)),
            next_failure: body.next_failure,
            under_report: body.under_report,
        },
    );
    unsafe { *out = copy.cast() };
    S_OK
}

// ========== FRAMES ==========

/// Which frame interfaces a mock frame answers to besides `ICorDebugFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFlavor {
    #[default]
    Il,
    Native,
    /// Only `ICorDebugFrame`.
    Plain,
}

/// Description of a mock frame.
#[derive(Debug, Clone, Default)]
pub struct FrameSpec {
    pub flavor: FrameFlavor,
    pub function_token: mdMethodDef,
    pub stack_range: (CORDB_ADDRESS, CORDB_ADDRESS),
    pub ip: u32,
    pub mapping: CorDebugMappingResult,
    pub stack_depth: u32,
    /// Highest offset `SetIP` accepts.
    pub max_ip: u32,
    /// Calling frame. The new frame takes over this reference.
    pub caller: Option<*mut ICorDebugFrame>,
    /// When set, every `QueryInterface` on the frame fails with this code.
    pub query_failure: Option<HRESULT>,
}

struct FrameBody {
    function_token: mdMethodDef,
    stack_range: (CORDB_ADDRESS, CORDB_ADDRESS),
    ip: AtomicU32,
    mapping: CorDebugMappingResult,
    stack_depth: u32,
    max_ip: u32,
    caller: *mut c_void,
}

impl Drop for FrameBody {
    fn drop(&mut self) {
        unsafe { release_raw(self.caller) };
    }
}

static PLAIN_FRAME_INTERFACES: [GUID; 1] = [IID_ICorDebugFrame];
static IL_FRAME_INTERFACES: [GUID; 2] = [IID_ICorDebugFrame, IID_ICorDebugILFrame];
static NATIVE_FRAME_INTERFACES: [GUID; 2] = [IID_ICorDebugFrame, IID_ICorDebugNativeFrame];

const FRAME_BASE: ICorDebugFrameVtbl = ICorDebugFrameVtbl {
    base: unknown::<FrameBody>(),
    GetChain: not_implemented::<ICorDebugChain>,
    GetCode: not_implemented::<c_void>,
    GetFunction: not_implemented::<c_void>,
    GetFunctionToken: frame_function_token,
    GetStackRange: frame_stack_range,
    GetCaller: frame_caller,
    GetCallee: no_interface::<ICorDebugFrame>,
    CreateStepper: not_implemented::<c_void>,
};

static PLAIN_FRAME_VTBL: ICorDebugFrameVtbl = FRAME_BASE;

static IL_FRAME_VTBL: ICorDebugILFrameVtbl = ICorDebugILFrameVtbl {
    base: FRAME_BASE,
    GetIP: il_frame_ip,
    SetIP: frame_set_ip,
    EnumerateLocalVariables: not_implemented::<c_void>,
    GetLocalVariable: not_implemented_at,
    EnumerateArguments: not_implemented::<c_void>,
    GetArgument: not_implemented_at,
    GetStackDepth: il_frame_stack_depth,
    GetStackValue: not_implemented_at,
    CanSetIP: il_frame_can_set_ip,
};

static NATIVE_FRAME_VTBL: ICorDebugNativeFrameVtbl = ICorDebugNativeFrameVtbl {
    base: FRAME_BASE,
    GetIP: native_frame_ip,
    SetIP: frame_set_ip,
    GetRegisterSet: not_implemented::<c_void>,
};

unsafe extern "system" fn frame_function_token(
    this: *mut c_void,
    token: *mut mdMethodDef,
) -> HRESULT {
    if token.is_null() {
        return E_POINTER;
    }
    unsafe { *token = body::<FrameBody>(this).function_token };
    S_OK
}

unsafe extern "system" fn frame_stack_range(
    this: *mut c_void,
    start: *mut CORDB_ADDRESS,
    end: *mut CORDB_ADDRESS,
) -> HRESULT {
    unsafe { write_range(body::<FrameBody>(this).stack_range, start, end) }
}

unsafe extern "system" fn frame_caller(this: *mut c_void, out: *mut *mut ICorDebugFrame) -> HRESULT {
    unsafe { hand_out(out, body::<FrameBody>(this).caller) }
}

unsafe extern "system" fn frame_set_ip(this: *mut c_void, offset: ULONG32) -> HRESULT {
    let body = unsafe { body::<FrameBody>(this) };
    if offset > body.max_ip {
        return E_INVALIDARG;
    }
    body.ip.store(offset, Ordering::Release);
    S_OK
}

unsafe extern "system" fn il_frame_ip(
    this: *mut c_void,
    offset: *mut ULONG32,
    mapping: *mut CorDebugMappingResult,
) -> HRESULT {
    if offset.is_null() || mapping.is_null() {
        return E_POINTER;
    }
    let body = unsafe { body::<FrameBody>(this) };
    unsafe {
        *offset = body.ip.load(Ordering::Acquire);
        *mapping = body.mapping;
    }
    S_OK
}

unsafe extern "system" fn il_frame_stack_depth(this: *mut c_void, depth: *mut ULONG32) -> HRESULT {
    if depth.is_null() {
        return E_POINTER;
    }
    unsafe { *depth = body::<FrameBody>(this).stack_depth };
    S_OK
}

unsafe extern "system" fn il_frame_can_set_ip(this: *mut c_void, offset: ULONG32) -> HRESULT {
    if offset > unsafe { body::<FrameBody>(this) }.max_ip {
        S_FALSE
    } else {
        S_OK
    }
}

unsafe extern "system" fn native_frame_ip(this: *mut c_void, offset: *mut ULONG32) -> HRESULT {
    if offset.is_null() {
        return E_POINTER;
    }
    unsafe { *offset = body::<FrameBody>(this).ip.load(Ordering::Acquire) };
    S_OK
}

// ========== CHAINS ==========

/// Description of a mock chain.
#[derive(Debug, Clone, Default)]
pub struct ChainSpec {
    pub managed: bool,
    pub reason: CorDebugChainReason,
    pub stack_range: (CORDB_ADDRESS, CORDB_ADDRESS),
    /// Frames, innermost first. The chain takes over these references.
    pub frames: Vec<*mut ICorDebugFrame>,
    /// Calling chain. The chain takes over this reference.
    pub caller: Option<*mut ICorDebugChain>,
    pub query_failure: Option<HRESULT>,
}

struct ChainBody {
    managed: bool,
    reason: CorDebugChainReason,
    stack_range: (CORDB_ADDRESS, CORDB_ADDRESS),
    frames: Vec<*mut c_void>,
    caller: *mut c_void,
}

impl Drop for ChainBody {
    fn drop(&mut self) {
        for frame in self.frames.drain(..) {
            unsafe { release_raw(frame) };
        }
        unsafe { release_raw(self.caller) };
    }
}

static CHAIN_INTERFACES: [GUID; 1] = [IID_ICorDebugChain];

static CHAIN_VTBL: ICorDebugChainVtbl = ICorDebugChainVtbl {
    base: unknown::<ChainBody>(),
    GetThread: not_implemented::<c_void>,
    GetStackRange: chain_stack_range,
    GetContext: not_implemented::<c_void>,
    GetCaller: chain_caller,
    GetCallee: no_interface::<ICorDebugChain>,
    GetPrevious: no_interface::<ICorDebugChain>,
    GetNext: no_interface::<ICorDebugChain>,
    IsManaged: chain_is_managed,
    EnumerateFrames: chain_enumerate_frames,
    GetActiveFrame: chain_active_frame,
    GetRegisterSet: not_implemented::<c_void>,
    GetReason: chain_reason,
};

unsafe extern "system" fn chain_stack_range(
    this: *mut c_void,
    start: *mut CORDB_ADDRESS,
    end: *mut CORDB_ADDRESS,
) -> HRESULT {
    unsafe { write_range(body::<ChainBody>(this).stack_range, start, end) }
}

unsafe extern "system" fn chain_caller(this: *mut c_void, out: *mut *mut ICorDebugChain) -> HRESULT {
    unsafe { hand_out(out, body::<ChainBody>(this).caller) }
}

unsafe extern "system" fn chain_is_managed(this: *mut c_void, managed: *mut BOOL) -> HRESULT {
    if managed.is_null() {
        return E_POINTER;
    }
    unsafe { *managed = BOOL::from(body::<ChainBody>(this).managed) };
    S_OK
}

unsafe extern "system" fn chain_enumerate_frames(
    this: *mut c_void,
    out: *mut *mut ICorDebugFrameEnum,
) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    let (header, body) = unsafe { (header(this), body::<ChainBody>(this)) };
    for &frame in &body.frames {
        unsafe { add_ref_raw(frame) };
    }
    let frames = new_enum(
        &header.heap,
        &FRAME_ENUM_VTBL as *const ICorDebugFrameEnumVtbl as *const c_void,
        &ENUM_INTERFACES_FRAME,
        body.frames.clone(),
        None,
        0,
    );
    unsafe { *out = frames.cast() };
    S_OK
}

unsafe extern "system" fn chain_active_frame(
    this: *mut c_void,
    out: *mut *mut ICorDebugFrame,
) -> HRESULT {
    let body = unsafe { body::<ChainBody>(this) };
    let active = body.frames.first().copied().unwrap_or(ptr::null_mut());
    unsafe { hand_out(out, active) }
}

unsafe extern "system" fn chain_reason(
    this: *mut c_void,
    reason: *mut CorDebugChainReason,
) -> HRESULT {
    if reason.is_null() {
        return E_POINTER;
    }
    unsafe { *reason = body::<ChainBody>(this).reason };
    S_OK
}

fn new_enum(
    heap: &Arc<NativeHeap>,
    vtbl: *const c_void,
    interfaces: &'static [GUID],
    items: Vec<*mut c_void>,
    next_failure: Option<HRESULT>,
    under_report: ULONG,
) -> *mut c_void {
    MockObject::allocate(
        heap,
        vtbl,
        interfaces,
        None,
        EnumBody {
            items,
            cursor: AtomicUsize::new(0),
            next_failure,
            under_report,
        },
    )
}

// ========== PROCESS ==========

/// Factory and accounting for mock native objects.
///
/// Every constructor returns a pointer carrying one reference, ready to be
/// handed to `Interface::wrap`.
#[derive(Debug, Default)]
pub struct MockProcess {
    heap: Arc<NativeHeap>,
}

impl MockProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects allocated and not yet freed.
    pub fn live_objects(&self) -> usize {
        self.heap.live.load(Ordering::Acquire)
    }

    /// Objects allocated since the process was created.
    pub fn created_objects(&self) -> usize {
        self.heap.created.load(Ordering::Acquire)
    }

    pub fn frame(&self, spec: FrameSpec) -> *mut ICorDebugFrame {
        let (vtbl, interfaces): (*const c_void, &'static [GUID]) = match spec.flavor {
            FrameFlavor::Il => (
                &IL_FRAME_VTBL as *const ICorDebugILFrameVtbl as *const c_void,
                &IL_FRAME_INTERFACES,
            ),
            FrameFlavor::Native => (
                &NATIVE_FRAME_VTBL as *const ICorDebugNativeFrameVtbl as *const c_void,
                &NATIVE_FRAME_INTERFACES,
            ),
            FrameFlavor::Plain => (
                &PLAIN_FRAME_VTBL as *const ICorDebugFrameVtbl as *const c_void,
                &PLAIN_FRAME_INTERFACES,
            ),
        };
        MockObject::allocate(
            &self.heap,
            vtbl,
            interfaces,
            spec.query_failure,
            FrameBody {
                function_token: spec.function_token,
                stack_range: spec.stack_range,
                ip: AtomicU32::new(spec.ip),
                mapping: spec.mapping,
                stack_depth: spec.stack_depth,
                max_ip: spec.max_ip,
                caller: spec.caller.map_or(ptr::null_mut(), |caller| caller.cast()),
            },
        )
        .cast()
    }

    pub fn chain(&self, spec: ChainSpec) -> *mut ICorDebugChain {
        MockObject::allocate(
            &self.heap,
            &CHAIN_VTBL as *const ICorDebugChainVtbl as *const c_void,
            &CHAIN_INTERFACES,
            spec.query_failure,
            ChainBody {
                managed: spec.managed,
                reason: spec.reason,
                stack_range: spec.stack_range,
                frames: spec.frames.into_iter().map(|frame| frame.cast()).collect(),
                caller: spec.caller.map_or(ptr::null_mut(), |caller| caller.cast()),
            },
        )
        .cast()
    }

    /// An enumerator over `chains`, taking over their references.
    pub fn chain_enum(&self, chains: Vec<*mut ICorDebugChain>) -> *mut ICorDebugChainEnum {
        self.chain_enum_with(chains, None, 0)
    }

    /// Like [`MockProcess::chain_enum`], but every `Next` fails with `failure`.
    pub fn failing_chain_enum(
        &self,
        chains: Vec<*mut ICorDebugChain>,
        failure: HRESULT,
    ) -> *mut ICorDebugChainEnum {
        self.chain_enum_with(chains, Some(failure), 0)
    }

    /// Like [`MockProcess::chain_enum`], but `Next` reports `by` fewer
    /// elements than it wrote, leaving referenced pointers past the count.
    pub fn under_reporting_chain_enum(
        &self,
        chains: Vec<*mut ICorDebugChain>,
        by: u32,
    ) -> *mut ICorDebugChainEnum {
        self.chain_enum_with(chains, None, by)
    }

    fn chain_enum_with(
        &self,
        chains: Vec<*mut ICorDebugChain>,
        next_failure: Option<HRESULT>,
        under_report: ULONG,
    ) -> *mut ICorDebugChainEnum {
        new_enum(
            &self.heap,
            &CHAIN_ENUM_VTBL as *const ICorDebugChainEnumVtbl as *const c_void,
            &ENUM_INTERFACES_CHAIN,
            chains.into_iter().map(|chain| chain.cast()).collect(),
            next_failure,
            under_report,
        )
        .cast()
    }

    /// An enumerator over `frames`, taking over their references.
    pub fn frame_enum(&self, frames: Vec<*mut ICorDebugFrame>) -> *mut ICorDebugFrameEnum {
        new_enum(
            &self.heap,
            &FRAME_ENUM_VTBL as *const ICorDebugFrameEnumVtbl as *const c_void,
            &ENUM_INTERFACES_FRAME,
            frames.into_iter().map(|frame| frame.cast()).collect(),
            None,
            0,
        )
        .cast()
    }

    /// Adds a reference, as a second native owner would.
    ///
    /// # Safety
    /// `object` must be a live object created by a `MockProcess`.
    pub unsafe fn add_ref<T>(object: *mut T) -> u32 {
        unsafe { add_ref(object.cast()) }
    }

    /// Gives back one reference.
    ///
    /// # Safety
    /// `object` must be a live object created by a `MockProcess`, and the
    /// caller must own the reference being released.
    pub unsafe fn release<T>(object: *mut T) -> u32 {
        unsafe {
            let vtbl = &**(object as *const *const IUnknownVtbl);
            (vtbl.Release)(object.cast())
        }
    }

    /// Current reference count of a live object.
    ///
    /// # Safety
    /// `object` must be a live object created by a `MockProcess`.
    pub unsafe fn ref_count<T>(object: *mut T) -> u32 {
        unsafe { header(object.cast()).refs.load(Ordering::Acquire) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn query(object: *mut c_void, iid: &GUID) -> (HRESULT, *mut c_void) {
        let mut out = ptr::null_mut();
        let hr = unsafe {
            let vtbl = &**(object as *const *const IUnknownVtbl);
            (vtbl.QueryInterface)(object, iid, &mut out)
        };
        (hr, out)
    }

    #[test]
    fn last_release_frees_the_object() {
        let process = MockProcess::new();
        let frame = process.frame(FrameSpec::default());
        assert_eq!(process.live_objects(), 1);

        unsafe {
            assert_eq!(MockProcess::add_ref(frame), 2);
            assert_eq!(MockProcess::release(frame), 1);
            assert_eq!(MockProcess::release(frame), 0);
        }
        assert_eq!(process.live_objects(), 0);
        assert_eq!(process.created_objects(), 1);
    }

    #[test]
    fn query_interface_follows_flavor() {
        let process = MockProcess::new();
        let frame = process.frame(FrameSpec {
            flavor: FrameFlavor::Native,
            ..FrameSpec::default()
        });

        unsafe {
            let (hr, out) = query(frame.cast(), &IID_ICorDebugNativeFrame);
            assert_eq!(hr, S_OK);
            assert_eq!(out, frame.cast());
            assert_eq!(MockProcess::ref_count(frame), 2);
            MockProcess::release(out);

            let (hr, out) = query(frame.cast(), &IID_ICorDebugILFrame);
            assert_eq!(hr, E_NOINTERFACE);
            assert!(out.is_null());

            MockProcess::release(frame);
        }
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn chain_releases_owned_frames() {
        let process = MockProcess::new();
        let inner = process.frame(FrameSpec::default());
        let outer = process.frame(FrameSpec::default());
        let chain = process.chain(ChainSpec {
            frames: vec![inner, outer],
            ..ChainSpec::default()
        });
        assert_eq!(process.live_objects(), 3);

        unsafe { MockProcess::release(chain) };
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn next_hands_out_references() {
        let process = MockProcess::new();
        let chains = vec![
            process.chain(ChainSpec::default()),
            process.chain(ChainSpec::default()),
        ];
        let first = chains[0];
        let chain_enum = process.chain_enum(chains);

        unsafe {
            let vtbl = &*(*chain_enum).lpVtbl;
            let mut items = [ptr::null_mut(); 3];
            let mut fetched = 0;
            let hr = (vtbl.Next)(chain_enum.cast(), 3, items.as_mut_ptr(), &mut fetched);
            assert_eq!(hr, S_FALSE);
            assert_eq!(fetched, 2);
            assert_eq!(items[0], first);
            assert!(items[2].is_null());
            assert_eq!(MockProcess::ref_count(first), 2);

            MockProcess::release(chain_enum);
            assert_eq!(process.live_objects(), 2);
            MockProcess::release(items[0]);
            MockProcess::release(items[1]);
        }
        assert_eq!(process.live_objects(), 0);
    }
}
