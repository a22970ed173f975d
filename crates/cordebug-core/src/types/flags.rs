use bitflags::bitflags;
use cordebug_sys::*;

bitflags! {
    /// Why the runtime started a new stack chain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChainReason: u32 {
        /// Running a class constructor.
        const CLASS_INIT = CHAIN_CLASS_INIT;
        /// Running an exception filter.
        const EXCEPTION_FILTER = CHAIN_EXCEPTION_FILTER;
        /// Running a security check.
        const SECURITY = CHAIN_SECURITY;
        const CONTEXT_POLICY = CHAIN_CONTEXT_POLICY;
        const INTERCEPTION = CHAIN_INTERCEPTION;
        const PROCESS_START = CHAIN_PROCESS_START;
        const THREAD_START = CHAIN_THREAD_START;
        /// Transition from unmanaged into managed code.
        const ENTER_MANAGED = CHAIN_ENTER_MANAGED;
        /// Transition from managed into unmanaged code.
        const ENTER_UNMANAGED = CHAIN_ENTER_UNMANAGED;
        const DEBUGGER_EVAL = CHAIN_DEBUGGER_EVAL;
        const CONTEXT_SWITCH = CHAIN_CONTEXT_SWITCH;
        /// A function evaluation requested by the debugger.
        const FUNC_EVAL = CHAIN_FUNC_EVAL;
    }
}

impl ChainReason {
    pub const NONE: ChainReason = ChainReason::from_bits_retain(CHAIN_NONE);
}

bitflags! {
    /// How precisely an instruction pointer maps onto IL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MappingResult: u32 {
        const PROLOG = MAPPING_PROLOG;
        const EPILOG = MAPPING_EPILOG;
        /// No mapping information is available for the method.
        const NO_INFO = MAPPING_NO_INFO;
        const UNMAPPED_ADDRESS = MAPPING_UNMAPPED_ADDRESS;
        const EXACT = MAPPING_EXACT;
        const APPROXIMATE = MAPPING_APPROXIMATE;
    }
}

impl MappingResult {
    /// True when the offset can be trusted as an IL offset.
    pub fn is_mapped(self) -> bool {
        self.intersects(MappingResult::EXACT | MappingResult::APPROXIMATE)
    }
}
