// tests/test_harness.rs
//! Shared fixtures for the integration tests.
//!
//! Each test gets its own simulated native process and debug session, so
//! native reference counts and registry contents never leak between tests.

#![allow(dead_code)]

use cordebug::prelude::*;
use cordebug::sys::{ICorDebugChain, ICorDebugChainEnum, ICorDebugFrame};
use cordebug::testing::{ChainSpec, FrameSpec, MockProcess};
use std::sync::Once;

static LOGGING: Once = Once::new();

/// Routes `tracing` output through the test writer; `RUST_LOG` picks the level.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct TestHarness {
    pub process: MockProcess,
    pub session: DebugSession,
}

impl TestHarness {
    /// A fresh process and a session that panics on leaked handles.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default().with_leak_policy(LeakPolicy::Panic))
    }

    pub fn with_config(config: SessionConfig) -> Self {
        init_logging();
        Self {
            process: MockProcess::new(),
            session: DebugSession::start(config),
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        self.session.registry()
    }

    pub fn raw_frame(&self, spec: FrameSpec) -> *mut ICorDebugFrame {
        self.process.frame(spec)
    }

    pub fn frame(&self, spec: FrameSpec) -> Frame {
        unsafe { self.session.wrap(self.process.frame(spec)) }.expect("mock frame is non-null")
    }

    pub fn chain(&self, spec: ChainSpec) -> Chain {
        unsafe { self.session.wrap(self.process.chain(spec)) }.expect("mock chain is non-null")
    }

    /// Chains whose stack ranges start at `0x1000 * (i + 1)`, so each element
    /// is recognisable by `chain_start`.
    pub fn raw_chains(&self, count: u64) -> Vec<*mut ICorDebugChain> {
        (0..count)
            .map(|i| {
                self.process.chain(ChainSpec {
                    stack_range: (0x1000 * (i + 1), 0x1000 * (i + 1) + 0x800),
                    ..ChainSpec::default()
                })
            })
            .collect()
    }

    pub fn raw_chain_enum(&self, count: u64) -> *mut ICorDebugChainEnum {
        self.process.chain_enum(self.raw_chains(count))
    }

    pub fn chain_enum(&self, count: u64) -> ChainEnum {
        unsafe { self.session.wrap(self.raw_chain_enum(count)) }.expect("mock enum is non-null")
    }

    /// Ends the session, asserting that neither the registry nor the native
    /// side has anything left alive.
    pub fn finish(self) {
        let TestHarness { process, session } = self;
        let report = session.shutdown();
        assert!(report.is_clean(), "leaked wrappers: {}", report);
        assert_eq!(process.live_objects(), 0, "native objects still alive");
    }
}

pub fn chain_start(chain: &Chain) -> u64 {
    chain.stack_range().expect("stack range").0
}
