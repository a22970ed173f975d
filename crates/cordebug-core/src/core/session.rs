//! Session-scoped ownership of the resource registry.
//!
//! A [`DebugSession`] is created when a debuggee is attached and torn down
//! when it detaches. It owns the [`ResourceRegistry`] every wrapper reports
//! to, and a [`ReleaseQueue`] for wrappers whose release has to happen later
//! or on another thread.
//!
//! Wrappers hold their own reference to the registry, so they may outlive the
//! session; anything still alive at shutdown shows up in the leak report.

use crate::core::com_ptr::ComPtr;
use crate::core::interface::Interface;
use crate::core::registry::{LeakReport, ResourceRegistry};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// What to do with handles still tracked when a session shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeakPolicy {
    Ignore,
    /// Log every leaked handle with `tracing::warn!`.
    #[default]
    Warn,
    /// Panic with the leak report. Meant for tests.
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub leak_policy: LeakPolicy,
    /// Release everything still queued in the [`ReleaseQueue`] before the
    /// shutdown audit.
    pub drain_deferred_on_shutdown: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            leak_policy: LeakPolicy::default(),
            drain_deferred_on_shutdown: true,
        }
    }
}

impl SessionConfig {
    pub fn with_leak_policy(mut self, policy: LeakPolicy) -> Self {
        self.leak_policy = policy;
        self
    }

    pub fn with_drain_deferred_on_shutdown(mut self, drain: bool) -> Self {
        self.drain_deferred_on_shutdown = drain;
        self
    }
}

/// Wrappers waiting to be released.
///
/// Any thread may push or drain; draining releases the native references on
/// the draining thread.
#[derive(Debug, Default)]
pub struct ReleaseQueue {
    pending: Mutex<Vec<ComPtr>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Vec<ComPtr>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            warn!("release queue lock was poisoned; continuing with recovered queue");
            self.pending.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Hands a wrapper over for later release.
    pub fn defer<K: Interface>(&self, wrapper: K) {
        let ptr = wrapper.into_com();
        if ptr.is_released() {
            return;
        }
        self.pending().push(ptr);
    }

    /// Releases everything queued so far and returns how many wrappers that was.
    pub fn drain(&self) -> usize {
        // Take the batch first so native Release runs without the lock held.
        let batch = std::mem::take(&mut *self.pending());
        let count = batch.len();
        drop(batch);
        if count > 0 {
            debug!(count, "released deferred wrappers");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner of the registry and release queue for one debuggee.
#[derive(Debug)]
pub struct DebugSession {
    registry: Arc<ResourceRegistry>,
    deferred: Arc<ReleaseQueue>,
    config: SessionConfig,
    finished: bool,
}

impl DebugSession {
    pub fn start(config: SessionConfig) -> Self {
        debug!(?config, "debug session started");
        Self {
            registry: Arc::new(ResourceRegistry::new()),
            deferred: Arc::new(ReleaseQueue::new()),
            config,
            finished: false,
        }
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Wraps a raw interface pointer into a wrapper tracked by this session.
    ///
    /// # Safety
    /// See [`Interface::wrap`]: `raw` must be null or a live `K::Raw` pointer,
    /// and one reference on it is handed over.
    pub unsafe fn wrap<K: Interface>(&self, raw: *mut K::Raw) -> Option<K> {
        unsafe { K::wrap(raw, &self.registry) }
    }

    /// Queues `wrapper` for release on the next drain.
    pub fn defer_release<K: Interface>(&self, wrapper: K) {
        self.deferred.defer(wrapper);
    }

    /// A handle on the release queue that can be moved to a cleanup thread.
    pub fn release_queue(&self) -> Arc<ReleaseQueue> {
        Arc::clone(&self.deferred)
    }

    pub fn drain_deferred(&self) -> usize {
        self.deferred.drain()
    }

    /// Current leak report, without ending the session.
    pub fn audit(&self) -> LeakReport {
        self.registry.audit()
    }

    /// Ends the session and returns what was still alive.
    pub fn shutdown(mut self) -> LeakReport {
        self.finish()
    }

    fn finish(&mut self) -> LeakReport {
        self.finished = true;
        if self.config.drain_deferred_on_shutdown {
            self.deferred.drain();
        }

        let report = self.registry.audit();
        if !report.is_clean() {
            match self.config.leak_policy {
                LeakPolicy::Ignore => {}
                LeakPolicy::Warn => {
                    for record in report.records() {
                        warn!(
                            handle = %record.handle,
                            interface = record.kind.interface(),
                            stakes = record.stakes,
                            "native handle still alive at session shutdown"
                        );
                    }
                }
                LeakPolicy::Panic => {
                    if !std::thread::panicking() {
                        panic!("debug session leaked native handles: {}", report);
                    }
                }
            }
        }
        debug!(leaked = report.total_stakes(), "debug session finished");
        report
    }
}

impl Drop for DebugSession {
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cast::Cast;
    use crate::testing::{ChainSpec, FrameSpec, MockProcess};
    use crate::wrappers::chain::Chain;
    use crate::wrappers::frame::{Frame, IlFrame};
    use std::thread;

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.leak_policy, LeakPolicy::Warn);
        assert!(config.drain_deferred_on_shutdown);

        let config = config
            .with_leak_policy(LeakPolicy::Panic)
            .with_drain_deferred_on_shutdown(false);
        assert_eq!(config.leak_policy, LeakPolicy::Panic);
        assert!(!config.drain_deferred_on_shutdown);
    }

    #[test]
    fn clean_shutdown() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default().with_leak_policy(LeakPolicy::Panic));
        let frame: Frame = unsafe { session.wrap(process.frame(FrameSpec::default())) }.unwrap();
        let il = frame.cast_to::<IlFrame>().unwrap();
        assert_eq!(session.audit().total_stakes(), 2);

        drop(frame);
        drop(il);
        assert!(session.shutdown().is_clean());
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn shutdown_reports_leaks() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default().with_leak_policy(LeakPolicy::Ignore));
        let chain: Chain = unsafe { session.wrap(process.chain(ChainSpec::default())) }.unwrap();

        let report = session.shutdown();
        assert_eq!(report.records().len(), 1);
        assert_eq!(report.stakes_for(Chain::KIND), 1);
        assert_eq!(Some(report.records()[0].handle), chain.handle_id());

        // The wrapper outlives the session and still releases cleanly.
        drop(chain);
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    #[should_panic(expected = "debug session leaked native handles")]
    fn panic_policy_panics_on_leak() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default().with_leak_policy(LeakPolicy::Panic));
        let chain: Chain = unsafe { session.wrap(process.chain(ChainSpec::default())) }.unwrap();
        std::mem::forget(chain);
        session.shutdown();
    }

    #[test]
    fn deferred_release_drains_on_shutdown() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default().with_leak_policy(LeakPolicy::Panic));
        let chain: Chain = unsafe { session.wrap(process.chain(ChainSpec::default())) }.unwrap();

        session.defer_release(chain);
        assert_eq!(session.release_queue().len(), 1);
        assert_eq!(process.live_objects(), 1);

        assert!(session.shutdown().is_clean());
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn deferred_release_on_another_thread() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default());
        for _ in 0..4 {
            let frame: Frame = unsafe { session.wrap(process.frame(FrameSpec::default())) }.unwrap();
            session.defer_release(frame);
        }

        let queue = session.release_queue();
        let released = thread::spawn(move || queue.drain()).join().unwrap();
        assert_eq!(released, 4);
        assert!(session.release_queue().is_empty());
        assert_eq!(session.registry().total_tracked(), 0);
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn poisoned_queue_is_recovered() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default().with_leak_policy(LeakPolicy::Panic));
        let queue = session.release_queue();
        let holder = Arc::clone(&queue);
        let outcome = thread::spawn(move || {
            let _guard = holder.pending.lock();
            panic!("queue holder failed");
        })
        .join();
        assert!(outcome.is_err());
        assert!(queue.pending.is_poisoned());

        let frame: Frame = unsafe { session.wrap(process.frame(FrameSpec::default())) }.unwrap();
        session.defer_release(frame);
        assert!(!queue.pending.is_poisoned());
        assert_eq!(queue.len(), 1);
        assert_eq!(session.drain_deferred(), 1);
        assert!(session.shutdown().is_clean());
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn deferring_a_released_wrapper_is_a_noop() {
        let process = MockProcess::new();
        let session = DebugSession::start(SessionConfig::default());
        let mut frame: Frame = unsafe { session.wrap(process.frame(FrameSpec::default())) }.unwrap();
        frame.release();

        session.defer_release(frame);
        assert!(session.release_queue().is_empty());
        assert_eq!(session.drain_deferred(), 0);
    }

    #[test]
    fn undrained_queue_is_reported() {
        let process = MockProcess::new();
        let session = DebugSession::start(
            SessionConfig::default()
                .with_leak_policy(LeakPolicy::Ignore)
                .with_drain_deferred_on_shutdown(false),
        );
        let frame: Frame = unsafe { session.wrap(process.frame(FrameSpec::default())) }.unwrap();
        let queue = session.release_queue();
        session.defer_release(frame);

        let report = session.shutdown();
        assert_eq!(report.stakes_for(Frame::KIND), 1);
        assert_eq!(queue.drain(), 1);
        assert_eq!(process.live_objects(), 0);
    }
}
