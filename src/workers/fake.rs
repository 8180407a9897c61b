//! In-memory launcher for tests.
//!
//! - `manual`: nothing happens on its own; tests feed signals to the pool.
//! - `auto`: ready right after launch, exit 0 on disconnect, signal 9 on kill.

use std::sync::{Arc, Mutex};

use crate::error::SpawnError;
use crate::workers::{
    ExitStatus, LaunchSpec, Launcher, SlotId, WorkerId, WorkerNotifier, WorkerProcess,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Disconnect,
    Kill,
}

#[derive(Clone)]
pub(crate) struct Launched {
    pub worker: WorkerId,
    pub slot: SlotId,
    pub generation: u64,
    pub debug_port: Option<u16>,
    pub notifier: WorkerNotifier,
    controls: Arc<Mutex<Vec<Control>>>,
}

#[derive(Default)]
struct State {
    launched: Vec<Launched>,
    fail_next: u32,
    always_fail: bool,
    limit: Option<usize>,
}

#[derive(Clone)]
pub(crate) struct FakeLauncher {
    auto: bool,
    state: Arc<Mutex<State>>,
}

impl FakeLauncher {
    pub fn manual() -> Self {
        Self {
            auto: false,
            state: Arc::default(),
        }
    }

    pub fn auto() -> Self {
        Self {
            auto: true,
            state: Arc::default(),
        }
    }

    /// Makes the next `n` launches fail.
    pub fn fail_next(&self, n: u32) {
        self.state.lock().unwrap().fail_next = n;
    }

    /// Fails every launch once `n` workers have been launched.
    pub fn limit_launches(&self, n: usize) {
        self.state.lock().unwrap().limit = Some(n);
    }

    pub fn set_always_fail(&self, on: bool) {
        self.state.lock().unwrap().always_fail = on;
    }

    pub fn launched(&self) -> Vec<Launched> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn count(&self) -> usize {
        self.state.lock().unwrap().launched.len()
    }

    pub fn get(&self, worker: WorkerId) -> Launched {
        self.launched()
            .into_iter()
            .find(|l| l.worker == worker)
            .expect("worker was never launched")
    }

    pub fn controls(&self, worker: WorkerId) -> Vec<Control> {
        self.get(worker).controls.lock().unwrap().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(
        &self,
        spec: LaunchSpec<'_>,
        notifier: WorkerNotifier,
    ) -> Result<Box<dyn WorkerProcess>, SpawnError> {
        let mut st = self.state.lock().unwrap();
        if st.always_fail || st.limit.is_some_and(|n| st.launched.len() >= n) {
            return Err(SpawnError::Launcher("injected failure".into()));
        }
        if st.fail_next > 0 {
            st.fail_next -= 1;
            return Err(SpawnError::Launcher("injected failure".into()));
        }

        let controls = Arc::new(Mutex::new(Vec::new()));
        st.launched.push(Launched {
            worker: spec.worker,
            slot: spec.slot,
            generation: spec.config.generation(),
            debug_port: spec.debug_port,
            notifier: notifier.clone(),
            controls: Arc::clone(&controls),
        });
        if self.auto {
            notifier.ready();
        }
        Ok(Box::new(FakeProcess {
            auto: self.auto,
            pid: 10_000 + spec.worker.get() as u32,
            notifier,
            controls,
            exited: false,
        }))
    }
}

struct FakeProcess {
    auto: bool,
    pid: u32,
    notifier: WorkerNotifier,
    controls: Arc<Mutex<Vec<Control>>>,
    exited: bool,
}

impl FakeProcess {
    fn finish(&mut self, status: ExitStatus) {
        if self.auto && !self.exited {
            self.exited = true;
            self.notifier.exited(status);
        }
    }
}

impl WorkerProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn disconnect(&mut self) {
        self.controls.lock().unwrap().push(Control::Disconnect);
        self.finish(ExitStatus::code(0));
    }

    fn kill(&mut self) {
        self.controls.lock().unwrap().push(Control::Kill);
        self.finish(ExitStatus::signal(9));
    }
}
