use std::ffi::OsString;

use sysinfo::System;

use crate::domain::context::HostMonitor;

/// Counts running instances of the host game process by executable name.
///
/// A fresh process table is read on every call; bulk saves are rare enough
/// that the scan cost does not matter.
pub struct GameProcessMonitor {
    process_name: OsString,
}

impl GameProcessMonitor {
    pub fn new(process_name: impl Into<OsString>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }
}

impl HostMonitor for GameProcessMonitor {
    fn host_instance_count(&self) -> usize {
        let mut sys = System::new_all();
        sys.refresh_all();
        sys.processes_by_name(&self.process_name).count()
    }
}

/// Fixed-count monitor for tests and hosts that manage exclusivity themselves.
pub struct StaticHostMonitor {
    instances: usize,
}

impl StaticHostMonitor {
    pub fn new(instances: usize) -> Self {
        Self { instances }
    }
}

impl HostMonitor for StaticHostMonitor {
    fn host_instance_count(&self) -> usize {
        self.instances
    }
}
