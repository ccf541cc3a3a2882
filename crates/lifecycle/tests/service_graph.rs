//! End-to-end behaviour of a small service graph
//!
//! ```text
//! d ─┬─ a            (stop_on_stop = false)
//!    ├─ a1           (required, start_on_restart)
//!    ├─ b            (optional)
//!    └─ c ─┬─ a      (required)
//!          └─ b      (optional)
//! b ── a             (optional)
//! ```

use lifecycle::{
    Dependency, DependencyFlags, Service, ServiceBase, ServiceChangeListener, ServiceError,
    ServiceLogic, ServicesMonitor, Status,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockLogic {
    name: String,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    fail_on_start: AtomicBool,
    fail_on_stop: AtomicBool,
}

impl MockLogic {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    fn fail_on_start(&self, fail: bool) {
        self.fail_on_start.store(fail, Ordering::SeqCst);
    }
}

impl ServiceLogic for MockLogic {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock service"
    }

    fn do_start(&self) -> anyhow::Result<()> {
        if self.fail_on_start.load(Ordering::SeqCst) {
            anyhow::bail!("Mock exception on start");
        }
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn do_stop(&self) -> anyhow::Result<()> {
        if self.fail_on_stop.load(Ordering::SeqCst) {
            anyhow::bail!("Mock exception on stop");
        }
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type Mock = Arc<ServiceBase<MockLogic>>;

struct Fixture {
    monitor: Arc<ServicesMonitor>,
    a: Mock,
    a1: Mock,
    b: Mock,
    c: Mock,
    d: Mock,
}

fn fixture() -> Fixture {
    let monitor = ServicesMonitor::new();
    let a = ServiceBase::new(&monitor, MockLogic::new("a"), vec![]).unwrap();
    let a1 = ServiceBase::new(&monitor, MockLogic::new("a1"), vec![]).unwrap();
    let b = ServiceBase::new(
        &monitor,
        MockLogic::new("b"),
        vec![Dependency::optional(a.clone())],
    )
    .unwrap();
    let c = ServiceBase::new(
        &monitor,
        MockLogic::new("c"),
        vec![
            Dependency::required(a.clone()),
            Dependency::optional(b.clone()),
        ],
    )
    .unwrap();
    let d = ServiceBase::new(
        &monitor,
        MockLogic::new("d"),
        vec![
            Dependency::new(
                a.clone(),
                DependencyFlags::required().with_stop_on_stop(false),
            ),
            Dependency::new(
                a1.clone(),
                DependencyFlags::optional()
                    .with_required_at_start(true)
                    .with_start_on_restart(true)
                    .with_stop_on_stop(true),
            ),
            Dependency::optional(b.clone()),
            Dependency::new(
                c.clone(),
                DependencyFlags::optional().with_required_at_start(true),
            ),
        ],
    )
    .unwrap();

    Fixture {
        monitor,
        a,
        a1,
        b,
        c,
        d,
    }
}

#[derive(Default)]
struct ChangeRecorder {
    changes: Mutex<Vec<String>>,
}

impl ChangeRecorder {
    fn changes(&self) -> Vec<String> {
        self.changes.lock().unwrap().clone()
    }
}

impl ServiceChangeListener for ChangeRecorder {
    fn service_status_change(&self, service: &dyn Service, from: Status, to: Status) {
        self.changes
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", service.name(), from, to));
    }
}

#[test]
fn start_without_errors() {
    let f = fixture();
    f.d.start().unwrap();

    assert!(f.a.is_started());
    assert!(f.a1.is_started());
    assert!(!f.b.is_started());
    assert!(f.c.is_started());
    assert_eq!(f.a.logic().start_calls(), 1);
    assert_eq!(f.d.status(), Status::Started);
    assert_eq!(f.d.logic().start_calls(), 1);
}

#[test]
fn start_when_dependency_already_started() {
    let f = fixture();
    f.a.start().unwrap();

    f.d.start().unwrap();
    assert!(f.a.is_started());
    assert!(f.a1.is_started());
    assert!(!f.b.is_started());
    assert_eq!(f.a.logic().start_calls(), 1);
    assert_eq!(f.d.status(), Status::Started);
}

#[test]
fn start_when_already_started_is_silent() {
    let f = fixture();
    f.d.start().unwrap();

    let recorder = Arc::new(ChangeRecorder::default());
    f.monitor.subscribe(f.d.id(), recorder.clone()).unwrap();
    let before = f.monitor.service_status(f.d.id()).unwrap();

    f.d.start().unwrap();

    assert!(recorder.changes().is_empty());
    assert_eq!(f.monitor.service_status(f.d.id()).unwrap(), before);
    assert_eq!(f.d.logic().start_calls(), 1);
}

#[test]
fn stop_when_never_started_is_silent() {
    let f = fixture();
    let recorder = Arc::new(ChangeRecorder::default());
    f.monitor.subscribe(f.d.id(), recorder.clone()).unwrap();

    f.d.stop().unwrap();
    assert_eq!(f.d.status(), Status::Initial);
    assert!(recorder.changes().is_empty());
}

#[test]
fn start_required_dependency_fails() {
    let f = fixture();
    f.a1.logic().fail_on_start(true);

    let err = f.d.start().unwrap_err();
    assert!(matches!(
        err,
        ServiceError::RequiredDependencyStartFailure { .. }
    ));
    assert_eq!(err.service().id, f.d.id());
    assert_eq!(err.root_service().id, f.a1.id());

    assert!(f.a.is_started());
    assert!(!f.a1.is_started());
    assert_eq!(f.a1.status(), Status::FailedToStart);
    assert!(!f.b.is_started());
    assert_eq!(f.d.status(), Status::DependencyFailed);
    assert_eq!(f.d.logic().start_calls(), 0);
}

#[test]
fn start_optional_dependency_fails() {
    let f = fixture();
    f.b.logic().fail_on_start(true);
    // owners never start optional dependencies, so fail b directly
    assert!(f.b.start().is_err());

    f.d.start().unwrap();
    assert!(f.a.is_started());
    assert!(f.a1.is_started());
    assert!(!f.b.is_started());
    assert_eq!(f.b.status(), Status::FailedToStart);
    assert_eq!(f.a.logic().start_calls(), 1);
    assert_eq!(f.d.status(), Status::Started);
}

#[test]
fn start_on_restart_recovers_dependent() {
    let f = fixture();
    f.a1.logic().fail_on_start(true);
    assert!(f.d.start().is_err());
    assert_eq!(f.d.status(), Status::DependencyFailed);

    f.a1.logic().fail_on_start(false);
    f.a1.start().unwrap();

    assert!(f.a1.is_started());
    assert!(f.d.is_started());
    assert_eq!(f.d.logic().start_calls(), 1);
    let record = f.monitor.service_status(f.d.id()).unwrap();
    assert_eq!(record.previous_status, Status::DependencyFailed);
}

#[test]
fn start_on_restart_disabled_leaves_dependent() {
    let monitor = ServicesMonitor::new();
    let dep = ServiceBase::new(&monitor, MockLogic::new("dep"), vec![]).unwrap();
    let owner = ServiceBase::new(
        &monitor,
        MockLogic::new("owner"),
        vec![Dependency::new(
            dep.clone(),
            DependencyFlags::required().with_start_on_restart(false),
        )],
    )
    .unwrap();

    dep.logic().fail_on_start(true);
    assert!(owner.start().is_err());
    dep.logic().fail_on_start(false);
    dep.start().unwrap();

    assert!(dep.is_started());
    assert_eq!(owner.status(), Status::DependencyFailed);
}

#[test]
fn stop_on_stop_true() {
    let f = fixture();
    f.d.start().unwrap();

    f.a1.stop().unwrap();
    assert!(!f.d.is_started());
    assert_eq!(f.d.status(), Status::Stopped);
}

#[test]
fn stop_on_stop_false() {
    let f = fixture();
    f.d.start().unwrap();

    f.a.stop().unwrap();
    assert!(f.d.is_started());
    assert!(!f.b.is_started());
    // c is coupled to a and follows it down
    assert_eq!(f.c.status(), Status::Stopped);
    assert_eq!(
        f.monitor.service_status(f.d.id()).unwrap().current_status,
        Status::Started
    );
    assert_eq!(
        f.monitor.service_status(f.a.id()).unwrap().current_status,
        Status::Stopped
    );
}

#[test]
fn monitor_has_registered_services() {
    let f = fixture();
    f.d.start().unwrap();

    let registered: Vec<_> = f
        .monitor
        .registered_services()
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(
        registered,
        vec![f.a.id(), f.a1.id(), f.b.id(), f.c.id(), f.d.id()]
    );
}

#[test]
fn monitor_logs_status_change() {
    let f = fixture();
    f.d.start().unwrap();

    let status = f.monitor.service_status(f.d.id()).unwrap();
    assert_eq!(status.current_status, Status::Started);
    assert_eq!(status.previous_status, Status::Initial);
    let start_time = status.last_start_time.expect("start time stamped");
    assert!(start_time <= chrono::Utc::now());
    assert!(status.last_stop_time.is_none());
    assert_eq!(status.status_change_time, status.last_start_time);

    f.d.stop().unwrap();
    let status = f.monitor.service_status(f.d.id()).unwrap();
    assert_eq!(status.current_status, Status::Stopped);
    assert_eq!(status.previous_status, Status::Started);
    assert_eq!(status.last_start_time, Some(start_time));
    let stop_time = status.last_stop_time.expect("stop time stamped");
    assert!(stop_time >= start_time);
    assert_eq!(status.status_change_time, status.last_stop_time);
}

#[test]
fn listeners_observe_settled_transitions() {
    let f = fixture();
    let recorder = Arc::new(ChangeRecorder::default());
    f.monitor.subscribe(f.a.id(), recorder.clone()).unwrap();

    f.d.start().unwrap();
    f.a.stop().unwrap();

    assert_eq!(
        recorder.changes(),
        vec!["a:INITIAL:STARTED", "a:STARTED:STOPPED"]
    );
    // b, c and d registered on a before the recorder
    assert_eq!(f.monitor.listener_count(f.a.id()), 4);
}

#[test]
fn history_tracks_cascade() {
    let f = fixture();
    f.d.start().unwrap();
    f.a1.stop().unwrap();

    let transitions: Vec<_> = f
        .monitor
        .history(f.d.id())
        .iter()
        .map(|event| (event.from, event.to))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (Status::Initial, Status::Started),
            (Status::Started, Status::Stopped)
        ]
    );
}
