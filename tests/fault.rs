use qrpress::fault::{escalate, FaultConfig, FaultGuard, FaultHandler, FaultKind, RequestContext};
use regex::Regex;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

// The panic hook is process-wide, so handler tests must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn install(debug: bool) -> (FaultGuard, SharedBuf) {
    let sink = SharedBuf::default();
    let config = FaultConfig::default()
        .debug(debug)
        .exit_on_fault(false)
        .app_name("qrpress-tests")
        .sink(sink.clone());
    (FaultHandler::new(config).install(), sink)
}

#[test]
fn production_page_shows_only_a_correlation_code() {
    let _serial = serial();
    let (guard, sink) = install(false);

    let report = guard
        .run(|| Err::<(), _>("connection string leaked: secret=hunter2".to_string()))
        .unwrap_err();
    drop(guard);

    let page = sink.contents();
    let pattern = Regex::new(r"ERR_500_[0-9a-f]{8}").unwrap();
    assert!(pattern.is_match(&page));
    assert!(page.contains(report.code()));
    assert!(!page.contains("hunter2"));
    assert_eq!(report.status(), 500);
    assert_eq!(report.fault().kind(), FaultKind::Error);
}

#[test]
fn debug_page_shows_the_escaped_panic() {
    let _serial = serial();
    let sink = SharedBuf::default();
    let config = FaultConfig::default()
        .debug(true)
        .status(503)
        .exit_on_fault(false)
        .request(RequestContext {
            method: "GET".into(),
            uri: "/qr?data=<x>".into(),
            remote_addr: "127.0.0.1".into(),
            protocol: "HTTP/1.1".into(),
        })
        .sink(sink.clone());
    let guard = FaultHandler::new(config).install();

    let report = guard
        .run(|| -> Result<(), String> { panic!("bad <input> in handler") })
        .unwrap_err();
    drop(guard);

    let page = sink.contents();
    assert_eq!(report.fault().kind(), FaultKind::Panic);
    assert!(report.fault().file().ends_with("fault.rs"));
    assert!(page.contains("<h1 class=\"error-code\">503</h1>"));
    assert!(page.contains("bad &lt;input&gt; in handler"));
    assert!(!page.contains("bad <input>"));
    assert!(page.contains("/qr?data=&lt;x&gt;"));
}

#[test]
fn escalated_warnings_are_rendered() {
    let _serial = serial();
    let (guard, sink) = install(true);

    let report = guard
        .run(|| -> Result<(), String> { escalate("disk almost full") })
        .unwrap_err();
    drop(guard);

    assert_eq!(report.fault().kind(), FaultKind::Warning);
    assert_eq!(report.fault().message(), "disk almost full");
    assert!(report.fault().file().ends_with("fault.rs"));
    assert!(sink.contents().contains("disk almost full"));
}

#[test]
fn panics_on_other_threads_are_rendered_at_shutdown() {
    let _serial = serial();
    let (guard, sink) = install(true);

    let worker = thread::spawn(|| panic!("worker lost its connection"));
    assert!(worker.join().is_err());
    assert_eq!(guard.pending(), 1);
    assert!(sink.contents().is_empty());

    drop(guard);
    let page = sink.contents();
    assert!(page.contains("Shutdown Details"));
    assert!(page.contains("worker lost its connection"));
}

#[test]
fn one_page_per_handler() {
    let _serial = serial();
    let (guard, sink) = install(false);

    let first = guard.run(|| Err::<(), _>("first")).unwrap_err();
    let second = guard.run(|| Err::<(), _>("second")).unwrap_err();
    drop(guard);

    let page = sink.contents();
    assert_eq!(page.matches("<!DOCTYPE html>").count(), 1);
    assert!(page.contains(first.code()));
    assert!(!page.contains(second.code()));
}

#[test]
fn successful_bodies_pass_through() {
    let _serial = serial();
    let (guard, sink) = install(false);

    let artifact = guard
        .run(|| qrpress::qr("hello", "svg", "", ""))
        .unwrap();
    drop(guard);

    assert_eq!(artifact.mime_type(), "image/svg+xml");
    assert!(sink.contents().is_empty());
}
