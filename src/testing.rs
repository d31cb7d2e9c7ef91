//! Test doubles shared by the unit tests

use std::cell::{Cell, RefCell};
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};
use thiserror::Error;

use crate::patcher::Patcher;
use crate::version::VersionProbe;

thread_local! {
    /// Records logged by the current test thread
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

/// Logger that keeps records per thread so tests running in parallel don't see each other
struct CaptureLogger;
impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

/// The process-wide capture logger
static LOGGER: CaptureLogger = CaptureLogger;

/// Installs the capture logger and clears the current thread's records
pub fn capture_logs() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Takes the records at the levels the plugin log file keeps
pub fn take_logs() -> Vec<(Level, String)> {
    RECORDS.with(|records| {
        records
            .borrow_mut()
            .drain(..)
            .filter(|(level, _)| *level <= Level::Info)
            .collect()
    })
}

/// Version probe returning a fixed build
pub struct FixedVersion(pub u16);
impl VersionProbe for FixedVersion {
    fn game_version(&self) -> u16 {
        self.0
    }
}

/// Failure reported by [`FakePatcher`]
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeError(pub &'static str);

/// Patcher that records its calls instead of touching memory
pub struct FakePatcher {
    /// Bytes returned by `read`
    pub code: [u8; 2],
    /// When set, `overwrite` fails with this message without recording a write
    pub fail_with: Option<&'static str>,
    /// Every `(address, value)` passed to `overwrite`
    pub attempts: RefCell<Vec<(usize, u8)>>,
    /// Every successful `(address, value)` write
    pub writes: RefCell<Vec<(usize, u8)>>,
    /// Number of `read` calls
    pub reads: Cell<usize>,
}
impl FakePatcher {
    /// A patcher that sees `je rel8` at the site and accepts writes
    pub fn accepting() -> Self {
        Self {
            code: [0x74, 0x1A],
            fail_with: None,
            attempts: RefCell::default(),
            writes: RefCell::default(),
            reads: Cell::new(0),
        }
    }

    /// A patcher that sees `je rel8` at the site and refuses writes with `message`
    pub fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            ..Self::accepting()
        }
    }

    /// Total number of calls that touched the fake
    pub fn touches(&self) -> usize {
        self.attempts.borrow().len() + self.reads.get()
    }
}
unsafe impl Patcher for FakePatcher {
    type Error = FakeError;

    unsafe fn overwrite(&self, address: usize, value: u8) -> Result<(), Self::Error> {
        self.attempts.borrow_mut().push((address, value));
        match self.fail_with {
            Some(message) => Err(FakeError(message)),
            None => {
                self.writes.borrow_mut().push((address, value));
                Ok(())
            }
        }
    }

    unsafe fn read(&self, _address: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.reads.set(self.reads.get() + 1);
        buf.copy_from_slice(&self.code[..buf.len()]);
        Ok(())
    }
}
