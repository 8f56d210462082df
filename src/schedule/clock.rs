//! wall clock seam
//! the engine reads time through this trait so the date dedup logic can
//! be tested without waiting for 08:30

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDateTime};

pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// local wall clock, production impl
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// settable clock for tests
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.lock().map(|guard| *guard).unwrap_or_else(|e| *e.into_inner())
    }
}
