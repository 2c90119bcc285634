use std::sync::{Arc, Mutex};

use chrono::{Datelike, Local, NaiveDate, Weekday};

/// Source of the current calendar day.
///
/// The cache partitions entries by this date and the day filter pivots on its
/// weekday, so tests inject a [`FixedClock`] instead of reading the wall clock.
pub trait Clock: Send + Sync + Clone + 'static {
    fn today(&self) -> NaiveDate;

    fn weekday(&self) -> Weekday {
        self.today().weekday()
    }
}

/// Local wall-clock date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A settable date shared between clones.
#[derive(Debug, Clone)]
pub struct FixedClock {
    date: Arc<Mutex<NaiveDate>>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Arc::new(Mutex::new(date)),
        }
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: u64) {
        let mut date = self.date.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = date.checked_add_days(chrono::Days::new(days)) {
            *date = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(|e| e.into_inner())
    }
}
