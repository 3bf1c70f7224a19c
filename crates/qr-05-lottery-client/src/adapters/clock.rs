//! System wall clock.

use chrono::{Local, NaiveDateTime};

use crate::ports::WallClock;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
