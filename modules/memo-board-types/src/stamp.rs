//! Id and timestamp generation for new memos and comments.
//!
//! Ids are epoch milliseconds, bumped past the previous id when two records
//! land in the same millisecond, so they are unique and follow creation order.
//! Timestamps are server-side local times rendered for a display locale.

use crate::MemoError;
use chrono::{Datelike, Local, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure future ids are greater than `id`.
    pub fn observe(&self, id: i64) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }

    /// Fails once the last id handed out (or observed) is `i64::MAX`.
    pub fn next_id(&self) -> Result<i64, MemoError> {
        let now = Utc::now().timestamp_millis();
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                prev.checked_add(1).map(|next| next.max(now))
            })
            .map(|prev| (prev + 1).max(now))
            .map_err(|_| MemoError::storage("Id space exhausted"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    KoKr,
    EnUs,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::KoKr => "ko-KR",
            Locale::EnUs => "en-US",
        }
    }

    pub fn format(&self, at: &NaiveDateTime) -> String {
        let (pm, hour) = at.hour12();
        match self {
            // 2024. 5. 3. 오후 2:15:30
            Locale::KoKr => format!(
                "{}. {}. {}. {} {}:{:02}:{:02}",
                at.year(),
                at.month(),
                at.day(),
                if pm { "오후" } else { "오전" },
                hour,
                at.minute(),
                at.second()
            ),
            // 5/3/2024, 2:15:30 PM
            Locale::EnUs => format!(
                "{}/{}/{}, {}:{:02}:{:02} {}",
                at.month(),
                at.day(),
                at.year(),
                hour,
                at.minute(),
                at.second(),
                if pm { "PM" } else { "AM" }
            ),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ko-kr" | "ko" => Ok(Locale::KoKr),
            "en-us" | "en" => Ok(Locale::EnUs),
            other => Err(format!("Unsupported locale: {}", other)),
        }
    }
}

/// Hands out ids and creation timestamps for one store instance.
#[derive(Debug, Default)]
pub struct Stamper {
    ids: IdGenerator,
    locale: Locale,
}

impl Stamper {
    pub fn new(locale: Locale) -> Self {
        Self {
            ids: IdGenerator::new(),
            locale,
        }
    }

    pub fn observe(&self, id: i64) {
        self.ids.observe(id);
    }

    pub fn next_id(&self) -> Result<i64, MemoError> {
        self.ids.next_id()
    }

    pub fn timestamp(&self) -> String {
        self.locale.format(&Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let mut prev = ids.next_id().unwrap();
        for _ in 0..1000 {
            let id = ids.next_id().unwrap();
            assert!(id > prev, "{} should follow {}", id, prev);
            prev = id;
        }
    }

    #[test]
    fn test_observe_moves_past_existing_ids() {
        let ids = IdGenerator::new();
        let far_future = Utc::now().timestamp_millis() + 10_000_000;
        ids.observe(far_future);
        assert_eq!(ids.next_id().unwrap(), far_future + 1);
    }

    #[test]
    fn test_exhausted_id_space_is_an_error() {
        let ids = IdGenerator::new();
        ids.observe(i64::MAX - 1);
        assert_eq!(ids.next_id().unwrap(), i64::MAX);
        assert_eq!(
            ids.next_id().unwrap_err(),
            MemoError::Storage("Id space exhausted".to_string())
        );
        ids.observe(i64::MAX);
        assert!(ids.next_id().is_err());
    }

    #[test]
    fn test_korean_format() {
        assert_eq!(Locale::KoKr.format(&at(14, 15, 30)), "2024. 5. 3. 오후 2:15:30");
        assert_eq!(Locale::KoKr.format(&at(0, 5, 9)), "2024. 5. 3. 오전 12:05:09");
    }

    #[test]
    fn test_us_format() {
        assert_eq!(Locale::EnUs.format(&at(14, 15, 30)), "5/3/2024, 2:15:30 PM");
        assert_eq!(Locale::EnUs.format(&at(11, 0, 0)), "5/3/2024, 11:00:00 AM");
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!("ko-KR".parse::<Locale>().unwrap(), Locale::KoKr);
        assert_eq!("en_us".parse::<Locale>().unwrap(), Locale::EnUs);
        assert!("fr-FR".parse::<Locale>().is_err());
    }
}
