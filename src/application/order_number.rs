//! Order number generation
//!
//! Format: `ORD` + `yyyyMMddHHmmss` + three-digit sequence. Each second owns
//! 1000 numbers starting at a random offset; once a second is exhausted the
//! generator borrows the next one, so numbers never repeat within a process
//! even when the clock stalls or steps backwards.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::{Mutex, PoisonError};

const PER_SECOND: u32 = 1000;

#[derive(Debug, Default)]
struct Cursor {
    second: i64,
    offset: u32,
    issued: u32,
}

#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    cursor: Mutex<Cursor>,
}

impl OrderNumberGenerator {
    pub fn new() -> Self { Self::default() }

    pub fn next(&self) -> String { self.next_at(Utc::now()) }

    pub fn next_at(&self, now: DateTime<Utc>) -> String {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let second = now.timestamp();
        if second > cursor.second {
            cursor.second = second;
            cursor.issued = 0;
            cursor.offset = rand::thread_rng().gen_range(0..PER_SECOND);
        } else if cursor.issued >= PER_SECOND {
            cursor.second += 1;
            cursor.issued = 0;
        }
        let suffix = (cursor.offset + cursor.issued) % PER_SECOND;
        cursor.issued += 1;

        let stamp = DateTime::<Utc>::from_timestamp(cursor.second, 0).unwrap_or(now);
        format!("ORD{}{:03}", stamp.format("%Y%m%d%H%M%S"), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn format_is_prefix_timestamp_and_three_digits() {
        let gen = OrderNumberGenerator::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let number = gen.next_at(at);
        assert_eq!(number.len(), 3 + 14 + 3);
        assert!(number.starts_with("ORD20240305140709"));
        assert!(number[17..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn frozen_clock_still_yields_unique_numbers() {
        let gen = OrderNumberGenerator::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let numbers: HashSet<_> = (0..2500).map(|_| gen.next_at(at)).collect();
        assert_eq!(numbers.len(), 2500);
    }

    #[test]
    fn clock_going_backwards_does_not_reuse_numbers() {
        let gen = OrderNumberGenerator::new();
        let later = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let first = gen.next_at(later);
        let second = gen.next_at(later - chrono::Duration::seconds(30));
        assert_ne!(first, second);
        assert!(second.starts_with("ORD20240305140709"));
    }

    #[test]
    fn concurrent_callers_never_collide() {
        let gen = Arc::new(OrderNumberGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || (0..500).map(|_| gen.next()).collect::<Vec<_>>())
            })
            .collect();
        let all: Vec<String> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
