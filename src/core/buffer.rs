//! Append-only, time-ordered buffer of validated readings.
//!
//! Insertion order is time order. Once the buffer reaches its capacity the
//! oldest readings are discarded; history that is kept is never modified.

use crate::collector::types::{RawReading, Reading};
use crate::error::PredictionResult;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Default number of readings retained.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Bounded buffer of readings in arrival order.
#[derive(Debug, Clone)]
pub struct ReadingBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
    timezone: Tz,
}

impl ReadingBuffer {
    /// Create a buffer keeping at most `capacity` readings.
    pub fn new(capacity: usize, timezone: Tz) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
            timezone,
        }
    }

    /// Validate and append a raw reading.
    ///
    /// Incomplete readings are rejected and never enter the buffer.
    pub fn add(&mut self, raw: RawReading) -> PredictionResult<&Reading> {
        let reading = raw.validate(self.timezone)?;
        Ok(self.push(reading))
    }

    /// Append an already validated reading.
    pub fn push(&mut self, reading: Reading) -> &Reading {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        // Just pushed, so the deque is non-empty
        &self.readings[self.readings.len() - 1]
    }

    /// The last `n` readings in chronological order (fewer if not available).
    pub fn recent(&self, n: usize) -> Vec<Reading> {
        let skip = self.readings.len().saturating_sub(n);
        self.readings.iter().skip(skip).cloned().collect()
    }

    /// The most recent reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Number of readings held.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Check if the buffer holds no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Maximum number of readings held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Timezone used to derive hour and minute.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Fill level of the buffer relative to what a forecast needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStatus {
    pub buffer_size: usize,
    pub max_size: usize,
    pub ready_for_forecast: bool,
    pub readings_needed: usize,
}

/// A reading buffer shared between the ingestion producer and request handlers.
///
/// Appends and snapshot reads are atomic with respect to each other.
#[derive(Debug, Clone)]
pub struct SharedReadingBuffer {
    inner: Arc<RwLock<ReadingBuffer>>,
}

impl SharedReadingBuffer {
    /// Wrap a buffer for shared use.
    pub fn new(buffer: ReadingBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    /// Validate and append a raw reading.
    pub fn add(&self, raw: RawReading) -> PredictionResult<Reading> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let reading = guard.add(raw)?.clone();
        Ok(reading)
    }

    /// Append an already validated reading.
    pub fn push(&self, reading: Reading) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.push(reading);
    }

    /// Snapshot of the last `n` readings.
    pub fn recent(&self, n: usize) -> Vec<Reading> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .recent(n)
    }

    /// The most recent reading.
    pub fn latest(&self) -> Option<Reading> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .latest()
            .cloned()
    }

    /// Number of readings held.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check if the buffer holds no readings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timezone used to derive hour and minute.
    pub fn timezone(&self) -> Tz {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .timezone()
    }

    /// Report fill level against the number of readings a forecast needs.
    pub fn status(&self, readings_needed: usize) -> BufferStatus {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        BufferStatus {
            buffer_size: guard.len(),
            max_size: guard.capacity(),
            ready_for_forecast: guard.len() >= readings_needed,
            readings_needed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{Engagement, EnvironmentalValues};
    use crate::error::PredictionError;
    use chrono::{Duration, TimeZone, Utc};

    fn raw(i: i64) -> RawReading {
        RawReading::complete(
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap() + Duration::seconds(5 * i),
            EnvironmentalValues {
                temperature: 20.0 + i as f64,
                humidity: 45.0,
                gas: 600.0,
                light: 200.0,
                sound: 45.0,
            },
            Engagement {
                occupancy: 20,
                high_engagement: 15,
                low_engagement: 3,
            },
        )
    }

    #[test]
    fn test_add_and_recent() {
        let mut buffer = ReadingBuffer::new(10, chrono_tz::UTC);
        for i in 0..5 {
            buffer.add(raw(i)).unwrap();
        }

        let recent = buffer.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].temperature, 22.0);
        assert_eq!(recent[2].temperature, 24.0);

        // Asking for more than available returns everything
        assert_eq!(buffer.recent(50).len(), 5);
    }

    #[test]
    fn test_incomplete_reading_never_enters() {
        let mut buffer = ReadingBuffer::new(10, chrono_tz::UTC);
        let mut partial = raw(0);
        partial.sound = None;

        let err = buffer.add(partial).unwrap_err();
        assert!(matches!(err, PredictionError::IncompleteReading { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_capacity_discards_oldest() {
        let mut buffer = ReadingBuffer::new(4, chrono_tz::UTC);
        for i in 0..6 {
            buffer.add(raw(i)).unwrap();
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.recent(4)[0].temperature, 22.0);
        assert_eq!(buffer.latest().unwrap().temperature, 25.0);
    }

    #[test]
    fn test_shared_buffer_across_threads() {
        let shared = SharedReadingBuffer::new(ReadingBuffer::new(100, chrono_tz::UTC));
        let writer = shared.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..20 {
                writer.add(raw(i)).unwrap();
            }
        });
        handle.join().unwrap();

        assert_eq!(shared.len(), 20);
        let status = shared.status(11);
        assert!(status.ready_for_forecast);
        assert_eq!(status.max_size, 100);
    }
}
