//! Background collector for line-oriented sensor sources.
//!
//! The serial port itself is owned by the caller: anything implementing
//! `BufRead` (a serial device opened as a file, stdin, a log replay) can be
//! handed to [`LineCollector::start`]. Complete readings are pushed through a
//! bounded channel so the consumer never touches the source directly.

use crate::collector::parser::ReadingAssembler;
use crate::collector::types::{EmotionCounts, Engagement, RawReading};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

/// Configuration for the line collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Capacity of the reading channel
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
        }
    }
}

/// Errors that can occur during collection.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
        }
    }
}

impl std::error::Error for CollectorError {}

/// Latest engagement counts, written by the camera side and read by the collector.
///
/// Empty until the first counts arrive; readings assembled before then carry
/// no engagement fields and are rejected as incomplete.
#[derive(Debug, Clone, Default)]
pub struct EngagementHandle {
    inner: Arc<RwLock<Option<Engagement>>>,
}

impl EngagementHandle {
    /// Create a handle with no counts yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current engagement counts.
    pub fn set(&self, engagement: Engagement) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(engagement);
    }

    /// Update from a frame's emotion counts.
    pub fn update_from_emotions(&self, counts: &EmotionCounts) {
        self.set(counts.engagement());
    }

    /// Current engagement counts, if any have been received.
    pub fn get(&self) -> Option<Engagement> {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Collects readings from a line source on a background thread.
pub struct LineCollector {
    sender: Sender<RawReading>,
    receiver: Receiver<RawReading>,
    engagement: EngagementHandle,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl LineCollector {
    /// Create a new collector sharing the given engagement handle.
    pub fn new(config: CollectorConfig, engagement: EngagementHandle) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity);
        Self {
            sender,
            receiver,
            engagement,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            thread_handle: None,
        }
    }

    /// Start reading lines from `source` in a background thread.
    ///
    /// The thread exits at end of input, on a read error, or after [`stop`](Self::stop).
    pub fn start<R>(&mut self, source: R) -> Result<(), CollectorError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let dropped = self.dropped.clone();
        let engagement = self.engagement.clone();

        let handle = thread::spawn(move || {
            tracing::debug!("line collector started");
            read_lines(source, &sender, &running, &dropped, &engagement);
            running.store(false, Ordering::SeqCst);
            tracing::debug!("line collector finished");
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop collecting and wait for the thread to finish.
    ///
    /// A thread blocked on a read returns after the next line arrives.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if the collector thread is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Readings dropped because the channel was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get the receiver for assembled readings.
    pub fn receiver(&self) -> &Receiver<RawReading> {
        &self.receiver
    }

    /// Try to receive a reading without blocking.
    pub fn try_recv(&self) -> Option<RawReading> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for LineCollector {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn read_lines<R: BufRead>(
    source: R,
    sender: &Sender<RawReading>,
    running: &AtomicBool,
    dropped: &AtomicU64,
    engagement: &EngagementHandle,
) {
    let mut assembler = ReadingAssembler::new();

    for line in source.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("sensor read error: {e}");
                break;
            }
        };

        if let Some(reading) = assembler.feed_line(&line, engagement.get()) {
            match sender.try_send(reading) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    const BLOCK: &str = "Humidity: 45.0 %\n\
                         Temperature: 23.0 °C\n\
                         Light: 200.0 lux\n\
                         Sound: 45\n\
                         Gas (MQ135): 600\n\
                         --------------------------\n";

    #[test]
    fn test_collector_emits_readings() {
        let engagement = EngagementHandle::new();
        engagement.set(Engagement {
            occupancy: 20,
            high_engagement: 15,
            low_engagement: 3,
        });

        let mut collector = LineCollector::new(CollectorConfig::default(), engagement);
        let input = BLOCK.repeat(3);
        collector.start(Cursor::new(input)).unwrap();

        let receiver = collector.receiver().clone();
        let mut readings = Vec::new();
        while let Ok(reading) = receiver.recv_timeout(Duration::from_secs(2)) {
            readings.push(reading);
            if readings.len() == 3 {
                break;
            }
        }
        collector.stop();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].occupancy, Some(20));
        assert_eq!(readings[2].temperature, Some(23.0));
    }

    #[test]
    fn test_handle_empty_until_set() {
        let handle = EngagementHandle::new();
        assert_eq!(handle.get(), None);

        handle.update_from_emotions(&EmotionCounts {
            happy: 4,
            sad: 1,
            ..EmotionCounts::default()
        });
        assert_eq!(
            handle.get(),
            Some(Engagement {
                occupancy: 5,
                high_engagement: 4,
                low_engagement: 1,
            })
        );
    }

    #[test]
    fn test_readings_without_camera_are_incomplete() {
        let mut collector = LineCollector::new(CollectorConfig::default(), EngagementHandle::new());
        collector.start(Cursor::new(BLOCK.to_string())).unwrap();

        let reading = collector
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        collector.stop();

        assert_eq!(reading.temperature, Some(23.0));
        assert_eq!(reading.occupancy, None);
        assert_eq!(
            reading.missing_fields(),
            vec!["occupancy", "high_engagement", "low_engagement"]
        );
    }

    #[test]
    fn test_collector_rejects_double_start() {
        let mut collector = LineCollector::new(CollectorConfig::default(), EngagementHandle::new());
        // An empty source finishes immediately, so hold the flag manually
        collector.running.store(true, Ordering::SeqCst);
        assert!(matches!(
            collector.start(Cursor::new(String::new())),
            Err(CollectorError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_full_channel_counts_drops() {
        let config = CollectorConfig {
            channel_capacity: 1,
        };
        let mut collector = LineCollector::new(config, EngagementHandle::new());
        collector.start(Cursor::new(BLOCK.repeat(4))).unwrap();

        // Nothing is received until the source is exhausted
        while collector.is_running() {
            thread::sleep(Duration::from_millis(10));
        }
        collector.stop();

        assert_eq!(collector.receiver().len(), 1);
        assert_eq!(collector.dropped_count(), 3);
    }
}
