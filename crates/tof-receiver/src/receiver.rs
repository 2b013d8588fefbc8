//! Async serial receiver and simulated source

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info, warn};

use crate::message::{parse_line, TofMessage};
use crate::{ProximitySource, TofConfig, TofError};

/// Latest-trigger slot shared between the reader task and the safety loop
#[derive(Default)]
struct TriggerSlot {
    latest_m: Mutex<Option<f64>>,
    alive: AtomicBool,
}

/// Reads the Pico's serial stream on a background task
///
/// Only the most recent trigger is kept; older unread triggers are
/// superseded, so a slow loop always acts on the freshest distance.
pub struct TofReceiver {
    slot: Arc<TriggerSlot>,
    reader: JoinHandle<()>,
}

impl TofReceiver {
    /// Open the configured serial port and start reading.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: &TofConfig) -> Result<Self, TofError> {
        let stream = tokio_serial::new(&config.serial_port, config.baud_rate)
            .open_native_async()
            .map_err(|e| TofError::Open {
                port: config.serial_port.clone(),
                reason: e.to_string(),
            })?;
        info!("Opened ToF serial port: {}", config.serial_port);
        Ok(Self::from_reader(BufReader::new(stream), config.trigger_distance_mm))
    }

    /// Start reading from any line-oriented async source
    pub fn from_reader<R>(reader: R, trigger_distance_mm: f64) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let slot = Arc::new(TriggerSlot::default());
        slot.alive.store(true, Ordering::SeqCst);
        let task_slot = slot.clone();

        let reader = tokio::spawn(async move {
            let mut stream = reader;
            let mut buf = Vec::with_capacity(256);
            loop {
                buf.clear();
                match stream.read_until(b'\n', &mut buf).await {
                    Ok(0) => {
                        warn!("ToF serial stream closed");
                        break;
                    }
                    Ok(_) => {
                        // Boot noise and line glitches are not valid UTF-8; drop the bad bytes.
                        let line = String::from_utf8_lossy(&buf).replace(char::REPLACEMENT_CHARACTER, "");
                        handle_line(&task_slot, &line, trigger_distance_mm);
                    }
                    Err(e) => {
                        error!("Error reading from serial: {}", e);
                        break;
                    }
                }
            }
            task_slot.alive.store(false, Ordering::SeqCst);
        });

        Self { slot, reader }
    }
}

fn handle_line(slot: &TriggerSlot, line: &str, trigger_distance_mm: f64) {
    let Some(message) = parse_line(line) else {
        return;
    };
    if let TofMessage::Status { event, detail } = &message {
        debug!("Pico status [{}]: {}", event, detail.as_deref().unwrap_or(""));
        return;
    }
    if let Some(distance) = message.trigger_distance_m(trigger_distance_mm) {
        info!("ToF trigger received: {:.0} mm", distance * 1000.0);
        *slot.latest_m.lock().unwrap_or_else(|e| e.into_inner()) = Some(distance);
    }
}

impl ProximitySource for TofReceiver {
    fn read_latest_distance(&mut self) -> Result<Option<f64>, TofError> {
        let latest = self
            .slot
            .latest_m
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        // Drain a final buffered trigger before reporting the disconnect.
        if latest.is_none() && !self.slot.alive.load(Ordering::SeqCst) {
            return Err(TofError::Disconnected("serial reader exited".to_string()));
        }
        Ok(latest)
    }
}

impl Drop for TofReceiver {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Replays a fixed list of distances, one per read, cycling forever
pub struct SimulatedTof {
    samples: Vec<f64>,
    index: usize,
}

impl SimulatedTof {
    pub fn new(samples: Vec<f64>) -> Self {
        info!("Using simulated ToF source with {} samples", samples.len());
        Self { samples, index: 0 }
    }
}

impl ProximitySource for SimulatedTof {
    fn read_latest_distance(&mut self) -> Result<Option<f64>, TofError> {
        if self.samples.is_empty() {
            return Ok(None);
        }
        let value = self.samples[self.index % self.samples.len()];
        self.index += 1;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_latest_trigger_wins_and_is_consumed() {
        let input: &[u8] = b"{\"event\":\"boot\",\"msg\":\"ok\"}\n\
{\"event\":\"trigger\",\"d_mm\":900}\n\
{\"type\":\"tof\",\"d_mm\":8191}\n\
{\"type\":\"tof\",\"d_mm\":1200}\n";
        let (client, mut server) = tokio::io::duplex(1024);
        let mut receiver = TofReceiver::from_reader(BufReader::new(client), 2500.0);

        tokio::io::AsyncWriteExt::write_all(&mut server, input).await.unwrap();
        settle().await;

        assert_eq!(receiver.read_latest_distance().unwrap(), Some(1.2));
        assert_eq!(receiver.read_latest_distance().unwrap(), None);
    }

    #[tokio::test]
    async fn test_undecodable_noise_is_skipped() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut receiver = TofReceiver::from_reader(BufReader::new(client), 2500.0);

        tokio::io::AsyncWriteExt::write_all(
            &mut server,
            b"\xff\xfe garbage\n{\"event\":\"trigger\",\"d_mm\":812}\n",
        )
        .await
        .unwrap();
        settle().await;
        assert_eq!(receiver.read_latest_distance().unwrap(), Some(0.812));

        tokio::io::AsyncWriteExt::write_all(&mut server, b"\x80{\"type\":\"tof\",\"d_mm\":400}\n")
            .await
            .unwrap();
        settle().await;
        assert_eq!(receiver.read_latest_distance().unwrap(), Some(0.4));

        tokio::io::AsyncWriteExt::write_all(&mut server, b"{\"event\":\"trigger\",\"d_mm\":650}\n")
            .await
            .unwrap();
        settle().await;
        assert_eq!(receiver.read_latest_distance().unwrap(), Some(0.65));
    }

    #[tokio::test]
    async fn test_closed_stream_reports_disconnect() {
        let reader = BufReader::new(&b"{\"event\":\"trigger\",\"d_mm\":300}\n"[..]);
        let mut receiver = TofReceiver::from_reader(reader, 2500.0);
        settle().await;

        assert_eq!(receiver.read_latest_distance().unwrap(), Some(0.3));
        assert!(matches!(
            receiver.read_latest_distance(),
            Err(TofError::Disconnected(_))
        ));
    }

    #[test]
    fn test_simulated_cycles() {
        let mut sim = SimulatedTof::new(vec![0.5, 0.1]);
        let reads: Vec<_> = (0..3).map(|_| sim.read_latest_distance().unwrap()).collect();
        assert_eq!(reads, vec![Some(0.5), Some(0.1), Some(0.5)]);

        let mut empty = SimulatedTof::new(Vec::new());
        assert_eq!(empty.read_latest_distance().unwrap(), None);
    }
}
