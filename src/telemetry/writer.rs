//! # CSV Telemetry Writer
//!
//! One writer instance covers one logging session. Each packet kind gets
//! its own file at `{base}_{KindLabel}.csv`, opened (and truncated) on the
//! first write of that kind. Every line starts with the milliseconds
//! elapsed since the session's first write, followed by the packet's
//! fields in declared order.
//!
//! Writes arrive from the byte-arrival task while `close` arrives from the
//! controlling caller, so the writer holds an `Armed → Closing → Closed`
//! state that is checked before every write — once closing begins, no
//! write can touch a released file handle, and a write already past the
//! check finishes under the file lock before close proceeds.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use tracing::warn;

use crate::error::Result;
use crate::protocol::packet::{Packet, PacketKind, PACKET_KIND_COUNT};

const STATE_ARMED: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Per-kind CSV log writer for a single logging session.
///
/// # Examples
///
/// ```no_run
/// use xbimu_logger::telemetry::CsvLogWriter;
///
/// # fn main() -> xbimu_logger::error::Result<()> {
/// let writer = CsvLogWriter::new("logs/run_26");
/// writer.write_orientation(100, 200, 300, 400, 1)?;
/// writer.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CsvLogWriter {
    base_path: String,
    state: AtomicU8,
    inner: Mutex<WriterInner>,
}

#[derive(Debug, Default)]
struct WriterInner {
    /// Latched on the first write of any kind; all timestamps are relative
    /// to it.
    started: Option<Instant>,
    files: [Option<BufWriter<File>>; PACKET_KIND_COUNT],
}

impl CsvLogWriter {
    /// Create an armed writer.
    ///
    /// No file is touched until the first write of each kind; the session
    /// clock starts on the first write of any kind.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Path prefix extended with `_{KindLabel}.csv` per kind
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            state: AtomicU8::new(STATE_ARMED),
            inner: Mutex::new(WriterInner::default()),
        }
    }

    /// Append one orientation packet line.
    pub fn write_orientation(&self, w: i32, x: i32, y: i32, z: i32, sequence: i32) -> Result<()> {
        self.write_line(PacketKind::Orientation, &[w, x, y, z, sequence])
    }

    /// Append one raw sensors packet line.
    #[allow(clippy::too_many_arguments)]
    pub fn write_raw_sensors(
        &self,
        gx: i32,
        gy: i32,
        gz: i32,
        ax: i32,
        ay: i32,
        az: i32,
        mx: i32,
        my: i32,
        mz: i32,
        sequence: i32,
    ) -> Result<()> {
        self.write_line(
            PacketKind::RawSensors,
            &[gx, gy, gz, ax, ay, az, mx, my, mz, sequence],
        )
    }

    /// Append one battery packet line.
    pub fn write_battery(&self, millivolts: i32, sequence: i32) -> Result<()> {
        self.write_line(PacketKind::Battery, &[millivolts, sequence])
    }

    /// Append a decoded packet to the log of its kind.
    pub fn write_packet(&self, packet: &Packet) -> Result<()> {
        match *packet {
            Packet::Orientation {
                w,
                x,
                y,
                z,
                sequence,
            } => self.write_orientation(w, x, y, z, sequence),
            Packet::RawSensors {
                gx,
                gy,
                gz,
                ax,
                ay,
                az,
                mx,
                my,
                mz,
                sequence,
            } => self.write_raw_sensors(gx, gy, gz, ax, ay, az, mx, my, mz, sequence),
            Packet::Battery {
                millivolts,
                sequence,
            } => self.write_battery(millivolts, sequence),
        }
    }

    /// Flush and release every open log file.
    ///
    /// Idempotent; all writes arriving afterwards are silent no-ops. The
    /// writer never reopens a file once closed.
    pub fn close(&self) {
        if self
            .state
            .compare_exchange(
                STATE_ARMED,
                STATE_CLOSING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for slot in &mut inner.files {
            if let Some(mut file) = slot.take() {
                if let Err(e) = file.flush() {
                    warn!("Failed to flush telemetry log: {}", e);
                }
            }
        }
        self.state.store(STATE_CLOSED, Ordering::Release);
    }

    /// Path of the log file backing one packet kind.
    fn kind_path(&self, kind: PacketKind) -> String {
        format!("{}_{}.csv", self.base_path, kind.label())
    }

    fn write_line(&self, kind: PacketKind, fields: &[i32]) -> Result<()> {
        if self.state.load(Ordering::Acquire) != STATE_ARMED {
            return Ok(());
        }

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Re-check under the lock; a concurrent close may have won.
        if self.state.load(Ordering::Acquire) != STATE_ARMED {
            return Ok(());
        }

        let started = *inner.started.get_or_insert_with(Instant::now);

        let file = match &mut inner.files[kind as usize] {
            Some(file) => file,
            slot @ None => {
                // First write of this kind: truncate whatever an earlier
                // session left at the same path.
                let file = File::create(self.kind_path(kind))?;
                slot.insert(BufWriter::new(file))
            }
        };

        write!(file, "{}", started.elapsed().as_millis())?;
        for field in fields {
            write!(file, ",{}", field)?;
        }
        writeln!(file)?;
        Ok(())
    }
}

impl Drop for CsvLogWriter {
    fn drop(&mut self) {
        self.close();
    }
}
