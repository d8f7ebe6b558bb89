use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Byte link to the device. Blanket-implemented for anything readable,
/// writable and sendable to the acquisition thread, including
/// `Box<dyn SerialPort>`.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> Transport for T {}

pub(crate) enum ReadOutcome {
    Data(usize),
    /// The read timed out or was interrupted. Not an error.
    Idle,
    /// The other end reported end of stream.
    Closed,
}

pub(crate) fn open_port(
    port_name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> serialport::Result<Box<dyn SerialPort>> {
    serialport::new(port_name, baud_rate).timeout(timeout).open()
}

/// Discards whatever the device printed before the read loop starts.
pub(crate) fn flush_input(port: &mut Box<dyn SerialPort>) -> serialport::Result<()> {
    port.clear(ClearBuffer::Input)
}

pub(crate) fn read_chunk<R: Read + ?Sized>(
    port: &mut R,
    buffer: &mut [u8],
) -> io::Result<ReadOutcome> {
    match port.read(buffer) {
        Ok(0) => Ok(ReadOutcome::Closed),
        Ok(n) => Ok(ReadOutcome::Data(n)),
        Err(e) if is_idle(&e) => Ok(ReadOutcome::Idle),
        Err(e) => Err(e),
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

pub(crate) fn send_line<W: Write + ?Sized>(port: &mut W, line: &str) -> io::Result<()> {
    port.write_all(line.as_bytes())?;
    port.write_all(b"\n")?;
    port.flush()
}

/// In-memory transport that replays scripted chunks and records writes.
#[cfg(test)]
pub(crate) mod mock {
    use crate::time::sleep_ms;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::sync::{Arc, Mutex};

    /// What the transport does once the script is used up.
    #[derive(Clone, Copy, Debug)]
    pub(crate) enum ScriptEnd {
        /// Keep timing out, like an idle serial line.
        Idle,
        /// Report end of stream.
        Eof,
        /// Fail with a hard I/O error.
        Fail,
    }

    pub(crate) struct ScriptedTransport {
        chunks: VecDeque<Vec<u8>>,
        end: ScriptEnd,
        written: Arc<Mutex<Vec<u8>>>,
        fail_writes: bool,
        read_delay_ms: u64,
    }

    impl ScriptedTransport {
        pub(crate) fn new(lines: &[&str], end: ScriptEnd) -> ScriptedTransport {
            ScriptedTransport {
                chunks: lines.iter().map(|l| format!("{l}\n").into_bytes()).collect(),
                end,
                written: Arc::new(Mutex::new(Vec::new())),
                fail_writes: false,
                read_delay_ms: 0,
            }
        }

        pub(crate) fn from_chunks(chunks: Vec<Vec<u8>>, end: ScriptEnd) -> ScriptedTransport {
            ScriptedTransport {
                chunks: chunks.into(),
                end,
                written: Arc::new(Mutex::new(Vec::new())),
                fail_writes: false,
                read_delay_ms: 0,
            }
        }

        pub(crate) fn failing_writes(mut self) -> ScriptedTransport {
            self.fail_writes = true;
            self
        }

        /// Every read blocks this long first, like a port with a long timeout.
        pub(crate) fn with_read_delay(mut self, delay_ms: u64) -> ScriptedTransport {
            self.read_delay_ms = delay_ms;
            self
        }

        pub(crate) fn written(&self) -> Arc<Mutex<Vec<u8>>> {
            self.written.clone()
        }
    }

    impl Read for ScriptedTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.read_delay_ms > 0 {
                sleep_ms(self.read_delay_ms);
            }
            if let Some(mut chunk) = self.chunks.pop_front() {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.chunks.push_front(chunk.split_off(n));
                }
                return Ok(n);
            }
            match self.end {
                ScriptEnd::Idle => {
                    sleep_ms(1);
                    Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
                }
                ScriptEnd::Eof => Ok(0),
                ScriptEnd::Fail => Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
            }
        }
    }

    impl Write for ScriptedTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
