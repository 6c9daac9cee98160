//! Byte transports the bridge loop runs over.
//!
//! A transport does one bounded read pass per call and never blocks past
//! the configured poll interval, so the loop stays responsive to
//! cancellation between frames.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::time::Duration;

/// Polling byte channel. `read_chunk` returning `Ok(0)` means "no bytes
/// yet"; end-of-stream is signalled as `ErrorKind::UnexpectedEof`.
pub trait ByteTransport: Send {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// Serial device
// ---------------------------------------------------------------------------

/// Transport over a real serial device (USB CDC or UART).
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open a device with the read timeout doubling as the poll interval.
    pub fn open(device: &str, baud_rate: u32, poll: Duration) -> serialport::Result<Self> {
        let port = serialport::new(device, baud_rate).timeout(poll).open()?;
        Ok(Self { port })
    }
}

impl ByteTransport for SerialTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut
                        | io::ErrorKind::WouldBlock
                        | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}

// ---------------------------------------------------------------------------
// Stdio (host emulation)
// ---------------------------------------------------------------------------

/// Transport over stdin/stdout for host-side emulation and piping.
///
/// Stdin reads block, so a reader thread feeds a channel and `read_chunk`
/// polls it with a bounded timeout. EOF on stdin ends the transport.
pub struct StdioTransport {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    eof: bool,
    poll: Duration,
    stdout: io::Stdout,
}

impl StdioTransport {
    pub fn new(poll: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 512];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });
        Self {
            rx,
            pending: VecDeque::new(),
            eof: false,
            poll,
            stdout: io::stdout(),
        }
    }
}

impl ByteTransport for StdioTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            if self.eof {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
            }
            match self.rx.recv_timeout(self.poll) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(mpsc::RecvTimeoutError::Timeout) => return Ok(0),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.eof = true;
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
                }
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stdout.write_all(bytes)?;
        self.stdout.flush()
    }
}
