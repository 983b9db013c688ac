// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Cross-process record transport.
//!
//! A `SOCK_SEQPACKET` socketpair carries one framed record per packet.
//! The kernel keeps packet boundaries and delivers each `send` whole, so
//! any number of producer processes sharing the sending end cannot
//! interleave partial frames.
//!
//! Frame layout: an 8-byte big-endian payload length followed by the
//! JSON encoding of a [`Frame`].

use super::record::LogRecord;
use crate::error::TransportError;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::socket::{setsockopt, socketpair, sockopt, AddressFamily, SockFlag, SockType};
use serde::{Deserialize, Serialize};
use std::io;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable through which a child process finds its producer fd
pub const TRANSPORT_FD_ENV: &str = "LOG_RELAY_TRANSPORT_FD";

/// Largest frame (prefix included) the transport accepts
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Requested kernel buffer size for both ends
pub const SOCKET_BUFFER_BYTES: usize = 1024 * 1024;

/// How long the shutdown sentinel may wait for buffer space
///
/// Records never wait: a record that does not fit is dropped at once.
pub const SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Default consumer wake-up interval while idle
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

const LENGTH_PREFIX_BYTES: usize = 8;

/// One message on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Record(LogRecord),
    /// Sentinel: the consumer stops after reading it
    Shutdown,
}

pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, TransportError> {
    let payload =
        serde_json::to_vec(frame).map_err(|e| TransportError::Decode(e.to_string()))?;
    let size = LENGTH_PREFIX_BYTES + payload.len();
    if size > MAX_FRAME_BYTES {
        return Err(TransportError::Oversized {
            size,
            limit: MAX_FRAME_BYTES,
        });
    }

    let mut bytes = Vec::with_capacity(size);
    bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode_frame(bytes: &[u8]) -> Result<Frame, TransportError> {
    if bytes.len() < LENGTH_PREFIX_BYTES {
        return Err(TransportError::Decode(format!(
            "frame too short: {} bytes",
            bytes.len()
        )));
    }
    let (prefix, payload) = bytes.split_at(LENGTH_PREFIX_BYTES);
    let mut len = [0u8; LENGTH_PREFIX_BYTES];
    len.copy_from_slice(prefix);
    let declared = u64::from_be_bytes(len);
    if declared != payload.len() as u64 {
        return Err(TransportError::Decode(format!(
            "length prefix says {} bytes, packet carries {}",
            declared,
            payload.len()
        )));
    }
    serde_json::from_slice(payload).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Create a connected producer/consumer pair
pub fn channel() -> Result<(Producer, Consumer), TransportError> {
    let (send_fd, recv_fd) = socketpair(
        AddressFamily::Unix,
        SockType::SeqPacket,
        None,
        SockFlag::SOCK_CLOEXEC,
    )
    .map_err(|e| TransportError::Io(e.into()))?;

    size_buffers(&send_fd)?;
    size_buffers(&recv_fd)?;

    Ok((Producer::from_owned(send_fd)?, Consumer::from_owned(recv_fd)?))
}

fn size_buffers(fd: &OwnedFd) -> Result<(), TransportError> {
    // The kernel may clamp these to its configured maximum; that is fine.
    setsockopt(fd, sockopt::SndBuf, &SOCKET_BUFFER_BYTES)
        .map_err(|e| TransportError::Io(e.into()))?;
    setsockopt(fd, sockopt::RcvBuf, &SOCKET_BUFFER_BYTES)
        .map_err(|e| TransportError::Io(e.into()))?;
    Ok(())
}

fn set_cloexec(fd: impl AsFd, cloexec: bool) -> Result<(), TransportError> {
    let flags = fcntl(fd.as_fd(), FcntlArg::F_GETFD).map_err(|e| TransportError::Io(e.into()))?;
    let mut fd_flags = FdFlag::from_bits_truncate(flags);
    fd_flags.set(FdFlag::FD_CLOEXEC, cloexec);
    fcntl(fd.as_fd(), FcntlArg::F_SETFD(fd_flags)).map_err(|e| TransportError::Io(e.into()))?;
    Ok(())
}

/// Sending end, shared by every process that emits records
pub struct Producer {
    socket: UnixDatagram,
    dropped: Arc<AtomicU64>,
}

impl Producer {
    fn from_owned(fd: OwnedFd) -> Result<Self, TransportError> {
        let socket = UnixDatagram::from(fd);
        socket.set_write_timeout(Some(SEND_TIMEOUT))?;
        Ok(Self {
            socket,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Adopt the descriptor a parent exported through [`TRANSPORT_FD_ENV`]
    pub fn from_env() -> Result<Self, TransportError> {
        let value = std::env::var(TRANSPORT_FD_ENV).map_err(|_| {
            TransportError::Descriptor(format!("{} is not set", TRANSPORT_FD_ENV))
        })?;
        let fd: RawFd = value.trim().parse().map_err(|_| {
            TransportError::Descriptor(format!("{}={} is not a descriptor", TRANSPORT_FD_ENV, value))
        })?;
        Self::from_inherited_fd(fd)
    }

    /// Adopt an inherited descriptor
    ///
    /// The descriptor must be open and owned by nobody else in this process.
    pub fn from_inherited_fd(fd: RawFd) -> Result<Self, TransportError> {
        if fd < 0 {
            return Err(TransportError::Descriptor(format!("invalid descriptor {}", fd)));
        }
        // SAFETY: F_GETFD only inspects the descriptor table entry.
        if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
            return Err(TransportError::Descriptor(format!(
                "descriptor {} is not open: {}",
                fd,
                io::Error::last_os_error()
            )));
        }
        // SAFETY: the descriptor is open and ownership passes to us per the contract above.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        set_cloexec(&owned, true)?;
        Self::from_owned(owned)
    }

    /// Descriptor to hand to a child process
    ///
    /// Clears `FD_CLOEXEC` on a fresh duplicate so it survives `exec`. The
    /// caller exports the number via [`TRANSPORT_FD_ENV`] and drops the
    /// returned descriptor once the child has been spawned.
    pub fn share_with_child(&self) -> Result<OwnedFd, TransportError> {
        let dup = self.socket.as_fd().try_clone_to_owned()?;
        set_cloexec(&dup, false)?;
        Ok(dup)
    }

    /// Send one record without blocking
    ///
    /// A record that does not fit in the socket buffer right now is
    /// dropped and counted; the call still succeeds.
    pub fn send(&self, record: &LogRecord) -> Result<(), TransportError> {
        let bytes = encode_frame(&Frame::Record(record.clone()))?;
        loop {
            // SAFETY: the descriptor is owned by `self.socket` and `bytes`
            // outlives the call.
            let sent = unsafe {
                libc::send(
                    self.socket.as_raw_fd(),
                    bytes.as_ptr().cast(),
                    bytes.len(),
                    libc::MSG_DONTWAIT | libc::MSG_NOSIGNAL,
                )
            };
            if sent >= 0 {
                return Ok(());
            }
            let e = io::Error::last_os_error();
            match e.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                _ if is_disconnect(&e) => return Err(TransportError::Closed),
                _ => return Err(TransportError::Io(e)),
            }
        }
    }

    /// Send the shutdown sentinel
    pub fn send_shutdown(&self) -> Result<(), TransportError> {
        let bytes = encode_frame(&Frame::Shutdown)?;
        self.send_bytes(&bytes)
    }

    pub(crate) fn send_bytes(&self, bytes: &[u8]) -> Result<(), TransportError> {
        loop {
            match self.socket.send(bytes) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_disconnect(&e) => return Err(TransportError::Closed),
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }

    /// Another handle on the same sending end
    pub fn try_clone(&self) -> Result<Self, TransportError> {
        Ok(Self {
            socket: self.socket.try_clone()?,
            dropped: Arc::clone(&self.dropped),
        })
    }

    /// Records dropped because the transport stayed full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("fd", &self.socket.as_raw_fd())
            .field("dropped", &self.dropped())
            .finish()
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EPIPE) | Some(libc::ECONNRESET) | Some(libc::ENOTCONN) | Some(libc::ECONNREFUSED)
    )
}

/// What a single [`Consumer::receive`] call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Record(LogRecord),
    Shutdown,
    /// Poll interval elapsed without traffic
    Idle,
    /// Every sending end is gone
    Closed,
}

/// Receiving end, owned by the collector
pub struct Consumer {
    socket: UnixDatagram,
    buf: Vec<u8>,
}

impl Consumer {
    fn from_owned(fd: OwnedFd) -> Result<Self, TransportError> {
        let socket = UnixDatagram::from(fd);
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        Ok(Self {
            socket,
            buf: vec![0u8; MAX_FRAME_BYTES],
        })
    }

    pub fn set_poll_interval(&self, interval: Duration) -> Result<(), TransportError> {
        let interval = (!interval.is_zero()).then_some(interval);
        self.socket.set_read_timeout(interval)?;
        Ok(())
    }

    /// Wait up to one poll interval for the next frame
    pub fn receive(&mut self) -> Result<Received, TransportError> {
        let n = match self.socket.recv(&mut self.buf) {
            Ok(0) => return Ok(Received::Closed),
            Ok(n) => n,
            Err(e) if is_timeout(&e) || e.kind() == io::ErrorKind::Interrupted => {
                return Ok(Received::Idle)
            }
            Err(e) if is_disconnect(&e) => return Ok(Received::Closed),
            Err(e) => return Err(TransportError::Io(e)),
        };

        match decode_frame(&self.buf[..n])? {
            Frame::Record(record) => Ok(Received::Record(record)),
            Frame::Shutdown => Ok(Received::Shutdown),
        }
    }
}
