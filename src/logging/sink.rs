// SPDX-License-Identifier: Apache-2.0 OR MIT
// Output sinks and the bindings that attach them to loggers

use super::record::LogRecord;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Well-known local syslog sockets, tried in order
pub const LOCAL_SYSLOG_SOCKETS: [&str; 2] = ["/dev/log", "/var/run/syslog"];

/// Syslog facility `user`
const SYSLOG_FACILITY_USER: u8 = 1;

/// Output sink for rendered log lines
pub trait LogSink: Send + Sync {
    /// Write one rendered line; `record` carries the severity and origin
    fn write_entry(&self, record: &LogRecord, rendered: &str) -> io::Result<()>;

    /// Flush any buffered output
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Standard output sink
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_entry(&self, _record: &LogRecord, rendered: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered)
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Append-only file sink
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write_entry(&self, _record: &LogRecord, rendered: &str) -> io::Result<()> {
        // One write per line: other handles may append to the same file.
        let mut line = String::with_capacity(rendered.len() + 1);
        line.push_str(rendered);
        line.push('\n');
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

/// Where syslog datagrams go
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyslogTarget {
    /// Local domain socket (e.g. `/dev/log`)
    Local(PathBuf),
    /// Remote collector over UDP
    Network { host: String, port: u16 },
}

impl SyslogTarget {
    /// Resolve a configured host against the well-known local sockets
    pub fn resolve(host: &str, port: u16) -> Self {
        Self::resolve_with(host, port, &LOCAL_SYSLOG_SOCKETS)
    }

    /// Like [`SyslogTarget::resolve`] with an explicit candidate list
    ///
    /// Local aliases (`127.0.0.1`, `localhost`) use the first candidate
    /// that exists as a socket; otherwise the network address is used.
    pub fn resolve_with<P: AsRef<Path>>(host: &str, port: u16, candidates: &[P]) -> Self {
        let host = host.trim();
        if is_local_alias(host) {
            if let Some(path) = candidates.iter().map(AsRef::as_ref).find(|p| is_socket(p)) {
                return SyslogTarget::Local(path.to_path_buf());
            }
        }
        SyslogTarget::Network {
            host: host.to_string(),
            port,
        }
    }
}

impl std::fmt::Display for SyslogTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyslogTarget::Local(path) => write!(f, "{}", path.display()),
            SyslogTarget::Network { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

fn is_local_alias(host: &str) -> bool {
    host == "127.0.0.1" || host.eq_ignore_ascii_case("localhost")
}

fn is_socket(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.file_type().is_socket())
        .unwrap_or(false)
}

enum SyslogSocket {
    /// Reconnected when the daemon re-creates its socket
    Local {
        path: PathBuf,
        socket: Mutex<UnixDatagram>,
    },
    Network { socket: UdpSocket, addr: SocketAddr },
}

fn connect_local(path: &Path) -> io::Result<UnixDatagram> {
    let socket = UnixDatagram::unbound()?;
    socket.connect(path)?;
    Ok(socket)
}

fn is_stale_connection(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotFound
    )
}

/// Syslog sink speaking the BSD datagram format: `<PRI>line\0`
pub struct SyslogSink {
    target: SyslogTarget,
    socket: SyslogSocket,
}

impl SyslogSink {
    pub fn connect(target: SyslogTarget) -> io::Result<Self> {
        let socket = match &target {
            SyslogTarget::Local(path) => SyslogSocket::Local {
                path: path.clone(),
                socket: Mutex::new(connect_local(path)?),
            },
            SyslogTarget::Network { host, port } => {
                let addr = (host.as_str(), *port).to_socket_addrs()?.next().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no address found for syslog host '{}'", host),
                    )
                })?;
                let bind_addr: SocketAddr = if addr.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    ([0u16; 8], 0).into()
                };
                let socket = UdpSocket::bind(bind_addr)?;
                SyslogSocket::Network { socket, addr }
            }
        };
        Ok(Self { target, socket })
    }

    pub fn target(&self) -> &SyslogTarget {
        &self.target
    }
}

/// Encode one syslog datagram
pub fn syslog_datagram(record: &LogRecord, rendered: &str) -> Vec<u8> {
    let priority = (SYSLOG_FACILITY_USER << 3) | record.severity.syslog_code();
    let mut datagram = format!("<{}>{}", priority, rendered).into_bytes();
    datagram.push(0);
    datagram
}

impl LogSink for SyslogSink {
    fn write_entry(&self, record: &LogRecord, rendered: &str) -> io::Result<()> {
        let datagram = syslog_datagram(record, rendered);
        match &self.socket {
            SyslogSocket::Local { path, socket } => {
                let mut socket = socket.lock().unwrap_or_else(|e| e.into_inner());
                match socket.send(&datagram) {
                    Ok(_) => {}
                    Err(e) if is_stale_connection(&e) => {
                        *socket = connect_local(path)?;
                        socket.send(&datagram)?;
                    }
                    Err(e) => return Err(e),
                }
            }
            SyslogSocket::Network { socket, addr } => {
                socket.send_to(&datagram, addr)?;
            }
        }
        Ok(())
    }
}

/// In-memory sink, mainly for tests and embedding
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogSink for MemorySink {
    fn write_entry(&self, _record: &LogRecord, rendered: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(rendered.to_string());
        Ok(())
    }
}

/// Line layout applied by a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// `Mar 02 14:01:07 app:logger[pid][thread] <LEVEL>: message`
    Verbose,
    /// `logger[pid] <LEVEL>: message`
    Simple,
}

impl Layout {
    pub fn render(self, record: &LogRecord, app_name: &str) -> String {
        let logger = display_name(&record.logger_name);
        match self {
            Layout::Verbose => {
                let timestamp = record.timestamp.with_timezone(&Local).format("%b %d %H:%M:%S");
                let origin = if app_name.is_empty() {
                    logger.to_string()
                } else {
                    format!("{}:{}", app_name, logger)
                };
                format!(
                    "{} {}[{}][{}] <{}>: {}",
                    timestamp,
                    origin,
                    record.process_id,
                    record.thread_name,
                    record.severity,
                    record.message
                )
            }
            Layout::Simple => format!(
                "{}[{}] <{}>: {}",
                logger, record.process_id, record.severity, record.message
            ),
        }
    }
}

/// Name shown for a logger; the root logger has an empty name
pub fn display_name(logger: &str) -> &str {
    if logger.is_empty() {
        "root"
    } else {
        logger
    }
}

/// Context-enrichment filter: supplies the application display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFilter {
    app_name: Option<String>,
}

impl ContextFilter {
    pub fn new(app_name: Option<String>) -> Self {
        Self {
            app_name: app_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        }
    }

    pub fn app_name(&self) -> &str {
        self.app_name.as_deref().unwrap_or("")
    }
}

/// Kind of sink behind a binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Stdout,
    Syslog(SyslogTarget),
    File(PathBuf),
    Memory,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Stdout => write!(f, "stdout"),
            SinkKind::Syslog(target) => write!(f, "syslog {}", target),
            SinkKind::File(path) => write!(f, "file {}", path.display()),
            SinkKind::Memory => write!(f, "memory"),
        }
    }
}

/// A sink attached to one logger name, with its layout and filter
#[derive(Clone)]
pub struct SinkBinding {
    pub kind: SinkKind,
    pub layout: Layout,
    pub filter: ContextFilter,
    /// When false, only records emitted on the owning logger reach this
    /// sink; records propagated from descendants skip it.
    pub propagate: bool,
    sink: Arc<dyn LogSink>,
}

impl SinkBinding {
    pub fn new(kind: SinkKind, layout: Layout, filter: ContextFilter, sink: Arc<dyn LogSink>) -> Self {
        Self {
            kind,
            layout,
            filter,
            propagate: true,
            sink,
        }
    }

    /// Convenience binding for a [`MemorySink`]
    pub fn memory(sink: &MemorySink, layout: Layout) -> Self {
        Self::new(
            SinkKind::Memory,
            layout,
            ContextFilter::default(),
            Arc::new(sink.clone()),
        )
    }

    pub fn without_propagation(mut self) -> Self {
        self.propagate = false;
        self
    }

    /// Render and write one record
    pub fn deliver(&self, record: &LogRecord) -> io::Result<()> {
        let rendered = self.layout.render(record, self.filter.app_name());
        self.sink.write_entry(record, &rendered)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl std::fmt::Debug for SinkBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkBinding")
            .field("kind", &self.kind)
            .field("layout", &self.layout)
            .field("filter", &self.filter)
            .field("propagate", &self.propagate)
            .finish()
    }
}
