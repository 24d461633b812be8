//! Single-instance enforcement and directive forwarding.
//!
//! A loopback TCP listener is both the exclusivity token and the channel:
//! whoever binds the well-known address is the primary instance, and later
//! invocations connect to it and write their arguments as one line.

use crate::directive::Directive;
use crossbeam_channel::Sender;
use ome_core::{OmeError, Result};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Loopback port claimed by the primary instance.
pub const DEFAULT_PORT: u16 = 47813;

/// Upper bound for one directive line.
const MAX_LINE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub addr: SocketAddr,
    /// Bound on a secondary instance's connection attempt.
    pub connect_timeout: Duration,
    /// Bound on reading one directive line from an accepted connection.
    pub read_timeout: Duration,
}

impl InstanceOptions {
    pub fn with_port(port: u16) -> Self {
        Self {
            addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)),
            ..Self::default()
        }
    }
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
        }
    }
}

/// Result of a launch attempt.
pub enum Launch {
    /// This process holds the token; directives from later invocations
    /// arrive on the channel given to [`InstanceController::launch`].
    Primary(DirectiveListener),
    /// Another process holds the token. The arguments were forwarded (or
    /// the attempt was logged as failed); the caller must exit.
    Secondary,
}

pub struct InstanceController {
    options: InstanceOptions,
}

impl InstanceController {
    pub fn new(options: InstanceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InstanceOptions {
        &self.options
    }

    /// Try to take the exclusivity token. `Ok(None)` means another
    /// instance already holds it.
    pub fn acquire(&self) -> Result<Option<TcpListener>> {
        match TcpListener::bind(self.options.addr) {
            Ok(listener) => Ok(Some(listener)),
            Err(e) if e.kind() == ErrorKind::AddrInUse => Ok(None),
            Err(e) => Err(OmeError::Ipc(format!(
                "cannot bind {}: {}",
                self.options.addr, e
            ))),
        }
    }

    /// Send one directive to the primary instance.
    pub fn forward(&self, directive: &Directive) -> Result<()> {
        let timeout = self.options.connect_timeout;
        let mut stream = TcpStream::connect_timeout(&self.options.addr, timeout)
            .map_err(|e| OmeError::Ipc(format!("connect {}: {}", self.options.addr, e)))?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| OmeError::Ipc(e.to_string()))?;

        let mut line = directive.to_line();
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| OmeError::Ipc(format!("write directive: {}", e)))?;

        debug!(line = line.trim_end(), "Forwarded directive");
        Ok(())
    }

    /// Acquire the token, or forward `args` to whoever holds it.
    ///
    /// Only a failure to bind for a reason other than the address being
    /// taken is returned as an error.
    pub fn launch(&self, args: &Directive, directives: Sender<Directive>) -> Result<Launch> {
        match self.acquire()? {
            Some(listener) => {
                let listener =
                    DirectiveListener::spawn(listener, self.options.read_timeout, directives)?;
                info!(addr = %listener.local_addr(), "Primary instance");
                Ok(Launch::Primary(listener))
            }
            None => {
                if let Err(e) = self.forward(args) {
                    warn!(error = %e, "Could not forward arguments to the running instance");
                } else {
                    info!("Arguments forwarded to the running instance");
                }
                Ok(Launch::Secondary)
            }
        }
    }
}

/// Background task accepting one directive per connection.
///
/// The thread lives until the receiving end of the channel is dropped and
/// another connection arrives, or until the process exits.
pub struct DirectiveListener {
    addr: SocketAddr,
    _thread: JoinHandle<()>,
}

impl DirectiveListener {
    pub fn spawn(
        listener: TcpListener,
        read_timeout: Duration,
        directives: Sender<Directive>,
    ) -> Result<Self> {
        let addr = listener.local_addr()?;
        let thread = std::thread::Builder::new()
            .name("ome-listener".into())
            .spawn(move || listen(listener, read_timeout, directives))?;
        Ok(Self {
            addr,
            _thread: thread,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

fn listen(listener: TcpListener, read_timeout: Duration, directives: Sender<Directive>) {
    for conn in listener.incoming() {
        let stream = match conn {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };

        match read_directive(stream, read_timeout) {
            Ok(None) => debug!("Connection closed without a directive"),
            Ok(Some(directive)) => {
                debug!(tokens = directive.tokens().len(), "Received directive");
                if directives.send(directive).is_err() {
                    debug!("Directive receiver gone, stopping listener");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Dropped directive connection"),
        }
    }
}

/// `Ok(None)` when the peer closed without sending anything.
fn read_directive(stream: TcpStream, read_timeout: Duration) -> Result<Option<Directive>> {
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(|e| OmeError::Ipc(e.to_string()))?;

    let mut reader = BufReader::new(stream).take(MAX_LINE_BYTES);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| OmeError::Ipc(format!("read directive: {}", e)))?;
    if read == 0 {
        return Ok(None);
    }

    Ok(Some(Directive::from_line(line.trim_end_matches(['\r', '\n']))))
}
