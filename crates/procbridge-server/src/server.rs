//! Server lifecycle and accept loop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use procbridge_common::{ProcBridgeError, Result};

use crate::connection;
use crate::dispatch::Dispatcher;

/// Mutable lifecycle state, guarded by one lock per server instance.
///
/// The lock is held only across state transitions and checks, never across
/// a blocking accept or a connection body.
struct Lifecycle {
    started: bool,
    listener: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    accept_handle: Option<JoinHandle<()>>,
}

/// A procbridge server: a listening socket, an accept loop on its own
/// thread, and one thread per accepted connection.
///
/// The lifecycle is a strict `Stopped -> Started -> Stopped` state machine:
/// calling [`start`](Server::start) while started or
/// [`stop`](Server::stop) while stopped fails with
/// [`ProcBridgeError::IllegalState`], never a silent no-op. A stopped server
/// can be started again.
///
/// `stop()` waits for the accept loop to exit, so the port is already
/// released when it returns; in-flight connections drain on their own
/// threads without being waited for.
pub struct Server {
    port: u16,
    dispatcher: Arc<Dispatcher>,
    state: Arc<Mutex<Lifecycle>>,
}

impl Server {
    /// Creates a stopped server that will bind `port` on start.
    ///
    /// Port 0 asks the OS for a free port; the actual one is available from
    /// [`local_addr`](Server::local_addr) once started.
    pub fn new(port: u16, dispatcher: Dispatcher) -> Self {
        Server {
            port,
            dispatcher: Arc::new(dispatcher),
            state: Arc::new(Mutex::new(Lifecycle {
                started: false,
                listener: None,
                local_addr: None,
                accept_handle: None,
            })),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_started(&self) -> bool {
        lock(&self.state).started
    }

    /// The bound address while started, `None` otherwise.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.state).local_addr
    }

    /// Binds the listening socket and spawns the accept loop.
    ///
    /// The state flips to started only after the bind succeeds.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.started {
            return Err(ProcBridgeError::IllegalState(
                "server already started".to_owned(),
            ));
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.port)).map_err(|e| {
            ProcBridgeError::Connection(format!("failed to bind port {}: {}", self.port, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ProcBridgeError::Connection(format!("failed to get local addr: {}", e)))?;
        let accept_listener = listener.try_clone().map_err(|e| {
            ProcBridgeError::Connection(format!("failed to clone listener: {}", e))
        })?;

        let dispatcher = Arc::clone(&self.dispatcher);
        let loop_state = Arc::clone(&self.state);
        let accept_handle = thread::Builder::new()
            .name("procbridge-accept".to_owned())
            .spawn(move || accept_loop(accept_listener, dispatcher, loop_state))
            .map_err(|e| {
                ProcBridgeError::Connection(format!("failed to spawn accept thread: {}", e))
            })?;

        // The accept thread re-checks `started` under this lock, so setting
        // it before the lock is released closes the startup race.
        state.listener = Some(listener);
        state.local_addr = Some(local_addr);
        state.accept_handle = Some(accept_handle);
        state.started = true;

        tracing::info!(%local_addr, "server started");
        Ok(())
    }

    /// Flips the state to stopped and closes the listening socket. The port
    /// is free again once this returns; in-flight connections finish on
    /// their own threads.
    pub fn stop(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.started {
            return Err(ProcBridgeError::IllegalState(
                "server not started".to_owned(),
            ));
        }

        state.started = false;
        let listener = state.listener.take();
        let local_addr = state.local_addr.take();
        let accept_handle = state.accept_handle.take();
        drop(state);

        // std listeners have no close-to-unblock; a loopback connect wakes
        // the accept loop so it can observe the stopped state and exit.
        if let Some(addr) = local_addr {
            let _ = TcpStream::connect(wake_addr(addr));
        }
        // The accept thread holds a clone of the listener; joining it
        // (outside the lock, which its exit path takes) makes sure both
        // handles are dropped and the socket is closed before returning.
        if let Some(handle) = accept_handle {
            let _ = handle.join();
        }
        drop(listener);

        tracing::info!("server stopped");
        Ok(())
    }
}

fn accept_loop(listener: TcpListener, dispatcher: Arc<Dispatcher>, state: Arc<Mutex<Lifecycle>>) {
    loop {
        let (stream, peer_addr) = match listener.accept() {
            Ok(pair) => pair,
            // The listener was closed by stop(); this is the expected
            // termination path, not an error to report.
            Err(_) => return,
        };

        // Guard the race against a concurrent stop(): only hand the
        // connection off while still started, holding the lifecycle lock
        // across the check-and-spawn.
        let guard = lock(&state);
        if !guard.started {
            return;
        }

        tracing::debug!(%peer_addr, "connection established");
        let dispatcher = Arc::clone(&dispatcher);
        let spawned = thread::Builder::new()
            .name("procbridge-conn".to_owned())
            .spawn(move || connection::handle_connection(stream, dispatcher));
        if let Err(e) = spawned {
            tracing::warn!("failed to spawn connection thread: {}", e);
        }
        drop(guard);
    }
}

/// A connectable address for the wake-up connection in `stop()`.
fn wake_addr(bound: SocketAddr) -> SocketAddr {
    let ip = if bound.ip().is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        bound.ip()
    };
    SocketAddr::new(ip, bound.port())
}

/// Poison-tolerant lock: a panicking connection thread must not wedge the
/// server lifecycle.
fn lock(state: &Arc<Mutex<Lifecycle>>) -> MutexGuard<'_, Lifecycle> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
