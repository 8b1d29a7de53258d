//! Loopback listener that can be closed from outside the server task

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::Poll;
use std::time::Duration;

use axum::serve::Listener;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

type Slot = Arc<Mutex<Option<TcpListener>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<TcpListener>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Listener handed to `axum::serve`
///
/// Once closed, `accept` stays pending forever; the server ends through its
/// graceful shutdown signal.
pub(crate) struct ClosableListener {
    slot: Slot,
    local_addr: SocketAddr,
}

/// Drops the socket of a [`ClosableListener`]
pub(crate) struct ListenerCloser {
    slot: Slot,
}

impl ClosableListener {
    pub(crate) fn new(listener: TcpListener) -> io::Result<(Self, ListenerCloser)> {
        let local_addr = listener.local_addr()?;
        let slot: Slot = Arc::new(Mutex::new(Some(listener)));
        let closer = ListenerCloser { slot: slot.clone() };
        Ok((Self { slot, local_addr }, closer))
    }
}

impl ListenerCloser {
    /// Close the listening socket. The port is free when this returns.
    pub(crate) fn close(&self) {
        if lock(&self.slot).take().is_some() {
            debug!("Listener closed");
        }
    }
}

impl Listener for ClosableListener {
    type Io = TcpStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let accepted = poll_fn(|cx| match lock(&self.slot).as_ref() {
                Some(listener) => listener.poll_accept(cx),
                None => Poll::Pending,
            })
            .await;

            match accepted {
                Ok(conn) => return conn,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_close_frees_port() {
        let tcp = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let (listener, closer) = ClosableListener::new(tcp).unwrap();
        let addr = listener.local_addr().unwrap();

        closer.close();
        closer.close();

        assert!(TcpListener::bind(addr).await.is_ok());
        assert_eq!(listener.local_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_accept_returns_connection() {
        let tcp = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let (mut listener, _closer) = ClosableListener::new(tcp).unwrap();
        let addr = listener.local_addr().unwrap();

        let connect = tokio::spawn(async move { TcpStream::connect(addr).await });
        let (_stream, peer) = listener.accept().await;
        assert!(peer.ip().is_loopback());
        assert!(connect.await.unwrap().is_ok());
    }
}
