use std::future::Future;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use pack_engine::PackSize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc;
use tokio::time;

use crate::connection::Connection;
use crate::protocol::{Command, Response};
use crate::provider::CatalogProvider;
use crate::service::{PackingService, ServiceError};

/// Accept loop state, created by [`run`].
struct Listener<P> {
    listener: TcpListener,

    service: Arc<PackingService<P>>,

    /// Every connection task subscribes to this. Dropping the sender tells
    /// them all to stop at their next command boundary.
    notify_shutdown: broadcast::Sender<()>,

    /// Each connection task holds a clone. Once every clone is dropped the
    /// matching receiver yields `None`, which is how `run` knows all
    /// connections have finished.
    shutdown_complete_tx: mpsc::Sender<()>,
}

impl<P: CatalogProvider> Listener<P> {
    async fn run(&mut self) -> std::io::Result<()> {
        info!("accepting inbound connections");
        loop {
            let socket = self.accept().await?;
            let mut handler = Handler {
                con: Connection::new(socket),
                service: self.service.clone(),
                shutdown: self.notify_shutdown.subscribe(),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };
            tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    error!("connection error: {:?}", err);
                }
            });
        }
    }

    /// Accepts an inbound connection, retrying with exponential backoff
    /// (1s, 2s, 4s, ... 64s) before giving up.
    async fn accept(&mut self) -> std::io::Result<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    debug!("accepted connection from {}", peer);
                    return Ok(socket);
                }
                Err(err) => {
                    if backoff > 64 {
                        return Err(err);
                    }
                    warn!("accept failed, retrying in {}s: {}", backoff, err);
                }
            }

            time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

struct Handler<P> {
    con: Connection,
    service: Arc<PackingService<P>>,
    shutdown: Receiver<()>,
    /// Never used directly; dropped together with the handler.
    _shutdown_complete: mpsc::Sender<()>,
}

impl<P: CatalogProvider> Handler<P> {
    async fn run(&mut self) -> std::io::Result<()> {
        loop {
            let command = tokio::select! {
                command = self.con.read_command() => command,
                _ = self.shutdown.recv() => return Ok(()),
            };

            let command = match command {
                Ok(Some(command)) => command,
                Ok(None) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::InvalidData => {
                    self.con.write_response(&Response::ClientError(err.to_string())).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let response = match command {
                Command::Quit => return Ok(()),
                Command::Pack { quantity } => match self.service.calculate_packs(quantity).await {
                    Ok(plan) => Response::Plan(plan),
                    Err(err) => error_response(err),
                },
                Command::Sizes => match self.service.pack_sizes().await {
                    Ok(sizes) => Response::Sizes(sizes.iter().map(|pack| pack.max_items).collect()),
                    Err(err) => error_response(err),
                },
                Command::SetSizes { sizes } => {
                    let sizes = sizes.into_iter().map(PackSize::new).collect();
                    match self.service.update_pack_sizes(sizes).await {
                        Ok(()) => Response::Stored,
                        Err(err) => error_response(err),
                    }
                }
            };
            self.con.write_response(&response).await?;
        }
    }
}

fn error_response(err: ServiceError) -> Response {
    if err.is_client_error() {
        debug!("rejected request: {}", err);
        Response::ClientError(err.to_string())
    } else {
        error!("request failed: {}", err);
        Response::ServerError(err.to_string())
    }
}

/// Serves `service` on `listener` until `shutdown` completes, then waits for
/// open connections to wind down.
pub async fn run<P: CatalogProvider>(listener: TcpListener, service: PackingService<P>, shutdown: impl Future) {
    let (notify_shutdown, _) = broadcast::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);

    let mut server = Listener {
        listener,
        service: Arc::new(service),
        notify_shutdown,
        shutdown_complete_tx,
    };

    // The accept loop only returns on error, so normally this waits for the
    // shutdown signal.
    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!("failed to accept: {}", err);
            }
        }
        _ = shutdown => {
            info!("shutting down");
        }
    }

    let Listener {
        notify_shutdown,
        shutdown_complete_tx,
        ..
    } = server;

    // Closing the broadcast channel stops every handler; dropping our own
    // sender leaves only the handlers' clones keeping the mpsc channel open.
    drop(notify_shutdown);
    drop(shutdown_complete_tx);

    shutdown_complete_rx.recv().await;
}

#[cfg(test)]
mod tests {
    use pack_engine::DEFAULT_PACK_SIZES;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::sync::oneshot;

    use super::*;
    use crate::provider::InMemoryCatalog;
    use crate::service::ServiceConfig;

    struct Client {
        reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
        writer: tokio::net::tcp::OwnedWriteHalf,
    }

    impl Client {
        async fn connect(addr: std::net::SocketAddr) -> std::io::Result<Client> {
            let (reader, writer) = TcpStream::connect(addr).await?.into_split();
            Ok(Client {
                reader: BufReader::new(reader),
                writer,
            })
        }

        async fn call(&mut self, line: &str) -> std::io::Result<String> {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\r\n").await?;
            let mut reply = String::new();
            self.reader.read_line(&mut reply).await?;
            Ok(reply.trim_end().to_string())
        }
    }

    #[tokio::test]
    async fn test_server_round_trip() -> std::io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let service = PackingService::new(
            InMemoryCatalog::new(DEFAULT_PACK_SIZES),
            ServiceConfig {
                max_quantity: 100_000,
                ..ServiceConfig::default()
            },
        );
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, service, stop_rx));

        let mut client = Client::connect(addr).await?;
        assert_eq!(client.call("pack 12001").await?, r#"PLAN {"250":1,"2000":1,"5000":2}"#);
        assert_eq!(client.call("pack 501").await?, r#"PLAN {"250":1,"500":1}"#);
        assert_eq!(client.call("pack 0").await?, "CLIENT_ERROR order quantity must be greater than 0");
        assert_eq!(
            client.call("pack 100001").await?,
            "CLIENT_ERROR order quantity 100001 exceeds the limit of 100000"
        );
        assert_eq!(client.call("pack many").await?, "CLIENT_ERROR invalid quantity");
        assert_eq!(client.call("sizes").await?, "SIZES 250 500 1000 2000 5000");

        assert_eq!(client.call("set_sizes").await?, "CLIENT_ERROR no pack sizes available");
        assert_eq!(
            client.call("set_sizes 0 5").await?,
            "CLIENT_ERROR pack size 0 is out of range (expected 1 to 4294967295)"
        );
        assert_eq!(
            client.call("set_sizes 5000000000").await?,
            "CLIENT_ERROR pack size 5000000000 is out of range (expected 1 to 4294967295)"
        );
        assert_eq!(client.call("sizes").await?, "SIZES 250 500 1000 2000 5000");
        assert_eq!(client.call("set_sizes 53 23 31").await?, "STORED");
        assert_eq!(client.call("sizes").await?, "SIZES 23 31 53");
        assert_eq!(client.call("pack 100").await?, r#"PLAN {"23":3,"31":1}"#);

        // a second client sees the same catalog
        let mut other = Client::connect(addr).await?;
        assert_eq!(other.call("sizes").await?, "SIZES 23 31 53");

        client.writer.write_all(b"quit\r\n").await?;
        let mut rest = String::new();
        assert_eq!(client.reader.read_line(&mut rest).await?, 0);

        let _ = stop_tx.send(());
        drop(other);
        server.await.map_err(std::io::Error::other)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_connections() -> std::io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let service = PackingService::new(InMemoryCatalog::new([10]), ServiceConfig::default());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, service, stop_rx));

        let mut client = Client::connect(addr).await?;
        assert_eq!(client.call("pack 15").await?, r#"PLAN {"10":2}"#);

        let _ = stop_tx.send(());
        time::timeout(Duration::from_secs(5), server)
            .await
            .map_err(std::io::Error::other)?
            .map_err(std::io::Error::other)?;

        let mut rest = String::new();
        assert_eq!(client.reader.read_line(&mut rest).await?, 0);
        Ok(())
    }
}
