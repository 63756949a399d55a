use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::codec::FrameCodec;
use crate::commands::Registry;
use crate::config::Config;
use crate::connection::{Connection, ConnectionError};
use crate::session::Session;
use crate::store::Store;
use crate::Error;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(config: Config) -> Result<(), Error> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    serve(listener, config).await
}

/// Accepts connections on `listener` forever, serving each one on its own task.
///
/// At most `config.max_clients` sessions run at once; further connections wait in the listen
/// backlog until a running session ends.
pub async fn serve(listener: TcpListener, config: Config) -> Result<(), Error> {
    if !(1..=Semaphore::MAX_PERMITS).contains(&config.max_clients) {
        return Err(format!("max_clients out of range: {}", config.max_clients).into());
    }

    let store = Store::new();
    let registry = Arc::new(Registry::new());
    let limit = Arc::new(Semaphore::new(config.max_clients));
    let codec = config.codec();
    let timeout = config.timeout();

    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let permit = limit.clone().acquire_owned().await?;
        let (socket, client_address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                // Errors such as EMFILE or ECONNABORTED leave the listener usable.
                warn!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let store = store.clone();
        let registry = registry.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) =
                handle_connection(socket, client_address, store, registry, codec, timeout).await
            {
                error!("Connection terminated: {}", e);
            }
            drop(permit);
        });
    }
}

#[instrument(name = "connection", skip_all, fields(connection_id, client_address))]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    registry: Arc<Registry>,
    codec: FrameCodec,
    timeout: Option<Duration>,
) -> Result<(), ConnectionError> {
    let conn = Connection::new(stream, codec).with_timeout(timeout);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    Session::new(conn, registry, store).run().await
}
