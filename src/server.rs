use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, field, info, instrument, warn};

use crate::codec::FrameCodec;
use crate::commands;
use crate::config::Config;
use crate::connection::Connection;
use crate::frame;
use crate::store::Store;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind(config.bind_address()).await?;
    let store = Store::new();

    info!("Server listening on {}", listener.local_addr()?);

    serve(listener, store, FrameCodec::new(config.max_frame_size)).await;
    Ok(())
}

/// Accepts connections on `listener` forever, serving each one on its own task.
pub async fn serve(listener: TcpListener, store: Store, codec: FrameCodec) {
    loop {
        let (socket, client_address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store, codec).await {
                warn!(error = %e, "Connection terminated");
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, store, codec),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    codec: FrameCodec,
) -> Result<(), frame::Error> {
    let mut conn = Connection::with_codec(stream, client_address, codec);

    tracing::Span::current()
        .record("connection_id", field::display(conn.id))
        .record("client_address", field::display(client_address));

    while let Some(frame) = conn.read_frame().await? {
        debug!("Received frame from client: {}", frame);
        let res = commands::execute(frame, &store);
        debug!("Sending response to client: {}", res);

        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}
