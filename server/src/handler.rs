//! The Client Handler (spec §4.8): one task per accepted connection.
//! Reads request lines until EOF or `quit`, dispatches each through the
//! command table, and writes the reply back.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::app::Server;
use crate::client::Client;
use crate::command::Context;
use crate::protocol;

pub async fn run_client(server: Arc<Server>, mut stream: TcpStream, peer: SocketAddr) {
    let client_id = server.next_client_id();
    let client = Client::new(client_id);
    server.clients.insert(client.clone());

    log::info!("client {client_id} connected from {peer}");

    let ctx = Context {
        client: client.clone(),
        clients: server.clients.clone(),
        printers: server.printers.clone(),
        driver: server.driver.clone(),
        lines_per_page: server.lines_per_page,
        page_price: server.page_price,
    };

    loop {
        let tokens = match protocol::read_request(&mut stream).await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => {
                log::info!("client {client_id}: EOF");
                break;
            }
            Err(err) => {
                log::warn!("client {client_id}: read error: {err}");
                break;
            }
        };

        if tokens.is_empty() {
            continue;
        }

        let reply = server.dispatcher.dispatch(&ctx, &tokens).await;

        if stream.write_all(reply.as_bytes()).await.is_err() {
            break;
        }

        if client.should_quit() {
            break;
        }
    }

    // Disconnect (EOF/read error) is equivalent to a `quit` with no
    // reply (spec §7); an explicit `quit` has already drained the
    // client's jobs, so this is a no-op in that case.
    crate::command::teardown(&ctx).await;

    server.clients.remove(client_id);
    log::info!("client {client_id} disconnected");
}
