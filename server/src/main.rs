//! Entry point: parse the CLI, stand up the chosen device backend, and
//! accept connections in a loop, one `tokio::spawn`'d handler per
//! client (spec §6, §9).

use std::sync::Arc;

use clap::Parser;
use printd::device::{PrinterDriver, PtyPrinterDriver, SimulatedPrinterDriver};
use tokio::net::TcpListener;

use print_server::app::Server;
use print_server::configuration::{App, Backend};
use print_server::handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let app = App::parse();

    let driver: Arc<dyn PrinterDriver> = match app.backend {
        Backend::Pty => Arc::new(PtyPrinterDriver::new(app.tty_pattern.clone())),
        Backend::Simulated => Arc::new(SimulatedPrinterDriver::new()),
    };

    let server = Server::new(driver, app.lines_per_page, app.page_price);

    let listener = TcpListener::bind(&app.listen).await?;
    log::info!("listening on {}", app.listen);

    loop {
        let (stream, peer) = listener.accept().await?;
        let server = server.clone();
        tokio::spawn(async move {
            handler::run_client(server, stream, peer).await;
        });
    }
}
