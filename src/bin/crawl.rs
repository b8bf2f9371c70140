use magpie::crawler::{Crawler, CrawlerOptions, HashStore};
use magpie::dht::UdpSender;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::info;

/// The DHT is chatty; ask the kernel for a large receive buffer so bursts
/// of inbound queries are not dropped before the read loop gets to them.
const RECV_BUFFER_SIZE: usize = 512 * 1024;

fn bind_udp(port: u16) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    let _ = socket.set_recv_buffer_size(RECV_BUFFER_SIZE);
    socket.set_nonblocking(true)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let options = CrawlerOptions::default();
    let socket = Arc::new(UdpSocket::from_std(bind_udp(options.port)?)?);
    info!("listening on {}", socket.local_addr()?);

    let sender = UdpSender::spawn(socket.clone(), options.queue_size);
    let store = Arc::new(HashStore::new());
    let crawler = Arc::new(Crawler::new(sender, store.clone(), &options));

    tokio::select! {
        result = crawler.clone().run(socket) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down, {} hashes harvested", store.len());
        }
    }

    Ok(())
}
