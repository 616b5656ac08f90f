use echo_server::{bind_addr, serve};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let arg = std::env::args().nth(1);
    let addr = bind_addr(arg.as_deref())?;

    let listener = TcpListener::bind(addr).await?;
    info!("Echo server listening on {}", listener.local_addr()?);

    serve(listener).await
}
