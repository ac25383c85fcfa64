use anyhow::Context as _;
use api::{App, Config, FixedOffset};
use db::Store;
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use std::{
    convert::Infallible,
    env,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use tokio::{net::TcpListener, runtime::Runtime};

fn load_config() -> anyhow::Result<(u16, Store, Config)> {
    let port = match env::var("PORT") {
        Ok(port) => port.parse().context("invalid PORT")?,
        _ => 8000,
    };
    let store = env::var("DATABASE_URL")
        .context("DATABASE_URL must be set")?
        .parse()
        .context("invalid DATABASE_URL")?;
    let username = env::var("ADMIN_USERNAME").context("ADMIN_USERNAME must be set")?.into_boxed_str();
    let password = env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?.into_boxed_str();
    let static_dir = env::var_os("STATIC_DIR").map_or_else(|| PathBuf::from("static"), PathBuf::from);
    let offset = match env::var("UTC_OFFSET") {
        Ok(secs) => secs.parse().context("invalid UTC_OFFSET")?,
        _ => 0,
    };
    let offset = FixedOffset::east_opt(offset).context("UTC_OFFSET out of range")?;
    Ok((port, store, Config { username, password, static_dir, offset }))
}

async fn serve(addr: SocketAddr, app: Arc<App>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on {addr}.");

    let mut stop = core::pin::pin!(tokio::signal::ctrl_c());
    loop {
        let (stream, peer) = tokio::select! {
            biased;
            res = &mut stop => {
                res?;
                break;
            }
            conn = listener.accept() => match conn {
                Ok(pair) => pair,
                Err(err) => {
                    log::error!("Failed to accept connection: {err}");
                    continue;
                }
            },
        };

        let outer = app.clone();
        let service = service_fn(move |req| {
            let inner = outer.clone();
            async move { Ok::<_, Infallible>(inner.respond(req).await) }
        });
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::error!("Connection with {peer} failed: {err}");
            }
        });
    }

    log::info!("Shutting down.");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse environment variables
    let (port, store, config) = load_config()?;
    let runtime = Runtime::new()?;

    // Make sure the question table exists
    runtime.block_on(async {
        let session = store.session().await?;
        session.init_schema().await
    })?;

    let app = Arc::new(App::new(store, &config));
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    runtime.block_on(serve(addr, app))
}
