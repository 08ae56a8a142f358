use api::Lobby;
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

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse environment variables
    let port: u16 = env::var("PORT")?.parse()?;
    let admin = env::var("ADMIN_TOKEN").unwrap_or_else(|_| String::from("changeme"));
    let default_limit = match env::var("DEFAULT_TIME_LIMIT") {
        Ok(seconds) => seconds.trim().parse()?,
        _ => 0,
    };
    let quiz_path = env::var_os("QUIZ_PATH").map_or_else(|| PathBuf::from("quiz_questions.json"), PathBuf::from);
    let db = match env::var_os("STATE_PATH") {
        Some(path) if path.is_empty() => db::Database::ephemeral(),
        Some(path) => db::Database::from(PathBuf::from(path)),
        None => db::Database::from(PathBuf::from("quiz_state.json")),
    };
    anyhow::ensure!(!admin.is_empty(), "ADMIN_TOKEN must not be empty");
    if admin == "changeme" {
        log::warn!("ADMIN_TOKEN is unset, falling back to the default secret");
    }

    // Load the catalog and restore the last session
    let catalog = db::catalog::load(&quiz_path)?;
    log::info!("loaded {} questions from {}", catalog.len(), quiz_path.display());
    let lobby = Arc::new(Lobby::open(catalog, default_limit, db, admin));

    // Run the server
    let runtime = Runtime::new()?;
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    runtime.block_on(serve(addr, lobby))?;
    Ok(())
}

async fn serve(addr: SocketAddr, lobby: Arc<Lobby>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");

    loop {
        let (stream, peer) = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    log::warn!("failed to accept connection: {err}");
                    continue;
                }
            },
        };

        let lobby = Arc::clone(&lobby);
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let lobby = Arc::clone(&lobby);
                async move { Ok::<_, Infallible>(api::router::respond(req, &lobby).await) }
            });
            let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service).with_upgrades();
            if let Err(err) = connection.await {
                log::warn!("connection with {peer} failed: {err}");
            }
        });
    }

    log::info!("shutting down");
    Ok(())
}
