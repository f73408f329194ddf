//! Local transport endpoint.
//!
//! An HTTP server bound to loopback that accepts `PUT <absolute path>` with
//! the raw file bytes as body and places them at that path. Each start picks
//! a random port and a fresh token, so callers must fetch [`ServerConfig`]
//! before every transfer.

pub mod cors;
pub mod error;
pub mod routes;
pub mod state;
pub mod token;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rand::Rng;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use blobwriter_core::ServerConfig;
use blobwriter_core::config::ServerSettings;
use blobwriter_core::error::{BlobWriterError, Result};
use blobwriter_transport::NativeTransport;

use state::AppState;

pub use routes::build_router;
pub use token::generate_auth_token;

/// A running local transport endpoint.
pub struct LocalServer {
    addr: SocketAddr,
    auth_token: String,
    running: Arc<AtomicBool>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalServer {
    /// Binds a random port in `[port_min, port_max]`, trying up to
    /// `start_retries` ports, and starts serving in the background.
    pub async fn start(settings: &ServerSettings) -> Result<Self> {
        let temp_dir = settings.resolve_temp_dir();
        tokio::fs::create_dir_all(&temp_dir).await?;

        let listener = bind_random_port(settings).await?;
        let addr = listener.local_addr()?;
        let auth_token = generate_auth_token();

        let app = build_router(Arc::new(AppState {
            auth_token: auth_token.clone(),
            temp_dir,
        }));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));
        let running_task = running.clone();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!("local transport server error: {e}");
            }
            running_task.store(false, Ordering::SeqCst);
            debug!(%addr, "local transport server stopped");
        });

        info!(%addr, "local transport server started");

        Ok(Self {
            addr,
            auth_token,
            running,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(task)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current address and token, or `None` once stopped.
    pub fn config(&self) -> Option<ServerConfig> {
        self.is_running().then(|| ServerConfig {
            base_url: self.base_url(),
            auth_token: self.auth_token.clone(),
        })
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.signal_shutdown();

        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!("local transport server task failed: {e}");
        }
    }

    fn signal_shutdown(&self) {
        if let Ok(mut slot) = self.shutdown_tx.lock()
            && let Some(tx) = slot.take()
        {
            let _ = tx.send(());
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

async fn bind_random_port(settings: &ServerSettings) -> Result<TcpListener> {
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=settings.start_retries {
        let port = rand::thread_rng().gen_range(settings.port_min..=settings.port_max);
        match TcpListener::bind((settings.bind_host.as_str(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!(attempt, port, "bind failed: {e}");
                last_error = e.to_string();
            }
        }
    }

    Err(BlobWriterError::ServerUnavailable(format!(
        "could not bind {} after {} attempts: {last_error}",
        settings.bind_host, settings.start_retries
    )))
}

#[async_trait]
impl NativeTransport for LocalServer {
    async fn get_config(&self) -> Result<ServerConfig> {
        self.config()
            .ok_or_else(|| BlobWriterError::ServerUnavailable("server not running".into()))
    }

    fn name(&self) -> &str {
        "local-server"
    }
}
