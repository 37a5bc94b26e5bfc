//! Stats web server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collector::StopOutcome;
use crate::config::WebConfig;
use crate::{Result, TagwatchError};

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// A serving task and the token that asks it to wind down.
struct ServeHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Read-only HTTP view over the store and collector.
pub struct StatsServer {
    /// Address to bind.
    addr: SocketAddr,
    /// Handler state.
    app_state: Arc<AppState>,
    /// How long `shutdown()` waits for in-flight requests.
    shutdown_grace: Duration,
    running: Mutex<Option<ServeHandle>>,
}

impl StatsServer {
    /// Create a new stats server.
    pub fn new(config: &WebConfig, app_state: AppState) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                TagwatchError::Config(format!(
                    "invalid web address {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            shutdown_grace: config.shutdown_grace(),
            running: Mutex::new(None),
        })
    }

    /// Get the configured address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Address actually bound, while serving.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|h| h.local_addr)
    }

    /// Bind and serve in the background.
    ///
    /// Returns the bound address, which differs from the configured one
    /// when port 0 was requested.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(TagwatchError::InvalidState(
                "stats server is already running".to_string(),
            ));
        }

        let router = create_router(Arc::clone(&self.app_state)).merge(create_health_router());

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Stats server listening on http://{}", local_addr);

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
            {
                tracing::error!("Stats server error: {}", e);
            }
        });

        *running = Some(ServeHandle {
            shutdown,
            task,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// If they outlast the grace period the serving task is aborted and
    /// [`StopOutcome::TimedOut`] is returned.
    pub async fn shutdown(&self) -> StopOutcome {
        let Some(mut handle) = self.running.lock().await.take() else {
            return StopOutcome::NotRunning;
        };

        tracing::info!("Shutting down stats server");
        handle.shutdown.cancel();

        let waited = tokio::time::timeout(self.shutdown_grace, &mut handle.task).await;
        match waited {
            Ok(_) => {
                tracing::info!("Stats server stopped");
                StopOutcome::Stopped
            }
            Err(_) => {
                tracing::warn!(
                    "Stats server did not drain within {}ms; closing it",
                    self.shutdown_grace.as_millis()
                );
                handle.task.abort();
                StopOutcome::TimedOut
            }
        }
    }
}
