use std::time::Duration;
use ticket_booking::{
    app_state::AppState,
    config::Config,
    coordinator::CoordinatorConfig,
    error::AppError,
    server::{router, serve},
    store::store::ResourceStore,
};
use tokio::{sync::oneshot, task::JoinHandle, time::sleep};
use tracing::info;

pub async fn run_full_server<S: ResourceStore>(
    store: S,
    config: CoordinatorConfig,
    port: u16,
    shutdown: oneshot::Receiver<()>,
) -> Result<(), AppError> {
    let cors = Config::default().cors_layer()?;
    let app = router(AppState::new(store, config), cors);

    serve(&format!("127.0.0.1:{port}"), app, async {
        let _ = shutdown.await;
        info!("Shutting down gracefully...");
    })
    .await
}

/// A server bound to a free port, stopped on [`RunningServer::stop`].
pub struct RunningServer {
    pub base_url: String,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl RunningServer {
    pub async fn start<S: ResourceStore>(store: S, config: CoordinatorConfig) -> Self {
        let port = portpicker::pick_unused_port().expect("no free port");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_full_server(store, config, port, shutdown_rx));

        // Wait for server to start
        sleep(Duration::from_millis(100)).await;

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            shutdown_tx,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        self.handle.await.unwrap().unwrap();
    }
}
