use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::repositories::attribution::AttributionApi;
use crate::repositories::pix::trexpay::TrexPayApi;
use crate::repositories::tracking::InMemoryTrackingStore;
use crate::settings::Settings;

pub mod attribution;
pub mod http;
pub mod pix;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Gateway error [{code}]: {message}")]
    Gateway { code: String, message: String },
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(settings: Settings) -> Result<(), anyhow::Error> {
    let (pix_tx, mut pix_rx) = mpsc::channel(512);
    let (attribution_tx, mut attribution_rx) = mpsc::channel(512);

    let mut pix_service = pix::PixService::new();
    let mut attribution_service = attribution::AttributionService::new();

    let postback_url = format!("{}/webhook/gateway", settings.callback_base());
    log::info!("Gateway postback URL: {}", postback_url);

    println!("[*] Starting attribution service.");
    let attribution_api = AttributionApi::new(
        settings.attribution.url.clone(),
        settings.attribution.token.clone(),
    );
    tokio::spawn(async move {
        attribution_service
            .run(
                attribution::AttributionRequestHandler::new(attribution_api),
                &mut attribution_rx,
            )
            .await;
    });

    println!("[*] Starting Pix service.");
    let gateway = Arc::new(TrexPayApi::new(
        settings.trexpay.url.clone(),
        settings.trexpay.token.clone(),
        settings.trexpay.secret.clone(),
    ));
    let tracking_store = Arc::new(InMemoryTrackingStore::new());
    let pix_attribution_tx = attribution_tx.clone();
    let webhook_secret = settings.webhook.secret.clone();
    tokio::spawn(async move {
        pix_service
            .run(
                pix::PixRequestHandler::new(
                    gateway,
                    tracking_store,
                    pix_attribution_tx,
                    postback_url,
                    webhook_secret,
                ),
                &mut pix_rx,
            )
            .await;
    });

    println!("[*] Starting HTTP server.");
    http::start_http_server(settings.server.port, pix_tx).await?;

    Ok(())
}
