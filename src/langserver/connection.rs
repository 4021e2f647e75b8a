//! Message loop for one client connection
//!
//! Notifications are applied in arrival order on the read loop. Each request
//! runs on its own task so a slow request never blocks the next one; at most
//! `max_concurrent_requests` of them run at once, the rest queue on their own
//! tasks while the loop keeps reading. Responses are funneled through a
//! single writer task and correlated by id.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use super::handlers;
use super::service::Service;
use crate::error::{LangError, ServerError};
use crate::infra::protocol::{Message, Notification, Request, RequestId, Response, ResponseError, methods};
use crate::infra::transport::{MessageReader, MessageWriter};
use crate::models::lsp::CancelParams;

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Serve one connection until the client exits or disconnects, or `cancel`
/// fires
///
/// On cancellation no further messages are read; requests already running
/// are allowed to finish and their responses are written before the writer
/// is closed.
pub async fn serve_connection<R, W>(
    reader: R,
    writer: W,
    service: Arc<Service>,
    max_concurrent_requests: usize,
    cancel: CancellationToken,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let writer_task = tokio::spawn(
        async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(response) = rx.recv().await {
                writer.write_message(&response).await?;
            }
            writer.shutdown().await
        }
        .in_current_span(),
    );

    let requests = TaskTracker::new();
    let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));
    let semaphore = Arc::new(Semaphore::new(max_concurrent_requests.max(1)));
    let mut reader = MessageReader::new(reader);

    let result = loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Connection cancelled, no longer reading");
                break Ok(());
            }
            frame = reader.read_frame() => frame,
        };

        let json = match frame {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!("Client closed the stream");
                break Ok(());
            }
            Err(e) => break Err(ServerError::Io(e)),
        };

        match Message::parse(&json) {
            Ok(Message::Request(request)) => {
                let token = cancel.child_token();
                in_flight
                    .lock()
                    .await
                    .insert(request.id.clone(), token.clone());

                let service = Arc::clone(&service);
                let semaphore = Arc::clone(&semaphore);
                let tx = tx.clone();
                let in_flight = Arc::clone(&in_flight);
                requests.spawn(
                    async move {
                        let id = request.id.clone();
                        // queued requests stay cancellable while waiting for a slot
                        let permit = tokio::select! {
                            biased;
                            _ = token.cancelled() => None,
                            permit = semaphore.acquire_owned() => permit.ok(),
                        };
                        let response = match permit {
                            Some(_permit) => handle_request(&service, request, token).await,
                            None => Response::error(Some(id.clone()), (&LangError::Cancelled).into()),
                        };
                        in_flight.lock().await.remove(&id);
                        let _ = tx.send(response);
                    }
                    .in_current_span(),
                );
            }
            Ok(Message::Notification(notification)) => {
                if notification.method == methods::EXIT {
                    tracing::info!("Exit requested");
                    break Ok(());
                }
                handle_notification(&service, &in_flight, notification).await;
            }
            Ok(Message::Response(response)) => {
                tracing::debug!("Ignoring client response {:?}", response.id);
            }
            Err(e) => {
                tracing::warn!("Malformed message: {}", e);
                let _ = tx.send(Response::error(
                    Message::salvage_id(&json),
                    ResponseError::parse_error(&e.to_string()),
                ));
            }
        }
    };

    requests.close();
    requests.wait().await;
    drop(tx);

    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Writer closed: {}", e),
        Err(e) => tracing::error!("Writer task failed: {}", e),
    }

    result
}

async fn handle_request(service: &Service, request: Request, cancel: CancellationToken) -> Response {
    tracing::debug!("Request {} {}", request.id, request.method);

    match handlers::dispatch(service, &request.method, request.params, cancel).await {
        Ok(result) => Response::success(request.id, result),
        Err(e) => {
            if e.is_internal() {
                tracing::error!("{} failed: {}", request.method, e);
            } else {
                tracing::debug!("{} failed: {}", request.method, e);
            }
            Response::error(Some(request.id), (&e).into())
        }
    }
}

async fn handle_notification(service: &Service, in_flight: &InFlight, notification: Notification) {
    if notification.method == methods::CANCEL_REQUEST {
        cancel_request(in_flight, notification.params).await;
        return;
    }

    if let Err(e) = handlers::notify(service, &notification.method, notification.params).await {
        tracing::warn!("{} failed: {}", notification.method, e);
    }
}

async fn cancel_request(in_flight: &InFlight, params: Option<Value>) {
    let id = params
        .and_then(|p| serde_json::from_value::<CancelParams>(p).ok())
        .and_then(|p| serde_json::from_value::<RequestId>(p.id).ok());

    let Some(id) = id else {
        tracing::debug!("Ignoring malformed $/cancelRequest");
        return;
    };

    if let Some(token) = in_flight.lock().await.get(&id) {
        tracing::debug!("Cancelling request {}", id);
        token.cancel();
    }
}
