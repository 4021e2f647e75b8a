//! Request and notification handlers
//!
//! `dispatch` answers requests, `notify` applies notifications. Connection
//! control (`exit`, `$/cancelRequest`) is handled by the connection loop.

pub mod complete;
pub mod document;
pub mod lifecycle;
pub mod symbols;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::service::Service;
use crate::error::LangError;
use crate::infra::protocol::methods;

pub async fn dispatch(
    service: &Service,
    method: &str,
    params: Option<Value>,
    cancel: CancellationToken,
) -> Result<Value, LangError> {
    if method == methods::SHUTDOWN {
        lifecycle::shutdown(service);
        return Ok(Value::Null);
    }
    if service.is_shutting_down() {
        return Err(LangError::InvalidRequest(format!(
            "{method} received after shutdown"
        )));
    }

    match method {
        methods::INITIALIZE => respond(lifecycle::initialize(service, parse(params)?)?),
        methods::COMPLETION => {
            let ctx = service.context(cancel)?;
            respond(complete::completion(&ctx, parse(params)?).await?)
        }
        methods::DOCUMENT_SYMBOL => {
            let ctx = service.context(cancel)?;
            respond(symbols::document_symbol(&ctx, parse(params)?).await?)
        }
        _ => Err(LangError::MethodNotFound(method.to_string())),
    }
}

pub async fn notify(service: &Service, method: &str, params: Option<Value>) -> Result<(), LangError> {
    match method {
        methods::INITIALIZED => {
            lifecycle::initialized(service);
            Ok(())
        }
        methods::DID_OPEN => document::did_open(service, parse(params)?).await,
        methods::DID_CHANGE => document::did_change(service, parse(params)?).await,
        methods::DID_CLOSE => document::did_close(service, parse(params)?).await,
        _ => {
            tracing::debug!("Ignoring notification {}", method);
            Ok(())
        }
    }
}

fn parse<T: DeserializeOwned>(params: Option<Value>) -> Result<T, LangError> {
    let params = params.unwrap_or_else(|| Value::Object(Default::default()));
    Ok(serde_json::from_value(params)?)
}

fn respond<T: Serialize>(result: T) -> Result<Value, LangError> {
    serde_json::to_value(result).map_err(|e| LangError::Internal(e.to_string()))
}
