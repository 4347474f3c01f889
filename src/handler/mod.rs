//! Stateless CRUD request handler.
//!
//! One request in, at most one storage operation, one envelope out:
//!
//! | Method  | Id?  | Storage           | Success                  |
//! |---------|------|-------------------|--------------------------|
//! | GET     | no   | scan_all          | 200 array                |
//! | GET     | yes  | get               | 200 item or `null`       |
//! | POST    | -    | put               | 201 created item         |
//! | PUT     | yes  | put (id merged)   | 200 stored item          |
//! | DELETE  | yes  | get, then delete  | 200 message, 404 absent  |
//! | OPTIONS | -    | none              | 200 empty body           |
//!
//! Anything else is answered with 405.

mod request;
mod response;

pub use request::ProxyRequest;
pub use response::ProxyResponse;

use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::dynamodb::Item;
use crate::error::StoreError;
use crate::store::ItemStore;

#[derive(Debug, Error)]
enum HandlerError {
    #[error("Missing request body")]
    MissingBody,
    #[error("Invalid request body: {0}")]
    InvalidBody(serde_json::Error),
    #[error("Item must have a non-empty string id")]
    MissingItemId,
    #[error("Missing ID parameter")]
    MissingId,
    #[error("Item not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HandlerError {
    fn status_code(&self) -> u16 {
        match self {
            HandlerError::MissingBody
            | HandlerError::InvalidBody(_)
            | HandlerError::MissingItemId
            | HandlerError::MissingId => 400,
            HandlerError::NotFound => 404,
            HandlerError::MethodNotAllowed => 405,
            HandlerError::Store(_) => 500,
        }
    }
}

/// Maps requests onto the item store. Holds nothing but the shared store
/// handle, so one instance serves every request of the process.
pub struct Handler {
    store: Arc<dyn ItemStore>,
    expose_error_details: bool,
}

impl Handler {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            expose_error_details: false,
        }
    }

    /// Include the underlying fault message in 500 responses. Useful while
    /// debugging a deployment, leaks storage details to callers otherwise.
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    #[instrument(skip_all, fields(method = %request.http_method, path = ?request.path))]
    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
        let response = match self.dispatch(&request).await {
            Ok(response) => response,
            Err(HandlerError::Store(e)) => {
                error!("Storage fault: {e}");
                if self.expose_error_details {
                    ProxyResponse::json(
                        500,
                        &json!({ "message": "Internal server error", "error": e.to_string() }),
                    )
                } else {
                    ProxyResponse::message(500, "Internal server error")
                }
            }
            Err(e) => {
                warn!("Rejected request: {e}");
                ProxyResponse::message(e.status_code(), &e.to_string())
            }
        };
        info!(status = response.status_code, "Request handled");
        response
    }

    async fn dispatch(&self, request: &ProxyRequest) -> Result<ProxyResponse, HandlerError> {
        let id = request.item_id();

        match request.http_method.to_ascii_uppercase().as_str() {
            "GET" => match id {
                Some(id) => Ok(ProxyResponse::json(200, &self.store.get(&id).await?)),
                None => Ok(ProxyResponse::json(200, &self.store.scan_all().await?)),
            },
            "POST" => {
                let item = parse_item(request)?;
                if item.id().is_none() {
                    return Err(HandlerError::MissingItemId);
                }
                self.store.put(&item).await?;
                Ok(ProxyResponse::json(201, &item))
            }
            "PUT" => {
                let id = id.ok_or(HandlerError::MissingId)?;
                let mut item = parse_item(request)?;
                item.set_id(id);
                self.store.put(&item).await?;
                Ok(ProxyResponse::json(200, &item))
            }
            "DELETE" => {
                let id = id.ok_or(HandlerError::MissingId)?;
                if self.store.get(&id).await?.is_none() {
                    return Err(HandlerError::NotFound);
                }
                self.store.delete(&id).await?;
                Ok(ProxyResponse::message(200, "Item deleted successfully"))
            }
            "OPTIONS" => Ok(ProxyResponse::empty(200)),
            _ => Err(HandlerError::MethodNotAllowed),
        }
    }
}

fn parse_item(request: &ProxyRequest) -> Result<Item, HandlerError> {
    let body = request.body().ok_or(HandlerError::MissingBody)?;
    serde_json::from_str(body).map_err(HandlerError::InvalidBody)
}
