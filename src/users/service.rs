//! User request router
//!
//! Dispatches a [`RequestDescriptor`] by method: GET reads a user and adds
//! the computed BMI, POST upserts the posted record, anything else is 405.
//! Store failures always become a 500 carrying the store's message; only an
//! unparsable POST body escapes as a [`RouteFault`].

use hyper::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use super::bmi::{calculate_bmi, numeric_value};
use super::record::{RequestDescriptor, ResponseDescriptor, UserRecord};
use crate::logger;
use crate::store::{self, SharedStore, StoreError};

const MISSING_USERNAME: &str = "Missing username in query parameters";
const USER_NOT_FOUND: &str = "User not found";

/// Faults the router does not turn into a response
#[derive(Debug, Error)]
pub enum RouteFault {
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Request router bound to one store handle and table
pub struct UserRouter {
    store: SharedStore,
    table: String,
}

impl UserRouter {
    pub fn new(store: SharedStore, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Route one request
    pub async fn route(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, RouteFault> {
        match request.method {
            Method::GET => match request.query_param("username").filter(|u| !u.is_empty()) {
                Some(username) => Ok(self.read_user(username).await),
                None => Ok(ResponseDescriptor::message(
                    StatusCode::BAD_REQUEST,
                    MISSING_USERNAME,
                )),
            },
            Method::POST => {
                // No body at all reaches the store as `null`
                let user = match request.body.as_deref() {
                    Some(body) => serde_json::from_str(body)?,
                    None => Value::Null,
                };
                Ok(self.create_user(user).await)
            }
            ref other => Ok(ResponseDescriptor::message(
                StatusCode::METHOD_NOT_ALLOWED,
                &format!("Unsupported method {other}"),
            )),
        }
    }

    /// Look up `username` and answer with height, weight and BMI
    pub async fn read_user(&self, username: &str) -> ResponseDescriptor {
        match self.store.get(&self.table, username).await {
            Ok(Some(item)) => {
                let height = item.get("Height");
                let weight = item.get("Weight");
                let bmi = calculate_bmi(numeric_value(height), numeric_value(weight));

                let mut body = UserRecord::new();
                if let Some(h) = height {
                    body.insert("Height".to_string(), h.clone());
                }
                if let Some(w) = weight {
                    body.insert("Weight".to_string(), w.clone());
                }
                body.insert("BMI".to_string(), Value::String(bmi));
                ResponseDescriptor::json(StatusCode::OK, &body)
            }
            Ok(None) => {
                logger::log_debug(&format!("[Users] No record for {username}"));
                ResponseDescriptor::message(StatusCode::NOT_FOUND, USER_NOT_FOUND)
            }
            Err(e) => self.store_failure("get", &e),
        }
    }

    /// Upsert `user` and echo it back
    pub async fn create_user(&self, user: Value) -> ResponseDescriptor {
        match self.write_user(user).await {
            Ok(item) => ResponseDescriptor::json(StatusCode::CREATED, &item),
            Err(e) => self.store_failure("put", &e),
        }
    }

    async fn write_user(&self, user: Value) -> Result<UserRecord, StoreError> {
        let item = store::into_item(user)?;
        self.store.put(&self.table, item.clone()).await?;
        Ok(item)
    }

    fn store_failure(&self, operation: &str, err: &StoreError) -> ResponseDescriptor {
        logger::log_error(&format!("[Store] {operation} on {} failed: {err}", self.table));
        ResponseDescriptor::message(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
    }
}
