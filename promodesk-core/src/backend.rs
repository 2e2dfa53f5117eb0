// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use super::{
    RequestError,
    model::{ActionStatus, Brandmaster, CreateAction, Shop},
};

/// The remote API. Every method maps to exactly one request.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    async fn create_action(&self, r: &CreateAction) -> Result<String, RequestError>;
    async fn set_action_status(&self, id_action: &str, status: ActionStatus) -> Result<String, RequestError>;
    async fn shops(&self, cancel: CancellationToken) -> Result<Vec<Shop>, RequestError>;
    async fn delete_shop(&self, id: &str) -> Result<String, RequestError>;
    async fn brandmasters(&self, cancel: CancellationToken) -> Result<Vec<Brandmaster>, RequestError>;
    /// All or nothing. Returns the identities assigned by the server in request order, if any.
    async fn add_brandmasters(&self, items: &[Brandmaster]) -> Result<Vec<String>, RequestError>;
}
