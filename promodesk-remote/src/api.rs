// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use promodesk_core::{
    RequestError,
    backend::Backend,
    model::{ActionStatus, Brandmaster, CreateAction, MessageResponse, Shop, StatusChange},
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::Client;

const ACTIONS_PATH: &str = "actions";
const ACTION_STATUS_PATH: &str = "actions/status";
const SHOPS_PATH: &str = "shops";
const BRANDMASTERS_PATH: &str = "brandmasters";

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewBrandmaster<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct AddBrandmastersRequest<'a> {
    brandmasters: Vec<NewBrandmaster<'a>>,
}

impl<'a> AddBrandmastersRequest<'a> {
    /// Local identities are never sent, the server assigns its own.
    fn new(items: &'a [Brandmaster]) -> Self {
        Self {
            brandmasters: items
                .iter()
                .map(|b| NewBrandmaster {
                    first_name: &b.first_name,
                    last_name: &b.last_name,
                    email: &b.email,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AddBrandmastersResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    ids: Vec<serde_json::Value>,
}

fn id_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct RemoteBackend {
    c: Client,
}

impl RemoteBackend {
    pub fn new(c: Client) -> Self {
        Self { c }
    }
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RemoteBackend url={}", self.c.url(""))
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    #[tracing::instrument(level = "info", target = "remote_actions", skip(self))]
    async fn create_action(&self, r: &CreateAction) -> Result<String, RequestError> {
        self.c
            .request::<MessageResponse, _>(Method::POST, ACTIONS_PATH, Some(r), None)
            .await
            .map(|m| m.message)
    }

    #[tracing::instrument(level = "info", target = "remote_actions", skip(self))]
    async fn set_action_status(&self, id_action: &str, status: ActionStatus) -> Result<String, RequestError> {
        let r = StatusChange {
            id_action: id_action.to_string(),
            status,
        };
        self.c
            .request::<MessageResponse, _>(Method::PUT, ACTION_STATUS_PATH, Some(&r), None)
            .await
            .map(|m| m.message)
    }

    async fn shops(&self, cancel: CancellationToken) -> Result<Vec<Shop>, RequestError> {
        self.c
            .request::<Vec<Shop>, ()>(Method::GET, SHOPS_PATH, None, Some(&cancel))
            .await
    }

    #[tracing::instrument(level = "info", target = "remote_shops", skip(self))]
    async fn delete_shop(&self, id: &str) -> Result<String, RequestError> {
        self.c
            .request::<MessageResponse, _>(Method::DELETE, SHOPS_PATH, Some(&DeleteRequest { id }), None)
            .await
            .map(|m| m.message)
    }

    async fn brandmasters(&self, cancel: CancellationToken) -> Result<Vec<Brandmaster>, RequestError> {
        self.c
            .request::<Vec<Brandmaster>, ()>(Method::GET, BRANDMASTERS_PATH, None, Some(&cancel))
            .await
    }

    #[tracing::instrument(level = "info", target = "remote_brandmasters", skip(self, items), fields(count = items.len()))]
    async fn add_brandmasters(&self, items: &[Brandmaster]) -> Result<Vec<String>, RequestError> {
        let resp = self
            .c
            .request::<AddBrandmastersResponse, _>(
                Method::POST,
                BRANDMASTERS_PATH,
                Some(&AddBrandmastersRequest::new(items)),
                None,
            )
            .await?;

        tracing::debug!(target: "remote_brandmasters", text=%resp.message, "Brandmasters added");
        Ok(resp.ids.iter().filter_map(id_to_string).collect())
    }
}
