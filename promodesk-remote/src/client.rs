// SPDX-License-Identifier: MIT

use std::time::Duration;

use promodesk_core::RequestError;
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// JSON over HTTP with a cookie session. Every path is relative to the base url.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    client: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        let u = Url::parse(base_url)?;
        if u.cannot_be_a_base() {
            return Err(Box::<dyn std::error::Error>::from(format!("wrong base url: {base_url}")));
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut rb = self.client.request(method.clone(), self.url(path));
        if let Some(b) = body {
            rb = rb.json(b);
        }

        let send = async {
            let resp = rb.send().await.map_err(transport_error)?;
            let status = resp.status().as_u16();
            let text = resp.text().await.map_err(transport_error)?;
            decode_body(status, &text)
        };

        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(RequestError::Aborted),
                r = send => r,
            },
            None => send.await,
        };

        if let Err(e) = &result
            && !e.is_aborted()
        {
            tracing::error!(target: "promodesk_client", method=%method, path=path, error=?e, "Request");
        }

        result
    }
}

fn transport_error(e: reqwest::Error) -> RequestError {
    if e.is_timeout() {
        RequestError::TimedOut
    } else {
        RequestError::Transport(e.to_string())
    }
}

/// Non-2xx responses become [`RequestError::Server`] carrying the `message` of the body, if any.
pub fn decode_body<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, RequestError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(text).ok().and_then(|b| b.message);
        return Err(RequestError::server(status, message));
    }

    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| RequestError::Decode(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use promodesk_core::model::{MessageResponse, Shop};

    #[test]
    fn server_message_is_used() {
        let r = decode_body::<MessageResponse>(403, r#"{"message": "Brak uprawnień"}"#);
        assert_eq!(
            r,
            Err(RequestError::Server {
                status: 403,
                message: "Brak uprawnień".to_string()
            })
        );
    }

    #[test]
    fn templated_message_without_body() {
        for body in ["", "<html>oops</html>", r#"{"error": "x"}"#] {
            let r = decode_body::<MessageResponse>(500, body);
            assert_eq!(r, Err(RequestError::server(500, None)), "body {body:?}");
        }
    }

    #[test]
    fn success_body_is_decoded() {
        let shops = decode_body::<Vec<Shop>>(200, r#"[{"id": 1, "name": "Lidl"}]"#).unwrap();
        assert_eq!(shops[0].id, "1");

        let empty = decode_body::<Option<MessageResponse>>(204, "").unwrap();
        assert!(empty.is_none());

        assert!(matches!(
            decode_body::<Vec<Shop>>(200, "{}"),
            Err(RequestError::Decode(_))
        ));
    }

    #[test]
    fn urls_are_joined() {
        let c = Client::new("https://api.example.com/v1/", Duration::from_secs(30)).unwrap();
        assert_eq!(c.url("/shops"), "https://api.example.com/v1/shops");
        assert_eq!(c.url("actions/status"), "https://api.example.com/v1/actions/status");

        assert!(Client::new("not a url", Duration::from_secs(30)).is_err());
    }

    #[tokio::test]
    async fn cancelled_request_is_aborted() {
        let c = Client::new("http://127.0.0.1:9", Duration::from_secs(30)).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let r = c
            .request::<MessageResponse, ()>(Method::GET, "shops", None, Some(&token))
            .await;
        assert_eq!(r, Err(RequestError::Aborted));
    }
}
