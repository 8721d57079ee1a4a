//! ==============================================================================
//! store/firebase.rs - firebase realtime database over rest
//! ==============================================================================
//!
//! purpose:
//!     binds the core to a firebase realtime database path without any sdk,
//!     using the documented rest endpoints:
//!
//!     subscribe:  GET  {db}/{path}.json   Accept: text/event-stream
//!     append:     POST {db}/{path}.json   body = record, reply {"name": key}
//!
//!     `?auth=<token>` is added to both when a token is configured.
//!     append is refused without a request when the path is scalar.
//!
//! stream events:
//!     put / patch   -> apply to the local mirror, notify the observer
//!     keep-alive    -> ignored
//!     cancel        -> server revoked the listener (rules changed), stop
//!     auth_revoked  -> token expired, stop
//!
//! the stream is NOT reopened when it ends: one subscription, one connection.
//!
//! relationships:
//!     - uses: sse.rs (framing), mirror.rs (delta application)
//!     - uses: mod.rs (latest_record, seams, StoreError)
//!
//! ==============================================================================

use std::future::Future;

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use super::mirror::Mirror;
use super::sse::SseParser;
use super::{latest_record, PathLayout, RecordSink, StoreError, Subscribe, SubscriptionHandle};
use crate::binder::RecordObserver;
use crate::domain::PostureRecord;

#[derive(Clone)]
pub struct FirebaseStore {
    client: Client,
    url: Url,
    path: String,
    layout: PathLayout,
    auth_token: Option<String>,
}

/// body of a put/patch event
#[derive(Deserialize)]
struct Delta {
    path: String,
    data: Value,
}

/// reply to a push
#[derive(Deserialize)]
struct PushReply {
    name: String,
}

impl FirebaseStore {
    pub fn new(
        database_url: &str,
        path: &str,
        layout: PathLayout,
        auth_token: Option<String>,
    ) -> Result<Self, StoreError> {
        let path = path.trim_matches('/').to_string();
        let raw = format!("{}/{}.json", database_url.trim_end_matches('/'), path);
        let url = Url::parse(&raw).map_err(|e| StoreError::Url(format!("{}: {}", raw, e)))?;

        Ok(Self {
            client: Client::builder().build()?,
            url,
            path,
            layout,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    /// the resource url for the path (without credentials)
    #[cfg(test)]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.query(&[("auth", token)]),
            None => req,
        }
    }

    async fn stream(&self, observer: &mut dyn RecordObserver) -> Result<(), StoreError> {
        let req = self
            .authed(self.client.get(self.url.clone()))
            .header(ACCEPT, "text/event-stream");
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status: status.as_u16(), body });
        }
        tracing::info!(path = %self.path, "stream open");

        let mut body = response.bytes_stream();
        let mut parser = SseParser::new();
        let mut mirror = Mirror::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in parser.feed(&chunk) {
                match event.event.as_str() {
                    "put" | "patch" => {
                        let delta: Delta = match serde_json::from_str(&event.data) {
                            Ok(delta) => delta,
                            Err(e) => {
                                tracing::warn!(path = %self.path, error = %e, "skipping malformed event");
                                continue;
                            }
                        };
                        if event.event == "put" {
                            mirror.put(&delta.path, delta.data);
                        } else {
                            mirror.patch(&delta.path, delta.data);
                        }
                        let latest = latest_record(mirror.root(), self.layout);
                        observer.on_record(latest.as_ref());
                    }
                    "keep-alive" => {}
                    "cancel" | "auth_revoked" => {
                        return Err(StoreError::Cancelled(format!("{} {}", event.event, event.data)));
                    }
                    other => {
                        tracing::debug!(event = other, "ignoring stream event");
                    }
                }
            }
        }

        Ok(())
    }
}

impl Subscribe for FirebaseStore {
    fn subscribe(&self, mut observer: Box<dyn RecordObserver>) -> SubscriptionHandle {
        let store = self.clone();
        let task = tokio::spawn(async move {
            match store.stream(observer.as_mut()).await {
                Ok(()) => tracing::warn!(path = %store.path, "stream closed by server"),
                Err(e) => tracing::error!(path = %store.path, error = %e, "stream ended"),
            }
        });
        SubscriptionHandle::new(self.path.clone(), task)
    }
}

impl RecordSink for FirebaseStore {
    fn append(
        &self,
        record: PostureRecord,
    ) -> impl Future<Output = Result<String, StoreError>> + Send {
        let writable = self.layout.accepts_appends().then(|| {
            self.authed(self.client.post(self.url.clone())).json(&record)
        });
        let path = self.path.clone();
        async move {
            let req = writable.ok_or(StoreError::ReadOnly(path))?;
            let response = req.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::Status { status: status.as_u16(), body });
            }
            let reply: PushReply = serde_json::from_slice(&response.bytes().await?)?;
            Ok(reply.name)
        }
    }
}
