use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use crate::api::{error, success::Envelope};
use crate::modules::{
    conversation::service::ConversationService, message::model::ThreadSnapshot,
    message::service::MessageService, presence::service::PresenceService,
};

/// What the poll loop needs from the server, acting as one signed-in identity.
#[async_trait::async_trait]
pub trait SyncBackend {
    async fn read(&self, conversation_id: &Uuid) -> Result<ThreadSnapshot, error::SystemError>;

    async fn heartbeat(&self) -> Result<(), error::SystemError>;

    async fn set_typing(
        &self,
        conversation_id: &Uuid,
        is_typing: bool,
    ) -> Result<(), error::SystemError>;
}

/// Calls the services directly, in-process.
#[derive(Clone)]
pub struct LocalBackend {
    identity: String,
    message_service: MessageService,
    conversation_service: ConversationService,
    presence_service: PresenceService,
}

impl LocalBackend {
    pub fn new(
        identity: impl Into<String>,
        message_service: MessageService,
        conversation_service: ConversationService,
        presence_service: PresenceService,
    ) -> Self {
        Self {
            identity: identity.into(),
            message_service,
            conversation_service,
            presence_service,
        }
    }
}

#[async_trait::async_trait]
impl SyncBackend for LocalBackend {
    async fn read(&self, conversation_id: &Uuid) -> Result<ThreadSnapshot, error::SystemError> {
        self.message_service.read(conversation_id, &self.identity).await
    }

    async fn heartbeat(&self) -> Result<(), error::SystemError> {
        self.presence_service.heartbeat(&self.identity).await
    }

    async fn set_typing(
        &self,
        conversation_id: &Uuid,
        is_typing: bool,
    ) -> Result<(), error::SystemError> {
        self.conversation_service.set_typing(conversation_id, &self.identity, is_typing).await
    }
}

/// Talks to a remote server over the JSON API with a bearer token.
#[derive(Clone)]
pub struct HttpSyncBackend {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpSyncBackend {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, error::SystemError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, error::SystemError> {
        let res = request.bearer_auth(&self.access_token).send().await?;
        let status = res.status().as_u16();
        let body = res.bytes().await?;
        decode_envelope(status, &body)
    }
}

/// Unwraps a response envelope, turning failures back into domain errors.
pub fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
) -> Result<Option<T>, error::SystemError> {
    match serde_json::from_slice::<Envelope<T>>(body) {
        Ok(envelope) if envelope.success && (200..300).contains(&status) => Ok(envelope.data),
        Ok(envelope) => Err(error::SystemError::from_status(
            status,
            envelope.error.unwrap_or_else(|| "Request failed".into()),
        )),
        Err(_) => Err(error::SystemError::from_status(
            status,
            format!("Unexpected response with status {}", status),
        )),
    }
}

#[async_trait::async_trait]
impl SyncBackend for HttpSyncBackend {
    async fn read(&self, conversation_id: &Uuid) -> Result<ThreadSnapshot, error::SystemError> {
        let url = self.url(&format!("/conversations/{}/messages", conversation_id));
        self.send::<ThreadSnapshot>(self.client.get(url))
            .await?
            .ok_or_else(|| error::SystemError::upstream_unavailable("Empty thread response"))
    }

    async fn heartbeat(&self) -> Result<(), error::SystemError> {
        self.send::<serde_json::Value>(self.client.post(self.url("/presence/heartbeat"))).await?;
        Ok(())
    }

    async fn set_typing(
        &self,
        conversation_id: &Uuid,
        is_typing: bool,
    ) -> Result<(), error::SystemError> {
        let url = self.url(&format!("/conversations/{}/typing", conversation_id));
        let body = serde_json::json!({ "is_typing": is_typing });
        self.send::<serde_json::Value>(self.client.put(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_envelope_success_and_failure() {
        let ok: Option<u32> = decode_envelope(200, br#"{"success":true,"data":7}"#).unwrap();
        assert_eq!(ok, Some(7));

        let empty: Option<u32> = decode_envelope(200, br#"{"success":true}"#).unwrap();
        assert_eq!(empty, None);

        let err = decode_envelope::<u32>(403, br#"{"success":false,"error":"nope"}"#).unwrap_err();
        assert!(matches!(err, error::SystemError::PermissionDenied(ref m) if m == "nope"));

        let err = decode_envelope::<u32>(503, b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, error::SystemError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_decode_envelope_thread_snapshot() {
        let id = Uuid::now_v7();
        let body = serde_json::json!({
            "success": true,
            "data": {
                "conversation_id": id,
                "messages": [],
                "typing": ["Bob"],
                "participants": [],
                "participants_status": [],
                "presence": { "state": "offline" },
            },
        });
        let snapshot: Option<ThreadSnapshot> =
            decode_envelope(200, body.to_string().as_bytes()).unwrap();
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.conversation_id, id);
        assert_eq!(snapshot.typing, vec!["Bob".to_string()]);

        let missing: Option<ThreadSnapshot> =
            decode_envelope(200, br#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_http_backend_builds_api_urls() {
        let backend =
            HttpSyncBackend::new("http://localhost:8080/", "token", Duration::from_secs(10))
                .unwrap();
        assert_eq!(backend.url("/presence/heartbeat"), "http://localhost:8080/api/presence/heartbeat");
    }
}
