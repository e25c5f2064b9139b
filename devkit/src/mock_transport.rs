/*!
Transport simulé pour tester le collector sans contrôleur

Enregistre chaque heartbeat envoyé et répond selon un script :
- `Echo` : le contrôleur confirme exactement les changements reçus
- `Respond` : réponse fixe
- `Fail` : erreur de transport
*/

use parking_lot::Mutex;
use refocus_collector::{
    ControllerTarget, HeartbeatPayload, HeartbeatResponse, Transport, TransportError,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// Réponse scriptée du contrôleur simulé
#[derive(Debug, Clone)]
pub enum MockReply {
    Echo,
    Respond(HeartbeatResponse),
    Fail(String),
}

/// Heartbeat reçu par le mock
#[derive(Debug, Clone)]
pub struct SentHeartbeat {
    pub target: ControllerTarget,
    pub payload: HeartbeatPayload,
}

#[derive(Debug)]
struct MockState {
    sent: Vec<SentHeartbeat>,
    scripted: VecDeque<MockReply>,
    default_reply: MockReply,
}

/// Mock de `Transport` partageable (les clones partagent l'historique)
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Mock en mode echo
    pub fn new() -> Self {
        Self::with_default(MockReply::Echo)
    }

    /// Mock dont chaque envoi échoue
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self::with_default(MockReply::Fail(message.into()))
    }

    pub fn with_default(reply: MockReply) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                sent: Vec::new(),
                scripted: VecDeque::new(),
                default_reply: reply,
            })),
        }
    }

    /// Ajoute une réponse utilisée pour le prochain envoi uniquement
    pub fn push_reply(&self, reply: MockReply) {
        self.state.lock().scripted.push_back(reply);
    }

    /// Remplace la réponse par défaut
    pub fn set_default(&self, reply: MockReply) {
        self.state.lock().default_reply = reply;
    }

    /// Tous les heartbeats envoyés (pour assertions de tests)
    pub fn sent(&self) -> Vec<SentHeartbeat> {
        self.state.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn last_payload(&self) -> Option<HeartbeatPayload> {
        self.state.lock().sent.last().map(|s| s.payload.clone())
    }

    /// Reset l'historique et les réponses scriptées
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.sent.clear();
        state.scripted.clear();
    }

    fn record(&self, target: &ControllerTarget, payload: &HeartbeatPayload) -> MockReply {
        let mut state = self.state.lock();
        state.sent.push(SentHeartbeat {
            target: target.clone(),
            payload: payload.clone(),
        });
        match state.scripted.pop_front() {
            Some(reply) => reply,
            None => state.default_reply.clone(),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    async fn send(
        &self,
        target: &ControllerTarget,
        payload: &HeartbeatPayload,
    ) -> Result<HeartbeatResponse, TransportError> {
        let reply = self.record(target, payload);
        log::info!(
            "[MOCK] heartbeat from {}: +{} ~{} -{}",
            target.name,
            payload.generators_added.len(),
            payload.generators_updated.len(),
            payload.generators_deleted.len()
        );

        match reply {
            MockReply::Echo => Ok(HeartbeatResponse::echo(payload)),
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(message) => Err(TransportError::Unavailable(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use refocus_collector::Generator;

    fn target() -> ControllerTarget {
        ControllerTarget {
            name: "c1".into(),
            url: "http://mock".into(),
            token: "t".into(),
        }
    }

    fn payload() -> HeartbeatPayload {
        HeartbeatPayload {
            log_lines: vec![],
            timestamp: Utc::now(),
            metadata: Default::default(),
            generators_added: vec![Generator::new("a")],
            generators_updated: vec![],
            generators_deleted: vec![],
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_then_default() {
        let transport = MockTransport::new();
        transport.push_reply(MockReply::Fail("boom".into()));

        let first = transport.send(&target(), &payload()).await;
        assert!(matches!(first, Err(TransportError::Unavailable(_))));

        let second = transport.send(&target(), &payload()).await.unwrap();
        assert_eq!(second.generators_added[0].name, "a");

        assert_eq!(transport.sent_count(), 2);
        assert_eq!(transport.sent()[0].target.name, "c1");
    }

    #[tokio::test]
    async fn test_clones_share_history() {
        let transport = MockTransport::failing("down");
        let observer = transport.clone();

        let _ = transport.send(&target(), &payload()).await;

        assert_eq!(observer.sent_count(), 1);
        assert!(observer.last_payload().is_some());
        observer.clear();
        assert_eq!(transport.sent_count(), 0);
    }
}
