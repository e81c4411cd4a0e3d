use std::sync::Mutex;

use tracing::warn;

use crate::client::ChatClient;
use crate::endpoint::ValidatedEndpoint;
use crate::state::{Role, Turn};

/// Log entry text recorded when a round trip fails.
const SEND_FAILURE_TEXT: &str = "Failed to send message";

struct SessionState {
    turns: Vec<Turn>,
    pending: bool,
    next_id: u64,
}

impl SessionState {
    fn push_turn(&mut self, role: Role, text: String) {
        let id = self.next_id;
        self.next_id += 1;
        self.turns.push(Turn { id, role, text });
    }
}

/// One conversation against a validated endpoint.
///
/// The session owns an append-only log of [`Turn`]s and a `pending` flag
/// that is true exactly while a round trip is in flight. State sits behind
/// a mutex so a UI loop can poll [`turns`](Self::turns) and
/// [`is_pending`](Self::is_pending) while a send runs on another task; the
/// lock is never held across an await.
pub struct ConversationSession {
    endpoint: ValidatedEndpoint,
    client: ChatClient,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    /// Start an empty conversation with a probed endpoint. The endpoint is
    /// owned by this session for its entire lifetime.
    pub fn new(endpoint: ValidatedEndpoint) -> Self {
        Self {
            endpoint,
            client: ChatClient::new(),
            state: Mutex::new(SessionState {
                turns: Vec::new(),
                pending: false,
                next_id: 0,
            }),
        }
    }

    pub fn endpoint(&self) -> &ValidatedEndpoint {
        &self.endpoint
    }

    /// Snapshot of the conversation log in display order.
    pub fn turns(&self) -> Vec<Turn> {
        self.state.lock().unwrap().turns.clone()
    }

    /// True while a submitted turn is still waiting for its reply.
    pub fn is_pending(&self) -> bool {
        self.state.lock().unwrap().pending
    }

    /// Submit one user turn and await its reply.
    ///
    /// Whitespace-only input is ignored, as is a call made while an earlier
    /// send is still in flight (single-flight). The user turn is appended
    /// before the network step starts, so it renders immediately; exactly
    /// one `Server` or `Error` turn follows once the round trip resolves,
    /// with nothing else in between. `pending` clears last, on both paths.
    pub async fn send(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        {
            let mut state = self.state.lock().unwrap();
            if state.pending {
                return;
            }
            state.pending = true;
            state.push_turn(Role::User, text.to_string());
        }

        let result = self.client.send_message(self.endpoint.url(), text).await;

        let mut state = self.state.lock().unwrap();
        match result {
            Ok(reply) => state.push_turn(Role::Server, reply),
            Err(err) => {
                warn!("send to {} failed: {:#}", self.endpoint.url(), err);
                state.push_turn(Role::Error, SEND_FAILURE_TEXT.to_string());
            }
        }
        state.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::testutil::TestServer;

    fn session_for(server: &TestServer) -> ConversationSession {
        ConversationSession::new(ValidatedEndpoint::new(server.url()))
    }

    async fn wait_until_pending(session: &ConversationSession) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !session.is_pending() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session never became pending");
    }

    #[tokio::test]
    async fn reply_is_appended_after_the_user_turn() {
        let server = TestServer::start("200 OK", r#"{"output":"Hi there"}"#).await;
        let session = session_for(&server);

        session.send("Hello").await;

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "Hello");
        assert_eq!(turns[1].role, Role::Server);
        assert_eq!(turns[1].text, "Hi there");
        assert!(turns[0].id < turns[1].id);
        assert!(!session.is_pending());

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains(r#"{"chatInput":{"message":"Hello"}}"#));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn failed_round_trip_is_recorded_inline() {
        let server = TestServer::start("503 Service Unavailable", "busy").await;
        let session = session_for(&server);

        session.send("Hello").await;

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Error);
        assert_eq!(turns[1].text, "Failed to send message");
        assert!(!session.is_pending());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn missing_output_field_is_a_send_failure() {
        let server = TestServer::start("200 OK", r#"{"reply":"Hi"}"#).await;
        let session = session_for(&server);

        session.send("Hello").await;

        let turns = session.turns();
        assert_eq!(turns[1].role, Role::Error);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn non_string_output_is_a_send_failure() {
        let server = TestServer::start("200 OK", r#"{"output":{"text":"Hi"}}"#).await;
        let session = session_for(&server);

        session.send("Hello").await;

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Error);
        assert_eq!(turns[1].text, "Failed to send message");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn whitespace_only_input_is_ignored() {
        let server = TestServer::start("200 OK", r#"{"output":"Hi"}"#).await;
        let session = session_for(&server);

        session.send("  ").await;
        session.send("").await;
        session.send("\n\t").await;

        assert!(session.turns().is_empty());
        assert!(!session.is_pending());
        assert!(server.requests().is_empty());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn user_turn_is_visible_while_the_reply_is_in_flight() {
        let (server, gate) = TestServer::start_gated("200 OK", r#"{"output":"done"}"#).await;
        let session = Arc::new(session_for(&server));

        let in_flight = tokio::spawn({
            let session = session.clone();
            async move { session.send("Hello").await }
        });

        wait_until_pending(&session).await;
        let turns = session.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "Hello");

        gate.notify_one();
        in_flight.await.unwrap();
        assert!(!session.is_pending());
        assert_eq!(session.turns().len(), 2);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn send_while_pending_is_a_no_op() {
        let (server, gate) = TestServer::start_gated("200 OK", r#"{"output":"done"}"#).await;
        let session = Arc::new(session_for(&server));

        let in_flight = tokio::spawn({
            let session = session.clone();
            async move { session.send("first").await }
        });
        wait_until_pending(&session).await;

        // Returns control with the log and flag untouched, before the first
        // round trip resolves.
        session.send("second").await;
        assert!(session.is_pending());
        assert_eq!(session.turns().len(), 1);

        gate.notify_one();
        in_flight.await.unwrap();

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Server);
        assert_eq!(server.requests().len(), 1);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn sequential_sends_keep_strict_turn_pairing() {
        let server = TestServer::start("200 OK", r#"{"output":"ack"}"#).await;
        let session = session_for(&server);

        session.send("one").await;
        session.send("two").await;

        let turns = session.turns();
        let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, [Role::User, Role::Server, Role::User, Role::Server]);
        let ids: Vec<u64> = turns.iter().map(|t| t.id).collect();
        assert_eq!(ids, [0, 1, 2, 3]);
        assert_eq!(server.requests().len(), 2);

        server.shutdown().await;
    }
}
