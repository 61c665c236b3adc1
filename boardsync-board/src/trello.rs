//! HTTP implementation of [`BoardClient`] over the Trello REST API.
//!
//! Authentication is the key + token pair, sent as query parameters on every
//! request. Calls are paced: consecutive requests are spaced at least
//! `call_delay` apart so bursts (attachment replication, clearing a list)
//! stay under the service's rate limits. Each call is bounded by the agent
//! timeout; a timeout surfaces as [`BoardError::Transport`].

use std::sync::{Mutex, PoisonError};
use std::thread::sleep;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use boardsync_core::{
    config::{Credentials, SyncConfig},
    types::{
        BoardId, BoardList, Card, CardId, CardUpdate, CheckItem, CheckItemId, Checklist,
        ChecklistId, Label, LabelId, ListId, MemberId, NewCard,
    },
};

use crate::error::BoardError;
use crate::wire::{WireCard, WireCheckItem, WireChecklist, WireLabel, WireList};
use crate::BoardClient;

const CARD_DETAIL_QUERY: &[(&str, &str)] = &[("checklists", "all"), ("attachments", "true")];

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Enforces a minimum gap between consecutive calls.
#[derive(Debug)]
pub(crate) struct Pacer {
    min_gap: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub(crate) fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last: Mutex::new(None),
        }
    }

    /// Block until at least `min_gap` has passed since the previous call.
    pub(crate) fn wait(&self) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_gap {
                sleep(self.min_gap - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking Trello client.
#[derive(Debug)]
pub struct TrelloClient {
    agent: ureq::Agent,
    base: String,
    credentials: Credentials,
    pacer: Pacer,
}

impl TrelloClient {
    pub fn new(
        base: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
        call_delay: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base: base.into().trim_end_matches('/').to_string(),
            credentials,
            pacer: Pacer::new(call_delay),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.api_base.clone(),
            config.credentials.clone(),
            config.request_timeout,
            config.call_delay,
        )
    }

    fn request(&self, method: &str, path: &str, query: &[(&str, &str)]) -> ureq::Request {
        self.pacer.wait();
        tracing::debug!("{method} {path}");
        let mut req = self
            .agent
            .request(method, &format!("{}/{}", self.base, path))
            .query("key", &self.credentials.api_key)
            .query("token", &self.credentials.token);
        for (k, v) in query {
            req = req.query(k, v);
        }
        req
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BoardError> {
        let op = format!("GET {path}");
        let resp = self
            .request("GET", path, query)
            .call()
            .map_err(|e| map_ureq_err(&op, e))?;
        decode(&op, resp)
    }

    fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, BoardError> {
        let op = format!("POST {path}");
        let resp = self
            .request("POST", path, &[])
            .send_form(form)
            .map_err(|e| map_ureq_err(&op, e))?;
        decode(&op, resp)
    }

    /// Fire a write whose response body we do not need.
    fn send(
        &self,
        method: &str,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<(), BoardError> {
        let op = format!("{method} {path}");
        let req = self.request(method, path, &[]);
        let result = if form.is_empty() {
            req.call()
        } else {
            req.send_form(form)
        };
        result.map(|_| ()).map_err(|e| map_ureq_err(&op, e))
    }

    /// Cards that fail to decode are logged and dropped; the rest are kept.
    fn get_cards(&self, path: &str) -> Result<Vec<Card>, BoardError> {
        let op = format!("GET {path}");
        let raw: Vec<Value> = self.get_json(path, CARD_DETAIL_QUERY)?;
        Ok(raw.into_iter().filter_map(|v| card_from_value(&op, v)).collect())
    }
}

fn map_ureq_err(op: &str, err: ureq::Error) -> BoardError {
    match err {
        ureq::Error::Status(404, _) => BoardError::NotFound { op: op.to_string() },
        ureq::Error::Status(code, resp) => BoardError::Status {
            op: op.to_string(),
            code,
            body: resp.into_string().unwrap_or_default(),
        },
        // The transport error's URL carries credentials; report only the kind
        // and message.
        ureq::Error::Transport(t) => BoardError::Transport {
            op: op.to_string(),
            detail: match t.message() {
                Some(msg) => format!("{}: {msg}", t.kind()),
                None => t.kind().to_string(),
            },
        },
    }
}

fn decode<T: DeserializeOwned>(op: &str, resp: ureq::Response) -> Result<T, BoardError> {
    resp.into_json::<T>().map_err(|e| BoardError::Decode {
        op: op.to_string(),
        detail: e.to_string(),
    })
}

fn checked(done: bool) -> &'static str {
    if done {
        "true"
    } else {
        "false"
    }
}

fn card_from_value(op: &str, value: Value) -> Option<Card> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<no id>")
        .to_string();
    let decoded = serde_json::from_value::<WireCard>(value)
        .map_err(|e| BoardError::Decode {
            op: op.to_string(),
            detail: e.to_string(),
        })
        .and_then(|w| w.into_card(op));
    match decoded {
        Ok(card) => Some(card),
        Err(err) => {
            tracing::warn!("skipping card {id}: {err}");
            None
        }
    }
}

/// JSON body for a card update. `due: null` clears the due date.
fn update_body(update: &CardUpdate) -> Value {
    let mut body = Map::new();
    if let Some(title) = &update.title {
        body.insert("name".into(), json!(title));
    }
    if let Some(desc) = &update.description {
        body.insert("desc".into(), json!(desc));
    }
    if let Some(due) = &update.due {
        body.insert("due".into(), json!(due.map(|d| d.to_rfc3339())));
    }
    Value::Object(body)
}

impl BoardClient for TrelloClient {
    fn board_lists(&self, board: &BoardId) -> Result<Vec<BoardList>, BoardError> {
        let wire: Vec<WireList> =
            self.get_json(&format!("boards/{board}/lists"), &[("filter", "all")])?;
        Ok(wire.into_iter().map(BoardList::from).collect())
    }

    fn board_labels(&self, board: &BoardId) -> Result<Vec<Label>, BoardError> {
        let wire: Vec<WireLabel> = self.get_json(&format!("boards/{board}/labels"), &[])?;
        Ok(wire.into_iter().map(Label::from).collect())
    }

    fn board_cards(&self, board: &BoardId) -> Result<Vec<Card>, BoardError> {
        self.get_cards(&format!("boards/{board}/cards/open"))
    }

    fn list_cards(&self, list: &ListId) -> Result<Vec<Card>, BoardError> {
        self.get_cards(&format!("lists/{list}/cards"))
    }

    fn get_card(&self, card: &CardId) -> Result<Card, BoardError> {
        let path = format!("cards/{card}");
        let mut query = CARD_DETAIL_QUERY.to_vec();
        query.extend([("actions", "commentCard"), ("actions_limit", "1000")]);
        let wire: WireCard = self.get_json(&path, &query)?;
        wire.into_card(&format!("GET {path}"))
    }

    fn create_card(&self, card: &NewCard) -> Result<Card, BoardError> {
        let due = card.due.map(|d| d.to_rfc3339()).unwrap_or_default();
        let form = [
            ("idList", card.list_id.as_str()),
            ("name", card.title.as_str()),
            ("desc", card.description.as_str()),
            ("due", due.as_str()),
            ("pos", card.position.as_str()),
        ];
        let wire: WireCard = self.post_form("cards", &form)?;
        wire.into_card("POST cards")
    }

    fn update_card(&self, card: &CardId, update: &CardUpdate) -> Result<(), BoardError> {
        if update.is_empty() {
            return Ok(());
        }
        let path = format!("cards/{card}");
        let op = format!("PUT {path}");
        self.request("PUT", &path, &[])
            .send_json(update_body(update))
            .map(|_| ())
            .map_err(|e| map_ureq_err(&op, e))
    }

    fn delete_card(&self, card: &CardId) -> Result<(), BoardError> {
        self.send("DELETE", &format!("cards/{card}"), &[])
    }

    fn add_member(&self, card: &CardId, member: &MemberId) -> Result<(), BoardError> {
        self.send(
            "POST",
            &format!("cards/{card}/idMembers"),
            &[("value", member.as_str())],
        )
    }

    fn remove_member(&self, card: &CardId, member: &MemberId) -> Result<(), BoardError> {
        self.send("DELETE", &format!("cards/{card}/idMembers/{member}"), &[])
    }

    fn add_label(&self, card: &CardId, label: &LabelId) -> Result<(), BoardError> {
        self.send(
            "POST",
            &format!("cards/{card}/idLabels"),
            &[("value", label.as_str())],
        )
    }

    fn add_attachment(&self, card: &CardId, url: &str) -> Result<(), BoardError> {
        self.send("POST", &format!("cards/{card}/attachments"), &[("url", url)])
    }

    fn create_checklist(&self, card: &CardId, name: &str) -> Result<Checklist, BoardError> {
        let wire: WireChecklist =
            self.post_form(&format!("cards/{card}/checklists"), &[("name", name)])?;
        Ok(Checklist::from(wire))
    }

    fn add_checklist_item(
        &self,
        checklist: &ChecklistId,
        name: &str,
        done: bool,
    ) -> Result<CheckItem, BoardError> {
        let wire: WireCheckItem = self.post_form(
            &format!("checklists/{checklist}/checkItems"),
            &[("name", name), ("checked", checked(done)), ("pos", "bottom")],
        )?;
        Ok(CheckItem::from(wire))
    }

    fn set_item_state(
        &self,
        card: &CardId,
        item: &CheckItemId,
        done: bool,
    ) -> Result<(), BoardError> {
        let state = if done { "complete" } else { "incomplete" };
        self.send(
            "PUT",
            &format!("cards/{card}/checkItem/{item}"),
            &[("state", state)],
        )
    }

    fn add_comment(&self, card: &CardId, text: &str) -> Result<(), BoardError> {
        self.send(
            "POST",
            &format!("cards/{card}/actions/comments"),
            &[("text", text)],
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn pacer_spaces_calls() {
        let pacer = Pacer::new(Duration::from_millis(30));
        let start = Instant::now();
        pacer.wait();
        pacer.wait();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn pacer_with_zero_gap_does_not_sleep() {
        let pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.wait();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn update_body_only_carries_changed_fields() {
        let body = update_body(&CardUpdate {
            title: Some("New".into()),
            ..CardUpdate::default()
        });
        assert_eq!(body, json!({"name": "New"}));
    }

    #[test]
    fn update_body_clears_due_with_null() {
        let body = update_body(&CardUpdate {
            due: Some(None),
            ..CardUpdate::default()
        });
        assert_eq!(body, json!({"due": null}));

        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let body = update_body(&CardUpdate {
            due: Some(Some(at)),
            ..CardUpdate::default()
        });
        assert_eq!(body["due"], json!(at.to_rfc3339()));
    }

    #[test]
    fn unreachable_host_is_transport_error_without_credentials() {
        let client = TrelloClient::new(
            "http://127.0.0.1:9",
            Credentials {
                api_key: "k-secret".into(),
                token: "t-secret".into(),
            },
            Duration::from_secs(2),
            Duration::ZERO,
        );
        let err = client.get_card(&CardId::from("c1")).unwrap_err();
        assert!(matches!(err, BoardError::Transport { .. }), "got: {err}");
        assert!(err.is_transient());
        let msg = err.to_string();
        assert!(msg.contains("GET cards/c1"));
        assert!(!msg.contains("secret"));
    }
}
