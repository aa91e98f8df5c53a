//! System directive parsing and dispatch.
//!
//! Directives arrive embedded in the text stream as
//! `[SYSTEM] [MIDI] [note=C4] [/SYSTEM]` blocks. The payload keeps the
//! full bracketed form; this module picks out the action and forwards it
//! to a local controller endpoint at its ordered position in the stream.

use async_trait::async_trait;

use crate::error::Result;

/// Action carried by a directive payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveAction {
    /// `[note=..]`: a note name for the controller to play.
    Note(String),
    /// `[command=..]`: a transport command such as `stop`.
    Command(String),
}

impl DirectiveAction {
    /// Query parameter key and value for the controller request.
    pub fn query(&self) -> (&'static str, &str) {
        match self {
            DirectiveAction::Note(value) => ("note", value),
            DirectiveAction::Command(value) => ("command", value),
        }
    }

    /// Short text for the transcript line.
    pub fn display(&self) -> &str {
        match self {
            DirectiveAction::Note(value) | DirectiveAction::Command(value) => value,
        }
    }
}

fn bracketed_value<'a>(payload: &'a str, key: &str) -> Option<&'a str> {
    let open = format!("[{key}=");
    let start = payload.find(&open)? + open.len();
    let end = payload[start..].find(']')?;
    let value = payload[start..start + end].trim();
    (!value.is_empty()).then_some(value)
}

/// Extracts the action from a directive payload. A payload with neither a
/// note nor a command (or an empty value) carries no action.
pub fn parse_directive(payload: &str) -> Option<DirectiveAction> {
    if let Some(note) = bracketed_value(payload, "note") {
        return Some(DirectiveAction::Note(note.to_string()));
    }
    bracketed_value(payload, "command").map(|c| DirectiveAction::Command(c.to_string()))
}

/// Delivers directive payloads in stream order.
#[async_trait]
pub trait DirectiveTarget: Send + Sync {
    async fn dispatch(&self, payload: &str) -> Result<()>;
}

#[async_trait]
impl<T: DirectiveTarget + ?Sized> DirectiveTarget for std::sync::Arc<T> {
    async fn dispatch(&self, payload: &str) -> Result<()> {
        (**self).dispatch(payload).await
    }
}

/// Swallows directives. Wired when no controller endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardTarget;

#[async_trait]
impl DirectiveTarget for DiscardTarget {
    async fn dispatch(&self, _payload: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "http")]
pub use http::HttpDirectiveTarget;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;

    use crate::error::{Result, VoxpipeError};

    use super::{DirectiveTarget, parse_directive};

    /// Sends directives to the local controller as
    /// `POST {endpoint}?note=..` or `POST {endpoint}?command=..`.
    #[derive(Debug, Clone)]
    pub struct HttpDirectiveTarget {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpDirectiveTarget {
        pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
            Self {
                client,
                endpoint: endpoint.into(),
            }
        }
    }

    #[async_trait]
    impl DirectiveTarget for HttpDirectiveTarget {
        async fn dispatch(&self, payload: &str) -> Result<()> {
            let Some(action) = parse_directive(payload) else {
                return Err(VoxpipeError::Directive {
                    message: format!("no action in payload {payload:?}"),
                });
            };
            let response = self
                .client
                .post(&self.endpoint)
                .query(&[action.query()])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(VoxpipeError::Directive {
                    message: format!("controller answered {}", response.status()),
                });
            }
            Ok(())
        }
    }
}
