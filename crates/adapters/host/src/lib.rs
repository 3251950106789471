//! # trigsync-adapter-host
//!
//! Host messaging adapter. The core runs hosted, not standalone: a host
//! process sends `{action: "apply"|"extract", payload?}` requests and gets
//! `{success, data?|error?}` envelopes back — no process exit codes, and a
//! malformed or unknown request is answered, never crashed on.
//!
//! Apply payloads may be DSL text or the script's JSON shape; extraction
//! answers with both.
//!
//! ## Dependency rule
//!
//! Depends on `trigsync-app` (engines + ports) and `trigsync-domain` only.

use serde::{Deserialize, Serialize};

use trigsync_app::applier::Applier;
use trigsync_app::extractor::Extractor;
use trigsync_app::ports::{ProgressSink, Surface};
use trigsync_app::wait::Timing;
use trigsync_domain::parse::parse;
use trigsync_domain::script::Script;
use trigsync_domain::serialize::serialize;

/// A request from the host.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HostRequest {
    /// Project a script onto the surface.
    Apply { payload: ApplyPayload },
    /// Read the surface back into a script.
    Extract,
}

/// Apply accepts either authored DSL text or the IR JSON shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApplyPayload {
    Text(String),
    Script(Script),
}

impl ApplyPayload {
    fn into_script(self) -> Script {
        match self {
            Self::Text(text) => parse(&text),
            Self::Script(script) => script,
        }
    }
}

/// The answer envelope.
#[derive(Debug, Serialize)]
pub struct HostResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostResponse {
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Dispatches host requests onto the engines.
pub struct HostHandler<S, P> {
    applier: Applier<S, P>,
    extractor: Extractor<S>,
}

impl<S: Surface + Clone, P: ProgressSink> HostHandler<S, P> {
    /// Wire both engines over a shared surface.
    pub fn new(surface: S, progress: P, timing: Timing) -> Self {
        Self {
            applier: Applier::new(surface.clone(), progress, timing),
            extractor: Extractor::new(surface, timing),
        }
    }

    /// Answer one already-decoded request.
    pub async fn handle(&self, request: HostRequest) -> HostResponse {
        match request {
            HostRequest::Apply { payload } => {
                let script = payload.into_script();
                tracing::info!(triggers = script.triggers.len(), "apply requested");
                match self.applier.apply(&script).await {
                    Ok(report) => match serde_json::to_value(&report) {
                        Ok(data) => HostResponse::ok(data),
                        Err(err) => HostResponse::failure(err.to_string()),
                    },
                    Err(err) => HostResponse::failure(err.to_string()),
                }
            }
            HostRequest::Extract => {
                tracing::info!("extract requested");
                match self.extractor.extract().await {
                    Ok(triggers) => {
                        let script = Script::new(triggers);
                        let text = serialize(&script);
                        match serde_json::to_value(&script) {
                            Ok(ir) => HostResponse::ok(serde_json::json!({
                                "script": ir,
                                "text": text,
                            })),
                            Err(err) => HostResponse::failure(err.to_string()),
                        }
                    }
                    Err(err) => HostResponse::failure(err.to_string()),
                }
            }
        }
    }

    /// Answer one raw request line; malformed requests get an error
    /// envelope instead of a crash.
    pub async fn handle_line(&self, line: &str) -> HostResponse {
        match serde_json::from_str::<HostRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(err) => {
                tracing::warn!(%err, "malformed host request");
                HostResponse::failure(format!("malformed request: {err}"))
            }
        }
    }
}
