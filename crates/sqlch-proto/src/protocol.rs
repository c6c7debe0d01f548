//! Control-socket wire format.
//!
//! One newline-terminated JSON object per direction per connection:
//!
//! ```text
//!   client → {"cmd":"play","query":"jazz-fm"}\n
//!   daemon → {"ok":true,"station":{"id":"jazz-fm","name":"Jazz FM"}}\n
//! ```
use crate::error::SqlchError;
use crate::library::Station;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Preview length used when a request omits it or sends garbage.
pub const DEFAULT_PREVIEW_SECS: u64 = 12;

/// Upper bound on candidates echoed back on an unresolved play.
pub const MAX_REPLY_RESULTS: usize = 10;

/// Requests a client may send.  `Unknown` is never produced by serde; the
/// decoder falls back to it for any unrecognised `cmd`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Status,
    Stop,
    Pause,
    Play {
        #[serde(default)]
        query: Option<String>,
    },
    Preview {
        #[serde(default)]
        url: Option<String>,
        /// Seconds; numbers or numeric strings are accepted.
        #[serde(default)]
        duration: Option<Value>,
    },
    #[serde(skip)]
    Unknown { cmd: String },
}

const KNOWN_COMMANDS: &[&str] = &["ping", "status", "stop", "pause", "play", "preview"];

impl Request {
    pub fn play(query: impl Into<String>) -> Self {
        Self::Play {
            query: Some(query.into()),
        }
    }

    pub fn preview(url: impl Into<String>, duration_secs: Option<u64>) -> Self {
        Self::Preview {
            url: Some(url.into()),
            duration: duration_secs.map(Value::from),
        }
    }

    /// Decode one request line.
    pub fn decode(line: &str) -> Result<Self, SqlchError> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| SqlchError::MalformedRequest(e.to_string()))?;
        if !value.is_object() {
            return Err(SqlchError::MalformedRequest("expected a JSON object".into()));
        }

        let cmd = match value.get("cmd") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "None".to_string(),
            Some(other) => other.to_string(),
        };
        if !KNOWN_COMMANDS.contains(&cmd.as_str()) {
            return Ok(Self::Unknown { cmd });
        }

        serde_json::from_value(value).map_err(|e| SqlchError::MalformedRequest(e.to_string()))
    }

    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let mut out = serde_json::to_vec(self)?;
        out.push(b'\n');
        Ok(out)
    }
}

/// Interpret a preview duration field: numbers and numeric strings of at
/// least one second are honoured (fractions truncated).  Absent, non-numeric
/// and sub-second values, `0` included, all yield `fallback`.
pub fn preview_duration_secs(raw: Option<&Value>, fallback: u64) -> u64 {
    let secs = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match secs {
        Some(s) if s.is_finite() && s >= 1.0 => s as u64,
        _ => fallback,
    }
}

/// `{"id":..,"name":..}` as echoed by a successful play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRef {
    pub id: String,
    pub name: String,
}

impl From<&Station> for StationRef {
    fn from(st: &Station) -> Self {
        Self {
            id: st.id.clone(),
            name: st.name.clone(),
        }
    }
}

/// A station returned by the discovery service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
}

/// What the daemon is currently playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "item", rename_all = "snake_case")]
pub enum SessionInfo {
    Station(Station),
    Preview { url: String, duration_secs: u64 },
}

impl SessionInfo {
    pub fn label(&self) -> String {
        match self {
            Self::Station(st) => format!("Now playing: {}", st.name),
            Self::Preview { url, .. } => format!("Previewing: {}", url),
        }
    }
}

/// Reply to any request.  Optional fields are omitted when unset; `current`
/// is present (possibly `null`) only on status replies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<StationRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Candidate>>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn pong() -> Self {
        Self {
            msg: Some("pong".into()),
            ..Self::ok()
        }
    }

    pub fn status(status: String, current: Option<&SessionInfo>) -> Self {
        let current = current
            .and_then(|c| serde_json::to_value(c).ok())
            .unwrap_or(Value::Null);
        Self {
            status: Some(status),
            current: Some(current),
            ..Self::ok()
        }
    }

    pub fn playing(station: &Station) -> Self {
        Self {
            station: Some(station.into()),
            ..Self::ok()
        }
    }

    /// Reply for a play query that did not come down to one station.
    /// `results` are capped at `MAX_REPLY_RESULTS`.
    pub fn unresolved(query: &str, mut results: Vec<Candidate>) -> Self {
        let err = SqlchError::ResolutionAmbiguous {
            query: query.to_string(),
            candidates: results.len(),
        };
        results.truncate(MAX_REPLY_RESULTS);
        Self {
            results: Some(results),
            ..Self::error(err.to_string())
        }
    }

    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let mut out = serde_json::to_vec(self)?;
        out.push(b'\n');
        Ok(out)
    }

    pub fn decode(line: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_known_commands() {
        assert_eq!(Request::decode(r#"{"cmd":"ping"}"#).unwrap(), Request::Ping);
        assert_eq!(
            Request::decode("{\"cmd\":\"play\",\"query\":\"jazz-fm\"}\n").unwrap(),
            Request::play("jazz-fm")
        );
        assert_eq!(
            Request::decode(r#"{"cmd":"play"}"#).unwrap(),
            Request::Play { query: None }
        );
        match Request::decode(r#"{"cmd":"preview","url":"http://x","duration":"5"}"#).unwrap() {
            Request::Preview { url, duration } => {
                assert_eq!(url.as_deref(), Some("http://x"));
                assert_eq!(preview_duration_secs(duration.as_ref(), DEFAULT_PREVIEW_SECS), 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        assert_eq!(
            Request::decode(r#"{"cmd":"reboot"}"#).unwrap(),
            Request::Unknown { cmd: "reboot".into() }
        );
        assert_eq!(
            Request::decode(r#"{"query":"x"}"#).unwrap(),
            Request::Unknown { cmd: "None".into() }
        );
        assert!(matches!(
            Request::decode("not json"),
            Err(SqlchError::MalformedRequest(_))
        ));
        assert!(matches!(
            Request::decode("[1,2]"),
            Err(SqlchError::MalformedRequest(_))
        ));
        assert!(matches!(
            Request::decode(r#"{"cmd":"play","query":7}"#),
            Err(SqlchError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_preview_duration_fallback() {
        let d = DEFAULT_PREVIEW_SECS;
        assert_eq!(preview_duration_secs(None, d), d);
        assert_eq!(preview_duration_secs(Some(&json!("soon")), d), d);
        assert_eq!(preview_duration_secs(Some(&json!(0)), d), d);
        assert_eq!(preview_duration_secs(Some(&json!(0.5)), d), d);
        assert_eq!(preview_duration_secs(Some(&json!(" 9 ")), d), 9);
        assert_eq!(preview_duration_secs(Some(&json!(-3)), d), d);
        assert_eq!(preview_duration_secs(Some(&json!(null)), 20), 20);
        assert_eq!(preview_duration_secs(Some(&json!(30)), d), 30);
        assert_eq!(preview_duration_secs(Some(&json!(7.9)), d), 7);
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(
            serde_json::to_value(Reply::pong()).unwrap(),
            json!({"ok": true, "msg": "pong"})
        );
        assert_eq!(
            serde_json::to_value(Reply::status("sqlch: Not Playing".into(), None)).unwrap(),
            json!({"ok": true, "status": "sqlch: Not Playing", "current": null})
        );
        assert_eq!(
            serde_json::to_value(Reply::error("unknown cmd: reboot")).unwrap(),
            json!({"ok": false, "error": "unknown cmd: reboot"})
        );

        let many = vec![Candidate::default(); 14];
        let reply = Reply::unresolved("doesnotexist", many);
        assert_eq!(reply.error.as_deref(), Some("could not resolve: doesnotexist"));
        assert_eq!(reply.results.unwrap().len(), MAX_REPLY_RESULTS);

        let encoded = Reply::ok().encode().unwrap();
        assert_eq!(encoded, b"{\"ok\":true}\n");
    }

    #[test]
    fn test_session_info_shape() {
        let preview = SessionInfo::Preview {
            url: "http://x".into(),
            duration_secs: 5,
        };
        assert_eq!(
            serde_json::to_value(&preview).unwrap(),
            json!({"type": "preview", "item": {"url": "http://x", "duration_secs": 5}})
        );
        assert_eq!(preview.label(), "Previewing: http://x");
    }
}
