use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const QUERY_ENVELOPE_SCHEMA_VERSION: &str = "querydash.envelope.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureNotice {
    #[serde(flatten)]
    pub notice: Notice,

    /// What was asked for: the query name and values, or the ad-hoc SQL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
}

/// Failed requests still carry `data` (an empty table for query commands) so
/// a front end can render a neutral panel next to the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub meta: BTreeMap<String, Value>,
    pub warnings: Vec<Notice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureNotice>,
}

impl QueryEnvelope {
    #[must_use]
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self::stamped(command.into(), Some(data), None)
    }

    #[must_use]
    pub fn error(
        command: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let failure = FailureNotice {
            notice: Notice {
                code: code.into(),
                message: message.into(),
            },
            request: None,
        };
        Self::stamped(command.into(), None, Some(failure))
    }

    fn stamped(command: String, data: Option<Value>, error: Option<FailureNotice>) -> Self {
        let meta = BTreeMap::from([(
            "schema_version".to_string(),
            Value::from(QUERY_ENVELOPE_SCHEMA_VERSION),
        )]);
        Self {
            ok: error.is_none(),
            command,
            generated_at_utc: generated_at_utc_now(),
            data,
            meta,
            warnings: Vec::new(),
            error,
        }
    }

    #[must_use]
    pub fn with_data(self, data: Value) -> Self {
        Self {
            data: Some(data),
            ..self
        }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_warnings<I, C, M>(mut self, warnings: I) -> Self
    where
        I: IntoIterator<Item = (C, M)>,
        C: Into<String>,
        M: Into<String>,
    {
        self.warnings
            .extend(warnings.into_iter().map(|(code, message)| Notice {
                code: code.into(),
                message: message.into(),
            }));
        self
    }

    #[must_use]
    pub fn with_request(mut self, request: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.request = Some(request);
        }
        self
    }

    #[must_use]
    pub fn into_failure(self) -> anyhow::Error {
        anyhow::Error::new(QueryEnvelopeCommandFailure(self))
    }
}

#[derive(Debug, Clone)]
pub struct QueryEnvelopeCommandFailure(QueryEnvelope);

impl QueryEnvelopeCommandFailure {
    #[must_use]
    pub fn envelope(&self) -> &QueryEnvelope {
        &self.0
    }
}

impl fmt::Display for QueryEnvelopeCommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => f.write_str("query envelope serialization failure"),
        }
    }
}

impl std::error::Error for QueryEnvelopeCommandFailure {}

fn generated_at_utc_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
