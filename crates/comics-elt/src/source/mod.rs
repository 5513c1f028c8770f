//! Comic metadata source
//!
//! A source answers one question: what is stored under comic number `n`?
//! The answer is either a record or a terminal "not found". Transport and
//! decoding problems are reported as [`SourceError`]; the extractor treats
//! both as the end of the sequence for this run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod xkcd;

pub use xkcd::XkcdClient;

/// Fields every record must carry
pub const REQUIRED_FIELDS: [&str; 7] = ["num", "title", "month", "year", "transcript", "img", "alt"];

#[derive(Error, Debug)]
pub enum SourceError {
    /// Network failure or timeout while requesting a comic
    #[error("Request for comic {num} failed: {message}")]
    Transport { num: i64, message: String },

    /// The source answered with a body that is not a usable record
    #[error("Comic {num} returned an unusable body: {message}")]
    Decode { num: i64, message: String },

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// One comic as returned by the source, fields untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    num: i64,
    fields: Map<String, Value>,
}

impl RawRecord {
    /// Validate a decoded JSON body.
    ///
    /// The body must be an object with an integral `num` and every field in
    /// [`REQUIRED_FIELDS`]. Anything else it carries is kept as-is.
    pub fn from_json(requested: i64, body: Value) -> SourceResult<Self> {
        let decode = |message: String| SourceError::Decode {
            num: requested,
            message,
        };

        let Value::Object(fields) = body else {
            return Err(decode("expected a JSON object".to_string()));
        };

        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
            return Err(decode(format!("missing field '{}'", missing)));
        }

        let num = fields
            .get("num")
            .and_then(Value::as_i64)
            .ok_or_else(|| decode("'num' is not an integer".to_string()))?;

        Ok(Self { num, fields })
    }

    pub fn num(&self) -> i64 {
        self.num
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// All fields of the record, including `num`
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Result of asking the source for one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(RawRecord),
    /// Non-success status; no comic exists under this number (yet)
    NotFound { status: u16 },
}

/// Fetch-by-id contract of the external comic API
#[async_trait]
pub trait ComicSource: Send + Sync {
    async fn fetch(&self, num: i64) -> SourceResult<FetchOutcome>;
}
