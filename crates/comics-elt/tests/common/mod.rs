//! Shared test fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use comics_elt::source::{ComicSource, FetchOutcome, RawRecord, SourceResult};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Body of comic `num` as the xkcd API serves it
pub fn comic_body(num: i64, title: &str) -> Value {
    json!({
        "month": "1",
        "num": num,
        "link": "",
        "year": "2006",
        "news": "",
        "safe_title": title,
        "transcript": "[[A boy sits in a barrel]]",
        "alt": "Don't we all.",
        "img": format!("https://imgs.xkcd.com/comics/comic_{}.png", num),
        "title": title,
        "day": "1"
    })
}

/// In-process source serving a fixed set of comics
pub struct FixedSource {
    comics: Vec<(i64, String)>,
    requested: Mutex<Vec<i64>>,
}

impl FixedSource {
    pub fn new(comics: &[(i64, &str)]) -> Self {
        Self {
            comics: comics.iter().map(|(n, t)| (*n, t.to_string())).collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<i64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComicSource for FixedSource {
    async fn fetch(&self, num: i64) -> SourceResult<FetchOutcome> {
        self.requested.lock().unwrap().push(num);
        match self.comics.iter().find(|(n, _)| *n == num) {
            Some((_, title)) => Ok(FetchOutcome::Found(RawRecord::from_json(
                num,
                comic_body(num, title),
            )?)),
            None => Ok(FetchOutcome::NotFound { status: 404 }),
        }
    }
}
