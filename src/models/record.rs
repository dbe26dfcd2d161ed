use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// A document to index together with its `_id`.
#[derive(Debug, Clone)]
pub struct Record<T> {
    id: String,
    payload: T,
}

impl<T: Serialize> Record<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
    pub fn get_id(&self) -> &str {
        &self.id
    }
    pub fn get_payload(&self) -> &T {
        &self.payload
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub published: DateTime<Utc>,
    pub author: Author,
}

#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

/// Either a well-formed article or a document the `published` date mapping rejects.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ArticleDoc {
    Valid(Article),
    Broken { published: String },
}

/// Generates `count` articles with ids `1..=count`.
///
/// Ids listed in `broken_ids` get a document with an unparsable date, which a
/// default dynamic mapping rejects once a valid article has mapped `published`.
pub fn generate_articles(count: u64, broken_ids: &[u64]) -> Vec<Record<ArticleDoc>> {
    let now = Utc::now();
    (1..=count)
        .map(|id| {
            let doc = if broken_ids.contains(&id) {
                ArticleDoc::Broken {
                    published: "INCORRECT".to_string(),
                }
            } else {
                ArticleDoc::Valid(Article {
                    id,
                    title: format!("Title {}", id),
                    body: "Lorem ipsum...".to_string(),
                    published: published_at(now, id),
                    author: Author {
                        first_name: "John".to_string(),
                        last_name: "Smith".to_string(),
                    },
                })
            };
            Record::new(id.to_string(), doc)
        })
        .collect()
}

/// `now` plus `days` days, saturating at the latest representable instant.
fn published_at(now: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    i64::try_from(days)
        .ok()
        .and_then(TimeDelta::try_days)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
