//! Lazy, forward-only pagination over list endpoints.
//!
//! # Design
//! A list call returns its first page wrapped in a `Page`. Each `next` call
//! follows the server-supplied `links.next` URL and appends the fetched
//! items to `data`, so after `n` successful calls `data` holds the first
//! `n + 1` pages in server order. A fetch failure is stored and ends the
//! sequence; it is read back with `err`.
//!
//! `Page` borrows its `Client` and has no internal locking: it is meant to be
//! driven by one caller at a time.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Links {
    pub first: Option<String>,
    pub last: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub current_page: u64,
    pub from: Option<u64>,
    pub last_page: u64,
    pub path: String,
    pub per_page: u64,
    pub to: Option<u64>,
    pub total: u64,
}

/// Wire shape of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub meta: Meta,
    pub data: Vec<T>,
}

pub struct Page<'c, T> {
    client: &'c Client,
    pub links: Links,
    pub meta: Meta,
    pub data: Vec<T>,
    err: Option<ApiError>,
}

impl<'c, T: DeserializeOwned> Page<'c, T> {
    pub(crate) fn new(client: &'c Client, response: ListResponse<T>) -> Self {
        Self {
            client,
            links: response.links,
            meta: response.meta,
            data: response.data,
            err: None,
        }
    }

    /// Fetch the next page and append its items.
    ///
    /// Returns `false` without touching `data` when a previous fetch failed,
    /// when the current page is the last one, or when there is no `next`
    /// link. Returns `false` after a fetch that failed (see `err`) or that
    /// came back empty.
    pub fn next(&mut self, ctx: &Context) -> bool {
        if self.err.is_some() || self.meta.current_page >= self.meta.last_page {
            return false;
        }
        let Some(next) = self.links.next.clone().filter(|link| !link.is_empty()) else {
            return false;
        };

        match self.client.list_response::<T>(ctx, &next, &RequestOptions::new()) {
            Ok(page) => {
                let fetched = !page.data.is_empty();
                self.links = page.links;
                self.meta = page.meta;
                self.data.extend(page.data);
                fetched
            }
            Err(err) => {
                self.err = Some(err);
                false
            }
        }
    }

    /// The error that ended the sequence, if any.
    pub fn err(&self) -> Option<&ApiError> {
        self.err.as_ref()
    }

    pub fn items(&self) -> &[T] {
        &self.data
    }

    /// Fetch every remaining page and return all items.
    pub fn drain(mut self, ctx: &Context) -> Result<Vec<T>, ApiError> {
        while self.next(ctx) {}
        match self.err.take() {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

impl<T> IntoIterator for Page<'_, T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authenticator;
    use crate::config::ClientConfig;
    use crate::error::ErrorKind;
    use crate::testing::{reply, ScriptedTransport};
    use std::sync::Arc;
    use std::time::Duration;

    fn client(transport: Arc<ScriptedTransport>) -> Client {
        let config = ClientConfig::new("http://x/api/v1").with_retry_policy(1, Duration::from_millis(1));
        Client::with_transport(&config, &Authenticator::token("t"), transport).unwrap()
    }

    fn page_body(ids: &[u64], current: u64, last: u64) -> String {
        let next = if current < last {
            format!("\"http://x/api/v1/locations?page={}\"", current + 1)
        } else {
            "null".to_string()
        };
        let data: Vec<String> = ids.iter().map(|id| format!("{{\"id\":{id}}}")).collect();
        format!(
            r#"{{"data":[{}],"links":{{"next":{next}}},"meta":{{"current_page":{current},"last_page":{last}}}}}"#,
            data.join(",")
        )
    }

    fn ids(page: &Page<'_, serde_json::Value>) -> Vec<u64> {
        page.items().iter().map(|v| v["id"].as_u64().unwrap()).collect()
    }

    #[test]
    fn decodes_laravel_style_list() {
        let body = r#"{
            "data": [{"id": 1}, {"id": 2}],
            "links": {"first": "http://x/api/v1/locations?page=1", "last": "http://x/api/v1/locations?page=2", "prev": null, "next": "http://x/api/v1/locations?page=2"},
            "meta": {"current_page": 1, "from": 1, "last_page": 2, "path": "http://x/api/v1/locations", "per_page": 2, "to": 2, "total": 3}
        }"#;
        let page: ListResponse<serde_json::Value> = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.links.prev, None);
        assert_eq!(page.links.next.as_deref(), Some("http://x/api/v1/locations?page=2"));
        assert_eq!(page.meta.last_page, 2);
        assert_eq!(page.meta.total, 3);
    }

    #[test]
    fn missing_links_and_meta_default() {
        let page: ListResponse<u32> = serde_json::from_str(r#"{"data":[1,2,3]}"#).unwrap();
        assert_eq!(page.links, Links::default());
        assert_eq!(page.meta.current_page, 0);
    }

    #[test]
    fn last_page_is_a_no_op() {
        let transport = ScriptedTransport::new(vec![reply(200, &page_body(&[1, 2], 1, 1))]);
        let c = client(transport.clone());
        let mut page = c.list::<serde_json::Value>(&Context::background(), "locations", &RequestOptions::new()).unwrap();
        assert!(!page.next(&Context::background()));
        assert_eq!(ids(&page), vec![1, 2]);
        assert!(page.err().is_none());
        assert_eq!(transport.seen().len(), 1);
    }

    #[test]
    fn next_appends_in_server_order() {
        let transport = ScriptedTransport::new(vec![
            reply(200, &page_body(&[1, 2], 1, 3)),
            reply(200, &page_body(&[3, 4], 2, 3)),
            reply(200, &page_body(&[5], 3, 3)),
        ]);
        let c = client(transport.clone());
        let ctx = Context::background();
        let mut page = c.list::<serde_json::Value>(&ctx, "locations", &RequestOptions::new()).unwrap();

        assert!(page.next(&ctx));
        assert_eq!(ids(&page), vec![1, 2, 3, 4]);
        assert_eq!(page.meta.current_page, 2);
        assert!(page.next(&ctx));
        assert_eq!(ids(&page), vec![1, 2, 3, 4, 5]);
        assert!(!page.next(&ctx));

        let urls: Vec<String> = transport.seen().iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls[1], "http://x/api/v1/locations?page=2");
        assert_eq!(urls[2], "http://x/api/v1/locations?page=3");
    }

    #[test]
    fn empty_fetched_page_returns_false() {
        let transport = ScriptedTransport::new(vec![
            reply(200, &page_body(&[1], 1, 3)),
            reply(200, &page_body(&[], 2, 3)),
        ]);
        let c = client(transport);
        let ctx = Context::background();
        let mut page = c.list::<serde_json::Value>(&ctx, "locations", &RequestOptions::new()).unwrap();
        assert!(!page.next(&ctx));
        assert_eq!(ids(&page), vec![1]);
        assert_eq!(page.meta.current_page, 2);
        assert!(page.err().is_none());
    }

    #[test]
    fn failed_fetch_is_stored_and_sticky() {
        let transport = ScriptedTransport::new(vec![
            reply(200, &page_body(&[1], 1, 2)),
            reply(404, r#"{"message":"Not found"}"#),
        ]);
        let c = client(transport.clone());
        let ctx = Context::background();
        let mut page = c.list::<serde_json::Value>(&ctx, "locations", &RequestOptions::new()).unwrap();
        assert!(!page.next(&ctx));
        assert!(page.err().unwrap().is_not_found());
        assert_eq!(ids(&page), vec![1]);

        assert!(!page.next(&ctx));
        assert_eq!(transport.seen().len(), 2);
    }

    #[test]
    fn drain_collects_every_page() {
        let transport = ScriptedTransport::new(vec![
            reply(200, &page_body(&[1, 2], 1, 2)),
            reply(200, &page_body(&[3], 2, 2)),
        ]);
        let c = client(transport);
        let ctx = Context::background();
        let page = c.list::<serde_json::Value>(&ctx, "locations", &RequestOptions::new()).unwrap();
        let all = page.drain(&ctx).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn drain_surfaces_fetch_error() {
        let transport = ScriptedTransport::new(vec![
            reply(200, &page_body(&[1], 1, 2)),
            reply(500, "boom"),
            reply(500, "boom"),
        ]);
        let c = client(transport);
        let ctx = Context::background();
        let page = c.list::<serde_json::Value>(&ctx, "locations", &RequestOptions::new()).unwrap();
        let err = page.drain(&ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetriesExhausted);
    }
}
