//! Generic cursor-tracking incremental fetcher for paginated GraphQL
//! collections.
//!
//! A [Pages] tracks one remote collection: the items fetched so far, the
//! cursor of the last fetched edge (`next_cursor`), and the cursor of the
//! collection's last known edge as first reported by the server
//! (`end_cursor`). The collection is complete once it has been queried at
//! least once and the two cursors coincide; resuming a partially fetched
//! collection never re-requests completed pages.

use super::graphql::GraphQlClient;
use crate::errors::{StError, StResult};
use serde_json::Value;
use tracing::debug;

/// Incremental cursor state for one paginated remote collection of `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pages<T> {
    /// Field name of the collection, used to locate it in responses.
    name: String,
    items: Vec<T>,
    next_cursor: Option<String>,
    end_cursor: Option<String>,
    queried: bool,
}

impl<T> Pages<T> {
    /// A collection that has never been queried.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            next_cursor: None,
            end_cursor: None,
            queried: false,
        }
    }

    /// A collection seeded from a first page embedded in `node` (the parent
    /// entity's response object). Seeding counts as having been queried: a
    /// seeded collection whose cursors already coincide is complete.
    pub fn from_node(node: &Value, name: impl Into<String>, items: Vec<T>) -> Self {
        let name = name.into();
        let collection = node.get(&name);
        Self {
            next_cursor: collection.and_then(last_edge_cursor),
            end_cursor: collection.and_then(end_cursor_of),
            name,
            items,
            queried: true,
        }
    }

    /// True iff the collection has been queried at least once and the next
    /// unfetched edge coincides with the last known edge.
    pub fn complete(&self) -> bool {
        self.queried && self.next_cursor == self.end_cursor
    }

    /// The items fetched so far, in server edge order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Fetches the remainder of the collection, page by page, appending one
    /// `T` per edge via `make`. `page_query` renders the query for the page
    /// following the given cursor ([None] on the very first request).
    ///
    /// The first successful response fixes `end_cursor` if it is not yet
    /// known; `next_cursor` then advances monotonically toward it, so the
    /// loop terminates provided the server returns at least one edge per
    /// page until exhaustion (a protocol contract, not re-validated here).
    /// Calling this on a complete collection is a no-op.
    pub async fn append_all<C, M, Q>(
        &mut self,
        client: &C,
        make: M,
        page_query: Q,
    ) -> StResult<()>
    where
        C: GraphQlClient + ?Sized + Sync,
        M: Fn(&Value) -> StResult<T>,
        Q: Fn(Option<&str>) -> String,
    {
        debug!(
            collection = self.name,
            queried = self.queried,
            next_cursor = self.next_cursor.as_deref(),
            end_cursor = self.end_cursor.as_deref(),
            "querying all"
        );
        while !self.complete() {
            let response = client.run(&page_query(self.next_cursor.as_deref())).await?;
            let data = response
                .get("data")
                .ok_or_else(|| StError::RemoteDataMissing("data".to_string()))?;
            self.queried = true;

            let collection = find_named(data, &self.name)
                .ok_or_else(|| StError::RemoteDataMissing(format!("`{}` collection", self.name)))?;
            if self.end_cursor.is_none() {
                self.end_cursor = end_cursor_of(collection);
                debug!(end_cursor = self.end_cursor.as_deref(), "end cursor");
            }
            for edge in edges_of(collection) {
                self.items.push(make(edge)?);
            }
            self.next_cursor = last_edge_cursor(collection);
        }
        debug!(collection = self.name, items = self.items.len(), "queried all");
        Ok(())
    }
}

/// Locates the named collection anywhere under `value` by depth-first
/// descent. Detail queries nest their collection under
/// `repository.pullRequest`, and reaction pages sit inside a comment edge;
/// the search resolves both without per-query path plumbing.
pub(crate) fn find_named<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(name) {
                return Some(found);
            }
            map.values().find_map(|v| find_named(v, name))
        }
        Value::Array(items) => items.iter().find_map(|v| find_named(v, name)),
        _ => None,
    }
}

/// The edges of a collection object, in server order.
pub(crate) fn edges_of(collection: &Value) -> impl Iterator<Item = &Value> {
    collection
        .get("edges")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// The cursor of the last edge of a collection object.
pub(crate) fn last_edge_cursor(collection: &Value) -> Option<String> {
    collection
        .get("edges")
        .and_then(Value::as_array)
        .and_then(|edges| edges.last())
        .and_then(|edge| edge.get("cursor"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// The `pageInfo.endCursor` of a collection object.
pub(crate) fn end_cursor_of(collection: &Value) -> Option<String> {
    collection
        .get("pageInfo")
        .and_then(|info| info.get("endCursor"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gh::graphql::testing::FakeClient;
    use serde_json::json;

    /// A page of string items `from..to` (inclusive), with cursors `c{i}`
    /// and the collection end reported as `c{total}`.
    fn page(name: &str, from: usize, to: usize, total: usize) -> Value {
        let edges: Vec<Value> = (from..=to)
            .map(|i| json!({ "cursor": format!("c{i}"), "node": { "value": format!("item-{i}") } }))
            .collect();
        json!({
            "data": {
                name: {
                    "pageInfo": { "endCursor": format!("c{total}") },
                    "edges": edges,
                }
            }
        })
    }

    fn make(edge: &Value) -> crate::errors::StResult<String> {
        Ok(edge["node"]["value"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn fetches_all_pages_in_order() {
        let client = FakeClient::new(vec![
            page("search", 1, 10, 25),
            page("search", 11, 20, 25),
            page("search", 21, 25, 25),
        ]);
        let mut pages = Pages::empty("search");
        assert!(!pages.complete());

        pages
            .append_all(&client, make, |after| format!("after={:?}", after))
            .await
            .unwrap();

        assert!(pages.complete());
        assert_eq!(pages.items().len(), 25);
        let expected: Vec<String> = (1..=25).map(|i| format!("item-{i}")).collect();
        assert_eq!(pages.items(), expected.as_slice());

        // The second and third requests resume from the last fetched edge.
        let queries = client.recorded();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "after=None");
        assert_eq!(queries[1], "after=Some(\"c10\")");
        assert_eq!(queries[2], "after=Some(\"c20\")");
    }

    #[tokio::test]
    async fn complete_collection_is_a_no_op() {
        let client = FakeClient::new(vec![page("comments", 1, 3, 3)]);
        let mut pages = Pages::empty("comments");
        pages
            .append_all(&client, make, |_| String::new())
            .await
            .unwrap();
        assert!(pages.complete());

        // No responses left; a further call must not issue a request.
        pages
            .append_all(&client, make, |_| String::new())
            .await
            .unwrap();
        assert_eq!(client.recorded().len(), 1);
        assert_eq!(pages.items().len(), 3);
    }

    #[tokio::test]
    async fn missing_data_payload_is_an_error() {
        let client = FakeClient::new(vec![json!({ "what": {} })]);
        let mut pages: Pages<String> = Pages::empty("search");
        let err = pages
            .append_all(&client, make, |_| String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::errors::StError::RemoteDataMissing(_)));
    }

    #[test]
    fn seeded_page_state() {
        // An embedded first page holding the entire collection is complete.
        let node = json!({
            "comments": {
                "pageInfo": { "endCursor": "c2" },
                "edges": [
                    { "cursor": "c1", "node": {} },
                    { "cursor": "c2", "node": {} },
                ],
            }
        });
        let full: Pages<Value> = Pages::from_node(&node, "comments", vec![json!({}), json!({})]);
        assert!(full.complete());

        // One that reports a further end cursor is not.
        let node = json!({
            "comments": {
                "pageInfo": { "endCursor": "c9" },
                "edges": [{ "cursor": "c1", "node": {} }],
            }
        });
        let partial: Pages<Value> = Pages::from_node(&node, "comments", vec![json!({})]);
        assert!(!partial.complete());
    }

    #[test]
    fn find_named_descends_nested_shapes() {
        let response = json!({
            "repository": {
                "pullRequest": {
                    "comments": {
                        "edges": [
                            { "cursor": "a", "node": { "reactions": { "edges": [] } } }
                        ]
                    }
                }
            }
        });
        assert!(find_named(&response, "comments").unwrap().get("edges").is_some());
        assert!(find_named(&response, "reactions").is_some());
        assert!(find_named(&response, "reviews").is_none());
    }
}
