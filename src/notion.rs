//! Notion REST client: the concrete [`WorkspaceSource`] implementation.
//!
//! Decodes the API's loose JSON payloads (`serde_json::Value`) into the
//! engine's domain types. Unrecognized block or property kinds decode to the
//! `Unknown` arms rather than failing, so workspace content using newer
//! remote features still syncs with those pieces skipped.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::error;

use crate::contract::{
    BlockKind, CollectionMetadata, CollectionRow, ContentNode, DateValue, ItemMetadata,
    PropertyField, PropertyValue, RichTextSpan, RowPage, SourceError, WorkspaceSource,
};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// Pinned API revision; payload shapes in this module match it.
const NOTION_VERSION: &str = "2022-06-28";

/// HTTP client for the Notion API, authenticated with an integration token.
pub struct NotionClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, NOTION_API_BASE)
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, SourceError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        Self::decode_response(url, response).await
    }

    async fn post_json(&self, url: &str, body: Value) -> Result<Value, SourceError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;
        Self::decode_response(url, response).await
    }

    async fn decode_response(url: &str, response: reqwest::Response) -> Result<Value, SourceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to decode response body>"));
            error!(%status, url, "Notion API returned error. Response body: {body}");
            return Err(format!("Notion API error {status} for {url}").into());
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait::async_trait]
impl WorkspaceSource for NotionClient {
    async fn fetch_item_metadata(&self, id: &str) -> Result<ItemMetadata, SourceError> {
        let url = format!("{}/pages/{id}", self.base_url);
        let payload = self.get_json(&url).await?;
        Ok(parse_item_metadata(&payload))
    }

    async fn fetch_children(&self, node_id: &str) -> Result<Vec<ContentNode>, SourceError> {
        let url = format!("{}/blocks/{node_id}/children", self.base_url);
        let payload = self.get_json(&url).await?;
        let results = payload
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(results.iter().map(parse_block).collect())
    }

    async fn fetch_collection_metadata(
        &self,
        id: &str,
    ) -> Result<CollectionMetadata, SourceError> {
        let url = format!("{}/databases/{id}", self.base_url);
        let payload = self.get_json(&url).await?;
        Ok(CollectionMetadata {
            title: parse_rich_text(payload.get("title")),
            url: string_field(&payload, "url"),
        })
    }

    async fn query_collection_rows(
        &self,
        id: &str,
        cursor: Option<String>,
    ) -> Result<RowPage, SourceError> {
        let url = format!("{}/databases/{id}/query", self.base_url);
        let body = match cursor {
            Some(cursor) => json!({ "start_cursor": cursor }),
            None => json!({}),
        };
        let payload = self.post_json(&url, body).await?;

        let rows = payload
            .get("results")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(parse_row).collect())
            .unwrap_or_default();

        Ok(RowPage {
            rows,
            has_more: payload
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            next_cursor: string_field(&payload, "next_cursor"),
        })
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Decode a rich text array; anything malformed flattens to empty spans.
fn parse_rich_text(value: Option<&Value>) -> Vec<RichTextSpan> {
    value
        .and_then(Value::as_array)
        .map(|spans| {
            spans
                .iter()
                .map(|span| RichTextSpan {
                    plain_text: span
                        .get("plain_text")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Decode one block object into a [`ContentNode`].
pub fn parse_block(value: &Value) -> ContentNode {
    let id = string_field(value, "id").unwrap_or_default();
    let has_children = value
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let block_type = value.get("type").and_then(Value::as_str).unwrap_or("");
    // The type-specific payload lives under a key named after the type.
    let payload = value.get(block_type).cloned().unwrap_or(Value::Null);

    let rich_text = parse_rich_text(payload.get("rich_text"));
    let kind = match block_type {
        "paragraph" => BlockKind::Paragraph { rich_text },
        "heading_1" => BlockKind::Heading {
            level: 1,
            rich_text,
        },
        "heading_2" => BlockKind::Heading {
            level: 2,
            rich_text,
        },
        "heading_3" => BlockKind::Heading {
            level: 3,
            rich_text,
        },
        "bulleted_list_item" => BlockKind::BulletedItem { rich_text },
        "numbered_list_item" => BlockKind::NumberedItem { rich_text },
        "code" => BlockKind::Code {
            rich_text,
            language: string_field(&payload, "language"),
        },
        "quote" => BlockKind::Quote { rich_text },
        "image" => BlockKind::Image {
            caption: parse_rich_text(payload.get("caption")),
            url: parse_media_url(&payload),
        },
        "file" => BlockKind::File {
            caption: parse_rich_text(payload.get("caption")),
            url: parse_media_url(&payload),
        },
        _ => BlockKind::Unknown,
    };

    ContentNode {
        id,
        kind,
        has_children,
    }
}

/// A media block hosts its URL under `file` (workspace-hosted) or
/// `external` (linked). Workspace-hosted wins when both appear.
fn parse_media_url(payload: &Value) -> Option<String> {
    payload
        .get("file")
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)
        .or_else(|| {
            payload
                .get("external")
                .and_then(|e| e.get("url"))
                .and_then(Value::as_str)
        })
        .map(str::to_owned)
}

/// Decode one named property into a [`PropertyField`].
pub fn parse_property(name: &str, value: &Value) -> PropertyField {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or("");

    let parsed = match kind {
        "title" => PropertyValue::Title(parse_rich_text(value.get("title"))),
        "rich_text" => PropertyValue::RichText(parse_rich_text(value.get("rich_text"))),
        "number" => PropertyValue::Number(value.get("number").and_then(Value::as_f64)),
        "select" => PropertyValue::Select(option_name(value.get("select"))),
        "multi_select" => PropertyValue::MultiSelect(option_names(value.get("multi_select"))),
        "date" => PropertyValue::Date(parse_date(value.get("date"))),
        "people" => PropertyValue::People(name_list(value.get("people"))),
        "url" => PropertyValue::Url(string_field(value, "url")),
        "email" => PropertyValue::Email(string_field(value, "email")),
        "phone_number" => PropertyValue::PhoneNumber(string_field(value, "phone_number")),
        "checkbox" => PropertyValue::Checkbox(
            value.get("checkbox").and_then(Value::as_bool).unwrap_or(false),
        ),
        "status" => PropertyValue::Status(option_name(value.get("status"))),
        "files" => PropertyValue::Files(name_list(value.get("files"))),
        _ => PropertyValue::Unknown,
    };

    PropertyField {
        name: name.to_owned(),
        value: parsed,
    }
}

fn option_name(value: Option<&Value>) -> Option<String> {
    value
        .filter(|v| !v.is_null())
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn option_names(value: Option<&Value>) -> Vec<String> {
    name_list(value)
}

/// Collect the `name` of each element in an object array; a missing name
/// degrades to an empty string so positions are preserved.
fn name_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_date(value: Option<&Value>) -> Option<DateValue> {
    let date = value.filter(|v| !v.is_null())?;
    Some(DateValue {
        start: string_field(date, "start").unwrap_or_default(),
        end: string_field(date, "end"),
    })
}

/// Decode a page object's properties (in API order) and canonical URL.
pub fn parse_item_metadata(value: &Value) -> ItemMetadata {
    ItemMetadata {
        properties: parse_properties(value.get("properties")),
        url: string_field(value, "url"),
    }
}

/// Decode one database query result row.
pub fn parse_row(value: &Value) -> CollectionRow {
    CollectionRow {
        id: string_field(value, "id").unwrap_or_default(),
        properties: parse_properties(value.get("properties")),
    }
}

fn parse_properties(value: Option<&Value>) -> Vec<PropertyField> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(name, prop)| parse_property(name, prop))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paragraph_block() {
        let block = json!({
            "id": "b1",
            "type": "paragraph",
            "has_children": true,
            "paragraph": { "rich_text": [ { "plain_text": "hello" } ] }
        });

        let node = parse_block(&block);
        assert_eq!(node.id, "b1");
        assert!(node.has_children);
        assert_eq!(
            node.kind,
            BlockKind::Paragraph {
                rich_text: vec![RichTextSpan::new("hello")]
            }
        );
    }

    #[test]
    fn parses_heading_levels() {
        for level in 1..=3u8 {
            let kind = format!("heading_{level}");
            let mut block = json!({ "id": "h", "has_children": false });
            block["type"] = json!(kind);
            block[kind.as_str()] = json!({ "rich_text": [ { "plain_text": "t" } ] });

            assert_eq!(
                parse_block(&block).kind,
                BlockKind::Heading {
                    level,
                    rich_text: vec![RichTextSpan::new("t")]
                }
            );
        }
    }

    #[test]
    fn hosted_file_url_wins_over_external() {
        let payload = json!({
            "file": { "url": "https://hosted/x.png" },
            "external": { "url": "https://elsewhere/x.png" }
        });
        assert_eq!(
            parse_media_url(&payload).as_deref(),
            Some("https://hosted/x.png")
        );

        let external_only = json!({ "external": { "url": "https://elsewhere/y.png" } });
        assert_eq!(
            parse_media_url(&external_only).as_deref(),
            Some("https://elsewhere/y.png")
        );
        assert_eq!(parse_media_url(&json!({})), None);
    }

    #[test]
    fn unrecognized_block_type_decodes_to_unknown() {
        let block = json!({
            "id": "b9",
            "type": "synced_block",
            "has_children": true,
            "synced_block": {}
        });
        let node = parse_block(&block);
        assert_eq!(node.kind, BlockKind::Unknown);
        assert!(node.has_children);
    }

    #[test]
    fn parses_property_kinds() {
        let select = json!({ "type": "select", "select": { "name": "Active" } });
        assert_eq!(
            parse_property("State", &select).value,
            PropertyValue::Select(Some("Active".into()))
        );

        let null_select = json!({ "type": "select", "select": null });
        assert_eq!(
            parse_property("State", &null_select).value,
            PropertyValue::Select(None)
        );

        let date = json!({ "type": "date", "date": { "start": "2024-01-01", "end": null } });
        assert_eq!(
            parse_property("When", &date).value,
            PropertyValue::Date(Some(DateValue {
                start: "2024-01-01".into(),
                end: None
            }))
        );

        let people = json!({ "type": "people", "people": [ { "name": "Ada" }, {} ] });
        assert_eq!(
            parse_property("Who", &people).value,
            PropertyValue::People(vec!["Ada".into(), "".into()])
        );

        let custom = json!({ "type": "rollup", "rollup": {} });
        assert_eq!(parse_property("X", &custom).value, PropertyValue::Unknown);
    }

    #[test]
    fn item_metadata_preserves_property_order() {
        let page = json!({
            "url": "https://notion.so/p1",
            "properties": {
                "Zeta": { "type": "checkbox", "checkbox": true },
                "Alpha": { "type": "title", "title": [ { "plain_text": "T" } ] }
            }
        });

        let metadata = parse_item_metadata(&page);
        assert_eq!(metadata.url.as_deref(), Some("https://notion.so/p1"));
        // API order, not alphabetical.
        assert_eq!(metadata.properties[0].name, "Zeta");
        assert_eq!(metadata.properties[1].name, "Alpha");
    }
}
