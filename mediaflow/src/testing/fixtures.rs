//! Response fixtures for source parsers.

use serde_json::{json, Value};

use crate::transport::HttpResponse;

/// A 200 response with a JSON body.
#[must_use]
pub fn json_response(body: &Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string()).with_header("content-type", "application/json")
}

/// A 200 response with an HTML body.
#[must_use]
pub fn html_response(html: impl Into<String>) -> HttpResponse {
    HttpResponse::new(200, html).with_header("content-type", "text/html; charset=utf-8")
}

/// An AniList search page body.
///
/// Each media entry is `(id, romaji, english)`.
#[must_use]
pub fn anilist_search_page(current_page: u32, has_next: bool, media: &[(i64, &str, Option<&str>)]) -> Value {
    let media: Vec<Value> = media
        .iter()
        .map(|(id, romaji, english)| {
            json!({
                "id": id,
                "title": { "romaji": romaji, "english": english, "native": null }
            })
        })
        .collect();
    let last_page = if has_next { current_page + 1 } else { current_page };
    json!({
        "data": {
            "Page": {
                "pageInfo": {
                    "total": media.len(),
                    "currentPage": current_page,
                    "lastPage": last_page,
                    "hasNextPage": has_next,
                    "perPage": 50
                },
                "media": media
            }
        }
    })
}

/// An AniList airing schedule body. Each node is `(airing_at, episode)`.
#[must_use]
pub fn anilist_airing(nodes: &[(i64, u32)]) -> Value {
    let nodes: Vec<Value> = nodes
        .iter()
        .map(|(airing_at, episode)| json!({ "airingAt": airing_at, "episode": episode }))
        .collect();
    json!({ "data": { "Media": { "airingSchedule": { "nodes": nodes } } } })
}

/// An AniDB wishlist page. Each row is `(row_id, href, title)`.
#[must_use]
pub fn wishlist_page(rows: &[(&str, &str, &str)], next_href: Option<&str>) -> String {
    let rows: String = rows
        .iter()
        .map(|(id, href, title)| {
            format!(
                r#"<tr id="{id}"><td class="name"><a href="{href}">{title}</a></td><td class="type">TV Series</td></tr>"#
            )
        })
        .collect();
    let next = next_href
        .map(|href| format!(r#"<ul class="g_list jump"><li class="next"><a href="{href}">next</a></li></ul>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="g_content"><table class="wishlist"><tbody>{rows}</tbody></table>{next}</div></body></html>"#
    )
}
