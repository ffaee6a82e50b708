//! URL composition for turn requests.
//!
//! Every derived request URL resolves a `conversations/{id}` path segment
//! against the strategy's `base_url`, then overwrites the result's query
//! and fragment with `base_url`'s own — preserving whatever the strategy
//! put there verbatim, regardless of what path resolution produced.

use reqwest::Url;

/// Build the URL for one hop of a turn.
///
/// `conversation_id` is `None` for the very first request of a brand new
/// conversation (`conversations/`), and `Some` for every subsequent request.
#[must_use]
pub fn conversation_url(base_url: &Url, conversation_id: Option<&str>) -> Url {
    let mut url = base_url.clone();
    let path = match conversation_id {
        Some(id) => format!("conversations/{id}"),
        None => "conversations/".to_string(),
    };
    // join() replaces the path and drops query/fragment from `url`'s own
    // path resolution — base_url's query/fragment are reapplied below.
    url = url.join(&path).expect("conversation path is always a valid relative URL");
    url.set_query(base_url.query());
    url.set_fragment(base_url.fragment());
    url
}
