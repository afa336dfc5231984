//! Content sanitation for the native message wire format: drops malformed
//! `thinking` content blocks that would otherwise make the upstream reject
//! the request with a 400.

use serde_json::{Map, Value};

/// Strips unsigned or leniently-malformed thinking blocks from a message
/// body's content arrays. Returns whether anything changed, so the caller
/// can forward the original bytes unchanged when nothing was touched.
pub fn sanitize(body: &mut Value) -> bool {
    let thinking_enabled = body
        .get("thinking")
        .and_then(|thinking| thinking.get("type"))
        .and_then(Value::as_str)
        == Some("enabled");

    let Some(messages) = body.get_mut("messages").and_then(Value::as_array_mut) else {
        return false;
    };

    messages
        .iter_mut()
        .fold(false, |changed, message| {
            sanitize_message(message, thinking_enabled) || changed
        })
}

fn sanitize_message(message: &mut Value, thinking_enabled: bool) -> bool {
    let role_is_assistant = message.get("role").and_then(Value::as_str) == Some("assistant");

    let Some(blocks) = message
        .get_mut("content")
        .and_then(Value::as_array_mut)
    else {
        // plain string content carries no blocks to sanitize
        return false;
    };

    let before = blocks.len();
    blocks.retain(|block| keep_block(block, thinking_enabled));
    let changed = blocks.len() != before;

    if changed && blocks.is_empty() {
        blocks.push(placeholder(role_is_assistant));
    }

    changed
}

fn keep_block(block: &Value, thinking_enabled: bool) -> bool {
    let Some(object) = block.as_object() else {
        return true;
    };

    match object.get("type").and_then(Value::as_str) {
        Some("thinking") | Some("redacted_thinking") => {
            thinking_enabled && has_nonempty_signature(object)
        }
        // no discriminator but a `thinking` member: lenient drop
        None if object.contains_key("thinking") => false,
        _ => true,
    }
}

fn has_nonempty_signature(object: &Map<String, Value>) -> bool {
    object
        .get("signature")
        .and_then(Value::as_str)
        .is_some_and(|signature| !signature.is_empty())
}

fn placeholder(assistant: bool) -> Value {
    let text = if assistant {
        "(assistant content removed)"
    } else {
        "(content removed)"
    };
    serde_json::json!({ "type": "text", "text": text })
}

/// The stricter variant applied before a retry whose predecessor failed with
/// a signature-related 400: drops the top-level `thinking` config entirely
/// and flattens surviving thinking/tool_use/tool_result blocks into plain
/// text, since the retry target may not accept those block types at all.
pub fn filter_for_retry(body: &mut Value) {
    if let Some(object) = body.as_object_mut() {
        object.remove("thinking");
    }

    let Some(messages) = body.get_mut("messages").and_then(Value::as_array_mut) else {
        return;
    };

    for message in messages {
        let Some(blocks) = message.get_mut("content").and_then(Value::as_array_mut) else {
            continue;
        };
        for block in blocks.iter_mut() {
            flatten_block(block);
        }
    }
}

fn flatten_block(block: &mut Value) {
    let Some(object) = block.as_object() else {
        return;
    };

    let flattened = match object.get("type").and_then(Value::as_str) {
        Some("thinking") => object
            .get("thinking")
            .and_then(Value::as_str)
            .map(str::to_string),
        Some("tool_use") => Some(format!(
            "[tool_use:{}] {}",
            object.get("name").and_then(Value::as_str).unwrap_or("unknown"),
            object
                .get("input")
                .map(Value::to_string)
                .unwrap_or_default(),
        )),
        Some("tool_result") => Some(
            object
                .get("content")
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default(),
        ),
        _ => None,
    };

    if let Some(text) = flattened {
        *block = serde_json::json!({ "type": "text", "text": text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_unsigned_thinking_block() {
        let mut body = json!({
            "messages": [
                {"role": "user", "content": [
                    {"type": "text", "text": "hi"},
                    {"type": "thinking", "thinking": "reasoning"},
                ]},
            ],
        });

        let changed = sanitize(&mut body);

        assert!(changed);
        assert_eq!(
            body["messages"][0]["content"],
            json!([{"type": "text", "text": "hi"}])
        );
    }

    #[test]
    fn keeps_signed_thinking_block_when_enabled() {
        let mut body = json!({
            "thinking": {"type": "enabled", "budget_tokens": 1024},
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "thinking", "thinking": "reasoning", "signature": "sig"},
                ]},
            ],
        });

        let changed = sanitize(&mut body);

        assert!(!changed);
    }

    #[test]
    fn empty_after_filtering_gets_placeholder() {
        let mut body = json!({
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "thinking", "thinking": "reasoning"},
                ]},
            ],
        });

        sanitize(&mut body);

        assert_eq!(
            body["messages"][0]["content"],
            json!([{"type": "text", "text": "(assistant content removed)"}])
        );
    }

    #[test]
    fn leniently_drops_untagged_thinking_member() {
        let mut body = json!({
            "messages": [
                {"role": "user", "content": [
                    {"thinking": "stray"},
                    {"type": "text", "text": "ok"},
                ]},
            ],
        });

        let changed = sanitize(&mut body);

        assert!(changed);
        assert_eq!(
            body["messages"][0]["content"],
            json!([{"type": "text", "text": "ok"}])
        );
    }

    #[test]
    fn filter_for_retry_flattens_tool_blocks() {
        let mut body = json!({
            "thinking": {"type": "enabled", "budget_tokens": 1024},
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "tool_use", "name": "lookup", "input": {"q": "x"}},
                ]},
            ],
        });

        filter_for_retry(&mut body);

        assert!(body.get("thinking").is_none());
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
    }
}
