//! `{token}` substitution from an upstream simulation payload.

use serde_json::Value;
use tracing::debug;

fn find_key<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    match v {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|child| find_key(child, key))),
        Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
        _ => None,
    }
}

/// Look a token up as a dotted path ("plant.modules"), falling back to a
/// depth-first search for the bare key.
fn lookup<'a>(payload: &'a Value, token: &str) -> Option<&'a Value> {
    let direct = token
        .split('.')
        .try_fold(payload, |node, part| node.get(part));
    match direct {
        Some(v) => Some(v),
        None if !token.contains('.') => find_key(payload, token),
        None => None,
    }
}

fn number_text(v: &Value) -> Option<String> {
    if let Some(i) = v.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = v.as_u64() {
        return Some(u.to_string());
    }
    v.as_f64().filter(|f| f.is_finite()).map(|f| f.to_string())
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Replace every `{token}` whose value in `payload` is numeric.
///
/// Tokens that are missing or not numeric are left verbatim, as is any
/// text that is not a well-formed token.
pub fn substitute_placeholders(template: &str, payload: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let token = &after[..close];
        match is_token(token)
            .then(|| lookup(payload, token))
            .flatten()
            .and_then(number_text)
        {
            Some(text) => out.push_str(&text),
            None => {
                if is_token(token) {
                    debug!(token, "placeholder left unresolved");
                }
                out.push('{');
                out.push_str(token);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
