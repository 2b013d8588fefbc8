//! Model listing and fallback selection

use serde_json::Value;

/// Extract model names from a `/v1/models` (or `/api/tags`) payload
///
/// Accepts `{"data": [...]}`, `{"models": [...]}` or a bare list whose
/// entries are names or objects carrying `name`, `model`, `model_name` or
/// `id`. Server order is preserved and duplicates dropped.
pub fn parse_model_list(payload: &Value) -> Vec<String> {
    let entries: &[Value] = match payload {
        Value::Array(list) => list.as_slice(),
        Value::Object(map) => map
            .get("models")
            .or_else(|| map.get("data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let name = match entry {
            Value::String(name) => Some(name.as_str()),
            Value::Object(map) => ["name", "model", "model_name", "id"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str)),
            _ => None,
        };
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Pick the model to use
///
/// `available` is `None` when the server could not be reached, in which
/// case the configured name is trusted. Otherwise: the configured model if
/// listed, else the first listed "gemma" model, else the first "llama" or
/// "gpt" model, else the first listed. An empty listing yields `None`.
pub fn select_model(configured: &str, available: Option<&[String]>) -> Option<String> {
    let Some(models) = available else {
        return Some(configured.to_string());
    };

    if models.iter().any(|m| m == configured) {
        return Some(configured.to_string());
    }

    let contains = |needles: &[&str]| {
        models.iter().find(|m| {
            let lower = m.to_lowercase();
            needles.iter().any(|needle| lower.contains(needle))
        })
    };

    contains(&["gemma"])
        .or_else(|| contains(&["llama", "gpt"]))
        .or_else(|| models.first())
        .cloned()
}
