//! Reading the evaluator's reply.
//!
//! The evaluator is asked for `{"consequence", "skills_used",
//! "professional_insight"}` but models wrap it in code fences or prose, or
//! ignore the format entirely. Anything unparseable yields no skills.

use serde_json::Value;

/// Fields of the evaluator reply the simulation uses. The consequence is
/// passed on as the raw reply, so it is not extracted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub skills_used: Vec<String>,
    pub professional_insight: Option<String>,
}

/// Parse an evaluator reply, or `None` when it holds no JSON object.
pub fn parse(text: &str) -> Option<Evaluation> {
    let obj = extract_object(text)?;
    let map = obj.as_object()?;

    let skills_used = match map.get("skills_used") {
        Some(Value::Array(items)) => items.iter().filter_map(skill_label).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };

    Some(Evaluation {
        skills_used,
        professional_insight: map
            .get("professional_insight")
            .and_then(text_of)
            .filter(|s| !s.trim().is_empty()),
    })
}

fn extract_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

fn skill_label(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills_used(text: &str) -> Vec<String> {
        parse(text).map(|e| e.skills_used).unwrap_or_default()
    }

    #[test]
    fn plain_json() {
        let e = parse(r#"{"consequence":"The sauce burns.","skills_used":["prioritization","delegation"],"professional_insight":"Chefs delegate."}"#)
            .unwrap();
        assert_eq!(e.skills_used, vec!["prioritization", "delegation"]);
        assert_eq!(e.professional_insight.as_deref(), Some("Chefs delegate."));
    }

    #[test]
    fn fenced_json_with_prose() {
        let text = "Here is my evaluation:\n```json\n{\"skills_used\": [\"triage\"]}\n```\nHope it helps.";
        assert_eq!(skills_used(text), vec!["triage"]);
    }

    #[test]
    fn blank_insight_is_none() {
        let e = parse(r#"{"skills_used":[],"professional_insight":"  "}"#).unwrap();
        assert_eq!(e.professional_insight, None);
    }

    #[test]
    fn prose_only_yields_nothing() {
        assert!(parse("Great choice, very professional.").is_none());
        assert!(skills_used("Great choice, very professional.").is_empty());
    }

    #[test]
    fn broken_json_yields_nothing() {
        assert!(skills_used("{\"skills_used\": [\"triage\"").is_empty());
        assert!(skills_used("} backwards {").is_empty());
    }

    #[test]
    fn missing_or_odd_skills_field() {
        assert!(skills_used(r#"{"consequence":"ok"}"#).is_empty());
        assert_eq!(skills_used(r#"{"skills_used":"empathy"}"#), vec!["empathy"]);
        assert_eq!(skills_used(r#"{"skills_used":["  focus ", "", null, 3]}"#), vec!["focus", "3"]);
    }

    #[test]
    fn top_level_array_is_rejected() {
        assert!(parse(r#"["triage"]"#).is_none());
    }
}
