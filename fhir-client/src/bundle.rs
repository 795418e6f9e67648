//! FHIR Bundle (searchset) wire model
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A FHIR Bundle as returned by search interactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub link: Vec<BundleLink>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

/// Navigation link (`self`, `next`, `previous`, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// One entry of a Bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
}

impl Bundle {
    /// Parse a Bundle out of a JSON document, checking `resourceType`
    pub fn from_value(value: Value) -> Option<Self> {
        if value.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// URL of the next page, if the server signalled one
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }

    /// Resources carried by the entries, in order
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_searchset() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": 42,
            "link": [
                {"relation": "self", "url": "http://fhir/Patient?_count=2"},
                {"relation": "next", "url": "http://fhir?_getpages=abc&_getpagesoffset=2"}
            ],
            "entry": [
                {"fullUrl": "http://fhir/Patient/1", "resource": {"resourceType": "Patient", "id": "1"}},
                {"search": {"mode": "match"}}
            ]
        }))
        .unwrap();

        assert_eq!(bundle.total, Some(42));
        assert_eq!(bundle.next_link(), Some("http://fhir?_getpages=abc&_getpagesoffset=2"));
        assert_eq!(bundle.resources().count(), 1);
    }

    #[test]
    fn test_rejects_non_bundle() {
        assert!(Bundle::from_value(json!({"resourceType": "Patient", "id": "1"})).is_none());
    }

    #[test]
    fn test_empty_bundle_has_no_next() {
        let bundle = Bundle::from_value(json!({"resourceType": "Bundle", "total": 0})).unwrap();
        assert!(bundle.next_link().is_none());
        assert_eq!(bundle.resources().count(), 0);
    }
}
