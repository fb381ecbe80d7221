use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Snapshot of a DOM element as reported by a page context.
///
/// Only the parts the selector generator and the identity registry look at
/// are kept: tag, attributes, visible text, the element's position among
/// same-tag siblings, and its ancestor chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomElement {
    pub tag: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default)]
    pub text: Option<String>,

    /// 1-based index among siblings with the same tag. `None` when the
    /// element is the only one of its tag under its parent.
    #[serde(rename = "nthOfType", default)]
    pub nth_of_type: Option<usize>,

    #[serde(default)]
    pub parent: Option<Box<DomElement>>,
}

impl DomElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_nth_of_type(mut self, n: usize) -> Self {
        self.nth_of_type = Some(n);
        self
    }

    pub fn with_parent(mut self, parent: DomElement) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn tag_name(&self) -> String {
        self.tag.trim().to_lowercase()
    }

    /// Attribute value, ignoring attributes that are present but blank.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// `data-*` attributes in name order.
    pub fn data_attributes(&self) -> Vec<(&str, &str)> {
        self.attributes
            .iter()
            .filter(|(name, _)| name.starts_with("data-"))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }

    /// Visible text collapsed to single spaces, if any.
    pub fn visible_text(&self) -> Option<String> {
        let text = self.text.as_deref()?;
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed)
        }
    }

    /// Semantic role used in element IDs and records:
    /// button, link, input, select, or the bare tag name.
    pub fn semantic_type(&self) -> String {
        let tag = self.tag_name();
        let role = self.attr("role").map(|r| r.to_lowercase());
        let input_type = self.attr("type").map(|t| t.to_lowercase());

        match (tag.as_str(), role.as_deref(), input_type.as_deref()) {
            ("button", _, _) | (_, Some("button"), _) => "button".into(),
            ("input", _, Some("submit" | "button" | "reset")) => "button".into(),
            ("a", _, _) | (_, Some("link"), _) => "link".into(),
            ("input" | "textarea", _, _) => "input".into(),
            ("select", _, _) => "select".into(),
            _ => tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_attributes_are_absent() {
        let el = DomElement::new("div").with_attr("id", "   ");
        assert_eq!(el.id(), None);
    }

    #[test]
    fn semantic_type_prefers_role() {
        assert_eq!(DomElement::new("div").with_attr("role", "button").semantic_type(), "button");
        assert_eq!(DomElement::new("input").with_attr("type", "submit").semantic_type(), "button");
        assert_eq!(DomElement::new("input").with_attr("type", "email").semantic_type(), "input");
        assert_eq!(DomElement::new("A").semantic_type(), "link");
        assert_eq!(DomElement::new("select").semantic_type(), "select");
        assert_eq!(DomElement::new("li").semantic_type(), "li");
    }

    #[test]
    fn deserializes_from_page_json() {
        let json = r#"{
            "tag": "button",
            "attributes": {"class": "btn primary", "data-test": "save"},
            "text": "  Save   changes ",
            "nthOfType": 2,
            "parent": {"tag": "form", "attributes": {"name": "profile"}}
        }"#;
        let el: DomElement = serde_json::from_str(json).unwrap();
        assert_eq!(el.classes(), vec!["btn", "primary"]);
        assert_eq!(el.visible_text().as_deref(), Some("Save changes"));
        assert_eq!(el.nth_of_type, Some(2));
        assert_eq!(el.parent.unwrap().attr("name"), Some("profile"));
    }
}
