use super::dom_model::DomElement;

/// Substrings marking `data-*` attributes injected by UI frameworks.
const GENERATED_DATA_MARKERS: [&str; 3] = ["react", "vue", "ng-"];

/// Class tokens describing transient UI state rather than identity.
const TRANSIENT_CLASSES: [&str; 5] = ["active", "selected", "open", "hover", "dynamic"];

const GENERATED_CLASS_PREFIXES: [&str; 3] = ["ng-", "react-", "vue-"];

const MIN_CLASS_LEN: usize = 3;

/// Element plus up to two ancestors.
const MAX_PATH_LEVELS: usize = 3;

/// Build a CSS selector for `el`, most resilient strategy first:
/// `#id`, then stable `data-*` attributes, then stable classes, then a short
/// ancestor path. Always returns something; the worst case is a bare tag path.
pub fn generate_selector(el: &DomElement) -> String {
    if let Some(id) = el.id().filter(|id| !id.is_empty()) {
        return format!("#{}", escape_ident(id));
    }

    if let Some(selector) = data_attribute_selector(el) {
        return selector;
    }

    if let Some(selector) = class_selector(el) {
        return selector;
    }

    ancestor_path_selector(el)
}

fn data_attribute_selector(el: &DomElement) -> Option<String> {
    let attrs: Vec<String> = el
        .data_attributes()
        .into_iter()
        .filter(|(name, _)| !GENERATED_DATA_MARKERS.iter().any(|m| name.contains(m)))
        .map(|(name, value)| format!("[{}=\"{}\"]", name, escape_attr_value(value)))
        .collect();

    if attrs.is_empty() {
        None
    } else {
        Some(format!("{}{}", el.tag_name(), attrs.concat()))
    }
}

fn class_selector(el: &DomElement) -> Option<String> {
    let classes = stable_classes(el);
    if classes.is_empty() {
        None
    } else {
        let classes: Vec<String> = classes.into_iter().map(escape_ident).collect();
        Some(format!("{}.{}", el.tag_name(), classes.join(".")))
    }
}

/// Classes that are likely to survive a re-render.
pub fn stable_classes(el: &DomElement) -> Vec<&str> {
    el.classes()
        .into_iter()
        .filter(|c| c.len() >= MIN_CLASS_LEN)
        .filter(|c| !is_transient_class(c))
        .filter(|c| !is_generated_class(c))
        .collect()
}

fn is_transient_class(class: &str) -> bool {
    let lower = class.to_lowercase();
    lower
        .split(|ch: char| ch == '-' || ch == '_')
        .any(|token| TRANSIENT_CLASSES.contains(&token))
}

fn is_generated_class(class: &str) -> bool {
    let lower = class.to_lowercase();
    if GENERATED_CLASS_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    // css-1a2b3c, sc-4f9e21: hashed names from CSS-in-JS tooling
    lower
        .rsplit(|ch: char| ch == '-' || ch == '_')
        .next()
        .is_some_and(is_hex_like)
}

fn is_hex_like(token: &str) -> bool {
    token.len() >= 5
        && token.chars().all(|c| c.is_ascii_hexdigit())
        && token.chars().any(|c| c.is_ascii_digit())
}

fn ancestor_path_selector(el: &DomElement) -> String {
    let mut levels = Vec::with_capacity(MAX_PATH_LEVELS);
    let mut current = Some(el);

    while let Some(node) = current {
        if levels.len() == MAX_PATH_LEVELS {
            break;
        }
        levels.push(path_level(node));
        current = node.parent.as_deref();
    }

    levels.reverse();
    levels.join(" > ")
}

fn path_level(el: &DomElement) -> String {
    let mut level = el.tag_name();

    let qualifier = ["aria-label", "name", "type"]
        .iter()
        .find_map(|attr| el.attr(attr).map(|v| (attr, v)));

    if let Some((attr, value)) = qualifier {
        level.push_str(&format!("[{}=\"{}\"]", attr, escape_attr_value(value)));
    }

    if let Some(n) = el.nth_of_type {
        level.push_str(&format!(":nth-of-type({})", n));
    }

    level
}

fn escape_attr_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape an id or class name for use after `#` or `.`, the way
/// `CSS.escape` does.
fn escape_ident(ident: &str) -> String {
    let leading_dash = ident.starts_with('-');
    let mut out = String::with_capacity(ident.len());

    for (i, c) in ident.chars().enumerate() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => push_code_point(&mut out, c),
            '0'..='9' if i == 0 || (i == 1 && leading_dash) => push_code_point(&mut out, c),
            '-' if ident.len() == 1 => out.push_str("\\-"),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

fn push_code_point(out: &mut String, c: char) {
    out.push_str(&format!("\\{:x} ", c as u32));
}
