use journey_capture::dom::{dom_model::DomElement, selector::generate_selector};

// =========================================================================
// Priority order
// =========================================================================

#[test]
fn id_always_wins() {
    let variants = [
        DomElement::new("button").with_attr("id", "foo"),
        DomElement::new("button")
            .with_attr("id", "foo")
            .with_attr("class", "btn btn-primary"),
        DomElement::new("div")
            .with_attr("id", "foo")
            .with_attr("data-test", "x")
            .with_attr("aria-label", "Foo"),
        DomElement::new("a")
            .with_attr("id", "foo")
            .with_parent(DomElement::new("nav")),
    ];
    for el in &variants {
        assert_eq!(generate_selector(el), "#foo", "element {:?}", el);
    }
}

#[test]
fn data_attributes_beat_classes() {
    let el = DomElement::new("button")
        .with_attr("class", "btn-primary")
        .with_attr("data-test", "checkout");
    assert_eq!(generate_selector(&el), r#"button[data-test="checkout"]"#);
}

#[test]
fn stable_classes_beat_the_ancestor_path() {
    let el = DomElement::new("div")
        .with_attr("class", "order-card")
        .with_parent(DomElement::new("section"));
    assert_eq!(generate_selector(&el), "div.order-card");
}

#[test]
fn transient_only_classes_fall_through_to_path() {
    let el = DomElement::new("li")
        .with_attr("class", "active open")
        .with_nth_of_type(3)
        .with_parent(DomElement::new("ul").with_attr("aria-label", "Tabs"));
    assert_eq!(
        generate_selector(&el),
        r#"ul[aria-label="Tabs"] > li:nth-of-type(3)"#
    );
}

#[test]
fn bare_element_yields_its_tag() {
    assert_eq!(generate_selector(&DomElement::new("SPAN")), "span");
}

#[test]
fn selector_is_deterministic() {
    let el = DomElement::new("a")
        .with_attr("data-b", "2")
        .with_attr("data-a", "1");
    assert_eq!(generate_selector(&el), generate_selector(&el.clone()));
    assert_eq!(generate_selector(&el), r#"a[data-a="1"][data-b="2"]"#);
}

// =========================================================================
// Escaping
// =========================================================================

#[test]
fn awkward_ids_and_classes_stay_valid_css() {
    let cases = [
        (DomElement::new("li").with_attr("id", "42"), r"#\34 2"),
        (DomElement::new("div").with_attr("id", "order total"), r"#order\ total"),
        (DomElement::new("input").with_attr("id", "billing.zip:code"), r"#billing\.zip\:code"),
        (DomElement::new("div").with_attr("class", "md:grid card"), r"div.md\:grid.card"),
    ];
    for (el, expected) in &cases {
        assert_eq!(generate_selector(el), *expected, "element {:?}", el);
    }
}

#[test]
fn empty_id_is_ignored() {
    let el = DomElement::new("button").with_attr("id", "").with_attr("class", "submit-btn");
    assert_eq!(generate_selector(&el), "button.submit-btn");
}
