use slideflat::dom::{DocumentTree, ROOT};
use slideflat::{decode, ChildStyle, FlatSlide, StyleProperty, StyleSnapshot, VisualUnit};

fn unit(tag: Option<&str>, width: f64, inner: &str) -> VisualUnit {
    VisualUnit {
        tag_name: tag.map(str::to_string),
        width,
        height: 10.0,
        inner_html: inner.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_missing_tag_becomes_div_and_others_survive() {
    let units = vec![
        unit(Some("h1"), 300.0, "Heading"),
        unit(None, 200.0, "Orphan"),
        unit(Some("p"), 100.0, "Paragraph"),
    ];
    let html = decode(&units);
    let tree = DocumentTree::parse_fragment(&html);
    let rebuilt: Vec<_> = tree
        .element_children(ROOT)
        .map(|id| (tree.tag(id).unwrap().to_string(), tree.text_content(id)))
        .collect();
    assert_eq!(
        rebuilt,
        vec![
            ("h1".to_string(), "Heading".to_string()),
            ("div".to_string(), "Orphan".to_string()),
            ("p".to_string(), "Paragraph".to_string()),
        ]
    );
}

#[test]
fn test_z_index_follows_area_rank() {
    let units = vec![unit(Some("p"), 10.0, "c"), unit(Some("p"), 300.0, "a"), unit(Some("p"), 20.0, "b")];
    let html = decode(&units);
    let tree = DocumentTree::parse_fragment(&html);
    for (rank, id) in tree.element_children(ROOT).enumerate() {
        let style = tree.attr(id, "style").unwrap();
        assert!(style.ends_with(&format!("z-index: {};", rank)), "{}", style);
    }
    let texts: Vec<_> = tree.element_children(ROOT).map(|id| tree.text_content(id)).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
}

#[test]
fn test_hostile_values_do_not_escape_their_element() {
    let mut u = unit(Some("div"), 10.0, "ok");
    u.style.insert(StyleProperty::Color, "red\"><script>alert(1)</script>");
    u.style.insert(StyleProperty::FontWeight, "700");
    u.attributes = vec![
        ("title".to_string(), "\"><b>x</b>".to_string()),
        ("<bad".to_string(), "1".to_string()),
    ];
    let html = decode(&[u]);
    let tree = DocumentTree::parse_fragment(&html);
    assert_eq!(tree.element_children(ROOT).count(), 1);
    let div = tree.first_content_element().unwrap();
    assert_eq!(tree.attr(div, "title"), Some("\"><b>x</b>"));
    assert!(tree.attr(div, "style").unwrap().starts_with("font-weight: 700;"));
    assert_eq!(tree.text_content(div), "ok");
}

#[test]
fn test_unbalanced_payload_stays_inside_the_unit() {
    let units = vec![unit(Some("div"), 50.0, "<b>open</div></div>tail"), unit(Some("p"), 5.0, "next")];
    let html = decode(&units);
    let tree = DocumentTree::parse_fragment(&html);
    let tags: Vec<_> = tree
        .element_children(ROOT)
        .map(|id| tree.tag(id).unwrap().to_string())
        .collect();
    assert_eq!(tags, vec!["div", "p"]);
}

#[test]
fn test_drifted_children_are_left_unstyled() {
    let mut snapshot = StyleSnapshot::new();
    snapshot.insert(StyleProperty::Color, "rgb(9, 9, 9)");
    let mut u = unit(Some("div"), 10.0, "<em>one</em>");
    u.children_styles = vec![
        ChildStyle {
            ordinal: 0,
            tag: "strong".to_string(),
            style: snapshot.clone(),
            children: vec![],
        },
        ChildStyle {
            ordinal: 3,
            tag: String::new(),
            style: snapshot,
            children: vec![],
        },
    ];
    let html = decode(&[u]);
    assert!(!html.contains("rgb(9, 9, 9)"));
    assert!(html.contains("<em>one</em>"));
}

#[test]
fn test_foreign_json_with_unknown_properties() {
    let json = r#"{
        "units": [
            { "x": 1, "y": 2, "width": 3, "height": 4, "innerHTML": "hi",
              "style": { "color": "rgb(1, 1, 1)", "-webkit-line-clamp": "2" },
              "attributes": [["data-k", "v"]] }
        ]
    }"#;
    let slide = FlatSlide::from_json(json).unwrap();
    assert_eq!(slide.width, None);
    let html = decode(&slide.units);
    assert!(html.starts_with("<div data-k=\"v\" style=\"color: rgb(1, 1, 1); position: absolute; left: 1px; top: 2px;"));
    assert!(!html.contains("line-clamp"));
}

#[test]
fn test_empty_input() {
    assert_eq!(decode(&[]), "");
}

#[test]
fn test_units_sharing_an_ordinal_are_all_rebuilt() {
    let mut first = unit(Some("p"), 40.0, "first");
    first.source_ordinal = Some(3);
    let mut second = unit(Some("p"), 20.0, "second");
    second.source_ordinal = Some(3);
    let html = decode(&[first, second]);
    let tree = DocumentTree::parse_fragment(&html);
    let texts: Vec<_> = tree.element_children(ROOT).map(|id| tree.text_content(id)).collect();
    assert_eq!(texts, vec!["first", "second"]);
}
