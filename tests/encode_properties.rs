use std::sync::Arc;

use slideflat::flatten::zorder;
use slideflat::surface::CannedSurface;
use slideflat::{Flattener, Rect, StaticSurface, Viewport};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn static_flattener() -> Flattener<StaticSurface> {
    Flattener::new(StaticSurface::new(Viewport::default()))
}

#[tokio::test]
async fn test_nested_text_collapses_to_one_unit() {
    init_logging();
    let slide = static_flattener()
        .encode("<div><span>Hello</span></div>")
        .await;
    assert_eq!(slide.units.len(), 1);
    assert_eq!(slide.units[0].tag_name.as_deref(), Some("div"));
    assert_eq!(slide.units[0].text, "Hello");
}

#[tokio::test]
async fn test_list_items_anchor_at_the_item() {
    init_logging();
    let slide = static_flattener()
        .encode("<ul><li><b>Item</b></li></ul>")
        .await;
    let tags: Vec<_> = slide
        .units
        .iter()
        .filter_map(|u| u.tag_name.as_deref())
        .collect();
    assert_eq!(tags, vec!["li"]);
    assert_eq!(slide.units[0].inner_html, "<b>Item</b>");
}

#[tokio::test]
async fn test_background_only_box() {
    init_logging();
    let slide = static_flattener()
        .encode("<div style=\"background:blue\"></div>")
        .await;
    assert_eq!(slide.units.len(), 1);
    let unit = &slide.units[0];
    assert!(unit.from_background);
    assert!(unit.inner_html.is_empty());
    assert!(unit.text.is_empty());
    assert_eq!(
        unit.style.get(slideflat::StyleProperty::BackgroundColor),
        Some("rgb(0, 0, 255)")
    );
}

#[tokio::test]
async fn test_larger_units_stack_below_smaller_ones() {
    init_logging();
    let surface = CannedSurface::new()
        .with_box("bg", Rect::new(0.0, 0.0, 800.0, 450.0))
        .with_box("title", Rect::new(40.0, 40.0, 600.0, 80.0))
        .with_box("note", Rect::new(40.0, 300.0, 200.0, 30.0))
        .with_box("badge", Rect::new(700.0, 20.0, 60.0, 60.0));
    let flattener = Flattener::new(surface);
    let slide = flattener
        .encode(
            "<div id=\"bg\" style=\"background:#222\">\
               <h1 id=\"title\">Quarterly results</h1>\
               <p id=\"note\">Unaudited</p>\
               <span id=\"badge\" style=\"background:gold\"></span>\
             </div>",
        )
        .await;

    let ids: Vec<_> = slide.units.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["bg", "title", "note", "badge"]);

    let stacked = zorder::stack(&slide.units);
    for a in &stacked {
        for b in &stacked {
            if a.area > b.area {
                assert!(a.z_index < b.z_index, "{} should be under {}", a.unit.id, b.unit.id);
            }
        }
    }
    assert_eq!(slide.width, Some(800.0));
    assert_eq!(slide.height, Some(450.0));
}

#[tokio::test]
async fn test_repeated_encode_hits_the_cache() {
    init_logging();
    let flattener = Flattener::new(CannedSurface::new());
    let markup = "<div><h2>Agenda</h2><ol><li>One</li><li>Two</li></ol></div>";

    let first = flattener.encode(markup).await;
    let second = flattener.encode(markup).await;
    assert_eq!(*first, *second);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(flattener.surface().load_count(), 1);

    flattener.encode("<p>other</p>").await;
    assert_eq!(flattener.surface().load_count(), 2);
}

#[tokio::test]
async fn test_unavailable_surface_degrades_to_empty() {
    init_logging();
    let flattener = Flattener::new(CannedSurface::new());
    flattener.surface().set_failing(true);

    let slide = flattener.encode("<div><p>x</p></div>").await;
    assert!(slide.units.is_empty());
    assert_eq!(slide.width, None);
    assert_eq!(slide.height, None);
    assert!(flattener.cache().is_empty());
}

#[tokio::test]
async fn test_unmeasurable_elements_are_omitted() {
    init_logging();
    let surface = CannedSurface::new()
        .with_default_box(None)
        .with_box("kept", Rect::new(0.0, 0.0, 50.0, 10.0));
    let flattener = Flattener::new(surface);
    let slide = flattener
        .encode("<div><p id=\"kept\">kept</p><p>lost</p></div>")
        .await;
    assert_eq!(slide.units.len(), 1);
    assert_eq!(slide.units[0].id, "kept");
    assert_eq!(slide.width, None);
}

#[tokio::test]
async fn test_each_source_node_appears_once() {
    init_logging();
    let slide = static_flattener()
        .encode(
            "<div style=\"background:#eee\">\
               <p style=\"background:#fff\">Filled text</p>\
               <p>Plain</p>\
             </div>",
        )
        .await;
    let mut ordinals: Vec<_> = slide.units.iter().map(|u| u.source_ordinal).collect();
    let before = ordinals.len();
    ordinals.sort();
    ordinals.dedup();
    assert_eq!(ordinals.len(), before);
    assert_eq!(before, 3);
}

#[tokio::test]
async fn test_image_alone_is_its_own_unit() {
    init_logging();
    let slide = static_flattener()
        .encode("<div style=\"width:400px\"><img src=\"logo.png\" width=\"100\" height=\"50\"></div>")
        .await;
    assert_eq!(slide.units.len(), 1);
    let img = &slide.units[0];
    assert_eq!(img.tag_name.as_deref(), Some("img"));
    assert_eq!((img.width, img.height), (100.0, 50.0));
    assert!(!img.from_background);
    assert!(slideflat::decode(&slide.units).contains("src=\"logo.png\""));
}

#[tokio::test]
async fn test_image_beside_text_travels_with_the_text() {
    init_logging();
    let slide = static_flattener()
        .encode("<div style=\"width:400px\"><img src=\"a.png\"> Caption</div>")
        .await;
    assert_eq!(slide.units.len(), 1);
    assert_eq!(slide.units[0].tag_name.as_deref(), Some("div"));
    assert!(slide.units[0].inner_html.contains("<img src=\"a.png\">"));
    assert_eq!(slideflat::decode(&slide.units).matches("<img").count(), 1);
}

#[tokio::test]
async fn test_image_inside_a_filled_panel_survives_decode() {
    init_logging();
    let slide = static_flattener()
        .encode(
            "<div style=\"background:blue;width:400px\">\
             <img src=\"logo.png\" width=\"100\" height=\"50\"></div>",
        )
        .await;
    let tags: Vec<_> = slide.units.iter().filter_map(|u| u.tag_name.as_deref()).collect();
    assert_eq!(tags, vec!["div", "img"]);
    assert!(slide.units[0].from_background);
    assert!(slide.units[0].inner_html.is_empty());

    let html = slideflat::decode(&slide.units);
    assert_eq!(html.matches("<img").count(), 1);
    assert!(html.contains("src=\"logo.png\""));
}

#[tokio::test]
async fn test_rule_is_a_unit_of_its_own() {
    init_logging();
    let slide = static_flattener()
        .encode("<div style=\"width:400px\"><p>Intro</p><hr></div>")
        .await;
    let mut tags: Vec<_> = slide.units.iter().filter_map(|u| u.tag_name.as_deref()).collect();
    tags.sort();
    assert_eq!(tags, vec!["hr", "p"]);
}
