use dom::{Document, NodeId, Point, Rect, SpecifiedText, TextRun};
use skeleton::{DECORATION_ATTR, Engine, EngineConfig, KIND_ATTR, PositionMode, State};

struct Page {
    root: NodeId,
    heading: NodeId,
    image: NodeId,
    overlay: Option<NodeId>,
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// section (400x300) with a one-line heading and an image.
fn page(doc: &mut Document, with_overlay: bool) -> Page {
    let root = doc.append_element(doc.root(), "section").unwrap();
    doc.set_layout(root, Rect::new(0.0, 0.0, 400.0, 300.0));
    doc.set_text_style(
        root,
        SpecifiedText {
            font_size: Some(16.0),
            line_height: Some(20.0),
        },
    );

    let heading = doc.append_element(root, "h1").unwrap();
    doc.set_layout(heading, Rect::new(10.0, 10.0, 200.0, 20.0));
    let title = doc.append_text(heading, "Title").unwrap();
    doc.set_text_run(title, TextRun::new(Point::new(10.0, 10.0), 10.0, 210.0, 10.0, 20.0))
        .unwrap();

    let image = doc.append_element(root, "img").unwrap();
    doc.set_layout(image, Rect::new(10.0, 40.0, 100.0, 100.0));

    let overlay = with_overlay.then(|| {
        let panel = doc.append_element(root, "div").unwrap();
        doc.set_attribute(panel, KIND_ATTR, "overlay").unwrap();
        doc.set_layout(panel, Rect::new(10.0, 150.0, 300.0, 100.0));
        panel
    });
    Page {
        root,
        heading,
        image,
        overlay,
    }
}

fn engine(with_overlay: bool) -> (Engine<Document>, Page) {
    init_logging();
    let mut doc = Document::new();
    let page = page(&mut doc, with_overlay);
    (Engine::new(doc, EngineConfig::default()), page)
}

fn set_loading(engine: &Engine<Document>, root: NodeId, value: Option<&str>) {
    engine.with_host(|doc| match value {
        Some(value) => doc.set_attribute(root, "data-loading", value).unwrap(),
        None => {
            doc.remove_attribute(root, "data-loading");
        }
    });
    engine.flush();
}

fn style(engine: &Engine<Document>, node: NodeId, property: &str) -> Option<String> {
    engine.with_host(|doc| {
        doc.style(node)
            .and_then(|style| style.get(property))
            .map(str::to_owned)
    })
}

fn placements(engine: &Engine<Document>, nodes: &[NodeId]) -> Vec<Vec<Option<String>>> {
    nodes
        .iter()
        .map(|node| {
            ["left", "top", "width", "height"]
                .into_iter()
                .map(|property| style(engine, *node, property))
                .collect()
        })
        .collect()
}

fn attribute(engine: &Engine<Document>, node: NodeId, name: &str) -> Option<String> {
    engine.with_host(|doc| doc.attribute(node, name).map(str::to_owned))
}

fn is_alive(engine: &Engine<Document>, node: NodeId) -> bool {
    engine.with_host(|doc| doc.node(node).is_some())
}

#[test]
fn enabling_decorates_and_disabling_restores() {
    let (engine, page) = engine(false);
    engine.with_host(|doc| doc.set_style(page.image, "opacity", "0.5").unwrap());
    let _disposer = engine.attach(page.root);
    engine.flush();
    assert_eq!(engine.mode(), PositionMode::Float);
    assert_eq!(engine.state(page.root), Some(State::Disabled));
    assert!(engine.decorations(page.root).is_empty());

    set_loading(&engine, page.root, Some(""));
    assert_eq!(engine.state(page.root), Some(State::Enabled));
    let decorations = engine.decorations(page.root);
    assert_eq!(decorations.len(), 2);
    assert!(
        decorations
            .iter()
            .all(|node| attribute(&engine, *node, DECORATION_ATTR).is_some())
    );

    assert_eq!(style(&engine, page.root, "pointer-events").as_deref(), Some("none"));
    assert_eq!(style(&engine, page.root, "position").as_deref(), Some("relative"));
    assert_eq!(attribute(&engine, page.root, "aria-busy").as_deref(), Some("true"));
    assert_eq!(style(&engine, page.heading, "color").as_deref(), Some("transparent"));
    assert_eq!(style(&engine, page.image, "opacity").as_deref(), Some("0"));

    // The heading's single line starts 0.1px in and ends after five characters.
    let bar = decorations[0];
    assert_eq!(style(&engine, bar, "left").as_deref(), Some("10.1px"));
    assert_eq!(style(&engine, bar, "top").as_deref(), Some("10px"));
    assert_eq!(style(&engine, bar, "width").as_deref(), Some("49.9px"));
    assert_eq!(style(&engine, bar, "border-radius").as_deref(), Some("4px"));
    let first_placements = placements(&engine, &decorations);
    let photo = decorations[1];
    assert_eq!(style(&engine, photo, "border-radius").as_deref(), Some("8px"));
    assert_eq!(style(&engine, photo, "height").as_deref(), Some("100px"));

    set_loading(&engine, page.root, Some("false"));
    assert_eq!(engine.state(page.root), Some(State::Disabled));
    assert!(engine.decorations(page.root).is_empty());
    assert!(decorations.iter().all(|node| !is_alive(&engine, *node)));
    assert_eq!(style(&engine, page.root, "pointer-events"), None);
    assert_eq!(style(&engine, page.root, "position"), None);
    assert_eq!(attribute(&engine, page.root, "aria-busy"), None);
    assert_eq!(style(&engine, page.heading, "color"), None);
    assert_eq!(style(&engine, page.image, "opacity").as_deref(), Some("0.5"));
    // Only the enablement watcher is left.
    assert_eq!(engine.with_host(|doc| doc.active_observers()), 1);

    set_loading(&engine, page.root, Some("yes"));
    let again = engine.decorations(page.root);
    assert_eq!(again.len(), 2);
    assert_eq!(placements(&engine, &again), first_placements);
}

#[test]
fn resizing_a_candidate_recomputes_its_decorations() {
    let (engine, page) = engine(false);
    let _disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some("true"));
    let before = engine.decorations(page.root);

    engine.with_host(|doc| doc.set_layout(page.image, Rect::new(10.0, 40.0, 120.0, 60.0)));
    engine.flush();

    let after = engine.decorations(page.root);
    assert_eq!(after.len(), 2);
    assert_ne!(before, after);
    assert_eq!(style(&engine, after[1], "width").as_deref(), Some("120px"));
    assert_eq!(style(&engine, after[1], "height").as_deref(), Some("60px"));

    // Nothing changed, nothing is rebuilt.
    engine.with_host(|doc| doc.set_layout(page.image, Rect::new(10.0, 40.0, 120.0, 60.0)));
    engine.flush();
    assert_eq!(engine.decorations(page.root), after);
}

#[test]
fn dispose_is_idempotent_and_leaves_nothing_behind() {
    let (engine, page) = engine(false);
    let disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));
    let decorations = engine.decorations(page.root);
    assert!(!decorations.is_empty());

    disposer.dispose();
    assert!(disposer.is_disposed());
    disposer.dispose();
    engine.flush();

    assert_eq!(engine.state(page.root), None);
    assert!(decorations.iter().all(|node| !is_alive(&engine, *node)));
    assert_eq!(engine.with_host(|doc| doc.active_observers()), 0);
    assert_eq!(style(&engine, page.root, "pointer-events"), None);
    assert!(
        engine
            .with_host(|doc| doc.elements_with_attribute(page.root, DECORATION_ATTR))
            .is_empty()
    );

    // Toggling the attribute after disposal has no effect.
    set_loading(&engine, page.root, None);
    set_loading(&engine, page.root, Some(""));
    assert!(engine.decorations(page.root).is_empty());
}

#[test]
fn disposers_outliving_their_engine_are_harmless() {
    let (engine, page) = engine(false);
    let disposer = engine.attach(page.root);
    drop(engine);
    disposer.dispose();
    assert!(disposer.is_disposed());
}

#[test]
fn detaching_a_root_disposes_its_attachment() {
    let (engine, page) = engine(false);
    let disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));
    let decorations = engine.decorations(page.root);

    assert!(engine.detach(page.root));
    assert!(!engine.detach(page.root));
    assert_eq!(engine.state(page.root), None);
    assert!(decorations.iter().all(|node| !is_alive(&engine, *node)));
    assert_eq!(style(&engine, page.root, "pointer-events"), None);
    assert_eq!(engine.with_host(|doc| doc.active_observers()), 0);

    // The attachment is already gone; its disposer has nothing left to do.
    disposer.dispose();
    assert!(disposer.is_disposed());
}

#[test]
fn removing_the_root_disables_it() {
    let (engine, page) = engine(false);
    let _disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));
    assert_eq!(engine.decorations(page.root).len(), 2);

    engine.with_host(|doc| doc.detach(page.root));
    engine.flush();

    assert_eq!(engine.state(page.root), Some(State::Disabled));
    assert!(engine.decorations(page.root).is_empty());
    assert_eq!(style(&engine, page.heading, "color"), None);
}

#[test]
fn overlays_fade_out_before_removal() {
    let (engine, page) = engine(true);
    let panel = page.overlay.unwrap();
    let _disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));

    let decorations = engine.decorations(page.root);
    assert_eq!(decorations.len(), 3);
    let overlay = decorations[2];
    assert_eq!(attribute(&engine, overlay, DECORATION_ATTR).as_deref(), Some("overlay"));
    assert_eq!(style(&engine, overlay, "animation").as_deref(), Some("sk-fade-in 150ms"));
    assert_eq!(style(&engine, overlay, "width").as_deref(), Some("300px"));
    // Overlays leave the covered content visible.
    assert_eq!(style(&engine, panel, "opacity"), None);

    set_loading(&engine, page.root, None);
    assert!(engine.decorations(page.root).is_empty());
    assert!(is_alive(&engine, overlay));
    assert_eq!(engine.pending_removals(), 1);
    assert_eq!(
        style(&engine, overlay, "animation").as_deref(),
        Some("sk-fade-out 150ms forwards")
    );

    engine.with_host(|doc| doc.advance_time(100));
    engine.flush();
    assert!(is_alive(&engine, overlay));

    engine.with_host(|doc| doc.advance_time(50));
    engine.flush();
    assert!(!is_alive(&engine, overlay));
    assert_eq!(engine.pending_removals(), 0);
}

#[test]
fn content_under_an_overlay_is_left_alone() {
    let (engine, page) = engine(true);
    let panel = page.overlay.unwrap();
    let message = engine.with_host(|doc| {
        let message = doc.append_element(panel, "div").unwrap();
        doc.set_layout(message, Rect::new(20.0, 160.0, 100.0, 20.0));
        doc.append_text(message, "Hello").unwrap();
        message
    });
    let _disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));

    let decorations = engine.decorations(page.root);
    assert_eq!(decorations.len(), 3);
    assert_eq!(attribute(&engine, decorations[2], DECORATION_ATTR).as_deref(), Some("overlay"));
    assert_eq!(style(&engine, message, "color"), None);
    assert_eq!(style(&engine, message, "opacity"), None);
}

#[test]
fn re_enabling_during_a_fade_keeps_the_new_overlay() {
    let (engine, page) = engine(true);
    let disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));
    let old_overlay = engine.decorations(page.root)[2];

    set_loading(&engine, page.root, None);
    set_loading(&engine, page.root, Some(""));
    let new_overlay = engine.decorations(page.root)[2];
    assert_ne!(old_overlay, new_overlay);

    engine.with_host(|doc| doc.advance_time(150));
    engine.flush();
    assert!(!is_alive(&engine, old_overlay));
    assert!(is_alive(&engine, new_overlay));

    // Fades started by disposal still complete afterwards.
    disposer.dispose();
    assert!(is_alive(&engine, new_overlay));
    engine.with_host(|doc| doc.advance_time(150));
    engine.flush();
    assert!(!is_alive(&engine, new_overlay));
}

#[test]
fn anchor_mode_tethers_decorations_to_candidates() {
    init_logging();
    let mut doc = Document::new();
    doc.set_anchor_positioning(Some(true));
    let page = page(&mut doc, false);
    let engine = Engine::new(doc, EngineConfig::default());
    assert_eq!(engine.mode(), PositionMode::Anchor);

    let _disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));
    let decorations = engine.decorations(page.root);

    assert_eq!(style(&engine, page.heading, "anchor-name").as_deref(), Some("--sk-1-0"));
    assert_eq!(style(&engine, page.image, "anchor-name").as_deref(), Some("--sk-1-1"));
    assert_eq!(style(&engine, decorations[0], "position-anchor").as_deref(), Some("--sk-1-0"));
    assert_eq!(style(&engine, decorations[0], "left"), None);
    // The root is not turned into a containing block.
    assert_eq!(style(&engine, page.root, "position"), None);

    set_loading(&engine, page.root, Some("off"));
    assert_eq!(style(&engine, page.heading, "anchor-name"), None);
}

#[test]
fn forced_float_and_failed_probes_fall_back_to_floating() {
    init_logging();
    let mut doc = Document::new();
    doc.set_anchor_positioning(Some(true));
    let forced = Engine::new(doc, EngineConfig::default().with_force_float(true));
    assert_eq!(forced.mode(), PositionMode::Float);

    let mut doc = Document::new();
    doc.set_anchor_positioning(None);
    let unknown = Engine::new(doc, EngineConfig::default());
    assert_eq!(unknown.mode(), PositionMode::Float);
}

#[test]
fn attaching_twice_replaces_the_first_attachment() {
    let (engine, page) = engine(false);
    let first = engine.attach(page.root);
    let _second = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));
    assert_eq!(engine.decorations(page.root).len(), 2);

    first.dispose();
    assert_eq!(engine.state(page.root), Some(State::Enabled));
    assert_eq!(engine.with_host(|doc| doc.active_observers()), 2);
}

#[test]
fn zero_sized_candidates_are_not_decorated() {
    let (engine, page) = engine(false);
    engine.with_host(|doc| doc.set_layout(page.image, Rect::new(10.0, 40.0, 0.0, 100.0)));
    let _disposer = engine.attach(page.root);
    set_loading(&engine, page.root, Some(""));

    assert_eq!(engine.decorations(page.root).len(), 1);
    assert_eq!(style(&engine, page.image, "opacity"), None);

    // Once it gets a size it is picked up by the next recomputation.
    engine.with_host(|doc| doc.set_layout(page.image, Rect::new(10.0, 40.0, 100.0, 100.0)));
    engine.flush();
    assert_eq!(engine.decorations(page.root).len(), 2);
}
