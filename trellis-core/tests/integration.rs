//! Integration Tests for the Render Pipeline
//!
//! These tests drive templates, the renderer and the reconciler together
//! through `MemoryHost` and `ManualScheduler`.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::{json, Value};

use trellis_core::reactive::{ManualScheduler, MountOptions, Partial, Renderer, View, WeakRenderer};
use trellis_core::template::{Ambient, Template, TemplateError};
use trellis_core::vdom::{HostNodeId, HostTree, MemoryHost, VNode};
use trellis_core::Error;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn mount(options: MountOptions) -> (Renderer<MemoryHost>, Arc<ManualScheduler>) {
    init_tracing();
    let mut host = MemoryHost::new();
    host.create_mount_point("app");
    let scheduler = Arc::new(ManualScheduler::new());
    let renderer = Renderer::mount(options, host, scheduler.clone());
    (renderer, scheduler)
}

fn html(renderer: &Renderer<MemoryHost>) -> String {
    let target = renderer.target().unwrap();
    renderer.with_host(|host| host.inner_html(target))
}

fn click(renderer: &Renderer<MemoryHost>, selector: &str) {
    let handler = renderer.with_host(|host| {
        let node = host.query(selector)?;
        host.listener(node, "click")
    });
    // Dispatched with the renderer unlocked, as a host would.
    handler.expect("no click listener").call(&Value::Null);
}

/// Test that an event handler can update state and trigger a re-render.
#[test]
fn event_dispatch_updates_state_and_rerenders() {
    let cell: Arc<OnceLock<WeakRenderer<MemoryHost>>> = Arc::new(OnceLock::new());
    let handle = cell.clone();
    let ambient = Ambient::standard().with_helper("increment", move |_| {
        if let Some(renderer) = handle.get().and_then(WeakRenderer::upgrade) {
            let next = renderer.read("count").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
            renderer.write("count", json!(next));
        }
        Value::Null
    });
    let template = Template::compile(
        r#"<div><p>Count: {{ count }}</p><button dr:onclick="increment">+</button></div>"#,
        ambient,
    )
    .unwrap();

    let (renderer, scheduler) = mount(MountOptions::new("#app", template).data("count", json!(0)));
    let _ = cell.set(renderer.downgrade());
    scheduler.flush();
    assert_eq!(html(&renderer), "<div><p>Count: 0</p><button>+</button></div>");

    click(&renderer, "button");
    click(&renderer, "button");
    assert_eq!(scheduler.pending_deferred(), 1);
    scheduler.flush();

    assert_eq!(html(&renderer), "<div><p>Count: 2</p><button>+</button></div>");
}

/// Test the nested option lists with class and style maps.
#[test]
fn nested_loops_with_class_and_style_maps() {
    let template = Template::compile(
        r#"
        <section>
          <div dr:for="(selected, index1) in selectedArr" dr:key="index1" class="row">
            <span
              dr:for="(op, index2) in optionArr[selected]"
              dr:class="{ 'picked': op === 'op1' }"
              dr:style="{ backgroundColor: index2 % 2 === 0 ? 'lightgray' : 'lightsteelblue' }"
            >{{ op }}</span>
          </div>
        </section>
        "#,
        Ambient::standard(),
    )
    .unwrap();

    let (renderer, scheduler) = mount(MountOptions::new("#app", template).initial_data(json!({
        "selectedArr": [1],
        "optionArr": {"1": ["op1", "op2"], "2": ["op3"]},
    })));
    scheduler.flush();
    assert_eq!(
        html(&renderer),
        concat!(
            r#"<section><div class="row">"#,
            r#"<span class="picked" style="background-color: lightgray">op1</span>"#,
            r#"<span style="background-color: lightsteelblue">op2</span>"#,
            "</div></section>"
        )
    );

    renderer.set_state(Partial::new().set("selectedArr", json!([2, 1])));
    scheduler.flush();
    assert_eq!(
        html(&renderer),
        concat!(
            r#"<section><div class="row">"#,
            r#"<span style="background-color: lightgray">op3</span>"#,
            r#"</div><div class="row">"#,
            r#"<span class="picked" style="background-color: lightgray">op1</span>"#,
            r#"<span style="background-color: lightsteelblue">op2</span>"#,
            "</div></section>"
        )
    );
}

fn list_items(renderer: &Renderer<MemoryHost>) -> Vec<HostNodeId> {
    renderer.with_host(|host| {
        let list = host.query("ul").unwrap();
        host.children(&list)
    })
}

/// Test that shrinking a list trims surplus nodes and keeps the rest.
#[test]
fn shrinking_list_reuses_leading_nodes() {
    let template = Template::compile(
        r#"<ul><li dr:for="x in items">{{ x }}</li></ul>"#,
        Ambient::standard(),
    )
    .unwrap();
    let (renderer, scheduler) = mount(MountOptions::new("#app", template).data("items", json!([10, 20, 30])));
    scheduler.flush();
    let before = list_items(&renderer);
    assert_eq!(before.len(), 3);

    renderer.write("items", json!([1, 2]));
    scheduler.flush();

    assert_eq!(list_items(&renderer), before[..2].to_vec());
    assert_eq!(html(&renderer), "<ul><li>1</li><li>2</li></ul>");
}

/// Test that emptying a list clears it and refilling builds fresh nodes.
#[test]
fn emptied_list_rebuilds_on_refill() {
    let template = Template::compile(
        r#"<ul><li dr:for="x in items">{{ x }}</li></ul>"#,
        Ambient::standard(),
    )
    .unwrap();
    let (renderer, scheduler) = mount(MountOptions::new("#app", template).data("items", json!([10, 20, 30])));
    scheduler.flush();
    let before = list_items(&renderer);

    renderer.write("items", json!([]));
    scheduler.flush();
    assert_eq!(html(&renderer), "<ul></ul>");

    renderer.write("items", json!([1, 2]));
    scheduler.flush();
    let after = list_items(&renderer);
    assert_eq!(html(&renderer), "<ul><li>1</li><li>2</li></ul>");
    assert!(after.iter().all(|node| !before.contains(node)));
}

/// Test that an unresolvable event binding stays literal and never fires.
#[test]
fn unresolved_event_binding_stays_literal() {
    let template = Template::compile(
        r#"<button dr:onclick="() => alert(count)">go</button>"#,
        Ambient::standard(),
    )
    .unwrap();
    let (renderer, scheduler) = mount(MountOptions::new("#app", template).data("count", json!(1)));
    scheduler.flush();

    let (attribute, listener) = renderer.with_host(|host| {
        let button = host.query("button").unwrap();
        (host.attribute(&button, "dr:onclick"), host.listener(button, "click"))
    });
    assert_eq!(attribute.as_deref(), Some("() => alert(count)"));
    assert!(listener.is_none());
}

/// Test that side effects observe a whole batch.
#[test]
fn side_effects_see_whole_batch() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let view = View::function(|state| {
        let name = state.get("name").and_then(Value::as_str).unwrap_or("nobody");
        vec![VNode::element("h1").text(format!("Hello, {name}")).into()]
    });
    let (renderer, scheduler) = mount(
        MountOptions::new("#app", view)
            .data("name", json!("Ada"))
            .side_effect(move |previous, current| {
                sink.lock().push((previous.to_value(), current.to_value()));
            }),
    );
    scheduler.flush();

    renderer.set_state(Partial::new().set("name", json!("Grace")).set("age", json!(85)));
    renderer.set_state(Partial::new().set("name", json!("Barbara")).unset("age"));
    scheduler.flush();

    assert_eq!(html(&renderer), "<h1>Hello, Barbara</h1>");
    assert_eq!(
        *seen.lock(),
        vec![(
            json!({"name": "Ada"}),
            json!({"name": "Barbara", "age": 85})
        )]
    );
}

/// Test that a view can switch element types between renders.
#[test]
fn view_switching_element_type_replaces_node() {
    let view = View::function(|state| {
        let tag = if state.get("loading") == Some(&json!(true)) { "span" } else { "div" };
        vec![VNode::element(tag).class("status").text("ok").into()]
    });
    let (renderer, scheduler) = mount(MountOptions::new("#app", view).data("loading", json!(true)));
    scheduler.flush();
    assert_eq!(html(&renderer), r#"<span class="status">ok</span>"#);

    renderer.write("loading", json!(false));
    scheduler.flush();
    assert_eq!(html(&renderer), r#"<div class="status">ok</div>"#);
}

/// Test that malformed templates fail at compile time.
#[test]
fn malformed_templates_are_rejected() {
    let err: Error = Template::compile("<div><span></div>", Ambient::new())
        .unwrap_err()
        .into();
    assert!(matches!(
        err,
        Error::Template(TemplateError::MismatchedClose { .. })
    ));

    let err = Template::compile(r#"<p dr:for="items"></p>"#, Ambient::new()).unwrap_err();
    assert!(matches!(err, TemplateError::InvalidLoop { .. }));
}
