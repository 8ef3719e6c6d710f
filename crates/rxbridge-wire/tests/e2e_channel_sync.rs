//! End-to-end synchronization: cell graph → channel → transport, and back.
//!
//! These tests exercise the full loop the way a UI layer would: build
//! cells, attach them as a tree, mutate locally, and feed renderer edits
//! back through the channel.

use rxbridge_core::{Codec, Computed, Model, Reactive, Registry, Value};
use rxbridge_wire::{Channel, RecordingTransport, TransportCall};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn setup() -> (Registry, Rc<RecordingTransport>, Channel) {
    let registry = Registry::new();
    let transport = Rc::new(RecordingTransport::new());
    let channel = Channel::new(registry.clone(), transport.clone());
    (registry, transport, channel)
}

#[test]
fn attaching_n_cells_costs_one_round_trip() {
    let (registry, transport, channel) = setup();

    let title = Model::new(&registry, json!("hello"));
    let count = Model::new(&registry, json!(0));
    let enabled = Model::new(&registry, json!(true));
    let label = Computed::new(
        &registry,
        |vals| Ok(json!(format!("{} ({})", vals[0].as_str().unwrap_or(""), vals[1]))),
        &[&title, &count],
    );

    let tree: Vec<Rc<dyn Reactive>> = vec![
        title.to_shared(),
        count.to_shared(),
        enabled.to_shared(),
        label.to_shared(),
    ];
    channel.attach(&tree);

    let batches = transport.batches();
    assert_eq!(batches.len(), 1, "one flush for the whole tree");
    assert_eq!(batches[0].as_array().unwrap().len(), 4);
    assert_eq!(channel.pending(), 0);
}

#[test]
fn local_edit_delivers_cascade_as_one_batch() {
    let (registry, transport, channel) = setup();

    let meters = Model::new(&registry, json!(1));
    let feet = Computed::new(
        &registry,
        |vals| Ok(json!(vals[0].as_f64().unwrap_or(0.0) * 3.28)),
        &[&meters],
    );

    let tree: Vec<Rc<dyn Reactive>> = vec![meters.to_shared(), feet.to_shared()];
    channel.attach(&tree);
    transport.take_calls();

    meters.set(json!(2)).unwrap();

    let batches = transport.batches();
    assert_eq!(batches.len(), 1, "model write and recompute share a batch");
    let records = batches[0].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["@"], json!(meters.id().raw()));
    assert_eq!(records[0]["value"], json!(2));
    assert_eq!(records[1]["@"], json!(feet.id().raw()));
    assert_eq!(records[1]["value"], json!(6.56));
}

#[test]
fn external_edit_is_applied_but_never_echoed() {
    let (registry, transport, channel) = setup();

    let quantity = Model::with_codec(&registry, json!(1), Codec::integer());
    let tree: Vec<Rc<dyn Reactive>> = vec![quantity.to_shared()];
    channel.attach(&tree);
    transport.take_calls();

    let seen = Rc::new(RefCell::new(None));
    let seen_clone = Rc::clone(&seen);
    quantity.add_callback(move |v| *seen_clone.borrow_mut() = Some(v.clone()), false);

    channel.receive_external_edit(quantity.id().raw(), json!("7"));

    assert_eq!(quantity.value().unwrap(), json!(7), "string coerced by codec");
    assert_eq!(*seen.borrow(), Some(json!(7)), "local subscribers ran");
    assert!(
        transport.batches().is_empty(),
        "no echo back to the renderer"
    );
    assert_eq!(channel.pending(), 0);
}

#[test]
fn external_edit_resyncs_derived_values_outbound() {
    let (registry, transport, channel) = setup();

    let celsius = Model::new(&registry, json!(0));
    let fahrenheit = Computed::new(
        &registry,
        |vals| Ok(json!(vals[0].as_f64().unwrap_or(0.0) * 9.0 / 5.0 + 32.0)),
        &[&celsius],
    );

    let tree: Vec<Rc<dyn Reactive>> = vec![celsius.to_shared(), fahrenheit.to_shared()];
    channel.attach(&tree);
    transport.take_calls();

    channel.receive_external_edit(celsius.id().raw(), json!(100));

    // The edited cell itself is not echoed, but the derived value the
    // renderer cannot compute locally goes out.
    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    let records = batches[0].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["@"], json!(fahrenheit.id().raw()));
    assert_eq!(records[0]["value"], json!(212.0));
}

#[test]
fn conversion_reject_leaves_graph_and_wire_untouched() {
    let (registry, transport, channel) = setup();

    let quantity = Model::with_codec(&registry, json!(3), Codec::integer());
    let tree: Vec<Rc<dyn Reactive>> = vec![quantity.to_shared()];
    channel.attach(&tree);
    transport.take_calls();

    channel.receive_external_edit(quantity.id().raw(), json!("not-a-number"));

    assert_eq!(quantity.value().unwrap(), json!(3));
    assert!(transport.is_empty());
}

#[test]
fn reattach_of_same_channel_is_idempotent() {
    let (registry, transport, channel) = setup();

    let model = Model::new(&registry, json!("x"));
    let tree: Vec<Rc<dyn Reactive>> = vec![model.to_shared()];

    channel.attach(&tree);
    channel.attach(&tree);

    assert_eq!(transport.batches().len(), 1, "second attach enqueued nothing");
}

#[test]
fn detach_stops_outbound_sync() {
    let (registry, transport, channel) = setup();

    let model = Model::new(&registry, json!(1));
    let tree: Vec<Rc<dyn Reactive>> = vec![model.to_shared()];
    channel.attach(&tree);
    transport.take_calls();

    channel.detach(&tree);
    model.set(json!(2)).unwrap();

    assert!(transport.is_empty());
    assert_eq!(model.value().unwrap(), json!(2), "local graph still works");
}

#[test]
fn immediate_callbacks_fire_on_attach() {
    let (registry, _transport, channel) = setup();

    let model = Model::new(&registry, json!("ready"));
    let attach_log = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&attach_log);
    model.add_callback(move |v| log.borrow_mut().push(v.clone()), true);

    let tree: Vec<Rc<dyn Reactive>> = vec![model.to_shared()];
    channel.attach(&tree);

    assert_eq!(*attach_log.borrow(), vec![json!("ready")]);
}

#[test]
fn edit_after_teardown_is_logged_not_fatal() {
    let (registry, transport, channel) = setup();

    let id = {
        let ephemeral = Model::new(&registry, json!(1));
        let tree: Vec<Rc<dyn Reactive>> = vec![ephemeral.to_shared()];
        channel.attach(&tree);
        transport.take_calls();
        ephemeral.id().raw()
    };
    // All handles (including the tree's) dropped: the id is gone.
    assert!(!registry.contains(rxbridge_core::CellId::from_raw(id)));

    channel.receive_external_edit(id, json!(2));
    assert!(transport.is_empty());
}

#[test]
fn renderer_driven_method_invocation_passes_through() {
    let (registry, transport, channel) = setup();

    let field = Model::new(&registry, json!(""));
    let tree: Vec<Rc<dyn Reactive>> = vec![field.to_shared()];
    channel.attach(&tree);
    transport.take_calls();

    channel.invoke_method(12, "validate", &json!([true]));
    assert_eq!(
        transport.calls(),
        vec![TransportCall::InvokeMethod {
            target: 12,
            method: "validate".into(),
            args: json!([true]),
        }]
    );
}

#[test]
fn scoped_eval_round_trip() {
    let (registry, _transport, channel) = setup();

    let row = rxbridge_core::PropVar::new(&registry);
    let total = rxbridge_core::ScopedComputed::new(
        &registry,
        |args| {
            let price = args[0].as_f64().unwrap_or(0.0);
            let qty = args[1].as_f64().unwrap_or(0.0);
            Ok(json!(price * qty))
        },
        &[row.view("price"), row.view("qty")],
    );

    let out = channel.receive_eval_request(total.id().raw(), &[json!(2.5), json!(4)]);
    assert_eq!(out, json!(10.0));

    assert_eq!(
        channel.receive_eval_request(total.id().raw() + 100, &[]),
        Value::Null
    );
}
