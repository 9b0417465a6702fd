//! End-to-end lifecycle suite against the real embedded interpreter.
//!
//! Interpreter startup and shutdown are process-global, so the whole
//! scenario runs as one sequenced test: initialize, exercise values and
//! the gateway, finalize, then re-initialize to prove the round trip.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pybridge::{
    Bridge, CallbackRegistry, Dict, Error, Int, List, Object, Str, Tuple, Value, ValueKind,
    set_dispatcher,
};

fn int(n: i64) -> Object {
    Int::new(n).expect("int").into()
}

fn text(s: &str) -> Object {
    Str::new(s).expect("str").into()
}

fn empty_tuple() -> Object {
    Tuple::new(0).expect("tuple").into()
}

#[test]
fn bridge_lifecycle_end_to_end() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dispatched = Arc::new(AtomicUsize::new(0));
    {
        let dispatched = Arc::clone(&dispatched);
        set_dispatcher(move |name, args| {
            dispatched.fetch_add(1, Ordering::SeqCst);
            match name {
                "echo" => Ok(args.into()),
                "boom" => Err(Error::Python("kaboom from the host".into())),
                _ => Ok(Object::none()),
            }
        });
    }

    let bridge = Bridge::initialize().expect("initialize");
    assert!(
        matches!(Bridge::initialize(), Err(Error::Init { .. })),
        "second live bridge must be refused"
    );

    {
        sentinels(&bridge);
        predicates();
        typed_wrappers();
        value_roundtrip();
        cyclic_decode(&bridge);
        gateway(&bridge, &dispatched);
        interpreter_side_call(&bridge);

        // Handoff guards round-trip on the owning thread.
        let saved = pybridge::threads::SavedThread::release();
        saved.acquire();
        drop(pybridge::threads::GilGuard::ensure());
    }

    bridge.finalize().expect("finalize");

    // Round trip: the runtime is uninitialized again, so a second bridge
    // may start. The dispatcher slot was cleared at finalize.
    failed_init_hook_rolls_back();
    hooks_and_registry_after_reinit();
}

fn sentinels(bridge: &Bridge) {
    assert_eq!(bridge.none(), Object::none());
    assert_ne!(bridge.bool_true(), bridge.bool_false());
    // Interpreter booleans are integers to the shape probes.
    assert!(bridge.bool_true().is_int());
    assert!(bridge.module().getattr("call").expect("call attr").is_callable());
}

fn predicates() {
    let cases: [(Object, ValueKind); 4] = [
        (int(7), ValueKind::Int),
        (text("seven"), ValueKind::Str),
        (List::new(0).expect("list").into(), ValueKind::List),
        (empty_tuple(), ValueKind::Tuple),
    ];
    for (object, kind) in &cases {
        assert_eq!(object.kind(), *kind);
        let hits = [
            object.is_int(),
            object.is_str(),
            object.is_list(),
            object.is_tuple(),
        ]
        .iter()
        .filter(|hit| **hit)
        .count();
        assert_eq!(hits, 1, "exactly one predicate for {kind:?}");
    }

    // Unrecognized shapes answer false everywhere; that is an outcome,
    // not an error.
    let other: Object = Dict::new().expect("dict").into();
    assert!(!other.is_int() && !other.is_str() && !other.is_list() && !other.is_tuple());
    assert_eq!(other.kind(), ValueKind::Other);
}

fn typed_wrappers() {
    assert_eq!(int(41).to_i64().expect("to_i64"), 41);
    assert_eq!(text("bonjour").to_str().expect("to_str"), "bonjour");
    assert!(matches!(
        int(1).to_str(),
        Err(Error::Type { expected: "a string" })
    ));

    let list = List::new(2).expect("list");
    list.set(0, &int(10)).expect("set 0");
    list.set(1, &int(20)).expect("set 1");
    assert_eq!(list.len(), 2);
    assert_eq!(list.get(1).expect("get").to_i64().expect("to_i64"), 20);
    assert!(list.get(5).is_err());

    let tuple = Tuple::new(2).expect("tuple");
    tuple.set_int(0, 1).expect("set_int");
    tuple.set(1, &text("two")).expect("set");
    assert_eq!(tuple.get(0).expect("get").to_i64().expect("to_i64"), 1);

    let sep = Str::new(", ").expect("sep");
    let words = List::new(2).expect("words");
    words.set(0, &text("a")).expect("set");
    words.set(1, &text("b")).expect("set");
    assert_eq!(sep.join(&words).expect("join").to_str().expect("to_str"), "a, b");

    let dict = Dict::new().expect("dict");
    let key = text("status");
    dict.set_str(&key, "ok").expect("set_str");
    assert_eq!(
        dict.get(&key).expect("present").to_str().expect("to_str"),
        "ok"
    );
    assert!(dict.get(&text("missing")).is_none());

    let mut seen = Vec::new();
    let it = list.iter().expect("iter");
    while let Some(item) = it.next().expect("next") {
        seen.push(item.to_i64().expect("to_i64"));
    }
    assert_eq!(seen, vec![10, 20]);

    let a = Str::intern("content-type").expect("intern");
    let b = Str::intern("content-type").expect("intern");
    assert_eq!(a.as_ptr(), b.as_ptr(), "interned strings share one value");
}

fn value_roundtrip() {
    let value = Value::Tuple(vec![
        Value::Int(1),
        Value::Str("two".into()),
        Value::List(vec![Value::Int(3), Value::Int(4)]),
    ]);
    let object = value.encode().expect("encode");
    assert!(object.is_tuple());
    assert_eq!(Value::decode(&object).expect("decode"), value);
}

fn cyclic_decode(bridge: &Bridge) {
    // A self-referential list is a legal dynamic value; decoding it must
    // fail as a value, not blow the stack.
    let cyc = bridge
        .compile_module("cyc", "def make():\n    l = []\n    l.append(l)\n    return l\n")
        .expect("compile cyc");
    let looped = cyc.getattr("make").expect("make").call(&[]).expect("make()");
    assert!(looped.is_list());
    assert!(matches!(
        Value::decode(&looped),
        Err(Error::Convert { .. })
    ));
}

fn gateway(bridge: &Bridge, dispatched: &AtomicUsize) {
    let call = bridge.module().getattr("call").expect("call attr");

    // Tuple round-trip: the dispatcher answers the argument tuple itself,
    // and the very same value comes back out.
    let inner: Object = Tuple::from_slice(&[int(1), int(2), int(3)])
        .expect("tuple")
        .into();
    let result = call.call(&[text("echo"), inner.clone()]).expect("echo");
    assert_eq!(result, inner);
    assert_eq!(
        Value::decode(&result).expect("decode"),
        Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    // Malformed request: args must be a tuple. The parse fails before
    // the dispatcher is ever consulted.
    let before = dispatched.load(Ordering::SeqCst);
    let err = call
        .call(&[text("foo"), int(5)])
        .expect_err("non-tuple args must fail");
    match err {
        Error::Python(message) => assert!(message.contains("TypeError"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(dispatched.load(Ordering::SeqCst), before, "no dispatch");

    // Dispatcher failure surfaces to the caller unmodified.
    let err = call
        .call(&[text("boom"), empty_tuple()])
        .expect_err("boom must fail");
    match err {
        Error::Python(message) => assert!(message.contains("kaboom from the host"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

fn interpreter_side_call(bridge: &Bridge) {
    // The gateway as interpreter code sees it.
    let shim = bridge
        .compile_module(
            "shim",
            "import _pybridge\n\ndef ping():\n    return _pybridge.call(\"echo\", (40, 2))\n",
        )
        .expect("compile shim");
    let result = shim.getattr("ping").expect("ping").call(&[]).expect("ping()");
    assert_eq!(
        Value::decode(&result).expect("decode"),
        Value::Tuple(vec![Value::Int(40), Value::Int(2)])
    );
    assert!(
        bridge.import_module("no_such_module_anywhere").is_err(),
        "failed import must surface"
    );
}

fn failed_init_hook_rolls_back() {
    let cleanup_runs = Rc::new(Cell::new(0));
    let err = {
        let cleanup_runs = Rc::clone(&cleanup_runs);
        Bridge::builder()
            .on_init(|| Err(Error::Python("shim load failed".into())))
            .on_finalize(move || {
                cleanup_runs.set(cleanup_runs.get() + 1);
                Ok(())
            })
            .initialize()
            .expect_err("failing init hook must abort initialization")
    };
    match err {
        Error::Hooks(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(&failures[0], Error::Python(message) if message == "shim load failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Rollback ran the finalize hooks and released the process slot;
    // the successful re-initialize that follows proves the latter.
    assert_eq!(cleanup_runs.get(), 1);
}

fn hooks_and_registry_after_reinit() {
    let init_runs = Rc::new(Cell::new(0));
    let finalize_runs = Rc::new(Cell::new(0));

    let bridge = {
        let init_runs = Rc::clone(&init_runs);
        let finalize_runs = Rc::clone(&finalize_runs);
        Bridge::builder()
            .on_init(move || {
                init_runs.set(init_runs.get() + 1);
                Ok(())
            })
            .on_finalize(move || {
                finalize_runs.set(finalize_runs.get() + 1);
                Ok(())
            })
            .initialize()
            .expect("re-initialize")
    };
    assert_eq!(init_runs.get(), 1);

    let mut registry = CallbackRegistry::new();
    registry.register("version", |_args| Ok(Str::new("1.0")?.into()));
    registry.install();

    {
        let call = bridge.module().getattr("call").expect("call attr");
        let result = call
            .call(&[text("version"), empty_tuple()])
            .expect("version");
        assert_eq!(result.to_str().expect("to_str"), "1.0");

        // Unknown names answer None at the registry layer.
        let result = call.call(&[text("nope"), empty_tuple()]).expect("nope");
        assert_eq!(result, Object::none());
    }

    // Dropping the token finalizes too; an explicit finalize beforehand
    // would make the drop a no-op, which the hook counter proves.
    drop(bridge);
    assert_eq!(finalize_runs.get(), 1);
}
