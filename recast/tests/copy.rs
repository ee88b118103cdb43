use insta::assert_snapshot;
use recast::{
    CastErrorKind, CopyOptions, Opaque, Ptr, Value, copy_of, deep_copy, deep_copy_with, record,
    value,
};
use recast_testhelpers::test;

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Account {
        pub owner: String,
        pub balances: Vec<i64>,
        #[cast(private)]
        pub pin: u32,
    }
}

fn next_of(node: &Ptr) -> Value {
    node.with(|v| {
        v.as_map()
            .and_then(|m| m.get(&Value::from("next")))
            .cloned()
            .unwrap_or_default()
    })
}

fn linked_pair() -> (Ptr, Ptr) {
    let a = Ptr::new(Value::Null);
    let b = Ptr::new(Value::Null);
    a.set(value!({"name": "a", "next": (Value::Pointer(b.clone()))}));
    b.set(value!({"name": "b", "next": (Value::Pointer(a.clone()))}));
    (a, b)
}

#[test]
fn cycles_are_relinked_in_the_copy() {
    let (a, b) = linked_pair();
    let copy = deep_copy(&Value::Pointer(a.clone())).unwrap();

    let Value::Pointer(a2) = copy else {
        panic!("expected a pointer")
    };
    assert!(!a2.ptr_eq(&a));

    let Value::Pointer(b2) = next_of(&a2) else {
        panic!("a'.next should be a pointer")
    };
    assert!(!b2.ptr_eq(&b));

    let Value::Pointer(back) = next_of(&b2) else {
        panic!("b'.next should be a pointer")
    };
    assert!(back.ptr_eq(&a2));
}

#[test]
fn ignoring_circular_refs_cuts_revisits() {
    let (a, _b) = linked_pair();
    let options = CopyOptions::new().ignore_circular_refs(true);
    let Value::Pointer(a2) = deep_copy_with(&Value::Pointer(a), &options).unwrap() else {
        panic!("expected a pointer")
    };
    let Value::Pointer(b2) = next_of(&a2) else {
        panic!("a'.next should be a pointer")
    };
    assert_eq!(next_of(&b2), Value::Null);
}

#[test]
fn mutating_the_copy_leaves_the_source_alone() {
    let inner = Ptr::new(value!([1, 2]));
    let src = value!({"list": (Value::Pointer(inner.clone()))});
    let copy = deep_copy(&src).unwrap();
    let list = copy.as_map().and_then(|m| m.get(&Value::from("list")));
    let Some(Value::Pointer(copied)) = list else {
        panic!("expected a pointer under list")
    };
    copied.set(value!([]));
    assert_eq!(inner.get(), value!([1, 2]));
}

#[test]
fn functions_and_channels_are_refused() {
    let err = deep_copy(&value!({"handler": (Opaque::func("Handler", ()))})).unwrap_err();
    assert!(err.is(CastErrorKind::UnsupportedType));
    assert_snapshot!(err.to_string(), @r#"at ["handler"]: unsupported type: func Handler"#);

    let err = deep_copy(&value!([null, (Opaque::chan("Events", 0u8))])).unwrap_err();
    assert_snapshot!(err.to_string(), @"at [1]: unsupported type: chan Events");
}

#[test]
fn bounded_copy_zeroes_below_the_limit() {
    let src = value!({"a": {"b": {"c": 1}}, "n": 5});
    let copy = deep_copy_with(&src, &CopyOptions::new().max_depth(2)).unwrap();
    assert_eq!(copy, value!({"a": {"b": {}}, "n": 5}));
}

#[test]
fn unexported_fields_are_zeroed_unless_requested() {
    let account = Account {
        owner: "ada".into(),
        balances: vec![10, -4],
        pin: 1234,
    };

    let copy = copy_of(&account).unwrap();
    assert_eq!(copy.owner, "ada");
    assert_eq!(copy.balances, [10, -4]);
    assert_eq!(copy.pin, 0);

    let options = CopyOptions::new().ignore_unexported_fields(false);
    let full = deep_copy_with(&recast::Reflect::to_value(&account), &options).unwrap();
    let full: Account = recast::Reflect::from_value(full).unwrap();
    assert_eq!(full, account);
}
