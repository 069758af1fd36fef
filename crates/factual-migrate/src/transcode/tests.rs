use super::*;
use proptest::prelude::*;
use serde_json::json;
use serde_pickle::SerOptions;
use std::collections::{BTreeMap, BTreeSet};

fn pickle(value: &Value) -> Vec<u8> {
    serde_pickle::value_to_vec(value, SerOptions::new()).unwrap()
}

#[test]
fn test_empty_list_protocol_3() {
    // pickle.dumps([], protocol=3)
    let json = decode_legacy(b"\x80\x03]q\x00.").unwrap();
    assert_eq!(json, json!([]));
    assert_eq!(json.to_string(), "[]");
}

#[test]
fn test_empty_dict_protocol_3() {
    assert_eq!(decode_legacy(b"\x80\x03}q\x00.").unwrap(), json!({}));
}

#[test]
fn test_dict_protocol_3() {
    // pickle.dumps({'url': 'x', 'width': 120}, protocol=3)
    let bytes = b"\x80\x03}q\x00(X\x03\x00\x00\x00urlq\x01X\x01\x00\x00\x00xq\x02\
                  X\x05\x00\x00\x00widthq\x03Kxu.";
    assert_eq!(
        decode_legacy(bytes).unwrap(),
        json!({"url": "x", "width": 120})
    );
}

#[test]
fn test_list_protocol_0() {
    assert_eq!(decode_legacy(b"(lp0\nI1\naI2\na.").unwrap(), json!([1, 2]));
}

#[test]
fn test_python2_byte_strings_become_strings() {
    // Python 2: pickle.dumps({'url': 'x'}, 2)
    let bytes = b"\x80\x02}q\x00U\x03urlq\x01U\x01xq\x02s.";
    assert_eq!(decode_legacy(bytes).unwrap(), json!({"url": "x"}));
}

#[test]
fn test_scalars() {
    // pickle.dumps([True, None, 1.5], protocol=2)
    let bytes = b"\x80\x02]q\x00(\x88NG?\xf8\x00\x00\x00\x00\x00\x00e.";
    assert_eq!(decode_legacy(bytes).unwrap(), json!([true, null, 1.5]));
}

#[test]
fn test_tuple_becomes_array() {
    // pickle.dumps((1, 'a'), protocol=2)
    let bytes = b"\x80\x02K\x01X\x01\x00\x00\x00a\x86q\x00.";
    assert_eq!(decode_legacy(bytes).unwrap(), json!([1, "a"]));
}

#[test]
fn test_scalar_keys_are_stringified() {
    // pickle.dumps({1: 'a'}, protocol=2)
    let bytes = b"\x80\x02}q\x00K\x01X\x01\x00\x00\x00as.";
    assert_eq!(decode_legacy(bytes).unwrap(), json!({"1": "a"}));

    // True == 1 == 1.0 as dict keys, so none of these may share a dict
    let mut entries = BTreeMap::new();
    entries.insert(HashableValue::Bool(true), Value::I64(1));
    entries.insert(HashableValue::None, Value::I64(2));
    entries.insert(HashableValue::F64(1.5), Value::I64(3));
    let json = decode_legacy(&pickle(&Value::Dict(entries))).unwrap();
    assert_eq!(json, json!({"true": 1, "null": 2, "1.5": 3}));
}

fn float_keyed(key: f64) -> Json {
    let entries = BTreeMap::from([(HashableValue::F64(key), Value::I64(1))]);
    decode_legacy(&pickle(&Value::Dict(entries))).unwrap()
}

#[test]
fn test_float_keys_match_python_repr() {
    assert_eq!(float_keyed(1.0), json!({"1.0": 1}));
    assert_eq!(float_keyed(-0.25), json!({"-0.25": 1}));
    assert_eq!(float_keyed(0.0001), json!({"0.0001": 1}));
    assert_eq!(float_keyed(1e15), json!({"1000000000000000.0": 1}));
    assert_eq!(float_keyed(1e16), json!({"1e+16": 1}));
    assert_eq!(float_keyed(1.5e300), json!({"1.5e+300": 1}));
    assert_eq!(float_keyed(1e-7), json!({"1e-07": 1}));
    assert_eq!(float_keyed(-2.5e-5), json!({"-2.5e-05": 1}));
}

#[test]
fn test_nested_thumbnails() {
    let thumbnail = |url: &str, width: i64| {
        let mut entries = BTreeMap::new();
        entries.insert(
            HashableValue::String("url".into()),
            Value::String(url.into()),
        );
        entries.insert(HashableValue::String("width".into()), Value::I64(width));
        Value::Dict(entries)
    };
    let value = Value::List(vec![
        thumbnail("https://i.ytimg.com/vi/abc/default.jpg", 120),
        thumbnail("https://i.ytimg.com/vi/abc/hqdefault.jpg", 480),
    ]);
    assert_eq!(
        decode_legacy(&pickle(&value)).unwrap(),
        json!([
            {"url": "https://i.ytimg.com/vi/abc/default.jpg", "width": 120},
            {"url": "https://i.ytimg.com/vi/abc/hqdefault.jpg", "width": 480},
        ])
    );
}

#[test]
fn test_large_integers() {
    // 2**63 fits in u64
    let bytes = b"\x80\x02\x8a\x09\x00\x00\x00\x00\x00\x00\x00\x80\x00.";
    assert_eq!(
        decode_legacy(bytes).unwrap(),
        json!(9_223_372_036_854_775_808u64)
    );

    // 2**70 and -(2**70) keep every digit
    let bytes = b"\x80\x02\x8a\x09\x00\x00\x00\x00\x00\x00\x00\x00\x40.";
    let json = decode_legacy(bytes).unwrap();
    assert_eq!(json.to_string(), "1180591620717411303424");

    let bytes = b"\x80\x02]q\x00\x8a\x09\x00\x00\x00\x00\x00\x00\x00\x00\xc0a.";
    let json = decode_legacy(bytes).unwrap();
    assert_eq!(json.to_string(), "[-1180591620717411303424]");
}

#[test]
fn test_rejects_values_without_json_form() {
    assert!(matches!(
        decode_legacy(&pickle(&Value::F64(f64::NAN))),
        Err(TranscodeError::NonFiniteFloat)
    ));
    assert!(matches!(
        decode_legacy(b"\x80\x03C\x02hi."),
        Err(TranscodeError::Unsupported { kind: "bytes" })
    ));

    let set: BTreeSet<_> = [HashableValue::I64(1)].into_iter().collect();
    assert!(matches!(
        decode_legacy(&pickle(&Value::Set(set))),
        Err(TranscodeError::Unsupported { kind: "set" })
    ));

    let mut entries = BTreeMap::new();
    entries.insert(
        HashableValue::Tuple(vec![HashableValue::I64(1), HashableValue::I64(2)]),
        Value::None,
    );
    assert!(matches!(
        decode_legacy(&pickle(&Value::Dict(entries))),
        Err(TranscodeError::UnsupportedKey { kind: "tuple" })
    ));
}

#[test]
fn test_garbage_is_an_error() {
    assert!(matches!(
        decode_legacy(b"not a pickle"),
        Err(TranscodeError::Unpickle(_))
    ));
    assert!(decode_legacy(b"").is_err());
}

fn plain_data() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::I64),
        (-4_000_000i64..4_000_000).prop_map(|n| Value::F64(n as f64 / 4.0)),
        "[a-zA-Z0-9 :/._-]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Tuple),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6).prop_map(|entries| {
                Value::Dict(
                    entries
                        .into_iter()
                        .map(|(k, v)| (HashableValue::String(k), v))
                        .collect(),
                )
            }),
        ]
    })
}

/// Same shape as the pickled value: sequences keep order, mappings keep
/// keys, scalars keep their value.
fn same_shape(value: &Value, json: &Json) -> bool {
    match (value, json) {
        (Value::None, Json::Null) => true,
        (Value::Bool(a), Json::Bool(b)) => a == b,
        (Value::I64(a), Json::Number(b)) => b.as_i64() == Some(*a),
        (Value::F64(a), Json::Number(b)) => b.as_f64() == Some(*a),
        (Value::String(a), Json::String(b)) => a == b,
        (Value::List(items) | Value::Tuple(items), Json::Array(array)) => {
            items.len() == array.len() && items.iter().zip(array).all(|(v, j)| same_shape(v, j))
        }
        (Value::Dict(entries), Json::Object(map)) => {
            entries.len() == map.len()
                && entries.iter().all(|(k, v)| match k {
                    HashableValue::String(k) => map.get(k).is_some_and(|j| same_shape(v, j)),
                    _ => false,
                })
        }
        _ => false,
    }
}

proptest! {
    #[test]
    fn prop_transcoding_is_lossless(value in plain_data()) {
        let decoded = decode_legacy(&pickle(&value)).unwrap();
        prop_assert!(same_shape(&value, &decoded), "{value:?} became {decoded}");

        let reparsed: Json = serde_json::from_str(&decoded.to_string()).unwrap();
        prop_assert_eq!(reparsed, decoded);
    }
}
