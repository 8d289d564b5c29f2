use durocache_storage::codec::{decode, encode};
use durocache_storage::{CodecError, PendingIntent};
use durocache_types::Profile;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO)
            .prop_map(|f| json!(f)),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_profile() -> impl Strategy<Value = Profile> {
    ("[a-zA-Z0-9_-]{1,24}", arb_json(), any::<i64>())
        .prop_map(|(id, data, last_updated)| Profile::new(id, data, last_updated))
}

proptest! {
    #[test]
    fn profiles_survive_encode_decode(profile in arb_profile()) {
        let bytes = encode(&profile).unwrap();
        let decoded: Profile = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, profile);
    }
}

#[test]
fn floats_decode_to_the_same_bits() {
    for f in [2021092610070.9697_f64, 0.1, -1.0e-300, f64::MAX, f64::MIN_POSITIVE] {
        let profile = Profile::new("u1", json!({ "score": f }), 1);
        let decoded: Profile = decode(&encode(&profile).unwrap()).unwrap();
        assert_eq!(decoded.data["score"].as_f64().map(f64::to_bits), Some(f.to_bits()));
        assert_eq!(decoded, profile);
    }
}

#[test]
fn pending_intent_survives_encode_decode() {
    let intent = PendingIntent {
        enqueued_at: 1_700_000_000_123,
        profile: Profile::new("u1", json!({ "name": "A", "tags": ["x", "y"] }), 99),
    };
    let decoded: PendingIntent = decode(&encode(&intent).unwrap()).unwrap();
    assert_eq!(decoded, intent);
}

#[test]
fn encoded_output_is_compressed() {
    let profile = Profile::new("u1", json!({ "bio": "a".repeat(4096) }), 1);
    let bytes = encode(&profile).unwrap();
    assert!(bytes.len() < 1024, "expected compression, got {} bytes", bytes.len());
    // gzip magic
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
}

#[test]
fn decode_rejects_uncompressed_bytes() {
    let raw = serde_json::to_vec(&Profile::stub("u1", 1)).unwrap();
    let err = decode::<Profile>(&raw).unwrap_err();
    assert!(matches!(err, CodecError::Decompress(_)));
}

#[test]
fn decode_rejects_wrong_shape() {
    let bytes = encode(&json!({ "unexpected": true })).unwrap();
    let err = decode::<Profile>(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::Malformed(_)));
}

#[test]
fn decode_rejects_truncated_stream() {
    let bytes = encode(&Profile::stub("u1", 1)).unwrap();
    assert!(decode::<Profile>(&bytes[..bytes.len() / 2]).is_err());
}
