use serde::Serialize;
use serde_bert::{to_value, to_vec, Value};
use serde_derive::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

type Test = Result<(), Box<dyn std::error::Error>>;

const MAGIC: &[u8] = &[131];
const SMALL_INT: &[u8] = &[97];
const INT: &[u8] = &[98];
const FLOAT: &[u8] = &[99];
const SMALL_TUPLE: &[u8] = &[104];
const LARGE_TUPLE: &[u8] = &[105];
const NIL: &[u8] = &[106];
const LIST: &[u8] = &[108];
const BIN: &[u8] = &[109];
const SMALL_BIGNUM: &[u8] = &[110];

fn test_known<T>(rust: &T, bert: &[u8]) -> Test
where
    T: Serialize + ?Sized,
{
    eprintln!("Serialization");
    let serialized = to_vec(rust)?;
    assert_eq!(&serialized[..], bert, "serialization matches");
    eprintln!("=> OK");

    // Going through `Value` must not change a single byte.
    eprintln!("Value serialization");
    let value = to_value(rust)?;
    assert_eq!(&to_vec(&value)?[..], bert, "value serialization matches");
    eprintln!("=> OK");

    Ok(())
}

macro_rules! serialize_test {
    ($name:ident : $rust:expr => [$($out:expr),* $(,)*]) => {
        #[test]
        fn $name() -> Test {
            let input = $rust;

            // Every stream starts with the version byte.
            let mut expected = MAGIC.to_vec();
            $(
                expected.extend(&$out[..]);
            )*

            test_known(&input, &expected)
        }
    };
}

fn atom(name: &str) -> Vec<u8> {
    let mut out = vec![100, name.len() as u8];
    out.extend(name.as_bytes());
    out
}

fn be32(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}

#[derive(Serialize)]
struct Meters(u32);

#[derive(Serialize)]
struct Marker;

serialize_test!(none: None::<u8> => [
    [104, 2, 100, 4], b"bert", [100, 3], b"nil",
]);

serialize_test!(unit: () => [
    SMALL_TUPLE, [2], atom("bert"), atom("nil"),
]);

serialize_test!(unit_struct: Marker => [
    SMALL_TUPLE, [2], atom("bert"), atom("nil"),
]);

serialize_test!(some_is_transparent: Some(7u8) => [SMALL_INT, [7]]);

serialize_test!(newtype_is_transparent: Meters(1000) => [INT, be32(1000)]);

serialize_test!(true_value: true => [
    [104, 2, 100, 4], b"bert", [100, 4], b"true",
]);

serialize_test!(false_value: false => [
    [104, 2, 100, 4], b"bert", [100, 5], b"false",
]);

serialize_test!(float_f64: 1.2e3_f64 => [FLOAT, b"1.20000000000000000000e+03"]);

serialize_test!(float_f32: 1.2e3_f32 => [FLOAT, b"1.20000000000000000000e+03"]);

serialize_test!(float_negative_fraction: -0.5_f64 => [FLOAT, b"-5.00000000000000000000e-01"]);

serialize_test!(binary_empty: Value::Binary(vec![]) => [BIN, be32(0)]);

serialize_test!(binary_short: Value::Binary(vec![1, 2, 3]) => [BIN, be32(3), [1, 2, 3]]);

serialize_test!(binary_64k: Value::Binary(vec![0xab; 65536]) => [
    BIN, be32(65536), vec![0xabu8; 65536],
]);

serialize_test!(text: "abc" => [BIN, be32(3), b"abc"]);

serialize_test!(text_utf8: String::from("né") => [BIN, be32(3), "né".as_bytes()]);

serialize_test!(char_as_text: 'é' => [BIN, be32(2), "é".as_bytes()]);

serialize_test!(list_empty: Vec::<u8>::new() => [LIST, be32(0), NIL]);

serialize_test!(list_one: vec![1u8] => [LIST, be32(1), SMALL_INT, [1], NIL]);

// Without a `serde_bytes` wrapper, a byte vector is a sequence.
serialize_test!(list_two: vec![1u8, 2] => [
    LIST, be32(2), SMALL_INT, [1], SMALL_INT, [2], NIL,
]);

serialize_test!(list_nested: vec![vec![], vec![true]] => [
    LIST, be32(2),
    LIST, be32(0), NIL,
    LIST, be32(1), SMALL_TUPLE, [2], atom("bert"), atom("true"), NIL,
    NIL,
]);

serialize_test!(tuple: (1u8, "a", None::<u8>) => [
    SMALL_TUPLE, [3],
    SMALL_INT, [1],
    BIN, be32(1), b"a",
    SMALL_TUPLE, [2], atom("bert"), atom("nil"),
]);

serialize_test!(tuple_empty: Value::Tuple(vec![]) => [SMALL_TUPLE, [0]]);

serialize_test!(tuple_255: Value::Tuple(vec![Value::U8(0); 255]) => [
    SMALL_TUPLE, [255], [97u8, 0].repeat(255),
]);

serialize_test!(tuple_256: Value::Tuple(vec![Value::U8(0); 256]) => [
    LARGE_TUPLE, be32(256), [97u8, 0].repeat(256),
]);

serialize_test!(dict_single: {
    let mut map = BTreeMap::new();
    map.insert(1u8, 2u8);
    map
} => [
    SMALL_TUPLE, [3], atom("bert"), atom("dict"),
    LIST, be32(1),
    SMALL_TUPLE, [2], SMALL_INT, [1], SMALL_INT, [2],
    NIL,
]);

serialize_test!(dict_empty: BTreeMap::<u8, u8>::new() => [
    SMALL_TUPLE, [3], atom("bert"), atom("dict"), LIST, be32(0), NIL,
]);

serialize_test!(dict_keeps_iteration_order: json!({"b": 1, "a": null}) => [
    SMALL_TUPLE, [3], atom("bert"), atom("dict"),
    LIST, be32(2),
    SMALL_TUPLE, [2], BIN, be32(1), b"b", SMALL_BIGNUM, [8, 0], 1u64.to_be_bytes(),
    SMALL_TUPLE, [2], BIN, be32(1), b"a", SMALL_TUPLE, [2], atom("bert"), atom("nil"),
    NIL,
]);

serialize_test!(dict_nested_value: {
    let mut map = BTreeMap::new();
    map.insert("xs", vec![-1i32]);
    map
} => [
    SMALL_TUPLE, [3], atom("bert"), atom("dict"),
    LIST, be32(1),
    SMALL_TUPLE, [2], BIN, be32(2), b"xs", LIST, be32(1), INT, [0xff; 4], NIL,
    NIL,
]);

serialize_test!(int_small_max: 255u8 => [SMALL_INT, [255]]);

serialize_test!(int_negative_i8: -1i8 => [INT, [0xff; 4]]);

serialize_test!(int_positive_i8: 5i8 => [INT, [0, 0, 0, 5]]);

serialize_test!(int_small_u16: 5u16 => [INT, [0, 0, 0, 5]]);

serialize_test!(int_u16: 256u16 => [INT, [0, 0, 1, 0]]);

serialize_test!(int_small_u32: 5u32 => [INT, [0, 0, 0, 5]]);

serialize_test!(int_i32_min: i32::MIN => [INT, [0x80, 0, 0, 0]]);

serialize_test!(int_u32_max: u32::MAX => [
    SMALL_BIGNUM, [8, 0], 0xffff_ffff_u64.to_be_bytes(),
]);

serialize_test!(int_small_i64: 5i64 => [SMALL_BIGNUM, [8, 0], [0, 0, 0, 0, 0, 0, 0, 5]]);

serialize_test!(int_small_negative_i64: -1i64 => [SMALL_BIGNUM, [8, 1], 1u64.to_be_bytes()]);

serialize_test!(int_small_u64: 5u64 => [SMALL_BIGNUM, [8, 0], 5u64.to_be_bytes()]);

serialize_test!(int_i64_negative: -5_000_000_000i64 => [
    SMALL_BIGNUM, [8, 1], 5_000_000_000u64.to_be_bytes(),
]);

serialize_test!(int_i64_min: i64::MIN => [
    SMALL_BIGNUM, [8, 1], [0x80, 0, 0, 0, 0, 0, 0, 0],
]);

serialize_test!(int_u64_max: u64::MAX => [SMALL_BIGNUM, [8, 0], [0xff; 8]]);

serialize_test!(int_small_i128: 3i128 => [SMALL_BIGNUM, [16, 0], 3u128.to_be_bytes()]);

serialize_test!(int_wide_negative_i128: -(1i128 << 100) => [
    SMALL_BIGNUM, [16, 1], (1u128 << 100).to_be_bytes(),
]);

serialize_test!(int_u128: 1u128 << 63 => [SMALL_BIGNUM, [16, 0], (1u128 << 63).to_be_bytes()]);

serialize_test!(bytes_wrapper: serde_bytes::Bytes::new(b"abc") => [BIN, be32(3), b"abc"]);

serialize_test!(byte_buf_wrapper: serde_bytes::ByteBuf::from(vec![1, 2]) => [
    BIN, be32(2), [1, 2],
]);

#[test]
fn starts_with_magic() -> Test {
    let samples = vec![
        Value::Nil,
        Value::Bool(true),
        Value::I64(-1),
        Value::F64(0.0),
        Value::Text(String::new()),
        Value::List(vec![]),
        Value::Tuple(vec![]),
        Value::Dict(vec![]),
    ];
    for sample in &samples {
        assert_eq!(to_vec(sample)?[0], 131, "{:?}", sample);
    }
    Ok(())
}
