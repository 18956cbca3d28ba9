#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: every u64 survives encode_uvarint -> decode_uvarint with
// the same length on both sides. The value is the first 8 input bytes.
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let value = u64::from_le_bytes(data[..8].try_into().unwrap());

    let (buf, encoded_len) = chnative_wire::varint::encode_uvarint(value);

    let (decoded, decoded_len) =
        chnative_wire::varint::decode_uvarint(&buf[..encoded_len]).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoded_len, encoded_len);
});
