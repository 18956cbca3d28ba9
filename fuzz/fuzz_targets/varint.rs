#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: uvarint decoding, slice vs. stream.
//
// The two decoders must agree on every input: same value, same number
// of bytes consumed, and both fail where one fails.
fuzz_target!(|data: &[u8]| {
    let from_slice = chnative_wire::varint::decode_uvarint(data);
    let mut cursor = std::io::Cursor::new(data);
    let from_stream = chnative_wire::varint::read_uvarint(&mut cursor);

    match (from_slice, from_stream) {
        (Ok((a, len)), Ok(b)) => {
            assert_eq!(a, b);
            assert_eq!(len as u64, cursor.position());
        }
        (Err(_), Err(_)) => {}
        (a, b) => panic!("decoders disagree: {a:?} vs {b:?}"),
    }
});
