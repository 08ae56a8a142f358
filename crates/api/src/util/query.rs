use alloc::{string::String, vec::Vec};

/// Decodes `%XX` escapes. With `form` set, `+` also decodes to a space as in
/// query strings. Returns `None` on broken escapes or invalid UTF-8.
pub fn decode(input: &str, form: bool) -> Option<String> {
    let mut bytes = input.bytes();
    let mut decoded = Vec::with_capacity(input.len());
    while let Some(byte) = bytes.next() {
        match byte {
            b'%' => {
                let pair = [bytes.next()?, bytes.next()?];
                let mut byte = [0u8; 1];
                hex::decode_to_slice(pair, &mut byte).ok()?;
                decoded.push(byte[0]);
            }
            b'+' if form => decoded.push(b' '),
            other => decoded.push(other),
        }
    }
    String::from_utf8(decoded).ok()
}

/// Finds the raw (still encoded) value of `key` in a query string.
pub fn find<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query.split('&').filter_map(|chunk| chunk.split_once('=')).find_map(|(name, value)| (name == key).then_some(value))
}

/// Finds and decodes the value of `key` in a query string.
pub fn get(query: &str, key: &str) -> Option<String> {
    decode(find(query, key)?, true)
}
