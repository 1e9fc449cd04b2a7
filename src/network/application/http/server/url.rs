//! In-place URL decoding for query strings and form bodies.

/// Decode `bytes` in place and return the decoded length.
///
/// `%XX` becomes the byte with hex value `XX` and `+` becomes a space; every
/// other byte passes through. A `%` that is not followed by two hex digits
/// ends decoding right there, so `a%2` decodes to `a`.
///
/// The decoded form is never longer than the input, so it is written over
/// the front of the same slice. Decoding is destructive: run it at most once
/// per byte range, a second pass would decode `%2541` into `A` instead of
/// `%41`.
///
/// ```rust
/// use libiot_httpd::network::application::http::server::url::decode_in_place;
///
/// let mut bytes = *b"%61%62%63+d";
/// let len = decode_in_place(&mut bytes);
/// assert_eq!(&bytes[..len], b"abc d");
/// ```
pub fn decode_in_place(bytes: &mut [u8]) -> usize {
    let mut src = 0;
    let mut dst = 0;

    while src < bytes.len() {
        let decoded = match bytes[src] {
            b'%' => {
                let pair = bytes
                    .get(src + 1)
                    .and_then(|hi| hex_value(*hi))
                    .zip(bytes.get(src + 2).and_then(|lo| hex_value(*lo)));
                match pair {
                    Some((hi, lo)) => {
                        src += 2;
                        (hi << 4) | lo
                    }
                    None => break,
                }
            }
            b'+' => b' ',
            other => other,
        };

        bytes[dst] = decoded;
        src += 1;
        dst += 1;
    }

    dst
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}
