use libiot_httpd::network::application::http::server::buffer::Span;
use libiot_httpd::network::application::http::server::headers::HeaderTable;
use libiot_httpd::network::application::http::server::params::ParamTable;
use libiot_httpd::network::application::http::server::request::RequestLine;
use libiot_httpd::network::application::http::server::url::decode_in_place;
use libiot_httpd::network::application::http::{Error, Method};

fn decode(input: &[u8]) -> Vec<u8> {
    let mut bytes = input.to_vec();
    let len = decode_in_place(&mut bytes);
    bytes.truncate(len);
    bytes
}

#[test]
fn test_url_decode() {
    assert_eq!(decode(b"plain"), b"plain");
    assert_eq!(decode(b"a+b%20c"), b"a b c");
    assert_eq!(decode(b"%7e%7E%41"), b"~~A");
    assert_eq!(decode(b"%00x"), b"\0x");
    assert_eq!(decode(b""), b"");
}

#[test]
fn test_url_decode_stops_at_bad_escape() {
    assert_eq!(decode(b"ab%2"), b"ab");
    assert_eq!(decode(b"ab%zz12"), b"ab");
    assert_eq!(decode(b"%"), b"");
}

const HEAD: &[u8] = b"GET http://dev:80/x HTTP/1.1\r\nHost: dev\r\nX-Empty:\r\nbare-line\r\nhost: second\r\nX-Pad:   padded\r\n\r\nbody";

#[test]
fn test_header_count() {
    assert_eq!(HeaderTable::count(HEAD), 6);
    assert_eq!(HeaderTable::count(b""), 0);
    assert_eq!(HeaderTable::count(b"GET / HTTP/1.1\r\n"), 1);
}

#[test]
fn test_header_tokenize() {
    let mut table = HeaderTable::new();
    let body = table.tokenize(HEAD).unwrap();

    assert_eq!(&HEAD[body..], b"body");
    assert_eq!(table.total(), 6);
    // the request line is kept whole despite its colons
    assert_eq!(table.key(HEAD, 0), Some(&b"GET http://dev:80/x HTTP/1.1"[..]));
    assert_eq!(table.entry_at(0).unwrap().value, None);

    assert_eq!(table.value(HEAD, "HOST"), Some(&b"dev"[..]));
    assert_eq!(table.value_at(HEAD, 4), Some(&b"second"[..]));
    assert_eq!(table.value(HEAD, "x-empty"), Some(&b""[..]));
    assert_eq!(table.value(HEAD, "X-Pad"), Some(&b"padded"[..]));
    assert_eq!(table.key(HEAD, 3), Some(&b"bare-line"[..]));
    assert_eq!(table.value_at(HEAD, 3), None);
    assert!(table.has(HEAD, "Bare-Line"));
    assert!(!table.has(HEAD, "Accept"));
}

#[test]
fn test_header_lookup_skips_request_line() {
    let head = b"Host\r\nHost: real\r\n\r\n";
    let mut table = HeaderTable::new();
    table.tokenize(head).unwrap();

    assert_eq!(table.value(head, "Host"), Some(&b"real"[..]));
}

#[test]
fn test_header_tokenize_resets() {
    let mut table = HeaderTable::new();
    table.tokenize(HEAD).unwrap();
    table.tokenize(b"GET / HTTP/1.0\r\n\r\n").unwrap();
    assert_eq!(table.total(), 1);
}

#[test]
fn test_param_count() {
    assert_eq!(ParamTable::count(b""), 0);
    assert_eq!(ParamTable::count(b"a"), 1);
    assert_eq!(ParamTable::count(b"a=1&b=2"), 2);
    assert_eq!(ParamTable::count(b"a&&b&"), 4);
}

#[test]
fn test_param_tokenize_decodes_in_place() {
    let mut buffer = b"xx?first+name=J%C3%B6rg&flag&empty=&eq=a=b".to_vec();
    let segment = Span::between(3, buffer.len());
    let mut table = ParamTable::new();

    let end = table.tokenize(&mut buffer, segment, true).unwrap();
    assert_eq!(end, buffer.len());
    assert_eq!(table.total(), 4);

    assert_eq!(table.key(&buffer, 0), Some(&b"first name"[..]));
    assert_eq!(table.value(&buffer, b"first name"), Some("Jörg".as_bytes()));
    assert!(table.has(&buffer, b"flag"));
    assert_eq!(table.value(&buffer, b"flag"), None);
    assert_eq!(table.value(&buffer, b"empty"), Some(&b""[..]));
    assert_eq!(table.value(&buffer, b"eq"), Some(&b"a=b"[..]));
    // keys are case-sensitive
    assert!(!table.has(&buffer, b"FLAG"));
}

#[test]
fn test_param_tokenize_appends_without_reset() {
    let mut buffer = b"a=1&b=2|b=3&c=4".to_vec();
    let mut table = ParamTable::new();

    table.tokenize(&mut buffer, Span::new(0, 7), true).unwrap();
    table.tokenize(&mut buffer, Span::new(8, 7), false).unwrap();

    assert_eq!(table.total(), 4);
    assert_eq!(table.value(&buffer, b"b"), Some(&b"2"[..]));
    assert_eq!(table.value_at(&buffer, 2), Some(&b"3"[..]));
    assert_eq!(table.key(&buffer, 3), Some(&b"c"[..]));

    table.tokenize(&mut buffer, Span::new(0, 0), true).unwrap();
    assert_eq!(table.total(), 0);
}

#[test]
fn test_param_set_and_append() {
    let buffer = b"keyvalue";
    let mut table = ParamTable::new();

    table
        .append(Span::new(0, 3), Some(Span::new(3, 5)))
        .unwrap();
    assert_eq!(table.value(buffer, b"key"), Some(&b"value"[..]));

    table.set(0, Span::new(3, 5), None).unwrap();
    assert!(table.has(buffer, b"value"));
    table.set(1, Span::new(0, 3), None).unwrap();
    assert_eq!(table.total(), 2);
    assert_eq!(table.set(5, Span::new(0, 3), None), Err(Error::MalformedRequest));
}

fn parse_line(line: &[u8]) -> Result<RequestLine, Error> {
    RequestLine::parse(line, Span::new(0, line.len()))
}

#[test]
fn test_request_line_split() {
    let line = b"POST /api/v1?x=1?y HTTP/1.1";
    let parsed = parse_line(line).unwrap();

    assert_eq!(parsed.method(), Method::Post);
    let query = parsed.query().unwrap();
    assert_eq!(query.get(line), Some(&b"x=1?y"[..]));
}

#[test]
fn test_request_line_rejects_bad_shapes() {
    assert_eq!(parse_line(b"GET /a b HTTP/1.1"), Err(Error::MalformedRequest));
    assert_eq!(parse_line(b"GET /"), Err(Error::MalformedRequest));
    assert_eq!(parse_line(b"GET / "), Err(Error::MalformedRequest));
    assert_eq!(parse_line(b" / HTTP/1.1"), Err(Error::MalformedRequest));
    assert_eq!(parse_line(b""), Err(Error::MalformedRequest));
    assert_eq!(parse_line(b"GET /\xff HTTP/1.1"), Err(Error::MalformedRequest));
}

#[test]
fn test_method_tokens() {
    assert_eq!(Method::from_token(b"DELETE"), Method::Delete);
    assert_eq!(Method::from_token(b"OPTIONS"), Method::Options);
    assert_eq!(Method::from_token(b"get"), Method::Any);
    assert_eq!(Method::from_token(b"BREW"), Method::Any);
    assert!(Method::Any.accepts(Method::Patch));
    assert!(!Method::Put.accepts(Method::Patch));
}
