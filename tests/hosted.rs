#![cfg(feature = "std")]

use libiot_httpd::network::application::http::{Method, Outcome, Server};
use libiot_httpd::network::hosted::{StdHost, TcpClient};
use libiot_httpd::network::prelude::*;
use std::io::{Read as _, Write as _};
use std::net::{TcpListener, TcpStream};
use std::thread;

fn shut<C: Connection>(connection: C) {
    connection.close().unwrap();
}

#[test]
fn test_serve_loopback_client() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(address).unwrap();
        stream
            .write_all(b"POST /wifi?ssid=lab HTTP/1.1\r\nHost: device\r\n")
            .unwrap();
        stream
            .write_all(b"Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 12\r\n\r\npass=hunter2")
            .unwrap();
        stream
    });

    let (socket, _) = listener.accept().unwrap();
    let mut stream = TcpClient::new(socket).unwrap();
    let mut server = Server::new(StdHost::new());
    server.on("/wifi", Method::Post, |request| {
        request.arg("ssid") == Some("lab") && request.arg("pass") == Some("hunter2")
    });

    assert_eq!(server.handle_client(&mut stream), Outcome::Handled);
    shut(stream);

    let mut peer = client.join().unwrap();
    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
}
