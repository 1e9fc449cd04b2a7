//! Mock client stream and host for driving the server in tests

#![allow(dead_code)]

use libiot_httpd::network::{Host, Read, Stream, Write};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Closed,
}

/// Client stream that delivers a scripted sequence of chunks.
///
/// Each chunk becomes readable only after one poll of `available` has
/// reported nothing, so the engine has to wait and yield between chunks the
/// way it does with a real client.
#[derive(Debug)]
pub struct MockStream {
    chunks: VecDeque<Vec<u8>>,
    current: Vec<u8>,
    pos: usize,
    waiting: bool,
    keep_open: bool,
    pub written: Vec<u8>,
}

impl MockStream {
    /// The whole request arrives at once, then the client disconnects.
    pub fn new(data: &[u8]) -> Self {
        Self::chunked(&[data])
    }

    pub fn chunked(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|chunk| chunk.to_vec()).collect(),
            current: Vec::new(),
            pos: 0,
            waiting: false,
            keep_open: false,
            written: Vec::new(),
        }
    }

    pub fn byte_at_a_time(data: &[u8]) -> Self {
        let chunks: Vec<&[u8]> = data.chunks(1).collect();
        Self::chunked(&chunks)
    }

    /// Split `data` at random points, reproducibly for a given `seed`.
    pub fn random_chunks(data: &[u8], seed: u64, max_chunk: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chunks = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let len = rng.gen_range(1..=max_chunk).min(rest.len());
            let (chunk, tail) = rest.split_at(len);
            chunks.push(chunk);
            rest = tail;
        }
        Self::chunked(&chunks)
    }

    /// Stay connected after the script runs out, like a stalled client.
    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }

    /// Bytes not read yet.
    pub fn remaining(&self) -> usize {
        self.current.len() - self.pos + self.chunks.iter().map(Vec::len).sum::<usize>()
    }
}

impl Read for MockStream {
    type Error = MockError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let readable = &self.current[self.pos..];
        let len = buf.len().min(readable.len());
        buf[..len].copy_from_slice(&readable[..len]);
        self.pos += len;
        if self.pos == self.current.len() {
            self.waiting = true;
        }
        Ok(len)
    }
}

impl Write for MockStream {
    type Error = MockError;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Stream for MockStream {
    fn available(&mut self) -> usize {
        if self.pos >= self.current.len() {
            if self.waiting {
                self.waiting = false;
                return 0;
            }
            match self.chunks.pop_front() {
                Some(next) => {
                    self.current = next;
                    self.pos = 0;
                }
                None => return 0,
            }
        }
        self.current.len() - self.pos
    }

    fn connected(&mut self) -> bool {
        self.keep_open || self.pos < self.current.len() || !self.chunks.is_empty()
    }
}

/// Host with a fake clock that only moves when the engine yields.
#[derive(Debug, Clone, Copy)]
pub struct MockHost {
    now: u64,
    step: u64,
    pub yields: usize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::with_step(1)
    }

    /// Advance the clock by `step` milliseconds per yield.
    pub fn with_step(step: u64) -> Self {
        Self {
            now: 0,
            step,
            yields: 0,
        }
    }
}

impl Host for MockHost {
    fn millis(&mut self) -> u64 {
        self.now
    }

    fn yield_now(&mut self) {
        self.now += self.step;
        self.yields += 1;
    }
}

/// Build a multipart body from `(name, filename, content)` parts.
pub fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// A complete multipart POST request.
pub fn multipart_request(path: &str, boundary: &str, body: &[u8]) -> Vec<u8> {
    let mut request = format!(
        "POST {path} HTTP/1.1\r\nHost: device.local\r\nContent-Type: multipart/form-data; boundary={boundary}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request
}
