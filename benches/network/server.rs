use criterion::{Criterion, Throughput};
use libiot_httpd::network::application::http::{Method, Outcome, Server, UploadStatus};
use libiot_httpd::network::{Host, Read, Stream, Write};

/// Client stream replaying a captured request, in reads of up to `chunk` bytes.
struct ReplayStream {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ReplayStream {
    fn new(data: &[u8], chunk: usize) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
            chunk,
        }
    }
}

impl Read for ReplayStream {
    type Error = ();
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let len = buf.len().min(self.available());
        buf[..len].copy_from_slice(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }
}

impl Write for ReplayStream {
    type Error = ();
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Stream for ReplayStream {
    fn available(&mut self) -> usize {
        (self.data.len() - self.pos).min(self.chunk)
    }

    fn connected(&mut self) -> bool {
        self.pos < self.data.len()
    }
}

struct BenchHost(u64);

impl Host for BenchHost {
    fn millis(&mut self) -> u64 {
        self.0
    }

    fn yield_now(&mut self) {
        self.0 += 1;
    }
}

fn setup_server() -> Server<BenchHost> {
    let mut server = Server::new(BenchHost(0));
    server.on("/api/status", Method::Get, |request| {
        request.header("accept").is_some()
    });
    server.on("/api/config", Method::Post, |request| request.has_arg("ssid"));
    server.on_upload(
        "/update",
        Method::Post,
        |_| true,
        |_, upload| {
            if upload.status() == UploadStatus::Write {
                std::hint::black_box(upload.data());
            }
        },
    );
    server
}

const GET_REQUEST: &[u8] = b"GET /api/status?verbose=1&fields=uptime%2Cheap HTTP/1.1\r\n\
Host: 192.168.4.1\r\n\
User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
Accept-Language: en-US,en;q=0.5\r\n\
Accept-Encoding: gzip, deflate\r\n\
Connection: keep-alive\r\n\r\n";

const FORM_REQUEST: &[u8] = b"POST /api/config HTTP/1.1\r\n\
Host: 192.168.4.1\r\n\
Content-Type: application/x-www-form-urlencoded\r\n\
Content-Length: 58\r\n\r\n\
ssid=Home+Network&pass=s%3Dcr%26t&dhcp=on&ip=10.0.0.7&mask";

fn upload_request(len: usize) -> Vec<u8> {
    let mut body = b"--bench\r\nContent-Disposition: form-data; name=\"fw\"; filename=\"fw.bin\"\r\n\
Content-Type: application/octet-stream\r\n\r\n"
        .to_vec();
    body.extend((0..len).map(|i| (i % 251) as u8));
    body.extend_from_slice(b"\r\n--bench--\r\n");

    let mut request = format!(
        "POST /update HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=bench\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend(body);
    request
}

pub fn bench_parse_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_get");
    group.throughput(Throughput::Bytes(GET_REQUEST.len() as u64));
    let mut server = setup_server();
    group.bench_function("parse_get", |b| {
        b.iter_batched_ref(
            || ReplayStream::new(GET_REQUEST, 1460),
            |stream| {
                assert_eq!(server.handle_client(stream), Outcome::Handled);
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_parse_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_form");
    group.throughput(Throughput::Bytes(FORM_REQUEST.len() as u64));
    let mut server = setup_server();
    group.bench_function("parse_form", |b| {
        b.iter_batched_ref(
            || ReplayStream::new(FORM_REQUEST, 64),
            |stream| {
                assert_eq!(server.handle_client(stream), Outcome::Handled);
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_multipart_upload(c: &mut Criterion) {
    let mut group = c.benchmark_group("multipart_upload");
    let request = upload_request(64 * 1024);
    group.throughput(Throughput::Bytes(request.len() as u64));
    let mut server = setup_server();
    group.bench_function("multipart_upload", |b| {
        b.iter_batched_ref(
            || ReplayStream::new(&request, 1460),
            |stream| {
                assert_eq!(server.handle_client(stream), Outcome::Handled);
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}
