//! The `http` host object against a local one-request-per-connection
//! server.

use ferry_engine::{AwaitError, Realm, Value};
use ferry_provider_http::{HttpModule, HttpSettings};
use ferry_runtime::{job_queue, HostObjectBuilder, JobQueue, WorkerPool};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Test server
// ---------------------------------------------------------------------------

struct Server {
    base: String,
    requests: Receiver<String>,
}

impl Server {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn next_request(&self) -> String {
        self.requests.recv_timeout(WAIT).unwrap()
    }
}

fn response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
    for (k, v) in headers {
        out.push_str(&format!("{}: {}\r\n", k, v));
    }
    out.push_str("\r\n");
    let mut out = out.into_bytes();
    out.extend_from_slice(body);
    out
}

/// Read one request: head, then a `Content-Length` or chunked body.
fn read_request(reader: &mut BufReader<std::net::TcpStream>) -> String {
    let mut head = String::new();
    let mut content_length = 0usize;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(v) = lower.strip_prefix("content-length:") {
            content_length = v.trim().parse().unwrap();
        }
        if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
            chunked = true;
        }
        head.push_str(&line);
    }

    let mut body = Vec::new();
    if chunked {
        loop {
            let mut size_line = String::new();
            reader.read_line(&mut size_line).unwrap();
            let size = usize::from_str_radix(size_line.trim(), 16).unwrap();
            let mut chunk = vec![0u8; size + 2];
            reader.read_exact(&mut chunk).unwrap();
            if size == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..size]);
        }
    } else {
        body.resize(content_length, 0);
        reader.read_exact(&mut body).unwrap();
    }
    format!("{}\r\n{}", head, String::from_utf8_lossy(&body))
}

/// Serve `responses` in order, one per connection.
fn serve(responses: Vec<Vec<u8>>) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for canned in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let request = read_request(&mut reader);
            let _ = tx.send(request);
            let mut stream = stream;
            stream.write_all(&canned).unwrap();
            stream.flush().unwrap();
        }
    });
    Server { base, requests: rx }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    realm: Realm,
    queue: JobQueue<Realm>,
    http: Value,
}

fn harness() -> Harness {
    let mut realm = Realm::new();
    let (_tx, queue) = job_queue::<Realm>();
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let module = HttpModule::new(HttpSettings::default()).unwrap();
    let mut builder = HostObjectBuilder::<Realm>::for_module(&module);
    builder.with_async(pool, Arc::new(queue.sender()));
    let http = realm.install(builder.build().unwrap());
    Harness { realm, queue, http }
}

impl Harness {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, AwaitError> {
        let promise = self.realm.call_method(&self.http, name, args).unwrap();
        self.realm.block_on(&self.queue, &promise, WAIT)
    }
}

fn s(text: &str) -> Value {
    Value::string(text)
}

fn n(value: f64) -> Value {
    Value::Number(value)
}

fn headers(pairs: &[&str]) -> Value {
    Value::array(pairs.iter().map(|p| s(p)).collect())
}

fn text_of(value: &Value) -> String {
    String::from_utf8(value.to_bytes().unwrap()).unwrap()
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ferry_http_{}_{}", uuid::Uuid::new_v4(), name))
}

// ---------------------------------------------------------------------------
// request
// ---------------------------------------------------------------------------

#[test]
fn get_returns_status_body_and_headers() {
    let server = serve(vec![response("200 OK", &[("X-Reply", "yes")], b"hello")]);
    let mut h = harness();
    let result = h
        .call(
            "request",
            &[s(&server.url("/greet")), s("GET"), headers(&["x-test", "1"]), n(5000.0), Value::Bool(true)],
        )
        .unwrap();

    assert_eq!(result.get("success"), Some(Value::Bool(true)));
    assert_eq!(result.get("statusCode"), Some(n(200.0)));
    assert_eq!(result.get("statusMessage").unwrap().as_str(), Some("OK"));
    assert_eq!(text_of(&result.get("body").unwrap()), "hello");

    let keys = result.get("headerKeys").unwrap();
    let values = result.get("headerValues").unwrap();
    let idx = (0..keys.length().unwrap())
        .find(|i| keys.index(*i).unwrap().as_str() == Some("x-reply"))
        .unwrap();
    assert_eq!(values.index(idx).unwrap().as_str(), Some("yes"));

    let raw = server.next_request();
    assert!(raw.starts_with("GET /greet HTTP/1.1"), "{}", raw);
    assert!(raw.to_ascii_lowercase().contains("x-test: 1"), "{}", raw);
}

#[test]
fn odd_trailing_string_is_sent_as_the_body() {
    let server = serve(vec![response("201 Created", &[], b"")]);
    let mut h = harness();
    let result = h
        .call(
            "request",
            &[
                s(&server.url("/items")),
                s("POST"),
                headers(&["content-type", "text/plain"]),
                s("payload"),
                n(5000.0),
                Value::Bool(true),
            ],
        )
        .unwrap();
    assert_eq!(result.get("statusCode"), Some(n(201.0)));
    let raw = server.next_request();
    assert!(raw.starts_with("POST /items"));
    assert!(raw.ends_with("\r\npayload"), "{}", raw);
}

#[test]
fn buffer_argument_is_the_body() {
    let server = serve(vec![response("200 OK", &[], b"")]);
    let mut h = harness();
    h.call(
        "request",
        &[
            s(&server.url("/bin")),
            s("PUT"),
            headers(&[]),
            Value::buffer(b"raw-bytes".to_vec()),
            n(5000.0),
            Value::Bool(true),
        ],
    )
    .unwrap();
    assert!(server.next_request().ends_with("raw-bytes"));
}

#[test]
fn error_statuses_still_count_as_received() {
    let server = serve(vec![response("404 Not Found", &[], b"nope")]);
    let mut h = harness();
    let result = h
        .call("request", &[s(&server.url("/x")), s("GET"), headers(&[]), n(5000.0), Value::Bool(true)])
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(true)));
    assert_eq!(result.get("statusCode"), Some(n(404.0)));
}

#[test]
fn redirects_are_not_followed_when_disabled() {
    let server = serve(vec![response("302 Found", &[("Location", "/elsewhere")], b"")]);
    let mut h = harness();
    let result = h
        .call("request", &[s(&server.url("/start")), s("GET"), headers(&[]), n(5000.0), Value::Bool(false)])
        .unwrap();
    assert_eq!(result.get("statusCode"), Some(n(302.0)));
}

#[test]
fn transport_failure_resolves_with_error_message() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut h = harness();
    let url = format!("http://127.0.0.1:{}/", port);
    let result = h
        .call("request", &[s(&url), s("GET"), headers(&[]), n(2000.0), Value::Bool(true)])
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(false)));
    assert!(result
        .get("errorMessage")
        .unwrap()
        .as_str()
        .unwrap()
        .starts_with("HTTP request failed"));
}

#[test]
fn invalid_url_resolves_with_error_message() {
    let mut h = harness();
    let result = h
        .call("request", &[s("not a url"), s("GET"), headers(&[]), n(1000.0), Value::Bool(true)])
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(false)));
    assert!(result
        .get("errorMessage")
        .unwrap()
        .as_str()
        .unwrap()
        .starts_with("Invalid URL 'not a url'"));
}

#[test]
fn missing_url_rejects() {
    let mut h = harness();
    assert_eq!(
        h.call("request", &[]).unwrap_err(),
        AwaitError::Rejected("missing string argument at position 0".into())
    );
}

// ---------------------------------------------------------------------------
// download
// ---------------------------------------------------------------------------

#[test]
fn download_writes_the_body_to_disk() {
    let server = serve(vec![response("200 OK", &[], b"file contents")]);
    let mut h = harness();
    let dest = temp_path("nested/out.txt");
    let result = h
        .call(
            "download",
            &[s(&server.url("/f")), s(dest.to_str().unwrap()), headers(&[]), n(5000.0), Value::Bool(false)],
        )
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(true)));
    assert_eq!(result.get("fileSize"), Some(n(13.0)));
    assert_eq!(std::fs::read(&dest).unwrap(), b"file contents");
    std::fs::remove_file(&dest).ok();
}

#[test]
fn resumable_download_appends_partial_content() {
    let server = serve(vec![response("206 Partial Content", &[], b"-tail")]);
    let mut h = harness();
    let dest = temp_path("resume.bin");
    std::fs::write(&dest, b"head").unwrap();
    let result = h
        .call(
            "download",
            &[s(&server.url("/f")), s(dest.to_str().unwrap()), headers(&[]), n(5000.0), Value::Bool(true)],
        )
        .unwrap();
    assert_eq!(result.get("statusCode"), Some(n(206.0)));
    assert_eq!(std::fs::read(&dest).unwrap(), b"head-tail");
    assert!(server.next_request().to_ascii_lowercase().contains("range: bytes=4-"));
    std::fs::remove_file(&dest).ok();
}

#[test]
fn download_error_status_leaves_no_file() {
    let server = serve(vec![response("500 Internal Server Error", &[], b"boom")]);
    let mut h = harness();
    let dest = temp_path("never.txt");
    let result = h
        .call(
            "download",
            &[s(&server.url("/f")), s(dest.to_str().unwrap()), headers(&[]), n(5000.0), Value::Bool(false)],
        )
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(false)));
    assert_eq!(result.get("errorMessage").unwrap().as_str(), Some("HTTP error: 500"));
    assert!(!dest.exists());
}

// ---------------------------------------------------------------------------
// upload
// ---------------------------------------------------------------------------

#[test]
fn upload_sends_multipart_file_and_fields() {
    let server = serve(vec![response("200 OK", &[], b"stored")]);
    let mut h = harness();
    let file = temp_path("upload.txt");
    std::fs::write(&file, b"upload body").unwrap();
    let result = h
        .call(
            "upload",
            &[
                s(&server.url("/up")),
                s(file.to_str().unwrap()),
                s("document"),
                s("report.txt"),
                s("text/plain"),
                headers(&["x-token", "abc"]),
                headers(&["owner"]),
                headers(&["ferry"]),
                n(5000.0),
                n(1.0),
                n(1.0),
            ],
        )
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(true)));
    assert_eq!(text_of(&result.get("responseBody").unwrap()), "stored");

    let raw = server.next_request();
    assert!(raw.starts_with("POST /up"));
    assert!(raw.to_ascii_lowercase().contains("x-token: abc"));
    assert!(raw.contains("name=\"document\"; filename=\"report.txt\""), "{}", raw);
    assert!(raw.contains("upload body"));
    assert!(raw.contains("name=\"owner\""));
    assert!(raw.contains("ferry"));
    std::fs::remove_file(&file).ok();
}

#[test]
fn upload_of_missing_file_fails_without_a_request() {
    let mut h = harness();
    let result = h
        .call(
            "upload",
            &[
                s("http://127.0.0.1:9/"),
                s("/no/such/ferry/file"),
                s("file"),
                s(""),
                s(""),
                n(1000.0),
            ],
        )
        .unwrap();
    assert_eq!(result.get("success"), Some(Value::Bool(false)));
    assert_eq!(
        result.get("errorMessage").unwrap().as_str(),
        Some("File not found: /no/such/ferry/file")
    );
}

#[test]
fn version_is_a_constant() {
    let mut h = harness();
    let http = h.http.clone();
    assert_eq!(h.realm.get_member(&http, "version").unwrap().as_str(), Some("1.0.0"));
}
