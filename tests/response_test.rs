use hookway::config::AppConfig;
use hookway::prelude::*;
use hookway::routes;
use std::io;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

async fn text(request: &mut Request) -> Result<()> {
    request.reply(Reply::text("text").content_type("text/plain").bytes(4))
}

async fn error(request: &mut Request) -> Result<()> {
    request.reply(Error::internal("boom"))
}

async fn empty(_request: &mut Request) -> Result<()> {
    Ok(())
}

async fn base(request: &mut Request) -> Result<()> {
    request.reply("hola")
}

async fn unserializable(request: &mut Request) -> Result<()> {
    let mut map = HashMap::new();
    map.insert((1u8, 2u8), "tuple keys are not valid JSON object keys");
    request.reply(Reply::json(&map))
}

async fn overlong(request: &mut Request) -> Result<()> {
    request.reply(Reply::text("hi").bytes(10))
}

async fn panics(_request: &mut Request) -> Result<()> {
    panic!("handler blew up");
}

async fn stream(request: &mut Request) -> Result<()> {
    let (sender, body) = ReplyStream::channel();
    match request.param("issue") {
        Some("error") => {
            sender.error(io::Error::new(io::ErrorKind::Other, "Oops"));
        }
        Some("double") => {
            sender.data("x");
            sender.error(io::Error::new(io::ErrorKind::Other, "Oops"));
            sender.end();
        }
        _ => {
            sender.data("x");
            sender.end();
        }
    }
    request.reply(body)
}

async fn file(request: &mut Request) -> Result<()> {
    request.reply(Reply::file(fixtures_dir().join("package.json")))
}

async fn relative_file(request: &mut Request) -> Result<()> {
    request.reply(Reply::file("package.json"))
}

async fn file_not_found(request: &mut Request) -> Result<()> {
    request.reply(Reply::file(fixtures_dir().join("notHere")))
}

async fn twice(request: &mut Request) -> Result<()> {
    request.reply("first")?;
    let second = request.reply("second");
    assert!(matches!(second, Err(Error::AlreadyReplied)));
    Ok(())
}

async fn reply_then_fail(request: &mut Request) -> Result<()> {
    request.reply("kept")?;
    Err(Error::bad_request("too late"))
}

async fn fail(_request: &mut Request) -> Result<()> {
    Err(Error::with_status(418, "short and stout"))
}

fn server() -> Server {
    let mut config = AppConfig::default();
    config.files.relative_to = fixtures_dir();

    Server::builder()
        .config(config)
        .routes(routes![
            POST "/text" => text,
            POST "/error" => error,
            POST "/empty" => empty,
            POST "/base" => base,
            POST "/unserializable" => unserializable,
            POST "/overlong" => overlong,
            POST "/panics" => panics,
            POST "/stream/{issue?}" => stream,
            POST "/file" => file,
            POST "/relative" => relative_file,
            POST "/filenotfound" => file_not_found,
            POST "/twice" => twice,
            POST "/reply-then-fail" => reply_then_fail,
            POST "/fail" => fail
        ])
        .build()
        .unwrap()
}

async fn post(server: &Server, url: &str) -> InjectResponse {
    server.inject(Inject::post(url)).await.unwrap()
}

#[tokio::test]
async fn test_text_reply() {
    let res = post(&server(), "/text").await;
    assert_eq!(res.status_code, 200);
    assert_eq!(res.result, json!("text"));
    assert_eq!(res.header("content-type"), Some("text/plain"));
    assert_eq!(res.header("content-length"), Some("4"));
}

#[tokio::test]
async fn test_error_reply() {
    let res = post(&server(), "/error").await;
    assert_eq!(res.status_code, 500);
    assert_eq!(res.result["message"], "boom");
    assert_eq!(res.result["code"], 500);
    assert_eq!(res.result["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_error_status_from_handler() {
    let res = post(&server(), "/fail").await;
    assert_eq!(res.status_code, 418);
    assert_eq!(res.result["message"], "short and stout");
}

#[tokio::test]
async fn test_empty_reply() {
    let res = post(&server(), "/empty").await;
    assert_eq!(res.status_code, 200);
    assert_eq!(res.result, json!(""));
    assert_eq!(res.read_payload(), "");
}

#[tokio::test]
async fn test_base_reply() {
    let res = post(&server(), "/base").await;
    assert_eq!(res.result, json!("hola"));
}

#[tokio::test]
async fn test_unresolvable_replies_become_generic_500() {
    let server = server();
    for url in ["/unserializable", "/overlong", "/panics"] {
        let res = post(&server, url).await;
        assert_eq!(res.status_code, 500, "{}", url);
        assert_eq!(
            res.result["message"], "An internal server error occurred",
            "{}",
            url
        );
        assert_eq!(res.header("content-type"), Some("application/json"));
    }
}

#[tokio::test]
async fn test_stream_reply() {
    let res = post(&server(), "/stream").await;
    assert_eq!(res.status_code, 200);
    assert_eq!(res.read_payload(), "x");
    assert!(res.header("content-length").is_none());
}

#[tokio::test]
async fn test_broken_stream_on_error() {
    let res = post(&server(), "/stream/error").await;
    assert_eq!(res.read_payload(), "");
}

#[tokio::test]
async fn test_broken_stream_on_double_issue() {
    let res = post(&server(), "/stream/double").await;
    assert_eq!(res.read_payload(), "x");
}

#[tokio::test]
async fn test_file_reply() {
    let res = post(&server(), "/file").await;
    assert_eq!(res.status_code, 200);
    assert!(res.read_payload().contains("hookway"));
    assert_eq!(res.header("content-type"), Some("application/json"));

    let expected = std::fs::metadata(fixtures_dir().join("package.json"))
        .unwrap()
        .len();
    assert_eq!(res.header("content-length"), Some(expected.to_string().as_str()));
    assert_eq!(res.raw_payload.len() as u64, expected);
}

#[tokio::test]
async fn test_relative_file_uses_files_root() {
    let res = post(&server(), "/relative").await;
    assert_eq!(res.status_code, 200);
    assert!(res.read_payload().contains("hookway"));
}

#[tokio::test]
async fn test_file_not_found() {
    let res = post(&server(), "/filenotfound").await;
    assert_eq!(res.status_code, 404);
    assert_eq!(res.read_payload(), "");
}

#[tokio::test]
async fn test_second_reply_is_ignored() {
    let res = post(&server(), "/twice").await;
    assert_eq!(res.status_code, 200);
    assert_eq!(res.read_payload(), "first");
}

#[tokio::test]
async fn test_error_after_reply_keeps_reply() {
    let res = post(&server(), "/reply-then-fail").await;
    assert_eq!(res.status_code, 200);
    assert_eq!(res.read_payload(), "kept");
}

#[tokio::test]
async fn test_inject_with_callback() {
    let server = server();
    let mut seen = None;
    server
        .inject_with(Inject::post("/base"), |res| seen = Some(res.read_payload()))
        .await
        .unwrap();
    assert_eq!(seen.as_deref(), Some("hola"));
}

#[tokio::test]
async fn test_replayed_requests_get_identical_responses() {
    let server = server();
    for url in ["/text", "/base", "/error", "/file"] {
        let first = post(&server, url).await;
        let second = post(&server, url).await;
        assert_eq!(first.status_code, second.status_code, "{}", url);
        assert_eq!(first.headers, second.headers, "{}", url);
        assert_eq!(first.raw_payload, second.raw_payload, "{}", url);
        assert_eq!(first.result, second.result, "{}", url);
    }
}
