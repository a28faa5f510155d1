use hookway::extensions::builtin::RequestLogger;
use hookway::lifecycle::OUTCOME_KEY;
use hookway::prelude::*;
use hookway::routes;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

const LOG_KEY: &str = "test.log";

/// Records every invocation; the onRequest instance also hands the log to
/// the handler through request data.
#[derive(Clone)]
struct Recorder {
    label: &'static str,
    log: Log,
}

impl Recorder {
    fn new(label: &'static str, log: &Log) -> Self {
        Self {
            label,
            log: Arc::clone(log),
        }
    }
}

#[async_trait]
impl Extension for Recorder {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
        if next.point() == ExtensionPoint::OnRequest {
            request.set(LOG_KEY, Arc::clone(&self.log));
        }
        self.log.lock().unwrap().push(self.label.to_string());
        Ok(next.proceed())
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

struct Deny;

#[async_trait]
impl Extension for Deny {
    async fn invoke(&self, _request: &mut Request, _next: Next) -> Result<Continue> {
        Err(Error::forbidden("denied by hook"))
    }
}

struct Rewrite;

#[async_trait]
impl Extension for Rewrite {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
        if request.path() == "/old" {
            request.set_url("/new?from=old");
            request.set_method("GET");
        }
        Ok(next.proceed())
    }
}

struct Stamp;

#[async_trait]
impl Extension for Stamp {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
        if let Some(response) = request.response_mut() {
            response.set_header("x-stamp", "post-handler")?;
        }
        Ok(next.proceed())
    }
}

struct RawNotFound {
    end: bool,
}

#[async_trait]
impl Extension for RawNotFound {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
        let raw = request.raw_mut();
        raw.write_head(404, &[("x-unknown", "1")]).write("nothing here");
        if self.end {
            raw.end();
        }
        Ok(next.proceed())
    }
}

/// Captures what onPostRoute observes about the sent response
struct SentProbe {
    seen: Arc<Mutex<Option<(u16, StreamOutcome)>>>,
}

#[async_trait]
impl Extension for SentProbe {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
        let status = request.status().map(|s| s.as_u16()).unwrap_or(0);
        if let Some(outcome) = request.get::<StreamOutcome>(OUTCOME_KEY) {
            *self.seen.lock().unwrap() = Some((status, outcome.clone()));
        }
        Ok(next.proceed())
    }
}

struct FailingPostRoute;

#[async_trait]
impl Extension for FailingPostRoute {
    async fn invoke(&self, _request: &mut Request, _next: Next) -> Result<Continue> {
        Err(Error::internal("post route failure"))
    }
}

struct Explode;

#[async_trait]
impl Extension for Explode {
    async fn invoke(&self, _request: &mut Request, _next: Next) -> Result<Continue> {
        panic!("hook blew up");
    }

    fn name(&self) -> &'static str {
        "explode"
    }
}

fn exploding_validator(_request: &Request) -> Result<()> {
    panic!("validator blew up");
}

async fn get(request: &mut Request) -> Result<()> {
    if let Some(log) = request.get::<Log>(LOG_KEY) {
        log.lock().unwrap().push("handler".to_string());
    }
    request.reply("Success!\n")
}

async fn new_page(request: &mut Request) -> Result<()> {
    let from = request.query.get("from").cloned().unwrap_or_default();
    request.reply(format!("new from {}", from))
}

async fn auth_mode(request: &mut Request) -> Result<()> {
    let mode = request
        .route_config()
        .map(|config| config.auth_mode())
        .unwrap_or_default();
    request.reply(format!("{:?}", mode))
}

fn require_q(request: &Request) -> Result<()> {
    match request.query.get("q") {
        Some(q) if !q.is_empty() => Ok(()),
        _ => Err(Error::validation("query parameter q is required")),
    }
}

async fn search(request: &mut Request) -> Result<()> {
    if let Some(log) = request.get::<Log>(LOG_KEY) {
        log.lock().unwrap().push("handler".to_string());
    }
    let q = request.query.get("q").cloned().unwrap_or_default();
    request.reply(json!({ "q": q }))
}

#[tokio::test]
async fn test_hooks_run_in_lifecycle_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let server = Server::builder()
        .ext(ExtensionPoint::OnRequest, Recorder::new("onRequest", &log))
        .ext_list(
            ExtensionPoint::OnPreHandler,
            vec![
                Arc::new(Recorder::new("onPreHandler1", &log)),
                Arc::new(Recorder::new("onPreHandler2", &log)),
            ],
        )
        .ext(
            ExtensionPoint::OnPostHandler,
            Recorder::new("onPostHandler", &log),
        )
        .ext(ExtensionPoint::OnPostRoute, Recorder::new("onPostRoute", &log))
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 200);
    assert_eq!(res.read_payload(), "Success!\n");

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "onRequest",
            "onPreHandler1",
            "onPreHandler2",
            "handler",
            "onPostHandler",
            "onPostRoute"
        ]
    );
}

#[tokio::test]
async fn test_on_request_can_rewrite_url_and_method() {
    let server = Server::builder()
        .ext(ExtensionPoint::OnRequest, Rewrite)
        .routes(routes![GET "/new" => new_page])
        .build()
        .unwrap();

    let res = server.inject(Inject::post("/old")).await.unwrap();
    assert_eq!(res.status_code, 200);
    assert_eq!(res.read_payload(), "new from old");
}

#[tokio::test]
async fn test_unknown_route_default_is_404() {
    let server = Server::builder()
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/missing")).await.unwrap();
    assert_eq!(res.status_code, 404);
    assert_eq!(res.result["code"], 404);
    assert_eq!(res.result["error"], "Not Found");
}

#[tokio::test]
async fn test_unknown_route_hook_writes_raw_response() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let server = Server::builder()
        .ext(ExtensionPoint::OnUnknownRoute, RawNotFound { end: true })
        .ext(ExtensionPoint::OnPreHandler, Recorder::new("onPreHandler", &log))
        .ext(ExtensionPoint::OnPostHandler, Stamp)
        .ext(ExtensionPoint::OnPostRoute, Recorder::new("onPostRoute", &log))
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/nowhere")).await.unwrap();
    assert_eq!(res.status_code, 404);
    assert_eq!(res.read_payload(), "nothing here");
    assert_eq!(res.header("x-unknown"), Some("1"));
    assert!(res.header("x-stamp").is_none());

    // Route stages are skipped; onPostRoute still runs
    assert_eq!(*log.lock().unwrap(), vec!["onPostRoute"]);
}

#[tokio::test]
async fn test_unknown_route_hook_that_does_not_end_is_still_sent() {
    let server = Server::builder()
        .ext(ExtensionPoint::OnUnknownRoute, RawNotFound { end: false })
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/nowhere")).await.unwrap();
    assert_eq!(res.status_code, 404);
    assert_eq!(res.read_payload(), "nothing here");
}

#[test]
fn test_unknown_route_rejects_hook_lists() {
    let result = Server::builder()
        .ext_list(
            ExtensionPoint::OnUnknownRoute,
            vec![Arc::new(RawNotFound { end: true })],
        )
        .build();
    assert!(matches!(result, Err(Error::Config(_))));

    let result = Server::builder()
        .ext(ExtensionPoint::OnUnknownRoute, RawNotFound { end: true })
        .ext(ExtensionPoint::OnUnknownRoute, RawNotFound { end: false })
        .build();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unknown_extension_point_name_is_rejected() {
    let result = Server::builder()
        .on("onSomething", Hooks::single(Stamp))
        .build();
    assert!(matches!(result, Err(Error::Config(_))));

    let result = Server::builder()
        .on("onPostHandler", Hooks::single(Stamp))
        .build();
    assert!(result.is_ok());
}

#[test]
fn test_duplicate_routes_fail_build() {
    let result = Server::builder()
        .routes(routes![GET "/" => get, GET "/" => get])
        .build();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_validation_failure_skips_handler() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let server = Server::builder()
        .ext(ExtensionPoint::OnRequest, Recorder::new("onRequest", &log))
        .ext(ExtensionPoint::OnPreHandler, Recorder::new("onPreHandler", &log))
        .routes(vec![Route::get("/search", |req| {
            Box::pin(async move { search(req).await })
        })
        .with_config(RouteConfig::new().validate(require_q))])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/search")).await.unwrap();
    assert_eq!(res.status_code, 400);
    assert_eq!(res.result["message"], "query parameter q is required");
    assert_eq!(*log.lock().unwrap(), vec!["onRequest"]);

    let res = server.inject(Inject::get("/search?q=rust")).await.unwrap();
    assert_eq!(res.status_code, 200);
    assert_eq!(res.result, json!({ "q": "rust" }));
}

#[tokio::test]
async fn test_pre_handler_error_aborts_chain() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let server = Server::builder()
        .ext(ExtensionPoint::OnRequest, Recorder::new("onRequest", &log))
        .ext_list(
            ExtensionPoint::OnPreHandler,
            vec![
                Arc::new(Deny),
                Arc::new(Recorder::new("onPreHandler2", &log)),
            ],
        )
        .ext(ExtensionPoint::OnPostRoute, Recorder::new("onPostRoute", &log))
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 403);
    assert_eq!(res.result["message"], "denied by hook");
    assert_eq!(*log.lock().unwrap(), vec!["onRequest", "onPostRoute"]);
}

#[tokio::test]
async fn test_on_request_error_is_answered() {
    let server = Server::builder()
        .ext(ExtensionPoint::OnRequest, Deny)
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 403);
}

#[tokio::test]
async fn test_post_handler_sees_resolved_response() {
    let server = Server::builder()
        .ext(ExtensionPoint::OnPostHandler, Stamp)
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.header("x-stamp"), Some("post-handler"));
    assert_eq!(res.read_payload(), "Success!\n");
}

#[tokio::test]
async fn test_post_handler_error_replaces_response() {
    let server = Server::builder()
        .ext_list(
            ExtensionPoint::OnPostHandler,
            vec![Arc::new(Stamp), Arc::new(Deny)],
        )
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 403);
    assert!(res.header("x-stamp").is_none());
    assert_eq!(res.result["message"], "denied by hook");
}

#[tokio::test]
async fn test_post_route_sees_transmission() {
    let seen = Arc::new(Mutex::new(None));
    let server = Server::builder()
        .ext_list(
            ExtensionPoint::OnPostRoute,
            vec![
                Arc::new(FailingPostRoute),
                Arc::new(SentProbe {
                    seen: Arc::clone(&seen),
                }),
            ],
        )
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    // A failing onPostRoute hook does not affect the already-sent response
    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 200);
    assert!(seen.lock().unwrap().is_none());

    let server = Server::builder()
        .ext(
            ExtensionPoint::OnPostRoute,
            SentProbe {
                seen: Arc::clone(&seen),
            },
        )
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        Some((200, StreamOutcome::Completed { bytes: 9 }))
    );
}

#[tokio::test]
async fn test_route_defaults_apply() {
    let server = Server::builder()
        .route_defaults(RouteConfig::new().auth(AuthMode::Required))
        .routes(routes![GET "/private" => auth_mode])
        .route(
            Route::get("/public", |req| Box::pin(async move { auth_mode(req).await }))
                .with_config(RouteConfig::new().auth(AuthMode::None)),
        )
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/private")).await.unwrap();
    assert_eq!(res.read_payload(), "Required");

    let res = server.inject(Inject::get("/public")).await.unwrap();
    assert_eq!(res.read_payload(), "None");
}

#[tokio::test]
async fn test_request_logger_can_be_attached() {
    let mut config = AppConfig::default();
    config.logging.requests = true;

    let server = Server::builder()
        .config(config)
        .ext(ExtensionPoint::OnPreHandler, RequestLogger::new())
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 200);
}

#[tokio::test]
async fn test_json_payload_reaches_handler() {
    async fn echo(request: &mut Request) -> Result<()> {
        let value: Value = request.payload_as_json()?;
        request.reply(value)
    }

    let server = Server::builder()
        .routes(routes![POST "/echo" => echo])
        .build()
        .unwrap();

    let res = server
        .inject(Inject::post("/echo").json(&json!({ "a": 1 })).unwrap())
        .await
        .unwrap();
    assert_eq!(res.result, json!({ "a": 1 }));

    let res = server
        .inject(Inject::post("/echo").payload("not json"))
        .await
        .unwrap();
    assert_eq!(res.status_code, 400);
}

fn assert_generic_500(res: &InjectResponse) {
    assert_eq!(res.status_code, 500);
    assert_eq!(res.result, json!({ "message": "An internal server error occurred" }));
    assert_eq!(res.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_panicking_hooks_answer_generic_500() {
    for point in [
        ExtensionPoint::OnRequest,
        ExtensionPoint::OnPreHandler,
        ExtensionPoint::OnPostHandler,
    ] {
        let server = Server::builder()
            .ext(point, Explode)
            .routes(routes![GET "/" => get])
            .build()
            .unwrap();

        let res = server.inject(Inject::get("/")).await.unwrap();
        assert_generic_500(&res);
    }

    let server = Server::builder()
        .ext(ExtensionPoint::OnUnknownRoute, Explode)
        .build()
        .unwrap();
    let res = server.inject(Inject::get("/nowhere")).await.unwrap();
    assert_generic_500(&res);
}

#[tokio::test]
async fn test_panicking_pre_handler_stops_the_chain() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let server = Server::builder()
        .ext(ExtensionPoint::OnRequest, Recorder::new("onRequest", &log))
        .ext_list(
            ExtensionPoint::OnPreHandler,
            vec![
                Arc::new(Explode),
                Arc::new(Recorder::new("onPreHandler2", &log)),
            ],
        )
        .ext(ExtensionPoint::OnPostRoute, Recorder::new("onPostRoute", &log))
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_generic_500(&res);
    assert_eq!(*log.lock().unwrap(), vec!["onRequest", "onPostRoute"]);
}

#[tokio::test]
async fn test_panicking_validator_answers_generic_500() {
    let server = Server::builder()
        .route(
            Route::get("/", |req| Box::pin(async move { get(req).await }))
                .with_config(RouteConfig::new().validate(exploding_validator)),
        )
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_generic_500(&res);
}

#[tokio::test]
async fn test_panicking_post_route_keeps_sent_response() {
    let server = Server::builder()
        .ext(ExtensionPoint::OnPostRoute, Explode)
        .routes(routes![GET "/" => get])
        .build()
        .unwrap();

    let res = server.inject(Inject::get("/")).await.unwrap();
    assert_eq!(res.status_code, 200);
    assert_eq!(res.read_payload(), "Success!\n");
}
