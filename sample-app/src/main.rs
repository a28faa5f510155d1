use hookway::prelude::*;
use hookway::routes;
use std::sync::Arc;

struct OnRequest;

#[async_trait]
impl Extension for OnRequest {
    async fn invoke(&self, _request: &mut Request, next: Next) -> hookway::Result<Continue> {
        log::info!("onRequest");
        Ok(next.proceed())
    }
}

struct LogMethod;

#[async_trait]
impl Extension for LogMethod {
    async fn invoke(&self, request: &mut Request, next: Next) -> hookway::Result<Continue> {
        log::info!("onPreHandler1: {}", request.method);
        Ok(next.proceed())
    }
}

struct LogPath;

#[async_trait]
impl Extension for LogPath {
    async fn invoke(&self, request: &mut Request, next: Next) -> hookway::Result<Continue> {
        log::info!("onPreHandler2: {}", request.path());
        Ok(next.proceed())
    }
}

struct OnPostHandler;

#[async_trait]
impl Extension for OnPostHandler {
    async fn invoke(&self, _request: &mut Request, next: Next) -> hookway::Result<Continue> {
        log::info!("onPostHandler");
        Ok(next.proceed())
    }
}

struct OnPostRoute;

#[async_trait]
impl Extension for OnPostRoute {
    async fn invoke(&self, _request: &mut Request, next: Next) -> hookway::Result<Continue> {
        log::info!("onPostRoute");
        Ok(next.proceed())
    }
}

/// Replaces the default 404 reply. Only one hook is allowed here.
struct OnUnknownRoute;

#[async_trait]
impl Extension for OnUnknownRoute {
    async fn invoke(&self, request: &mut Request, next: Next) -> hookway::Result<Continue> {
        log::info!("onUnknownRoute");
        let raw = request.raw_mut();
        raw.write_head(404, &[]);
        raw.end();
        Ok(next.proceed())
    }
}

async fn get(request: &mut Request) -> hookway::Result<()> {
    request.reply("Success!\n")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_args()?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    let server = Server::builder()
        .config(config)
        .ext(ExtensionPoint::OnRequest, OnRequest)
        .ext_list(
            ExtensionPoint::OnPreHandler,
            vec![Arc::new(LogMethod), Arc::new(LogPath)],
        )
        .ext(ExtensionPoint::OnPostHandler, OnPostHandler)
        .ext(ExtensionPoint::OnPostRoute, OnPostRoute)
        .ext(ExtensionPoint::OnUnknownRoute, OnUnknownRoute)
        .route_defaults(RouteConfig::new().auth(AuthMode::None))
        .routes(routes![GET "/" => get])
        .build()?;

    log::info!("hookway server started");
    server.start().await?;
    Ok(())
}
