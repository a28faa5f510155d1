//! Request lifecycle controller
//!
//! Drives one request through its states:
//!
//! ```text
//! Created -> Routing -> Validating -> PreHandler -> Handling -> Responding
//!         -> PostHandler -> Sent -> PostRoute -> Done
//! ```
//!
//! with `UnknownRoute` branching off routing and `Errored` reachable from any
//! stage that can fail. Every path ends in exactly one response being written.

use crate::error::{Error, ErrorChain};
use crate::extensions::{ExtensionPoint, ExtensionRegistry};
use crate::http::{Request, Response};
use crate::reply::stream::SentSignal;
use crate::reply::{resolve, Reply, ResolveOptions, StreamOutcome};
use crate::routing::Router;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Key under which the transmission outcome is stored for onPostRoute hooks
pub const OUTCOME_KEY: &str = "hookway.outcome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Routing,
    UnknownRoute,
    Validating,
    PreHandler,
    Handling,
    Errored,
    Responding,
    PostHandler,
    Sent,
    PostRoute,
    Done,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        matches!(
            (self, next),
            (Created, Routing)
                | (Created, Errored)
                | (Routing, UnknownRoute)
                | (Routing, Validating)
                | (Validating, PreHandler)
                | (Validating, Errored)
                | (PreHandler, Handling)
                | (PreHandler, Errored)
                | (Handling, Responding)
                | (Handling, Errored)
                | (UnknownRoute, Sent)
                | (UnknownRoute, Errored)
                | (Errored, Responding)
                | (Responding, PostHandler)
                | (Responding, Sent)
                | (PostHandler, Sent)
                | (Sent, PostRoute)
                | (PostRoute, Done)
        )
    }
}

/// Everything a lifecycle run needs from the server. Read-only after build.
pub struct ServerState {
    pub router: Router,
    pub extensions: ExtensionRegistry,
    pub resolve: ResolveOptions,
}

/// The response ready for the transport plus the work to run once it is sent
pub struct Transmission {
    pub response: hyper::Response<hyper::Body>,
    pub post_route: PostRoute,
}

pub struct Lifecycle {
    state: Arc<ServerState>,
    request: Request,
}

impl Lifecycle {
    pub fn new(state: Arc<ServerState>, request: Request) -> Self {
        Self { state, request }
    }

    /// Run the request up to the point where the response can be written
    pub async fn run(mut self) -> Transmission {
        let response = self.respond().await;

        self.request.transition(LifecycleState::Sent);
        self.request.mark_sent(response.status);
        let (response, sent) = response.into_hyper();

        Transmission {
            response,
            post_route: PostRoute {
                state: self.state,
                request: self.request,
                sent,
            },
        }
    }

    async fn respond(&mut self) -> Response {
        let state = Arc::clone(&self.state);

        if let Err(e) = state
            .extensions
            .invoke(ExtensionPoint::OnRequest, &mut self.request)
            .await
        {
            return self.fail(e).await;
        }

        self.request.transition(LifecycleState::Routing);
        let matched = state
            .router
            .match_route(&self.request.method, self.request.path());
        let (route, params) = match matched {
            Some(found) => found,
            None => return self.unknown_route().await,
        };
        log::debug!(
            "Request {} matched {} {}",
            self.request.id(),
            route.method,
            route.path
        );
        self.request.bind_route(Arc::clone(&route), params);

        self.request.transition(LifecycleState::Validating);
        if let Some(validator) = &route.config.validate {
            let checked = {
                let request = &self.request;
                std::panic::catch_unwind(AssertUnwindSafe(|| validator.validate(request)))
                    .unwrap_or_else(|payload| {
                        log::error!("Validator for {} {} panicked", route.method, route.path);
                        Err(Error::from_panic("validator", payload))
                    })
            };
            if let Err(e) = checked {
                return self.fail(e).await;
            }
        }

        self.request.transition(LifecycleState::PreHandler);
        if let Err(e) = state
            .extensions
            .invoke(ExtensionPoint::OnPreHandler, &mut self.request)
            .await
        {
            return self.fail(e).await;
        }

        self.request.transition(LifecycleState::Handling);
        let outcome = AssertUnwindSafe((route.handler)(&mut self.request))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(())) => {
                let reply = self.request.take_reply().unwrap_or_else(|| {
                    log::debug!(
                        "Handler for {} {} returned without replying",
                        route.method,
                        route.path
                    );
                    Reply::empty()
                });
                self.request.transition(LifecycleState::Responding);
                resolve(reply, &state.resolve).await
            }
            Ok(Err(e)) => match self.request.take_reply() {
                Some(reply) => {
                    log::error!(
                        "Handler for {} {} failed after replying, keeping the reply: {}",
                        route.method,
                        route.path,
                        ErrorChain::new(&e)
                    );
                    self.request.transition(LifecycleState::Responding);
                    resolve(reply, &state.resolve).await
                }
                None => {
                    self.request.transition(LifecycleState::Errored);
                    self.request.transition(LifecycleState::Responding);
                    resolve(Reply::error(e), &state.resolve).await
                }
            },
            Err(payload) => {
                let panicked = Error::from_panic(
                    format!("handler for {} {}", route.method, route.path),
                    payload,
                );
                log::error!("{}", panicked);
                self.request.take_reply();
                self.request.transition(LifecycleState::Errored);
                self.request.transition(LifecycleState::Responding);
                Response::internal_error()
            }
        };

        self.post_handler(response).await
    }

    async fn post_handler(&mut self, response: Response) -> Response {
        self.request.transition(LifecycleState::PostHandler);

        let state = Arc::clone(&self.state);
        if state.extensions.is_empty(ExtensionPoint::OnPostHandler) {
            return response;
        }

        self.request.set_response(response);
        let result = state
            .extensions
            .invoke(ExtensionPoint::OnPostHandler, &mut self.request)
            .await;
        let response = self
            .request
            .take_response()
            .unwrap_or_else(Response::internal_error);

        match result {
            Ok(()) => response,
            Err(e) => {
                log::debug!(
                    "onPostHandler replaced the response for request {}",
                    self.request.id()
                );
                resolve(Reply::error(e), &state.resolve).await
            }
        }
    }

    async fn unknown_route(&mut self) -> Response {
        self.request.transition(LifecycleState::UnknownRoute);
        log::debug!(
            "No route for {} {}",
            self.request.method,
            self.request.path()
        );

        let state = Arc::clone(&self.state);
        if state.extensions.is_empty(ExtensionPoint::OnUnknownRoute) {
            let not_found = Error::not_found(format!(
                "No route for {} {}",
                self.request.method,
                self.request.path()
            ));
            return resolve(Reply::error(not_found), &state.resolve).await;
        }

        match state
            .extensions
            .invoke(ExtensionPoint::OnUnknownRoute, &mut self.request)
            .await
        {
            Ok(()) => {
                let raw = self.request.take_raw();
                if !raw.is_ended() {
                    log::warn!(
                        "onUnknownRoute hook did not end the response for {} {}",
                        self.request.method,
                        self.request.path()
                    );
                }
                raw.into_response()
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn fail(&mut self, error: Error) -> Response {
        self.request.transition(LifecycleState::Errored);
        self.request.transition(LifecycleState::Responding);
        resolve(Reply::error(error), &self.state.resolve).await
    }
}

/// Work deferred until the response body has been fully written
pub struct PostRoute {
    state: Arc<ServerState>,
    request: Request,
    sent: SentSignal,
}

impl PostRoute {
    pub async fn run(self) {
        let PostRoute {
            state,
            mut request,
            sent,
        } = self;

        // A dropped sender means the body never reached the adapter
        let outcome = sent
            .await
            .unwrap_or(StreamOutcome::Abandoned { bytes: 0 });
        log::debug!(
            "Request {} transmitted: {:?}",
            request.id(),
            outcome
        );
        request.set(OUTCOME_KEY, outcome);

        request.transition(LifecycleState::PostRoute);
        if let Err(e) = state
            .extensions
            .invoke(ExtensionPoint::OnPostRoute, &mut request)
            .await
        {
            log::error!(
                "onPostRoute hook failed for {} {}: {}",
                request.method,
                request.path(),
                ErrorChain::new(&e)
            );
        }
        request.transition(LifecycleState::Done);
    }

    pub fn request(&self) -> &Request {
        &self.request
    }
}
