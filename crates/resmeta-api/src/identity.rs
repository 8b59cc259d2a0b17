//! Identity middleware
//!
//! Resolves the bearer token through a [`UserResolver`] and stores the
//! [`LoggedUser`] in request extensions. Requests without a token, or whose
//! token does not resolve, continue anonymously; the authorization engine
//! decides what an anonymous caller may do.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use resmeta_auth::{LoggedUser, UserResolver, bearer_token};
use std::sync::Arc;
use tracing::{debug, warn};

pub async fn identity_layer(
    State(resolver): State<Arc<dyn UserResolver>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(String::from);

    if let Some(token) = token {
        match resolver.resolve(&token).await {
            Ok(user) => {
                debug!("Authenticated user {} ({})", user.id, user.role);
                request.extensions_mut().insert::<LoggedUser>(user);
            }
            Err(e) => warn!("Identity resolution via {} failed: {}", resolver.name(), e),
        }
    }

    next.run(request).await
}
