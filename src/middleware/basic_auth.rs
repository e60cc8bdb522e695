//! HTTP Basic authentication (RFC 7617).
//!
//! Requests carrying valid credentials continue down the chain with the
//! authenticated user name stored in the context (read it with [`user`]).
//! Everything else is answered right here with `401 Unauthorized` and a
//! `WWW-Authenticate` challenge; nothing after this layer runs.
//!
//! ```rust
//! use stack::{Chain, middleware::{self, BasicAuth}};
//!
//! let admin = Chain::new([
//!     middleware::trace(),
//!     BasicAuth::new("admin", "s3cret").realm("Admin area").into_middleware(),
//! ])
//! .then_fn(|ctx, w, _req| Box::pin(async move {
//!     let name = middleware::basic_auth::user(ctx).unwrap_or_default();
//!     w.write(format!("welcome, {name}"));
//! }));
//! ```
//!
//! Serve it over TLS: Basic credentials are only base64-encoded.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;
use http::header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::chain::Middleware;
use crate::context::Context;
use crate::middleware::from_fn;

/// Context key the authenticated user name is stored under.
pub const USER_KEY: &str = "stack.basic_auth.user";

/// Returns the user authenticated for the current request.
pub fn user(ctx: &Context) -> Option<String> {
    ctx.get(USER_KEY)
}

fn set_user(ctx: &Context, name: String) {
    ctx.put(USER_KEY, name);
}

/// Configuration for the basic-auth middleware.
#[derive(Clone)]
pub struct BasicAuth {
    realm: String,
    credentials: Vec<(String, String)>,
}

impl BasicAuth {
    /// Accepts `user` / `password`, under the realm `Restricted`.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            realm: "Restricted".to_owned(),
            credentials: vec![(user.into(), password.into())],
        }
    }

    /// Accepts one more `user` / `password` pair.
    pub fn credential(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials.push((user.into(), password.into()));
        self
    }

    /// Sets the realm sent in the `WWW-Authenticate` challenge.
    ///
    /// # Panics
    ///
    /// Panics if `realm` contains characters not allowed in a header value.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self.challenge().expect("invalid basic auth realm");
        self
    }

    fn challenge(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let realm = self.realm.replace('\\', "\\\\").replace('"', "\\\"");
        HeaderValue::from_str(&format!(r#"Basic realm="{realm}""#))
    }

    /// Returns the user name if `header` holds credentials this
    /// configuration accepts.
    fn authenticate(&self, header: Option<&str>) -> Option<String> {
        let (scheme, encoded) = header?.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (name, password) = decoded.split_once(':')?;

        // Check every pair so the time taken does not reveal which user matched.
        let mut matched = None;
        for (user, pass) in &self.credentials {
            let ok = name.as_bytes().ct_eq(user.as_bytes()) & password.as_bytes().ct_eq(pass.as_bytes());
            if bool::from(ok) && matched.is_none() {
                matched = Some(user.clone());
            }
        }
        matched
    }

    pub fn into_middleware(self) -> Middleware {
        let challenge = match self.challenge() {
            Ok(value) => value,
            // Unreachable through `new`/`realm`, both keep the realm valid.
            Err(_) => HeaderValue::from_static(r#"Basic realm="Restricted""#),
        };

        from_fn(move |ctx, w, req, next| {
            let user = self.authenticate(req.header(AUTHORIZATION.as_str()));
            let challenge = challenge.clone();
            Box::pin(async move {
                match user {
                    Some(name) => {
                        set_user(ctx, name);
                        next.run(w, req).await;
                    }
                    None => {
                        warn!(path = req.path(), "basic auth rejected");
                        w.set_status(StatusCode::UNAUTHORIZED);
                        w.headers_mut().insert(WWW_AUTHENTICATE, challenge);
                        w.text();
                        w.write("Unauthorized");
                    }
                }
            })
        })
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let users: Vec<&str> = self.credentials.iter().map(|(u, _)| u.as_str()).collect();
        f.debug_struct("BasicAuth")
            .field("realm", &self.realm)
            .field("users", &users)
            .finish_non_exhaustive()
    }
}
