//! Per-client throttling of the login and registration routes
//!
//! Each (route, client IP) pair keeps the instants of its recent attempts;
//! an attempt is refused once the window already holds the route's quota.
//! `X-Forwarded-For` is only consulted when the socket peer is a configured
//! trusted proxy.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRoute {
    Login,
    Register,
}

impl AuthRoute {
    /// Attempts allowed per client within [`WINDOW`]
    const fn quota(self) -> usize {
        match self {
            Self::Login => 5,
            Self::Register => 3,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

type Attempts = HashMap<(AuthRoute, IpAddr), VecDeque<Instant>>;

#[derive(Clone, Default)]
pub struct RateLimiter {
    attempts: Arc<Mutex<Attempts>>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimiter {
    pub fn new(trusted_proxies: &[IpAddr]) -> Self {
        Self {
            attempts: Arc::default(),
            trusted_proxies: trusted_proxies.into(),
        }
    }

    /// Record an attempt at `now`; `false` when the quota is used up
    async fn try_acquire(&self, route: AuthRoute, client: IpAddr, now: Instant) -> bool {
        let mut attempts = self.attempts.lock().await;
        let recent = attempts.entry((route, client)).or_default();
        while recent
            .front()
            .is_some_and(|t| now.duration_since(*t) >= WINDOW)
        {
            recent.pop_front();
        }
        if recent.len() >= route.quota() {
            return false;
        }
        recent.push_back(now);
        true
    }

    /// Drop clients with no attempt inside the window
    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.lock().await.retain(|_, recent| {
            recent
                .back()
                .is_some_and(|t| now.duration_since(*t) < WINDOW)
        });
    }

    /// Address the limit applies to.
    ///
    /// Behind a trusted proxy this is the right-most forwarded hop that is
    /// not itself a trusted proxy; otherwise the socket peer.
    fn client_ip(&self, request: &Request) -> IpAddr {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip());

        let Some(peer) = peer else {
            return IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        };
        if !self.trusted_proxies.contains(&peer) {
            return peer;
        }

        request
            .headers()
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
            .rev()
            .find(|ip| !self.trusted_proxies.contains(ip))
            .unwrap_or(peer)
    }
}

async fn enforce(
    state: &AppState,
    route: AuthRoute,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limiter = &state.rate_limiter;
    let client = limiter.client_ip(&request);
    if !limiter.try_acquire(route, client, Instant::now()).await {
        tracing::warn!(route = route.as_str(), client = %client, "Rate limit exceeded");
        return Err(AppError::new(ErrorCode::TooManyRequests));
    }
    Ok(next.run(request).await)
}

/// 5 attempts per minute per client
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, AuthRoute::Login, request, next).await
}

/// 3 attempts per minute per client
pub async fn register_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, AuthRoute::Register, request, next).await
}
