//! Rate limiting middleware.
//!
//! A limiter *error* is not a throttling decision. By default the request is
//! refused with `503` (fail-closed) so a backend outage cannot quietly switch
//! rate limiting off; `RATE_LIMIT_FAIL_OPEN=true` lets such requests through
//! instead. Normal rejections are `429`.

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{
        StatusCode,
        header::{HeaderMap, HeaderName, HeaderValue},
    },
};
use tollgate_core::ports::{RateLimitResult, RateLimiter};
use tollgate_shared::ErrorResponse;

use crate::config::flag;
use crate::observability::RequestId;

/// How the middleware reacts to limiter failures and finished requests.
#[derive(Debug, Clone, Default)]
pub struct RateLimitPolicy {
    /// Let requests through when the limiter errors.
    pub fail_open: bool,
    /// Give the slot back when the handler answers with a status below 400.
    pub skip_successful: bool,
    /// Give the slot back when the handler answers with 400 or above, or errors.
    pub skip_failed: bool,
}

impl RateLimitPolicy {
    pub fn from_env() -> Self {
        Self {
            fail_open: flag("RATE_LIMIT_FAIL_OPEN"),
            skip_successful: flag("RATE_LIMIT_SKIP_SUCCESSFUL"),
            skip_failed: flag("RATE_LIMIT_SKIP_FAILED"),
        }
    }

    fn releases(&self, status: StatusCode) -> bool {
        if status.as_u16() < 400 {
            self.skip_successful
        } else {
            self.skip_failed
        }
    }
}

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    policy: RateLimitPolicy,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<dyn RateLimiter>, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            policy: self.policy.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    policy: RateLimitPolicy,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let policy = self.policy.clone();
        let key = rate_limit_key(&req);

        Box::pin(async move {
            let result = match limiter.check(&key).await {
                Ok(result) => Some(result),
                Err(e) if policy.fail_open => {
                    tracing::error!(key = %key, error = %e, "Rate limiter error, failing open");
                    None
                }
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Rate limiter error, rejecting request");

                    let error = with_request_id(
                        ErrorResponse::service_unavailable(
                            "Rate limiting is temporarily unavailable.",
                        ),
                        &req,
                    );
                    let response = HttpResponse::ServiceUnavailable().json(error);
                    return Ok(reply(req, response));
                }
            };

            if let Some(result) = result.as_ref().filter(|r| !r.allowed) {
                tracing::warn!(key = %key, count = result.count, "Rate limit exceeded");

                let retry_after = result.reset_after.as_secs().max(1);
                let error = with_request_id(ErrorResponse::too_many_requests(retry_after), &req);

                let mut response = HttpResponse::TooManyRequests()
                    .insert_header(("Retry-After", retry_after.to_string()))
                    .json(error);
                insert_headers(response.headers_mut(), result);

                return Ok(reply(req, response));
            }

            let mut res = match service.call(req).await {
                Ok(res) => res,
                Err(e) => {
                    if result.is_some() && policy.skip_failed {
                        release(limiter.as_ref(), &key).await;
                    }
                    return Err(e);
                }
            };

            if let Some(result) = &result {
                insert_headers(res.headers_mut(), result);
                if policy.releases(res.status()) {
                    release(limiter.as_ref(), &key).await;
                }
            }

            Ok(res.map_into_left_body())
        })
    }
}

/// Caller identity plus route.
fn rate_limit_key(req: &ServiceRequest) -> String {
    let client = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    format!("{}:{}", client, req.path())
}

fn with_request_id(error: ErrorResponse, req: &ServiceRequest) -> ErrorResponse {
    match req.extensions().get::<RequestId>() {
        Some(id) => error.with_request_id(id.as_str()),
        None => error,
    }
}

fn reply<B>(req: ServiceRequest, response: HttpResponse) -> ServiceResponse<EitherBody<B>> {
    let (http_req, _payload) = req.into_parts();
    ServiceResponse::new(http_req, response).map_into_right_body()
}

fn insert_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert(
        HeaderName::from_static("ratelimit-limit"),
        HeaderValue::from(result.limit),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-remaining"),
        HeaderValue::from(result.remaining),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-reset"),
        HeaderValue::from(result.reset_after.as_secs()),
    );
}

async fn release(limiter: &dyn RateLimiter, key: &str) {
    if let Err(e) = limiter.release(key).await {
        tracing::warn!(key = %key, error = %e, "Failed to release rate-limit slot");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{App, test, web};
    use async_trait::async_trait;
    use tollgate_core::ports::RateLimitError;
    use tollgate_infra::{FixedWindowRateLimiter, InMemoryKv, RateLimitConfig};

    use super::*;

    struct DownLimiter;

    #[async_trait]
    impl RateLimiter for DownLimiter {
        async fn check(&self, _key: &str) -> Result<RateLimitResult, RateLimitError> {
            Err(RateLimitError::Backend("connection refused".to_string()))
        }

        async fn release(&self, _key: &str) -> Result<(), RateLimitError> {
            Err(RateLimitError::Backend("connection refused".to_string()))
        }
    }

    fn limiter(max_requests: u32) -> Arc<dyn RateLimiter> {
        Arc::new(FixedWindowRateLimiter::new(
            Arc::new(InMemoryKv::new()),
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            },
        ))
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    async fn missing() -> HttpResponse {
        HttpResponse::NotFound().finish()
    }

    #[actix_web::test]
    async fn test_rejects_over_ceiling_with_headers() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(
                    limiter(2),
                    RateLimitPolicy::default(),
                ))
                .route("/", web::get().to(ok)),
        )
        .await;

        for remaining in ["1", "0"] {
            let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers().get("ratelimit-limit").unwrap(), "2");
            assert_eq!(res.headers().get("ratelimit-remaining").unwrap(), remaining);
        }

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key("retry-after"));
        assert_eq!(res.headers().get("ratelimit-remaining").unwrap(), "0");

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 429);
    }

    #[actix_web::test]
    async fn test_routes_are_counted_separately() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(
                    limiter(1),
                    RateLimitPolicy::default(),
                ))
                .route("/a", web::get().to(ok))
                .route("/b", web::get().to(ok)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/a").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = test::call_service(&app, test::TestRequest::get().uri("/b").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = test::call_service(&app, test::TestRequest::get().uri("/a").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_limiter_error_fails_closed_by_default() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(
                    Arc::new(DownLimiter),
                    RateLimitPolicy::default(),
                ))
                .route("/", web::get().to(ok)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_limiter_error_can_fail_open() {
        let policy = RateLimitPolicy {
            fail_open: true,
            ..Default::default()
        };
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(Arc::new(DownLimiter), policy))
                .route("/", web::get().to(ok)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.headers().contains_key("ratelimit-limit"));
    }

    #[actix_web::test]
    async fn test_skip_failed_requests_releases_slot() {
        let policy = RateLimitPolicy {
            skip_failed: true,
            ..Default::default()
        };
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(1), policy))
                .route("/missing", web::get().to(missing)),
        )
        .await;

        for _ in 0..3 {
            let res = test::call_service(
                &app,
                test::TestRequest::get().uri("/missing").to_request(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }
    }

    #[::core::prelude::v1::test]
    fn test_policy_release_rules() {
        let policy = RateLimitPolicy {
            skip_successful: true,
            ..Default::default()
        };
        assert!(policy.releases(StatusCode::OK));
        assert!(!policy.releases(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
