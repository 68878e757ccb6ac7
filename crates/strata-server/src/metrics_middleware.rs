//! Request-latency middleware (SPEC_FULL §10.5 "request latency by route").
//! Grounded on the same `Transform`/`Service` shape as [`crate::auth::SessionAuth`].

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;
use std::time::Instant;

#[derive(Default)]
pub struct RequestMetrics;

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestMetricsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsMiddleware { service: Rc::new(service) }))
    }
}

pub struct RequestMetricsMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let fallback_path = req.path().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let route = match &result {
                Ok(resp) => resp.request().match_pattern().unwrap_or(fallback_path),
                Err(_) => fallback_path,
            };
            strata_engine::metrics::REQUEST_LATENCY.with_label_values(&[&route]).observe(start.elapsed().as_secs_f64());
            result
        })
    }
}
