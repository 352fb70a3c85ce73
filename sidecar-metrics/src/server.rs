use std::net::SocketAddr;

use hyper::{
    header::CONTENT_TYPE,
    service::{make_service_fn, service_fn},
    Body, Request, Response, StatusCode,
};
use prometheus::{Encoder, TextEncoder};
use tracing::{error, info};

use crate::MetricsStopper;

/// Serve `/metrics` from the default registry on a dedicated thread
pub fn bind_metrics(addr: SocketAddr) -> MetricsStopper {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = std::thread::Builder::new()
        .name("metrics server".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("METRICS | could not build runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let server = match hyper::Server::try_bind(&addr) {
                    Ok(builder) => builder.serve(make_service_fn(|_| async {
                        Ok::<_, hyper::Error>(service_fn(serve_req))
                    })),
                    Err(e) => {
                        error!("METRICS | could not bind {}: {}", addr, e);
                        return;
                    }
                };

                let graceful_server = server.with_graceful_shutdown(async {
                    rx.await.ok();
                });
                info!("METRICS | listening on http://{}", addr);
                if let Err(e) = graceful_server.await {
                    error!("metrics server error: {}", e);
                }
                info!("METRICS | server stopped");
            });
        })
        .map_err(|e| error!("METRICS | could not spawn server thread: {}", e))
        .ok();
    MetricsStopper {
        stopper: Some(tx),
        stop_handle: handle,
    }
}

async fn serve_req(req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
    if req.uri().path() != "/metrics" {
        let mut not_found = Response::new(Body::from("Not Found"));
        *not_found.status_mut() = StatusCode::NOT_FOUND;
        return Ok(not_found);
    }

    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("METRICS | failed to encode metrics: {}", e);
        let mut failed = Response::new(Body::empty());
        *failed.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        return Ok(failed);
    }

    let mut response = Response::new(Body::from(buffer));
    if let Ok(content_type) = encoder.format_type().parse() {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}
