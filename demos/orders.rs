//! API Gateway order lookup behind the common middleware chain.
//!
//! Build for the `provided.al2023` runtime and deploy as `bootstrap`:
//!   cargo build --release --example orders
//!
//! Try (from the console, API Gateway proxy test event):
//!   GET /orders/42      → 200 {"id":"42","status":"shipped"}
//!   GET /orders/0       → 404 {"code":404,"message":"order 0 not found"}
//!   GET /orders         → 400 {"code":400,"message":"missing order id"}

use std::sync::Arc;

use serde::Serialize;

use lambda_chain::events::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use lambda_chain::metrics::TracingOutputter;
use lambda_chain::{BoxError, Context, lambda, logging, middleware, response};

#[derive(Serialize)]
struct Order<'a> {
    id: &'a str,
    status: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), lambda_chain::Error> {
    logging::init();

    let middlewares = middleware::common_api_gateway_v1(Arc::new(TracingOutputter));
    let on_shutdown: Vec<lambda_chain::runtime::ShutdownCallback> =
        vec![Box::new(|| tracing::info!("flushing before shutdown"))];

    lambda::start_with_response(get_order, middlewares, on_shutdown).await
}

// GET /orders/{id}
async fn get_order(ctx: Context, req: ApiGatewayProxyRequest) -> Result<ApiGatewayProxyResponse, BoxError> {
    let Some(id) = req.path_parameters.get("id") else {
        return Ok(response::error(400, "missing order id"));
    };

    tracing::info!(request_id = ctx.field("request_id").unwrap_or_default(), %id, "looking up order");

    if id == "0" {
        return Ok(response::error(404, &format!("order {id} not found")));
    }
    Ok(response::json(200, Some(&Order { id, status: "shipped" })))
}
