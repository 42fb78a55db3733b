use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

use crate::utils::cart_id::{resolve_cart_id, CART_ID_HEADER};

/// Attaches a [`CartId`](crate::utils::cart_id::CartId) to the request and
/// echoes newly generated ids in the response.
pub async fn cart_id_middleware(mut request: Request, next: Next) -> Response {
    let (cart_id, generated) = resolve_cart_id(request.headers());
    let echoed = generated
        .then(|| HeaderValue::from_str(&cart_id.0).ok())
        .flatten();
    request.extensions_mut().insert(cart_id);

    let mut response = next.run(request).await;
    if let Some(value) = echoed {
        response.headers_mut().insert(CART_ID_HEADER, value);
    }
    response
}
