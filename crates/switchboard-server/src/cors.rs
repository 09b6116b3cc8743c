use http::Method;
use http::header::HeaderName;
use switchboard_config::{AnyOrList, CorsConfig};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new();

    layer = match &config.origins {
        AnyOrList::Any => layer.allow_origin(AllowOrigin::any()),
        AnyOrList::List(origins) => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(origins)
        }
    };

    layer = match &config.methods {
        AnyOrList::Any => layer.allow_methods(AllowMethods::any()),
        AnyOrList::List(methods) => {
            let methods: Vec<Method> = methods.iter().filter_map(|m| m.parse().ok()).collect();
            layer.allow_methods(methods)
        }
    };

    layer = match &config.headers {
        AnyOrList::Any => layer.allow_headers(AllowHeaders::any()),
        AnyOrList::List(headers) => {
            let headers: Vec<HeaderName> = headers.iter().filter_map(|h| h.parse().ok()).collect();
            layer.allow_headers(headers)
        }
    };

    if config.credentials {
        let has_wildcard = [&config.origins, &config.methods, &config.headers]
            .iter()
            .any(|v| **v == AnyOrList::Any);

        // tower-http rejects credentials combined with a wildcard
        if has_wildcard {
            tracing::warn!("cors.credentials ignored because a wildcard is configured");
        } else {
            layer = layer.allow_credentials(true);
        }
    }

    if let Some(duration) = config.max_age() {
        layer = layer.max_age(duration);
    }

    layer
}
