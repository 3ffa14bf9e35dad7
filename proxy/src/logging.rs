use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Forwarding decisions (which bot
/// answered, which were skipped) are logged at debug by this library and
/// the client binary, so development runs show them; production keeps to
/// dispatch and failure lines.
fn default_filter(is_production: bool) -> &'static str {
    if is_production {
        "botproxy=info,botproxy_client=info,warn"
    } else {
        "botproxy=debug,botproxy_client=debug,reqwest=info"
    }
}

/// Installs the global subscriber, writing to stderr so stdout stays free
/// for the JSON bodies the client prints. `APP_ENV=production` switches to
/// one JSON object per event.
pub fn init_tracing() {
    let is_production = std::env::var("APP_ENV").as_deref() == Ok("production");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(is_production)));

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_writer(std::io::stderr);

    if is_production {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}
