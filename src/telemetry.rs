//! Tracing setup shared by binaries and integration tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the embedding application's job. [`init_tracing`] is the standard
//! recipe: an env-filtered fmt layer, defaulting to `error` globally and
//! `info` for this crate when `RUST_LOG` is unset.

use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the default tracing subscriber. Idempotent; safe to call from
/// every test.
pub fn init_tracing() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_span_events(FmtSpan::CLOSE);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("error,patchbay=info"))
            .expect("static filter directive is valid");

        // try_init: the host application may already have a subscriber.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}
