use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use ucroe::prelude::*;

#[derive(Debug, thiserror::Error)]
enum QuoteError {
    #[error("quote service timed out (attempt {0})")]
    Timeout(usize),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

/// Pretend upstream that fails on every third attempt
#[cached_result_on_exception(log_exception = true)]
fn eur_usd() -> Result<f64, QuoteError> {
    let attempt = ATTEMPTS.fetch_add(1, Ordering::SeqCst);
    if attempt % 3 == 2 {
        return Err(QuoteError::Timeout(attempt));
    }
    Ok(1.08 + attempt as f64 / 100.0)
}

#[cached_result_on_exception]
fn never_works() -> Result<f64, QuoteError> {
    Err(QuoteError::Timeout(0))
}

fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    println!("Fetching quotes...");
    for _ in 0..6 {
        match eur_usd() {
            Ok(rate) => println!("  EUR/USD = {rate:.2}"),
            Err(e) => println!("  failed: {e}"),
        }
    }

    // Nothing was ever cached, so the original error comes back
    match never_works() {
        Ok(rate) => println!("Unexpected rate {rate}"),
        Err(e) => println!("No cached value yet: {e}"),
    }
}
