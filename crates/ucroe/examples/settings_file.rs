use std::io::Write;
use std::sync::Arc;

use ucroe::prelude::*;
use ucroe::FileSettings;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, r#"BACKEND = "ucroe_storage::memory::TtlBackend""#)?;
    writeln!(file, "BACKEND_CONFIG = {{ ttl = 30, maxsize = 500 }}")?;
    writeln!(file, "LOG_EXCEPTION_BY_DEFAULT = true")?;

    // Same resolution as the process-wide instance, but with an explicit file
    let config = GlobalConfig::builder()
        .settings(FileSettings::from_path(file.path()))
        .build();

    println!("backend:        {}", config.backend()?);
    println!("backend config: {:?}", config.backend_config()?);
    println!("log by default: {}", config.log_exception_by_default()?);

    let guard = CachedResultOnException::builder()
        .config(Arc::new(config))
        .build();

    let stock = vec!["apples".to_string(), "pears".to_string()];
    let fresh = guard
        .invoke("inventory", || Ok::<_, std::io::Error>(stock))
        .map_err(|e| e.to_string())?;
    println!("fresh:  {fresh:?}");

    let stale: Vec<String> = guard
        .invoke("inventory", || {
            Err(std::io::Error::other("warehouse API unreachable"))
        })
        .map_err(|e| e.to_string())?;
    println!("stale:  {stale:?}");

    Ok(())
}
