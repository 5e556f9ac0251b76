//! Tracing subscriber setup: stdout, plus an optional plain-text log file.

use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

/// Install the global subscriber. `RUST_LOG` wins over the `info` default.
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let file_layer = match log_file {
        Some(path) => Some(file_layer(path)?),
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// A fmt layer appending to `path`, creating parent directories as needed.
pub fn file_layer<S>(path: &Path) -> io::Result<impl Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layer_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");

        for message in ["first upload stored", "second upload stored"] {
            let subscriber = tracing_subscriber::registry().with(file_layer(&path).unwrap());
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(filename = "abc.png", "{}", message);
            });
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("first upload stored"));
        assert!(contents.contains("second upload stored"));
        assert!(contents.contains("filename=\"abc.png\""));
        assert!(!contents.contains('\u{1b}'));
    }
}
