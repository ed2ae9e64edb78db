use env_logger::{Builder, Env, Target};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Install the global logger. `RUST_LOG` overrides the `warn` default.
///
/// The TUI owns stdout/stderr while running, so records go to `log_file`
/// when it can be opened and fall back to stderr otherwise. The fallback is
/// announced on stderr before the terminal switches to raw mode.
pub fn init(log_file: Option<&Path>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("handdrill: logging to stderr, cannot open {}: {e}", path.display()),
        }
    }

    // a second init (tests, reload) keeps the first logger
    let _ = builder.try_init();
}

/// Open `path` for appending, creating its parent directories first.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
