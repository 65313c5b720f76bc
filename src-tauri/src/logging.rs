use log::LevelFilter;
use std::sync::Mutex;
use std::time::Instant;
use env_logger::{Builder, Target};

/// Global timestamp for delta calculation
static LAST_LOG: Mutex<Option<Instant>> = Mutex::new(None);

/// Initialize the logger with delta timestamps
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: LevelFilter) {
    let _ = Builder::new()
        .target(Target::Stdout)
        .format(|buf, record| {
            use std::io::Write;

            let now = Instant::now();
            let delta = {
                let mut last = LAST_LOG.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let delta = last.map(|t| now.duration_since(t).as_millis()).unwrap_or(0);
                *last = Some(now);
                delta
            };

            writeln!(
                buf,
                "{} [+{} ms] [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                delta,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .try_init();
}
