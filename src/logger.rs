use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;

/// Logs to the terminal: the target right-aligned and colored by severity,
/// then the message.
pub struct Terminal(LevelFilter);

impl Terminal {
    /// Level from the `ICE3D_LOG` variable (`error` to `trace`), `info` by
    /// default.
    pub fn level_from_env() -> LevelFilter {
        std::env::var("ICE3D_LOG")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(LevelFilter::Info)
    }

    pub fn install(level: LevelFilter) {
        if log::set_logger(Box::leak(Box::new(Terminal(level)))).is_ok() {
            log::set_max_level(level);
        }
    }
}

impl Log for Terminal {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.0
    }

    #[allow(unused_must_use)]
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = record.target().rsplit("::").next().unwrap_or_default();
        match term::stdout() {
            Some(mut output) => {
                if record.level() < Level::Info {
                    output.fg(term::color::RED);
                } else {
                    output.fg(term::color::GREEN);
                }
                write!(output, "{:>14}", target);
                output.reset();
                writeln!(output, " {}", record.args());
            }
            None => println!("{:>14} {}", target, record.args()),
        }
    }

    fn flush(&self) {
        std::io::stdout().flush().ok();
    }
}
