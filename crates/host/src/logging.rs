//! Forwards `tracing` events to the browser console.

use std::fmt::{self, Write};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleMethod {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<&Level> for ConsoleMethod {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => ConsoleMethod::Error,
            Level::WARN => ConsoleMethod::Warn,
            Level::INFO => ConsoleMethod::Info,
            _ => ConsoleMethod::Debug,
        }
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let line = format_line(meta.target(), &visitor.message, &visitor.fields);
        let line = wasm_bindgen::JsValue::from_str(&line);
        match ConsoleMethod::from(meta.level()) {
            ConsoleMethod::Error => web_sys::console::error_1(&line),
            ConsoleMethod::Warn => web_sys::console::warn_1(&line),
            ConsoleMethod::Info => web_sys::console::info_1(&line),
            ConsoleMethod::Debug => web_sys::console::debug_1(&line),
        }
    }
}

fn format_line(target: &str, message: &str, fields: &str) -> String {
    format!("[{target}] {message}{fields}")
}

/// Installs the console layer as the global subscriber. A second call is a
/// no-op.
pub fn install(max_level: LevelFilter) {
    let _ = tracing_subscriber::registry()
        .with(ConsoleLayer.with_filter(max_level))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_console_methods() {
        assert_eq!(ConsoleMethod::from(&Level::ERROR), ConsoleMethod::Error);
        assert_eq!(ConsoleMethod::from(&Level::WARN), ConsoleMethod::Warn);
        assert_eq!(ConsoleMethod::from(&Level::INFO), ConsoleMethod::Info);
        assert_eq!(ConsoleMethod::from(&Level::TRACE), ConsoleMethod::Debug);
    }

    #[test]
    fn line_carries_target_and_fields() {
        assert_eq!(
            format_line("sim_core::coordinator", "agent count applied", " previous=100 current=200"),
            "[sim_core::coordinator] agent count applied previous=100 current=200"
        );
    }
}
