// Console output for `tracing` events
//
// Installed once from the WASM start hook. Native builds never install it, so
// events there reach whatever subscriber the host sets up.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Layer writing this crate's events to `console.{error,warn,info,debug}`
pub struct ConsoleLayer {
    emit: fn(&Level, &str),
}

impl ConsoleLayer {
    pub fn console() -> Self {
        ConsoleLayer { emit: emit_console }
    }

    #[cfg(test)]
    fn with_emitter(emit: fn(&Level, &str)) -> Self {
        ConsoleLayer { emit }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        (self.emit)(metadata.level(), &format_line(metadata.level(), &visitor.finish()));
    }
}

/// Collects the formatted message plus any `key = value` fields
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

fn format_line(level: &Level, message: &str) -> String {
    format!("[draftdesk {}] {}", level, message)
}

/// Install the console subscriber. Repeated calls are ignored.
pub fn init(level: Level) {
    let installed = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(ConsoleLayer::console())
        .try_init();
    if installed.is_err() {
        tracing::debug!("logging: subscriber already installed");
    }
}

#[cfg(target_arch = "wasm32")]
fn emit_console(level: &Level, line: &str) {
    use wasm_bindgen::JsValue;
    use web_sys::console;

    let value = JsValue::from_str(line);
    if *level == Level::ERROR {
        console::error_1(&value);
    } else if *level == Level::WARN {
        console::warn_1(&value);
    } else if *level == Level::INFO {
        console::info_1(&value);
    } else {
        console::debug_1(&value);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit_console(_level: &Level, _line: &str) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn capture(_level: &Level, line: &str) {
        LINES.with(|lines| lines.borrow_mut().push(line.to_string()));
    }

    fn captured(f: impl FnOnce()) -> Vec<String> {
        LINES.with(|lines| lines.borrow_mut().clear());
        let subscriber = tracing_subscriber::registry().with(ConsoleLayer::with_emitter(capture));
        tracing::subscriber::with_default(subscriber, f);
        LINES.with(|lines| lines.borrow().clone())
    }

    #[test]
    fn test_formats_message_and_fields() {
        let lines = captured(|| {
            tracing::warn!("write failed for {}", "premise");
            tracing::debug!(project = "p1", "saved");
        });

        assert_eq!(
            lines,
            vec!["[draftdesk WARN] write failed for premise", "[draftdesk DEBUG] saved project=p1"]
        );
    }

    #[test]
    fn test_skips_foreign_targets() {
        let lines = captured(|| {
            tracing::info!(target: "hyper::client", "connected");
            tracing::info!(target: "draftdesk_core::cache", "hit");
        });

        assert_eq!(lines, vec!["[draftdesk INFO] hit"]);
    }
}
