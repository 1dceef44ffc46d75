use cfg_if::cfg_if;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};
use tracing_subscriber::util::SubscriberInitExt;

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        pub fn init() {
            // Log to browser console via tracing-wasm; game events stay visible at info
            let filter = EnvFilter::new("info");

            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());

            tracing_subscriber::registry()
                .with(filter)
                .with(wasm_layer)
                .try_init()
                .ok();

            // Panics with stacktrace
            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
        }
    } else {
        use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
        use tracing_subscriber::filter::Targets;
        use tracing_subscriber::{fmt, Layer};
        use tracing::Level;
        use std::env;
        use std::ffi::OsStr;
        use std::io;
        use std::path::Path;
        use once_cell::sync::OnceCell;

        use crate::controller::event_log::EVENTS_TARGET;

        const DEFAULT_LOG_FILE: &str = "logs/swat-piano.log";
        const DEFAULT_EVENT_LOG_FILE: &str = "logs/swat-events.log";

        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
        static EVENT_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// Daily-rolling writer for the file named by `var`, or `default`
        fn rolling_writer(var: &str, default: &str, guard: &OnceCell<WorkerGuard>) -> NonBlocking {
            let log_path = env::var(var).unwrap_or_else(|_| default.to_string());
            let log_path = Path::new(&log_path);
            let fallback = Path::new(default).file_name().unwrap_or(OsStr::new("swat-piano.log"));
            let (writer, g) = tracing_appender::non_blocking(
                tracing_appender::rolling::daily(
                    log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new(".")),
                    log_path.file_name().unwrap_or(fallback),
                )
            );
            let _ = guard.set(g);
            writer
        }

        /// Only game events, from info up
        fn event_filter() -> Targets {
            Targets::new().with_target(EVENTS_TARGET, Level::INFO)
        }

        pub fn init() {
            // Env filter: use RUST_LOG or default to info
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"));

            // Console (stderr) layer with file/line
            let console_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .compact();

            // Full file log (SWAT_LOG_FILE, default logs/swat-piano.log)
            let file_layer = fmt::layer()
                .with_writer(rolling_writer("SWAT_LOG_FILE", DEFAULT_LOG_FILE, &FILE_GUARD))
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .compact();

            // Hit/miss session log (SWAT_EVENT_LOG); kept even when RUST_LOG silences info
            let event_layer = fmt::layer()
                .with_writer(rolling_writer("SWAT_EVENT_LOG", DEFAULT_EVENT_LOG_FILE, &EVENT_GUARD))
                .with_ansi(false)
                .with_target(false)
                .with_level(false)
                .with_filter(event_filter());

            tracing_subscriber::registry()
                .with(console_layer.and_then(file_layer).with_filter(filter))
                .with(event_layer)
                .try_init()
                .ok();

            // Hook panics to log with backtrace
            std::panic::set_hook(Box::new(|info| {
                let mut msg = String::new();
                if let Some(loc) = info.location() {
                    msg.push_str(&format!("panic at {}:{}:{} ", loc.file(), loc.line(), loc.column()));
                }
                if let Some(s) = info.payload().downcast_ref::<&str>() { msg.push_str(s); }
                else if let Some(s) = info.payload().downcast_ref::<String>() { msg.push_str(s); }
                else { msg.push_str("<non-string panic>"); }
                let bt = std::backtrace::Backtrace::force_capture();
                tracing::error!("{}\nBacktrace:\n{:?}", msg, bt);
            }));
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_event_file_only_takes_game_events() {
        let filter = event_filter();
        assert!(filter.would_enable(EVENTS_TARGET, &Level::INFO));
        assert!(!filter.would_enable(EVENTS_TARGET, &Level::TRACE));
        assert!(!filter.would_enable("swat_piano::controller::frame_loop", &Level::INFO));
        assert!(!filter.would_enable("wgpu_core", &Level::WARN));
    }
}
