use plclk_gateway_error::{PlclkError, PlclkResult};
use plclk_gateway_models::settings::Log;
use tracing::{subscriber::set_global_default, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, Layer, Registry};

/// Console plus daily-rolling file logging. The file guard must stay alive
/// for the process lifetime or buffered log lines are lost.
pub struct Logger {
    _file_guard: WorkerGuard,
}

impl Logger {
    pub fn init(settings: &Log) -> PlclkResult<Self> {
        let level: Level = settings.level.parse().unwrap_or(Level::INFO);

        let file_appender = rolling::daily(&settings.dir, "plclk-gateway.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

        let console_layer = {
            #[cfg(debug_assertions)]
            let layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stdout)
                .with_file(true)
                .with_line_number(true);

            #[cfg(not(debug_assertions))]
            let layer = fmt::layer().with_writer(std::io::stdout);

            layer.with_filter(LevelFilter::from_level(level))
        };

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_filter(LevelFilter::from_level(level));

        let subscriber = Registry::default().with(console_layer).with(file_layer);
        set_global_default(subscriber).map_err(|_| PlclkError::from("Failed to set logger"))?;

        Ok(Logger {
            _file_guard: file_guard,
        })
    }
}
