use crate::core::config::LoggingConfig;
use crate::core::MonitorError;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

pub fn setup_logger(config: &LoggingConfig) -> Result<(), MonitorError> {
    let level = LevelFilter::from_str(&config.level)
        .map_err(|e| MonitorError::Logger(format!("無効なログレベルです ({}): {}", config.level, e)))?;

    // ビルダーでロガーをカスタマイズ
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        // タイムスタンプ付きのフォーマット
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    // ファイルが指定されていればファイルに、なければ標準出力に出す
    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| MonitorError::Logger(format!("{}: {}", path, e)))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(Target::Stdout);
        }
    }

    builder
        .try_init()
        .map_err(|e| MonitorError::Logger(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_levels() {
        let config = LoggingConfig {
            file: None,
            level: "chatty".to_string(),
        };
        assert!(matches!(setup_logger(&config), Err(MonitorError::Logger(_))));
    }
}
