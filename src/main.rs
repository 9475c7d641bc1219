use std::path::PathBuf;

use log::{error, info, LevelFilter, Log, Metadata, Record};
use spark_transformations::config::WAREHOUSE_DIR_KEY;
use spark_transformations::{tutorial, SparkSession, SparklessConfig};

const DEFAULT_CSV: &str = "data/BigMart_Sales.csv";
const DEFAULT_OUTPUT_DIR: &str = "target/tutorial-output";
const LOG_LEVEL_ENV: &str = "SPARK_TRANSFORMS_LOG";
const SHOW_ROWS: usize = 20;

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

fn level_from_env() -> LevelFilter {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_from_env());
    }

    let mut args = std::env::args().skip(1);
    let csv_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_CSV.to_string()));
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()));

    let config = SparklessConfig::from_env();
    let mut builder = SparkSession::builder()
        .app_name(config.app_name.clone().unwrap_or_else(|| "Spark Transformations".into()))
        .with_config(&config);
    if std::env::var("SPARK_TRANSFORMS_WAREHOUSE_DIR").is_err() {
        builder = builder.config(
            WAREHOUSE_DIR_KEY,
            out_dir.join("spark-warehouse").to_string_lossy().to_string(),
        );
    }
    let spark = builder.get_or_create();

    info!("reading {} and writing to {}", csv_path.display(), out_dir.display());
    let steps = match tutorial::run(&spark, &csv_path, &out_dir) {
        Ok(steps) => steps,
        Err(e) => {
            error!("tutorial failed: {e}");
            std::process::exit(1);
        }
    };
    for (title, df) in &steps {
        println!("== {title}");
        if let Err(e) = df.show(Some(SHOW_ROWS)) {
            error!("show {title}: {e}");
        }
    }
    info!("{} steps done", steps.len());
    if let Err(e) = spark.stop() {
        error!("stop: {e}");
    }
}
