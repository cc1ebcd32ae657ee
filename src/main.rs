// ==========================================
// 环境监测系统 - 命令行入口
// ==========================================
// 子命令: init-db / preview / confirm
// 输出: stdout 为 JSON，日志写 stderr
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_measurement_import::api::ImportApi;
use env_measurement_import::domain::ImportBatchResult;
use env_measurement_import::logging;
use std::path::PathBuf;

const DB_PATH_ENV: &str = "MEASUREMENT_IMPORT_DB_PATH";

#[derive(Parser)]
#[command(
    name = "measurement-import",
    version,
    about = "Bulk-import measurement results from spreadsheets",
    long_about = "Preview a spreadsheet of measurement results against live reference data,\n\
                  then confirm the preview to persist every row that passes validation."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database path (default: $MEASUREMENT_IMPORT_DB_PATH, then the user data dir).
    #[arg(long = "db", value_name = "PATH", global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database tables if they do not exist.
    InitDb,

    /// Validate a spreadsheet without writing anything.
    Preview {
        /// Spreadsheet to import (.xlsx, .xls, .ods, .csv).
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Emission source used when the file has no source column or a cell is empty.
        #[arg(long = "site", value_name = "ID")]
        default_site_id: Option<i64>,

        /// Write the preview JSON to a file instead of stdout.
        #[arg(long = "output", value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Persist the rows of a preview JSON file (re-validated before writing).
    Confirm {
        /// Preview JSON produced by `preview`.
        #[arg(value_name = "PREVIEW_JSON")]
        preview: PathBuf,

        /// Also submit rows that were invalid at preview time.
        #[arg(long = "include-invalid")]
        include_invalid: bool,
    },
}

/// 数据库路径: --db → 环境变量 → 用户数据目录
fn resolve_db_path(explicit: Option<PathBuf>) -> Result<String> {
    if let Some(path) = explicit {
        return Ok(path.to_string_lossy().to_string());
    }

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let dir = dirs::data_dir()
        .map(|d| d.join("env-measurement-import"))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;

    Ok(dir.join("measurements.db").to_string_lossy().to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let db_path = resolve_db_path(cli.db)?;
    tracing::info!(db_path = %db_path, version = env_measurement_import::VERSION, "使用数据库");

    let api = ImportApi::open(&db_path)?;

    match cli.command {
        Command::InitDb => {
            api.init_database()?;
            println!("Database initialized at {}", db_path);
        }
        Command::Preview {
            file,
            default_site_id,
            output,
        } => {
            let result = api.preview_file(&file, default_site_id).await?;
            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&result)?;
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!(
                        "{} rows ({} valid, {} invalid) written to {}",
                        result.total_rows,
                        result.valid_rows,
                        result.invalid_rows,
                        path.display()
                    );
                }
                None => print_json(&result)?,
            }
        }
        Command::Confirm {
            preview,
            include_invalid,
        } => {
            let raw = std::fs::read_to_string(&preview)
                .with_context(|| format!("failed to read {}", preview.display()))?;
            let batch: ImportBatchResult = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a preview result", preview.display()))?;

            let result = api.confirm_preview(&batch, include_invalid).await?;
            eprintln!("{}", result.message);
            print_json(&result)?;
        }
    }

    Ok(())
}
