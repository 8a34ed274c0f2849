use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::TDError;
use crate::records::{Account, Booking, FromRow, Supplier};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

const EXTENSIONS: [&str; 6] = ["csv", "parquet", "pq", "arrow", "ipc", "feather"];

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// One column materialized as text. `None` for null cells.
struct TextColumn {
    name: String,
    data: Vec<Option<String>>,
}

/// A borrowed view on one row of loaded columns.
pub struct Row<'a> {
    columns: &'a [TextColumn],
    idx: usize,
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .and_then(|c| c.data.get(self.idx))
            .and_then(|v| v.as_deref())
    }
}

/// All records available to the console, one collection per dataset file.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    pub suppliers: Vec<Supplier>,
    pub accounts: Vec<Account>,
    pub bookings: Vec<Booking>,
    pub warnings: Vec<String>,
}

impl Dataset {
    /// Loads `suppliers`, `accounts` and `bookings` from `data_dir`.
    /// A missing dataset leaves its collection empty and records a warning.
    #[instrument]
    pub fn load(data_dir: &Path) -> Result<Dataset, TDError> {
        let mut dataset = Dataset::default();
        dataset.suppliers = load_dataset(data_dir, "suppliers", &mut dataset.warnings)?;
        dataset.accounts = load_dataset(data_dir, "accounts", &mut dataset.warnings)?;
        dataset.bookings = load_dataset(data_dir, "bookings", &mut dataset.warnings)?;
        info!(
            "Loaded {} suppliers, {} accounts, {} bookings",
            dataset.suppliers.len(),
            dataset.accounts.len(),
            dataset.bookings.len()
        );
        Ok(dataset)
    }
}

fn load_dataset<R: FromRow>(
    data_dir: &Path,
    name: &str,
    warnings: &mut Vec<String>,
) -> Result<Vec<R>, TDError> {
    match find_dataset_file(data_dir, name) {
        Some(path) => load_records(&path),
        None => {
            let message = format!("No {name} file in {}", data_dir.display());
            warn!("{message}");
            warnings.push(message);
            Ok(Vec::new())
        }
    }
}

fn find_dataset_file(data_dir: &Path, name: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| data_dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}

/// Reads a data file and maps each row to a record by column name.
/// Errors carry the span trace of the failed load.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_records<R: FromRow>(path: &Path) -> Result<Vec<R>, TDError> {
    read_records(path).map_err(TDError::in_current_span)
}

fn read_records<R: FromRow>(path: &Path) -> Result<Vec<R>, TDError> {
    let file_info = get_file_info(path.to_path_buf())?;
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted to text in its own rayon task.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let columns: Result<Vec<TextColumn>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let nrows = df.height();
    let records = (0..nrows)
        .map(|idx| {
            R::from_row(&Row {
                columns: &columns,
                idx,
            })
        })
        .collect::<Vec<R>>();

    let loading_duration = start_time.elapsed().as_millis();
    info!(
        "Loaded {} rows from {} ({} bytes) in {loading_duration}ms",
        nrows,
        file_info.path.display(),
        file_info.file_size
    );
    Ok(records)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<TextColumn, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect::<Vec<Option<String>>>();
    debug!("Column \"{col_name}\": {} values", data.len());
    Ok(TextColumn {
        name: col_name.trim().to_string(),
        data,
    })
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TDError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TDError::FileNotFound(path.clone()),
        ErrorKind::PermissionDenied => TDError::PermissionDenied(path.clone()),
        _ => TDError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TDError::LoadingFailed(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn detect_file_type(path: &Path) -> Result<FileType, TDError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TDError::UnknownFileType(path.to_path_buf())),
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Record, Status};
    use tracing_error::{ErrorLayer, SpanTraceStatus};
    use tracing_subscriber::prelude::*;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    #[test]
    fn detects_file_types() {
        assert_eq!(
            detect_file_type(Path::new("a/suppliers.CSV")).ok(),
            Some(FileType::CSV)
        );
        assert_eq!(
            detect_file_type(Path::new("bookings.pq")).ok(),
            Some(FileType::PARQUET)
        );
        assert_eq!(
            detect_file_type(Path::new("x.feather")).ok(),
            Some(FileType::ARROW)
        );
        assert!(matches!(
            detect_file_type(Path::new("notes.txt")),
            Err(TDError::UnknownFileType(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = load_records::<Supplier>(&data_dir().join("nope.csv"));
        let err = result.unwrap_err();
        assert!(matches!(err.root(), TDError::FileNotFound(_)));
        assert!(err.to_string().starts_with("file not found"));
    }

    #[test]
    fn load_errors_carry_the_loading_span() {
        let subscriber = tracing_subscriber::registry().with(ErrorLayer::default());
        tracing::subscriber::with_default(subscriber, || {
            let err = load_records::<Supplier>(&data_dir().join("nope.csv")).unwrap_err();
            assert!(matches!(err.root(), TDError::FileNotFound(_)));
            let trace = err.span_trace().unwrap();
            assert_eq!(trace.status(), SpanTraceStatus::CAPTURED);
            assert!(trace.to_string().contains("load_records"));
        });
    }

    #[test]
    fn loads_sample_suppliers_with_nested_company() {
        let suppliers = load_records::<Supplier>(&data_dir().join("suppliers.csv")).unwrap();
        assert!(!suppliers.is_empty());
        let first = &suppliers[0];
        assert_eq!(first.id(), "1");
        assert_eq!(first.status(), Some(&Status::Active));
        assert_eq!(first.field("company.name"), Some("Acme Transport"));
        assert_eq!(first.field("company.city"), Some("Makati"));
    }

    #[test]
    fn dataset_loads_every_collection() {
        let dataset = Dataset::load(&data_dir()).unwrap();
        assert!(!dataset.suppliers.is_empty());
        assert!(!dataset.accounts.is_empty());
        assert!(!dataset.bookings.is_empty());
        assert!(dataset.warnings.is_empty());
        assert!(dataset.bookings.iter().any(|b| b.amount.is_some()));
    }

    #[test]
    fn dataset_tolerates_missing_files() {
        let dir = std::env::temp_dir().join("tdesk-empty-dataset");
        fs::create_dir_all(&dir).unwrap();
        let dataset = Dataset::load(&dir).unwrap();
        assert!(dataset.suppliers.is_empty());
        assert_eq!(dataset.warnings.len(), 3);
    }
}
