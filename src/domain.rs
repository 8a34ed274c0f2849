use std::io;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;
use tracing_error::SpanTrace;

/// Error type shared by loading, login and the terminal loop.
#[derive(Debug, Error)]
pub enum TDError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("could not read data: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("unknown file type: {}", .0.display())]
    UnknownFileType(PathBuf),
    #[error("section \"{section}\" has no searchable field \"{field}\"")]
    UnknownField { section: String, field: String },
    #[error("login failed: {0}")]
    LoginFailed(String),
    /// An error with the spans that were open where it was raised.
    #[error("{error}")]
    Traced {
        error: Box<TDError>,
        span_trace: SpanTrace,
    },
}

impl TDError {
    /// Attaches the current span trace, unless one is already attached.
    pub fn in_current_span(self) -> Self {
        match self {
            TDError::Traced { .. } => self,
            error => TDError::Traced {
                error: Box::new(error),
                span_trace: SpanTrace::capture(),
            },
        }
    }

    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            TDError::Traced { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }

    /// The error without its trace.
    pub fn root(&self) -> &TDError {
        match self {
            TDError::Traced { error, .. } => error.root(),
            error => error,
        }
    }
}

/// Runtime configuration, assembled once from the command line.
#[derive(Debug, Clone, Setters)]
pub struct DeskConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub data_dir: PathBuf,
    pub login_email: Option<String>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        DeskConfig {
            event_poll_time: 100,
            max_column_width: 24,
            data_dir: PathBuf::from("data"),
            login_email: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    StatusFilter,
    LoginEmail,
    LoginPassword,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Search => "/",
            CMDMode::StatusFilter => "status: ",
            CMDMode::LoginEmail => "email: ",
            CMDMode::LoginPassword => "password: ",
        }
    }

    pub fn masked(&self) -> bool {
        matches!(self, CMDMode::LoginPassword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextSection,
    PrevSection,
    Search,
    StatusFilter,
    ToggleActive,
    TogglePending,
    ToggleInactive,
    ClearFilters,
    ToggleCountScope,
    Enter,
    Exit,
    CopyCell,
    CopyRow,
    Help,
    Reload,
    Logout,
    Login,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
 Navigation
   j / Down, k / Up       move selection
   h / Left, l / Right    scroll columns, previous / next record
   PgUp / PgDown          page up / down
   g / G                  first / last row
   Tab / Shift-Tab        next / previous section

 Filters
   /                      search text (empty clears)
   s                      filter by typed status
   1 / 2 / 3              toggle active / pending / inactive
   c                      clear filters of this section
   a                      count over all records / filtered records

 Records
   Enter                  open record
   Esc                    back
   y / Y                  copy cell / row

 Session
   i                      log in (login screen)
   r                      reload data files
   L                      logout
   ?                      this help
   q                      quit
";
