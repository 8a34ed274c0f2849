use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{CMDMode, DeskConfig, HELP_TEXT, Message, TDError};
use crate::filter::FilterCriteria;
use crate::inputter::{InputResult, Inputter};
use crate::loader::Dataset;
use crate::portal::Portal;
use crate::records::Status as RecordStatus;
use crate::section::{CountScope, SectionView, Summary};
use crate::session::{Route, authenticate};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH, SUMMARY_HEIGHT, TABLE_HEADER_HEIGHT,
    TABS_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    LOGIN,
    TABLE,
    RECORD,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

/// Cursor and scroll state of one section's table.
#[derive(Default)]
struct TableView {
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    visible_width: usize,
    widths: Vec<usize>, // Natural width per column over the whole base collection
    data: Vec<ColumnView>,
}

impl TableView {
    fn abs_row(&self) -> usize {
        self.offset_row + self.curser_row
    }

    // Moves the cursor to `abs` and scrolls just enough to keep it visible.
    fn select_row(&mut self, abs: usize, height: usize) {
        let height = height.max(1);
        if abs < self.offset_row {
            self.offset_row = abs;
        } else if abs >= self.offset_row + height {
            self.offset_row = abs + 1 - height;
        }
        self.curser_row = abs - self.offset_row;
    }

    fn reset_rows(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
    }
}

#[derive(Default)]
struct RecordView {
    position: usize, // Index into the section's derived rows
    header_data: Vec<String>,
    header_width: usize,
    header_view: ColumnView,
    row_data: Vec<String>,
    row_view: ColumnView,
    curser_row: usize,
    curser_offset: usize,
    height: usize,
    width: usize,
}

pub struct UIData {
    pub name: String,
    pub tabs: Vec<String>,
    pub selected_tab: usize,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows in the derived view
    pub base_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub summary: Option<Summary>,
    pub count_scope: CountScope,
    pub criteria: FilterCriteria,
    pub login: bool,
    pub session_label: Option<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub last_update: Instant,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            tabs: Vec::new(),
            selected_tab: 0,
            table: Vec::new(),
            nrows: 0,
            base_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            summary: None,
            count_scope: CountScope::Base,
            criteria: FilterCriteria::default(),
            login: true,
            session_label: None,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            last_update: Instant::now(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub statusline_width: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_width = ui_width.saturating_sub(SCROLLBAR_WIDTH);
        let table_height = ui_height
            .saturating_sub(TABS_HEIGHT)
            .saturating_sub(SUMMARY_HEIGHT)
            .saturating_sub(CMDLINE_HEIGH)
            .saturating_sub(TABLE_HEADER_HEIGHT);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width,
            table_height,
            statusline_width: ui_width,
            statusline_height: CMDLINE_HEIGH,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: DeskConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Dataset,
    portal: Option<Portal>,
    current_section: usize,
    tables: Vec<TableView>,
    record_view: RecordView,
    count_scope: CountScope,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    pending_email: String,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &DeskConfig, ui_width: usize, ui_height: usize) -> Result<Self, TDError> {
        let dataset = Dataset::load(&config.data_dir)?;
        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!("Clipboard not available: {e}");
                None
            }
        };

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::LOGIN,
            previous_modus: Modus::LOGIN,
            dataset,
            portal: None,
            current_section: 0,
            tables: Vec::new(),
            record_view: RecordView::default(),
            count_scope: CountScope::Base,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            pending_email: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };

        let warnings = model.dataset.warnings.join("; ");
        model.update_uidata_for_table();
        match config.login_email.clone() {
            Some(email) => {
                model.pending_email = email;
                model.enter_cmd_mode(CMDMode::LoginPassword);
            }
            None => model.enter_cmd_mode(CMDMode::LoginEmail),
        }
        if warnings.is_empty() {
            model.set_status_message("Please log in");
        } else {
            model.set_status_message(warnings);
        }
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn route(&self) -> Route {
        self.portal
            .as_ref()
            .map(|p| p.route())
            .unwrap_or(Route::Login)
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TDError> {
        let Some(msg) = message else {
            return Ok(());
        };
        if msg == Message::Quit {
            self.quit();
            return Ok(());
        }
        if let Message::Resize(width, height) = msg {
            self.ui_resize(width, height);
            return Ok(());
        }

        match self.modus {
            Modus::LOGIN => match msg {
                Message::Login => self.enter_cmd_mode(CMDMode::LoginEmail),
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::TABLE => match msg {
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageUp => self.move_table_selection_up(self.uilayout.table_height),
                Message::MovePageDown => {
                    self.move_table_selection_down(self.uilayout.table_height)
                }
                Message::MoveBeginning => self.move_table_selection_beginning(),
                Message::MoveEnd => self.move_table_selection_end(),
                Message::NextSection => self.switch_section(1),
                Message::PrevSection => self.switch_section(-1),
                Message::Search => self.enter_cmd_mode(CMDMode::Search),
                Message::StatusFilter => self.enter_cmd_mode(CMDMode::StatusFilter),
                Message::ToggleActive => self.toggle_status(RecordStatus::Active),
                Message::TogglePending => self.toggle_status(RecordStatus::Pending),
                Message::ToggleInactive => self.toggle_status(RecordStatus::Inactive),
                Message::ClearFilters => self.clear_filters(),
                Message::ToggleCountScope => self.toggle_count_scope(),
                Message::Enter => self.enter(),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::Reload => self.reload(),
                Message::Logout => self.logout(),
                _ => (),
            },
            Modus::RECORD => match msg {
                Message::MoveDown => self.move_record_selection_down(1),
                Message::MoveUp => self.move_record_selection_up(1),
                Message::MovePageDown => self.move_record_selection_down(10),
                Message::MovePageUp => self.move_record_selection_up(10),
                Message::MoveLeft => self.previous_record(),
                Message::MoveRight => self.next_record(),
                Message::CopyCell => self.copy_record_cell(),
                Message::Help => self.show_help(),
                Message::Exit => self.exit(),
                Message::Logout => self.logout(),
                _ => (),
            },
            Modus::POPUP => {
                if matches!(msg, Message::Exit | Message::Enter | Message::Help) {
                    self.exit()
                }
            }
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }

    // -------------------- Session handling ---------------------- //

    fn login(&mut self, password: &str) {
        let email = std::mem::take(&mut self.pending_email);
        let opened = authenticate(&self.dataset.accounts, &email, password)
            .and_then(|session| Portal::open(session, &self.dataset));
        match opened {
            Ok(portal) => {
                let label = format!(
                    "{} ({})",
                    portal.session().name,
                    portal.session().role.label()
                );
                info!("Opened {:?} for {}", portal.route(), portal.session().email);
                self.tables = (0..portal.len()).map(|_| TableView::default()).collect();
                self.portal = Some(portal);
                self.current_section = 0;
                self.count_scope = CountScope::Base;
                self.modus = Modus::TABLE;
                self.previous_modus = Modus::LOGIN;
                self.refresh_column_widths();
                self.update_table_data();
                self.set_status_message(format!("Welcome {label}"));
            }
            Err(e) => {
                warn!("{e}");
                self.modus = Modus::LOGIN;
                self.enter_cmd_mode(CMDMode::LoginEmail);
                self.set_status_message(e.to_string());
            }
        }
    }

    fn logout(&mut self) {
        if let Some(portal) = self.portal.take() {
            info!("Logged out {}", portal.session().email);
        }
        self.tables.clear();
        self.current_section = 0;
        self.modus = Modus::LOGIN;
        self.previous_modus = Modus::LOGIN;
        self.update_uidata_for_table();
        self.enter_cmd_mode(CMDMode::LoginEmail);
        self.set_status_message("Logged out");
    }

    fn reload(&mut self) {
        let start_time = std::time::Instant::now();
        match Dataset::load(&self.config.data_dir) {
            Ok(dataset) => {
                self.dataset = dataset;
                if let Some(portal) = self.portal.as_mut() {
                    portal.refresh(&self.dataset);
                }
                self.refresh_column_widths();
                for table in self.tables.iter_mut() {
                    table.reset_rows();
                }
                self.update_table_data();
                let duration = start_time.elapsed().as_millis();
                if self.dataset.warnings.is_empty() {
                    self.set_status_message(format!("Reloaded data in {duration}ms"));
                } else {
                    let warnings = self.dataset.warnings.join("; ");
                    self.set_status_message(warnings);
                }
            }
            Err(e) => {
                error!("Reload failed: {e}");
                self.set_status_message(format!("Reload failed: {e}"));
            }
        }
    }

    // -------------------- Filters ---------------------- //

    fn with_section<F: FnOnce(&mut dyn SectionView)>(&mut self, f: F) {
        let Some(section) = self
            .portal
            .as_mut()
            .and_then(|p| p.section_mut(self.current_section))
        else {
            return;
        };
        f(section);
        if let Some(table) = self.tables.get_mut(self.current_section) {
            table.reset_rows();
        }
        self.update_table_data();
    }

    fn toggle_status(&mut self, status: RecordStatus) {
        self.with_section(|section| section.set_status_filter(status));
        let message = match &self.uidata.criteria.status_filter {
            Some(s) => format!("{} {s} records", self.uidata.nrows),
            None => format!("{} records", self.uidata.nrows),
        };
        self.set_status_message(message);
    }

    fn clear_filters(&mut self) {
        self.with_section(|section| section.clear_filters());
        self.set_status_message("Filters cleared");
    }

    fn search(&mut self, text: &str) {
        let start_time = Instant::now();
        self.with_section(|section| section.set_search_text(text));
        trace!(
            "Search for \"{text}\" took {}ms",
            start_time.elapsed().as_millis()
        );
        if self.uidata.nrows == 0 {
            self.set_status_message("Found no matches!");
        } else {
            self.set_status_message(format!("Found {} results", self.uidata.nrows));
        }
    }

    fn toggle_count_scope(&mut self) {
        self.count_scope = self.count_scope.toggled();
        self.update_table_data();
        self.set_status_message(format!("Counting {} records", self.count_scope.label()));
    }

    fn switch_section(&mut self, step: isize) {
        let Some(portal) = self.portal.as_ref() else {
            return;
        };
        let n = portal.len() as isize;
        if n == 0 {
            return;
        }
        self.current_section = (self.current_section as isize + step).rem_euclid(n) as usize;
        trace!("Switched to section {}", self.current_section);
        self.update_table_data();
    }

    // -------------------- Command line ---------------------- //

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.uidata.cmdinput = self.last_input.clone();
            self.uidata.last_update = Instant::now();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?}", mode);
        if self.modus != Modus::CMDINPUT {
            self.previous_modus = self.modus;
        }
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        let prefill = match mode {
            CMDMode::Search => self.uidata.criteria.search_text.clone(),
            _ => String::new(),
        };
        self.input.start(&prefill, mode.masked());
        self.last_input = self.input.get();

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.last_update = Instant::now();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input for {:?}", self.cmd_mode);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.uidata.active_cmdinput = self.active_cmdinput;

        let cmd_input = self.last_input.input.clone();
        let canceled = self.last_input.canceled;
        let mode = self.cmd_mode.take();
        self.uidata.cmd_mode = None;

        match mode {
            Some(CMDMode::Search) if !canceled => self.search(&cmd_input),
            Some(CMDMode::StatusFilter) if !canceled => match RecordStatus::parse(&cmd_input) {
                Some(status) => self.toggle_status(status),
                None => self.set_status_message("No status given"),
            },
            Some(CMDMode::LoginEmail) => {
                if canceled {
                    self.set_status_message("Press i to log in");
                } else if cmd_input.trim().is_empty() {
                    self.enter_cmd_mode(CMDMode::LoginEmail);
                } else {
                    self.pending_email = cmd_input.trim().to_string();
                    self.enter_cmd_mode(CMDMode::LoginPassword);
                }
            }
            Some(CMDMode::LoginPassword) => {
                if canceled {
                    self.pending_email.clear();
                    self.enter_cmd_mode(CMDMode::LoginEmail);
                } else {
                    self.login(&cmd_input);
                }
            }
            _ => debug!("Command input canceled"),
        }
    }

    // -------------------- Views ---------------------- //

    fn enter(&mut self) {
        if self.modus != Modus::TABLE {
            return;
        }
        let Some(table) = self.tables.get(self.current_section) else {
            return;
        };
        if self.uidata.nrows == 0 {
            return;
        }
        let position = table.abs_row();
        self.previous_modus = Modus::TABLE;
        self.modus = Modus::RECORD;
        self.build_record_view(position);
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::RECORD => {
                self.previous_modus = Modus::RECORD;
                self.modus = Modus::TABLE;
                self.update_table_data();
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.uidata.show_popup = false;
                self.uidata.last_update = Instant::now();
            }
            Modus::TABLE | Modus::LOGIN | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);

        // A popup covers the view it was opened from, rebuild that one
        let view = if self.modus == Modus::POPUP {
            self.previous_modus
        } else {
            self.modus
        };
        let popup_message = std::mem::take(&mut self.uidata.popup_message);
        match view {
            Modus::RECORD => self.build_record_view(self.record_view.position),
            _ => self.update_table_data(),
        }
        if self.modus == Modus::POPUP {
            self.uidata.popup_message = popup_message;
            self.uidata.show_popup = true;
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
        self.uidata.last_update = Instant::now();
    }

    fn refresh_column_widths(&mut self) {
        let Some(portal) = self.portal.as_ref() else {
            return;
        };
        for (idx, table) in self.tables.iter_mut().enumerate() {
            if let Some(section) = portal.section(idx) {
                table.widths = Self::natural_widths(section);
            }
        }
    }

    fn natural_widths(section: &dyn SectionView) -> Vec<usize> {
        let columns = section.columns();
        columns
            .iter()
            .map(|column| {
                (0..section.base_len())
                    .map(|row| section.cell(row, column).chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(column.chars().count())
            })
            .collect()
    }

    fn update_table_data(&mut self) {
        let max_column_width = self.config.max_column_width;
        let table_width = self.uilayout.table_width;
        let table_height = self.uilayout.table_height;

        let (Some(portal), Some(table)) = (
            self.portal.as_ref(),
            self.tables.get_mut(self.current_section),
        ) else {
            self.update_uidata_for_table();
            return;
        };
        let Some(section) = portal.section(self.current_section) else {
            self.update_uidata_for_table();
            return;
        };

        let rows = section.rows();
        let columns = section.columns();

        // Filters can shrink the view below the cursor
        if rows.is_empty() {
            table.reset_rows();
        } else if table.abs_row() >= rows.len() {
            table.select_row(rows.len() - 1, table_height);
        }
        table.offset_column = table.offset_column.min(columns.len().saturating_sub(1));

        let rbegin = table.offset_row;
        let rend = std::cmp::min(rbegin + table_height, rows.len());

        trace!(
            "Table {}: Cr {}, Cc {}, Or {}, Oc {}, Rb {}, Re {}, tw: {}, th: {}",
            section.name(),
            table.curser_row,
            table.curser_column,
            table.offset_row,
            table.offset_column,
            rbegin,
            rend,
            table_width,
            table_height
        );

        // Create a list of columns that fit in the table
        table.visible_columns = Vec::new();
        let mut render_widths = Vec::new();
        let mut visible_width = 0;
        for cidx in table.offset_column..columns.len() {
            let natural = table.widths.get(cidx).copied().unwrap_or(0) + COLUMN_WIDTH_MARGIN;
            let width = std::cmp::min(natural, max_column_width);
            if visible_width + width + 1 <= table_width {
                table.visible_columns.push(cidx);
                render_widths.push(width);
                visible_width += width + 1;
            } else {
                // Add the last partial visible column
                if visible_width < table_width {
                    let remaining_width = table_width - visible_width;
                    table.visible_columns.push(cidx);
                    render_widths.push(remaining_width);
                    visible_width += remaining_width;
                }
                break;
            }
        }
        table.visible_width = visible_width;
        table.curser_column = std::cmp::min(
            table.curser_column,
            table.visible_columns.len().saturating_sub(1),
        );

        table.data = table
            .visible_columns
            .iter()
            .zip(render_widths)
            .map(|(&cidx, width)| {
                let column = columns[cidx];
                ColumnView {
                    name: Self::get_visible_name(column, width),
                    width,
                    data: rows[rbegin..rend]
                        .iter()
                        .map(|&ridx| section.cell(ridx, column))
                        .collect(),
                }
            })
            .collect();

        self.update_uidata_for_table();
    }

    fn update_uidata_for_table(&mut self) {
        let layout = self.uilayout.clone();
        let cmdinput = self.last_input.clone();
        let status_message = self.status_message.clone();

        let (Some(portal), Some(table)) = (
            self.portal.as_ref(),
            self.tables.get(self.current_section),
        ) else {
            let mut uidata = UIData::empty();
            uidata.name = Route::Login.title().to_string();
            uidata.layout = layout;
            uidata.cmdinput = cmdinput;
            uidata.cmd_mode = self.cmd_mode;
            uidata.active_cmdinput = self.active_cmdinput;
            uidata.status_message = status_message;
            uidata.last_status_message_update = self.last_status_message_update;
            self.uidata = uidata;
            return;
        };
        let section = portal.section(self.current_section);

        self.uidata = UIData {
            name: portal.route().title().to_string(),
            tabs: portal
                .section_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            selected_tab: self.current_section,
            table: table.data.clone(),
            nrows: section.map(|s| s.rows().len()).unwrap_or(0),
            base_rows: section.map(|s| s.base_len()).unwrap_or(0),
            selected_row: table.curser_row,
            selected_column: table.curser_column,
            abs_selected_row: table.abs_row(),
            summary: section.map(|s| s.counts(self.count_scope)),
            count_scope: self.count_scope,
            criteria: section.map(|s| s.criteria().clone()).unwrap_or_default(),
            login: false,
            session_label: Some(format!(
                "{} <{}>",
                portal.session().name,
                portal.session().email
            )),
            show_popup: false,
            popup_message: String::new(),
            layout,
            last_update: Instant::now(),
            cmdinput,
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message,
            last_status_message_update: self.last_status_message_update,
        }
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return "".to_string();
        }
        if name.chars().count() > width {
            let mut reduced_name: String = name.chars().take(width - 3).collect();
            reduced_name.push_str("...");
            reduced_name
        } else {
            name.to_string()
        }
    }

    // -------------------- Record view ---------------------- //

    fn build_record_view(&mut self, position: usize) {
        trace!("Building record view for position {position}");
        let height = self.uilayout.table_height;
        let width = self.uilayout.table_width;
        let record = &mut self.record_view;
        record.position = position;
        record.curser_offset = 0;
        record.curser_row = 0;
        record.height = height;
        record.width = width;
        self.update_record_data();
    }

    fn update_record_data(&mut self) {
        let Some(section) = self
            .portal
            .as_ref()
            .and_then(|p| p.section(self.current_section))
        else {
            return;
        };
        let rows = section.rows();
        let record = &mut self.record_view;
        let Some(&ridx) = rows.get(record.position) else {
            return;
        };

        let (headers, values): (Vec<String>, Vec<String>) =
            section.details(ridx).into_iter().unzip();
        record.header_width = headers
            .iter()
            .map(|h| h.chars().count())
            .max()
            .unwrap_or(0)
            + COLUMN_WIDTH_MARGIN;
        record.header_data = headers;
        record.row_data = values;

        let rbegin = record.curser_offset;
        let rend = std::cmp::min(rbegin + record.height, record.row_data.len());

        record.header_view = ColumnView {
            name: "Field".to_string(),
            data: record.header_data[rbegin..rend].to_vec(),
            width: record.header_width,
        };
        record.row_view = ColumnView {
            name: "Value".to_string(),
            data: record.row_data[rbegin..rend].to_vec(),
            width: record.width.saturating_sub(record.header_width),
        };

        self.update_uidata_for_record();
    }

    fn update_uidata_for_record(&mut self) {
        self.update_uidata_for_table();
        let record = &self.record_view;
        let uidata = &mut self.uidata;
        uidata.name = format!("{} / record {}", uidata.name, record.position + 1);
        uidata.table = vec![record.header_view.clone(), record.row_view.clone()];
        uidata.selected_row = record.curser_row;
        uidata.selected_column = 1;
        uidata.abs_selected_row = record.position;
        uidata.last_update = Instant::now();
    }

    fn previous_record(&mut self) {
        let record = &mut self.record_view;
        if record.position > 0 {
            record.position -= 1;
            self.update_record_data();
        }
    }

    fn next_record(&mut self) {
        if self.record_view.position + 1 < self.uidata.nrows {
            self.record_view.position += 1;
            self.update_record_data();
        }
    }

    fn move_record_selection_up(&mut self, size: usize) {
        let record = &mut self.record_view;
        if record.curser_row > 0 {
            record.curser_row = record.curser_row.saturating_sub(size);
        } else if record.curser_offset > 0 {
            record.curser_offset = record.curser_offset.saturating_sub(size);
        }
        self.update_record_data();
    }

    fn move_record_selection_down(&mut self, size: usize) {
        let record = &mut self.record_view;
        let last = record.row_data.len().saturating_sub(1);
        let abs = std::cmp::min(record.curser_offset + record.curser_row + size, last);
        let height = record.height.max(1);
        if abs >= record.curser_offset + height {
            record.curser_offset = abs + 1 - height;
        }
        record.curser_row = abs - record.curser_offset;
        self.update_record_data();
    }

    // -------------------- Table movement ---------------------- //

    fn current_table(&mut self) -> Option<&mut TableView> {
        self.tables.get_mut(self.current_section)
    }

    fn move_table_selection_beginning(&mut self) {
        if let Some(table) = self.current_table() {
            table.reset_rows();
        }
        self.update_table_data();
    }

    fn move_table_selection_end(&mut self) {
        let nrows = self.uidata.nrows;
        let height = self.uilayout.table_height;
        if let Some(table) = self.current_table()
            && nrows > 0
        {
            table.select_row(nrows - 1, height);
        }
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        let height = self.uilayout.table_height;
        if let Some(table) = self.current_table() {
            let abs = table.abs_row().saturating_sub(size);
            table.select_row(abs, height);
        }
        self.update_table_data();
    }

    fn move_table_selection_down(&mut self, size: usize) {
        let nrows = self.uidata.nrows;
        let height = self.uilayout.table_height;
        if let Some(table) = self.current_table()
            && nrows > 0
        {
            let abs = std::cmp::min(table.abs_row() + size, nrows - 1);
            table.select_row(abs, height);
        }
        self.update_table_data();
    }

    fn move_table_selection_left(&mut self) {
        if let Some(table) = self.current_table() {
            if table.curser_column > 0 {
                table.curser_column -= 1;
            } else if table.offset_column > 0 {
                table.offset_column -= 1;
            }
        }
        self.update_table_data();
    }

    fn move_table_selection_right(&mut self) {
        let ncolumns = self
            .portal
            .as_ref()
            .and_then(|p| p.section(self.current_section))
            .map(|s| s.columns().len())
            .unwrap_or(0);
        let table_width = self.uilayout.table_width;
        if let Some(table) = self.current_table() {
            if table.curser_column + table.offset_column + 1 < ncolumns {
                if table.curser_column + 1 < table.visible_columns.len() {
                    table.curser_column += 1;
                } else {
                    table.offset_column += 1;
                }
            } else if table.visible_width > table_width
                && table.offset_column + 1 < ncolumns
            {
                table.offset_column += 1;
            }
        }
        self.update_table_data();
    }

    // -------------------- Clipboard ---------------------- //

    fn selected_cell(&self) -> Option<String> {
        let section = self.portal.as_ref()?.section(self.current_section)?;
        let table = self.tables.get(self.current_section)?;
        let ridx = *section.rows().get(table.abs_row())?;
        let column = *table.visible_columns.get(table.curser_column)?;
        Some(section.cell(ridx, section.columns()[column]))
    }

    fn selected_row(&self) -> Option<String> {
        let section = self.portal.as_ref()?.section(self.current_section)?;
        let table = self.tables.get(self.current_section)?;
        let ridx = *section.rows().get(table.abs_row())?;
        let content = section
            .columns()
            .iter()
            .map(|column| Self::wrap_cell_content(&section.cell(ridx, column)))
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_table_cell(&mut self) {
        if let Some(cell) = self.selected_cell() {
            trace!("Cell content: {}", cell);
            self.set_clipboard(cell);
        }
    }

    fn copy_table_row(&mut self) {
        if let Some(row) = self.selected_row() {
            self.set_clipboard(row);
        }
    }

    fn copy_record_cell(&mut self) {
        let record = &self.record_view;
        if let Some(cell) = record
            .row_data
            .get(record.curser_offset + record.curser_row)
            .cloned()
        {
            self.set_clipboard(cell);
        }
    }

    fn set_clipboard(&mut self, content: String) {
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(content).map_err(|e| e.to_string()),
            None => Err("clipboard not available".to_string()),
        };
        match result {
            Ok(_) => {
                trace!("Copied content to clipboard.");
                self.set_status_message("Copied to clipboard");
            }
            Err(e) => {
                warn!("Error copying to clipboard: {e}");
                self.set_status_message(format!("Copy failed: {e}"));
            }
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::path::PathBuf;

    fn config() -> DeskConfig {
        DeskConfig::default()
            .data_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"))
            .max_column_width(20)
    }

    fn type_line(model: &mut Model, text: &str) {
        for c in text.chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
            model.update(Some(Message::RawKey(key))).unwrap();
        }
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(enter))).unwrap();
    }

    fn logged_in(email: &str) -> Model {
        let mut model = Model::init(&config(), 120, 30).unwrap();
        type_line(&mut model, email);
        type_line(&mut model, "secret");
        model
    }

    #[test]
    fn starts_at_login_prompt() {
        let model = Model::init(&config(), 120, 30).unwrap();
        assert_eq!(model.route(), Route::Login);
        assert!(model.raw_keyevents());
        assert_eq!(model.get_uidata().cmd_mode, Some(CMDMode::LoginEmail));
        assert!(model.get_uidata().login);
    }

    #[test]
    fn failed_login_returns_to_email_prompt() {
        let mut model = Model::init(&config(), 120, 30).unwrap();
        type_line(&mut model, "former@traveldesk.ph");
        assert_eq!(model.get_uidata().cmd_mode, Some(CMDMode::LoginPassword));
        type_line(&mut model, "secret");
        assert_eq!(model.route(), Route::Login);
        assert_eq!(model.get_uidata().cmd_mode, Some(CMDMode::LoginEmail));
        assert!(model.get_uidata().status_message.contains("not active"));
    }

    #[test]
    fn escape_leaves_login_prompt() {
        let mut model = Model::init(&config(), 120, 30).unwrap();
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(esc))).unwrap();
        assert!(!model.raw_keyevents());
        assert_eq!(model.route(), Route::Login);
        assert_eq!(model.get_uidata().cmd_mode, None);

        model.update(Some(Message::Help)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);

        model.update(Some(Message::Login)).unwrap();
        assert!(model.raw_keyevents());
        assert_eq!(model.get_uidata().cmd_mode, Some(CMDMode::LoginEmail));
        type_line(&mut model, "booker@globex.ph");
        type_line(&mut model, "pw");
        assert_eq!(model.route(), Route::UserDashboard);
    }

    #[test]
    fn prefilled_email_asks_for_password() {
        let config = config().login_email(Some("admin@traveldesk.ph".to_string()));
        let mut model = Model::init(&config, 120, 30).unwrap();
        assert_eq!(model.get_uidata().cmd_mode, Some(CMDMode::LoginPassword));
        type_line(&mut model, "pw");
        assert_eq!(model.route(), Route::AdminDashboard);
    }

    #[test]
    fn admin_dashboard_shows_sections_and_counts() {
        let model = logged_in("admin@traveldesk.ph");
        let ui = model.get_uidata();
        assert_eq!(model.route(), Route::AdminDashboard);
        assert!(!model.raw_keyevents());
        assert_eq!(ui.tabs, vec!["suppliers", "accounts", "monitoring"]);
        assert_eq!(ui.nrows, 7);
        assert_eq!(ui.table[0].name, "id");
        let summary = ui.summary.as_ref().unwrap();
        assert_eq!(summary.status.active, 3);
        assert_eq!(summary.status.pending, 2);
        assert_eq!(summary.status.inactive, 1);
        assert_eq!(summary.groups.values().sum::<usize>(), 7);
    }

    #[test]
    fn search_and_toggle_through_messages() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::Search)).unwrap();
        assert!(model.raw_keyevents());
        type_line(&mut model, "acme");
        assert_eq!(model.get_uidata().nrows, 2);
        assert_eq!(model.get_uidata().criteria.search_text, "acme");

        model.update(Some(Message::ToggleActive)).unwrap();
        assert_eq!(model.get_uidata().nrows, 2);
        model.update(Some(Message::TogglePending)).unwrap();
        assert_eq!(model.get_uidata().nrows, 0);
        model.update(Some(Message::TogglePending)).unwrap();
        assert_eq!(model.get_uidata().criteria.status_filter, None);
        assert_eq!(model.get_uidata().nrows, 2);

        model.update(Some(Message::ToggleCountScope)).unwrap();
        let summary = model.get_uidata().summary.clone().unwrap();
        assert_eq!(summary.records, 2);
    }

    #[test]
    fn typed_status_filter_accepts_unknown_values() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::StatusFilter)).unwrap();
        type_line(&mut model, "archived");
        let ui = model.get_uidata();
        assert_eq!(
            ui.criteria.status_filter,
            Some(RecordStatus::Other("archived".to_string()))
        );
        assert_eq!(ui.nrows, 1);
    }

    #[test]
    fn sections_keep_their_own_filters() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::ToggleActive)).unwrap();
        assert_eq!(model.get_uidata().nrows, 3);

        model.update(Some(Message::NextSection)).unwrap();
        assert_eq!(model.get_uidata().selected_tab, 1);
        assert_eq!(model.get_uidata().criteria.status_filter, None);
        assert_eq!(model.get_uidata().nrows, 5);

        model.update(Some(Message::PrevSection)).unwrap();
        assert_eq!(
            model.get_uidata().criteria.status_filter,
            Some(RecordStatus::Active)
        );
        model.update(Some(Message::PrevSection)).unwrap();
        assert_eq!(model.get_uidata().selected_tab, 2);
    }

    #[test]
    fn cursor_stays_inside_filtered_view() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::MoveEnd)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 6);
        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 6);
        model.update(Some(Message::ToggleInactive)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        model.update(Some(Message::MoveUp)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn record_view_steps_through_derived_rows() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::ToggleActive)).unwrap();
        model.update(Some(Message::Enter)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.table.len(), 2);
        assert_eq!(ui.table[0].data[0], "id");
        assert_eq!(ui.table[1].data[0], "1");

        model.update(Some(Message::MoveRight)).unwrap();
        assert_eq!(model.get_uidata().table[1].data[0], "3");
        model.update(Some(Message::MoveRight)).unwrap();
        model.update(Some(Message::MoveRight)).unwrap();
        assert_eq!(model.get_uidata().table[1].data[0], "6");

        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.get_uidata().table[0].name, "id");
    }

    #[test]
    fn reload_keeps_criteria() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::Search)).unwrap();
        type_line(&mut model, "cebu");
        let before = model.get_uidata().nrows;
        model.update(Some(Message::Reload)).unwrap();
        assert_eq!(model.get_uidata().criteria.search_text, "cebu");
        assert_eq!(model.get_uidata().nrows, before);
    }

    #[test]
    fn logout_returns_to_login() {
        let mut model = logged_in("frontdesk@bluewaterresort.ph");
        assert_eq!(model.route(), Route::HotelDashboard);
        assert_eq!(model.get_uidata().tabs, vec!["monitoring"]);
        model.update(Some(Message::Logout)).unwrap();
        assert_eq!(model.route(), Route::Login);
        assert!(model.get_uidata().tabs.is_empty());
        assert_eq!(model.get_uidata().cmd_mode, Some(CMDMode::LoginEmail));
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::Help)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::MoveDown)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn resize_keeps_help_popup_over_table() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::Help)).unwrap();
        model.update(Some(Message::Resize(100, 30))).unwrap();
        assert!(model.get_uidata().show_popup);
        assert_eq!(model.get_uidata().popup_message, HELP_TEXT);
        assert_eq!(model.get_uidata().layout.width, 100);

        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 1);

        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);
        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 2);
    }

    #[test]
    fn resize_keeps_help_popup_over_record() {
        let mut model = logged_in("admin@traveldesk.ph");
        model.update(Some(Message::Enter)).unwrap();
        model.update(Some(Message::Help)).unwrap();
        model.update(Some(Message::Resize(90, 20))).unwrap();
        let ui = model.get_uidata();
        assert!(ui.show_popup);
        assert_eq!(ui.table.len(), 2);
        assert_eq!(ui.table[0].name, "Field");

        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);
        assert_eq!(model.get_uidata().table[1].data[0], "1");
    }

    #[test]
    fn quit_from_anywhere() {
        let mut model = Model::init(&config(), 80, 24).unwrap();
        model.update(Some(Message::Quit)).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn wraps_csv_cells() {
        assert_eq!(Model::wrap_cell_content("Acme"), "Acme");
        assert_eq!(Model::wrap_cell_content("Acme West"), "\"Acme West\"");
        assert_eq!(Model::wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn long_headers_are_shortened() {
        assert_eq!(Model::get_visible_name("company.name", 8), "compa...");
        assert_eq!(Model::get_visible_name("id", 8), "id");
        assert_eq!(Model::get_visible_name("id", 2), "");
    }
}
