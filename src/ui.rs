use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState, Tabs, Wrap,
    },
};

use crate::model::{Model, UIData};

pub const TABS_HEIGHT: usize = 3;
pub const SUMMARY_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const LOGIN_DIALOG_WIDTH: u16 = 60;
const LOGIN_DIALOG_HEIGHT: u16 = 9;

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let area = frame.area();
        let [tabs_area, summary_area, table_area, cmdline_area] = Layout::vertical([
            Constraint::Length(TABS_HEIGHT as u16),
            Constraint::Length(SUMMARY_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(area);

        if uidata.login {
            self.draw_login(uidata, frame, area);
        } else {
            self.draw_tabs(uidata, frame, tabs_area);
            self.draw_summary(uidata, frame, summary_area);
            self.draw_table(uidata, frame, table_area);
        }
        self.draw_cmdline(uidata, frame, cmdline_area);

        if uidata.show_popup {
            self.draw_popup(uidata, frame, area);
        }
    }

    fn draw_login(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let dialog = render_centered_dialog(frame, area, LOGIN_DIALOG_WIDTH, LOGIN_DIALOG_HEIGHT);
        let block = Block::bordered()
            .title(Line::from(" Travel Desk ".bold()).centered())
            .border_set(border::THICK);
        let hints = if uidata.active_cmdinput {
            Line::from(vec![
                " Leave prompt ".into(),
                "<Esc>".blue().bold(),
                " Quit ".into(),
                "<Ctrl-C>".blue().bold(),
            ])
        } else {
            Line::from(vec![
                " Log in ".into(),
                "<i>".blue().bold(),
                " Help ".into(),
                "<?>".blue().bold(),
                " Quit ".into(),
                "<q>".blue().bold(),
            ])
        };
        let text = Text::from(vec![
            Line::from(""),
            Line::from("Sign in with the email of an active account."),
            Line::from("Any non-empty password is accepted."),
            Line::from(""),
            Line::from(uidata.status_message.clone().yellow()),
            hints,
        ]);
        frame.render_widget(Paragraph::new(text).centered().block(block), dialog);
    }

    fn draw_tabs(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut block = Block::bordered().title(Line::from(format!(" {} ", uidata.name).bold()));
        if let Some(label) = &uidata.session_label {
            block = block.title(Line::from(format!(" {label} ")).right_aligned());
        }
        let tabs = Tabs::new(uidata.tabs.clone())
            .select(uidata.selected_tab)
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .block(block);
        frame.render_widget(tabs, area);
    }

    fn draw_summary(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let Some(summary) = &uidata.summary else {
            return;
        };
        let mut spans = vec![
            Span::from(format!(" {} ", uidata.count_scope.label())).reversed(),
            Span::from(format!(" {} records  ", summary.records)),
            Span::from(format!("active {} ", summary.status.active)).green(),
            Span::from(format!("pending {} ", summary.status.pending)).yellow(),
            Span::from(format!("inactive {} ", summary.status.inactive)).red(),
        ];
        if !summary.groups.is_empty() {
            spans.push(Span::from("| "));
            for (group, count) in summary.groups.iter() {
                spans.push(Span::from(format!("{group} {count} ")).cyan());
            }
        }

        let criteria = &uidata.criteria;
        if !criteria.is_empty() {
            spans.push(Span::from("| "));
            if let Some(status) = &criteria.status_filter {
                spans.push(Span::from(format!("status={status} ")).bold());
            }
            if !criteria.search_text.is_empty() {
                spans.push(Span::from(format!("search=\"{}\" ", criteria.search_text)).bold());
            }
            spans.push(Span::from(format!("({}/{})", uidata.nrows, uidata.base_rows)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [table_area, scrollbar_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        let header = Row::new(
            uidata
                .table
                .iter()
                .map(|column| Cell::from(column.name.clone())),
        )
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
        .height(TABLE_HEADER_HEIGHT as u16);

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows).map(|ridx| {
            Row::new(
                uidata
                    .table
                    .iter()
                    .map(|column| Cell::from(column.data[ridx].clone())),
            )
        });
        let widths = uidata
            .table
            .iter()
            .map(|column| Constraint::Length(column.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .cell_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

        let mut state = TableState::default();
        if nrows > 0 {
            state = state
                .with_selected(Some(uidata.selected_row))
                .with_selected_column(Some(uidata.selected_column));
        }
        frame.render_stateful_widget(table, table_area, &mut state);

        if nrows == 0 {
            let empty = Paragraph::new("No matching records".italic()).centered();
            let message_area = Rect {
                y: table_area.y + TABLE_HEADER_HEIGHT as u16,
                height: 1.min(table_area.height.saturating_sub(TABLE_HEADER_HEIGHT as u16)),
                ..table_area
            };
            frame.render_widget(empty, message_area);
        }

        let mut scrollbar_state =
            ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = uidata.cmd_mode.map(|m| m.prompt()).unwrap_or(":");
            let shown = uidata.cmdinput.display();
            let line = Line::from(vec![Span::from(prompt).bold(), Span::from(shown)]);
            frame.render_widget(Paragraph::new(line), area);

            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let message = if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT {
            uidata.status_message.clone()
        } else {
            String::new()
        };
        let position = if uidata.nrows > 0 {
            format!("{}/{} ", uidata.abs_selected_row + 1, uidata.nrows)
        } else {
            String::new()
        };
        let [message_area, position_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(position.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(message), message_area);
        frame.render_widget(Paragraph::new(position).right_aligned(), position_area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let height = uidata.popup_message.lines().count() as u16 + 2;
        let width = uidata
            .popup_message
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as u16
            + 4;
        let dialog = render_centered_dialog(frame, area, width, height);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::ROUNDED);
        let popup = Paragraph::new(uidata.popup_message.clone())
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(popup, dialog);
    }
}

fn centered_dialog_area(area: Rect, max_width: u16, max_height: u16) -> Rect {
    let width = area.width.min(max_width);
    let height = area.height.min(max_height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Clears a centered area and returns it for the dialog content.
fn render_centered_dialog(frame: &mut Frame, area: Rect, max_width: u16, max_height: u16) -> Rect {
    let dialog_area = centered_dialog_area(area, max_width, max_height);
    frame.render_widget(Clear, dialog_area);
    dialog_area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_dialog_area(area, 60, 10), Rect::new(20, 15, 60, 10));
        assert_eq!(centered_dialog_area(area, 200, 80), area);
    }
}
