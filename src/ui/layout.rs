use crate::app::{App, AppView, LinkState, Popup};
use crate::settings::SettingsField;
use crate::speedtest::format_bps;
use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

// Color Palette - Elegant & Minimal
const ACCENT: Color = Color::Rgb(100, 149, 237);      // Cornflower blue
const SUCCESS: Color = Color::Rgb(134, 194, 156);     // Soft green
const INFO: Color = Color::Rgb(147, 180, 220);        // Soft blue
const WARN: Color = Color::Rgb(220, 180, 130);        // Soft amber
const ERROR: Color = Color::Rgb(220, 120, 120);       // Soft red
const TEXT_PRIMARY: Color = Color::Rgb(230, 230, 230);
const TEXT_SECONDARY: Color = Color::Rgb(160, 160, 160);
const TEXT_MUTED: Color = Color::Rgb(100, 100, 100);
const BORDER: Color = Color::Rgb(60, 60, 65);
const BORDER_ACTIVE: Color = Color::Rgb(100, 100, 110);

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.view {
        AppView::Main => draw_main_view(frame, area, app),
        AppView::Settings => draw_settings_view(frame, area, app),
    }

    if let Some(popup) = &app.popup {
        draw_popup(frame, area, popup);
    }
}

fn draw_main_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .split(area);

    draw_header(frame, chunks[0], app);

    let panels = Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]).split(chunks[1]);
    draw_link_panel(frame, panels[0], app);
    draw_speedtest_panel(frame, panels[1], app);

    draw_log_panel(frame, chunks[2], app);
    draw_help(frame, chunks[3], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::horizontal([
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(20),
    ])
    .split(inner);

    // Title
    let title = Paragraph::new("wifispeed")
        .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD));
    frame.render_widget(title, chunks[0]);

    // Status
    let color = if app.status.starts_with("Error") {
        ERROR
    } else if app.speed_test_running() {
        WARN
    } else if app.status == "Ready" {
        TEXT_MUTED
    } else {
        ACCENT
    };
    frame.render_widget(
        Paragraph::new(app.status.as_str())
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(app.platform.to_string())
            .style(Style::default().fg(TEXT_SECONDARY))
            .alignment(Alignment::Right),
        chunks[2],
    );
}

fn panel_block(title: &str, color: Color, active: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if active { BORDER_ACTIVE } else { BORDER }))
        .title(Span::styled(format!(" {} ", title), Style::default().fg(color)))
}

fn draw_link_panel(frame: &mut Frame, area: Rect, app: &App) {
    let block = panel_block("Wi-Fi Link Speed", SUCCESS, app.link == LinkState::Probing);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(1),
    ])
    .split(inner);

    let (value, color) = match app.link {
        LinkState::NotRead => ("--".to_string(), TEXT_MUTED),
        LinkState::Probing => ("reading...".to_string(), WARN),
        LinkState::Known(mbps) => (format!("{:.1} Mbps", mbps), TEXT_PRIMARY),
        LinkState::Unknown => ("Unknown or not connected".to_string(), TEXT_SECONDARY),
    };

    frame.render_widget(
        Paragraph::new(value)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        chunks[1],
    );

    let hint = if app.can_refresh() { "r refresh" } else { "r refresh (busy)" };
    frame.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_speedtest_panel(frame: &mut Frame, area: Rect, app: &App) {
    let block = panel_block("Internet Speed Test", INFO, app.speed_test_running());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(inner);

    let (ping, download, upload) = match &app.result {
        Some(r) => (
            format!("{:.1} ms", r.ping_ms),
            format_bps(r.download_bps),
            format_bps(r.upload_bps),
        ),
        None => ("--".to_string(), "--".to_string(), "--".to_string()),
    };

    draw_metric_row(frame, rows[0], "Ping", &ping, WARN);
    draw_metric_row(frame, rows[1], "Download", &download, SUCCESS);
    draw_metric_row(frame, rows[2], "Upload", &upload, INFO);

    if let Some(r) = &app.result {
        let footer = format!("{} · via {}", r.timestamp.format("%Y-%m-%d %H:%M:%S"), r.source);
        frame.render_widget(
            Paragraph::new(footer)
                .style(Style::default().fg(TEXT_MUTED))
                .alignment(Alignment::Center),
            rows[4],
        );
    }
}

fn draw_metric_row(frame: &mut Frame, area: Rect, label: &str, value: &str, color: Color) {
    let line = Line::from(vec![
        Span::styled(format!(" {:<10}", label), Style::default().fg(color)),
        Span::styled(
            value.to_string(),
            Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_log_panel(frame: &mut Frame, area: Rect, app: &App) {
    let title = if app.log_scroll > 0 {
        format!("Log (+{} newer)", app.log_scroll)
    } else {
        "Log".to_string()
    };
    let block = panel_block(&title, TEXT_SECONDARY, false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.log.is_empty() {
        frame.render_widget(
            Paragraph::new("No activity yet").style(Style::default().fg(TEXT_MUTED)),
            inner,
        );
        return;
    }

    let height = inner.height as usize;
    let lines: Vec<Line> = visible_log_window(app.log.lines(), app.log_scroll, height)
        .iter()
        .map(|l| Line::styled(l.as_str(), Style::default().fg(TEXT_SECONDARY)))
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Slice of `lines` that fits `height` rows, ending `scroll` lines above the newest.
pub fn visible_log_window(lines: &[String], scroll: usize, height: usize) -> &[String] {
    let end = lines.len().saturating_sub(scroll);
    let start = end.saturating_sub(height);
    &lines[start..end]
}

fn draw_popup(frame: &mut Frame, area: Rect, popup: &Popup) {
    let (title, message, color) = match popup {
        Popup::Info { title, message } => (title, message, ACCENT),
        Popup::Error { title, message } => (title, message, ERROR),
    };

    let [popup_area] = Layout::vertical([Constraint::Length(7)])
        .flex(Flex::Center)
        .areas(area);
    let [popup_area] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(format!(" {} ", title), Style::default().fg(color)));
    let inner = block.inner(popup_area);

    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);
    frame.render_widget(
        Paragraph::new(message.as_str())
            .style(Style::default().fg(TEXT_PRIMARY))
            .wrap(Wrap { trim: true }),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new("enter close")
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[1],
    );
}

// Settings
fn draw_settings_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(1),
    ])
    .split(area);

    // Header
    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));
    let header_inner = header_block.inner(chunks[0]);
    frame.render_widget(header_block, chunks[0]);

    frame.render_widget(
        Paragraph::new("Settings")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        header_inner,
    );

    // Settings content
    let content_area = Layout::horizontal([
        Constraint::Length(2),
        Constraint::Min(30),
        Constraint::Length(2),
    ])
    .split(chunks[1])[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(content_area);
    frame.render_widget(block, content_area);

    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .split(inner);

    let settings = &app.settings;
    let entries = [
        (SettingsField::ProbeTimeout, "Probe timeout", format!("{} s", settings.probe_timeout_secs)),
        (SettingsField::SpeedtestTimeout, "Test timeout", format!("{} s", settings.speedtest_timeout_secs)),
        (SettingsField::DownloadSize, "Download size", format!("{} MB", settings.download_size_mb)),
        (SettingsField::UploadSize, "Upload size", format!("{} MB", settings.upload_size_mb)),
    ];

    for (row, (field, label, value)) in rows.iter().zip(entries.iter()) {
        draw_setting_row(frame, *row, label, value, app.selected_setting == *field);
    }

    // Help
    let help = "↑↓ select · ←→ adjust · enter done";
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_setting_row(frame: &mut Frame, area: Rect, label: &str, value: &str, selected: bool) {
    let chunks = Layout::horizontal([
        Constraint::Length(16),
        Constraint::Min(10),
    ])
    .split(area);

    let label_style = if selected {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(TEXT_SECONDARY)
    };

    frame.render_widget(
        Paragraph::new(format!(" {}", label)).style(label_style),
        chunks[0],
    );

    let value_text = if selected {
        format!("< {} >", value)
    } else {
        value.to_string()
    };

    let value_style = if selected {
        Style::default().fg(TEXT_PRIMARY)
    } else {
        Style::default().fg(TEXT_MUTED)
    };

    frame.render_widget(Paragraph::new(value_text).style(value_style), chunks[1]);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &App) {
    let help = if app.speed_test_running() {
        "↑↓ scroll log · c clear · w save log · q quit"
    } else {
        "enter speedtest · r refresh · ↑↓ scroll · c clear · w save log · s settings · q quit"
    };

    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use ratatui::{backend::TestBackend, Terminal};

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn log_window_follows_newest() {
        let all = lines(10);
        assert_eq!(visible_log_window(&all, 0, 3), &all[7..10]);
        assert_eq!(visible_log_window(&all, 2, 3), &all[5..8]);
        assert_eq!(visible_log_window(&all, 9, 3), &all[0..1]);
        assert_eq!(visible_log_window(&all, 0, 50), &all[..]);
        assert!(visible_log_window(&[], 0, 3).is_empty());
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw_ui(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_link_speed_and_log() {
        let mut app = App::new(Settings::default());
        app.begin_link_probe();
        app.apply(crate::app::WorkerEvent::LinkSpeed(Some(866.0)));
        let screen = render(&app);
        assert!(screen.contains("866.0 Mbps"));
        assert!(screen.contains("Link speed: 866.0 Mbps"));
    }

    #[test]
    fn empty_log_shows_placeholder() {
        let mut app = App::new(Settings::default());
        assert!(render(&app).contains("No activity yet"));

        app.log("App started");
        assert!(!render(&app).contains("No activity yet"));
    }

    #[test]
    fn renders_error_popup() {
        let mut app = App::new(Settings::default());
        app.begin_speed_test();
        app.apply(crate::app::WorkerEvent::SpeedTest(Err(crate::error::SpeedTestError::Exhausted)));
        let screen = render(&app);
        assert!(screen.contains("Speedtest error"));
        assert!(screen.contains("Unable to run speed test"));
    }

    #[test]
    fn renders_settings() {
        let mut app = App::new(Settings::default());
        app.view = AppView::Settings;
        let screen = render(&app);
        assert!(screen.contains("< 6 s >"));
        assert!(screen.contains("300 s"));
    }
}
