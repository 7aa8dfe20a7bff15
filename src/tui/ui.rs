//! Rendering. Pure functions of [`App`] state.

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use streamdl_core::listing::{AsEntry, ListView};
use streamdl_core::{App, DownloadStatus, Section, View};

use super::theme;

const APP_TITLE: &str = "streamdl";
const DOWNLOAD_ROW_HEIGHT: u16 = 3;

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let [content, messages, help, tabs] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    match app.section() {
        Section::Downloads => draw_downloads(frame, content, app),
        Section::Main => match app.loading() {
            Some(loading) => draw_loading(frame, content, app, &loading.message),
            None => draw_view(frame, content, app),
        },
    }

    draw_messages(frame, messages, app);
    frame.render_widget(Paragraph::new(help_text(app)).style(theme::dim()), help);
    draw_tabs(frame, tabs, app);
}

fn draw_view(frame: &mut Frame<'_>, area: Rect, app: &App) {
    match app.view() {
        View::SearchEntry => draw_search(frame, area, app),
        View::TitleResults => draw_list(frame, area, app.view(), None, app.titles(), None),
        View::SeasonList => {
            let context = app.selected_title().map(|t| t.primary_title.clone());
            draw_list(frame, area, app.view(), context, app.seasons(), None);
        }
        View::EpisodeList => {
            let context = match (app.selected_title(), app.selected_season()) {
                (Some(title), Some(season)) => {
                    Some(format!("{} - Season {}", title.primary_title, season.season))
                }
                _ => None,
            };
            let filter = app.is_filtering().then(|| app.filter_input());
            draw_list(frame, area, app.view(), context, app.episodes(), filter);
        }
        View::StreamList => {
            let context = app.selected_title().map(|title| match app.selected_episode() {
                Some(episode) => format!(
                    "{} - S{}E{}: {}",
                    title.primary_title, episode.season, episode.episode_number, episode.title
                ),
                None => title.primary_title.clone(),
            });
            let filter = app.is_filtering().then(|| app.filter_input());
            draw_list(frame, area, app.view(), context, app.streams(), filter);
        }
        View::BatchFilterEntry => draw_batch_filter(frame, area, app),
        View::BatchSelection => draw_batch_selection(frame, area, app),
    }
}

fn centered(area: Rect, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Max(60)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

fn input_box<'a>(prompt: &'a str, value: &'a str, placeholder: &'a str) -> Paragraph<'a> {
    let body = if value.is_empty() {
        Span::styled(placeholder, theme::dim())
    } else {
        Span::styled(value, theme::normal())
    };
    Paragraph::new(Line::from(vec![
        Span::styled(prompt, theme::selected()),
        body,
    ]))
    .block(
        Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(theme::border()),
    )
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let area = centered(area, 7);
    let [title, subtitle, input] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(3),
    ])
    .areas(area);

    frame.render_widget(Paragraph::new(APP_TITLE).style(theme::title()), title);
    frame.render_widget(
        Paragraph::new("Search for movies and TV shows").style(theme::dim()),
        subtitle,
    );
    frame.render_widget(
        input_box("› ", app.search_input(), "Search for movies or shows..."),
        input,
    );
}

fn draw_loading(frame: &mut Frame<'_>, area: Rect, app: &App, message: &str) {
    let mut line = vec![
        Span::styled(theme::spinner_frame(app.spinner_frame()), theme::spinner()),
        Span::raw(" "),
        Span::styled(message.to_string(), theme::normal()),
    ];
    let (started, total) = app.batch_progress();
    if app.batch().active_batch().is_some() && total > 0 {
        line.push(Span::styled(format!(" ({started}/{total})"), theme::dim()));
    }
    frame.render_widget(Paragraph::new(Line::from(line)), centered(area, 1));
}

fn draw_list<T: AsEntry>(
    frame: &mut Frame<'_>,
    area: Rect,
    view: View,
    context: Option<String>,
    list: &ListView<T>,
    filter: Option<&str>,
) {
    let [heading, filter_area, body] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(if filter.is_some() { 3 } else { 0 }),
        Constraint::Min(1),
    ])
    .areas(area);

    let mut header = vec![Line::styled(view.heading(), theme::title())];
    if let Some(context) = context {
        header.push(Line::styled(context, theme::dim()));
    }
    frame.render_widget(Paragraph::new(Text::from(header)), heading);

    if let Some(query) = filter {
        frame.render_widget(input_box("/ ", query, "Filter..."), filter_area);
    }

    let items: Vec<ListItem<'_>> = list
        .visible()
        .map(|item| {
            let entry = item.entry();
            ListItem::new(Text::from(vec![
                Line::styled(entry.title(), theme::normal()),
                Line::styled(entry.description(), theme::dim()),
            ]))
        })
        .collect();
    let count = if list.is_filtered() {
        format!("{} of {} items", list.visible_len(), list.items().len())
    } else {
        format!("{} items", list.items().len())
    };
    let widget = List::new(items)
        .block(Block::new().title_bottom(Line::styled(count, theme::dim())))
        .highlight_style(theme::selected())
        .highlight_symbol("› ");
    let mut state = ListState::default().with_selected(Some(list.cursor()));
    frame.render_stateful_widget(widget, body, &mut state);
}

fn draw_batch_filter(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let area = centered(area, 6);
    let [title, input] =
        Layout::vertical([Constraint::Length(3), Constraint::Length(3)]).areas(area);
    let visible = app.episodes().visible_len();
    frame.render_widget(
        Paragraph::new(Text::from(vec![
            Line::styled(View::BatchFilterEntry.heading(), theme::title()),
            Line::styled(
                format!("Download a matching stream for {visible} episodes"),
                theme::dim(),
            ),
        ])),
        title,
    );
    frame.render_widget(
        input_box("Release name: ", app.batch_input(), "e.g. 1080p.BluRay"),
        input,
    );
}

fn draw_batch_selection(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let batch = app.batch();
    let failures = batch.failures();
    let failure_rows = u16::try_from(failures.len()).unwrap_or(u16::MAX);
    let [heading, body, failed] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(if failures.is_empty() {
            0
        } else {
            failure_rows.saturating_add(1).min(area.height / 3)
        }),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Text::from(vec![
            Line::styled(View::BatchSelection.heading(), theme::title()),
            Line::styled(
                format!(
                    "{} of {} selected for '{}'",
                    batch.selected_count(),
                    batch.streams().len(),
                    app.batch_filter()
                ),
                theme::dim(),
            ),
        ])),
        heading,
    );

    let items: Vec<ListItem<'_>> = batch
        .streams()
        .iter()
        .map(|s| {
            let mark = if s.selected { "[x]" } else { "[ ]" };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{mark} "), theme::selected()),
                Span::styled(
                    format!(
                        "S{}E{:02}: {}",
                        s.episode.season, s.episode.episode_number, s.stream.name
                    ),
                    theme::normal(),
                ),
            ]))
        })
        .collect();
    let widget = List::new(items)
        .highlight_style(theme::selected())
        .highlight_symbol("› ");
    let mut state = ListState::default().with_selected(Some(app.batch_cursor()));
    frame.render_stateful_widget(widget, body, &mut state);

    if !failures.is_empty() {
        let mut lines = vec![Line::styled(
            format!("{} episodes failed:", failures.len()),
            theme::error(),
        )];
        lines.extend(failures.iter().map(|f| {
            Line::styled(
                format!(
                    "  ✗ S{}E{:02}: {}",
                    f.episode.season, f.episode.episode_number, f.reason
                ),
                theme::dim(),
            )
        }));
        frame.render_widget(Paragraph::new(Text::from(lines)), failed);
    }
}

fn draw_downloads(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let manager = app.downloads();
    let [heading, body] =
        Layout::vertical([Constraint::Length(2), Constraint::Min(1)]).areas(area);
    frame.render_widget(
        Paragraph::new(Line::styled(
            format!("Downloads ({} active)", manager.active_count()),
            theme::title(),
        )),
        heading,
    );

    let downloads = manager.downloads();
    if downloads.is_empty() {
        frame.render_widget(
            Paragraph::new("No downloads yet").style(theme::dim()),
            body,
        );
        return;
    }

    let per_page = usize::from((body.height / DOWNLOAD_ROW_HEIGHT).max(1));
    let first = app.download_cursor().saturating_sub(per_page - 1);

    for (slot, (index, download)) in downloads
        .iter()
        .enumerate()
        .skip(first)
        .take(per_page)
        .enumerate()
    {
        let top = body.y + u16::try_from(slot).unwrap_or(0) * DOWNLOAD_ROW_HEIGHT;
        let row = Rect::new(body.x, top, body.width, DOWNLOAD_ROW_HEIGHT.min(body.bottom() - top));
        let [label, gauge, detail] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(row);

        let cursor = index == app.download_cursor();
        let status_style = match download.status() {
            DownloadStatus::Failed => theme::error(),
            DownloadStatus::Complete => theme::success(),
            _ => theme::dim(),
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(if cursor { "› " } else { "  " }, theme::selected()),
                Span::styled(
                    download.name().to_string(),
                    if cursor { theme::selected() } else { theme::normal() },
                ),
                Span::styled(format!("  [{}]", download.status()), status_style),
            ])),
            label,
        );
        frame.render_widget(
            Gauge::default()
                .gauge_style(ratatui::style::Style::new().fg(theme::ACCENT))
                .ratio(download.progress().clamp(0.0, 1.0))
                .label(format!("{:.1}%", download.progress() * 100.0)),
            gauge,
        );
        if let Some(error) = download.error() {
            frame.render_widget(
                Paragraph::new(Line::styled(format!("  {error}"), theme::error()))
                    .wrap(Wrap { trim: true }),
                detail,
            );
        }
    }
}

fn draw_messages(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = if let Some(error) = app.error() {
        Line::styled(error.to_string(), theme::error())
    } else if let Some(status) = app.status() {
        Line::styled(status.to_string(), theme::success())
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_tabs(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = app.downloads().active_count();
    let downloads = if active > 0 {
        format!("Downloads ({active})")
    } else {
        "Downloads".to_string()
    };
    let selected = match app.section() {
        Section::Main => 0,
        Section::Downloads => 1,
    };
    frame.render_widget(
        Tabs::new(vec!["Browse".to_string(), downloads])
            .select(selected)
            .style(theme::dim())
            .highlight_style(theme::selected())
            .divider("│"),
        area,
    );
}

fn help_text(app: &App) -> &'static str {
    if app.section() == Section::Downloads {
        return "j/k: navigate • x: cancel • tab/esc: back";
    }
    if app.is_loading() {
        return if app.batch().active_batch().is_some() {
            "ctrl+c: quit"
        } else {
            "esc: cancel • ctrl+c: quit"
        };
    }
    if app.is_filtering() {
        return "enter: apply filter • esc: cancel filter";
    }
    match app.view() {
        View::SearchEntry => "enter: search • tab: downloads • ctrl+c: quit",
        View::TitleResults | View::SeasonList => {
            "enter: select • esc: back • j/k: navigate • q: quit"
        }
        View::EpisodeList => {
            "enter: select • /: filter • b: batch download • esc: back • j/k: navigate • q: quit"
        }
        View::StreamList => "p/enter: play • d: download • /: filter • esc: back • q: quit",
        View::BatchFilterEntry => "enter: fetch streams • esc: back",
        View::BatchSelection => "space: toggle • a: all • n: none • enter: download • esc: back",
    }
}
