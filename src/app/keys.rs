//! Key handling per view.

use tracing::{debug, info, warn};

use super::{App, Pending, Section, View};
use crate::download::{
    DownloadRequest, batch_display_name, batch_filename, stream_filename,
};

/// Terminal-independent key presses the state machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    CtrlC,
}

impl Key {
    fn is_up(self) -> bool {
        matches!(self, Self::Up | Self::Char('k'))
    }

    fn is_down(self) -> bool {
        matches!(self, Self::Down | Self::Char('j'))
    }
}

impl App {
    pub(super) fn handle_key(&mut self, key: Key) {
        match key {
            Key::CtrlC => {
                self.request_quit();
                return;
            }
            Key::Tab => {
                if !self.filtering && self.loading.is_none() {
                    self.section = self.section.toggled();
                    debug!(section = ?self.section, "section switched");
                }
                return;
            }
            Key::Char('q') => {
                if self.section == Section::Downloads {
                    self.section = Section::Main;
                    return;
                }
                if !self.filtering && !self.view.is_text_entry() {
                    self.request_quit();
                    return;
                }
            }
            _ => {}
        }

        if self.section == Section::Downloads {
            self.downloads_key(key);
            return;
        }

        if let Some(loading) = &self.loading {
            // Only a single lookup can be abandoned; a batch runs to completion.
            if key == Key::Esc && matches!(loading.pending, Pending::Lookup(_)) {
                debug!("lookup abandoned");
                self.abandon_lookup();
                self.loading = None;
            }
            return;
        }

        if self.filtering {
            self.filter_key(key);
            return;
        }

        match self.view {
            View::SearchEntry => self.search_key(key),
            View::TitleResults => self.titles_key(key),
            View::SeasonList => self.seasons_key(key),
            View::EpisodeList => self.episodes_key(key),
            View::StreamList => self.streams_key(key),
            View::BatchFilterEntry => self.batch_filter_key(key),
            View::BatchSelection => self.batch_selection_key(key),
        }
    }

    fn request_quit(&mut self) {
        info!("quit requested");
        self.abandon_lookup();
        self.batch.cancel_active();
        self.quit = true;
    }

    fn search_key(&mut self, key: Key) {
        match key {
            Key::Char(c) => self.search_input.push(c),
            Key::Backspace => {
                self.search_input.pop();
            }
            Key::Enter => {
                let query = self.search_input.trim();
                if !query.is_empty() {
                    let query = query.to_string();
                    self.search(query);
                }
            }
            _ => {}
        }
    }

    fn titles_key(&mut self, key: Key) {
        match key {
            k if k.is_up() => self.titles.move_up(),
            k if k.is_down() => self.titles.move_down(),
            Key::Esc => {
                self.clear_messages();
                self.navigate(View::SearchEntry);
            }
            Key::Enter => {
                let Some(title) = self.titles.selected().cloned() else {
                    return;
                };
                self.selected_season = None;
                self.selected_episode = None;
                let id = title.id.clone();
                let series = title.is_series();
                self.selected_title = Some(title);
                if series {
                    self.fetch_seasons(id);
                } else {
                    self.fetch_streams(id);
                }
            }
            _ => {}
        }
    }

    fn seasons_key(&mut self, key: Key) {
        match key {
            k if k.is_up() => self.seasons.move_up(),
            k if k.is_down() => self.seasons.move_down(),
            Key::Esc => {
                self.clear_messages();
                self.navigate(View::TitleResults);
            }
            Key::Enter => {
                let Some(season) = self.seasons.selected().cloned() else {
                    return;
                };
                let Some(title_id) = self.selected_title.as_ref().map(|t| t.id.clone()) else {
                    return;
                };
                let number = season.season.clone();
                self.selected_season = Some(season);
                self.selected_episode = None;
                self.fetch_episodes(title_id, number);
            }
            _ => {}
        }
    }

    fn episodes_key(&mut self, key: Key) {
        match key {
            k if k.is_up() => self.episodes.move_up(),
            k if k.is_down() => self.episodes.move_down(),
            Key::Char('/') => self.enter_filter_mode(),
            Key::Char('b') => {
                self.clear_messages();
                self.batch_input.clear();
                self.batch.clear();
                self.navigate(View::BatchFilterEntry);
            }
            Key::Esc => {
                self.episodes.clear_filter();
                self.clear_messages();
                self.navigate(View::SeasonList);
            }
            Key::Enter => {
                let Some(episode) = self.episodes.selected().cloned() else {
                    return;
                };
                let Some(title_id) = self.selected_title.as_ref().map(|t| t.id.clone()) else {
                    return;
                };
                let item_id = episode.stream_id(&title_id);
                self.selected_episode = Some(episode);
                self.fetch_streams(item_id);
            }
            _ => {}
        }
    }

    fn streams_key(&mut self, key: Key) {
        match key {
            k if k.is_up() => self.streams.move_up(),
            k if k.is_down() => self.streams.move_down(),
            Key::Char('/') => self.enter_filter_mode(),
            Key::Esc => {
                self.streams.clear_filter();
                self.clear_messages();
                let back = if self.selected_episode.is_some() {
                    View::EpisodeList
                } else {
                    View::TitleResults
                };
                self.navigate(back);
            }
            Key::Enter | Key::Char('p') => self.play_selected(),
            Key::Char('d') => self.download_selected(),
            _ => {}
        }
    }

    fn play_selected(&mut self) {
        let Some(url) = self.streams.selected().map(|s| s.url.clone()) else {
            return;
        };
        self.clear_messages();
        let name = self.player.name().to_string();
        match self.player.play(&url) {
            Ok(()) => self.set_status(format!("Playing in {name}...")),
            Err(e) => {
                warn!(player = %name, error = %e, "player launch failed");
                self.set_error(format!("Failed to launch {name}: {e}"));
            }
        }
    }

    fn download_selected(&mut self) {
        let Some(stream) = self.streams.selected() else {
            return;
        };
        let request = DownloadRequest {
            name: stream.name.clone(),
            url: stream.url.clone(),
            path: self.settings.download_dir.join(stream_filename(stream)),
        };
        self.downloads.start(request);
        self.clear_messages();
        self.set_status("Download started - press Tab to view progress");
    }

    fn enter_filter_mode(&mut self) {
        self.filtering = true;
        self.filter_input.clear();
    }

    fn filter_key(&mut self, key: Key) {
        match key {
            Key::Esc => {
                self.exit_filter_mode();
                self.restore_filter();
            }
            Key::Enter => self.filtering = false,
            Key::Backspace => {
                self.filter_input.pop();
                self.apply_filter();
            }
            Key::Char(c) => {
                self.filter_input.push(c);
                self.apply_filter();
            }
            Key::Up => self.move_filtered(false),
            Key::Down => self.move_filtered(true),
            _ => {}
        }
    }

    fn move_filtered(&mut self, down: bool) {
        match (self.view, down) {
            (View::EpisodeList, true) => self.episodes.move_down(),
            (View::EpisodeList, false) => self.episodes.move_up(),
            (View::StreamList, true) => self.streams.move_down(),
            (View::StreamList, false) => self.streams.move_up(),
            _ => {}
        }
    }

    fn batch_filter_key(&mut self, key: Key) {
        match key {
            Key::Char(c) => self.batch_input.push(c),
            Key::Backspace => {
                self.batch_input.pop();
            }
            Key::Esc => {
                self.clear_messages();
                self.navigate(View::EpisodeList);
            }
            Key::Enter => {
                let filter = self.batch_input.trim();
                if filter.is_empty() {
                    self.set_error("Please enter a release name");
                    return;
                }
                let filter = filter.to_string();
                self.launch_batch(filter);
            }
            _ => {}
        }
    }

    fn batch_selection_key(&mut self, key: Key) {
        let len = self.batch.streams().len();
        match key {
            k if k.is_up() => self.batch_cursor = self.batch_cursor.saturating_sub(1),
            k if k.is_down() => {
                if self.batch_cursor + 1 < len {
                    self.batch_cursor += 1;
                }
            }
            Key::Char(' ') => self.batch.toggle(self.batch_cursor),
            Key::Char('a') => self.batch.select_all(),
            Key::Char('n') => self.batch.select_none(),
            Key::Enter => self.commit_batch(),
            Key::Esc => {
                self.batch.clear();
                self.clear_messages();
                self.navigate(View::EpisodeList);
            }
            _ => {}
        }
    }

    fn commit_batch(&mut self) {
        let selected = self.batch.take_selected();
        for item in &selected {
            let request = DownloadRequest {
                name: batch_display_name(&item.episode, &item.stream),
                url: item.stream.url.clone(),
                path: self
                    .settings
                    .download_dir
                    .join(batch_filename(&item.episode, &item.stream)),
            };
            self.downloads.start(request);
        }
        self.clear_messages();
        if selected.is_empty() {
            self.set_status("No streams selected");
        } else {
            info!(count = selected.len(), "batch committed");
            self.set_status(format!(
                "Started {} downloads - press Tab to view",
                selected.len()
            ));
        }
        self.navigate(View::EpisodeList);
    }

    fn downloads_key(&mut self, key: Key) {
        let len = self.downloads.downloads().len();
        match key {
            k if k.is_up() => self.download_cursor = self.download_cursor.saturating_sub(1),
            k if k.is_down() => {
                if self.download_cursor + 1 < len {
                    self.download_cursor += 1;
                }
            }
            Key::Char('x') => {
                let id = self
                    .downloads
                    .downloads()
                    .get(self.download_cursor)
                    .map(crate::download::Download::id);
                if let Some(id) = id {
                    self.downloads.cancel(id);
                }
            }
            Key::Esc => self.section = Section::Main,
            _ => {}
        }
    }
}
