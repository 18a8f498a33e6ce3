//! # Controller
//!
//! [`ScriptRunner`] owns the UI state and the process manager, runs the
//! event loop, and routes input to actions. Input is polled with a short
//! timeout; on a fixed cadence the controller sweeps finished processes,
//! drains new output into the panes, and refreshes the status bar.
//!
//! Key handling is layered: navigation, execution, view, and application
//! handlers are tried in order and each reports whether it consumed the
//! key. Unconsumed keys are ignored.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::Backend;
use ratatui::Terminal;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::process::{discover_scripts, ProcessManager, MAX_PROCESSES};
use crate::ui::{render, App, Theme};

/// Input poll timeout; the loop's only suspension point.
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cadence for draining process output and refreshing the status bar.
const UI_UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// Lines scrolled per PageUp / PageDown.
const PAGE_SCROLL_LINES: usize = 10;

/// How long a transient status notice stays visible.
const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Reads terminal events; a trait so tests can inject scripted input.
pub trait EventReader {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<Event>>;
}

/// Production event reader backed by crossterm's poll + read.
pub struct CrosstermEventReader;

impl EventReader for CrosstermEventReader {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if crossterm::event::poll(timeout)
            .map_err(|e| Error::Ui(format!("failed to poll for events: {e}")))?
        {
            Ok(Some(crossterm::event::read().map_err(|e| {
                Error::Ui(format!("failed to read input event: {e}"))
            })?))
        } else {
            Ok(None)
        }
    }
}

/// Central coordinator: event loop, key routing, and UI/process sync.
pub struct ScriptRunner {
    manager: ProcessManager,
    app: App,
    theme: Theme,
    script_dirs: Vec<PathBuf>,
    start_time: Instant,
    last_update: Instant,
    recover_requested: bool,
    notice: Option<(String, Instant)>,
}

impl ScriptRunner {
    pub fn new(settings: &Settings) -> Self {
        let script_dirs = settings.script_directories();
        info!(?script_dirs, "script runner initialized");
        Self {
            manager: ProcessManager::new(settings.buffer_size),
            app: App::new(settings.buffer_size),
            theme: Theme::default_theme(),
            script_dirs,
            start_time: Instant::now(),
            last_update: Instant::now(),
            recover_requested: false,
            notice: None,
        }
    }

    /// Run the main event loop until quit is requested. Any running
    /// scripts are terminated on the way out.
    pub async fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut dyn EventReader,
    ) -> Result<()> {
        info!("entering event loop");

        if let Ok(size) = terminal.size() {
            self.app.terminal_size = (size.width, size.height);
        }
        self.refresh_script_list();

        while !self.app.should_quit {
            if self.last_update.elapsed() >= UI_UPDATE_INTERVAL {
                self.update();
                self.last_update = Instant::now();
            }

            if self.recover_requested {
                // Full teardown and rebuild of the drawn content; the
                // next draw repaints every cell.
                terminal
                    .clear()
                    .map_err(|e| Error::Ui(format!("failed to clear terminal: {e}")))?;
                self.recover_requested = false;
                info!("interface rebuilt on request");
            }

            terminal
                .draw(|frame| render(frame, &mut self.app, &self.theme))
                .map_err(|e| Error::Ui(format!("failed to draw frame: {e}")))?;

            match events.read_event(INPUT_POLL_INTERVAL)? {
                Some(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    self.handle_key(key);
                }
                Some(Event::Mouse(mouse)) => {
                    if self.app.handle_mouse(mouse) {
                        self.dispatch_double_click();
                    }
                }
                Some(Event::Resize(width, height)) => {
                    debug!(width, height, "terminal resized");
                    self.app.terminal_size = (width, height);
                }
                _ => {}
            }
        }

        for pane in 0..MAX_PROCESSES {
            let _ = self.manager.terminate_script(pane);
        }
        info!("event loop exited");
        Ok(())
    }

    /// Periodic state sync: sweep finished slots, pull new output into
    /// the panes, refresh the status bar.
    fn update(&mut self) {
        let cleaned = self.manager.cleanup_finished();
        if cleaned > 0 {
            debug!(cleaned, "recycled finished process slots");
        }

        for pane in 0..MAX_PROCESSES {
            let text = self.manager.take_output(pane).unwrap_or_default();
            if !text.is_empty() {
                self.append_pane_text(pane, &text);
            }
        }

        let running = (0..MAX_PROCESSES)
            .filter(|pane| self.manager.is_running(*pane))
            .count();
        let mut left = format!("Scripts: {}", self.script_count());
        if running > 0 {
            left.push_str(&format!(" | Running: {running}"));
        }

        let notice_active = self
            .notice
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() < NOTICE_DURATION);
        if !notice_active {
            self.notice = None;
        }
        let center = match &self.notice {
            Some((text, _)) => text.clone(),
            None => self
                .app
                .selected_script()
                .map(|path| format!("Selected: {}", base_name(path)))
                .unwrap_or_default(),
        };

        let mut right = String::new();
        for pane in 0..MAX_PROCESSES {
            let runtime = self.manager.runtime(pane).unwrap_or(Duration::ZERO);
            if runtime > Duration::ZERO {
                right.push_str(&format!("P{} {} | ", pane + 1, format_duration(runtime)));
            }
        }
        right.push_str(&format!("Up {}", format_duration(self.start_time.elapsed())));

        self.app.set_status(left, center, right);
    }

    fn script_count(&self) -> usize {
        self.app
            .scripts
            .iter()
            .filter(|entry| !App::is_separator(entry))
            .count()
    }

    fn append_pane_text(&mut self, pane: usize, text: &str) {
        let width = self.app.pane_content_width(pane);
        let visible = self.app.visible_lines();
        self.app.panes[pane].append(text, width, visible);
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
    }

    /// Re-run discovery across all configured directories, separating
    /// each directory's scripts with a divider row and skipping duplicate
    /// filenames. The previous selection survives by path when the script
    /// still exists.
    pub fn refresh_script_list(&mut self) {
        info!("refreshing script list");
        let previous = self.app.selected_script().map(String::from);

        let mut entries: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, dir) in self.script_dirs.iter().enumerate() {
            let scripts = match discover_scripts(dir) {
                Ok(scripts) => scripts,
                Err(e) => {
                    warn!(directory = %dir.display(), "failed to scan directory: {e}");
                    continue;
                }
            };
            if scripts.is_empty() {
                continue;
            }
            if index > 0 && !entries.is_empty() {
                entries.push(format!("--- {} ---", directory_label(dir)));
            }
            for script in scripts {
                let Some(name) = script.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if seen.insert(name.to_string()) {
                    entries.push(script.display().to_string());
                } else {
                    debug!(script = %script.display(), "skipping duplicate filename");
                }
            }
        }

        self.app.set_scripts(entries);
        if let Some(path) = previous {
            self.app.select_path(&path);
        }

        let count = self.script_count();
        let dirs = self.script_dirs.len();
        self.set_notice(format!("Found {count} scripts in {dirs} directories"));
        info!(count, dirs, "script list refreshed");
    }

    /// Execute `path` in the given output pane, terminating whatever ran
    /// there before. Start failures become pane text and a status notice,
    /// never an abort.
    pub fn execute_script(&mut self, path: &str, pane: usize) {
        if pane >= MAX_PROCESSES {
            warn!(pane, "refusing to execute into invalid pane");
            return;
        }
        let name = base_name(path).to_string();
        info!(script = %path, pane, "executing script");

        let banner = format!(
            "\x1b[1m==> {} (pane {}, {})\x1b[0m\n",
            name,
            pane + 1,
            chrono::Local::now().format("%H:%M:%S")
        );
        self.append_pane_text(pane, &banner);

        if self.manager.is_running(pane) {
            self.append_pane_text(pane, "\x1b[33mterminating previous process\x1b[0m\n");
            let _ = self.manager.terminate_script(pane);
        }
        // Recycle any terminal-status slot so the pane is free to start.
        self.manager.cleanup_finished();

        match self.manager.start_script(Path::new(path), pane) {
            Ok(true) => {
                self.set_notice(format!("Started: {name}"));
            }
            Ok(false) => {
                self.append_pane_text(pane, &format!("\x1b[31mfailed to start {name}\x1b[0m\n"));
                self.set_notice(format!("Failed to start: {name}"));
            }
            Err(e) => {
                warn!("script execution setup failed: {e}");
                self.append_pane_text(pane, &format!("\x1b[31m{e}\x1b[0m\n"));
                self.set_notice(format!("Error: {name}"));
            }
        }
    }

    /// Terminate the process in `pane`. Safe to call on an idle pane.
    pub fn terminate_script(&mut self, pane: usize) {
        if self.manager.is_running(pane) {
            info!(pane, "terminating script on request");
            let _ = self.manager.terminate_script(pane);
            self.set_notice(format!("Terminated process in pane {}", pane + 1));
        }
    }

    /// The first idle output pane, if any.
    fn available_pane(&self) -> Option<usize> {
        (0..MAX_PROCESSES).find(|pane| !self.manager.is_running(*pane))
    }

    /// Active output pane index; the script list defaults to pane 1.
    fn active_output_pane(&self) -> usize {
        self.app.layout.active.output_index().unwrap_or(0)
    }

    fn dispatch_double_click(&mut self) {
        let Some(script) = self.app.take_double_click() else {
            return;
        };
        let preferred = self.active_output_pane();
        let target = if !self.manager.is_running(preferred) {
            Some(preferred)
        } else {
            let other = 1 - preferred;
            (!self.manager.is_running(other)).then_some(other)
        };
        match target {
            Some(pane) => self.execute_script(&script, pane),
            None => {
                debug!("double-click ignored, both panes busy");
                self.set_notice("no free pane");
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.app.show_help {
            if matches!(
                key.code,
                KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Esc
            ) {
                self.app.show_help = false;
            }
            return;
        }

        if self.handle_navigation_key(&key)
            || self.handle_execution_key(&key)
            || self.handle_view_key(&key)
            || self.handle_application_key(&key)
        {
            return;
        }
        debug!(?key, "unhandled key");
    }

    fn handle_navigation_key(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.app.select_previous();
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.app.select_next();
                true
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.app.select_first();
                true
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.app.select_last();
                true
            }
            KeyCode::Tab => {
                self.app.cycle_output_focus();
                true
            }
            _ => false,
        }
    }

    fn handle_execution_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter if !ctrl => {
                if let Some(path) = self.app.selected_script().map(String::from) {
                    let pane = self.active_output_pane();
                    self.execute_script(&path, pane);
                }
                true
            }
            KeyCode::Char(' ') if !ctrl => {
                if let Some(path) = self.app.selected_script().map(String::from) {
                    match self.available_pane() {
                        Some(pane) => self.execute_script(&path, pane),
                        None => self.set_notice("no free pane"),
                    }
                }
                true
            }
            KeyCode::Char('c') if ctrl => {
                self.terminate_script(self.active_output_pane());
                true
            }
            KeyCode::Char('t') if !ctrl => {
                self.terminate_script(self.active_output_pane());
                true
            }
            _ => false,
        }
    }

    fn handle_view_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::PageUp => {
                if let Some(pane) = self.app.layout.active.output_index() {
                    self.app.panes[pane].scroll_up(PAGE_SCROLL_LINES);
                }
                true
            }
            KeyCode::PageDown => {
                if let Some(pane) = self.app.layout.active.output_index() {
                    let width = self.app.pane_content_width(pane);
                    let visible = self.app.visible_lines();
                    self.app.panes[pane].scroll_down(PAGE_SCROLL_LINES, width, visible);
                }
                true
            }
            KeyCode::Char('l') if ctrl => {
                if let Some(pane) = self.app.layout.active.output_index() {
                    self.app.panes[pane].clear();
                    let _ = self.manager.clear_output(pane);
                }
                true
            }
            KeyCode::Char('r') if !ctrl => {
                self.refresh_script_list();
                true
            }
            KeyCode::F(5) => {
                self.refresh_script_list();
                true
            }
            KeyCode::Left if ctrl => {
                if self.app.layout.resize_active_left() {
                    debug!("active pane expanded left");
                }
                true
            }
            KeyCode::Right if ctrl => {
                if self.app.layout.resize_active_right() {
                    debug!("active pane expanded right");
                }
                true
            }
            KeyCode::Up if ctrl => {
                if self.app.layout.resize_active_grow() {
                    debug!("active pane grown");
                }
                true
            }
            KeyCode::Down if ctrl => {
                if self.app.layout.resize_active_shrink() {
                    debug!("active pane shrunk");
                }
                true
            }
            KeyCode::Char('[') => {
                self.app.layout.narrow_script_list();
                true
            }
            KeyCode::Char(']') => {
                self.app.layout.widen_script_list();
                true
            }
            KeyCode::Char(',') => {
                self.app.layout.narrow_output1();
                true
            }
            KeyCode::Char('.') => {
                self.app.layout.widen_output1();
                true
            }
            _ => false,
        }
    }

    fn handle_application_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => {
                info!("quit requested");
                self.app.should_quit = true;
                true
            }
            KeyCode::Esc => {
                info!("quit requested");
                self.app.should_quit = true;
                true
            }
            KeyCode::F(1) | KeyCode::Char('?') => {
                self.app.show_help = !self.app.show_help;
                true
            }
            KeyCode::Char('r') if ctrl => {
                info!("interface recovery requested");
                self.recover_requested = true;
                true
            }
            _ => false,
        }
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn directory_label(dir: &Path) -> String {
    if dir == Path::new(".") {
        return "Current Directory".to_string();
    }
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| dir.display().to_string())
}

/// Format a duration the status bar way: `2h15m30s`, `4m10s`, `42s`.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut text = String::new();
    if hours > 0 {
        text.push_str(&format!("{hours}h"));
    }
    if minutes > 0 || hours > 0 {
        text.push_str(&format!("{minutes}m"));
    }
    text.push_str(&format!("{seconds}s"));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ActivePane;
    use ratatui::backend::TestBackend;
    use std::collections::VecDeque;

    struct MockEventReader {
        events: VecDeque<Event>,
    }

    impl MockEventReader {
        fn new(events: Vec<Event>) -> Self {
            Self {
                events: VecDeque::from(events),
            }
        }
    }

    impl EventReader for MockEventReader {
        fn read_event(&mut self, _timeout: Duration) -> Result<Option<Event>> {
            Ok(self.events.pop_front())
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    fn ctrl_key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn test_runner() -> ScriptRunner {
        let mut runner = ScriptRunner::new(&Settings::default());
        runner.app.terminal_size = (120, 40);
        runner.app.set_scripts(vec![
            "/tmp/one.sh".to_string(),
            "--- Other Scripts ---".to_string(),
            "/tmp/two.sh".to_string(),
        ]);
        runner
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(250)), "4m10s");
        assert_eq!(format_duration(Duration::from_secs(8130)), "2h15m30s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_navigation_keys_skip_separator() {
        let mut runner = test_runner();
        assert_eq!(runner.app.selected, Some(0));

        runner.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::empty()));
        assert_eq!(runner.app.selected, Some(2));

        runner.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::empty()));
        assert_eq!(runner.app.selected, Some(0));
    }

    #[test]
    fn test_tab_cycles_output_panes() {
        let mut runner = test_runner();
        assert_eq!(runner.app.layout.active, ActivePane::Output1);
        runner.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::empty()));
        assert_eq!(runner.app.layout.active, ActivePane::Output2);
        runner.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::empty()));
        assert_eq!(runner.app.layout.active, ActivePane::Output1);
    }

    #[test]
    fn test_help_toggle_captures_keys() {
        let mut runner = test_runner();
        runner.handle_key(KeyEvent::new(KeyCode::F(1), KeyModifiers::empty()));
        assert!(runner.app.show_help);

        // While help is open, navigation keys are swallowed.
        let before = runner.app.selected;
        runner.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::empty()));
        assert_eq!(runner.app.selected, before);

        runner.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::empty()));
        assert!(!runner.app.show_help);
    }

    #[test]
    fn test_quit_keys() {
        let mut runner = test_runner();
        runner.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(runner.app.should_quit);

        let mut runner = test_runner();
        runner.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::empty()));
        assert!(runner.app.should_quit);
    }

    #[test]
    fn test_resize_keys_adjust_ratios() {
        let mut runner = test_runner();
        let before = runner.app.layout.script_list_ratio();
        runner.handle_key(KeyEvent::new(KeyCode::Char(']'), KeyModifiers::empty()));
        assert_eq!(runner.app.layout.script_list_ratio(), before + 5);
        runner.handle_key(KeyEvent::new(KeyCode::Char('['), KeyModifiers::empty()));
        assert_eq!(runner.app.layout.script_list_ratio(), before);
    }

    #[test]
    fn test_recovery_key_sets_flag() {
        let mut runner = test_runner();
        runner.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert!(runner.recover_requested);
    }

    #[test]
    fn test_available_pane_prefers_lowest_idle() {
        let runner = test_runner();
        assert_eq!(runner.available_pane(), Some(0));
    }

    #[test]
    fn test_double_click_executes_in_active_pane() {
        use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().expect("create temp dir");
        let script = temp.path().join("clickme.sh");
        fs::write(&script, "#!/bin/sh\necho clicked\n").expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

        let mut runner = ScriptRunner::new(&Settings::default());
        runner.app.terminal_size = (120, 40);
        runner.app.set_scripts(vec![script.display().to_string()]);

        let click = |column: u16| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row: 1,
            modifiers: KeyModifiers::empty(),
        };
        assert!(runner.app.handle_mouse(click(2)));
        assert!(runner.app.handle_mouse(click(2)));
        runner.dispatch_double_click();

        // The active pane defaults to output pane 1 (slot 0).
        let deadline = Instant::now() + Duration::from_secs(10);
        while runner.manager.is_running(0) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(
            runner.manager.take_output(0).expect("drain"),
            "clicked\n"
        );
        // The double-click was consumed; a second dispatch is a no-op.
        runner.dispatch_double_click();
    }

    #[tokio::test]
    async fn test_run_loop_exits_on_quit_key() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let settings = Settings {
            scripts_dir: Some(temp.path().to_path_buf()),
            ..Settings::default()
        };
        let mut runner = ScriptRunner::new(&settings);

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).expect("create terminal");
        let mut events = MockEventReader::new(vec![
            key(KeyCode::Down),
            key(KeyCode::Tab),
            ctrl_key('q'),
        ]);

        runner
            .run(&mut terminal, &mut events)
            .await
            .expect("event loop");
        assert!(runner.app.should_quit);
    }
}
