use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::backup;
use crate::clipboard::Clipboard;
use crate::error::{RepositoryError, StorageError};
use crate::prompt::{Prompt, PromptDraft};
use crate::repository::PromptRepository;
use crate::view::ListView;

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Ctrl and Alt chords are commands, never text.
fn is_text_input(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Tags,
    Content,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Tags,
            FormField::Tags => FormField::Content,
            FormField::Content => FormField::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Title => FormField::Content,
            FormField::Tags => FormField::Title,
            FormField::Content => FormField::Tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Search,
    Form(FormField),
    Confirm { id: i64, title: String },
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    shown_at: Instant,
}

/// Popup state. The prompt list here is a snapshot of the repository,
/// refreshed after every mutation.
pub struct App {
    repository: PromptRepository,
    clipboard: Box<dyn Clipboard>,
    export_dir: PathBuf,
    prompts: Vec<Prompt>,
    query: String,
    selected: usize,
    mode: Mode,
    draft: PromptDraft,
    toast: Option<Toast>,
    should_quit: bool,
}

impl App {
    pub async fn new(
        repository: PromptRepository,
        clipboard: Box<dyn Clipboard>,
        export_dir: PathBuf,
    ) -> Result<Self, StorageError> {
        let prompts = repository.list().await?;
        Ok(App {
            repository,
            clipboard,
            export_dir,
            prompts,
            query: String::new(),
            selected: 0,
            mode: Mode::List,
            draft: PromptDraft::default(),
            toast: None,
            should_quit: false,
        })
    }

    pub fn view(&self) -> ListView<'_> {
        ListView::build(&self.prompts, &self.query)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn draft(&self) -> &PromptDraft {
        &self.draft
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if let Some(toast) = &self.toast {
            if now.duration_since(toast.shown_at) >= TOAST_DURATION {
                self.toast = None;
            }
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        match self.mode.clone() {
            Mode::List => self.handle_list_key(key).await,
            Mode::Search => self.handle_search_key(key),
            Mode::Form(field) => self.handle_form_key(field, key).await,
            Mode::Confirm { id, .. } => self.handle_confirm_key(id, key).await,
        }
    }

    async fn handle_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('n') => self.mode = Mode::Form(FormField::Title),
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Up | KeyCode::Down => self.move_selection(key.code),
            KeyCode::Enter | KeyCode::Char('c') => self.copy_selected(),
            KeyCode::Char('d') => {
                if let Some(prompt) = self.selected_prompt() {
                    self.mode = Mode::Confirm {
                        id: prompt.id,
                        title: prompt.title.clone(),
                    };
                }
            }
            KeyCode::Char('x') => self.export().await,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.mode = Mode::List,
            KeyCode::Up | KeyCode::Down => self.move_selection(key.code),
            KeyCode::Char(c) if is_text_input(&key) => {
                self.query.push(c);
                self.selected = 0;
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.selected = 0;
            }
            _ => {}
        }
    }

    async fn handle_form_key(&mut self, field: FormField, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::List,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.save().await
            }
            KeyCode::Tab => self.mode = Mode::Form(field.next()),
            KeyCode::BackTab => self.mode = Mode::Form(field.prev()),
            KeyCode::Enter if field == FormField::Content => self.draft.content.push('\n'),
            KeyCode::Enter => self.mode = Mode::Form(field.next()),
            KeyCode::Char(c) if is_text_input(&key) => self.field_mut(field).push(c),
            KeyCode::Backspace => {
                self.field_mut(field).pop();
            }
            _ => {}
        }
    }

    async fn handle_confirm_key(&mut self, id: i64, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.mode = Mode::List;
                self.delete(id).await;
            }
            KeyCode::Char('n') | KeyCode::Esc => self.mode = Mode::List,
            _ => {}
        }
    }

    fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Title => &mut self.draft.title,
            FormField::Tags => &mut self.draft.tags,
            FormField::Content => &mut self.draft.content,
        }
    }

    fn move_selection(&mut self, code: KeyCode) {
        let len = self.view().items().len();
        match code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down if self.selected + 1 < len => self.selected += 1,
            _ => {}
        }
    }

    fn selected_prompt(&self) -> Option<Prompt> {
        self.view()
            .items()
            .get(self.selected)
            .map(|p| (*p).clone())
    }

    async fn save(&mut self) {
        match self.repository.create(&self.draft).await {
            Ok(_) => {
                self.draft.clear();
                self.mode = Mode::List;
                self.show_toast("Saved!");
                self.reload().await;
            }
            Err(RepositoryError::Validation(e)) => self.show_toast(e.to_string()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to save prompt");
                self.show_toast(format!("Save failed: {e}"));
            }
        }
    }

    async fn delete(&mut self, id: i64) {
        if let Err(e) = self.repository.delete(id).await {
            tracing::error!(id, error = %e, "Failed to delete prompt");
            self.show_toast(format!("Delete failed: {e}"));
            return;
        }
        self.reload().await;
    }

    fn copy_selected(&mut self) {
        let Some(prompt) = self.selected_prompt() else {
            return;
        };
        match self.clipboard.copy(&prompt.content) {
            Ok(()) => self.show_toast("Copied!"),
            Err(e) => {
                tracing::warn!(id = prompt.id, error = %e, "Clipboard write failed");
                self.show_toast(format!("Copy failed: {e}"));
            }
        }
    }

    async fn export(&mut self) {
        let prompts = match self.repository.list().await {
            Ok(prompts) => prompts,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                self.show_toast(format!("Export failed: {e}"));
                return;
            }
        };
        match backup::export(&prompts, &self.export_dir, Utc::now()).await {
            Ok(path) => self.show_toast(format!("Exported to {}", path.display())),
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                self.show_toast(format!("Export failed: {e}"));
            }
        }
    }

    /// Re-reads the repository and keeps the selection inside the list the
    /// current query produces. A failed read keeps the previous snapshot.
    async fn reload(&mut self) {
        match self.repository.list().await {
            Ok(prompts) => self.prompts = prompts,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload prompts");
                self.show_toast(format!("Reload failed: {e}"));
                return;
            }
        }
        let len = self.view().items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            shown_at: Instant::now(),
        });
    }
}
