use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::prompt::Prompt;
use crate::search;

pub const EMPTY_MESSAGE: &str = "No prompts yet. Add your first one!";
pub const NO_RESULTS_MESSAGE: &str = "Nothing matched your search.";

/// What the popup shows for a given collection and search text.
#[derive(Debug, PartialEq, Eq)]
pub enum ListView<'a> {
    Empty,
    NoResults,
    Items(Vec<&'a Prompt>),
}

impl<'a> ListView<'a> {
    pub fn build(all: &'a [Prompt], query: &str) -> Self {
        if all.is_empty() {
            return ListView::Empty;
        }
        let found = search::filter(all, query);
        if found.is_empty() {
            ListView::NoResults
        } else {
            ListView::Items(found)
        }
    }

    pub fn items(&self) -> &[&'a Prompt] {
        match self {
            ListView::Items(items) => items,
            _ => &[],
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            ListView::Empty => Some(EMPTY_MESSAGE),
            ListView::NoResults => Some(NO_RESULTS_MESSAGE),
            ListView::Items(_) => None,
        }
    }
}

pub fn escape_html(input: Option<&str>) -> String {
    let Some(input) = input else {
        return String::new();
    };
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Popup markup for the list area. Every user-supplied string is escaped,
/// tags included.
pub fn render_html(view: &ListView<'_>) -> String {
    if let Some(message) = view.message() {
        return format!(
            "<div class=\"empty\">{}</div>\n",
            escape_html(Some(message))
        );
    }

    let mut html = String::new();
    for prompt in view.items() {
        let tags: String = prompt
            .tags
            .iter()
            .map(|t| format!(r#"<span class="tag">{}</span>"#, escape_html(Some(t))))
            .collect();
        html.push_str(&format!(
            r#"<div class="item" data-id="{id}">
  <div class="item-header">
    <span class="item-title">{title}</span>
  </div>
  <div class="item-tags">{tags}</div>
  <div class="item-preview">{preview}</div>
  <div class="item-actions">
    <button class="copy-btn">Copy</button>
    <button class="delete-btn">Delete</button>
  </div>
</div>"#,
            id = prompt.id,
            title = escape_html(Some(&prompt.title)),
            preview = escape_html(Some(&prompt.content)),
        ));
        html.push('\n');
    }
    html
}

pub fn confirm_delete_message(title: &str) -> String {
    format!("Delete \"{title}\"?")
}

/// Flattens `content` onto one line and cuts it to `max_width` terminal
/// columns, marking the cut with an ellipsis.
pub fn preview(content: &str, max_width: usize) -> String {
    let flat: String = content
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();
    if flat.width() <= max_width {
        return flat;
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in flat.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}
