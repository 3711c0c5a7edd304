use crate::prompt::Prompt;

/// Case-insensitive substring match over title, content and tags. An empty
/// query keeps everything; relative order is preserved.
pub fn filter<'a>(prompts: &'a [Prompt], query: &str) -> Vec<&'a Prompt> {
    let query = query.to_lowercase();
    prompts
        .iter()
        .filter(|p| {
            p.title.to_lowercase().contains(&query)
                || p.content.to_lowercase().contains(&query)
                || p.tags.iter().any(|t| t.to_lowercase().contains(&query))
        })
        .collect()
}
