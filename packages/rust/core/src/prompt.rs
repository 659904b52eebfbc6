//! Summarization prompt construction.

use glimpse_shared::{AppConfig, PromptLocale};

/// Builds the per-item prompt sent to the summarization service.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    locale: PromptLocale,
    summary_length: u32,
    query: Option<String>,
}

impl PromptBuilder {
    pub fn new(locale: PromptLocale, summary_length: u32) -> Self {
        Self {
            locale,
            summary_length,
            query: None,
        }
    }

    /// Attach the page-level search query as extra context.
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.trim().is_empty());
        self
    }

    pub fn locale(&self) -> PromptLocale {
        self.locale
    }

    /// Prompt for one item.
    pub fn build(&self, title: &str, url: &str) -> String {
        let n = self.summary_length;
        let mut lines: Vec<String> = match self.locale {
            PromptLocale::Japanese => vec![
                "URLに対し、次の手順に従ってステップバイステップで実行してください。".into(),
                "1 URLにアクセス出来なかった場合、結果を出力しない".into(),
                format!("2 {n}字程度に学者のように具体的に要約"),
                "3 結果のみを出力".into(),
            ],
            PromptLocale::English => vec![
                "For the URL below, carry out the following steps one by one.".into(),
                "1 If the URL cannot be accessed, output nothing".into(),
                format!("2 Summarize it concretely, like a scholar, in about {n} characters"),
                "3 Output only the result".into(),
            ],
        };

        if let Some(query) = &self.query {
            lines.push(match self.locale {
                PromptLocale::Japanese => format!("検索キーワード: {query}"),
                PromptLocale::English => format!("Search query: {query}"),
            });
        }

        lines.push(match self.locale {
            PromptLocale::Japanese => format!("{title}のURL: {url}"),
            PromptLocale::English => format!("URL of {title}: {url}"),
        });

        lines.join("\n")
    }
}

impl From<&AppConfig> for PromptBuilder {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.prompt.locale, config.prompt.summary_length)
    }
}
