//! Internationalization module - English and Japanese label tables

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    English,
    Japanese,
}

impl Locale {
    /// Detect locale from system environment
    pub fn detect() -> Self {
        // Check LANG, LC_ALL, LC_MESSAGES environment variables
        let lang = std::env::var("LANG")
            .or_else(|_| std::env::var("LC_ALL"))
            .or_else(|_| std::env::var("LC_MESSAGES"))
            .unwrap_or_default()
            .to_lowercase();

        Self::from_code(&lang).unwrap_or(Locale::English)
    }

    /// Parse a language code or name ("ja", "ja_JP.UTF-8", "english", ...)
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_lowercase();
        if code.starts_with("ja") || code == "日本語" {
            Some(Locale::Japanese)
        } else if code.starts_with("en") {
            Some(Locale::English)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Japanese => "ja",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Locale::English => "English",
            Locale::Japanese => "日本語",
        }
    }

    /// Shorthand for `text.get(locale)`
    pub fn t(self, text: Text) -> &'static str {
        text.get(self)
    }
}

/// Translation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    // Placeholder shown in the loading turn
    LoadingPlaceholder,

    // Phase labels, one per stage ordinal
    StageStart,
    StageIntentAnalysis,
    StageFieldIdentification,
    StageDataRetrieval,
    StageGeneration,
    StageComplete,

    // Short labels under the stage indicators
    IndicatorIntent,
    IndicatorField,
    IndicatorRetrieval,
    IndicatorGeneration,
    IndicatorComplete,

    // Session errors
    ErrorAuthRequired,
    ErrorAuthFailed,
    ErrorAccessDenied,
    ErrorTransport,
    ErrorTimeout,
    ErrorCancelled,
}

impl Text {
    pub fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::English => self.english(),
            Locale::Japanese => self.japanese(),
        }
    }

    fn english(&self) -> &'static str {
        match self {
            Text::LoadingPlaceholder => "Your request has been received and is being processed. Please wait...",

            Text::StageStart => "Starting",
            Text::StageIntentAnalysis => "Analyzing intent",
            Text::StageFieldIdentification => "Identifying fields",
            Text::StageDataRetrieval => "Searching databases",
            Text::StageGeneration => "Generating document",
            Text::StageComplete => "Done",

            Text::IndicatorIntent => "Intent",
            Text::IndicatorField => "Fields",
            Text::IndicatorRetrieval => "Search",
            Text::IndicatorGeneration => "Generate",
            Text::IndicatorComplete => "Done",

            Text::ErrorAuthRequired => "Authentication required. Please log in again.",
            Text::ErrorAuthFailed => "Authentication failed. Please log in again.",
            Text::ErrorAccessDenied => "Access denied. UUID mismatch.",
            Text::ErrorTransport => "Request failed",
            Text::ErrorTimeout => "Request timed out. Please try again.",
            Text::ErrorCancelled => "Request cancelled.",
        }
    }

    fn japanese(&self) -> &'static str {
        match self {
            Text::LoadingPlaceholder => "ご相談を承りました。現在対応中ですので、少々お待ちください...",

            Text::StageStart => "処理開始",
            Text::StageIntentAnalysis => "語意識別中",
            Text::StageFieldIdentification => "字段識別中",
            Text::StageDataRetrieval => "データベース検索中",
            Text::StageGeneration => "文書生成中",
            Text::StageComplete => "処理完了",

            Text::IndicatorIntent => "語意識別",
            Text::IndicatorField => "字段識別",
            Text::IndicatorRetrieval => "データベース検索",
            Text::IndicatorGeneration => "文書生成",
            Text::IndicatorComplete => "完了",

            Text::ErrorAuthRequired => "認証が必要です。再度ログインしてください。",
            Text::ErrorAuthFailed => "認証に失敗しました。再度ログインしてください。",
            Text::ErrorAccessDenied => "アクセスが拒否されました。UUIDが一致しません。",
            Text::ErrorTransport => "リクエストに失敗しました",
            Text::ErrorTimeout => "リクエストがタイムアウトしました。もう一度お試しください。",
            Text::ErrorCancelled => "リクエストはキャンセルされました。",
        }
    }
}

/// Human readable message for a backend step identifier, if it is a known one.
pub fn step_message(locale: Locale, step: &str) -> Option<&'static str> {
    let msg = match locale {
        Locale::English => match step {
            "_analyze_user_intent" => "Analyzing intent",
            "identify_column" => "Identifying fields",
            "process_start" => "Starting retrieval",
            "opensearch_retriever" => "Searching OpenSearch",
            "postgresql_retriever" => "Searching PostgreSQL",
            "neo4j_retriever" => "Searching Neo4j",
            "docs_retrieved" => "Search complete",
            "_process_with_llm" => "LLM processing",
            "llm_process_complete" => "LLM processing complete",
            "generating_document" => "Generating document",
            "final_answer" => "Done",
            _ => return None,
        },
        Locale::Japanese => match step {
            "_analyze_user_intent" => "語意識別中",
            "identify_column" => "字段識別中",
            "process_start" => "処理を開始しています",
            "opensearch_retriever" => "Opensearchデータベース検索中",
            "postgresql_retriever" => "Postgresqlデータベース検索中",
            "neo4j_retriever" => "Neo4jデータベース検索中",
            "docs_retrieved" => "検索完了",
            "_process_with_llm" => "LLM処理中",
            "llm_process_complete" => "LLM処理完了",
            "generating_document" => "文書生成中",
            "final_answer" => "処理完了",
            _ => return None,
        },
    };
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_from_code() {
        assert_eq!(Locale::from_code("ja_JP.UTF-8"), Some(Locale::Japanese));
        assert_eq!(Locale::from_code("en_US"), Some(Locale::English));
        assert_eq!(Locale::from_code("English"), Some(Locale::English));
        assert_eq!(Locale::from_code("es"), None);
    }

    #[test]
    fn test_code_and_name_parse_back() {
        for locale in [Locale::English, Locale::Japanese] {
            assert_eq!(Locale::from_code(locale.code()), Some(locale));
            assert_eq!(Locale::from_code(locale.display_name()), Some(locale));
        }
    }

    #[test]
    fn test_translations_exist() {
        let texts = [
            Text::LoadingPlaceholder,
            Text::StageStart,
            Text::StageComplete,
            Text::IndicatorRetrieval,
            Text::ErrorTimeout,
        ];

        for text in texts {
            assert!(!text.english().is_empty());
            assert!(!text.japanese().is_empty());
        }
    }

    #[test]
    fn test_step_message_unknown() {
        assert_eq!(step_message(Locale::Japanese, "docs_retrieved"), Some("検索完了"));
        assert_eq!(step_message(Locale::English, "mystery_step"), None);
    }
}
