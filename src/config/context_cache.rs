//! Conversation context cache.
//!
//! Persists the [`ConversationContext`] of each conversation between CLI
//! invocations, one JSON file per conversation ID under
//! `~/.sitequery/conversations/`. Entries older than two hours are treated
//! as absent and removed on read. Every failure here is swallowed: the
//! cache is advisory and a question must never fail because of it.

use crate::model::ConversationContext;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Cache TTL: 2 hours
const CACHE_TTL_MS: i64 = 2 * 60 * 60 * 1000;

/// Get the conversation cache directory path.
fn cache_dir() -> Option<PathBuf> {
    super::global_sitequery_dir().map(|dir| dir.join("conversations"))
}

/// Sanitize a conversation ID for use as a filename.
fn sanitize_key(key: &str) -> Option<String> {
    let sanitized: String = key
        .trim()
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '.')
                || c.is_whitespace()
            {
                '_'
            } else {
                c
            }
        })
        .take(100)
        .collect();

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Read the context for a conversation.
///
/// Returns `None` if the entry is missing, stale or unreadable.
pub fn read_context(conversation_id: &str) -> Option<ConversationContext> {
    read_context_in(&cache_dir()?, conversation_id, chrono::Utc::now().timestamp_millis())
}

/// Store the context for a conversation. Returns `true` on success.
pub fn write_context(conversation_id: &str, context: &ConversationContext) -> bool {
    cache_dir().is_some_and(|dir| write_context_in(&dir, conversation_id, context))
}

/// Forget a conversation. Returns `true` if nothing is cached afterwards.
pub fn clear_context(conversation_id: &str) -> bool {
    let (Some(dir), Some(key)) = (cache_dir(), sanitize_key(conversation_id)) else {
        return false;
    };
    let path = dir.join(format!("{key}.json"));
    !path.exists() || fs::remove_file(&path).is_ok()
}

fn read_context_in(dir: &Path, conversation_id: &str, now_ms: i64) -> Option<ConversationContext> {
    let key = sanitize_key(conversation_id)?;
    let path = dir.join(format!("{key}.json"));

    let content = fs::read_to_string(&path).ok()?;
    let context: ConversationContext = serde_json::from_str(&content).ok()?;

    if now_ms.saturating_sub(context.updated_at) > CACHE_TTL_MS {
        let _ = fs::remove_file(&path);
        return None;
    }

    Some(context)
}

/// Write to a temp file then rename, so concurrent readers never see a
/// partial entry.
fn write_context_in(dir: &Path, conversation_id: &str, context: &ConversationContext) -> bool {
    let Some(key) = sanitize_key(conversation_id) else {
        return false;
    };
    if fs::create_dir_all(dir).is_err() {
        return false;
    }

    let file_path = dir.join(format!("{key}.json"));
    let temp_path = dir.join(format!("{key}.json.tmp"));

    let Ok(json) = serde_json::to_string_pretty(context) else {
        return false;
    };

    let result = (|| -> std::io::Result<()> {
        {
            let mut opts = fs::OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            opts.mode(0o600);
            let mut file = opts.open(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, &file_path)?;
        Ok(())
    })();

    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Intent, QueryAnalysis};

    fn sample_context(updated_at: i64) -> ConversationContext {
        let analysis =
            QueryAnalysis::new(Intent::ProjectStatus).with_filter("project_id", "CABOT-1B");
        ConversationContext {
            updated_at,
            ..ConversationContext::from_analysis(&analysis)
        }
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("simple"), Some("simple".to_string()));
        assert_eq!(sanitize_key("with/slash"), Some("with_slash".to_string()));
        assert_eq!(sanitize_key("../escape"), Some("___escape".to_string()));
        assert_eq!(sanitize_key("with spaces"), Some("with_spaces".to_string()));
        assert_eq!(sanitize_key(""), None);
        assert_eq!(sanitize_key("   "), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sample_context(1_000);
        assert!(write_context_in(dir.path(), "chat-1", &ctx));

        let read = read_context_in(dir.path(), "chat-1", 2_000).unwrap();
        assert_eq!(read, ctx);
    }

    #[test]
    fn test_stale_entry_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sample_context(0);
        assert!(write_context_in(dir.path(), "chat-2", &ctx));

        assert!(read_context_in(dir.path(), "chat-2", CACHE_TTL_MS + 1).is_none());
        assert!(!dir.path().join("chat-2.json").exists());
    }

    #[test]
    fn test_corrupt_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chat-3.json"), "not json").unwrap();
        assert!(read_context_in(dir.path(), "chat-3", 0).is_none());
    }

    #[test]
    fn test_cache_dir() {
        let dir = cache_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("conversations"));
    }
}
