use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::DownloadError;
use crate::chat::transcript::ChatMessage;

const SAVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MISSING_TIMESTAMP: &str = "??:??:??";

/// Transcript file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatFormat {
    Txt,
    Json,
    Html,
}

impl ChatFormat {
    pub const ALL: [ChatFormat; 3] = [Self::Txt, Self::Json, Self::Html];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Html => "html",
        }
    }

    pub fn render(
        &self,
        messages: &[ChatMessage],
        saved_at: &DateTime<Local>,
    ) -> Result<String, DownloadError> {
        match self {
            Self::Txt => Ok(render_txt(messages, saved_at)),
            Self::Json => render_json(messages, saved_at),
            Self::Html => Ok(render_html(messages, saved_at)),
        }
    }
}

impl fmt::Display for ChatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Write `messages` to `path` in `format`, replacing any existing file.
pub async fn save_transcript(
    messages: &[ChatMessage],
    format: ChatFormat,
    path: &Path,
) -> Result<(), DownloadError> {
    let contents = format.render(messages, &Local::now())?;
    tokio::fs::write(path, contents).await?;
    info!(
        path = %path.display(),
        %format,
        messages = messages.len(),
        "Chat transcript saved"
    );
    Ok(())
}

fn display_timestamp(message: &ChatMessage) -> &str {
    if message.timestamp.is_empty() {
        MISSING_TIMESTAMP
    } else {
        &message.timestamp
    }
}

fn render_txt(messages: &[ChatMessage], saved_at: &DateTime<Local>) -> String {
    let rule = "=".repeat(60);
    let mut out = format!(
        "{rule}\nChat transcript\nSaved: {}\nMessages: {}\n{rule}\n\n",
        saved_at.format(SAVED_AT_FORMAT),
        messages.len()
    );
    for message in messages {
        out.push_str(&format!(
            "[{}] {}: {}\n",
            display_timestamp(message),
            message.username,
            message.message
        ));
    }
    out
}

#[derive(Serialize)]
struct TranscriptDocument<'a> {
    saved_at: String,
    message_count: usize,
    messages: &'a [ChatMessage],
}

fn render_json(
    messages: &[ChatMessage],
    saved_at: &DateTime<Local>,
) -> Result<String, DownloadError> {
    let document = TranscriptDocument {
        saved_at: saved_at.to_rfc3339(),
        message_count: messages.len(),
        messages,
    };
    serde_json::to_string_pretty(&document).map_err(|e| DownloadError::from(std::io::Error::from(e)))
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Chat transcript</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }
        .header { background-color: #333; color: white; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
        .chat-container { background-color: white; border-radius: 5px; padding: 20px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        .message { padding: 10px; margin-bottom: 10px; border-left: 3px solid #4CAF50; background-color: #f9f9f9; }
        .timestamp { color: #666; font-size: 0.9em; }
        .username { font-weight: bold; color: #333; }
        .text { margin-top: 5px; color: #444; }
    </style>
</head>
<body>
"#;

fn render_html(messages: &[ChatMessage], saved_at: &DateTime<Local>) -> String {
    let mut out = String::from(HTML_HEAD);
    out.push_str(&format!(
        "    <div class=\"header\">\n        <h1>Chat transcript</h1>\n        <p>Saved: {}</p>\n        <p>Messages: {}</p>\n    </div>\n    <div class=\"chat-container\">\n",
        saved_at.format(SAVED_AT_FORMAT),
        messages.len()
    ));
    for message in messages {
        out.push_str(&format!(
            "        <div class=\"message\">\n            <span class=\"timestamp\">[{}]</span>\n            <span class=\"username\">{}</span>\n            <div class=\"text\">{}</div>\n        </div>\n",
            escape_html(display_timestamp(message)),
            escape_html(&message.username),
            escape_html(&message.message)
        ));
    }
    out.push_str("    </div>\n</body>\n</html>\n");
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn saved_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
    }

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                timestamp: "10:00:05".to_string(),
                username: "alice".to_string(),
                message: "hi <all>".to_string(),
                user_id: Some("7".to_string()),
            },
            ChatMessage {
                timestamp: String::new(),
                username: "Unknown".to_string(),
                message: "привет".to_string(),
                user_id: None,
            },
        ]
    }

    #[test]
    fn text_transcript_lists_messages() {
        let text = ChatFormat::Txt.render(&messages(), &saved_at()).unwrap();
        assert!(text.contains("Saved: 2024-05-01 10:30:00\n"));
        assert!(text.contains("Messages: 2\n"));
        assert!(text.contains("[10:00:05] alice: hi <all>\n"));
        assert!(text.ends_with("[??:??:??] Unknown: привет\n"));
    }

    #[test]
    fn json_transcript_keeps_fields() {
        let json = ChatFormat::Json.render(&messages(), &saved_at()).unwrap();
        assert!(json.contains("привет"));

        let document: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(document["message_count"], 2);
        assert_eq!(document["messages"][0]["username"], "alice");
        assert_eq!(document["messages"][0]["user_id"], "7");
        assert!(document["messages"][1]["user_id"].is_null());
        assert!(
            document["saved_at"]
                .as_str()
                .unwrap()
                .starts_with("2024-05-01T10:30:00")
        );
    }

    #[test]
    fn html_transcript_escapes_text() {
        let html = ChatFormat::Html.render(&messages(), &saved_at()).unwrap();
        assert!(html.contains("hi &lt;all&gt;"));
        assert!(!html.contains("hi <all>"));
        assert!(html.contains("<p>Messages: 2</p>"));
        assert!(html.contains("[??:??:??]"));
    }

    #[tokio::test]
    async fn saves_every_format() {
        let dir = TempDir::new().unwrap();
        for format in ChatFormat::ALL {
            let path = dir.path().join(format!("talk_chat.{format}"));
            save_transcript(&messages(), format, &path).await.unwrap();
            assert!(std::fs::read_to_string(&path).unwrap().contains("alice"));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
