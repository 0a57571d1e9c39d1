use anyhow::Context as _;
use parley_domain::ConversationMessage;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::Path;

pub(super) fn append_message_line(
    path: &Path,
    message: &ConversationMessage,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(message).context("failed to serialize message")?;
    line.push(b'\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(&line)
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

/// Reads every parseable message in file order. Blank and malformed lines
/// are skipped; a missing file is an empty log.
pub(super) fn read_message_lines(path: &Path) -> Vec<ConversationMessage> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "failed to open message log");
            }
            return Vec::new();
        }
    };

    let mut messages = Vec::new();
    let mut skipped = 0usize;
    for line in BufReader::new(file).split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "message log read interrupted"
                );
                break;
            }
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<ConversationMessage>(&line) {
            Ok(message) => messages.push(message),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(path = %path.display(), skipped, "skipped malformed message lines");
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::MessageType;

    #[test]
    fn malformed_lines_are_skipped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c-messages.jsonl");

        append_message_line(
            &path,
            &ConversationMessage::new("m1", MessageType::User, "one", 1),
        )
        .unwrap();
        {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&path)
                .unwrap();
            file.write_all(b"{\"uuid\": truncated\n\n").unwrap();
            file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        }
        append_message_line(
            &path,
            &ConversationMessage::new("m2", MessageType::Assistant, "two", 2),
        )
        .unwrap();

        let messages = read_message_lines(&path);
        let ids = messages.iter().map(|m| m.uuid.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_message_lines(&dir.path().join("absent.jsonl")).is_empty());
    }

    #[test]
    fn each_message_is_one_newline_terminated_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c-messages.jsonl");
        let message = ConversationMessage::new("m1", MessageType::User, "multi\nline", 1);
        append_message_line(&path, &message).unwrap();
        append_message_line(&path, &message).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with('\n'));
        assert_eq!(raw.lines().count(), 2);
    }
}
