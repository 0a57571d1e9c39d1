use anyhow::Context as _;
use parley_domain::ConversationIndex;
use std::path::Path;

/// Missing or unreadable index files read as empty.
pub(super) fn read_index(path: &Path) -> ConversationIndex {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ConversationIndex::default();
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read conversation index"
            );
            return ConversationIndex::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(index) => index,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "ignoring corrupt conversation index"
            );
            ConversationIndex::default()
        }
    }
}

/// Rewrites the whole index through a sibling temp file.
pub(super) fn write_index(path: &Path, index: &ConversationIndex) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let content =
        serde_json::to_vec_pretty(index).context("failed to serialize conversation index")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
