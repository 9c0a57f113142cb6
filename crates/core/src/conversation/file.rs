use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sitebot_model::{Conversation, ConversationContext, Prompt, Response};

use super::{ConversationLogger, append_exchange, merge_metadata};

/// A logger that keeps the conversation document on disk up to date.
///
/// The whole document is rewritten after every change, so the file always
/// holds the latest complete snapshot. Write failures are logged and
/// otherwise ignored.
#[derive(Debug)]
pub struct FileLogger {
    conversation: Conversation,
    path: PathBuf,
}

impl FileLogger {
    /// Creates a logger writing into `output_dir`.
    ///
    /// The directory is created if needed, together with a `.gitignore`
    /// that keeps its content out of version control. The document is
    /// written once right away.
    pub fn create<P: AsRef<Path>>(
        output_dir: P,
        context: &ConversationContext,
    ) -> io::Result<Self> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let gitignore = output_dir.join(".gitignore");
        if !gitignore.exists() {
            fs::write(&gitignore, "*\n")?;
        }

        let conversation = Conversation::with_context(context);
        let path = output_dir.join(file_name(&conversation));
        info!(path = %path.display(), "logging conversation");

        let mut logger = Self { conversation, path };
        logger.write()?;
        Ok(logger)
    }

    /// Returns the path of the conversation document.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> io::Result<()> {
        let text = self
            .conversation
            .to_json()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)
    }

    fn save(&self) {
        if let Err(err) = self.write() {
            warn!(path = %self.path.display(), "failed to save conversation: {err}");
        }
    }
}

impl ConversationLogger for FileLogger {
    fn log_exchange(&mut self, prompt: &Prompt, response: &Response) {
        append_exchange(&mut self.conversation, prompt, response);
        self.save();
    }

    fn add_metadata(&mut self, metadata: Map<String, Value>) {
        merge_metadata(&mut self.conversation.metadata, metadata);
        self.save();
    }

    fn snapshot(&self) -> Conversation {
        self.conversation.clone()
    }

    fn flush(&mut self) {
        self.save();
    }
}

fn file_name(conversation: &Conversation) -> String {
    let id: String = conversation.conversation_id.chars().take(8).collect();
    format!(
        "conversation_{}_{id}.json",
        conversation.timestamp.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sitebot_model::{FinalResponse, TextPrompt};

    use super::*;

    fn read(path: &Path) -> Conversation {
        Conversation::from_json(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_snapshot_after_each_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("history");
        let mut logger =
            FileLogger::create(&output_dir, &ConversationContext::default()).unwrap();

        assert_eq!(fs::read_to_string(output_dir.join(".gitignore")).unwrap(), "*\n");
        assert!(read(logger.path()).exchanges.is_empty());

        logger.log_exchange(&TextPrompt::new("a").into(), &FinalResponse::new("b").into());
        assert_eq!(read(logger.path()).exchanges.len(), 1);

        logger.log_exchange(&TextPrompt::new("c").into(), &FinalResponse::new("d").into());
        let on_disk = read(logger.path());
        assert_eq!(on_disk, logger.snapshot());
        assert_eq!(on_disk.exchanges[1].id, "exchange-2");

        let mut metadata = Map::new();
        metadata.insert("trace_url".to_owned(), json!("https://example.com/t/1"));
        logger.add_metadata(metadata);
        assert_eq!(read(logger.path()).metadata["trace_url"], "https://example.com/t/1");
    }

    #[test]
    fn test_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let logger = FileLogger::create(dir.path(), &ConversationContext::default()).unwrap();
        let conversation = logger.snapshot();

        let name = logger.path().file_name().unwrap().to_str().unwrap();
        let expected = format!(
            "conversation_{}_{}.json",
            conversation.timestamp.format("%Y%m%d_%H%M%S"),
            &conversation.conversation_id[..8]
        );
        assert_eq!(name, expected);
    }

    #[test]
    fn test_existing_gitignore_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "custom\n").unwrap();
        FileLogger::create(dir.path(), &ConversationContext::default()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(".gitignore")).unwrap(),
            "custom\n"
        );
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger =
            FileLogger::create(dir.path(), &ConversationContext::default()).unwrap();
        // Replace the document with a directory so the rename fails.
        fs::remove_file(logger.path()).unwrap();
        fs::create_dir(logger.path()).unwrap();
        fs::write(logger.path().join("keep"), "").unwrap();

        logger.log_exchange(&TextPrompt::new("a").into(), &FinalResponse::new("b").into());
        assert_eq!(logger.snapshot().exchanges.len(), 1);
    }
}
