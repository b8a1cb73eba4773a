use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeCategory {
    Image,
    Text,
    Audio,
    Other,
}

/// A file sent along with a user message. Consumed by the turn that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub mime_category: MimeCategory,
}

impl Attachment {
    /// Classifies the file by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mime_category = match mime_guess::from_path(&path).first() {
            Some(mime) => match mime.type_().as_str() {
                "image" => MimeCategory::Image,
                "text" => MimeCategory::Text,
                "audio" => MimeCategory::Audio,
                _ => MimeCategory::Other,
            },
            None => MimeCategory::Other,
        };

        Self {
            path,
            mime_category,
        }
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
