// =============================================================================
// EloDex Backend - Avatar Storage
// =============================================================================
// Character avatars live on the local filesystem under a fixed per-character
// path and are served back through the /media static route.
// =============================================================================

use std::path::PathBuf;

use crate::error::AppError;

#[derive(Clone)]
pub struct AvatarStore {
    root: PathBuf,
    public_base: String,
}

impl AvatarStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Write an avatar image, replacing any previous one, and return its
    /// public URL.
    pub async fn put_avatar(
        &self,
        player_id: &str,
        character_id: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let rel = format!("players/{player_id}/characters/{character_id}/avatar.jpg");
        let path = self.root.join(&rel);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        Ok(format!("{}/media/{rel}", self.public_base))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_avatar_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path(), "http://localhost:7100");

        let url = store.put_avatar("p1", "c1", b"jpeg-bytes").await.unwrap();
        assert_eq!(
            url,
            "http://localhost:7100/media/players/p1/characters/c1/avatar.jpg"
        );

        let on_disk = dir
            .path()
            .join("players/p1/characters/c1/avatar.jpg");
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn put_avatar_overwrites_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path(), "http://localhost:7100");

        store.put_avatar("p1", "c1", b"first").await.unwrap();
        store.put_avatar("p1", "c1", b"second").await.unwrap();

        let on_disk = dir
            .path()
            .join("players/p1/characters/c1/avatar.jpg");
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"second");
    }
}
