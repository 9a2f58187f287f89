//! `softcon author` subcommands.
//!
//! | Command | Effect on `users/softcon-author` |
//! |---------|----------------------------------|
//! | `create` | full replace from `[author]` |
//! | `ensure` | create only if missing |
//! | `link-user-id` | merge `userId = "softcon-author"`; fails if missing |

use anyhow::Result;
use serde_json::Value;

use crate::config::Config;
use crate::models::AUTHOR_ID;
use crate::store::{open_store, Fields, Repository};
use crate::upload::author_record;

pub async fn run_author_create(config: &Config) -> Result<()> {
    let repo = Repository::new(open_store(config).await?);
    repo.put_author(AUTHOR_ID, &author_record(&config.author))
        .await?;
    tracing::info!(id = AUTHOR_ID, "author document written");
    println!("author {} written", AUTHOR_ID);
    Ok(())
}

pub async fn run_author_ensure(config: &Config) -> Result<()> {
    let repo = Repository::new(open_store(config).await?);
    let created = repo
        .ensure_author(AUTHOR_ID, &author_record(&config.author))
        .await?;
    if created {
        println!("author {} created", AUTHOR_ID);
    } else {
        println!("author {} already exists", AUTHOR_ID);
    }
    Ok(())
}

/// Set the author's `userId` to its own document id.
pub async fn link_user_id(repo: &Repository) -> Result<()> {
    let mut fields = Fields::new();
    fields.insert("userId".to_string(), Value::String(AUTHOR_ID.to_string()));
    repo.update_author(AUTHOR_ID, fields).await
}

pub async fn run_author_link_user_id(config: &Config) -> Result<()> {
    let repo = Repository::new(open_store(config).await?);
    link_user_id(&repo).await?;
    tracing::info!(id = AUTHOR_ID, "author userId linked");
    println!("author {} userId = {}", AUTHOR_ID, AUTHOR_ID);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthorConfig;
    use crate::store::memory::InMemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn link_sets_user_id_and_keeps_profile() {
        let repo = Repository::new(Arc::new(InMemoryStore::new()));
        repo.put_author(AUTHOR_ID, &author_record(&AuthorConfig::default()))
            .await
            .unwrap();

        link_user_id(&repo).await.unwrap();

        let stored = repo.get_author(AUTHOR_ID).await.unwrap().unwrap();
        assert_eq!(stored.record.user_id.as_deref(), Some(AUTHOR_ID));
        assert_eq!(stored.record.display_name, "아주대학교 소프트콘");
    }

    #[tokio::test]
    async fn link_without_author_fails() {
        let repo = Repository::new(Arc::new(InMemoryStore::new()));
        assert!(link_user_id(&repo).await.is_err());
    }
}
