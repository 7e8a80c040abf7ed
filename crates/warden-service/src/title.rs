//! Job titles, kept to what role membership by title needs.

use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::title::{CreateTitle, Title};
use warden_core::outcome::Outcome;
use warden_core::repository::TitleRepository;

use crate::group::required_name;

pub struct TitleManager<T: TitleRepository> {
    titles: T,
}

impl<T: TitleRepository> TitleManager<T> {
    pub fn new(titles: T) -> Self {
        Self { titles }
    }

    pub async fn create_title(&self, name: &str, description: &str) -> WardenResult<Title> {
        self.titles
            .create(CreateTitle {
                name: required_name("title name", name)?,
                description: description.trim().to_string(),
            })
            .await
    }

    pub async fn list_titles(&self) -> WardenResult<Vec<Title>> {
        self.titles.list().await
    }

    pub async fn assign_user(&self, title_id: Uuid, user_id: Uuid) -> WardenResult<()> {
        self.titles.get_by_id(title_id).await?;
        self.titles.add_user(title_id, user_id).await?;
        debug!(%title_id, %user_id, "User assigned to title");
        Ok(())
    }

    pub async fn remove_user(&self, title_id: Uuid, user_id: Uuid) -> WardenResult<Outcome<()>> {
        if self.titles.remove_user(title_id, user_id).await? {
            Ok(Outcome::Done(()))
        } else {
            Ok(Outcome::no_effect("user does not hold the title"))
        }
    }
}
