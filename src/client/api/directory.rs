//! Directory API trait (users and groups)

use async_trait::async_trait;

use crate::client::models::{Group, GroupUser, User};
use crate::error::Result;

/// Read-only access to users and groups
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn get_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: u64) -> Result<User>;

    async fn get_groups(&self) -> Result<Vec<Group>>;

    async fn get_group(&self, id: u64) -> Result<Group>;

    /// Memberships of a group
    async fn get_group_users(&self, group_id: u64) -> Result<Vec<GroupUser>>;
}
