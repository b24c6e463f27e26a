//! Category API trait

use async_trait::async_trait;

use crate::client::models::{Category, CategoryUpdate, NewCategory};
use crate::error::Result;

/// ITIL category operations
#[async_trait]
pub trait CategoryApi: Send + Sync {
    async fn get_categories(&self) -> Result<Vec<Category>>;

    async fn get_category(&self, id: u64) -> Result<Category>;

    async fn create_category(&self, category: NewCategory) -> Result<u64>;

    async fn update_category(&self, id: u64, update: CategoryUpdate) -> Result<()>;

    async fn delete_category(&self, id: u64) -> Result<()>;
}
