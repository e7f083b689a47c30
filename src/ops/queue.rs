use super::Session;
use crate::client::RequestOptions;
use crate::error::ApiError;
use crate::models::Queue;
use crate::resource::{Outcome, Resource};
use crate::routes::Route;

impl Session {
    pub async fn fetch_queue(&self) -> Result<Queue, ApiError> {
        self.client.get(&Route::Queue, RequestOptions::new()).await
    }

    /// Jobs currently queued or running on the server.
    pub async fn queue(&self) -> Option<Queue> {
        let result = self.fetch_queue().await;
        self.read("queue", result)
    }

    /// Reloads the queue into `resource`. The queue has no key, so every
    /// call after the first needs a [`Resource::refetch`].
    pub async fn sync_queue(&self, resource: &Resource<(), Queue>) -> Outcome {
        self.track("queue", resource, (), |()| self.fetch_queue()).await
    }
}
