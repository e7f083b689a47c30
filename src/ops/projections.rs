//! 2-D projections of feature space.

use super::{Selection, Session, SELECT_PROJECT};
use crate::error::ApiError;
use crate::models::{ProjectionReply, ProjectionRequest};
use crate::notify::Severity;
use crate::resource::{Outcome, Resource};
use crate::routes::Route;

impl Session {
    /// Starts computing a projection with `method` (`umap`, `tsne`) over
    /// `features`.
    pub async fn compute_projection(&self, selection: &Selection, request: &ProjectionRequest) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        if self
            .require(Some(request.method.as_str()), "Select a projection method")
            .is_none()
            || !self.ensure(!request.features.is_empty(), "Select at least one feature")
        {
            return false;
        }
        let result = self
            .mutate(Route::ProjectionCompute, Self::scoped(project).json(request))
            .await;
        self.settle(result, Severity::Warning, "Projection under computation")
    }

    /// Latest projection of the current user, unreported.
    pub async fn fetch_projection(
        &self,
        project_slug: &str,
        scheme: Option<&str>,
    ) -> Result<ProjectionReply, ApiError> {
        let options = Self::scoped(project_slug).query_opt("scheme", scheme);
        self.client.get(&Route::Projection, options).await
    }

    pub async fn projection(&self, selection: &Selection) -> Option<ProjectionReply> {
        let project = selection.project()?;
        let result = self.fetch_projection(project, selection.scheme()).await;
        self.read("projection", result)
    }

    /// Loads the projection into `resource`, keyed on project and scheme.
    pub async fn sync_projection(
        &self,
        resource: &Resource<(String, Option<String>), ProjectionReply>,
        selection: &Selection,
    ) -> Option<Outcome> {
        let key = (
            selection.project()?.to_string(),
            selection.scheme().map(str::to_string),
        );
        let outcome = self
            .track("projection", resource, key, |(project, scheme)| async move {
                self.fetch_projection(&project, scheme.as_deref()).await
            })
            .await;
        Some(outcome)
    }
}
