//! Project listing, state, statistics, settings, test set, and lifecycle.

use std::collections::BTreeMap;

use super::{Selection, Session, SELECT_PROJECT};
use crate::client::RequestOptions;
use crate::error::ApiError;
use crate::models::{
    AvailableProjects, ProjectAuths, ProjectData, ProjectState, ProjectStatistics, ProjectSummary,
    ProjectUpdate, TestSetData,
};
use crate::notify::Severity;
use crate::resource::{Outcome, Resource};
use crate::routes::Route;

impl Session {
    /// Projects visible to the current user, unreported.
    pub async fn fetch_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        self.client
            .get::<AvailableProjects>(&Route::Projects, RequestOptions::new())
            .await
            .map(|p| p.projects)
    }

    /// Projects visible to the current user.
    pub async fn projects(&self) -> Option<Vec<ProjectSummary>> {
        let result = self.fetch_projects().await;
        self.read("projects", result)
    }

    /// Loads the project list into `resource`, keyed on the logged-in user.
    pub async fn sync_projects(&self, resource: &Resource<Option<String>, Vec<ProjectSummary>>) -> Outcome {
        self.track("projects", resource, self.username(), |_| self.fetch_projects())
            .await
    }

    /// Full state of one project, unreported. Used by pollers and
    /// [`Resource`] producers.
    pub async fn fetch_project_state(&self, project_slug: &str) -> Result<ProjectState, ApiError> {
        let route = Route::Project {
            project_slug: project_slug.to_string(),
        };
        self.client.get(&route, RequestOptions::new()).await
    }

    /// State of the selected project; `None` without a project.
    pub async fn project_state(&self, selection: &Selection) -> Option<ProjectState> {
        let project = selection.project()?;
        let result = self.fetch_project_state(project).await;
        self.read("project", result)
    }

    /// Loads the selected project's state into `resource`, keyed on the
    /// project slug. `None` without a project.
    pub async fn sync_project_state(
        &self,
        resource: &Resource<String, ProjectState>,
        selection: &Selection,
    ) -> Option<Outcome> {
        let project = selection.project()?.to_string();
        let outcome = self
            .track("project", resource, project, |slug| async move {
                self.fetch_project_state(&slug).await
            })
            .await;
        Some(outcome)
    }

    /// Annotation statistics of the selected project and scheme.
    pub async fn project_statistics(&self, selection: &Selection) -> Option<ProjectStatistics> {
        let project = selection.project()?;
        let scheme = selection.scheme()?;
        let route = Route::ProjectStatistics {
            project_slug: project.to_string(),
        };
        let result = self
            .client
            .get(&route, RequestOptions::new().query("scheme", scheme))
            .await;
        self.read("statistics", result)
    }

    /// Users with a role on the selected project, by user name.
    pub async fn project_auth(&self, selection: &Selection) -> Option<BTreeMap<String, String>> {
        let project = selection.project()?;
        let result = self
            .client
            .get::<ProjectAuths>(&Route::ProjectAuth, Self::scoped(project))
            .await
            .map(|a| a.auth);
        self.read("project users", result)
    }

    /// Creates a project from raw CSV content. Returns the new project slug.
    pub async fn create_project(&self, data: &ProjectData) -> Option<String> {
        if !self.ensure(!data.project_name.trim().is_empty(), "Give a name to the project")
            || !self.ensure(!data.csv.trim().is_empty(), "Provide a non-empty data file")
        {
            return None;
        }
        let result = self
            .client
            .post::<String>(&Route::ProjectNew, RequestOptions::new().json(data))
            .await;
        match result {
            Ok(slug) => {
                self.notify(Severity::Success, format!("Project {} created", slug));
                Some(slug)
            }
            Err(err) => {
                self.notify(Severity::Error, err.to_string());
                None
            }
        }
    }

    /// Changes name, language, text or context columns, or grows the train
    /// set of the selected project.
    pub async fn update_project(&self, selection: &Selection, update: &ProjectUpdate) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        if !self.ensure(!update.is_empty(), "Nothing to update")
            || !self.ensure(
                update.add_n_train.map_or(true, |n| n > 0),
                "Number of elements to add must be positive",
            )
        {
            return false;
        }
        let result = self
            .mutate(Route::ProjectUpdate, Self::scoped(project).json(update))
            .await;
        self.settle(result, Severity::Success, format!("Project {} updated", project))
    }

    /// Adds a test set to a project that has none.
    pub async fn create_testset(&self, selection: &Selection, testset: &TestSetData) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        if self.require(Some(testset.col_id.as_str()), "Select the id column").is_none()
            || self.require(Some(testset.col_text.as_str()), "Select the text column").is_none()
            || !self.ensure(testset.n_test > 0, "Number of test elements must be positive")
            || !self.ensure(!testset.csv.trim().is_empty(), "Provide a non-empty data file")
        {
            return false;
        }
        let result = self
            .mutate(Route::TestSetCreate, Self::scoped(project).json(testset))
            .await;
        self.settle(result, Severity::Success, format!("Test set added to {}", project))
    }

    pub async fn delete_project(&self, selection: &Selection) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let result = self
            .mutate(Route::ProjectDelete, Self::scoped(project))
            .await;
        self.settle(result, Severity::Success, format!("Project {} deleted", project))
    }
}
