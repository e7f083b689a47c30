//! Element selection and annotation.

use super::{Selection, Session};
use crate::client::RequestOptions;
use crate::error::ApiError;
use crate::models::{AnnotationModel, Element, NextRequest};
use crate::notify::Severity;
use crate::resource::{Outcome, Resource};
use crate::routes::{Action, Route};

/// What to record for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationInput {
    pub element_id: String,
    pub label: Option<String>,
    pub dataset: Option<String>,
    pub comment: Option<String>,
}

impl AnnotationInput {
    pub fn new(element_id: &str, label: Option<&str>) -> Self {
        Self {
            element_id: element_id.to_string(),
            label: label.map(str::to_string),
            ..Self::default()
        }
    }
}

/// Project slug, scheme, and element id an element read depends on.
pub type ElementKey = (String, String, String);

fn element_key(selection: &Selection, element_id: &str) -> Option<ElementKey> {
    let project = selection.project()?;
    let scheme = selection.scheme()?;
    let id = element_id.trim();
    if id.is_empty() {
        return None;
    }
    Some((project.to_string(), scheme.to_string(), id.to_string()))
}

impl Session {
    /// Next element to annotate for the selected project. The scheme comes
    /// from `request`; when empty it is taken from the selection.
    pub async fn next_element(&self, selection: &Selection, mut request: NextRequest) -> Option<Element> {
        let project = selection.project()?;
        if request.scheme.trim().is_empty() {
            request.scheme = selection.scheme()?.to_string();
        }
        let result = self
            .client
            .post(&Route::NextElement, Self::scoped(project).json(&request))
            .await;
        self.read("next element", result)
    }

    /// One element by id, unreported.
    pub async fn fetch_element(
        &self,
        project_slug: &str,
        scheme: &str,
        element_id: &str,
    ) -> Result<Element, ApiError> {
        let route = Route::Element {
            element_id: element_id.to_string(),
        };
        let options = RequestOptions::new()
            .query("project_slug", project_slug)
            .query("scheme", scheme);
        self.client.get(&route, options).await
    }

    /// One element by id, with its annotation history in the selected scheme.
    pub async fn element(&self, selection: &Selection, element_id: &str) -> Option<Element> {
        let key = element_key(selection, element_id)?;
        let result = self.fetch_element(&key.0, &key.1, &key.2).await;
        self.read("element", result)
    }

    /// Loads one element into `resource`, keyed on project, scheme, and
    /// element id. `None` when any of them is missing.
    pub async fn sync_element(
        &self,
        resource: &Resource<ElementKey, Element>,
        selection: &Selection,
        element_id: &str,
    ) -> Option<Outcome> {
        let key = element_key(selection, element_id)?;
        let outcome = self
            .track("element", resource, key, |(project, scheme, id)| async move {
                self.fetch_element(&project, &scheme, &id).await
            })
            .await;
        Some(outcome)
    }

    /// Records (`Add`) or removes (`Delete`) an annotation.
    pub async fn annotate(&self, selection: &Selection, action: Action, input: &AnnotationInput) -> bool {
        self.post_annotation(selection, Route::Annotation(action), action, input)
            .await
    }

    /// Same contract as [`annotate`](Session::annotate) on the `/tags`
    /// endpoints.
    pub async fn tag(&self, selection: &Selection, action: Action, input: &AnnotationInput) -> bool {
        self.post_annotation(selection, Route::Tag(action), action, input)
            .await
    }

    async fn post_annotation(
        &self,
        selection: &Selection,
        route: Route,
        action: Action,
        input: &AnnotationInput,
    ) -> bool {
        let Some((project, scheme)) = self.require_scheme(selection) else {
            return false;
        };
        if self
            .require(Some(input.element_id.as_str()), "Select an element first")
            .is_none()
        {
            return false;
        }
        if action == Action::Add
            && self
                .require(input.label.as_deref(), "Select a label first")
                .is_none()
        {
            return false;
        }

        let annotation = AnnotationModel {
            project_slug: project.to_string(),
            scheme: scheme.to_string(),
            element_id: input.element_id.clone(),
            label: input.label.clone(),
            dataset: Some(input.dataset.clone().unwrap_or_else(|| "train".to_string())),
            comment: input.comment.clone(),
            selection: None,
        };
        let result = self
            .mutate(route, Self::scoped(project).json(&annotation))
            .await;
        let message = match action {
            Action::Add => format!("Element {} annotated", input.element_id),
            Action::Delete => format!("Annotation of {} removed", input.element_id),
        };
        self.settle(result, Severity::Success, message)
    }
}
