//! Coding schemes and their labels.

use super::{Selection, Session, SELECT_PROJECT, SELECT_SCHEME};
use crate::models::SchemeModel;
use crate::notify::Severity;
use crate::routes::{Action, LabelAction, Route};

/// Scheme kind used when none is given.
pub const DEFAULT_SCHEME_KIND: &str = "multiclass";

impl Session {
    /// Creates scheme `name` in the selected project.
    pub async fn add_scheme(
        &self,
        selection: &Selection,
        name: &str,
        kind: Option<&str>,
        labels: &[String],
    ) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(name) = self.require(Some(name), "Give a name to the scheme") else {
            return false;
        };
        let scheme = SchemeModel {
            project_slug: project.to_string(),
            name: name.to_string(),
            kind: kind.unwrap_or(DEFAULT_SCHEME_KIND).to_string(),
            labels: labels.to_vec(),
        };
        let result = self
            .mutate(Route::Scheme(Action::Add), Self::scoped(project).json(&scheme))
            .await;
        self.settle(result, Severity::Success, format!("Scheme {} created", name))
    }

    /// Deletes the selected scheme.
    pub async fn delete_scheme(&self, selection: &Selection) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(name) = self.require(selection.scheme(), SELECT_SCHEME) else {
            return false;
        };
        let scheme = SchemeModel {
            project_slug: project.to_string(),
            name: name.to_string(),
            kind: DEFAULT_SCHEME_KIND.to_string(),
            labels: Vec::new(),
        };
        let result = self
            .mutate(Route::Scheme(Action::Delete), Self::scoped(project).json(&scheme))
            .await;
        self.settle(result, Severity::Success, format!("Scheme {} deleted", name))
    }

    pub async fn add_label(&self, selection: &Selection, label: &str) -> bool {
        self.label_change(selection, LabelAction::Add, label).await
    }

    pub async fn delete_label(&self, selection: &Selection, label: &str) -> bool {
        self.label_change(selection, LabelAction::Delete, label).await
    }

    /// Renames `former` to `new` in the selected scheme. Existing
    /// annotations follow the rename on the server side.
    pub async fn rename_label(&self, selection: &Selection, former: &str, new: &str) -> bool {
        let Some((project, scheme)) = self.require_scheme(selection) else {
            return false;
        };
        let Some(former) = self.require(Some(former), "Select a label to rename") else {
            return false;
        };
        let Some(new) = self.require(Some(new), "Give a new name to the label") else {
            return false;
        };
        let options = Self::scoped(project)
            .query("scheme", scheme)
            .query("former_label", former)
            .query("new_label", new);
        let result = self.mutate(Route::Label(LabelAction::Rename), options).await;
        self.settle(
            result,
            Severity::Success,
            format!("Label {} renamed to {}", former, new),
        )
    }

    async fn label_change(&self, selection: &Selection, action: LabelAction, label: &str) -> bool {
        let Some((project, scheme)) = self.require_scheme(selection) else {
            return false;
        };
        let Some(label) = self.require(Some(label), "Select a label first") else {
            return false;
        };
        let options = Self::scoped(project)
            .query("scheme", scheme)
            .query("label", label);
        let result = self.mutate(Route::Label(action), options).await;
        let verb = match action {
            LabelAction::Add => "added",
            LabelAction::Delete => "deleted",
            LabelAction::Rename => "renamed",
        };
        self.settle(result, Severity::Success, format!("Label {} {}", label, verb))
    }

    /// Project and scheme, notifying the first one missing.
    pub(crate) fn require_scheme<'a>(&self, selection: &'a Selection) -> Option<(&'a str, &'a str)> {
        let project = self.require(selection.project(), SELECT_PROJECT)?;
        let scheme = self.require(selection.scheme(), SELECT_SCHEME)?;
        Some((project, scheme))
    }
}
