//! Feature computation (embeddings, regex, dataset columns).

use serde_json::{Map, Value};

use super::{Selection, Session, SELECT_PROJECT};
use crate::models::FeatureModel;
use crate::notify::Severity;
use crate::routes::{Action, Route};

impl Session {
    /// Starts computing a feature. The server answers immediately; the
    /// feature shows up in the project state once the job finishes.
    pub async fn add_feature(
        &self,
        selection: &Selection,
        kind: &str,
        name: &str,
        parameters: Map<String, Value>,
    ) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(kind) = self.require(Some(kind), "Select a feature type") else {
            return false;
        };
        let name = match name.trim() {
            "" => kind,
            name => name,
        };
        let feature = FeatureModel {
            kind: kind.to_string(),
            name: name.to_string(),
            parameters,
        };
        let result = self
            .mutate(Route::Feature(Action::Add), Self::scoped(project).json(&feature))
            .await;
        self.settle(
            result,
            Severity::Warning,
            format!("Feature {} under computation", name),
        )
    }

    pub async fn delete_feature(&self, selection: &Selection, name: &str) -> bool {
        let Some(project) = self.require(selection.project(), SELECT_PROJECT) else {
            return false;
        };
        let Some(name) = self.require(Some(name), "Select a feature to delete") else {
            return false;
        };
        let result = self
            .mutate(
                Route::Feature(Action::Delete),
                Self::scoped(project).query("name", name),
            )
            .await;
        self.settle(result, Severity::Success, format!("Feature {} deleted", name))
    }
}
