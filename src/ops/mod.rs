//! Domain operations against the ActiveTigger API.
//!
//! Every server operation is a method on [`Session`]. Operations are thin
//! adapters around [`ApiClient`]:
//!
//! 1. validate the identifiers they need (project, scheme, model name...);
//! 2. issue exactly one HTTP call;
//! 3. emit at most one notification and hand the payload back.
//!
//! # Failure reporting
//!
//! | Kind | Missing identifier | Server/transport failure |
//! |------|--------------------|--------------------------|
//! | read (`projects`, `project_state`, ...) | `None`, silently | `None` + `error` notification |
//! | mutation (`add_scheme`, `train_bert`, ...) | `false`/`None` + one `error` notification | `false`/`None` + `error` notification |
//! | `login` / `logout` | n/a | `Err(ApiError)` returned to the caller |
//!
//! Missing identifiers never reach the network.
//!
//! # Tracked reads
//!
//! Reads also come in a `sync_*` form that commits into a caller-owned
//! [`Resource`], keyed on the identifiers the request depends on. Switching
//! project (or scheme, or element) while an older request is in flight
//! leaves the newer selection's result visible whatever the completion
//! order. A failure is notified only when it is the committed state.
//!
//! Mutations that start a long-running server job (features, model
//! training, prediction, projection) notify `warning` ("... under
//! computation"); other completed mutations notify `success`.

use std::future::Future;
use std::sync::Arc;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::notify::{Notification, Notifier, Severity};
use crate::resource::{Outcome, Resource};
use crate::routes::Route;

pub mod auth;
pub mod elements;
pub mod export;
pub mod features;
pub mod models;
pub mod projections;
pub mod projects;
pub mod queue;
pub mod schemes;

pub use elements::AnnotationInput;
pub use export::ExportRequest;
pub use models::{BertTraining, SimpleModelTraining};

pub(crate) const SELECT_PROJECT: &str = "Select a project first";
pub(crate) const SELECT_SCHEME: &str = "Select a scheme first";

/// The project and scheme an operation applies to.
///
/// Empty strings count as "not selected".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub project: Option<String>,
    pub scheme: Option<String>,
}

impl Selection {
    pub fn new(project: Option<&str>, scheme: Option<&str>) -> Self {
        Self {
            project: project.map(str::to_string),
            scheme: scheme.map(str::to_string),
        }
    }

    pub fn project(&self) -> Option<&str> {
        non_empty(self.project.as_deref())
    }

    pub fn scheme(&self) -> Option<&str> {
        non_empty(self.scheme.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Client, notifier, and every domain operation.
pub struct Session {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl Session {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// User name of the stored credential, if logged in.
    pub fn username(&self) -> Option<String> {
        self.client.credentials().get().map(|c| c.username)
    }

    pub(crate) fn notify(&self, severity: Severity, message: impl Into<String>) {
        self.notifier.notify(Notification::new(severity, message));
    }

    /// Returns `value` when present and non-empty; otherwise emits one
    /// `error` notification with `message` and returns `None`.
    pub(crate) fn require<'a>(&self, value: Option<&'a str>, message: &str) -> Option<&'a str> {
        match non_empty(value) {
            Some(v) => Some(v),
            None => {
                self.notify(Severity::Error, message);
                None
            }
        }
    }

    /// Like [`require`](Session::require) for a condition instead of a value.
    pub(crate) fn ensure(&self, condition: bool, message: &str) -> bool {
        if !condition {
            self.notify(Severity::Error, message);
        }
        condition
    }

    /// Collapses a read result to `Option`, notifying failures.
    pub(crate) fn read<T>(&self, what: &str, result: Result<T, ApiError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.notify(Severity::Error, format!("Could not load {}: {}", what, err));
                None
            }
        }
    }

    /// Runs a read through `resource`, notifying a committed failure.
    pub(crate) async fn track<D, T, F, Fut>(
        &self,
        what: &str,
        resource: &Resource<D, T>,
        deps: D,
        producer: F,
    ) -> Outcome
    where
        D: Clone + PartialEq,
        T: Clone,
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let outcome = resource.sync(deps, producer).await;
        if outcome == Outcome::Committed {
            if let Some(err) = resource.error() {
                self.notify(Severity::Error, format!("Could not load {}: {}", what, err));
            }
        }
        outcome
    }

    /// Notifies the outcome of a mutation and returns whether it succeeded.
    pub(crate) fn settle(
        &self,
        result: Result<(), ApiError>,
        severity: Severity,
        message: impl Into<String>,
    ) -> bool {
        match result {
            Ok(()) => {
                self.notify(severity, message);
                true
            }
            Err(err) => {
                self.notify(Severity::Error, err.to_string());
                false
            }
        }
    }

    /// Project-scoped query options.
    pub(crate) fn scoped(project_slug: &str) -> RequestOptions {
        RequestOptions::new().query("project_slug", project_slug)
    }

    pub(crate) async fn mutate(&self, route: Route, options: RequestOptions) -> Result<(), ApiError> {
        self.client.post_unit(&route, options).await
    }
}
