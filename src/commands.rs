//! Command handlers for the `tigger` binary.
//!
//! Each `run_*` function calls one [`Session`] operation and prints its
//! payload on stdout: JSON for structured data, one line per row for lists.
//! A failed operation has already notified the user; the handler only turns
//! it into a non-zero exit.

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use activetigger_client::client::ApiClient;
use activetigger_client::config::Config;
use activetigger_client::credential::FileCredentialStore;
use activetigger_client::models::{
    NextRequest, ProjectData, ProjectUpdate, ProjectionRequest, StateSection, TestSetData,
};
use activetigger_client::notify::NotifyMode;
use activetigger_client::ops::{AnnotationInput, BertTraining, Selection, Session, SimpleModelTraining};
use activetigger_client::poll::{JobProbe, JobWatch, ProjectJobProbe, ProjectionProbe};
use activetigger_client::routes::Action;

pub use activetigger_client::ops::ExportRequest;

pub struct Context {
    pub config: Config,
    pub session: Arc<Session>,
    pub selection: Selection,
}

impl Context {
    pub fn open(config: Config, mode: NotifyMode, selection: Selection) -> Result<Self> {
        let store = Arc::new(FileCredentialStore::new(config.credentials.path.clone()));
        let client =
            ApiClient::from_config(&config.api, store).context("Failed to build HTTP client")?;
        let session = Session::new(client, Arc::from(mode.notifier()));
        Ok(Self {
            config,
            session: Arc::new(session),
            selection,
        })
    }
}

/// Background jobs `tigger watch` can wait on.
#[derive(Clone, Copy, Debug)]
pub enum Job {
    Features,
    SimpleModel,
    Bert,
    Projection,
}

/// Column mapping of a new project.
pub struct ProjectColumns {
    pub id_col: String,
    pub text_cols: Vec<String>,
    pub label_cols: Vec<String>,
    pub context_cols: Vec<String>,
    pub n_train: i64,
    pub n_test: i64,
    pub language: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn succeeded(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        bail!("{} failed", what)
    }
}

fn loaded<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("Could not load {}", what))
}

fn require_project(ctx: &Context) -> Result<&str> {
    ctx.selection
        .project()
        .ok_or_else(|| anyhow!("Select a project first (--project or [defaults].project)"))
}

/// `key=value` pairs as a JSON object. Values that parse as JSON keep their
/// type (`3`, `true`, `[1,2]`); anything else is a string.
fn params_map(params: Vec<(String, String)>) -> Map<String, Value> {
    params
        .into_iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(&v).unwrap_or(Value::String(v));
            (k, value)
        })
        .collect()
}

// ============ Auth ============

pub async fn run_login(ctx: &Context, username: &str, password: &str) -> Result<()> {
    let credential = ctx
        .session
        .login(username, password)
        .await
        .context("Login failed")?;
    println!("Logged in as {}", credential.username);
    Ok(())
}

pub async fn run_logout(ctx: &Context) -> Result<()> {
    ctx.session.logout().await.context("Logout failed")?;
    Ok(())
}

pub fn run_whoami(ctx: &Context) -> Result<()> {
    match ctx.session.client().credentials().get() {
        Some(credential) => println!("{}", credential.username),
        None => bail!("Not logged in"),
    }
    Ok(())
}

// ============ Projects ============

pub async fn run_projects_list(ctx: &Context) -> Result<()> {
    let projects = loaded(ctx.session.projects().await, "projects")?;
    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    for project in projects {
        println!(
            "{:<28} {:<32} {:<10} {}",
            project.parameters.project_slug,
            project.parameters.project_name,
            project.user_right,
            project.created_at
        );
    }
    Ok(())
}

pub async fn run_project_show(ctx: &Context) -> Result<()> {
    require_project(ctx)?;
    let state = loaded(ctx.session.project_state(&ctx.selection).await, "project")?;
    print_json(&state)
}

pub async fn run_project_stats(ctx: &Context) -> Result<()> {
    require_project(ctx)?;
    if ctx.selection.scheme().is_none() {
        bail!("Select a scheme first (--scheme or [defaults].scheme)");
    }
    let stats = loaded(
        ctx.session.project_statistics(&ctx.selection).await,
        "statistics",
    )?;
    print_json(&stats)
}

pub async fn run_project_create(
    ctx: &Context,
    name: &str,
    file: &Path,
    columns: ProjectColumns,
) -> Result<()> {
    let csv = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read data file: {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data.csv".to_string());

    let mut data = ProjectData::new(name, &filename, csv);
    data.col_id = columns.id_col;
    data.cols_text = columns.text_cols;
    data.cols_label = columns.label_cols;
    data.cols_context = columns.context_cols;
    data.n_train = columns.n_train;
    data.n_test = columns.n_test;
    data.test = columns.n_test > 0;
    data.language = columns.language;

    let slug = ctx
        .session
        .create_project(&data)
        .await
        .ok_or_else(|| anyhow!("Project creation failed"))?;
    println!("{}", slug);
    Ok(())
}

pub async fn run_project_update(ctx: &Context, update: &ProjectUpdate) -> Result<()> {
    succeeded(
        ctx.session.update_project(&ctx.selection, update).await,
        "Project update",
    )
}

pub async fn run_project_testset(
    ctx: &Context,
    file: &Path,
    id_col: &str,
    text_col: &str,
    label_col: Option<String>,
    n_test: i64,
) -> Result<()> {
    let csv = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read data file: {}", file.display()))?;
    let testset = TestSetData {
        col_text: text_col.to_string(),
        col_id: id_col.to_string(),
        n_test,
        filename: file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "test.csv".to_string()),
        csv,
        scheme: label_col.as_ref().and(ctx.selection.scheme()).map(str::to_string),
        col_label: label_col,
    };
    succeeded(
        ctx.session.create_testset(&ctx.selection, &testset).await,
        "Test set creation",
    )
}

pub async fn run_project_auth(ctx: &Context) -> Result<()> {
    require_project(ctx)?;
    let auth = loaded(ctx.session.project_auth(&ctx.selection).await, "project users")?;
    for (user, role) in auth {
        println!("{:<24} {}", user, role);
    }
    Ok(())
}

pub async fn run_project_delete(ctx: &Context) -> Result<()> {
    succeeded(
        ctx.session.delete_project(&ctx.selection).await,
        "Project deletion",
    )
}

// ============ Schemes & labels ============

pub async fn run_scheme_add(
    ctx: &Context,
    name: &str,
    kind: Option<&str>,
    labels: &[String],
) -> Result<()> {
    succeeded(
        ctx.session
            .add_scheme(&ctx.selection, name, kind, labels)
            .await,
        "Scheme creation",
    )
}

pub async fn run_scheme_delete(ctx: &Context) -> Result<()> {
    succeeded(
        ctx.session.delete_scheme(&ctx.selection).await,
        "Scheme deletion",
    )
}

pub async fn run_scheme_list(ctx: &Context) -> Result<()> {
    require_project(ctx)?;
    let state = loaded(ctx.session.project_state(&ctx.selection).await, "project")?;
    let mut schemes = state.available_schemes();
    schemes.sort();
    for scheme in schemes {
        println!("{:<24} {}", scheme, state.scheme_labels(&scheme).join(", "));
    }
    Ok(())
}

pub async fn run_label_add(ctx: &Context, label: &str) -> Result<()> {
    succeeded(
        ctx.session.add_label(&ctx.selection, label).await,
        "Label creation",
    )
}

pub async fn run_label_delete(ctx: &Context, label: &str) -> Result<()> {
    succeeded(
        ctx.session.delete_label(&ctx.selection, label).await,
        "Label deletion",
    )
}

pub async fn run_label_rename(ctx: &Context, former: &str, new: &str) -> Result<()> {
    succeeded(
        ctx.session.rename_label(&ctx.selection, former, new).await,
        "Label rename",
    )
}

// ============ Features ============

pub async fn run_feature_add(
    ctx: &Context,
    kind: &str,
    name: Option<&str>,
    params: Vec<(String, String)>,
) -> Result<()> {
    succeeded(
        ctx.session
            .add_feature(&ctx.selection, kind, name.unwrap_or(""), params_map(params))
            .await,
        "Feature computation",
    )
}

pub async fn run_feature_delete(ctx: &Context, name: &str) -> Result<()> {
    succeeded(
        ctx.session.delete_feature(&ctx.selection, name).await,
        "Feature deletion",
    )
}

pub async fn run_feature_list(ctx: &Context) -> Result<()> {
    require_project(ctx)?;
    let state = loaded(ctx.session.project_state(&ctx.selection).await, "project")?;
    for feature in state.available_features() {
        println!("{}", feature);
    }
    if state.is_training(StateSection::Features, None) {
        println!("(computation in progress)");
    }
    Ok(())
}

// ============ Elements ============

pub async fn run_next(
    ctx: &Context,
    selection: String,
    sample: String,
    label: Option<String>,
    filter: Option<String>,
) -> Result<()> {
    require_project(ctx)?;
    let scheme = ctx
        .selection
        .scheme()
        .ok_or_else(|| anyhow!("Select a scheme first (--scheme or [defaults].scheme)"))?;
    let mut request = NextRequest::new(scheme);
    request.selection = selection;
    request.sample = sample;
    request.label = label;
    request.filter = filter;
    let element = loaded(
        ctx.session.next_element(&ctx.selection, request).await,
        "next element",
    )?;
    print_json(&element)
}

pub async fn run_element(ctx: &Context, id: &str) -> Result<()> {
    require_project(ctx)?;
    let element = loaded(ctx.session.element(&ctx.selection, id).await, "element")?;
    print_json(&element)
}

/// Annotates with `label`, or removes the annotation when `label` is `None`.
pub async fn run_annotate(
    ctx: &Context,
    id: &str,
    label: Option<String>,
    comment: Option<String>,
    dataset: Option<String>,
) -> Result<()> {
    let action = if label.is_some() {
        Action::Add
    } else {
        Action::Delete
    };
    let input = AnnotationInput {
        element_id: id.to_string(),
        label,
        dataset,
        comment,
    };
    succeeded(
        ctx.session.annotate(&ctx.selection, action, &input).await,
        "Annotation",
    )
}

// ============ Models ============

pub async fn run_simplemodel(
    ctx: &Context,
    model: &str,
    features: Vec<String>,
    params: Vec<(String, String)>,
    standardize: bool,
    dichotomize: Option<String>,
) -> Result<()> {
    let mut training = SimpleModelTraining::new(model, features);
    if !params.is_empty() {
        training.params = Some(params_map(params));
    }
    training.standardize = standardize;
    training.dichotomize = dichotomize;
    succeeded(
        ctx.session
            .train_simplemodel(&ctx.selection, &training)
            .await,
        "Simple model training",
    )
}

pub async fn run_bert_train(ctx: &Context, training: &BertTraining) -> Result<()> {
    succeeded(
        ctx.session.train_bert(&ctx.selection, training).await,
        "Model training",
    )
}

pub async fn run_bert_rename(ctx: &Context, former: &str, new: &str) -> Result<()> {
    succeeded(
        ctx.session.rename_bert(&ctx.selection, former, new).await,
        "Model rename",
    )
}

pub async fn run_bert_delete(ctx: &Context, name: &str) -> Result<()> {
    succeeded(
        ctx.session.delete_bert(&ctx.selection, name).await,
        "Model deletion",
    )
}

pub async fn run_bert_predict(ctx: &Context, name: &str, dataset: &str) -> Result<()> {
    succeeded(
        ctx.session
            .predict_bert(&ctx.selection, name, dataset)
            .await,
        "Prediction",
    )
}

pub async fn run_bert_info(ctx: &Context, name: &str) -> Result<()> {
    require_project(ctx)?;
    let info = loaded(
        ctx.session.bert_information(&ctx.selection, name).await,
        "model information",
    )?;
    print_json(&info)
}

// ============ Projections & queue ============

pub async fn run_projection_compute(
    ctx: &Context,
    method: String,
    features: Vec<String>,
    params: Vec<(String, String)>,
) -> Result<()> {
    let request = ProjectionRequest {
        method,
        features,
        params: params_map(params),
    };
    succeeded(
        ctx.session
            .compute_projection(&ctx.selection, &request)
            .await,
        "Projection",
    )
}

pub async fn run_projection_show(ctx: &Context) -> Result<()> {
    require_project(ctx)?;
    let reply = loaded(ctx.session.projection(&ctx.selection).await, "projection")?;
    print_json(&reply)
}

pub async fn run_queue(ctx: &Context) -> Result<()> {
    let queue = loaded(ctx.session.queue().await, "queue")?;
    if queue.content.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }
    for (id, job) in &queue.content {
        let kind = job.get("kind").and_then(|k| k.as_str()).unwrap_or("-");
        let state = job.get("state").and_then(|s| s.as_str()).unwrap_or("-");
        println!("{:<40} {:<16} {}", id, kind, state);
    }
    Ok(())
}

// ============ Export ============

pub async fn run_export(ctx: &Context, request: &ExportRequest, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| ctx.config.export.dir.clone());
    let path = ctx
        .session
        .export(&ctx.selection, request, &dir)
        .await
        .ok_or_else(|| anyhow!("Export failed"))?;
    println!("{}", path.display());
    Ok(())
}

// ============ Watch ============

pub async fn run_watch(ctx: &Context, job: Job, interval_ms: Option<u64>) -> Result<()> {
    let project = require_project(ctx)?;
    let interval_ms = interval_ms.unwrap_or(ctx.config.polling.interval_ms);
    if interval_ms == 0 {
        bail!("--interval-ms must be > 0");
    }
    let interval = Duration::from_millis(interval_ms);

    let session = ctx.session.clone();
    let probe: Arc<dyn JobProbe> = match job {
        Job::Projection => Arc::new(ProjectionProbe::new(
            session,
            project,
            ctx.selection.scheme(),
        )),
        Job::Features => Arc::new(ProjectJobProbe::new(
            session,
            project,
            StateSection::Features,
            None,
        )),
        Job::SimpleModel => {
            let username = session.username();
            Arc::new(ProjectJobProbe::new(
                session,
                project,
                StateSection::SimpleModel,
                username,
            ))
        }
        Job::Bert => {
            let username = session.username();
            Arc::new(ProjectJobProbe::new(
                session,
                project,
                StateSection::BertModels,
                username,
            ))
        }
    };

    let mut watch = JobWatch::start(probe, interval, None);
    tracing::info!(?job, project, interval_ms, "watching job");
    tokio::select! {
        completed = watch.wait() => {
            if !completed {
                bail!("Polling stopped before the job completed");
            }
        }
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    }
    println!("Done.");
    Ok(())
}
