//! HTTP client for the Canvas REST API (v1)

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{
    CreatedRubric, IdentityKey, JobState, ModuleItem, ModuleItemType, NewModuleItem,
    NewRubricAssociation, RemoteCourse, RemoteError, RemoteKind, RemoteModule, RemoteObject,
    RemoteResult, RubricAssociation, RubricUploadJob,
};
use crate::core::config::Config;

const PER_PAGE: &str = "100";

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

/// Blocking Canvas client bound to one course
pub struct CanvasClient {
    client: Client,
    api_root: String,
    api_key: String,
    course_id: u64,
}

impl std::fmt::Debug for CanvasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasClient")
            .field("api_root", &self.api_root)
            .field("course_id", &self.course_id)
            .finish_non_exhaustive()
    }
}

impl CanvasClient {
    /// Create a client for `course_id` on the instance at `api_url`
    pub fn new(api_url: &str, api_key: &str, course_id: u64, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_root: api_root(api_url),
            api_key: api_key.to_string(),
            course_id,
        })
    }

    pub fn from_config(config: &Config) -> RemoteResult<Self> {
        Self::new(
            &config.credentials.api_url,
            &config.credentials.api_key,
            config.course_id,
            Duration::from_secs(config.settings.request_timeout_secs),
        )
    }

    fn course_url(&self, path: &str) -> String {
        format!("{}/courses/{}/{}", self.api_root, self.course_id, path)
    }

    fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.bearer_auth(&self.api_key).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            debug!(status = status.as_u16(), %body, "remote request rejected");
            Err(RemoteError::from_status(status.as_u16(), body))
        }
    }

    /// GET every page of a list endpoint, following `Link: rel="next"`
    fn get_all<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<Vec<T>> {
        let mut results = Vec::new();
        let mut response = self.send(
            self.client
                .get(self.course_url(path))
                .query(&[("per_page", PER_PAGE)]),
        )?;

        loop {
            let next = next_link(response.headers());
            let mut batch: Vec<T> = response.json()?;
            results.append(&mut batch);
            match next {
                Some(url) => response = self.send(self.client.get(url))?,
                None => break,
            }
        }

        Ok(results)
    }

    fn post_form<T: DeserializeOwned>(&self, url: String, form: &[(String, String)]) -> RemoteResult<T> {
        Ok(self.send(self.client.post(url).form(form))?.json()?)
    }
}

/// Normalize an instance URL to its `/api/v1` root
fn api_root(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if base.ends_with("/api/v1") {
        base.to_string()
    } else {
        format!("{}/api/v1", base)
    }
}

/// Extract the `rel="next"` target from a Link header
fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    value.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let url = segments
            .next()?
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        segments
            .any(|s| s.trim() == "rel=\"next\"")
            .then(|| url.to_string())
    })
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

// =========================================================================
// Wire types
// =========================================================================

#[derive(Deserialize)]
struct PageJson {
    page_id: u64,
    url: String,
    title: String,
}

#[derive(Deserialize)]
struct AssignmentJson {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct FileJson {
    id: u64,
    filename: String,
}

#[derive(Deserialize)]
struct ModuleJson {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct ModuleItemJson {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    indent: u32,
    page_url: Option<String>,
    content_id: Option<u64>,
    external_url: Option<String>,
}

impl From<ModuleItemJson> for ModuleItem {
    fn from(json: ModuleItemJson) -> Self {
        let item_type = ModuleItemType::parse(&json.item_type);
        let identity = match item_type {
            ModuleItemType::Page => json.page_url.map(IdentityKey::PageUrl),
            ModuleItemType::Assignment | ModuleItemType::File => {
                json.content_id.map(IdentityKey::ContentId)
            }
            ModuleItemType::ExternalUrl => json.external_url.map(IdentityKey::ExternalUrl),
            ModuleItemType::Other(_) => None,
        };
        ModuleItem {
            id: json.id,
            item_type,
            title: json.title,
            indent: json.indent,
            identity,
        }
    }
}

#[derive(Deserialize)]
struct IdJson {
    id: u64,
}

#[derive(Deserialize)]
struct CreatedRubricJson {
    rubric: IdJson,
    rubric_association: Option<IdJson>,
}

#[derive(Deserialize)]
struct UploadJson {
    id: u64,
    #[serde(default)]
    workflow_state: Option<String>,
    #[serde(default)]
    rubric_id: Option<u64>,
    #[serde(default)]
    rubric: Option<IdJson>,
}

impl From<UploadJson> for RubricUploadJob {
    fn from(json: UploadJson) -> Self {
        let state = json
            .workflow_state
            .as_deref()
            .map(JobState::from_workflow_state)
            .unwrap_or(JobState::Pending);
        RubricUploadJob {
            id: json.id,
            state,
            rubric_id: json.rubric_id.or(json.rubric.map(|r| r.id)),
        }
    }
}

#[derive(Deserialize)]
struct AssociationJson {
    id: u64,
    rubric_id: u64,
    association_id: u64,
    #[serde(default)]
    purpose: String,
    #[serde(default)]
    use_for_grading: bool,
}

#[derive(Deserialize)]
struct AssociationEnvelope {
    rubric_association: AssociationJson,
}

// =========================================================================
// RemoteCourse
// =========================================================================

impl RemoteCourse for CanvasClient {
    fn course_id(&self) -> u64 {
        self.course_id
    }

    fn list_objects(&self, kind: RemoteKind) -> RemoteResult<Vec<RemoteObject>> {
        let objects = match kind {
            RemoteKind::Page => self
                .get_all::<PageJson>("pages")?
                .into_iter()
                .map(|p| RemoteObject {
                    kind,
                    id: p.page_id,
                    name: p.title,
                    identity: IdentityKey::PageUrl(p.url),
                })
                .collect(),
            RemoteKind::Assignment => self
                .get_all::<AssignmentJson>("assignments")?
                .into_iter()
                .map(|a| RemoteObject {
                    kind,
                    id: a.id,
                    name: a.name,
                    identity: IdentityKey::ContentId(a.id),
                })
                .collect(),
            RemoteKind::File => self
                .get_all::<FileJson>("files")?
                .into_iter()
                .map(|f| RemoteObject {
                    kind,
                    id: f.id,
                    name: f.filename,
                    identity: IdentityKey::ContentId(f.id),
                })
                .collect(),
        };
        Ok(objects)
    }

    fn delete_object(&self, object: &RemoteObject) -> RemoteResult<()> {
        let url = match (&object.kind, &object.identity) {
            (RemoteKind::Page, IdentityKey::PageUrl(slug)) => self.course_url(&format!("pages/{}", slug)),
            (RemoteKind::Page, _) => self.course_url(&format!("pages/page_id:{}", object.id)),
            (RemoteKind::Assignment, _) => self.course_url(&format!("assignments/{}", object.id)),
            (RemoteKind::File, _) => format!("{}/files/{}", self.api_root, object.id),
        };
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn list_modules(&self) -> RemoteResult<Vec<RemoteModule>> {
        Ok(self
            .get_all::<ModuleJson>("modules")?
            .into_iter()
            .map(|m| RemoteModule { id: m.id, name: m.name })
            .collect())
    }

    fn create_module(&self, name: &str) -> RemoteResult<RemoteModule> {
        let form = vec![("module[name]".to_string(), name.to_string())];
        let created: ModuleJson = self.post_form(self.course_url("modules"), &form)?;
        Ok(RemoteModule {
            id: created.id,
            name: created.name,
        })
    }

    fn list_module_items(&self, module_id: u64) -> RemoteResult<Vec<ModuleItem>> {
        Ok(self
            .get_all::<ModuleItemJson>(&format!("modules/{}/items", module_id))?
            .into_iter()
            .map(ModuleItem::from)
            .collect())
    }

    fn create_module_item(&self, module_id: u64, item: &NewModuleItem) -> RemoteResult<ModuleItem> {
        let mut form = vec![
            ("module_item[type]".to_string(), item.item_type.as_str().to_string()),
            ("module_item[title]".to_string(), item.title.clone()),
            ("module_item[indent]".to_string(), item.indent.to_string()),
        ];
        match &item.identity {
            IdentityKey::PageUrl(url) => form.push(("module_item[page_url]".to_string(), url.clone())),
            IdentityKey::ContentId(id) => form.push(("module_item[content_id]".to_string(), id.to_string())),
            IdentityKey::ExternalUrl(url) => {
                form.push(("module_item[external_url]".to_string(), url.clone()));
                form.push(("module_item[new_tab]".to_string(), item.new_tab.to_string()));
            }
        }

        let created: ModuleItemJson =
            self.post_form(self.course_url(&format!("modules/{}/items", module_id)), &form)?;
        Ok(created.into())
    }

    fn create_rubric(&self, params: &[(String, String)]) -> RemoteResult<CreatedRubric> {
        let created: CreatedRubricJson = self.post_form(self.course_url("rubrics"), params)?;
        Ok(CreatedRubric {
            rubric_id: created.rubric.id,
            association_id: created.rubric_association.map(|a| a.id),
        })
    }

    fn submit_rubric_upload(&self, csv: &[u8]) -> RemoteResult<RubricUploadJob> {
        let part = multipart::Part::bytes(csv.to_vec())
            .file_name("rubric.csv")
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("attachment", part);
        let response = self.send(
            self.client
                .post(self.course_url("rubrics/upload"))
                .multipart(form),
        )?;
        let upload: UploadJson = response.json()?;
        Ok(upload.into())
    }

    fn rubric_upload_status(&self, job_id: u64) -> RemoteResult<RubricUploadJob> {
        let response = self.send(
            self.client
                .get(self.course_url(&format!("rubrics/upload/{}", job_id))),
        )?;
        let upload: UploadJson = response.json()?;
        Ok(upload.into())
    }

    fn create_rubric_association(
        &self,
        association: &NewRubricAssociation,
    ) -> RemoteResult<RubricAssociation> {
        let form = vec![
            ("rubric_association[rubric_id]".to_string(), association.rubric_id.to_string()),
            ("rubric_association[association_id]".to_string(), association.assignment_id.to_string()),
            ("rubric_association[association_type]".to_string(), "Assignment".to_string()),
            ("rubric_association[title]".to_string(), association.title.clone()),
            ("rubric_association[use_for_grading]".to_string(), flag(association.use_for_grading)),
            ("rubric_association[purpose]".to_string(), association.purpose.clone()),
        ];
        let created: AssociationEnvelope =
            self.post_form(self.course_url("rubric_associations"), &form)?;
        let json = created.rubric_association;
        Ok(RubricAssociation {
            id: json.id,
            rubric_id: json.rubric_id,
            assignment_id: json.association_id,
            purpose: json.purpose,
            use_for_grading: json.use_for_grading,
        })
    }
}
