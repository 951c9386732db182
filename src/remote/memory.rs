//! In-memory test double for a course
//!
//! Holds pages, assignments, files, modules and rubrics in process memory and
//! records every mutating call, so the engine can be exercised (and its
//! idempotence checked) without a network.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use super::{
    CreatedRubric, IdentityKey, JobState, ModuleItem, NewModuleItem, NewRubricAssociation,
    RemoteCourse, RemoteError, RemoteKind, RemoteModule, RemoteObject, RemoteResult,
    RubricAssociation, RubricUploadJob,
};

/// A mutating call seen by the in-memory course
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateModule { name: String },
    CreateModuleItem { module_id: u64, item: NewModuleItem },
    DeleteObject { kind: RemoteKind, name: String },
    CreateRubric { params: Vec<(String, String)> },
    SubmitRubricUpload { csv: String },
    CreateRubricAssociation(NewRubricAssociation),
}

#[derive(Debug)]
struct UploadJob {
    rubric_id: u64,
    script: VecDeque<JobState>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    objects: Vec<RemoteObject>,
    modules: Vec<(RemoteModule, Vec<ModuleItem>)>,
    rubrics: Vec<u64>,
    associations: Vec<RubricAssociation>,
    jobs: HashMap<u64, UploadJob>,
    upload_script: Vec<JobState>,
    failing_deletes: HashSet<String>,
    fail_associations: bool,
    mutations: Vec<Mutation>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory implementation of [`RemoteCourse`]
#[derive(Debug)]
pub struct MemoryCourse {
    course_id: u64,
    state: RefCell<State>,
}

impl MemoryCourse {
    pub fn new(course_id: u64) -> Self {
        Self {
            course_id,
            state: RefCell::new(State {
                next_id: 100,
                upload_script: vec![JobState::Imported],
                ..State::default()
            }),
        }
    }

    /// Seed a page; `url` is its slug
    pub fn add_page(&self, title: &str, url: &str) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.objects.push(RemoteObject {
            kind: RemoteKind::Page,
            id,
            name: title.to_string(),
            identity: IdentityKey::PageUrl(url.to_string()),
        });
        id
    }

    pub fn add_assignment(&self, name: &str) -> u64 {
        self.add_content(RemoteKind::Assignment, name)
    }

    pub fn add_file(&self, filename: &str) -> u64 {
        self.add_content(RemoteKind::File, filename)
    }

    fn add_content(&self, kind: RemoteKind, name: &str) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.objects.push(RemoteObject {
            kind,
            id,
            name: name.to_string(),
            identity: IdentityKey::ContentId(id),
        });
        id
    }

    /// Seed a module without recording a mutation
    pub fn add_module(&self, name: &str) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.modules.push((
            RemoteModule {
                id,
                name: name.to_string(),
            },
            Vec::new(),
        ));
        id
    }

    /// Seed a module item without recording a mutation
    pub fn add_module_item(&self, module_id: u64, item: NewModuleItem) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        if let Some((_, items)) = state.modules.iter_mut().find(|(m, _)| m.id == module_id) {
            items.push(to_module_item(id, item));
        }
        id
    }

    /// Rename a remote page, keeping its slug
    pub fn rename_page(&self, url: &str, new_title: &str) {
        let mut state = self.state.borrow_mut();
        let key = IdentityKey::PageUrl(url.to_string());
        for object in state.objects.iter_mut().filter(|o| o.identity == key) {
            object.name = new_title.to_string();
        }
    }

    /// States returned by successive status polls of the next upload jobs.
    /// The last state repeats once the script is exhausted.
    pub fn script_uploads(&self, states: Vec<JobState>) {
        self.state.borrow_mut().upload_script = states;
    }

    /// Make deletes of objects with this name fail
    pub fn fail_delete(&self, name: &str) {
        self.state.borrow_mut().failing_deletes.insert(name.to_string());
    }

    pub fn fail_associations(&self) {
        self.state.borrow_mut().fail_associations = true;
    }

    pub fn objects(&self, kind: RemoteKind) -> Vec<RemoteObject> {
        self.state
            .borrow()
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .modules
            .iter()
            .map(|(m, _)| m.name.clone())
            .collect()
    }

    /// Items of the named module, in order; empty if the module is absent
    pub fn items_in(&self, module_name: &str) -> Vec<ModuleItem> {
        self.state
            .borrow()
            .modules
            .iter()
            .find(|(m, _)| m.name == module_name)
            .map(|(_, items)| items.clone())
            .unwrap_or_default()
    }

    pub fn rubric_count(&self) -> usize {
        self.state.borrow().rubrics.len()
    }

    pub fn associations(&self) -> Vec<RubricAssociation> {
        self.state.borrow().associations.clone()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.borrow().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.state.borrow_mut().mutations.clear();
    }
}

fn to_module_item(id: u64, item: NewModuleItem) -> ModuleItem {
    ModuleItem {
        id,
        item_type: item.item_type,
        title: item.title,
        indent: item.indent,
        identity: Some(item.identity),
    }
}

impl RemoteCourse for MemoryCourse {
    fn course_id(&self) -> u64 {
        self.course_id
    }

    fn list_objects(&self, kind: RemoteKind) -> RemoteResult<Vec<RemoteObject>> {
        Ok(self.objects(kind))
    }

    fn delete_object(&self, object: &RemoteObject) -> RemoteResult<()> {
        let mut state = self.state.borrow_mut();
        state.mutations.push(Mutation::DeleteObject {
            kind: object.kind,
            name: object.name.clone(),
        });
        if state.failing_deletes.contains(&object.name) {
            return Err(RemoteError::from_status(403, ""));
        }
        let before = state.objects.len();
        state
            .objects
            .retain(|o| !(o.kind == object.kind && o.id == object.id));
        if state.objects.len() == before {
            return Err(RemoteError::NotFound(format!("{} {}", object.kind, object.id)));
        }
        Ok(())
    }

    fn list_modules(&self) -> RemoteResult<Vec<RemoteModule>> {
        Ok(self
            .state
            .borrow()
            .modules
            .iter()
            .map(|(m, _)| m.clone())
            .collect())
    }

    fn create_module(&self, name: &str) -> RemoteResult<RemoteModule> {
        let mut state = self.state.borrow_mut();
        state.mutations.push(Mutation::CreateModule {
            name: name.to_string(),
        });
        let id = state.next_id();
        let module = RemoteModule {
            id,
            name: name.to_string(),
        };
        state.modules.push((module.clone(), Vec::new()));
        Ok(module)
    }

    fn list_module_items(&self, module_id: u64) -> RemoteResult<Vec<ModuleItem>> {
        self.state
            .borrow()
            .modules
            .iter()
            .find(|(m, _)| m.id == module_id)
            .map(|(_, items)| items.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("module {}", module_id)))
    }

    fn create_module_item(&self, module_id: u64, item: &NewModuleItem) -> RemoteResult<ModuleItem> {
        let mut state = self.state.borrow_mut();
        state.mutations.push(Mutation::CreateModuleItem {
            module_id,
            item: item.clone(),
        });
        let id = state.next_id();
        let created = to_module_item(id, item.clone());
        let (_, items) = state
            .modules
            .iter_mut()
            .find(|(m, _)| m.id == module_id)
            .ok_or_else(|| RemoteError::NotFound(format!("module {}", module_id)))?;
        items.push(created.clone());
        Ok(created)
    }

    fn create_rubric(&self, params: &[(String, String)]) -> RemoteResult<CreatedRubric> {
        let mut state = self.state.borrow_mut();
        state.mutations.push(Mutation::CreateRubric {
            params: params.to_vec(),
        });
        let rubric_id = state.next_id();
        state.rubrics.push(rubric_id);

        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let assignment_id = lookup("rubric_association[association_id]")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| RemoteError::Validation("missing association id".to_string()))?;
        let association = RubricAssociation {
            id: state.next_id(),
            rubric_id,
            assignment_id,
            purpose: lookup("rubric_association[purpose]").unwrap_or_default(),
            use_for_grading: lookup("rubric_association[use_for_grading]").as_deref() == Some("1"),
        };
        let association_id = association.id;
        state.associations.push(association);

        Ok(CreatedRubric {
            rubric_id,
            association_id: Some(association_id),
        })
    }

    fn submit_rubric_upload(&self, csv: &[u8]) -> RemoteResult<RubricUploadJob> {
        let mut state = self.state.borrow_mut();
        state.mutations.push(Mutation::SubmitRubricUpload {
            csv: String::from_utf8_lossy(csv).into_owned(),
        });
        let job_id = state.next_id();
        let rubric_id = state.next_id();
        let script: VecDeque<JobState> = state.upload_script.iter().copied().collect();
        state.jobs.insert(job_id, UploadJob { rubric_id, script });
        Ok(RubricUploadJob {
            id: job_id,
            state: JobState::Pending,
            rubric_id: None,
        })
    }

    fn rubric_upload_status(&self, job_id: u64) -> RemoteResult<RubricUploadJob> {
        let mut state = self.state.borrow_mut();
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| RemoteError::NotFound(format!("rubric upload {}", job_id)))?;
        let current = if job.script.len() > 1 {
            job.script.pop_front()
        } else {
            job.script.front().copied()
        }
        .unwrap_or(JobState::Imported);
        let rubric_id = job.rubric_id;

        let imported = current == JobState::Imported;
        if imported && !state.rubrics.contains(&rubric_id) {
            state.rubrics.push(rubric_id);
        }
        Ok(RubricUploadJob {
            id: job_id,
            state: current,
            rubric_id: imported.then_some(rubric_id),
        })
    }

    fn create_rubric_association(
        &self,
        association: &NewRubricAssociation,
    ) -> RemoteResult<RubricAssociation> {
        let mut state = self.state.borrow_mut();
        state
            .mutations
            .push(Mutation::CreateRubricAssociation(association.clone()));
        if state.fail_associations {
            return Err(RemoteError::Validation("association rejected".to_string()));
        }
        let created = RubricAssociation {
            id: state.next_id(),
            rubric_id: association.rubric_id,
            assignment_id: association.assignment_id,
            purpose: association.purpose.clone(),
            use_for_grading: association.use_for_grading,
        };
        state.associations.push(created.clone());
        Ok(created)
    }
}
