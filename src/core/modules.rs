//! Module placement
//!
//! Links every local item into the modules its descriptor names. Membership is
//! decided by (item type, identity key), never by title, and new items are only
//! ever appended. A second pass over an unchanged course makes no remote calls
//! that mutate anything.

use std::collections::{BTreeMap, HashMap};

use crate::core::content::{ContentDescriptor, ContentDetails, ModulePlacement};
use crate::core::loader::LocalItem;
use crate::core::mirror::RemoteMirror;
use crate::core::report::RunReport;
use crate::remote::{
    IdentityKey, ModuleItem, ModuleItemType, NewModuleItem, RemoteCourse, RemoteKind, RemoteModule,
    RemoteResult,
};

/// What a local item points at remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementTarget {
    pub item_type: ModuleItemType,
    pub identity: IdentityKey,
    pub title: String,
    pub new_tab: bool,
}

/// Resolve the module item target of a descriptor against the mirror
pub fn resolve_target(descriptor: &ContentDescriptor, mirror: &RemoteMirror) -> Result<PlacementTarget, String> {
    let item_type = descriptor.kind().module_item_type();
    let title = descriptor.display_title().to_string();

    let remote = |kind: RemoteKind, name: &str| {
        mirror
            .find(kind, name)
            .map(|object| object.identity.clone())
            .ok_or_else(|| format!("no remote {} named '{}'", kind, name))
    };

    let (identity, new_tab) = match &descriptor.details {
        ContentDetails::Page => (remote(RemoteKind::Page, &descriptor.name)?, false),
        ContentDetails::Assignment => (remote(RemoteKind::Assignment, &descriptor.name)?, false),
        ContentDetails::File { filename, .. } => (remote(RemoteKind::File, filename)?, false),
        ContentDetails::Link {
            external_url,
            new_tab,
        } => (IdentityKey::ExternalUrl(external_url.clone()), *new_tab),
    };

    Ok(PlacementTarget {
        item_type,
        identity,
        title,
        new_tab,
    })
}

/// Find-or-create modules and append missing items, caching what it has seen
pub struct ModuleSynchronizer<'a> {
    course: &'a dyn RemoteCourse,
    mirror: &'a RemoteMirror,
    modules: Option<BTreeMap<String, RemoteModule>>,
    items: HashMap<u64, Vec<ModuleItem>>,
}

impl<'a> ModuleSynchronizer<'a> {
    pub fn new(course: &'a dyn RemoteCourse, mirror: &'a RemoteMirror) -> Self {
        Self {
            course,
            mirror,
            modules: None,
            items: HashMap::new(),
        }
    }

    /// Place every item in order
    pub fn sync<'i>(&mut self, items: impl IntoIterator<Item = &'i LocalItem>, report: &mut RunReport) {
        for item in items {
            self.sync_item(item, report);
        }
    }

    pub fn sync_item(&mut self, item: &LocalItem, report: &mut RunReport) {
        if item.descriptor.placements.is_empty() {
            return;
        }
        let label = item.label();

        let target = match resolve_target(&item.descriptor, self.mirror) {
            Ok(target) => target,
            Err(reason) => {
                tracing::warn!(folder = %label, %reason, "cannot place item in modules");
                report.warned(label, format!("{}; not placed in modules", reason));
                return;
            }
        };

        for placement in &item.descriptor.placements {
            if let Err(e) = self.place(&label, &target, placement, report) {
                tracing::error!(
                    folder = %label,
                    module = %placement.module_name,
                    error = %e,
                    "module placement failed"
                );
                report.failed(label.clone(), format!("module '{}': {}", placement.module_name, e));
            }
        }
    }

    fn place(
        &mut self,
        label: &str,
        target: &PlacementTarget,
        placement: &ModulePlacement,
        report: &mut RunReport,
    ) -> RemoteResult<()> {
        let course = self.course;
        let module_id = self.ensure_module(&placement.module_name, report)?;
        let items = self.module_items(module_id)?;

        if items.iter().any(|i| i.matches(&target.item_type, &target.identity)) {
            tracing::debug!(folder = %label, module = %placement.module_name, "already present");
            report.unchanged(label, format!("already in module '{}'", placement.module_name));
            return Ok(());
        }

        let request = NewModuleItem {
            item_type: target.item_type.clone(),
            title: target.title.clone(),
            indent: placement.indent,
            identity: target.identity.clone(),
            new_tab: target.new_tab,
        };
        let created = course.create_module_item(module_id, &request)?;
        tracing::info!(
            folder = %label,
            module = %placement.module_name,
            item_id = created.id,
            "appended module item"
        );
        items.push(created);
        report.updated(
            placement.module_name.clone(),
            format!("appended {} '{}' from {}", target.item_type, target.title, label),
        );
        Ok(())
    }

    fn known_modules(&mut self) -> RemoteResult<&mut BTreeMap<String, RemoteModule>> {
        if self.modules.is_none() {
            let mut by_name = BTreeMap::new();
            for module in self.course.list_modules()? {
                by_name.entry(module.name.clone()).or_insert(module);
            }
            self.modules = Some(by_name);
        }
        Ok(self.modules.get_or_insert_with(BTreeMap::new))
    }

    /// Id of the module with this exact name, creating it once if absent
    fn ensure_module(&mut self, name: &str, report: &mut RunReport) -> RemoteResult<u64> {
        let course = self.course;
        let modules = self.known_modules()?;
        if let Some(module) = modules.get(name) {
            return Ok(module.id);
        }

        let module = course.create_module(name)?;
        tracing::info!(module = %name, module_id = module.id, "created module");
        report.created(name, "module created");
        let id = module.id;
        modules.insert(name.to_string(), module);
        Ok(id)
    }

    fn module_items(&mut self, module_id: u64) -> RemoteResult<&mut Vec<ModuleItem>> {
        if !self.items.contains_key(&module_id) {
            let listed = self.course.list_module_items(module_id)?;
            self.items.insert(module_id, listed);
        }
        Ok(self.items.entry(module_id).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::Outcome;
    use crate::remote::memory::Mutation;
    use crate::remote::MemoryCourse;
    use std::path::PathBuf;

    fn item(folder: &str, name: &str, details: ContentDetails, modules: &[&str], indent: u32) -> LocalItem {
        LocalItem {
            folder: PathBuf::from(folder),
            descriptor: ContentDescriptor {
                name: name.to_string(),
                body: None,
                placements: modules
                    .iter()
                    .map(|m| ModulePlacement {
                        module_name: m.to_string(),
                        indent,
                    })
                    .collect(),
                details,
            },
            rubric_file: None,
        }
    }

    #[test]
    fn test_module_created_once_for_many_items() {
        let course = MemoryCourse::new(1);
        course.add_page("A", "a");
        course.add_page("B", "b");
        let mirror = RemoteMirror::fetch(&course).unwrap();
        let items = vec![
            item("a.page", "A", ContentDetails::Page, &["Week 2"], 0),
            item("b.page", "B", ContentDetails::Page, &["Week 2"], 1),
        ];

        let mut report = RunReport::new();
        ModuleSynchronizer::new(&course, &mirror).sync(&items, &mut report);

        let creates = course
            .mutations()
            .into_iter()
            .filter(|m| matches!(m, Mutation::CreateModule { .. }))
            .count();
        assert_eq!(creates, 1);
        let placed = course.items_in("Week 2");
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[1].indent, 1);
    }

    #[test]
    fn test_missing_remote_target_is_warned() {
        let course = MemoryCourse::new(1);
        let mirror = RemoteMirror::fetch(&course).unwrap();
        let items = vec![item("ghost.page", "Ghost", ContentDetails::Page, &["Week 1"], 0)];

        let mut report = RunReport::new();
        ModuleSynchronizer::new(&course, &mirror).sync(&items, &mut report);

        assert_eq!(report.count(Outcome::Warned), 1);
        assert!(course.mutations().is_empty());
    }

    #[test]
    fn test_file_and_link_targets() {
        let course = MemoryCourse::new(1);
        let file_id = course.add_file("slides.pdf");
        let mirror = RemoteMirror::fetch(&course).unwrap();

        let file = item(
            "slides.file",
            "Slides",
            ContentDetails::File {
                filename: "slides.pdf".to_string(),
                title: "Lecture slides".to_string(),
            },
            &["Week 1"],
            0,
        );
        let target = resolve_target(&file.descriptor, &mirror).unwrap();
        assert_eq!(target.identity, IdentityKey::ContentId(file_id));
        assert_eq!(target.title, "Lecture slides");

        let link = item(
            "docs.link",
            "Docs",
            ContentDetails::Link {
                external_url: "https://docs.example.com".to_string(),
                new_tab: true,
            },
            &["Week 1"],
            0,
        );
        let target = resolve_target(&link.descriptor, &mirror).unwrap();
        assert_eq!(target.item_type, ModuleItemType::ExternalUrl);
        assert!(target.new_tab);
    }

    #[test]
    fn test_other_item_types_never_match() {
        let course = MemoryCourse::new(1);
        course.add_page("Intro", "intro");
        let module_id = course.add_module("Week 1");
        course.add_module_item(
            module_id,
            NewModuleItem {
                item_type: ModuleItemType::Other("SubHeader".to_string()),
                title: "Intro".to_string(),
                indent: 0,
                identity: IdentityKey::PageUrl("intro".to_string()),
                new_tab: false,
            },
        );
        let mirror = RemoteMirror::fetch(&course).unwrap();

        let mut report = RunReport::new();
        ModuleSynchronizer::new(&course, &mirror).sync(
            &[item("intro.page", "Intro", ContentDetails::Page, &["Week 1"], 0)],
            &mut report,
        );
        assert_eq!(course.items_in("Week 1").len(), 2);
    }
}
