//! Remote state mirror
//!
//! One read of the remote course per run, indexed by name.

use std::collections::BTreeMap;

use crate::remote::{RemoteCourse, RemoteKind, RemoteObject, RemoteResult};

/// Name-indexed snapshot of remote pages, assignments and files
#[derive(Debug, Clone, Default)]
pub struct RemoteMirror {
    pages: BTreeMap<String, Vec<RemoteObject>>,
    assignments: BTreeMap<String, Vec<RemoteObject>>,
    files: BTreeMap<String, Vec<RemoteObject>>,
}

impl RemoteMirror {
    /// List every page, assignment and file of the course
    pub fn fetch(course: &dyn RemoteCourse) -> RemoteResult<Self> {
        let mut mirror = Self::default();
        for kind in [RemoteKind::Page, RemoteKind::Assignment, RemoteKind::File] {
            let objects = course.list_objects(kind)?;
            tracing::debug!(course = course.course_id(), %kind, count = objects.len(), "fetched remote objects");
            mirror.extend(objects);
        }
        Ok(mirror)
    }

    /// Build a mirror from already listed objects
    pub fn from_objects(objects: impl IntoIterator<Item = RemoteObject>) -> Self {
        let mut mirror = Self::default();
        mirror.extend(objects);
        mirror
    }

    fn extend(&mut self, objects: impl IntoIterator<Item = RemoteObject>) {
        for object in objects {
            let index = match object.kind {
                RemoteKind::Page => &mut self.pages,
                RemoteKind::Assignment => &mut self.assignments,
                RemoteKind::File => &mut self.files,
            };
            index.entry(object.name.clone()).or_default().push(object);
        }
    }

    pub fn index(&self, kind: RemoteKind) -> &BTreeMap<String, Vec<RemoteObject>> {
        match kind {
            RemoteKind::Page => &self.pages,
            RemoteKind::Assignment => &self.assignments,
            RemoteKind::File => &self.files,
        }
    }

    /// First remote object of this kind carrying exactly `name`
    pub fn find(&self, kind: RemoteKind, name: &str) -> Option<&RemoteObject> {
        self.index(kind).get(name).and_then(|objects| objects.first())
    }

    /// Every remote object of this kind carrying exactly `name`
    pub fn all_named(&self, kind: RemoteKind, name: &str) -> &[RemoteObject] {
        self.index(kind).get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self, kind: RemoteKind) -> impl Iterator<Item = &str> {
        self.index(kind).keys().map(String::as_str)
    }

    pub fn len(&self, kind: RemoteKind) -> usize {
        self.index(kind).values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.assignments.is_empty() && self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryCourse;

    #[test]
    fn test_empty_course_is_not_an_error() {
        let course = MemoryCourse::new(1);
        let mirror = RemoteMirror::fetch(&course).unwrap();
        assert!(mirror.is_empty());
        assert!(mirror.find(RemoteKind::Page, "Intro").is_none());
    }

    #[test]
    fn test_repeated_names_keep_every_object() {
        let course = MemoryCourse::new(1);
        course.add_page("Intro", "intro");
        course.add_page("Intro", "intro-2");
        course.add_assignment("Essay");
        course.add_file("slides.pdf");

        let mirror = RemoteMirror::fetch(&course).unwrap();
        assert_eq!(mirror.all_named(RemoteKind::Page, "Intro").len(), 2);
        assert_eq!(mirror.len(RemoteKind::Page), 2);
        assert_eq!(mirror.names(RemoteKind::Assignment).collect::<Vec<_>>(), vec!["Essay"]);
        assert!(mirror.find(RemoteKind::File, "slides.pdf").is_some());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let course = MemoryCourse::new(1);
        course.add_page("Intro", "intro");
        let mirror = RemoteMirror::fetch(&course).unwrap();
        assert!(mirror.find(RemoteKind::Page, "intro").is_none());
    }
}
