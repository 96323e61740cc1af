// Remote persistence boundary
//
// The remote document store accepts partial updates addressed by field path
// and returns whole project documents on fetch. Everything behind this trait
// is asynchronous and single-threaded (browser event loop), hence `?Send`.

use async_trait::async_trait;
use serde_json::Value;

use crate::document::ProjectDocument;
use crate::types::{FieldPath, Result};

#[async_trait(?Send)]
pub trait PersistenceApi {
    /// Partial update of one field path of one project
    async fn write(&self, project_id: &str, field_path: FieldPath, value: &Value) -> Result<()>;

    /// Full project document, or `None` if the project does not exist
    async fn fetch(&self, project_id: &str) -> Result<Option<ProjectDocument>>;
}

pub use memory::{MemoryPersistence, RecordedWrite};

mod memory {
    use super::*;
    use crate::types::DraftError;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    /// Write log entry kept by `MemoryPersistence`
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedWrite {
        pub project_id: String,
        pub field_path: FieldPath,
        pub value: Value,
    }

    /// In-process remote store. Records every write; can be told to fail.
    #[derive(Debug, Default)]
    pub struct MemoryPersistence {
        documents: RefCell<HashMap<String, ProjectDocument>>,
        writes: RefCell<Vec<RecordedWrite>>,
        failing: RefCell<HashSet<FieldPath>>,
    }

    impl MemoryPersistence {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, document: ProjectDocument) {
            self.documents.borrow_mut().insert(document.id.clone(), document);
        }

        /// Make writes to `field_path` fail until `recover` is called
        pub fn fail_on(&self, field_path: FieldPath) {
            self.failing.borrow_mut().insert(field_path);
        }

        pub fn recover(&self) {
            self.failing.borrow_mut().clear();
        }

        pub fn writes(&self) -> Vec<RecordedWrite> {
            self.writes.borrow().clone()
        }

        pub fn document(&self, project_id: &str) -> Option<ProjectDocument> {
            self.documents.borrow().get(project_id).cloned()
        }
    }

    #[async_trait(?Send)]
    impl PersistenceApi for MemoryPersistence {
        async fn write(
            &self,
            project_id: &str,
            field_path: FieldPath,
            value: &Value,
        ) -> Result<()> {
            if self.failing.borrow().contains(&field_path) {
                return Err(DraftError::Persistence("network unavailable".to_string()));
            }

            self.writes.borrow_mut().push(RecordedWrite {
                project_id: project_id.to_string(),
                field_path,
                value: value.clone(),
            });

            let mut documents = self.documents.borrow_mut();
            let document = documents
                .get_mut(project_id)
                .ok_or_else(|| DraftError::NotFound(format!("project {}", project_id)))?;
            let mut content = serde_json::to_value(&document.content)?;
            content[field_path.as_str()] = value.clone();
            document.content = serde_json::from_value(content)?;
            Ok(())
        }

        async fn fetch(&self, project_id: &str) -> Result<Option<ProjectDocument>> {
            Ok(self.documents.borrow().get(project_id).cloned())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use js::JsPersistence;

#[cfg(target_arch = "wasm32")]
mod js {
    use super::*;
    use crate::types::DraftError;
    use js_sys::{Function, Promise, Reflect};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    fn js_error(err: JsValue) -> DraftError {
        let message = err
            .as_string()
            .or_else(|| {
                Reflect::get(&err, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", err));
        DraftError::Persistence(message)
    }

    /// Remote store implemented by the page: an object with
    /// `write(projectId, fieldPath, value) -> Promise` and
    /// `fetch(projectId) -> Promise<object | null>`.
    pub struct JsPersistence {
        target: JsValue,
        write: Function,
        fetch: Function,
    }

    impl JsPersistence {
        pub fn new(target: JsValue) -> Result<Self> {
            let write = Self::method(&target, "write")?;
            let fetch = Self::method(&target, "fetch")?;
            Ok(JsPersistence { target, write, fetch })
        }

        fn method(target: &JsValue, name: &str) -> Result<Function> {
            Reflect::get(target, &JsValue::from_str(name))
                .ok()
                .and_then(|f| f.dyn_into::<Function>().ok())
                .ok_or_else(|| {
                    DraftError::Init(format!("persistence object has no {}() method", name))
                })
        }

        async fn await_promise(result: std::result::Result<JsValue, JsValue>) -> Result<JsValue> {
            let value = result.map_err(js_error)?;
            let promise = Promise::resolve(&value);
            JsFuture::from(promise).await.map_err(js_error)
        }
    }

    #[async_trait(?Send)]
    impl PersistenceApi for JsPersistence {
        async fn write(
            &self,
            project_id: &str,
            field_path: FieldPath,
            value: &Value,
        ) -> Result<()> {
            let value = serde_wasm_bindgen::to_value(value)
                .map_err(|e| DraftError::Serialization(e.to_string()))?;
            let call = self.write.call3(
                &self.target,
                &JsValue::from_str(project_id),
                &JsValue::from_str(field_path.as_str()),
                &value,
            );
            Self::await_promise(call).await.map(|_| ())
        }

        async fn fetch(&self, project_id: &str) -> Result<Option<ProjectDocument>> {
            let call = self.fetch.call1(&self.target, &JsValue::from_str(project_id));
            let value = Self::await_promise(call).await?;
            if value.is_null() || value.is_undefined() {
                return Ok(None);
            }
            let document: ProjectDocument = serde_wasm_bindgen::from_value(value)
                .map_err(|e| DraftError::Serialization(e.to_string()))?;
            if document.id.is_empty() {
                return Err(DraftError::Validation("fetched project has no id".to_string()));
            }
            Ok(Some(document))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ProjectContent;
    use crate::types::{DraftError, Section};
    use futures::executor::block_on;

    fn seeded() -> MemoryPersistence {
        let api = MemoryPersistence::new();
        let content = ProjectContent { premise: "Old".to_string(), ..Default::default() };
        api.insert(ProjectDocument::new("p1", content));
        api
    }

    #[test]
    fn test_partial_update_touches_one_field() {
        let api = seeded();
        let path = FieldPath::Section(Section::Theme);
        block_on(api.write("p1", path, &Value::from("loyalty"))).unwrap();

        let doc = api.document("p1").unwrap();
        assert_eq!(doc.content.theme, "loyalty");
        assert_eq!(doc.content.premise, "Old");
        assert_eq!(api.writes().len(), 1);
    }

    #[test]
    fn test_failing_path() {
        let api = seeded();
        let path = FieldPath::Section(Section::Premise);
        api.fail_on(path);

        let result = block_on(api.write("p1", path, &Value::from("New")));
        assert!(matches!(result, Err(DraftError::Persistence(_))));
        assert!(api.writes().is_empty());

        api.recover();
        assert!(block_on(api.write("p1", path, &Value::from("New"))).is_ok());
    }

    #[test]
    fn test_fetch_missing() {
        let api = seeded();
        assert!(block_on(api.fetch("p1")).unwrap().is_some());
        assert_eq!(block_on(api.fetch("nope")).unwrap(), None);
    }
}
