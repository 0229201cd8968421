use serde_json::Value as Json;
use tracing::info;

use super::RaceService;
use crate::error::ServiceError;
use crate::model::catalog::bulk_items;
use crate::model::CatalogKind;
use crate::store::{new_document_id, path, DocumentStore, Write};

impl<S: DocumentStore> RaceService<S> {
    /// Every item of a catalog.
    pub async fn list_catalog(&self, kind: CatalogKind) -> Result<Vec<Json>, ServiceError> {
        let docs = self.store.list(&path::catalog(kind.collection())?).await?;
        Ok(docs.iter().map(|doc| kind.render(doc)).collect())
    }

    /// Create every item of `body` in one commit and return the new ids in
    /// input order. Nothing is written unless every item is valid.
    pub async fn create_catalog_items(
        &self,
        kind: CatalogKind,
        body: &Json,
    ) -> Result<Vec<String>, ServiceError> {
        let items = bulk_items(body)?;
        let validated = items
            .iter()
            .map(|item| kind.validate_item(item))
            .collect::<Result<Vec<_>, _>>()?;

        let collection = path::catalog(kind.collection())?;
        let mut ids = Vec::with_capacity(validated.len());
        let mut writes = Vec::with_capacity(validated.len());
        for fields in validated {
            let path = collection.doc(&new_document_id())?;
            ids.push(path.id().to_string());
            writes.push(Write::Create { path, fields });
        }

        self.store.commit(writes).await?;
        info!(catalog = kind.collection(), count = ids.len(), "Catalog items created");
        Ok(ids)
    }

    /// Update existing items. All items are validated first, then checked
    /// for existence one by one, then written in one commit.
    pub async fn update_catalog_items(&self, kind: CatalogKind, body: &Json) -> Result<(), ServiceError> {
        let items = bulk_items(body)?;
        let collection = path::catalog(kind.collection())?;

        let mut updates = Vec::with_capacity(items.len());
        for item in items {
            let id = item
                .get("id")
                .and_then(Json::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ServiceError::bad_request("every item needs an id"))?;
            let fields = kind.validate_item(item)?;
            updates.push((collection.doc(id)?, fields));
        }

        for (path, _) in &updates {
            self.require(path, "catalog item").await?;
        }

        let count = updates.len();
        self.store
            .commit(
                updates
                    .into_iter()
                    .map(|(path, fields)| Write::Update { path, fields })
                    .collect(),
            )
            .await?;
        info!(catalog = kind.collection(), count = count, "Catalog items updated");
        Ok(())
    }

    /// Delete items by id. Entries that are not non-blank strings are
    /// ignored; deleting an absent id is not an error.
    pub async fn delete_catalog_items(&self, kind: CatalogKind, body: &Json) -> Result<(), ServiceError> {
        let ids = bulk_items(body)?;
        let collection = path::catalog(kind.collection())?;

        let writes = ids
            .iter()
            .filter_map(|id| id.as_str().map(str::trim).filter(|id| !id.is_empty()))
            .map(|id| Ok(Write::Delete { path: collection.doc(id)? }))
            .collect::<Result<Vec<_>, ServiceError>>()?;

        if writes.is_empty() {
            return Ok(());
        }
        let count = writes.len();
        self.store.commit(writes).await?;
        info!(catalog = kind.collection(), count = count, "Catalog items deleted");
        Ok(())
    }
}
