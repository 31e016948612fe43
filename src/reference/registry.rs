use std::collections::BTreeMap;
use std::sync::Arc;

use super::record::{is_valid_id, Item, ItemPatch, NewItem, Validation};
use super::store::{InMemoryStore, ItemStore};
use crate::errors::{RegistryError, ResourceError};
use crate::scoring::Category;

/// Display metadata of a module, the counterpart of its `config.ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub display_name: String,
    pub description: String,
    pub icon: String,
}

/// The five operations every resource module exposes.
pub trait ResourceHandler: Send + Sync {
    fn info(&self) -> &ModuleInfo;
    fn list(&self) -> Result<Vec<Item>, ResourceError>;
    fn create(&self, input: NewItem) -> Result<Item, ResourceError>;
    fn get_by_id(&self, id: &str) -> Result<Item, ResourceError>;
    fn update(&self, id: &str, patch: ItemPatch) -> Result<Item, ResourceError>;
    fn delete(&self, id: &str) -> Result<Item, ResourceError>;
}

/// Inventory resource that validates input and delegates to an injected store.
pub struct InventoryResource {
    info: ModuleInfo,
    store: Arc<dyn ItemStore>,
}

impl InventoryResource {
    pub fn new(info: ModuleInfo, store: Arc<dyn ItemStore>) -> Self {
        Self { info, store }
    }
}

fn ensure_valid(validation: Validation) -> Result<(), ResourceError> {
    match validation {
        Validation::Valid => Ok(()),
        Validation::Invalid(errors) => Err(ResourceError::Validation(errors)),
    }
}

fn ensure_id(id: &str) -> Result<(), ResourceError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ResourceError::InvalidId)
    }
}

impl ResourceHandler for InventoryResource {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn list(&self) -> Result<Vec<Item>, ResourceError> {
        Ok(self.store.list())
    }

    fn create(&self, input: NewItem) -> Result<Item, ResourceError> {
        ensure_valid(input.validate())?;
        Ok(self.store.insert(input))
    }

    fn get_by_id(&self, id: &str) -> Result<Item, ResourceError> {
        ensure_id(id)?;
        self.store.get(id).ok_or(ResourceError::NotFound)
    }

    fn update(&self, id: &str, patch: ItemPatch) -> Result<Item, ResourceError> {
        ensure_id(id)?;
        ensure_valid(patch.validate())?;
        self.store.update(id, &patch).ok_or(ResourceError::NotFound)
    }

    fn delete(&self, id: &str) -> Result<Item, ResourceError> {
        ensure_id(id)?;
        self.store.delete(id).ok_or(ResourceError::NotFound)
    }
}

/// Static map from `(category, module)` to its handler.
///
/// Built once at startup; lookups never construct paths or load code.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: BTreeMap<(Category, String), Arc<dyn ResourceHandler>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// One inventory module per `(category, name)`, each with its own store.
    pub fn with_inventory_modules(modules: &[(Category, &str)]) -> Result<Self, RegistryError> {
        let mut builder = Registry::builder();
        for (category, name) in modules {
            let info = ModuleInfo {
                display_name: format!("{} Shop", capitalize(name)),
                description: format!("Reference inventory for {}", name),
                icon: String::new(),
            };
            let store: Arc<dyn ItemStore> = Arc::new(InMemoryStore::new());
            let handler = Arc::new(InventoryResource::new(info, store));
            builder = builder.register(*category, name, handler)?;
        }
        Ok(builder.build())
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&Arc<dyn ResourceHandler>> {
        self.handlers.get(&(category, name.to_string()))
    }

    /// Registered modules, sorted by category then name.
    pub fn modules(&self) -> impl Iterator<Item = (Category, &str)> {
        self.handlers.keys().map(|(c, n)| (*c, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    handlers: BTreeMap<(Category, String), Arc<dyn ResourceHandler>>,
}

impl RegistryBuilder {
    pub fn register(
        mut self,
        category: Category,
        name: &str,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<Self, RegistryError> {
        if name.is_empty() || name.contains('/') || name.trim() != name {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let key = (category, name.to_string());
        if self.handlers.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                category,
                name: name.to_string(),
            });
        }
        self.handlers.insert(key, handler);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            handlers: self.handlers,
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> InventoryResource {
        InventoryResource::new(
            ModuleInfo {
                display_name: "Mango Shop".to_string(),
                description: "Fresh mangoes".to_string(),
                icon: "🥭".to_string(),
            },
            Arc::new(InMemoryStore::new()),
        )
    }

    fn new_item(name: &str, price: f64) -> NewItem {
        NewItem {
            name: name.to_string(),
            description: None,
            price,
            in_stock: None,
            quantity: None,
        }
    }

    #[test]
    fn test_create_validates() {
        let r = resource();
        assert!(matches!(
            r.create(new_item("", 10.0)),
            Err(ResourceError::Validation(_))
        ));
        assert!(matches!(
            r.create(new_item("Test", -5.0)),
            Err(ResourceError::Validation(_))
        ));
        assert!(r.create(new_item("Test", 5.0)).is_ok());
        assert_eq!(r.list().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_id_before_lookup() {
        let r = resource();
        assert_eq!(r.get_by_id("not-a-valid-id"), Err(ResourceError::InvalidId));
        assert_eq!(r.delete("xyz"), Err(ResourceError::InvalidId));
        assert_eq!(
            r.get_by_id("0123456789abcdef01234567"),
            Err(ResourceError::NotFound)
        );
    }

    #[test]
    fn test_update_rejects_invalid_patch() {
        let r = resource();
        let item = r.create(new_item("Test", 5.0)).unwrap();
        let patch = ItemPatch {
            name: Some(String::new()),
            ..ItemPatch::default()
        };
        assert!(matches!(r.update(&item.id, patch), Err(ResourceError::Validation(_))));
        assert_eq!(r.get_by_id(&item.id).unwrap().name, "Test");
    }

    #[test]
    fn test_registry_rejects_duplicates_and_bad_names() {
        let handler: Arc<dyn ResourceHandler> = Arc::new(resource());
        let builder = Registry::builder()
            .register(Category::Fruits, "mango", handler.clone())
            .unwrap();
        let dup = builder.register(Category::Fruits, "mango", handler.clone());
        assert!(matches!(dup, Err(RegistryError::Duplicate { .. })));

        let bad = Registry::builder().register(Category::Fruits, "a/b", handler);
        assert_eq!(bad.err(), Some(RegistryError::InvalidName("a/b".to_string())));
    }

    #[test]
    fn test_same_name_in_both_categories_allowed() {
        let registry = Registry::with_inventory_modules(&[
            (Category::Vegetables, "pepper"),
            (Category::Fruits, "pepper"),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
        let modules: Vec<_> = registry.modules().collect();
        assert_eq!(
            modules,
            vec![(Category::Fruits, "pepper"), (Category::Vegetables, "pepper")]
        );
        assert_eq!(
            registry.get(Category::Fruits, "pepper").unwrap().info().display_name,
            "Pepper Shop"
        );
    }

    #[test]
    fn test_modules_have_separate_stores() {
        let registry = Registry::with_inventory_modules(&[
            (Category::Fruits, "apple"),
            (Category::Fruits, "kiwi"),
        ])
        .unwrap();
        let apple = registry.get(Category::Fruits, "apple").unwrap();
        apple.create(new_item("Apple", 1.0)).unwrap();

        let kiwi = registry.get(Category::Fruits, "kiwi").unwrap();
        assert!(kiwi.list().unwrap().is_empty());
    }
}
