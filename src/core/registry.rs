use crate::domain::ports::Node;
use crate::utils::error::{IrError, Result};
use std::collections::HashMap;
use std::fmt;

/// 型別名稱到零參數工廠函式的對照表
pub struct TypeRegistry<T: ?Sized> {
    factories: HashMap<String, fn() -> Box<T>>,
}

impl<T: ?Sized> TypeRegistry<T> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registering a name twice replaces the earlier factory.
    pub fn register(&mut self, type_name: impl Into<String>, factory: fn() -> Box<T>) {
        self.factories.insert(type_name.into(), factory);
    }

    pub fn create(&self, type_name: &str) -> Result<Box<T>> {
        let factory = self.factories.get(type_name).ok_or_else(|| IrError::UnknownType {
            type_name: type_name.to_string(),
        })?;
        Ok(factory())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl<T: ?Sized> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

fn make_node<N: Node + Default + 'static>() -> Box<dyn Node> {
    Box::new(N::default())
}

/// 單次序列化/反序列化工作階段的狀態
#[derive(Debug, Default)]
pub struct SerializationContext {
    nodes: TypeRegistry<dyn Node>,
}

impl SerializationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node<N: Node + Default + 'static>(&mut self) -> &mut Self {
        let name = N::default().runtime_type_name().to_string();
        self.nodes.register(name, make_node::<N>);
        self
    }

    pub fn create_node(&self, type_name: &str) -> Result<Box<dyn Node>> {
        self.nodes.create(type_name)
    }

    pub fn node_types(&self) -> Vec<&str> {
        self.nodes.type_names()
    }
}
