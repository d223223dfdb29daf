use crate::domain::value::{is_primitive_type_name, Primitive, Value};
use crate::utils::error::{IrError, Result};
use indexmap::IndexMap;
use std::fmt;

/// 物件的自我描述樹
///
/// A description is either a leaf carrying a typed [`Value`] or a composite
/// whose ordered, uniquely named properties are themselves descriptions.
/// The type-level shape (`Describable::type_description`) carries no values;
/// the instance-level description (`Describable::description`) fills them in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDescription {
    type_name: String,
    documentation: String,
    value: Option<Value>,
    properties: IndexMap<String, ObjectDescription>,
}

impl ObjectDescription {
    pub fn new(type_name: impl Into<String>, documentation: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            documentation: documentation.into(),
            value: None,
            properties: IndexMap::new(),
        }
    }

    pub fn for_type<D: Describable>(documentation: impl Into<String>) -> Self {
        Self::new(D::type_name(), documentation)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_primitive(&self) -> bool {
        is_primitive_type_name(&self.type_name)
    }

    /// 值的文字表示，沒有值時為空字串
    pub fn value_string(&self) -> String {
        self.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn get_value<T: Primitive>(&self) -> Result<T> {
        self.value
            .as_ref()
            .ok_or_else(|| IrError::not_found(format!("value of '{}'", self.type_name)))?
            .get()
    }

    pub fn set_value<T: Primitive>(&mut self, value: T) -> Result<()> {
        self.set_raw_value(value.to_value()?)
    }

    /// Stores `value` if its type matches the declared type name.
    pub fn set_raw_value(&mut self, value: Value) -> Result<()> {
        if value.type_name() != self.type_name {
            return Err(IrError::type_mismatch(&self.type_name, value.type_name()));
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn add_property<T: Primitive>(&mut self, name: &str, documentation: &str) -> &mut Self {
        self.properties
            .insert(name.to_string(), ObjectDescription::new(T::type_name(), documentation));
        self
    }

    pub fn add_described_property<D: Describable>(&mut self, name: &str, documentation: &str) -> &mut Self {
        let mut shape = D::type_description();
        shape.documentation = documentation.to_string();
        self.properties.insert(name.to_string(), shape);
        self
    }

    // 同名屬性會在原位置被取代
    pub fn add_composite_property(&mut self, name: &str, description: ObjectDescription) -> &mut Self {
        self.properties.insert(name.to_string(), description);
        self
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Result<&ObjectDescription> {
        self.properties
            .get(name)
            .ok_or_else(|| IrError::not_found(format!("property '{}' of '{}'", name, self.type_name)))
    }

    pub fn property_mut(&mut self, name: &str) -> Result<&mut ObjectDescription> {
        let type_name = &self.type_name;
        self.properties
            .get_mut(name)
            .ok_or_else(|| IrError::not_found(format!("property '{}' of '{}'", name, type_name)))
    }

    pub fn property_value<T: Primitive>(&self, name: &str) -> Result<T> {
        self.property(name)?.get_value()
    }

    pub fn set_property_value<T: Primitive>(&mut self, name: &str, value: T) -> Result<()> {
        self.property_mut(name)?.set_value(value)
    }

    /// Replaces a declared property with a populated description of the same type.
    pub fn set_property_description(&mut self, name: &str, description: ObjectDescription) -> Result<()> {
        let property = self.property_mut(name)?;
        if property.type_name != description.type_name {
            return Err(IrError::type_mismatch(&property.type_name, &description.type_name));
        }
        let documentation = std::mem::take(&mut property.documentation);
        *property = ObjectDescription {
            documentation,
            ..description
        };
        Ok(())
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &ObjectDescription)> {
        self.properties.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, name: Option<&str>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match name {
            Some(name) => write!(f, "{}{}: {}", indent, name, self.type_name)?,
            None => write!(f, "{}{}", indent, self.type_name)?,
        }
        if let Some(value) = &self.value {
            write!(f, " = {}", value)?;
        }
        if !self.documentation.is_empty() {
            write!(f, "  # {}", self.documentation)?;
        }
        writeln!(f)?;
        for (child_name, child) in &self.properties {
            child.fmt_tree(f, Some(child_name), depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ObjectDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, None, 0)
    }
}

/// 能描述自身結構的型別
pub trait Describable {
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Valueless shape of the type.
    fn type_description() -> ObjectDescription
    where
        Self: Sized;

    fn runtime_type_name(&self) -> &str;

    /// Populated description of this instance.
    fn description(&self) -> Result<ObjectDescription>;
}
