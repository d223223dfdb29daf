use crate::core::description::{Describable, ObjectDescription};
use crate::core::registry::SerializationContext;
use crate::domain::ports::Node;
use crate::domain::value::{Primitive, Value};
use crate::utils::error::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 封存後的物件：型別標籤加上依序排列的欄位
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArchivedObject {
    #[serde(rename = "type")]
    pub type_name: String,
    pub fields: IndexMap<String, ArchiveEntry>,
}

impl ArchivedObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedArray {
    pub items: Vec<ArchivedObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchiveEntry {
    Value(Value),
    Object(ArchivedObject),
    Array(ArchivedArray),
}

impl ArchiveEntry {
    fn kind(&self) -> &str {
        match self {
            ArchiveEntry::Value(value) => value.type_name(),
            ArchiveEntry::Object(object) => &object.type_name,
            ArchiveEntry::Array(_) => "array",
        }
    }
}

/// Types that can be written to and restored from an archive.
pub trait Archivable: Describable {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_properties(&self.description()?)
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()>;
}

#[derive(Debug)]
pub struct Archiver {
    current: ArchivedObject,
}

impl Archiver {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            current: ArchivedObject::new(type_name),
        }
    }

    /// 封存單一物件，型別標籤取自其執行期型別名稱
    pub fn archive<A: Archivable + ?Sized>(object: &A) -> Result<ArchivedObject> {
        let mut archiver = Archiver::new(object.runtime_type_name());
        object.write_to_archive(&mut archiver)?;
        Ok(archiver.into_archived())
    }

    pub fn write<T: Primitive>(&mut self, name: &str, value: &T) -> Result<()> {
        self.write_value(name, value.to_value()?);
        Ok(())
    }

    pub fn write_value(&mut self, name: &str, value: Value) {
        self.current
            .fields
            .insert(name.to_string(), ArchiveEntry::Value(value));
    }

    pub fn write_object<A: Archivable + ?Sized>(&mut self, name: &str, object: &A) -> Result<()> {
        let archived = Archiver::archive(object)?;
        self.current
            .fields
            .insert(name.to_string(), ArchiveEntry::Object(archived));
        Ok(())
    }

    pub fn write_array<'a, A, I>(&mut self, name: &str, items: I) -> Result<()>
    where
        A: Archivable + ?Sized + 'a,
        I: IntoIterator<Item = &'a A>,
    {
        let items = items
            .into_iter()
            .map(|item| Archiver::archive(item))
            .collect::<Result<Vec<_>>>()?;
        self.current
            .fields
            .insert(name.to_string(), ArchiveEntry::Array(ArchivedArray { items }));
        Ok(())
    }

    /// Generic path: writes every property of a populated description.
    pub fn write_properties(&mut self, description: &ObjectDescription) -> Result<()> {
        for (name, property) in description.properties() {
            let entry = archive_property(name, property)?;
            self.current.fields.insert(name.to_string(), entry);
        }
        Ok(())
    }

    pub fn into_archived(self) -> ArchivedObject {
        self.current
    }
}

// 基本型別寫成值，其他型別寫成物件
fn archive_property(name: &str, property: &ObjectDescription) -> Result<ArchiveEntry> {
    if property.is_primitive() {
        let value = property
            .value()
            .ok_or_else(|| IrError::not_found(format!("value of property '{}'", name)))?;
        return Ok(ArchiveEntry::Value(value.clone()));
    }

    let mut archiver = Archiver::new(property.type_name());
    archiver.write_properties(property)?;
    Ok(ArchiveEntry::Object(archiver.into_archived()))
}

/// 從封存樹讀回物件的游標
#[derive(Debug, Clone, Copy)]
pub struct Unarchiver<'a> {
    object: &'a ArchivedObject,
    context: &'a SerializationContext,
}

impl<'a> Unarchiver<'a> {
    pub fn new(object: &'a ArchivedObject, context: &'a SerializationContext) -> Self {
        Self { object, context }
    }

    pub fn type_name(&self) -> &'a str {
        &self.object.type_name
    }

    pub fn context(&self) -> &'a SerializationContext {
        self.context
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.object.fields.contains_key(name)
    }

    fn entry(&self, name: &str) -> Result<&'a ArchiveEntry> {
        self.object
            .fields
            .get(name)
            .ok_or_else(|| IrError::not_found(format!("field '{}' of '{}'", name, self.object.type_name)))
    }

    pub fn read_value(&self, name: &str) -> Result<&'a Value> {
        match self.entry(name)? {
            ArchiveEntry::Value(value) => Ok(value),
            other => Err(IrError::type_mismatch("value", other.kind())),
        }
    }

    pub fn read<T: Primitive>(&self, name: &str) -> Result<T> {
        self.read_value(name)?.get()
    }

    pub fn object(&self, name: &str) -> Result<Unarchiver<'a>> {
        match self.entry(name)? {
            ArchiveEntry::Object(object) => Ok(Unarchiver::new(object, self.context)),
            other => Err(IrError::type_mismatch("object", other.kind())),
        }
    }

    /// 讀入已建構的目標物件，封存的型別標籤必須與目標一致
    pub fn read_object<A: Archivable + ?Sized>(&self, name: &str, target: &mut A) -> Result<()> {
        let child = self.object(name)?;
        if child.type_name() != target.runtime_type_name() {
            return Err(IrError::type_mismatch(target.runtime_type_name(), child.type_name()));
        }
        target.read_from_archive(&child)
    }

    pub fn read_array<T, F>(&self, name: &str, mut read_item: F) -> Result<Vec<T>>
    where
        F: FnMut(Unarchiver<'a>) -> Result<T>,
    {
        match self.entry(name)? {
            ArchiveEntry::Array(array) => array
                .items
                .iter()
                .map(|item| read_item(Unarchiver::new(item, self.context)))
                .collect(),
            other => Err(IrError::type_mismatch("array", other.kind())),
        }
    }

    /// Generic path: fills `shape` from this object's fields.
    ///
    /// Every declared property must be present. A composite property declared
    /// without children takes its children from the archived fields.
    pub fn read_properties(&self, shape: &ObjectDescription) -> Result<ObjectDescription> {
        let mut description = shape.clone();
        for (name, declared) in shape.properties() {
            let populated = self.read_property(name, declared)?;
            description.add_composite_property(name, populated);
        }
        Ok(description)
    }

    fn read_property(&self, name: &str, declared: &ObjectDescription) -> Result<ObjectDescription> {
        let mut property = declared.clone();
        if declared.is_primitive() {
            property.set_raw_value(self.read_value(name)?.clone())?;
            return Ok(property);
        }

        let child = self.object(name)?;
        if child.type_name() != declared.type_name() {
            return Err(IrError::type_mismatch(declared.type_name(), child.type_name()));
        }
        if declared.is_empty() {
            for (field, entry) in &child.object.fields {
                property.add_composite_property(field, describe_entry(entry)?);
            }
            Ok(property)
        } else {
            child.read_properties(declared)
        }
    }

    /// 依型別標籤從註冊表建立節點並讀入內容
    pub fn instantiate_node(&self) -> Result<Box<dyn Node>> {
        let mut node = self.context.create_node(self.type_name())?;
        node.read_from_archive(self)?;
        Ok(node)
    }
}

fn describe_entry(entry: &ArchiveEntry) -> Result<ObjectDescription> {
    match entry {
        ArchiveEntry::Value(value) => {
            let mut leaf = ObjectDescription::new(value.type_name(), "");
            leaf.set_raw_value(value.clone())?;
            Ok(leaf)
        }
        ArchiveEntry::Object(object) => {
            let mut composite = ObjectDescription::new(object.type_name.as_str(), "");
            for (field, child) in &object.fields {
                composite.add_composite_property(field, describe_entry(child)?);
            }
            Ok(composite)
        }
        ArchiveEntry::Array(array) => {
            let mut composite = ObjectDescription::new("array", "");
            for (i, item) in array.items.iter().enumerate() {
                composite.add_composite_property(&i.to_string(), describe_entry(&ArchiveEntry::Object(item.clone()))?);
            }
            Ok(composite)
        }
    }
}

/// 將封存樹還原為 `A`，根物件的型別標籤必須相符
pub fn unarchive<A: Archivable + Default>(archived: &ArchivedObject, context: &SerializationContext) -> Result<A> {
    let mut object = A::default();
    if archived.type_name != object.runtime_type_name() {
        return Err(IrError::type_mismatch(object.runtime_type_name(), archived.type_name.as_str()));
    }
    object.read_from_archive(&Unarchiver::new(archived, context))?;
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        count: i64,
        ratio: f64,
    }

    impl Describable for Sample {
        fn type_name() -> &'static str {
            "Sample"
        }

        fn type_description() -> ObjectDescription {
            let mut description = ObjectDescription::for_type::<Self>("Sample object");
            description
                .add_property::<i64>("count", "A count")
                .add_property::<f64>("ratio", "A ratio");
            description
        }

        fn runtime_type_name(&self) -> &str {
            Self::type_name()
        }

        fn description(&self) -> Result<ObjectDescription> {
            let mut description = Self::type_description();
            description.set_property_value("count", self.count)?;
            description.set_property_value("ratio", self.ratio)?;
            Ok(description)
        }
    }

    impl Archivable for Sample {
        fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
            let description = unarchiver.read_properties(&Self::type_description())?;
            self.count = description.property_value("count")?;
            self.ratio = description.property_value("ratio")?;
            Ok(())
        }
    }

    #[test]
    fn test_generic_path_roundtrip() {
        let sample = Sample { count: 3, ratio: 0.1 };
        let archived = Archiver::archive(&sample).unwrap();
        assert_eq!(archived.type_name, "Sample");
        assert_eq!(
            archived.fields.keys().collect::<Vec<_>>(),
            vec!["count", "ratio"]
        );

        let context = SerializationContext::new();
        let restored: Sample = unarchive(&archived, &context).unwrap();
        assert_eq!(restored, sample);
    }

    #[test]
    fn test_missing_field_is_not_found() {
        let mut archived = Archiver::archive(&Sample::default()).unwrap();
        archived.fields.shift_remove("ratio");

        let context = SerializationContext::new();
        let err = unarchive::<Sample>(&archived, &context).unwrap_err();
        assert!(matches!(err, IrError::NotFound { .. }));
    }

    #[test]
    fn test_wrong_value_type_is_type_mismatch() {
        let mut archived = Archiver::archive(&Sample::default()).unwrap();
        archived
            .fields
            .insert("count".to_string(), ArchiveEntry::Value(Value::Text("3".to_string())));

        let context = SerializationContext::new();
        let err = unarchive::<Sample>(&archived, &context).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_root_type_tag_must_match() {
        let archived = ArchivedObject::new("Other");
        let context = SerializationContext::new();
        let err = unarchive::<Sample>(&archived, &context).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_valueless_leaf_cannot_be_written() {
        let mut archiver = Archiver::new("Sample");
        let err = archiver
            .write_properties(&Sample::type_description())
            .unwrap_err();
        assert!(matches!(err, IrError::NotFound { .. }));
    }

    #[test]
    fn test_unknown_node_type() {
        let archived = ArchivedObject::new("NoSuchNode");
        let context = SerializationContext::new();
        let err = Unarchiver::new(&archived, &context)
            .instantiate_node()
            .unwrap_err();
        assert!(matches!(err, IrError::UnknownType { .. }));
    }

    #[test]
    fn test_entry_json_shapes() {
        let mut archiver = Archiver::new("Outer");
        archiver.write("n", &2_i64).unwrap();
        archiver.write_object("inner", &Sample { count: 1, ratio: 2.5 }).unwrap();
        let archived = archiver.into_archived();

        let json = serde_json::to_value(&archived).unwrap();
        assert_eq!(json["type"], "Outer");
        assert_eq!(json["fields"]["n"], serde_json::json!({"type": "int", "value": 2}));
        assert_eq!(json["fields"]["inner"]["type"], "Sample");

        let back: ArchivedObject = serde_json::from_value(json).unwrap();
        assert_eq!(back, archived);
    }
}
