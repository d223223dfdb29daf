use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::core::graph::Model;
use crate::domain::value::Value;
use crate::utils::error::{IrError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 埠的元素型別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortType {
    #[default]
    #[serde(rename = "real")]
    Real,
    #[serde(rename = "int")]
    Integer,
    #[serde(rename = "bool")]
    Boolean,
}

impl PortType {
    pub fn name(&self) -> &'static str {
        match self {
            PortType::Real => "real",
            PortType::Integer => "int",
            PortType::Boolean => "bool",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "real" => Ok(PortType::Real),
            "int" => Ok(PortType::Integer),
            "bool" => Ok(PortType::Boolean),
            other => Err(IrError::UnknownType {
                type_name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 埠上流動的值（型別抹除）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values")]
pub enum PortValue {
    #[serde(rename = "real")]
    Real(#[serde(with = "crate::domain::value::real_text::vec")] Vec<f64>),
    #[serde(rename = "int")]
    Integer(Vec<i64>),
    #[serde(rename = "bool")]
    Boolean(Vec<bool>),
}

impl PortValue {
    pub fn empty(port_type: PortType) -> Self {
        match port_type {
            PortType::Real => PortValue::Real(Vec::new()),
            PortType::Integer => PortValue::Integer(Vec::new()),
            PortType::Boolean => PortValue::Boolean(Vec::new()),
        }
    }

    pub fn port_type(&self) -> PortType {
        match self {
            PortValue::Real(_) => PortType::Real,
            PortValue::Integer(_) => PortType::Integer,
            PortValue::Boolean(_) => PortType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PortValue::Real(v) => v.len(),
            PortValue::Integer(v) => v.len(),
            PortValue::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of the elements.
    pub fn values<T: Element>(&self) -> Result<&[T]> {
        T::unwrap(self).ok_or_else(|| IrError::type_mismatch(T::PORT_TYPE.name(), self.port_type().name()))
    }

    pub fn slice(&self, start: usize, size: usize) -> Result<PortValue> {
        let end = start + size;
        if end > self.len() {
            return Err(IrError::dimension_mismatch("port value slice", self.len(), end));
        }
        Ok(match self {
            PortValue::Real(v) => PortValue::Real(v[start..end].to_vec()),
            PortValue::Integer(v) => PortValue::Integer(v[start..end].to_vec()),
            PortValue::Boolean(v) => PortValue::Boolean(v[start..end].to_vec()),
        })
    }

    pub fn extend_from(&mut self, other: &PortValue) -> Result<()> {
        match (self, other) {
            (PortValue::Real(a), PortValue::Real(b)) => a.extend_from_slice(b),
            (PortValue::Integer(a), PortValue::Integer(b)) => a.extend_from_slice(b),
            (PortValue::Boolean(a), PortValue::Boolean(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(IrError::type_mismatch(a.port_type().name(), b.port_type().name()));
            }
        }
        Ok(())
    }
}

/// Scalar element types a port can carry.
pub trait Element: Copy + PartialEq + fmt::Debug + 'static {
    const PORT_TYPE: PortType;

    fn wrap(values: Vec<Self>) -> PortValue;
    fn unwrap(value: &PortValue) -> Option<&[Self]>;
    fn wrap_value(values: Vec<Self>) -> Value;
    fn unwrap_value(value: &Value) -> Option<Vec<Self>>;
}

impl Element for f64 {
    const PORT_TYPE: PortType = PortType::Real;

    fn wrap(values: Vec<Self>) -> PortValue {
        PortValue::Real(values)
    }

    fn unwrap(value: &PortValue) -> Option<&[Self]> {
        match value {
            PortValue::Real(v) => Some(v),
            _ => None,
        }
    }

    fn wrap_value(values: Vec<Self>) -> Value {
        Value::RealArray(values)
    }

    fn unwrap_value(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::RealArray(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Element for i64 {
    const PORT_TYPE: PortType = PortType::Integer;

    fn wrap(values: Vec<Self>) -> PortValue {
        PortValue::Integer(values)
    }

    fn unwrap(value: &PortValue) -> Option<&[Self]> {
        match value {
            PortValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    fn wrap_value(values: Vec<Self>) -> Value {
        Value::IntArray(values)
    }

    fn unwrap_value(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::IntArray(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Element for bool {
    const PORT_TYPE: PortType = PortType::Boolean;

    fn wrap(values: Vec<Self>) -> PortValue {
        PortValue::Boolean(values)
    }

    fn unwrap(value: &PortValue) -> Option<&[Self]> {
        match value {
            PortValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    fn wrap_value(values: Vec<Self>) -> Value {
        Value::BoolArray(values)
    }

    fn unwrap_value(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::BoolArray(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// 節點在 Model 中的穩定識別碼（arena 索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn output(self, index: usize) -> OutputRef {
        OutputRef { node: self, index }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to one output port: owning node plus output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub node: NodeId,
    pub index: usize,
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.index)
    }
}

/// 上游輸出埠中的一段連續元素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortRange {
    pub node: NodeId,
    pub output: usize,
    pub port_type: PortType,
    pub start: usize,
    pub size: usize,
}

impl PortRange {
    pub fn full(output: OutputRef, port_type: PortType, size: usize) -> Self {
        Self {
            node: output.node,
            output: output.index,
            port_type,
            start: 0,
            size,
        }
    }

    pub fn output_ref(&self) -> OutputRef {
        self.node.output(self.output)
    }
}

impl Describable for PortRange {
    fn type_name() -> &'static str {
        "PortRange"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Element range of an output port");
        description
            .add_property::<usize>("node", "Referenced node")
            .add_property::<usize>("output", "Output index on the referenced node")
            .add_property::<String>("type", "Element type")
            .add_property::<usize>("start", "First element")
            .add_property::<usize>("size", "Number of elements");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_value("node", self.node.0)?;
        description.set_property_value("output", self.output)?;
        description.set_property_value("type", self.port_type.name().to_string())?;
        description.set_property_value("start", self.start)?;
        description.set_property_value("size", self.size)?;
        Ok(description)
    }
}

impl Archivable for PortRange {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write("node", &self.node.0)?;
        archiver.write("output", &self.output)?;
        archiver.write("type", &self.port_type.name().to_string())?;
        archiver.write("start", &self.start)?;
        archiver.write("size", &self.size)
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        self.node = NodeId(unarchiver.read("node")?);
        self.output = unarchiver.read("output")?;
        self.port_type = PortType::from_name(&unarchiver.read::<String>("type")?)?;
        self.start = unarchiver.read("start")?;
        self.size = unarchiver.read("size")?;
        Ok(())
    }
}

/// 輸入埠所引用的上游元素序列
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortElements {
    ranges: Vec<PortRange>,
}

impl PortElements {
    pub fn new(ranges: Vec<PortRange>) -> Result<Self> {
        if let Some(first) = ranges.first() {
            if let Some(other) = ranges.iter().find(|r| r.port_type != first.port_type) {
                return Err(IrError::type_mismatch(first.port_type.name(), other.port_type.name()));
            }
        }
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[PortRange] {
        &self.ranges
    }

    pub fn size(&self) -> usize {
        self.ranges.iter().map(|r| r.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `None` when no range is referenced.
    pub fn port_type(&self) -> Option<PortType> {
        self.ranges.first().map(|r| r.port_type)
    }

    pub fn append(&mut self, other: &PortElements) -> Result<()> {
        if let (Some(mine), Some(theirs)) = (self.port_type(), other.port_type()) {
            if mine != theirs {
                return Err(IrError::type_mismatch(mine.name(), theirs.name()));
            }
        }
        self.ranges.extend_from_slice(&other.ranges);
        Ok(())
    }

    /// Elements `[start, start + size)` of this sequence.
    pub fn slice(&self, start: usize, size: usize) -> Result<PortElements> {
        let end = start + size;
        if end > self.size() {
            return Err(IrError::dimension_mismatch("port elements slice", self.size(), end));
        }

        let mut ranges = Vec::new();
        let mut offset = 0;
        for range in &self.ranges {
            let range_start = offset;
            let range_end = offset + range.size;
            offset = range_end;

            let lo = start.max(range_start);
            let hi = end.min(range_end);
            if lo < hi {
                ranges.push(PortRange {
                    start: range.start + (lo - range_start),
                    size: hi - lo,
                    ..*range
                });
            }
        }
        Ok(PortElements { ranges })
    }
}

impl From<PortRange> for PortElements {
    fn from(range: PortRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }
}

impl Describable for PortElements {
    fn type_name() -> &'static str {
        "PortElements"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Referenced output port elements");
        description
            .add_property::<usize>("size", "Total number of elements")
            .add_composite_property(
                "ranges",
                ObjectDescription::new("PortRange[]", "Referenced ranges, in order"),
            );
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_value("size", self.size())?;

        let ranges = description.property_mut("ranges")?;
        for (i, range) in self.ranges.iter().enumerate() {
            ranges.add_composite_property(&i.to_string(), range.description()?);
        }
        Ok(description)
    }
}

impl Archivable for PortElements {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write_array("ranges", self.ranges.iter())
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        let ranges = unarchiver.read_array("ranges", |item| {
            let mut range = PortRange::default();
            range.read_from_archive(&item)?;
            Ok(range)
        })?;
        *self = PortElements::new(ranges)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputPort {
    name: String,
    port_type: PortType,
    elements: PortElements,
}

impl InputPort {
    pub fn new(name: impl Into<String>, port_type: PortType, elements: PortElements) -> Result<Self> {
        if let Some(actual) = elements.port_type() {
            if actual != port_type {
                return Err(IrError::type_mismatch(port_type.name(), actual.name()));
            }
        }
        Ok(Self {
            name: name.into(),
            port_type,
            elements,
        })
    }

    /// 未連接的輸入埠（反序列化前的預設狀態）
    pub fn unconnected(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
            elements: PortElements::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn size(&self) -> usize {
        self.elements.size()
    }

    pub fn elements(&self) -> &PortElements {
        &self.elements
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    name: String,
    port_type: PortType,
    size: usize,
}

impl OutputPort {
    pub fn new(name: impl Into<String>, port_type: PortType, size: usize) -> Self {
        Self {
            name: name.into(),
            port_type,
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Describable for OutputPort {
    fn type_name() -> &'static str {
        "OutputPort"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Output port");
        description
            .add_property::<String>("type", "Element type")
            .add_property::<usize>("size", "Number of elements");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_value("type", self.port_type.name().to_string())?;
        description.set_property_value("size", self.size)?;
        Ok(description)
    }
}

impl Archivable for OutputPort {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write("type", &self.port_type.name().to_string())?;
        archiver.write("size", &self.size)
    }

    // 名稱由節點種類決定，只讀取型別與大小
    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        self.port_type = PortType::from_name(&unarchiver.read::<String>("type")?)?;
        self.size = unarchiver.read("size")?;
        Ok(())
    }
}

/// 單一輸出埠的求值結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputReport {
    pub name: String,
    pub values: PortValue,
}

#[derive(Debug)]
pub struct TransformResult {
    pub model: Model,
    pub passes: usize,
    pub converged: bool,
    pub outputs: Vec<OutputReport>,
}
