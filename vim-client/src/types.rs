//! Data objects exchanged with the VI/JSON endpoint.
//!
//! Only the fields this client reads are modelled; everything else the server sends is ignored.
//! Polymorphic values are discriminated by their `_typeName` field. Kinds the client does not
//! understand decode into an `Other` variant instead of failing the whole response.

use chrono::{
    DateTime,
    Utc,
};
use derive_more::Display;
use serde::{
    de::Error as _,
    ser::SerializeStruct as _,
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use serde_json::Value;

const TYPE_NAME: &str = "_typeName";

fn type_name_of(value: &Value) -> String {
    value
        .get(TYPE_NAME)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// Reference to a server-side managed object, e.g. `VirtualMachine:vm-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Deserialize)]
#[display("{kind}:{value}")]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl Serialize for ManagedObjectReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ManagedObjectReference", 3)?;
        state.serialize_field(TYPE_NAME, "ManagedObjectReference")?;
        state.serialize_field("type", &self.kind)?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub instance_uuid: Option<String>,
}

/// The root document of the endpoint, listing the well-known managers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    #[serde(default)]
    pub session_manager: Option<ManagedObjectReference>,
    #[serde(default)]
    pub view_manager: Option<ManagedObjectReference>,
    #[serde(default)]
    pub perf_manager: Option<ManagedObjectReference>,
    #[serde(default)]
    pub about: AboutInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub key: String,
    pub user_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Result page of `RetrievePropertiesEx`. A `token` means more pages are pending.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrieveResult {
    #[serde(default)]
    pub objects: Vec<ObjectContent>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectContent {
    pub obj: ManagedObjectReference,
    #[serde(default)]
    pub prop_set: Vec<DynamicProperty>,
}

impl ObjectContent {
    pub fn property(&self, name: &str) -> Option<&DynamicProperty> {
        self.prop_set.iter().find(|prop| prop.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicProperty {
    pub name: String,
    pub val: Value,
}

impl DynamicProperty {
    /// String value of the property. Primitives typed as `anyType` arrive boxed as
    /// `{"_typeName": "string", "_value": "..."}`.
    pub fn as_str(&self) -> Option<&str> {
        match &self.val {
            Value::String(s) => Some(s),
            Value::Object(map) => map.get("_value").and_then(Value::as_str),
            _ => None,
        }
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementDescription {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub summary: String,
}

/// One entry of the performance manager's counter catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfCounterInfo {
    pub key: i32,
    pub name_info: ElementDescription,
    pub group_info: ElementDescription,
    pub unit_info: ElementDescription,
    pub rollup_type: String,
    #[serde(default)]
    pub stats_type: String,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub per_device_level: Option<i32>,
}

impl PerfCounterInfo {
    /// Dotted name as shown in the vSphere client, e.g. `cpu.usagemhz.average`.
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.group_info.key, self.name_info.key, self.rollup_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfMetricId {
    pub counter_id: i32,
    #[serde(default)]
    pub instance: String,
}

impl PerfMetricId {
    /// Metric id for the aggregate instance of `counter_id`.
    pub fn aggregate(counter_id: i32) -> Self {
        Self {
            counter_id,
            instance: String::new(),
        }
    }
}

impl Serialize for PerfMetricId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PerfMetricId", 3)?;
        state.serialize_field(TYPE_NAME, "PerfMetricId")?;
        state.serialize_field("counterId", &self.counter_id)?;
        state.serialize_field("instance", &self.instance)?;
        state.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct PerfQuerySpec {
    pub entity: ManagedObjectReference,
    pub metric_id: Vec<PerfMetricId>,
    pub interval_id: i32,
    pub max_sample: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerfSampleInfo {
    pub timestamp: DateTime<Utc>,
    pub interval: i32,
}

/// Per-entity envelope of a `QueryPerf` response.
#[derive(Debug, Clone)]
pub enum PerfEntityMetricBase {
    Entity(PerfEntityMetric),
    /// Any other representation, e.g. `PerfEntityMetricCSV`.
    Other { type_name: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfEntityMetric {
    pub entity: ManagedObjectReference,
    #[serde(default)]
    pub sample_info: Vec<PerfSampleInfo>,
    #[serde(default)]
    pub value: Vec<PerfMetricSeries>,
}

/// One counter's value series inside a [`PerfEntityMetric`].
#[derive(Debug, Clone)]
pub enum PerfMetricSeries {
    Integer(PerfMetricIntSeries),
    Other {
        type_name: String,
        counter_id: Option<i32>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerfMetricIntSeries {
    pub id: PerfMetricId,
    #[serde(default)]
    pub value: Vec<i64>,
}

impl<'de> Deserialize<'de> for PerfEntityMetricBase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match type_name_of(&value).as_str() {
            "PerfEntityMetric" => serde_json::from_value(value)
                .map(PerfEntityMetricBase::Entity)
                .map_err(D::Error::custom),
            other => Ok(PerfEntityMetricBase::Other {
                type_name: other.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for PerfMetricSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match type_name_of(&value).as_str() {
            "PerfMetricIntSeries" => serde_json::from_value(value)
                .map(PerfMetricSeries::Integer)
                .map_err(D::Error::custom),
            other => Ok(PerfMetricSeries::Other {
                type_name: other.to_string(),
                counter_id: value
                    .pointer("/id/counterId")
                    .and_then(Value::as_i64)
                    .and_then(|id| i32::try_from(id).ok()),
            }),
        }
    }
}
