use super::object_type::ObjectType;
use crate::model::Panel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/* /system/summary/config: {"system": {"objects": [{"A": .., "B": .., "C": .., "T": ..}, ..]}} */
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemDescription {
    pub system: System,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct System {
    #[serde(default)]
    pub objects: Vec<SystemObject>,
}

/// One asset of the installation. Only the keys needed for panels are typed,
/// the rest is kept verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemObject {
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SystemObject {
    pub fn object_type(&self) -> ObjectType {
        self.attributes
            .get("B")
            .and_then(|b| serde_json::from_value(b.to_owned()).ok())
            .unwrap_or(ObjectType::Unsupported)
    }

    /// Panel id (`A`); the portal sends it either as number or as string.
    pub fn id(&self) -> Option<String> {
        match self.attributes.get("A")? {
            Value::String(s) => Some(s.to_owned()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn str_attribute(&self, key: &str) -> String {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    }

    pub fn to_panel(&self) -> Option<Panel> {
        if self.object_type() != ObjectType::Panel {
            return None;
        }

        self.id().map(|id| Panel {
            id,
            name: self.str_attribute("C"),
            token: self.str_attribute("T"),
            attributes: self.attributes.to_owned(),
        })
    }
}

impl SystemDescription {
    pub fn panels(&self) -> Vec<Panel> {
        self.system
            .objects
            .iter()
            .filter_map(SystemObject::to_panel)
            .collect()
    }
}
