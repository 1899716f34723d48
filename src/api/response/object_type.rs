use num_derive::FromPrimitive;
use serde_json::Value;

/// Discriminator (`B`) of an object in the system configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ObjectType {
    Unsupported,
    Panel = 2,
}

impl<'de> serde::Deserialize<'de> for ObjectType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;

        Value::as_u64(&value)
            .ok_or_else(|| serde::de::Error::missing_field("B"))
            .map(|v| match num::FromPrimitive::from_u64(v) {
                Some(object_type) => object_type,
                None => ObjectType::Unsupported,
            })
    }
}
