use crate::error::{Error, Result};
use crate::object::Object;
use crate::types::{Int, List, Str, Tuple};

/// Containers nested deeper than this fail to decode. The interpreter
/// permits cyclic lists and tuples, which would otherwise recurse
/// forever.
const MAX_DECODE_DEPTH: usize = 64;

/// Shape of a dynamic value crossing the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Str,
    List,
    Tuple,
    /// Any shape the bridge does not recognize.
    Other,
}

/// A dynamic value decoded into host-native data at the crossing point.
///
/// Host marshaling code is expected to decode a returned [`Object`] once
/// with [`Value::decode`] and branch on the variant, rather than probing
/// shape predicates deep in business logic. `Other` keeps an opaque
/// handle to whatever the interpreter produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Other(Object),
}

impl Value {
    /// Decodes an interpreter value, recursing through lists and tuples.
    ///
    /// # Errors
    /// If an element conversion raises inside the interpreter, or the
    /// value nests (or cycles back on itself) deeper than the supported
    /// depth.
    pub fn decode(object: &Object) -> Result<Self> {
        Self::decode_at(object, 0)
    }

    fn decode_at(object: &Object, depth: usize) -> Result<Self> {
        if depth > MAX_DECODE_DEPTH {
            return Err(Error::Convert {
                what: "container nested beyond the decode depth limit",
            });
        }
        match object.kind() {
            ValueKind::Int => Ok(Self::Int(object.as_int()?.value()?)),
            ValueKind::Str => Ok(Self::Str(object.as_str()?.to_str()?)),
            ValueKind::List => {
                let list = object.as_list()?;
                let mut items = Vec::with_capacity(list.len());
                for index in 0..list.len() {
                    items.push(Self::decode_at(&list.get(index)?, depth + 1)?);
                }
                Ok(Self::List(items))
            }
            ValueKind::Tuple => {
                let tuple = object.as_tuple()?;
                let mut items = Vec::with_capacity(tuple.len());
                for index in 0..tuple.len() {
                    items.push(Self::decode_at(&tuple.get(index)?, depth + 1)?);
                }
                Ok(Self::Tuple(items))
            }
            ValueKind::Other => Ok(Self::Other(object.clone())),
        }
    }

    /// Builds the interpreter-side object back from the decoded form.
    /// Legal only while a bridge is live, like every value operation.
    ///
    /// # Errors
    /// If an allocation inside the interpreter fails.
    pub fn encode(&self) -> Result<Object> {
        match self {
            Self::Int(n) => Int::new(*n).map(Object::from),
            Self::Str(s) => Str::new(s).map(Object::from),
            Self::List(items) => {
                let list = List::new(items.len())?;
                for (index, item) in items.iter().enumerate() {
                    list.set(index, &item.encode()?)?;
                }
                Ok(list.into())
            }
            Self::Tuple(items) => {
                let tuple = Tuple::new(items.len())?;
                for (index, item) in items.iter().enumerate() {
                    tuple.set(index, &item.encode()?)?;
                }
                Ok(tuple.into())
            }
            Self::Other(object) => Ok(object.clone()),
        }
    }

    /// The shape this decoded value carries.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::Str,
            Self::List(_) => ValueKind::List,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::Other(_) => ValueKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Value, ValueKind};

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Value::Int(1).kind(), ValueKind::Int);
        assert_eq!(Value::Str("x".into()).kind(), ValueKind::Str);
        assert_eq!(Value::List(vec![]).kind(), ValueKind::List);
        assert_eq!(Value::Tuple(vec![]).kind(), ValueKind::Tuple);
    }

    #[test]
    fn host_side_equality() {
        let a = Value::Tuple(vec![Value::Int(1), Value::Str("two".into())]);
        let b = Value::Tuple(vec![Value::Int(1), Value::Str("two".into())]);
        assert_eq!(a, b);
        assert_ne!(a, Value::List(vec![Value::Int(1), Value::Str("two".into())]));
    }
}
