//! Pluggable serialization of cached results

use crate::CacheError;
use serde::{de::DeserializeOwned, Serialize};

/// Encodes guarded results into the bytes a [`CacheBackend`](crate::CacheBackend) stores
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Name of the format (for logs)
    fn name(&self) -> &str;

    /// Serialize a value to bytes
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    /// Deserialize bytes to a value
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError>;

    /// Serialize a value, failing unless the bytes decode back into `T`
    ///
    /// Not every format can represent every value: JSON writes non-finite
    /// floats as `null`, which no longer decodes as `f64`.
    fn serialize_checked<T>(&self, value: &T) -> Result<Vec<u8>, CacheError>
    where
        T: Serialize + DeserializeOwned,
    {
        let bytes = self.serialize(value)?;
        self.deserialize::<T>(&bytes).map_err(|e| {
            CacheError::Serialization(format!("{} does not round-trip: {e}", self.name()))
        })?;
        Ok(bytes)
    }
}

/// JSON serializer (default)
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

#[cfg(feature = "json")]
impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// MessagePack serializer
///
/// Enable with the `msgpack` feature.
#[cfg(feature = "msgpack")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

#[cfg(feature = "msgpack")]
impl Serializer for MsgPackSerializer {
    fn name(&self) -> &str {
        "msgpack"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// Bincode serializer
///
/// Enable with the `bincode` feature.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

#[cfg(feature = "bincode")]
impl Serializer for BincodeSerializer {
    fn name(&self) -> &str {
        "bincode"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        let (val, _len) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(val)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_unit_and_none_are_present_values() {
        let serializer = JsonSerializer;

        let bytes = serializer.serialize(&()).unwrap();
        assert_eq!(bytes, b"null".to_vec());
        serializer.deserialize::<()>(&bytes).unwrap();

        let none: Option<u32> = None;
        let bytes = serializer.serialize(&none).unwrap();
        assert_eq!(serializer.deserialize::<Option<u32>>(&bytes).unwrap(), None);
    }

    #[test]
    fn test_type_mismatch_is_deserialization_error() {
        let serializer = JsonSerializer;
        let bytes = serializer.serialize(&"text").unwrap();

        let err = serializer.deserialize::<u64>(&bytes).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_json_serializer_name() {
        assert_eq!(JsonSerializer.name(), "json");
    }

    #[test]
    fn test_checked_rejects_non_finite_floats() {
        let serializer = JsonSerializer;

        assert_eq!(serializer.serialize(&f64::NAN).unwrap(), b"null".to_vec());
        let err = serializer.serialize_checked(&f64::NAN).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(ref msg) if msg.starts_with("json")));
        assert!(serializer.serialize_checked(&f64::INFINITY).is_err());

        assert_eq!(serializer.serialize_checked(&1.5f64).unwrap(), b"1.5".to_vec());
    }

    #[test]
    fn test_checked_reports_unencodable_values() {
        let map = std::collections::HashMap::from([((1u32, 2u32), 3u32)]);

        let err = JsonSerializer.serialize_checked(&map).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_msgpack_keeps_non_finite_floats() {
        let serializer = MsgPackSerializer;

        let bytes = serializer.serialize_checked(&f64::INFINITY).unwrap();
        assert_eq!(serializer.deserialize::<f64>(&bytes).unwrap(), f64::INFINITY);
    }

    #[cfg(feature = "bincode")]
    #[test]
    fn test_bincode_keeps_tuple_keys_and_nan() {
        let serializer = BincodeSerializer;

        let map = std::collections::HashMap::from([((1u32, 2u32), 3u32)]);
        let bytes = serializer.serialize_checked(&map).unwrap();
        assert_eq!(
            serializer
                .deserialize::<std::collections::HashMap<(u32, u32), u32>>(&bytes)
                .unwrap(),
            map
        );

        let bytes = serializer.serialize_checked(&f64::NAN).unwrap();
        assert!(serializer.deserialize::<f64>(&bytes).unwrap().is_nan());
    }
}
