// Wed Jan 15 2026 - Alex

use crate::avm::{BinaryCursor, BytecodeError, ConstantPool};
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

const KIND_MASK: u8 = 0x0F;
const INSTANCE_PROTECTED_NS: u32 = 0x08;

/// Which scope a traits record belongs to; only the header layout differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HeaderKind {
    Instance,
    Class,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TraitKind {
    Slot,
    Method,
    Getter,
    Setter,
    Class,
    Function,
    Const,
    Unknown(u8),
}

impl TraitKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag & KIND_MASK {
            0 => TraitKind::Slot,
            1 => TraitKind::Method,
            2 => TraitKind::Getter,
            3 => TraitKind::Setter,
            4 => TraitKind::Class,
            5 => TraitKind::Function,
            6 => TraitKind::Const,
            other => TraitKind::Unknown(other),
        }
    }

    pub fn is_accessor_or_method(&self) -> bool {
        matches!(self, TraitKind::Method | TraitKind::Getter | TraitKind::Setter)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TraitKind::Slot => "slot",
            TraitKind::Method => "method",
            TraitKind::Getter => "getter",
            TraitKind::Setter => "setter",
            TraitKind::Class => "class",
            TraitKind::Function => "function",
            TraitKind::Const => "const",
            TraitKind::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitKind::Unknown(tag) => write!(f, "unknown({})", tag),
            other => f.write_str(other.name()),
        }
    }
}

bitflags! {
    /// Upper nibble of the trait tag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TraitAttributes: u8 {
        const FINAL = 0x10;
        const OVERRIDE = 0x20;
        const METADATA = 0x40;
    }
}

impl Serialize for TraitAttributes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitRecord {
    pub name: String,
    pub name_index: u32,
    pub kind: TraitKind,
    pub attributes: TraitAttributes,
    /// Slot id for slot-like traits, dispatch id for methods and accessors.
    pub slot_id: u32,
    /// Method, class, or function index; the value index for slots and consts.
    pub payload_id: u32,
    /// Type multiname index, only meaningful for `Slot` and `Const`.
    pub type_id: u32,
    pub metadata: Vec<u32>,
}

impl TraitRecord {
    fn new(name: String, name_index: u32, tag: u8) -> Self {
        Self {
            name,
            name_index,
            kind: TraitKind::from_tag(tag),
            attributes: TraitAttributes::from_bits_truncate(tag),
            slot_id: 0,
            payload_id: 0,
            type_id: 0,
            metadata: Vec::new(),
        }
    }
}

/// Header fields read before the trait list. Zero where the header kind
/// has no such field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeHeader {
    pub name_index: u32,
    pub super_index: u32,
    pub flags: u32,
    pub interfaces: Vec<u32>,
    pub init_method: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedTraits {
    pub kind: HeaderKind,
    pub header: ScopeHeader,
    records: Vec<TraitRecord>,
}

impl DecodedTraits {
    pub fn records(&self) -> &[TraitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First method, getter, or setter bound to `method_index`.
    pub fn find_method(&self, method_index: u32) -> Option<&TraitRecord> {
        self.records
            .iter()
            .find(|record| record.kind.is_accessor_or_method() && record.payload_id == method_index)
    }
}

pub struct TraitDecoder;

impl TraitDecoder {
    /// Decodes the traits record starting at the cursor, leaving the cursor
    /// just past it.
    pub fn decode(
        cursor: &mut BinaryCursor<'_>,
        kind: HeaderKind,
        pool: &dyn ConstantPool,
    ) -> Result<DecodedTraits, BytecodeError> {
        let header = Self::decode_header(cursor, kind)?;
        let trait_count = cursor.read_varint()?;

        let mut records = Vec::with_capacity(trait_count.min(1024) as usize);
        for _ in 0..trait_count {
            records.push(Self::decode_record(cursor, pool)?);
        }

        Ok(DecodedTraits { kind, header, records })
    }

    fn decode_header(cursor: &mut BinaryCursor<'_>, kind: HeaderKind) -> Result<ScopeHeader, BytecodeError> {
        let mut header = ScopeHeader::default();

        if kind == HeaderKind::Instance {
            header.name_index = cursor.read_varint()?;
            header.super_index = cursor.read_varint()?;
            header.flags = cursor.read_varint()?;
            if header.flags & INSTANCE_PROTECTED_NS != 0 {
                cursor.read_varint()?;
            }
            let interface_count = cursor.read_varint()?;
            for _ in 0..interface_count {
                header.interfaces.push(cursor.read_varint()?);
            }
        }

        header.init_method = cursor.read_varint()?;
        Ok(header)
    }

    fn decode_record(cursor: &mut BinaryCursor<'_>, pool: &dyn ConstantPool) -> Result<TraitRecord, BytecodeError> {
        let start = cursor.position();
        let name_index = cursor.read_varint()?;
        let tag = cursor.read_u8()?;
        let name = pool.multiname(name_index).unwrap_or_default();
        let mut record = TraitRecord::new(name, name_index, tag);

        match record.kind {
            TraitKind::Slot | TraitKind::Const => {
                record.slot_id = cursor.read_varint()?;
                record.type_id = cursor.read_varint()?;
                record.payload_id = cursor.read_varint()?;
                if record.payload_id != 0 {
                    cursor.read_u8()?;
                }
            }
            TraitKind::Class | TraitKind::Function => {
                record.slot_id = cursor.read_varint()?;
                record.payload_id = cursor.read_varint()?;
            }
            TraitKind::Method | TraitKind::Getter | TraitKind::Setter => {
                record.slot_id = cursor.read_varint()?;
                record.payload_id = cursor.read_varint()?;
            }
            TraitKind::Unknown(kind) => {
                log::warn!("Invalid trait kind {} for '{}' at offset {}", kind, record.name, start);
            }
        }

        if record.attributes.contains(TraitAttributes::METADATA) {
            let count = cursor.read_varint()?;
            for _ in 0..count {
                record.metadata.push(cursor.read_varint()?);
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) struct StaticPool {
        pub bytecode: Vec<u8>,
        pub multinames: HashMap<u32, String>,
        pub methods: HashMap<u32, String>,
    }

    impl StaticPool {
        pub fn new(bytecode: Vec<u8>) -> Self {
            Self {
                bytecode,
                multinames: HashMap::new(),
                methods: HashMap::new(),
            }
        }

        pub fn with_multiname(mut self, index: u32, name: &str) -> Self {
            self.multinames.insert(index, name.to_string());
            self
        }

        pub fn with_method(mut self, index: u32, name: &str) -> Self {
            self.methods.insert(index, name.to_string());
            self
        }
    }

    impl ConstantPool for StaticPool {
        fn bytecode(&self) -> &[u8] {
            &self.bytecode
        }

        fn multiname(&self, index: u32) -> Option<String> {
            self.multinames.get(&index).cloned()
        }

        fn method_name(&self, index: u32) -> String {
            self.methods.get(&index).cloned().unwrap_or_default()
        }
    }

    fn decode(bytes: &[u8], kind: HeaderKind, pool: &StaticPool) -> (DecodedTraits, usize) {
        let mut cursor = BinaryCursor::new(bytes);
        let traits = TraitDecoder::decode(&mut cursor, kind, pool).unwrap();
        (traits, cursor.position())
    }

    #[test]
    fn test_instance_with_one_slot() {
        // name, super, flags, interfaces, iinit, one slot: name 3, slot 1, type 4, value 0
        let bytes = [0x01, 0x02, 0x00, 0x00, 0x05, 0x01, 0x03, 0x00, 0x01, 0x04, 0x00];
        let pool = StaticPool::new(Vec::new()).with_multiname(3, "health");
        let (traits, end) = decode(&bytes, HeaderKind::Instance, &pool);

        assert_eq!(end, bytes.len());
        assert_eq!(traits.len(), 1);
        assert_eq!(traits.header.name_index, 1);
        assert_eq!(traits.header.super_index, 2);
        assert_eq!(traits.header.init_method, 5);

        let record = &traits.records()[0];
        assert_eq!(record.name, "health");
        assert_eq!(record.name_index, 3);
        assert_eq!(record.kind, TraitKind::Slot);
        assert_eq!(record.slot_id, 1);
        assert_eq!(record.type_id, 4);
        assert_eq!(record.payload_id, 0);
    }

    #[test]
    fn test_const_value_kind_byte_is_skipped() {
        // class header, one const with value index 2 and kind byte 0x03, then a method
        let bytes = [
            0x00, 0x02, //
            0x01, 0x06, 0x00, 0x07, 0x02, 0x03, //
            0x02, 0x01, 0x00, 0x09,
        ];
        let pool = StaticPool::new(Vec::new());
        let (traits, end) = decode(&bytes, HeaderKind::Class, &pool);

        assert_eq!(end, bytes.len());
        assert_eq!(traits.records()[0].kind, TraitKind::Const);
        assert_eq!(traits.records()[0].type_id, 7);
        assert_eq!(traits.records()[0].payload_id, 2);
        assert_eq!(traits.records()[1].kind, TraitKind::Method);
        assert_eq!(traits.records()[1].payload_id, 9);
        assert_eq!(traits.records()[0].name, "");
    }

    #[test]
    fn test_protected_namespace_and_interfaces() {
        let bytes = [
            0x01, 0x00, 0x08, 0x04, // name, super, flags with protected ns, ns
            0x02, 0x0A, 0x0B, // two interfaces
            0x03, 0x00, // iinit, no traits
        ];
        let pool = StaticPool::new(Vec::new());
        let (traits, end) = decode(&bytes, HeaderKind::Instance, &pool);

        assert_eq!(end, bytes.len());
        assert!(traits.is_empty());
        assert_eq!(traits.header.interfaces, vec![10, 11]);
        assert_eq!(traits.header.init_method, 3);
    }

    #[test]
    fn test_metadata_and_attributes() {
        // script header, getter tagged final + metadata with two entries
        let bytes = [0x00, 0x01, 0x04, 0x52, 0x00, 0x07, 0x02, 0x01, 0x02];
        let pool = StaticPool::new(Vec::new()).with_multiname(4, "visible");
        let (traits, end) = decode(&bytes, HeaderKind::Script, &pool);

        assert_eq!(end, bytes.len());
        let record = &traits.records()[0];
        assert_eq!(record.kind, TraitKind::Getter);
        assert!(record.attributes.contains(TraitAttributes::FINAL | TraitAttributes::METADATA));
        assert!(!record.attributes.contains(TraitAttributes::OVERRIDE));
        assert_eq!(record.metadata, vec![1, 2]);
        assert_eq!(traits.find_method(7).map(|r| r.name.as_str()), Some("visible"));
        assert!(traits.find_method(8).is_none());
    }

    #[test]
    fn test_unknown_kind_continues_decoding() {
        // unknown tag 0x09 has no payload; the following slot still decodes
        let bytes = [0x00, 0x02, 0x01, 0x09, 0x02, 0x00, 0x00, 0x00, 0x00];
        let pool = StaticPool::new(Vec::new());
        let (traits, end) = decode(&bytes, HeaderKind::Class, &pool);

        assert_eq!(end, bytes.len());
        assert_eq!(traits.len(), 2);
        assert_eq!(traits.records()[0].kind, TraitKind::Unknown(9));
        assert_eq!(traits.records()[1].kind, TraitKind::Slot);
        assert_eq!(traits.records()[1].name_index, 2);
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let bytes = [0x00, 0x01, 0x01, 0x01];
        let pool = StaticPool::new(Vec::new());
        let mut cursor = BinaryCursor::new(&bytes);
        let result = TraitDecoder::decode(&mut cursor, HeaderKind::Class, &pool);
        assert!(matches!(result, Err(BytecodeError::UnexpectedEof { .. })));
    }
}
