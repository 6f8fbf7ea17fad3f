// Wed Jan 15 2026 - Alex

use crate::avm::{BinaryCursor, BytecodeError, ConstantPool, HeaderKind, MethodHandle, TraitDecoder, TraitsHandle};
use serde::Serialize;

pub const SUPPORTED_MAJOR_VERSION: u16 = 46;

const MAX_TYPE_NAME_DEPTH: usize = 8;

const METHOD_HAS_OPTIONAL: u8 = 0x08;
const METHOD_HAS_PARAM_NAMES: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Multiname {
    /// Implicit entry 0, the `*` name.
    Any,
    QName { namespace: u32, name: u32 },
    RtQName { name: u32 },
    RtQNameL,
    Multiname { name: u32, ns_set: u32 },
    MultinameL { ns_set: u32 },
    TypeName { base: u32, params: Vec<u32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Namespace {
    pub kind: u8,
    pub name: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: u32,
    pub return_type: u32,
    pub param_types: Vec<u32>,
    pub flags: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataInfo {
    pub name: u32,
    pub items: Vec<(u32, u32)>,
}

/// A bytecode file held in memory, usable as a [`ConstantPool`].
///
/// Every constant table keeps the format's implicit entry 0 so indices from
/// the stream can be used directly.
pub struct AbcFile {
    data: Vec<u8>,
    minor_version: u16,
    major_version: u16,
    ints: Vec<i32>,
    uints: Vec<u32>,
    doubles: Vec<f64>,
    strings: Vec<String>,
    namespaces: Vec<Namespace>,
    ns_sets: Vec<Vec<u32>>,
    multinames: Vec<Multiname>,
    methods: Vec<MethodInfo>,
    metadata: Vec<MetadataInfo>,
    instance_offsets: Vec<usize>,
    class_offsets: Vec<usize>,
    script_offsets: Vec<usize>,
}

impl AbcFile {
    pub fn parse(data: Vec<u8>) -> Result<Self, BytecodeError> {
        let mut cursor = BinaryCursor::new(&data);

        let minor_version = cursor.read_fixed::<u16>()?;
        let major_version = cursor.read_fixed::<u16>()?;
        if major_version != SUPPORTED_MAJOR_VERSION {
            return Err(BytecodeError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let ints = read_table(&mut cursor, 0, |c| c.read_varint32().map(|v| v as i32))?;
        let uints = read_table(&mut cursor, 0, |c| c.read_varint32())?;
        let doubles = read_table(&mut cursor, f64::NAN, |c| c.read_fixed::<f64>())?;
        let strings = read_table(&mut cursor, String::new(), read_string)?;
        let namespaces = read_table(&mut cursor, Namespace { kind: 0, name: 0 }, |c| {
            Ok(Namespace {
                kind: c.read_u8()?,
                name: c.read_varint()?,
            })
        })?;
        let ns_sets = read_table(&mut cursor, Vec::new(), read_index_list)?;
        let multinames = read_table(&mut cursor, Multiname::Any, read_multiname)?;

        let method_count = cursor.read_varint()?;
        let mut methods = Vec::with_capacity(method_count.min(4096) as usize);
        for _ in 0..method_count {
            methods.push(read_method(&mut cursor)?);
        }

        let metadata_count = cursor.read_varint()?;
        let mut metadata = Vec::with_capacity(metadata_count.min(4096) as usize);
        for _ in 0..metadata_count {
            metadata.push(read_metadata(&mut cursor)?);
        }

        let sections_start = cursor.position();

        let mut abc = Self {
            data,
            minor_version,
            major_version,
            ints,
            uints,
            doubles,
            strings,
            namespaces,
            ns_sets,
            multinames,
            methods,
            metadata,
            instance_offsets: Vec::new(),
            class_offsets: Vec::new(),
            script_offsets: Vec::new(),
        };

        let (instances, classes, scripts) = abc.locate_traits(sections_start)?;
        abc.instance_offsets = instances;
        abc.class_offsets = classes;
        abc.script_offsets = scripts;

        log::debug!(
            "Parsed bytecode {}.{}: {} strings, {} multinames, {} methods, {} classes, {} scripts",
            abc.major_version,
            abc.minor_version,
            abc.strings.len(),
            abc.multinames.len(),
            abc.methods.len(),
            abc.instance_offsets.len(),
            abc.script_offsets.len()
        );

        Ok(abc)
    }

    fn locate_traits(&self, start: usize) -> Result<(Vec<usize>, Vec<usize>, Vec<usize>), BytecodeError> {
        let mut cursor = BinaryCursor::at(&self.data, start);

        let class_count = cursor.read_varint()?;
        let instances = self.skip_records(&mut cursor, class_count, HeaderKind::Instance)?;
        let classes = self.skip_records(&mut cursor, class_count, HeaderKind::Class)?;

        let script_count = cursor.read_varint()?;
        let scripts = self.skip_records(&mut cursor, script_count, HeaderKind::Script)?;

        Ok((instances, classes, scripts))
    }

    fn skip_records(
        &self,
        cursor: &mut BinaryCursor<'_>,
        count: u32,
        kind: HeaderKind,
    ) -> Result<Vec<usize>, BytecodeError> {
        let mut offsets = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            offsets.push(cursor.position());
            TraitDecoder::decode(cursor, kind, self)?;
        }
        Ok(offsets)
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn ints(&self) -> &[i32] {
        &self.ints
    }

    pub fn uints(&self) -> &[u32] {
        &self.uints
    }

    pub fn doubles(&self) -> &[f64] {
        &self.doubles
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn namespace_sets(&self) -> &[Vec<u32>] {
        &self.ns_sets
    }

    pub fn multinames(&self) -> &[Multiname] {
        &self.multinames
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn metadata(&self) -> &[MetadataInfo] {
        &self.metadata
    }

    pub fn class_count(&self) -> usize {
        self.instance_offsets.len()
    }

    pub fn script_count(&self) -> usize {
        self.script_offsets.len()
    }

    pub fn instance_traits(&self, class_index: usize) -> Option<TraitsHandle<'_>> {
        self.instance_offsets
            .get(class_index)
            .map(|&offset| TraitsHandle::new(self, offset, HeaderKind::Instance))
    }

    pub fn class_traits(&self, class_index: usize) -> Option<TraitsHandle<'_>> {
        self.class_offsets
            .get(class_index)
            .map(|&offset| TraitsHandle::new(self, offset, HeaderKind::Class))
    }

    pub fn script_traits(&self, script_index: usize) -> Option<TraitsHandle<'_>> {
        self.script_offsets
            .get(script_index)
            .map(|&offset| TraitsHandle::new(self, offset, HeaderKind::Script))
    }

    /// A handle for method `method_index` whose identity is the address of
    /// its `MethodInfo`, so every handle built here for the same method
    /// shares one name cache entry. An index with no `MethodInfo` gets a
    /// fresh identity.
    pub fn method_handle<'a>(&'a self, method_index: u32, declaring_scope: Option<TraitsHandle<'a>>) -> MethodHandle<'a> {
        match self.methods.get(method_index as usize) {
            Some(info) => {
                let descriptor = info as *const MethodInfo as usize as u64;
                MethodHandle::with_identity(descriptor, self, method_index, declaring_scope)
            }
            None => MethodHandle::new(self, method_index, declaring_scope),
        }
    }

    fn display_multiname(&self, index: u32, depth: usize) -> Option<String> {
        match self.multinames.get(index as usize)? {
            Multiname::Any => None,
            Multiname::QName { name, .. } | Multiname::RtQName { name } | Multiname::Multiname { name, .. } => {
                Some(self.string(*name).unwrap_or_default().to_string())
            }
            Multiname::RtQNameL | Multiname::MultinameL { .. } => Some(String::new()),
            Multiname::TypeName { base, params } => {
                if depth >= MAX_TYPE_NAME_DEPTH {
                    return None;
                }
                let base = self.display_multiname(*base, depth + 1).unwrap_or_else(|| "*".to_string());
                let params: Vec<String> = params
                    .iter()
                    .map(|&param| self.display_multiname(param, depth + 1).unwrap_or_else(|| "*".to_string()))
                    .collect();
                Some(format!("{}.<{}>", base, params.join(",")))
            }
        }
    }
}

impl ConstantPool for AbcFile {
    fn bytecode(&self) -> &[u8] {
        &self.data
    }

    fn multiname(&self, index: u32) -> Option<String> {
        self.display_multiname(index, 0)
    }

    fn method_name(&self, index: u32) -> String {
        self.methods
            .get(index as usize)
            .and_then(|method| self.string(method.name))
            .unwrap_or_default()
            .to_string()
    }
}

/// Reads a counted table whose entry 0 is implicit. A count of 0 and a count
/// of 1 both mean no explicit entries.
fn read_table<'a, T>(
    cursor: &mut BinaryCursor<'a>,
    implicit: T,
    mut read: impl FnMut(&mut BinaryCursor<'a>) -> Result<T, BytecodeError>,
) -> Result<Vec<T>, BytecodeError> {
    let count = cursor.read_varint()?;
    let mut entries = Vec::with_capacity(count.clamp(1, 4096) as usize);
    entries.push(implicit);
    for _ in 1..count {
        entries.push(read(cursor)?);
    }
    Ok(entries)
}

fn read_string(cursor: &mut BinaryCursor<'_>) -> Result<String, BytecodeError> {
    let len = cursor.read_varint()? as usize;
    let position = cursor.position();
    let bytes = cursor.read_bytes(len)?;
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| BytecodeError::InvalidString { position })
}

fn read_index_list(cursor: &mut BinaryCursor<'_>) -> Result<Vec<u32>, BytecodeError> {
    let count = cursor.read_varint()?;
    (0..count).map(|_| cursor.read_varint()).collect()
}

fn read_multiname(cursor: &mut BinaryCursor<'_>) -> Result<Multiname, BytecodeError> {
    let position = cursor.position();
    let kind = cursor.read_u8()?;
    let multiname = match kind {
        0x07 | 0x0D => Multiname::QName {
            namespace: cursor.read_varint()?,
            name: cursor.read_varint()?,
        },
        0x0F | 0x10 => Multiname::RtQName {
            name: cursor.read_varint()?,
        },
        0x11 | 0x12 => Multiname::RtQNameL,
        0x09 | 0x0E => Multiname::Multiname {
            name: cursor.read_varint()?,
            ns_set: cursor.read_varint()?,
        },
        0x1B | 0x1C => Multiname::MultinameL {
            ns_set: cursor.read_varint()?,
        },
        0x1D => Multiname::TypeName {
            base: cursor.read_varint()?,
            params: read_index_list(cursor)?,
        },
        kind => return Err(BytecodeError::InvalidMultinameKind { kind, position }),
    };
    Ok(multiname)
}

fn read_method(cursor: &mut BinaryCursor<'_>) -> Result<MethodInfo, BytecodeError> {
    let param_count = cursor.read_varint()?;
    let return_type = cursor.read_varint()?;
    let param_types = (0..param_count)
        .map(|_| cursor.read_varint())
        .collect::<Result<Vec<_>, _>>()?;
    let name = cursor.read_varint()?;
    let flags = cursor.read_u8()?;

    if flags & METHOD_HAS_OPTIONAL != 0 {
        let option_count = cursor.read_varint()?;
        for _ in 0..option_count {
            cursor.read_varint()?;
            cursor.read_u8()?;
        }
    }
    if flags & METHOD_HAS_PARAM_NAMES != 0 {
        cursor.skip_varints(param_count)?;
    }

    Ok(MethodInfo {
        name,
        return_type,
        param_types,
        flags,
    })
}

fn read_metadata(cursor: &mut BinaryCursor<'_>) -> Result<MetadataInfo, BytecodeError> {
    let name = cursor.read_varint()?;
    let item_count = cursor.read_varint()?;
    let keys = (0..item_count)
        .map(|_| cursor.read_varint())
        .collect::<Result<Vec<_>, _>>()?;
    let values = (0..item_count)
        .map(|_| cursor.read_varint())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MetadataInfo {
        name,
        items: keys.into_iter().zip(values).collect(),
    })
}
